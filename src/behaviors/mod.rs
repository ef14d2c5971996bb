//! Composable interaction behaviors shared by the drawing modes.
//!
//! Behaviors are stateless bundles of configuration bound to a
//! [`ModeContext`] when a mode registers. They are constructed once per mode
//! instance and never mutated afterwards; modes compose them rather than
//! inheriting from them.

use crate::geometry::planar::euclidean_distance;
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::modes::PointerEvent;
use crate::store::FeatureStore;
use std::cell::RefCell;
use std::rc::Rc;

/// Cursor affordance a mode can request from the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Crosshair,
    Pointer,
    Move,
    Grabbing,
    Unset,
}

/// Screen/geo conversion: `(lng, lat)` → container `(x, y)` pixels.
pub type ProjectFn = Box<dyn Fn(f64, f64) -> (f64, f64)>;
/// Inverse conversion: container `(x, y)` pixels → `(lng, lat)`.
pub type UnprojectFn = Box<dyn Fn(f64, f64) -> (f64, f64)>;
/// Cursor setter supplied by the host surface.
pub type SetCursorFn = Box<dyn Fn(Cursor)>;
/// Selection callbacks fired by the select mode.
pub type SelectionFn = Box<dyn Fn(&FeatureId)>;

/// Registration context handed to every mode's `register`.
///
/// Supplied by the external dispatcher; the core only requires `project` and
/// `unproject` to behave as pure functions for the duration of one event.
pub struct ModeContext {
    pub store: Rc<RefCell<FeatureStore>>,
    pub project: ProjectFn,
    pub unproject: UnprojectFn,
    pub set_cursor: SetCursorFn,
    pub on_select: SelectionFn,
    pub on_deselect: SelectionFn,
    /// Pixel radius within which a click counts as hitting a vertex or
    /// closing an in-progress shape.
    pub pointer_distance: f64,
    /// Decimal digits coordinates are limited to.
    pub coordinate_precision: u32,
}

impl ModeContext {
    /// Projects a geographic coordinate to container pixel space.
    pub fn project(&self, position: Position) -> (f64, f64) {
        (self.project)(position[0], position[1])
    }

    /// Unprojects a container pixel coordinate back to `[lng, lat]`.
    pub fn unproject(&self, x: f64, y: f64) -> Position {
        let (lng, lat) = (self.unproject)(x, y);
        [lng, lat]
    }

    pub fn set_cursor(&self, cursor: Cursor) {
        (self.set_cursor)(cursor);
    }
}

/// Measures pixel distance between a geographic coordinate and the current
/// pointer position.
///
/// Used for closing-click detection and hit-test tolerance checks.
pub struct PixelDistanceBehavior {
    ctx: Rc<ModeContext>,
}

impl PixelDistanceBehavior {
    pub fn new(ctx: Rc<ModeContext>) -> Self {
        Self { ctx }
    }

    /// Euclidean pixel distance from `position` to the event's container
    /// coordinate.
    pub fn measure(&self, event: &PointerEvent, position: Position) -> f64 {
        let projected = self.ctx.project(position);
        euclidean_distance(projected, (event.container_x, event.container_y))
    }

    /// True when `position` lies within the registered pointer tolerance of
    /// the event.
    pub fn within_tolerance(&self, event: &PointerEvent, position: Position) -> bool {
        self.measure(event, position) <= self.ctx.pointer_distance
    }
}

/// Builds a small geographic polygon covering the pointer-tolerance square
/// around a click.
///
/// The polygon is used for spatial-index queries: coarse hit testing before
/// precise geometric checks.
pub struct ClickBoundingBoxBehavior {
    ctx: Rc<ModeContext>,
}

impl ClickBoundingBoxBehavior {
    pub fn new(ctx: Rc<ModeContext>) -> Self {
        Self { ctx }
    }

    /// Unprojects the four corners of the screen-space tolerance square back
    /// to geographic coordinates.
    pub fn create(&self, event: &PointerEvent) -> Geometry {
        let (x, y) = (event.container_x, event.container_y);
        let d = self.ctx.pointer_distance;
        let top_left = self.ctx.unproject(x - d, y - d);
        let top_right = self.ctx.unproject(x + d, y - d);
        let bottom_right = self.ctx.unproject(x + d, y + d);
        let bottom_left = self.ctx.unproject(x - d, y + d);
        Geometry::Polygon(vec![vec![
            top_left,
            top_right,
            bottom_right,
            bottom_left,
            top_left,
        ]])
    }
}

/// Replaces a raw pointer coordinate with a nearby existing vertex from
/// another feature, within tolerance.
pub struct SnappingBehavior {
    ctx: Rc<ModeContext>,
    click_bbox: ClickBoundingBoxBehavior,
    pixel_distance: PixelDistanceBehavior,
}

impl SnappingBehavior {
    pub fn new(ctx: Rc<ModeContext>) -> Self {
        Self {
            click_bbox: ClickBoundingBoxBehavior::new(Rc::clone(&ctx)),
            pixel_distance: PixelDistanceBehavior::new(Rc::clone(&ctx)),
            ctx,
        }
    }

    /// Closest vertex of any feature other than `exclude` within pointer
    /// tolerance of the event, or `None` when nothing snaps.
    pub fn snap(&self, event: &PointerEvent, exclude: Option<&FeatureId>) -> Option<Position> {
        let area = self.click_bbox.create(event);
        let candidates = self.ctx.store.borrow().search(&area, None);

        let mut best: Option<(f64, Position)> = None;
        for feature in &candidates {
            if exclude.is_some_and(|id| id == &feature.id) {
                continue;
            }
            for vertex in feature_vertices(feature) {
                let distance = self.pixel_distance.measure(event, vertex);
                if distance <= self.ctx.pointer_distance
                    && best.is_none_or(|(closest, _)| distance < closest)
                {
                    best = Some((distance, vertex));
                }
            }
        }
        best.map(|(_, vertex)| vertex)
    }
}

/// Every vertex of a feature's geometry, closing coordinates included.
pub(crate) fn feature_vertices(feature: &Feature) -> Vec<Position> {
    match &feature.geometry {
        Geometry::Point(position) => vec![*position],
        Geometry::LineString(coords) => coords.clone(),
        Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::{Key, MouseButton, PointerEvent};
    use crate::store::{FeatureSpec, StoreConfig};
    use crate::geometry::Properties;

    /// Identity-ish projection: one degree equals 100 pixels.
    fn test_context(store: Rc<RefCell<FeatureStore>>) -> Rc<ModeContext> {
        Rc::new(ModeContext {
            store,
            project: Box::new(|lng, lat| (lng * 100.0, -lat * 100.0)),
            unproject: Box::new(|x, y| (x / 100.0, -y / 100.0)),
            set_cursor: Box::new(|_| {}),
            on_select: Box::new(|_| {}),
            on_deselect: Box::new(|_| {}),
            pointer_distance: 15.0,
            coordinate_precision: 9,
        })
    }

    fn click_at(lng: f64, lat: f64) -> PointerEvent {
        PointerEvent {
            lng,
            lat,
            container_x: lng * 100.0,
            container_y: -lat * 100.0,
            button: MouseButton::Left,
            held_keys: Vec::<Key>::new(),
        }
    }

    #[test]
    fn pixel_distance_measures_in_screen_space() {
        let store = Rc::new(RefCell::new(FeatureStore::new()));
        let behavior = PixelDistanceBehavior::new(test_context(store));

        let event = click_at(0.0, 0.0);
        let distance = behavior.measure(&event, [0.1, 0.0]);
        assert!((distance - 10.0).abs() < 1e-9);
        assert!(behavior.within_tolerance(&event, [0.1, 0.0]));
        assert!(!behavior.within_tolerance(&event, [1.0, 0.0]));
    }

    #[test]
    fn click_bbox_covers_tolerance_square() {
        let store = Rc::new(RefCell::new(FeatureStore::new()));
        let behavior = ClickBoundingBoxBehavior::new(test_context(store));

        let area = behavior.create(&click_at(0.0, 0.0));
        let Geometry::Polygon(rings) = &area else {
            panic!("click bbox should be a polygon");
        };
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0].first(), rings[0].last());
        // 15px tolerance at 100px per degree spans 0.15 degrees.
        assert!((rings[0][0][0] - -0.15).abs() < 1e-9);
    }

    #[test]
    fn snapping_returns_nearby_vertex_of_other_feature() {
        let store = Rc::new(RefCell::new(FeatureStore::with_config(StoreConfig {
            tracked: false,
            coordinate_precision: 9,
        })));
        let ids = store
            .borrow_mut()
            .create(vec![FeatureSpec::with_properties(
                Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]),
                Properties::new(),
            )])
            .unwrap();

        let behavior = SnappingBehavior::new(test_context(Rc::clone(&store)));

        // Pointer 0.05 degrees (5px) away from the [1, 1] vertex.
        let snapped = behavior.snap(&click_at(1.05, 1.0), None);
        assert_eq!(snapped, Some([1.0, 1.0]));

        // The in-progress feature itself never snaps.
        let excluded = behavior.snap(&click_at(1.05, 1.0), Some(&ids[0]));
        assert_eq!(excluded, None);

        // Far away from every vertex: no snap.
        let none = behavior.snap(&click_at(5.0, 5.0), None);
        assert_eq!(none, None);
    }
}

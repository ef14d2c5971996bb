//! LineString authoring mode.
//!
//! Each click appends a committed vertex and keeps one provisional "live"
//! vertex at the end of the line that mouse movement overwrites. A click
//! within pointer tolerance of the first vertex, or Enter, finishes the
//! line; Escape cancels it.

use super::{
    mode_properties, validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling,
};
use crate::behaviors::{PixelDistanceBehavior, SnappingBehavior};
use crate::geometry::planar::self_intersects;
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::store::{FeatureSpec, GeometryUpdate, Validation};
use std::rc::Rc;

const MODE_NAME: &str = "linestring";

/// Configuration for [`LineStringMode`].
#[derive(Debug, Clone, Copy)]
pub struct LineStringOptions {
    /// When false, a click or pointer move whose candidate geometry would
    /// cross an earlier segment is skipped, leaving the last valid geometry
    /// in place.
    pub allow_self_intersection: bool,
    /// When true, clicked coordinates snap to nearby vertices of other
    /// features.
    pub snapping: bool,
}

impl Default for LineStringOptions {
    fn default() -> Self {
        Self {
            allow_self_intersection: false,
            snapping: false,
        }
    }
}

pub struct LineStringMode {
    base: ModeBase,
    options: LineStringOptions,
    /// Provisional feature being authored, present only between the first
    /// click and finish/cancel.
    current_id: Option<FeatureId>,
    /// Number of committed vertices; the stored line always carries one
    /// extra live vertex after them.
    committed: usize,
    snapping: Option<SnappingBehavior>,
    pixel_distance: Option<PixelDistanceBehavior>,
}

impl LineStringMode {
    pub fn new(options: LineStringOptions) -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            options,
            current_id: None,
            committed: 0,
            snapping: None,
            pixel_distance: None,
        }
    }

    fn snapped_position(&self, event: &PointerEvent) -> Position {
        if self.options.snapping
            && let Some(behavior) = &self.snapping
            && let Some(vertex) = behavior.snap(event, self.current_id.as_ref())
        {
            return vertex;
        }
        event.position()
    }

    fn current_coords(&self) -> Option<(FeatureId, Vec<Position>)> {
        let id = self.current_id.clone()?;
        let ctx = self.base.context()?;
        match ctx.store.borrow().get_geometry_copy(&id) {
            Ok(Geometry::LineString(coords)) => Some((id, coords)),
            _ => None,
        }
    }

    fn write_coords(&self, id: FeatureId, coords: Vec<Position>) {
        let Some(ctx) = self.base.context() else {
            return;
        };
        let update = GeometryUpdate {
            id,
            geometry: Geometry::LineString(coords),
        };
        if let Err(err) = ctx.store.borrow_mut().update_geometry(vec![update]) {
            log::warn!("LineString mode failed to update geometry: {err}");
        }
    }

    /// Commits the line as-is, dropping the live vertex.
    fn finish(&mut self) {
        let Some((id, coords)) = self.current_coords() else {
            return;
        };
        if self.committed < 2 {
            // Not enough committed vertices for a line; cancel instead.
            self.clean_up();
            return;
        }
        let final_coords: Vec<Position> = coords[..self.committed].to_vec();
        self.write_coords(id, final_coords);
        self.current_id = None;
        self.committed = 0;
        self.base.set_started();
    }
}

impl Default for LineStringMode {
    fn default() -> Self {
        Self::new(LineStringOptions::default())
    }
}

impl Mode for LineStringMode {
    fn name(&self) -> &'static str {
        MODE_NAME
    }

    fn base(&self) -> &ModeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModeBase {
        &mut self.base
    }

    fn on_register(&mut self) {
        if let Some(ctx) = self.base.context() {
            self.snapping = Some(SnappingBehavior::new(Rc::clone(ctx)));
            self.pixel_distance = Some(PixelDistanceBehavior::new(Rc::clone(ctx)));
        }
    }

    fn on_click(&mut self, event: &PointerEvent) {
        let Some(ctx) = self.base.active_context() else {
            return;
        };
        let coord = self.snapped_position(event);

        let Some((id, mut coords)) = self.current_coords() else {
            // First click: one committed vertex plus the live vertex.
            let spec = FeatureSpec::with_properties(
                Geometry::LineString(vec![coord, coord]),
                mode_properties(MODE_NAME),
            );
            match ctx.store.borrow_mut().create(vec![spec]) {
                Ok(mut ids) => {
                    self.current_id = ids.pop();
                    self.committed = 1;
                    self.base.set_drawing();
                }
                Err(err) => log::warn!("LineString mode failed to start feature: {err}"),
            }
            return;
        };

        // A click near the first vertex closes the line once it has at
        // least two committed vertices.
        if self.committed >= 2
            && let Some(behavior) = &self.pixel_distance
            && behavior.within_tolerance(event, coords[0])
        {
            self.finish();
            return;
        }

        // Commit the live vertex at the clicked position and open a new one.
        let live = coords.len() - 1;
        coords[live] = coord;
        if !self.options.allow_self_intersection && self_intersects(&coords) {
            log::debug!("LineString click skipped: candidate segment self-intersects");
            return;
        }
        coords.push(coord);
        self.committed += 1;
        self.write_coords(id, coords);
    }

    fn on_mouse_move(&mut self, event: &PointerEvent) {
        if !self.base.is_drawing() {
            return;
        }
        let Some((id, mut coords)) = self.current_coords() else {
            return;
        };
        let live = coords.len() - 1;
        coords[live] = self.snapped_position(event);
        if !self.options.allow_self_intersection && self_intersects(&coords) {
            // Skip the update, leaving the last valid geometry in place.
            return;
        }
        self.write_coords(id, coords);
    }

    fn on_key_down(&mut self, event: &mut KeyEvent) {
        match event.key {
            Key::Enter => {
                if self.current_id.is_some() {
                    event.prevent_default();
                    self.finish();
                }
            }
            Key::Escape => {
                if self.current_id.is_some() {
                    event.prevent_default();
                    self.clean_up();
                }
            }
            _ => {}
        }
    }

    fn clean_up(&mut self) {
        if let Some(id) = self.current_id.take()
            && let Some(ctx) = self.base.context()
            && let Err(err) = ctx.store.borrow_mut().delete(&[id])
        {
            log::warn!("LineString mode failed to discard provisional feature: {err}");
        }
        self.committed = 0;
        self.base.set_started();
    }

    fn style_feature(&self, _feature: &Feature) -> Styling {
        Styling::default()
    }

    fn validate_feature(&self, feature: &Feature) -> Validation {
        validate_mode_feature(feature, MODE_NAME, "LineString")
    }
}

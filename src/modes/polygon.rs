//! Polygon authoring mode.
//!
//! Clicks commit outer-ring vertices while the cursor drives a live vertex.
//! The stored ring is padded with the live vertex until it reaches the
//! minimum closed-ring length, so the provisional feature is always valid
//! GeoJSON. A click within pointer tolerance of the first vertex closes the
//! ring once three vertices are committed.

use super::{
    mode_properties, validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling,
};
use crate::behaviors::{PixelDistanceBehavior, SnappingBehavior};
use crate::geometry::planar::self_intersects;
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::store::{FeatureSpec, GeometryUpdate, Validation};
use std::rc::Rc;

const MODE_NAME: &str = "polygon";

/// Configuration for [`PolygonMode`].
#[derive(Debug, Clone, Copy)]
pub struct PolygonOptions {
    /// When false, candidate rings that cross themselves are skipped.
    pub allow_self_intersection: bool,
    /// When true, clicked coordinates snap to nearby vertices of other
    /// features.
    pub snapping: bool,
}

impl Default for PolygonOptions {
    fn default() -> Self {
        Self {
            allow_self_intersection: false,
            snapping: false,
        }
    }
}

pub struct PolygonMode {
    base: ModeBase,
    options: PolygonOptions,
    current_id: Option<FeatureId>,
    /// Committed outer-ring vertices, in click order, exclusive of the live
    /// vertex and the closing coordinate.
    committed: Vec<Position>,
    snapping: Option<SnappingBehavior>,
    pixel_distance: Option<PixelDistanceBehavior>,
}

impl PolygonMode {
    pub fn new(options: PolygonOptions) -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            options,
            current_id: None,
            committed: Vec::new(),
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

    /// Closed outer ring for the committed vertices plus the live cursor
    /// vertex, padded with the live vertex until it holds three distinct
    /// slots before the closing coordinate.
    fn build_ring(&self, live: Position) -> Vec<Position> {
        let mut ring = self.committed.clone();
        ring.push(live);
        while ring.len() < 3 {
            ring.push(live);
        }
        ring.push(ring[0]);
        ring
    }

    fn write_ring(&self, id: FeatureId, ring: Vec<Position>) {
        let Some(ctx) = self.base.context() else {
            return;
        };
        let update = GeometryUpdate {
            id,
            geometry: Geometry::Polygon(vec![ring]),
        };
        if let Err(err) = ctx.store.borrow_mut().update_geometry(vec![update]) {
            log::warn!("Polygon mode failed to update geometry: {err}");
        }
    }

    fn ring_acceptable(&self, ring: &[Position]) -> bool {
        self.options.allow_self_intersection || !self_intersects(ring)
    }

    /// Commits the ring made of only the committed vertices, closed.
    fn finish(&mut self) {
        let Some(id) = self.current_id.take() else {
            return;
        };
        if self.committed.len() < 3 {
            // Not enough vertices for a polygon; discard instead.
            self.current_id = Some(id);
            self.clean_up();
            return;
        }
        let mut ring = std::mem::take(&mut self.committed);
        ring.push(ring[0]);
        self.write_ring(id, ring);
        self.base.set_started();
    }
}

impl Default for PolygonMode {
    fn default() -> Self {
        Self::new(PolygonOptions::default())
    }
}

impl Mode for PolygonMode {
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

        let Some(id) = self.current_id.clone() else {
            // First click opens the provisional feature as a degenerate
            // (but well-formed) ring collapsed onto the first vertex.
            self.committed = vec![coord];
            let ring = self.build_ring(coord);
            let spec = FeatureSpec::with_properties(
                Geometry::Polygon(vec![ring]),
                mode_properties(MODE_NAME),
            );
            match ctx.store.borrow_mut().create(vec![spec]) {
                Ok(mut ids) => {
                    self.current_id = ids.pop();
                    self.base.set_drawing();
                }
                Err(err) => {
                    self.committed.clear();
                    log::warn!("Polygon mode failed to start feature: {err}");
                }
            }
            return;
        };

        // A click near the first vertex closes the ring once three vertices
        // are committed.
        if self.committed.len() >= 3
            && let Some(behavior) = &self.pixel_distance
            && behavior.within_tolerance(event, self.committed[0])
        {
            self.finish();
            return;
        }

        let mut candidate = self.committed.clone();
        candidate.push(coord);
        let mut ring = candidate.clone();
        while ring.len() < 3 {
            ring.push(coord);
        }
        ring.push(ring[0]);
        if !self.ring_acceptable(&ring) {
            log::debug!("Polygon click skipped: candidate ring self-intersects");
            return;
        }
        self.committed = candidate;
        self.write_ring(id, ring);
    }

    fn on_mouse_move(&mut self, event: &PointerEvent) {
        if !self.base.is_drawing() {
            return;
        }
        let Some(id) = self.current_id.clone() else {
            return;
        };
        let ring = self.build_ring(self.snapped_position(event));
        if !self.ring_acceptable(&ring) {
            return;
        }
        self.write_ring(id, ring);
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
            log::warn!("Polygon mode failed to discard provisional feature: {err}");
        }
        self.committed.clear();
        self.base.set_started();
    }

    fn style_feature(&self, _feature: &Feature) -> Styling {
        Styling::default()
    }

    fn validate_feature(&self, feature: &Feature) -> Validation {
        validate_mode_feature(feature, MODE_NAME, "Polygon")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::test_support::{click, registered};
    use crate::modes::ModeState;

    fn ring_of(store: &crate::store::FeatureStore, id: &FeatureId) -> Vec<Position> {
        match store.get_geometry_copy(id).unwrap() {
            Geometry::Polygon(mut rings) => rings.remove(0),
            other => panic!("expected Polygon, got {other:?}"),
        }
    }

    #[test]
    fn first_click_creates_degenerate_closed_ring() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(2.0, 3.0));

        assert_eq!(mode.state(), ModeState::Drawing);
        let id = mode.current_id.clone().unwrap();
        let ring = ring_of(&store.borrow(), &id);
        assert_eq!(ring, vec![[2.0, 3.0]; 4]);
    }

    #[test]
    fn closing_click_yields_committed_ring_only() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(1.0, 1.0));
        mode.on_click(&click(1.0, 0.0));
        let id = mode.current_id.clone().unwrap();

        // Within 15px (0.15 degrees) of the first vertex.
        mode.on_click(&click(0.05, 0.0));

        assert_eq!(mode.state(), ModeState::Started);
        assert!(mode.current_id.is_none());
        assert_eq!(
            ring_of(&store.borrow(), &id),
            vec![[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]
        );
    }

    #[test]
    fn four_distinct_vertices_close_into_one_ring() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(3.0, 0.0));
        mode.on_click(&click(3.0, 3.0));
        mode.on_click(&click(0.0, 3.0));
        let id = mode.current_id.clone().unwrap();

        mode.on_click(&click(0.0, 0.05));

        assert_eq!(store.borrow().size(), 1);
        let ring = ring_of(&store.borrow(), &id);
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn mouse_move_drives_live_vertex() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(2.0, 0.0));
        let id = mode.current_id.clone().unwrap();

        mode.on_mouse_move(&click(1.0, 2.0));
        assert_eq!(
            ring_of(&store.borrow(), &id),
            vec![[0.0, 0.0], [2.0, 0.0], [1.0, 2.0], [0.0, 0.0]]
        );
    }

    #[test]
    fn self_intersecting_candidate_is_skipped() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(4.0, 0.0));
        mode.on_click(&click(4.0, 4.0));
        mode.on_click(&click(0.0, 4.0));
        let id = mode.current_id.clone().unwrap();
        let before = ring_of(&store.borrow(), &id);

        // A bow-tie vertex crossing the bottom edge is rejected.
        mode.on_click(&click(2.0, -2.0));
        assert_eq!(ring_of(&store.borrow(), &id), before);
        assert_eq!(mode.committed.len(), 4);
    }

    #[test]
    fn escape_discards_provisional_polygon() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(1.0, 0.0));
        assert_eq!(store.borrow().size(), 1);

        let mut escape = KeyEvent::new(Key::Escape);
        mode.on_key_down(&mut escape);
        assert!(escape.is_default_prevented());
        assert_eq!(store.borrow().size(), 0);
        assert_eq!(mode.state(), ModeState::Started);
    }

    #[test]
    fn enter_with_too_few_vertices_cancels() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(1.0, 0.0));

        let mut enter = KeyEvent::new(Key::Enter);
        mode.on_key_down(&mut enter);
        assert_eq!(store.borrow().size(), 0);
        assert!(mode.current_id.is_none());
    }

    #[test]
    fn enter_with_three_vertices_finishes() {
        let (mut mode, store) = registered(PolygonMode::default());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(1.0, 0.0));
        mode.on_click(&click(1.0, 1.0));
        let id = mode.current_id.clone().unwrap();

        let mut enter = KeyEvent::new(Key::Enter);
        mode.on_key_down(&mut enter);
        assert_eq!(
            ring_of(&store.borrow(), &id),
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]
        );
    }
}

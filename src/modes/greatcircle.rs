//! Two-click great-circle arc mode.
//!
//! The first click fixes the start; mouse movement re-samples the shortest
//! spherical path to the cursor as a 100-segment LineString; the second
//! click commits.

use super::{
    mode_properties, validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling,
};
use crate::geometry::spherical::great_circle_points;
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::store::{FeatureSpec, GeometryUpdate, Validation};

const MODE_NAME: &str = "greatcircle";
const SEGMENTS: usize = 100;

pub struct GreatCircleMode {
    base: ModeBase,
    start: Option<Position>,
    current_id: Option<FeatureId>,
}

impl GreatCircleMode {
    pub fn new() -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            start: None,
            current_id: None,
        }
    }

    fn write_arc(&self, cursor: Position) {
        let (Some(ctx), Some(start), Some(id)) =
            (self.base.context(), self.start, self.current_id.clone())
        else {
            return;
        };
        let update = GeometryUpdate {
            id,
            geometry: Geometry::LineString(great_circle_points(start, cursor, SEGMENTS)),
        };
        if let Err(err) = ctx.store.borrow_mut().update_geometry(vec![update]) {
            log::warn!("Great circle mode failed to update geometry: {err}");
        }
    }
}

impl Default for GreatCircleMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for GreatCircleMode {
    fn name(&self) -> &'static str {
        MODE_NAME
    }

    fn base(&self) -> &ModeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModeBase {
        &mut self.base
    }

    fn on_click(&mut self, event: &PointerEvent) {
        let Some(ctx) = self.base.active_context() else {
            return;
        };
        let position = event.position();

        if self.current_id.is_none() {
            let spec = FeatureSpec::with_properties(
                Geometry::LineString(great_circle_points(position, position, SEGMENTS)),
                mode_properties(MODE_NAME),
            );
            match ctx.store.borrow_mut().create(vec![spec]) {
                Ok(mut ids) => {
                    self.current_id = ids.pop();
                    self.start = Some(position);
                    self.base.set_drawing();
                }
                Err(err) => log::warn!("Great circle mode failed to start feature: {err}"),
            }
            return;
        }

        self.write_arc(position);
        self.start = None;
        self.current_id = None;
        self.base.set_started();
    }

    fn on_mouse_move(&mut self, event: &PointerEvent) {
        if !self.base.is_drawing() {
            return;
        }
        self.write_arc(event.position());
    }

    fn on_key_down(&mut self, event: &mut KeyEvent) {
        if event.key == Key::Escape && self.current_id.is_some() {
            event.prevent_default();
            self.clean_up();
        }
    }

    fn clean_up(&mut self) {
        if let Some(id) = self.current_id.take()
            && let Some(ctx) = self.base.context()
            && let Err(err) = ctx.store.borrow_mut().delete(&[id])
        {
            log::warn!("Great circle mode failed to discard provisional feature: {err}");
        }
        self.start = None;
        self.base.set_started();
    }

    fn style_feature(&self, _feature: &Feature) -> Styling {
        Styling::default()
    }

    fn validate_feature(&self, feature: &Feature) -> Validation {
        validate_mode_feature(feature, MODE_NAME, "LineString")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::test_support::{click, registered};
    use crate::modes::ModeState;

    fn coords_of(store: &crate::store::FeatureStore, id: &FeatureId) -> Vec<Position> {
        match store.get_geometry_copy(id).unwrap() {
            Geometry::LineString(coords) => coords,
            other => panic!("expected LineString, got {other:?}"),
        }
    }

    #[test]
    fn arc_is_resampled_between_endpoints() {
        let (mut mode, store) = registered(GreatCircleMode::new());
        mode.on_click(&click(0.0, 0.0));
        let id = mode.current_id.clone().unwrap();

        mode.on_mouse_move(&click(90.0, 0.0));
        let coords = coords_of(&store.borrow(), &id);
        assert_eq!(coords.len(), SEGMENTS + 1);
        assert!((coords[0][0]).abs() < 1e-6);
        assert!((coords[SEGMENTS][0] - 90.0).abs() < 1e-6);
        // Equatorial arc stays on the equator at the midpoint.
        assert!((coords[SEGMENTS / 2][0] - 45.0).abs() < 1e-6);
        assert!((coords[SEGMENTS / 2][1]).abs() < 1e-6);

        mode.on_click(&click(90.0, 0.0));
        assert_eq!(mode.state(), ModeState::Started);
        assert!(mode.current_id.is_none());
    }

    #[test]
    fn escape_cancels_in_progress_arc() {
        let (mut mode, store) = registered(GreatCircleMode::new());
        mode.on_click(&click(0.0, 0.0));
        assert_eq!(store.borrow().size(), 1);

        let mut escape = KeyEvent::new(Key::Escape);
        mode.on_key_down(&mut escape);
        assert_eq!(store.borrow().size(), 0);
    }
}

//! Two-click geodesic circle mode.
//!
//! The first click fixes the center; mouse movement stretches the radius;
//! the second click commits. The circle is stored as a 64-segment polygon
//! approximation, with the radius recorded in kilometers on the feature's
//! properties.

use super::{
    mode_properties, validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling,
};
use crate::geometry::spherical::{circle_ring, haversine_distance};
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::store::{FeatureSpec, GeometryUpdate, PropertyUpdate, Validation};
use serde_json::Value;

const MODE_NAME: &str = "circle";
const SEGMENTS: usize = 64;

pub struct CircleMode {
    base: ModeBase,
    center: Option<Position>,
    current_id: Option<FeatureId>,
}

impl CircleMode {
    pub fn new() -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            center: None,
            current_id: None,
        }
    }

    fn write_radius(&self, cursor: Position) -> Option<f64> {
        let (Some(ctx), Some(center), Some(id)) =
            (self.base.context(), self.center, self.current_id.clone())
        else {
            return None;
        };
        let radius_m = haversine_distance(center, cursor);
        let update = GeometryUpdate {
            id,
            geometry: Geometry::Polygon(vec![circle_ring(center, radius_m, SEGMENTS)]),
        };
        if let Err(err) = ctx.store.borrow_mut().update_geometry(vec![update]) {
            log::warn!("Circle mode failed to update geometry: {err}");
            return None;
        }
        Some(radius_m)
    }
}

impl Default for CircleMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for CircleMode {
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

        let Some(id) = self.current_id.clone() else {
            // First click: zero-radius ring collapsed on the center.
            let spec = FeatureSpec::with_properties(
                Geometry::Polygon(vec![circle_ring(position, 0.0, SEGMENTS)]),
                mode_properties(MODE_NAME),
            );
            match ctx.store.borrow_mut().create(vec![spec]) {
                Ok(mut ids) => {
                    self.current_id = ids.pop();
                    self.center = Some(position);
                    self.base.set_drawing();
                }
                Err(err) => log::warn!("Circle mode failed to start feature: {err}"),
            }
            return;
        };

        // Second click commits the radius under the cursor.
        if let Some(radius_m) = self.write_radius(position) {
            let update = PropertyUpdate {
                id,
                key: "radiusKilometers".to_string(),
                value: Value::from(radius_m / 1000.0),
            };
            if let Err(err) = ctx.store.borrow_mut().update_property(vec![update]) {
                log::warn!("Circle mode failed to record radius: {err}");
            }
        }
        self.center = None;
        self.current_id = None;
        self.base.set_started();
    }

    fn on_mouse_move(&mut self, event: &PointerEvent) {
        if !self.base.is_drawing() {
            return;
        }
        self.write_radius(event.position());
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
            log::warn!("Circle mode failed to discard provisional feature: {err}");
        }
        self.center = None;
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
    fn first_click_creates_zero_radius_ring() {
        let (mut mode, store) = registered(CircleMode::new());
        mode.on_click(&click(10.0, 20.0));

        assert_eq!(mode.state(), ModeState::Drawing);
        let id = mode.current_id.clone().unwrap();
        let ring = ring_of(&store.borrow(), &id);
        assert_eq!(ring.len(), SEGMENTS + 1);
        assert_eq!(ring.first(), ring.last());
        for vertex in &ring {
            assert!((vertex[0] - 10.0).abs() < 1e-6);
            assert!((vertex[1] - 20.0).abs() < 1e-6);
        }
    }

    #[test]
    fn second_click_commits_radius_property() {
        let (mut mode, store) = registered(CircleMode::new());
        mode.on_click(&click(0.0, 0.0));
        let id = mode.current_id.clone().unwrap();

        // One degree of latitude is roughly 111 km on the sphere.
        mode.on_click(&click(0.0, 1.0));

        assert_eq!(mode.state(), ModeState::Started);
        let store = store.borrow();
        let radius_km = store
            .get_properties_copy(&id)
            .unwrap()
            .get("radiusKilometers")
            .and_then(serde_json::Value::as_f64)
            .unwrap();
        assert!((radius_km - 111.0).abs() < 1.0, "radius was {radius_km}");

        let ring = ring_of(&store, &id);
        for vertex in &ring[..SEGMENTS] {
            let d = crate::geometry::spherical::haversine_distance([0.0, 0.0], *vertex);
            assert!((d / 1000.0 - radius_km).abs() < 0.5);
        }
    }

    #[test]
    fn escape_cancels_in_progress_circle() {
        let (mut mode, store) = registered(CircleMode::new());
        mode.on_click(&click(0.0, 0.0));
        assert_eq!(store.borrow().size(), 1);

        let mut escape = KeyEvent::new(Key::Escape);
        mode.on_key_down(&mut escape);
        assert_eq!(store.borrow().size(), 0);
        assert_eq!(mode.state(), ModeState::Started);
    }
}

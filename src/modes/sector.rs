//! Three-click circle-sector mode.
//!
//! The first click fixes the center, the second fixes the radius arm, and
//! cursor movement sweeps the arc out from the arm. The sweep direction is
//! inferred from the first cursor movement after the arm is placed and held
//! for the rest of the gesture; cursor positions that would sweep the other
//! way are rejected. The third click commits.

use super::{
    mode_properties, validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling,
};
use crate::geometry::planar::is_clockwise_web_mercator;
use crate::geometry::spherical::{destination, haversine_distance, web_mercator_bearing};
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::store::{FeatureSpec, GeometryUpdate, Validation};

const MODE_NAME: &str = "sector";
const ARC_SEGMENTS: usize = 64;

pub struct SectorMode {
    base: ModeBase,
    center: Option<Position>,
    /// End of the radius arm fixed by the second click.
    radius_point: Option<Position>,
    /// Sweep direction inferred on the first cursor move after the arm is
    /// placed, then held for the rest of the gesture.
    clockwise: Option<bool>,
    current_id: Option<FeatureId>,
}

/// Closed ring for the sector swept from the arm to `cursor`.
fn sector_ring(
    center: Position,
    radius_point: Position,
    cursor: Position,
    clockwise: bool,
) -> Vec<Position> {
    let radius_m = haversine_distance(center, radius_point);
    let start = web_mercator_bearing(center, radius_point);
    let end = web_mercator_bearing(center, cursor);
    let sweep = if clockwise {
        (end - start).rem_euclid(360.0)
    } else {
        (start - end).rem_euclid(360.0)
    };

    let mut ring = Vec::with_capacity(ARC_SEGMENTS + 3);
    ring.push(center);
    for i in 0..=ARC_SEGMENTS {
        let offset = sweep * i as f64 / ARC_SEGMENTS as f64;
        let bearing_deg = if clockwise {
            start + offset
        } else {
            start - offset
        };
        ring.push(destination(center, radius_m, bearing_deg));
    }
    ring.push(center);
    ring
}

impl SectorMode {
    pub fn new() -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            center: None,
            radius_point: None,
            clockwise: None,
            current_id: None,
        }
    }

    fn reset(&mut self) {
        self.center = None;
        self.radius_point = None;
        self.clockwise = None;
        self.current_id = None;
    }

    /// Recomputes the swept ring for `cursor`, holding the inferred sweep
    /// direction. Returns false when the cursor sits on the wrong side of
    /// the arm for the held direction.
    fn sweep_to(&mut self, cursor: Position) -> bool {
        let (Some(center), Some(radius_point), Some(id)) =
            (self.center, self.radius_point, self.current_id.clone())
        else {
            return false;
        };
        let Some(ctx) = self.base.context() else {
            return false;
        };

        let cursor_clockwise = is_clockwise_web_mercator(center, radius_point, cursor);
        let clockwise = *self.clockwise.get_or_insert(cursor_clockwise);
        if cursor_clockwise != clockwise {
            log::debug!("Sector cursor rejected: sweep direction is held for the gesture");
            return false;
        }

        let update = GeometryUpdate {
            id,
            geometry: Geometry::Polygon(vec![sector_ring(center, radius_point, cursor, clockwise)]),
        };
        if let Err(err) = ctx.store.borrow_mut().update_geometry(vec![update]) {
            log::warn!("Sector mode failed to update geometry: {err}");
            return false;
        }
        true
    }
}

impl Default for SectorMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for SectorMode {
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

        let Some(center) = self.center else {
            self.center = Some(position);
            self.base.set_drawing();
            return;
        };

        if self.radius_point.is_none() {
            if position == center {
                log::debug!("Sector arm click skipped: coincides with the center");
                return;
            }
            // Degenerate sector: the arm swept zero degrees.
            let spec = FeatureSpec::with_properties(
                Geometry::Polygon(vec![vec![center, position, position, center]]),
                mode_properties(MODE_NAME),
            );
            match ctx.store.borrow_mut().create(vec![spec]) {
                Ok(mut ids) => {
                    self.current_id = ids.pop();
                    self.radius_point = Some(position);
                }
                Err(err) => log::warn!("Sector mode failed to start feature: {err}"),
            }
            return;
        }

        // Third click commits the sweep under the cursor (or the last valid
        // sweep when the cursor sits on the rejected side).
        self.sweep_to(position);
        self.reset();
        self.base.set_started();
    }

    fn on_mouse_move(&mut self, event: &PointerEvent) {
        if !self.base.is_drawing() || self.radius_point.is_none() {
            return;
        }
        self.sweep_to(event.position());
    }

    fn on_key_down(&mut self, event: &mut KeyEvent) {
        if event.key == Key::Escape && self.center.is_some() {
            event.prevent_default();
            self.clean_up();
        }
    }

    fn clean_up(&mut self) {
        if let Some(id) = self.current_id.take()
            && let Some(ctx) = self.base.context()
            && let Err(err) = ctx.store.borrow_mut().delete(&[id])
        {
            log::warn!("Sector mode failed to discard provisional feature: {err}");
        }
        self.reset();
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
    fn first_two_clicks_fix_center_and_arm() {
        let (mut mode, store) = registered(SectorMode::new());

        mode.on_click(&click(0.0, 0.0));
        assert_eq!(mode.state(), ModeState::Drawing);
        assert_eq!(store.borrow().size(), 0);

        mode.on_click(&click(1.0, 0.0));
        let id = mode.current_id.clone().unwrap();
        let ring = ring_of(&store.borrow(), &id);
        assert_eq!(ring.first(), Some(&[0.0, 0.0]));
        assert_eq!(ring.last(), Some(&[0.0, 0.0]));
        assert_eq!(ring[1], [1.0, 0.0]);
    }

    #[test]
    fn arm_click_on_center_is_skipped() {
        let (mut mode, store) = registered(SectorMode::new());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(0.0, 0.0));
        assert_eq!(store.borrow().size(), 0);
        assert!(mode.radius_point.is_none());
    }

    #[test]
    fn first_move_locks_the_sweep_direction() {
        let (mut mode, store) = registered(SectorMode::new());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(1.0, 0.0));
        let id = mode.current_id.clone().unwrap();

        // Arm points east; moving the cursor south of it sweeps clockwise
        // (bearings grow from 90 toward 180 in screen space).
        mode.on_mouse_move(&click(0.5, -0.5));
        assert_eq!(mode.clockwise, Some(true));
        let swept = ring_of(&store.borrow(), &id);
        assert!(swept.len() > 4);

        // A cursor on the counterclockwise side is rejected outright.
        mode.on_mouse_move(&click(0.5, 0.5));
        assert_eq!(ring_of(&store.borrow(), &id), swept);
    }

    #[test]
    fn third_click_commits_the_sector() {
        let (mut mode, store) = registered(SectorMode::new());
        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(1.0, 0.0));
        let id = mode.current_id.clone().unwrap();
        mode.on_mouse_move(&click(0.5, -0.5));

        mode.on_click(&click(0.0, -1.0));
        assert_eq!(mode.state(), ModeState::Started);
        assert!(mode.current_id.is_none());

        let ring = ring_of(&store.borrow(), &id);
        // Quarter sweep from east to south: last arc vertex points south.
        let tail = ring[ring.len() - 2];
        assert!(tail[1] < -0.9, "arc should end near [0, -1], got {tail:?}");
        // Arc radius holds along the sweep.
        let radius = haversine_distance([0.0, 0.0], [1.0, 0.0]);
        for vertex in &ring[1..ring.len() - 1] {
            let d = haversine_distance([0.0, 0.0], *vertex);
            assert!((d - radius).abs() / radius < 0.01);
        }
    }

    #[test]
    fn escape_cancels_at_any_stage() {
        let (mut mode, store) = registered(SectorMode::new());
        mode.on_click(&click(0.0, 0.0));

        let mut escape = KeyEvent::new(Key::Escape);
        mode.on_key_down(&mut escape);
        assert_eq!(mode.state(), ModeState::Started);
        assert!(mode.center.is_none());

        mode.on_click(&click(0.0, 0.0));
        mode.on_click(&click(1.0, 0.0));
        assert_eq!(store.borrow().size(), 1);
        let mut escape = KeyEvent::new(Key::Escape);
        mode.on_key_down(&mut escape);
        assert_eq!(store.borrow().size(), 0);
    }
}

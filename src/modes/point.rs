//! Point authoring mode: a single click commits one feature.

use super::{mode_properties, validate_mode_feature, Mode, ModeBase, PointerEvent, Styling};
use crate::geometry::{Feature, Geometry};
use crate::store::{FeatureSpec, Validation};

const MODE_NAME: &str = "point";

/// Simplest mode: every click commits a point feature immediately, so there
/// is never any provisional state to clean up.
pub struct PointMode {
    base: ModeBase,
}

impl PointMode {
    pub fn new() -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
        }
    }
}

impl Default for PointMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for PointMode {
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
        let spec = FeatureSpec::with_properties(
            Geometry::Point(event.position()),
            mode_properties(MODE_NAME),
        );
        if let Err(err) = ctx.store.borrow_mut().create(vec![spec]) {
            log::warn!("Point mode failed to commit feature: {err}");
        }
    }

    fn style_feature(&self, _feature: &Feature) -> Styling {
        Styling::default()
    }

    fn validate_feature(&self, feature: &Feature) -> Validation {
        validate_mode_feature(feature, MODE_NAME, "Point")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::test_support::{click, registered};
    use serde_json::Value;

    #[test]
    fn click_commits_one_point_feature() {
        let (mut mode, store) = registered(PointMode::new());
        mode.on_click(&click(3.0, 4.0));

        let store = store.borrow();
        assert_eq!(store.size(), 1);
        let feature = store.copy_all().pop().unwrap();
        assert_eq!(feature.geometry, Geometry::Point([3.0, 4.0]));
        assert_eq!(
            feature.properties.get("mode"),
            Some(&Value::from("point"))
        );
    }

    #[test]
    fn clicks_before_start_are_ignored() {
        let mut mode = PointMode::new();
        mode.on_click(&click(0.0, 0.0)); // unregistered: no-op, no panic
        assert_eq!(mode.state(), crate::modes::ModeState::Unregistered);
    }

    #[test]
    fn validates_own_features() {
        let (mode, store) = registered(PointMode::new());
        let mut m = store.borrow_mut();
        m.create(vec![crate::store::FeatureSpec::with_properties(
            Geometry::Point([0.0, 0.0]),
            crate::modes::mode_properties("point"),
        )])
        .unwrap();
        let feature = m.copy_all().pop().unwrap();
        assert!(mode.validate_feature(&feature).valid);

        let mut wrong = feature.clone();
        wrong.geometry = Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]);
        assert!(!mode.validate_feature(&wrong).valid);
    }
}

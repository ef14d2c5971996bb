//! Two-click axis-aligned rectangle mode.
//!
//! The first click anchors one corner; mouse movement stretches the
//! opposite corner; the second click commits.

use super::{
    mode_properties, validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling,
};
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::store::{FeatureSpec, GeometryUpdate, Validation};

const MODE_NAME: &str = "rectangle";

pub struct RectangleMode {
    base: ModeBase,
    anchor: Option<Position>,
    current_id: Option<FeatureId>,
}

/// Closed ring spanning the axis-aligned rectangle between two corners.
fn corner_ring(anchor: Position, opposite: Position) -> Vec<Position> {
    let [ax, ay] = anchor;
    let [px, py] = opposite;
    vec![[ax, ay], [px, ay], [px, py], [ax, py], [ax, ay]]
}

impl RectangleMode {
    pub fn new() -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            anchor: None,
            current_id: None,
        }
    }

    fn write_ring(&self, opposite: Position) {
        let (Some(ctx), Some(anchor), Some(id)) =
            (self.base.context(), self.anchor, self.current_id.clone())
        else {
            return;
        };
        let update = GeometryUpdate {
            id,
            geometry: Geometry::Polygon(vec![corner_ring(anchor, opposite)]),
        };
        if let Err(err) = ctx.store.borrow_mut().update_geometry(vec![update]) {
            log::warn!("Rectangle mode failed to update geometry: {err}");
        }
    }
}

impl Default for RectangleMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for RectangleMode {
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
                Geometry::Polygon(vec![corner_ring(position, position)]),
                mode_properties(MODE_NAME),
            );
            match ctx.store.borrow_mut().create(vec![spec]) {
                Ok(mut ids) => {
                    self.current_id = ids.pop();
                    self.anchor = Some(position);
                    self.base.set_drawing();
                }
                Err(err) => log::warn!("Rectangle mode failed to start feature: {err}"),
            }
            return;
        }

        // Second click: stretch to the final corner and commit.
        self.write_ring(position);
        self.anchor = None;
        self.current_id = None;
        self.base.set_started();
    }

    fn on_mouse_move(&mut self, event: &PointerEvent) {
        if !self.base.is_drawing() {
            return;
        }
        self.write_ring(event.position());
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
            log::warn!("Rectangle mode failed to discard provisional feature: {err}");
        }
        self.anchor = None;
        self.base.set_started();
    }

    fn style_feature(&self, _feature: &Feature) -> Styling {
        Styling::default()
    }

    fn validate_feature(&self, feature: &Feature) -> Validation {
        validate_mode_feature(feature, MODE_NAME, "Polygon")
    }
}

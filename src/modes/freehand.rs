//! Freehand scribble mode.
//!
//! A click starts recording, cursor movement streams vertices, and a second
//! click stops. Every Nth pointer move commits a vertex; the moves in
//! between only drive a live trailing vertex, which keeps dense pointer
//! streams from ballooning the geometry.

use super::{
    mode_properties, validate_mode_feature, Key, KeyEvent, Mode, ModeBase, PointerEvent, Styling,
};
use crate::geometry::{Feature, FeatureId, Geometry, Position};
use crate::store::{FeatureSpec, GeometryUpdate, Validation};

const MODE_NAME: &str = "freehand";

#[derive(Debug, Clone, Copy)]
pub struct FreehandOptions {
    /// Every Nth pointer move commits a vertex; moves in between overwrite
    /// the live trailing vertex.
    pub every_nth_event: usize,
}

impl Default for FreehandOptions {
    fn default() -> Self {
        Self { every_nth_event: 10 }
    }
}

pub struct FreehandMode {
    base: ModeBase,
    options: FreehandOptions,
    current_id: Option<FeatureId>,
    move_count: usize,
}

impl FreehandMode {
    pub fn new(options: FreehandOptions) -> Self {
        Self {
            base: ModeBase::new(MODE_NAME),
            options: FreehandOptions {
                every_nth_event: options.every_nth_event.max(1),
            },
            current_id: None,
            move_count: 0,
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
            log::warn!("Freehand mode failed to update geometry: {err}");
        }
    }
}

impl Default for FreehandMode {
    fn default() -> Self {
        Self::new(FreehandOptions::default())
    }
}

impl Mode for FreehandMode {
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

        if self.current_id.is_none() {
            let position = event.position();
            let spec = FeatureSpec::with_properties(
                Geometry::LineString(vec![position, position]),
                mode_properties(MODE_NAME),
            );
            match ctx.store.borrow_mut().create(vec![spec]) {
                Ok(mut ids) => {
                    self.current_id = ids.pop();
                    self.move_count = 0;
                    self.base.set_drawing();
                }
                Err(err) => log::warn!("Freehand mode failed to start feature: {err}"),
            }
            return;
        }

        // Second click stops recording, keeping the geometry as drawn.
        self.current_id = None;
        self.move_count = 0;
        self.base.set_started();
    }

    fn on_mouse_move(&mut self, event: &PointerEvent) {
        if !self.base.is_drawing() {
            return;
        }
        let Some(id) = self.current_id.clone() else {
            return;
        };
        let Some(ctx) = self.base.context() else {
            return;
        };
        let mut coords = match ctx.store.borrow().get_geometry_copy(&id) {
            Ok(Geometry::LineString(coords)) => coords,
            _ => return,
        };

        self.move_count += 1;
        let position = event.position();
        if self.move_count % self.options.every_nth_event == 0 {
            coords.push(position);
        } else if let Some(last) = coords.last_mut() {
            *last = position;
        }
        self.write_coords(id, coords);
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
            log::warn!("Freehand mode failed to discard provisional feature: {err}");
        }
        self.move_count = 0;
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
    fn commits_every_nth_move_and_streams_the_rest() {
        let (mut mode, store) = registered(FreehandMode::new(FreehandOptions {
            every_nth_event: 3,
        }));
        mode.on_click(&click(0.0, 0.0));
        let id = mode.current_id.clone().unwrap();

        // Moves 1 and 2 overwrite the live vertex; move 3 commits one.
        mode.on_mouse_move(&click(0.1, 0.0));
        mode.on_mouse_move(&click(0.2, 0.0));
        assert_eq!(coords_of(&store.borrow(), &id).len(), 2);

        mode.on_mouse_move(&click(0.3, 0.0));
        let coords = coords_of(&store.borrow(), &id);
        assert_eq!(coords.len(), 3);
        assert_eq!(coords.last(), Some(&[0.3, 0.0]));
    }

    #[test]
    fn second_click_stops_recording() {
        let (mut mode, store) = registered(FreehandMode::default());
        mode.on_click(&click(0.0, 0.0));
        let id = mode.current_id.clone().unwrap();
        mode.on_mouse_move(&click(1.0, 0.0));

        mode.on_click(&click(1.0, 0.0));
        assert_eq!(mode.state(), ModeState::Started);
        let before = coords_of(&store.borrow(), &id);

        mode.on_mouse_move(&click(5.0, 5.0));
        assert_eq!(coords_of(&store.borrow(), &id), before);
    }

    #[test]
    fn escape_discards_scribble() {
        let (mut mode, store) = registered(FreehandMode::default());
        mode.on_click(&click(0.0, 0.0));
        assert_eq!(store.borrow().size(), 1);

        let mut escape = KeyEvent::new(Key::Escape);
        mode.on_key_down(&mut escape);
        assert_eq!(store.borrow().size(), 0);
    }
}

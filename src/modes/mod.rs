//! Drawing-mode engine: shared lifecycle contract, event shapes, and the
//! per-mode state machines.
//!
//! Every mode is a finite-state machine over
//! `unregistered → registered → started ⇄ drawing, started → stopped →
//! started…`. Transition violations are fatal to the call and reported as
//! [`ModeError`]s, never silently ignored; state changes only through the
//! lifecycle methods, never by external assignment.

pub mod circle;
pub mod freehand;
pub mod greatcircle;
pub mod linestring;
pub mod point;
pub mod polygon;
pub mod rectangle;
pub mod sector;
pub mod select;
pub mod styling;

pub use circle::CircleMode;
pub use freehand::{FreehandMode, FreehandOptions};
pub use greatcircle::GreatCircleMode;
pub use linestring::{LineStringMode, LineStringOptions};
pub use point::PointMode;
pub use polygon::{PolygonMode, PolygonOptions};
pub use rectangle::RectangleMode;
pub use sector::SectorMode;
pub use select::{DragPermissions, SelectMode};
pub use styling::{Color, Styling};

use crate::behaviors::{Cursor, ModeContext};
use crate::error::ModeError;
use crate::geometry::{Feature, Properties};
use crate::store::Validation;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Lifecycle state of one mode instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeState {
    /// Constructed but not yet bound to a registration context.
    Unregistered,
    /// Bound to a context, not yet receiving events.
    Registered,
    /// Receiving events, no authoring gesture in progress.
    Started,
    /// An authoring gesture is in progress. Purely advisory; callers use it
    /// to know whether "drawing is in progress".
    Drawing,
    /// Stopped after running; may be started again.
    Stopped,
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeState::Unregistered => "unregistered",
            ModeState::Registered => "registered",
            ModeState::Started => "started",
            ModeState::Drawing => "drawing",
            ModeState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Generic key representation for cross-host compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Regular character key
    Char(char),
    /// Enter/Return - finish the in-progress gesture
    Enter,
    /// Escape - cancel the in-progress gesture
    Escape,
    /// Delete - remove the selected feature (select mode)
    Delete,
    /// Unmapped or unrecognized key
    Unknown,
}

/// Mouse button identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Left mouse button (primary authoring button)
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button (currently unused)
    Middle,
}

/// Pointer event fed to modes by the external dispatcher.
///
/// Carries both the geographic coordinate under the pointer and the
/// screen-container coordinate, plus the pressed button and any held keys.
#[derive(Debug, Clone)]
pub struct PointerEvent {
    pub lng: f64,
    pub lat: f64,
    pub container_x: f64,
    pub container_y: f64,
    pub button: MouseButton,
    pub held_keys: Vec<Key>,
}

impl PointerEvent {
    /// The geographic coordinate under the pointer.
    pub fn position(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// Keyboard event with a default-prevention hook.
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: Key,
    prevented: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            prevented: false,
        }
    }

    /// Asks the host to suppress its native handling of this key.
    pub fn prevent_default(&mut self) {
        self.prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.prevented
    }
}

/// Builds the property map every authored feature starts from: the `mode`
/// tag naming the drawing mode that produced it.
pub(crate) fn mode_properties(mode: &'static str) -> Properties {
    let mut properties = Properties::new();
    properties.insert("mode".to_string(), Value::from(mode));
    properties
}

/// Shared lifecycle core composed into every mode (composition over
/// inheritance).
///
/// Owns the mode's state and its registration context; concrete modes
/// delegate all transitions here so the rules are enforced in one place.
pub struct ModeBase {
    name: &'static str,
    state: ModeState,
    ctx: Option<Rc<ModeContext>>,
}

impl ModeBase {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: ModeState::Unregistered,
            ctx: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    /// Binds the registration context. Only legal from `Unregistered`;
    /// registering twice fails.
    pub fn bind(&mut self, ctx: ModeContext) -> Result<(), ModeError> {
        if self.state != ModeState::Unregistered {
            return Err(ModeError::AlreadyRegistered(self.name));
        }
        self.ctx = Some(Rc::new(ctx));
        self.state = ModeState::Registered;
        Ok(())
    }

    /// Transitions to `Started`. Only legal from `Registered` or `Stopped`.
    pub fn begin(&mut self) -> Result<(), ModeError> {
        match self.state {
            ModeState::Registered | ModeState::Stopped => {
                self.state = ModeState::Started;
                Ok(())
            }
            ModeState::Unregistered => Err(ModeError::NotRegistered(self.name)),
            from => Err(ModeError::InvalidTransition {
                mode: self.name,
                from,
                to: ModeState::Started,
            }),
        }
    }

    /// Verifies a stop is legal (`Started` or `Drawing`) without
    /// transitioning yet; the mode runs `clean_up` between this check and
    /// [`mark_stopped`](Self::mark_stopped).
    pub fn ensure_stoppable(&self) -> Result<(), ModeError> {
        match self.state {
            ModeState::Started | ModeState::Drawing => Ok(()),
            ModeState::Unregistered => Err(ModeError::NotRegistered(self.name)),
            from => Err(ModeError::InvalidTransition {
                mode: self.name,
                from,
                to: ModeState::Stopped,
            }),
        }
    }

    /// Completes a stop after cleanup.
    pub fn mark_stopped(&mut self) {
        self.state = ModeState::Stopped;
    }

    /// Enters the advisory `Drawing` state when a gesture begins.
    pub fn set_drawing(&mut self) {
        if self.state == ModeState::Started {
            self.state = ModeState::Drawing;
        }
    }

    /// Returns from `Drawing` to `Started` on finish/cancel.
    pub fn set_started(&mut self) {
        if self.state == ModeState::Drawing {
            self.state = ModeState::Started;
        }
    }

    /// True while the mode receives events (`Started` or `Drawing`).
    pub fn is_active(&self) -> bool {
        matches!(self.state, ModeState::Started | ModeState::Drawing)
    }

    pub fn is_drawing(&self) -> bool {
        self.state == ModeState::Drawing
    }

    pub fn context(&self) -> Option<&Rc<ModeContext>> {
        self.ctx.as_ref()
    }

    /// The registration context, but only while the mode is active.
    /// Event handlers use this to ignore events outside `Started`/`Drawing`.
    pub fn active_context(&self) -> Option<Rc<ModeContext>> {
        if self.is_active() {
            self.ctx.clone()
        } else {
            None
        }
    }
}

/// Uniform lifecycle + event contract every drawing mode implements.
///
/// The lifecycle methods are provided as defaults on top of the shared
/// [`ModeBase`], so concrete modes only supply their event behavior. A mode
/// that does not use a given event keeps the no-op default so the
/// dispatcher's contract stays uniform.
pub trait Mode {
    fn name(&self) -> &'static str;
    fn base(&self) -> &ModeBase;
    fn base_mut(&mut self) -> &mut ModeBase;

    /// Hook run after the context is bound; modes construct their behaviors
    /// here.
    fn on_register(&mut self) {}

    /// Cursor affordance set when the mode starts.
    fn starting_cursor(&self) -> Cursor {
        Cursor::Crosshair
    }

    fn state(&self) -> ModeState {
        self.base().state()
    }

    /// Binds the registration context and constructs behaviors. Calling
    /// twice fails.
    fn register(&mut self, ctx: ModeContext) -> Result<(), ModeError> {
        self.base_mut().bind(ctx)?;
        self.on_register();
        log::debug!("Registered mode '{}'", self.name());
        Ok(())
    }

    /// Starts receiving events and sets the initial cursor affordance.
    /// Calling before `register` fails.
    fn start(&mut self) -> Result<(), ModeError> {
        self.base_mut().begin()?;
        let cursor = self.starting_cursor();
        if let Some(ctx) = self.base().context() {
            ctx.set_cursor(cursor);
        }
        Ok(())
    }

    /// Stops the mode, discarding provisional features via `clean_up`
    /// before transitioning.
    fn stop(&mut self) -> Result<(), ModeError> {
        self.base().ensure_stoppable()?;
        self.clean_up();
        self.base_mut().mark_stopped();
        if let Some(ctx) = self.base().context() {
            ctx.set_cursor(Cursor::Unset);
        }
        Ok(())
    }

    fn on_click(&mut self, _event: &PointerEvent) {}
    fn on_mouse_move(&mut self, _event: &PointerEvent) {}
    fn on_key_down(&mut self, _event: &mut KeyEvent) {}
    fn on_key_up(&mut self, _event: &mut KeyEvent) {}
    fn on_drag_start(&mut self, _event: &PointerEvent) {}
    fn on_drag(&mut self, _event: &PointerEvent) {}
    fn on_drag_end(&mut self, _event: &PointerEvent) {}

    /// Discards any provisional (in-progress, not yet committed) state.
    ///
    /// Must be idempotent and safe to call with no provisional state
    /// present, and must leave the store and index free of orphaned
    /// provisional features.
    fn clean_up(&mut self) {}

    /// Styling for a feature this mode produced.
    fn style_feature(&self, feature: &Feature) -> Styling;

    /// Validates a feature this mode produced; used by store `load` round
    /// trips.
    fn validate_feature(&self, feature: &Feature) -> Validation;
}

/// Registry mapping mode name → mode instance, selected at runtime by the
/// external dispatcher.
#[derive(Default)]
pub struct ModeRegistry {
    modes: HashMap<&'static str, Box<dyn Mode>>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mode, keyed by its name. Replaces any previous instance with
    /// the same name.
    pub fn add(&mut self, mode: Box<dyn Mode>) {
        self.modes.insert(mode.name(), mode);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Mode> {
        self.modes.get(name).map(Box::as_ref)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Mode>> {
        self.modes.get_mut(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modes.keys().copied().collect()
    }
}

/// Validates a feature against a mode: correct `mode` tag and well-formed
/// geometry of the expected type.
pub(crate) fn validate_mode_feature(
    feature: &Feature,
    mode: &'static str,
    expected_type: &'static str,
) -> Validation {
    if feature.properties.get("mode").and_then(Value::as_str) != Some(mode) {
        return Validation::fail(format!("feature was not created by the {mode} mode"));
    }
    if feature.geometry.type_name() != expected_type {
        return Validation::fail(format!("{mode} features must be of type {expected_type}"));
    }
    if let Some(reason) = feature.geometry.shape_error() {
        return Validation::fail(reason);
    }
    Validation::ok()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::store::{FeatureStore, StoreConfig};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Context with a linear 100px-per-degree projection and an untracked
    /// store, enough for exercising mode gestures.
    pub fn context_with_store(store: Rc<RefCell<FeatureStore>>) -> ModeContext {
        ModeContext {
            store,
            project: Box::new(|lng, lat| (lng * 100.0, -lat * 100.0)),
            unproject: Box::new(|x, y| (x / 100.0, -y / 100.0)),
            set_cursor: Box::new(|_| {}),
            on_select: Box::new(|_| {}),
            on_deselect: Box::new(|_| {}),
            pointer_distance: 15.0,
            coordinate_precision: 9,
        }
    }

    pub fn fresh_store() -> Rc<RefCell<FeatureStore>> {
        Rc::new(RefCell::new(FeatureStore::with_config(StoreConfig {
            tracked: false,
            coordinate_precision: 9,
        })))
    }

    pub fn click(lng: f64, lat: f64) -> PointerEvent {
        PointerEvent {
            lng,
            lat,
            container_x: lng * 100.0,
            container_y: -lat * 100.0,
            button: MouseButton::Left,
            held_keys: Vec::new(),
        }
    }

    pub fn registered<M: Mode>(mut mode: M) -> (M, Rc<RefCell<FeatureStore>>) {
        let store = fresh_store();
        mode.register(context_with_store(Rc::clone(&store))).unwrap();
        mode.start().unwrap();
        (mode, store)
    }
}

//! Map-geometry authoring core: feature store, spatial index, and the
//! drawing-mode engine.
//!
//! The crate is renderer-agnostic. A host embeds it by constructing a
//! [`store::FeatureStore`], registering modes from [`modes`] with a
//! [`behaviors::ModeContext`] that supplies projection and cursor hooks,
//! and forwarding pointer/keyboard events to the active mode. All state
//! lives in the store; the host reads features back out for rendering.

pub mod behaviors;
pub mod error;
pub mod geometry;
pub mod modes;
pub mod store;

pub use behaviors::{Cursor, ModeContext};
pub use error::{IndexError, ModeError, StoreError};
pub use geometry::{BoundingBox, Feature, FeatureId, Geometry, Position, Properties};
pub use modes::{Mode, ModeRegistry, ModeState, Styling};
pub use store::{ChangeType, FeatureStore, StoreConfig};

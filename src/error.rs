//! Error taxonomy for store, index, and mode lifecycle precondition violations.
//!
//! All variants here are taxonomy (a) failures: programming errors under a
//! correctly wired dispatcher. They fail the single call that triggered them
//! and are never retried internally. Soft per-feature rejections during bulk
//! load are reported through [`crate::store::LoadResult`] instead, and
//! geometric rejections (self-intersection, out-of-sector pointer movement)
//! are silent no-ops, not errors.

use crate::geometry::FeatureId;
use crate::modes::ModeState;
use thiserror::Error;

/// Errors raised by [`crate::store::FeatureStore`] mutation methods.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("feature '{0}' does not exist in the store")]
    NotFound(FeatureId),

    #[error("identifier strategy produced colliding id '{0}'")]
    IdCollision(FeatureId),

    #[error("invalid feature: {0}")]
    InvalidFeature(String),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Errors raised by [`crate::store::SpatialIndex`] operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("feature '{0}' is already indexed; remove it before re-inserting")]
    DuplicateNode(FeatureId),

    #[error("feature '{0}' has no index node")]
    UnknownNode(FeatureId),

    #[error("bulk load batch contains duplicate id '{0}'")]
    DuplicateInLoad(FeatureId),
}

/// Errors raised by mode lifecycle transitions.
#[derive(Debug, Error)]
pub enum ModeError {
    #[error("mode '{0}' is already registered")]
    AlreadyRegistered(&'static str),

    #[error("mode '{0}' has not been registered")]
    NotRegistered(&'static str),

    #[error("mode '{mode}' cannot transition from {from} to {to}")]
    InvalidTransition {
        mode: &'static str,
        from: ModeState,
        to: ModeState,
    },
}

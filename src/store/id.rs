//! Pluggable feature identifier strategies.

use crate::geometry::FeatureId;
use uuid::Uuid;

/// Generates and validates feature identifiers for one store instance.
///
/// The store calls [`generate`](IdStrategy::generate) on every `create`, and
/// [`is_valid`](IdStrategy::is_valid) on every externally supplied id during
/// `load`. Implementations must produce ids that are unique for the lifetime
/// of the store; a collision is treated by the store as a fatal precondition
/// violation, not retried.
pub trait IdStrategy {
    fn generate(&mut self) -> FeatureId;
    fn is_valid(&self, id: &FeatureId) -> bool;
}

/// Default strategy: random v4 UUIDs in hyphenated form.
///
/// Validation checks the 36-character shape (hyphens at positions 8, 13, 18
/// and 23, hex digits everywhere else) rather than parsing, so any token
/// indistinguishable from a UUID passes.
#[derive(Debug, Default)]
pub struct UuidIdStrategy;

impl IdStrategy for UuidIdStrategy {
    fn generate(&mut self) -> FeatureId {
        FeatureId::new(Uuid::new_v4().to_string())
    }

    fn is_valid(&self, id: &FeatureId) -> bool {
        let s = id.as_str();
        if s.len() != 36 {
            return false;
        }
        s.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_valid_and_unique() {
        let mut strategy = UuidIdStrategy;
        let a = strategy.generate();
        let b = strategy.generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
        assert!(strategy.is_valid(&a));
        assert!(strategy.is_valid(&b));
    }

    #[test]
    fn validation_checks_length_and_shape() {
        let strategy = UuidIdStrategy;
        assert!(strategy.is_valid(&FeatureId::from("b4b4c6b8-7b9b-4b9b-8b9b-b4b4c6b87b9b")));
        assert!(!strategy.is_valid(&FeatureId::from("short")));
        assert!(!strategy.is_valid(&FeatureId::from(
            "b4b4c6b8x7b9bx4b9bx8b9bxb4b4c6b87b9b"
        )));
        assert!(!strategy.is_valid(&FeatureId::from(
            "zzzzzzzz-7b9b-4b9b-8b9b-b4b4c6b87b9b"
        )));
    }
}

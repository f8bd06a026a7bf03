//! Unified error types for the domain layer
//!
//! Provides a common error type for world-state and card operations so that
//! the engine never has to fall back to `String` errors.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid card ID (empty or whitespace only)
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Entity not found
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Business rule violation
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DomainError {
    /// Create a not found error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Create an invalid ID error
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = DomainError::not_found("character", "char-042");
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            "Entity not found: character with id char-042"
        );
    }

    #[test]
    fn test_constraint_error() {
        let err = DomainError::constraint("card kind cannot change");
        assert_eq!(err.to_string(), "Constraint violation: card kind cannot change");
    }

    #[test]
    fn test_blank_card_id_is_invalid() {
        let err = crate::CardId::new("   ").unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));
    }
}

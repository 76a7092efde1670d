//! # Error Types
//!
//! Domain-specific error types for depot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  depot-core errors (this file)                                         │
//! │  ├── CoreError        - Document rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  depot-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  depot-billing errors                                                  │
//! │  └── BillingError     - NotFound / Immutable / Persistence / Busy      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BillingError → CLI                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numeric problems never show up here: malformed or missing numbers are
//! coerced to zero by [`crate::coerce`].

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Exit document rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The document is final and can no longer change.
    ///
    /// ## When This Occurs
    /// - Editing weights or fees on a document loaded as final
    /// - Saving over a final document
    /// - Deleting a final document
    #[error("Exit document {exit_id} is final and cannot be modified")]
    ImmutableDocument { exit_id: String },

    /// A line index or line id does not exist on the document.
    #[error("Line item {0} not found on exit document")]
    LineNotFound(usize),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an ImmutableDocument error for an optional store identity.
    pub fn immutable(exit_id: Option<i64>) -> Self {
        CoreError::ImmutableDocument {
            exit_id: exit_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "(unsaved)".to_string()),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write is attempted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., national code with letters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immutable_message() {
        let err = CoreError::immutable(Some(42));
        assert_eq!(
            err.to_string(),
            "Exit document 42 is final and cannot be modified"
        );

        let err = CoreError::immutable(None);
        assert!(err.to_string().contains("(unsaved)"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "driver national code".to_string(),
        };
        assert_eq!(err.to_string(), "driver national code is required");

        let err = ValidationError::TooLong {
            field: "plate".to_string(),
            max: 20,
        };
        assert_eq!(err.to_string(), "plate must be at most 20 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "plate".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

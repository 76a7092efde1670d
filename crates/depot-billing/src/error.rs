//! # Billing Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Operator       │  │  Persistence    │  │  Configuration          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotFound       │  │  Persistence-   │  │  InvalidConfig          │ │
//! │  │  Immutable-     │  │    Failure      │  │  ConfigLoadFailed       │ │
//! │  │    Document     │  │  Store          │  │  ConfigSaveFailed       │ │
//! │  │  Validation     │  │  SaveInProgress │  │                         │ │
//! │  │  LineNotFound   │  │                 │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Numeric problems never surface here: they are coerced to zero upstream.

use thiserror::Error;

use depot_core::{CoreError, ValidationError};
use depot_db::DbError;

/// Result type alias for billing operations.
pub type BillingResult<T> = Result<T, BillingError>;

/// Errors raised by the billing engine.
#[derive(Debug, Error)]
pub enum BillingError {
    // =========================================================================
    // Operator Errors
    // =========================================================================
    /// The search key matched neither a loading order nor an exit.
    #[error("No loading order or exit matches '{key}'")]
    NotFound { key: String },

    /// Mutation or save of a final document.
    #[error("Exit document {exit_id} is final and cannot be modified")]
    ImmutableDocument { exit_id: String },

    /// A required header field is missing or malformed. Raised before any write.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Line item {0} not found on exit document")]
    LineNotFound(usize),

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// A write step failed. Completed steps have been compensated.
    #[error("Failed to persist exit document at step '{stage}': {source}")]
    PersistenceFailure {
        stage: &'static str,
        #[source]
        source: DbError,
    },

    /// A store read failed.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// A save for this session is already running.
    #[error("A save is already in progress for this exit document")]
    SaveInProgress,

    /// No document is loaded in the session.
    #[error("No exit document is loaded")]
    NoDocument,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

impl From<CoreError> for BillingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ImmutableDocument { exit_id } => BillingError::ImmutableDocument { exit_id },
            CoreError::LineNotFound(line) => BillingError::LineNotFound(line),
            CoreError::Validation(v) => BillingError::Validation(v),
        }
    }
}

impl From<std::io::Error> for BillingError {
    fn from(err: std::io::Error) -> Self {
        BillingError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for BillingError {
    fn from(err: toml::de::Error) -> Self {
        BillingError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for BillingError {
    fn from(err: toml::ser::Error) -> Self {
        BillingError::ConfigSaveFailed(err.to_string())
    }
}

impl BillingError {
    /// Creates an ImmutableDocument error for an optional store identity.
    pub fn immutable(exit_id: Option<i64>) -> Self {
        CoreError::immutable(exit_id).into()
    }

    /// True for conditions the operator can fix and retry (re-enter a key,
    /// fill a field, wait for the running save).
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            BillingError::NotFound { .. }
                | BillingError::Validation(_)
                | BillingError::LineNotFound(_)
                | BillingError::SaveInProgress
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BillingError::InvalidConfig(_)
                | BillingError::ConfigLoadFailed(_)
                | BillingError::ConfigSaveFailed(_)
        )
    }
}

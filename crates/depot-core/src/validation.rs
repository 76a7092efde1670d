//! # Validation Module
//!
//! Business rule validation for exit documents.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Edit path (every keystroke)                                            │
//! │  └── no validation; numbers are coerced, text is taken as typed         │
//! │                                                                         │
//! │  Save path (ExitPersister::save)                                        │
//! │  └── THIS MODULE: header + line checks, before any write               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Database (SQLite)                                                      │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE(exits.loading_order_id)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use depot_core::validation::{validate_national_code, validate_search_key};
//!
//! assert!(validate_national_code("0012345678").is_ok());
//! assert!(validate_national_code("12345").is_err());
//! assert_eq!(validate_search_key("  LO-1001 ").unwrap(), "LO-1001");
//! ```

use crate::error::ValidationError;
use crate::types::ExitDocument;
use crate::MAX_EXIT_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const NATIONAL_CODE_LEN: usize = 10;
const MAX_DRIVER_NAME_LEN: usize = 100;
const MAX_PLATE_LEN: usize = 20;
const MAX_EXTRA_DESCRIPTION_LEN: usize = 500;
const MAX_SEARCH_KEY_LEN: usize = 50;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a driver national code.
///
/// ## Rules
/// - Required
/// - Exactly 10 ASCII digits (leading zeros are significant)
pub fn validate_national_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "driver national code".to_string(),
        });
    }

    if code.len() != NATIONAL_CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "driver national code".to_string(),
            reason: format!("must be exactly {} digits", NATIONAL_CODE_LEN),
        });
    }

    Ok(())
}

/// Validates the driver name. Required, at most 100 characters.
pub fn validate_driver_name(name: &str) -> ValidationResult<()> {
    required_with_max("driver name", name, MAX_DRIVER_NAME_LEN)
}

/// Validates the vehicle plate. Required, at most 20 characters.
pub fn validate_plate(plate: &str) -> ValidationResult<()> {
    required_with_max("plate", plate, MAX_PLATE_LEN)
}

/// Validates the free-text description of the extra fee.
pub fn validate_extra_description(description: Option<&str>) -> ValidationResult<()> {
    match description {
        Some(d) if d.trim().chars().count() > MAX_EXTRA_DESCRIPTION_LEN => {
            Err(ValidationError::TooLong {
                field: "extra description".to_string(),
                max: MAX_EXTRA_DESCRIPTION_LEN,
            })
        }
        _ => Ok(()),
    }
}

/// Validates a search key.
///
/// ## Returns
/// The trimmed key.
pub fn validate_search_key(key: &str) -> ValidationResult<String> {
    let key = key.trim();

    if key.is_empty() {
        return Err(ValidationError::Required {
            field: "search key".to_string(),
        });
    }

    if key.chars().count() > MAX_SEARCH_KEY_LEN {
        return Err(ValidationError::TooLong {
            field: "search key".to_string(),
            max: MAX_SEARCH_KEY_LEN,
        });
    }

    Ok(key.to_string())
}

/// Validates the number of lines on a document.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "line items".to_string(),
        });
    }

    if count > MAX_EXIT_LINES {
        return Err(ValidationError::OutOfRange {
            field: "line items".to_string(),
            min: 1,
            max: MAX_EXIT_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Document Validator
// =============================================================================

/// Validates everything that must hold before an exit document is written.
///
/// Returns the first failure.
pub fn validate_exit_document(doc: &ExitDocument) -> ValidationResult<()> {
    validate_national_code(&doc.driver_national_code)?;
    validate_driver_name(&doc.driver_name)?;
    validate_plate(&doc.plate)?;
    validate_extra_description(doc.extra_description.as_deref())?;
    validate_line_count(doc.items.len())?;
    Ok(())
}

fn required_with_max(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

//! # Error Types
//!
//! Domain-specific error types for hearth-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  hearth-core errors (this file)                                        │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  hearth-schedule errors                                                │
//! │  ├── StoreError       - What storage collaborators report              │
//! │  └── ScheduleError    - Engine-level failures                          │
//! │                                                                         │
//! │  hearth-db errors                                                      │
//! │  └── DbError          - SQLite failures (mapped into StoreError)       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ScheduleError → caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (template id, field, value)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cutoff hour outside a 24-hour clock.
    #[error("Cutoff hour {0} is outside 0-23")]
    InvalidCutoffHour(u32),

    /// Timezone name could not be resolved.
    ///
    /// ## When This Occurs
    /// - Typo in config (`Asia/Calcuta`)
    /// - Abbreviations that are not IANA names (`IST`)
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Line total overflowed the money representation.
    #[error("Amount overflow computing line for product {product_id}")]
    AmountOverflow { product_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when an admin or customer submits data that the scheduling
/// rules cannot work with. Raised before anything reaches storage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Collection has too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Invalid format (e.g., unknown weekday index).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Date lies before the earliest allowed date.
    #[error("{field} {date} is in the past")]
    DateInPast { field: String, date: String },
}

impl ValidationError {
    /// Shorthand for a `Required` error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for a `MustBePositive` error.
    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CoreError::InvalidCutoffHour(24).to_string(),
            "Cutoff hour 24 is outside 0-23"
        );
        assert_eq!(
            CoreError::UnknownTimezone("IST".to_string()).to_string(),
            "Unknown timezone: IST"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("customer_id").to_string(),
            "customer_id is required"
        );
        assert_eq!(
            ValidationError::must_be_positive("every_n_days").to_string(),
            "every_n_days must be positive"
        );
        let err = ValidationError::DateInPast {
            field: "end_date".to_string(),
            date: "2024-01-01".to_string(),
        };
        assert_eq!(err.to_string(), "end_date 2024-01-01 is in the past");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("items").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}

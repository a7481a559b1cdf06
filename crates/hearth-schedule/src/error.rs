//! # Scheduling Error Types
//!
//! Error types for the standing order engine and its storage collaborators.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Scheduling Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   StoreError    │  │  Configuration  │  │     Domain              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Unavailable    │  │  InvalidConfig  │  │  Validation             │ │
//! │  │  NotFound       │  │  ConfigLoad     │  │  TemplateNotFound       │ │
//! │  │  Conflict       │  │  ConfigSave     │  │  TemplateNotActive      │ │
//! │  │  Corrupt        │  │                 │  │  Core (pricing, zone)   │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  StoreError::Unavailable is the only retryable class. Callers decide   │
//! │  whether to retry; the engine itself never does.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use hearth_core::{CoreError, ValidationError};
use thiserror::Error;

// =============================================================================
// Store Error
// =============================================================================

/// What a storage collaborator reports.
///
/// Backends map their native errors into these classes so the engine can
/// react without knowing which database sits underneath.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend could not be reached or the operation timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness or integrity constraint rejected the write.
    #[error("Constraint conflict: {0}")]
    Conflict(String),

    /// A stored record could not be decoded.
    ///
    /// ## When This Occurs
    /// - Recurrence JSON with an unknown `kind`
    /// - Status string outside the known set
    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns true when retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for storage collaborators.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Schedule Error
// =============================================================================

/// Engine-level failures.
#[derive(Debug, Error)]
pub enum ScheduleError {
    // =========================================================================
    // Storage
    // =========================================================================
    /// A storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    // =========================================================================
    // Domain
    // =========================================================================
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Domain rule failure (pricing overflow, bad zone).
    #[error(transparent)]
    Core(CoreError),

    /// No template with this id.
    #[error("Standing order not found: {0}")]
    TemplateNotFound(String),

    /// Operation requires an Active template.
    #[error("Standing order {id} is {status}, not active")]
    TemplateNotActive { id: String, status: String },

    // =========================================================================
    // Configuration
    // =========================================================================
    /// Invalid scheduling configuration.
    #[error("Invalid schedule configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

/// Result type alias for scheduling operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for ScheduleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => ScheduleError::Validation(v),
            other => ScheduleError::Core(other),
        }
    }
}

impl From<std::io::Error> for ScheduleError {
    fn from(err: std::io::Error) -> Self {
        ScheduleError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ScheduleError {
    fn from(err: toml::de::Error) -> Self {
        ScheduleError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ScheduleError {
    fn from(err: toml::ser::Error) -> Self {
        ScheduleError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ScheduleError {
    /// Returns true if the operation can be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScheduleError::Store(e) if e.is_retryable())
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ScheduleError::InvalidConfig(_)
                | ScheduleError::ConfigLoadFailed(_)
                | ScheduleError::ConfigSaveFailed(_)
        )
    }
}

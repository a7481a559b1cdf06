//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (hearth-schedule) ← What the engine reacts to               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ScheduleError ← Reported per template or returned to the caller        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use hearth_schedule::StoreError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Second generated instance for the same (template, date)
    /// - Reused order id or sequence number
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Items referencing a template that does not exist
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// An order was handed to a write meant for the other origin.
    ///
    /// ## When This Occurs
    /// - A generated instance passed to the manual replacing insert
    #[error("Order {id} has the wrong origin for this write")]
    WrongOrigin { id: String },

    /// A stored row could not be turned back into a domain value.
    ///
    /// ## When This Occurs
    /// - Recurrence JSON with an unknown `kind`
    /// - Generated instance row without a template id
    #[error("Corrupt row {id}: {reason}")]
    Decode { id: String, reason: String },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed (includes "database is locked").
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn decode(id: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Decode {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the error is the (template, delivery date) uniqueness index.
    pub fn is_standing_duplicate(&self) -> bool {
        matches!(
            self,
            DbError::UniqueViolation { field }
                if field.contains("template_id") && field.contains("delivery_date")
        )
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::ColumnDecode   → DbError::Decode
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>, ..."
                // FK constraint: "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::ColumnDecode { index, source } => DbError::Decode {
                id: format!("column {index}"),
                reason: source.to_string(),
            },

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Maps database failures onto the classes the engine understands.
///
/// ```text
/// NotFound                          → StoreError::NotFound
/// UniqueViolation / ForeignKey /
///   WrongOrigin                     → StoreError::Conflict
/// Decode                            → StoreError::Corrupt
/// everything else                   → StoreError::Unavailable (retryable)
/// ```
impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => StoreError::NotFound { entity, id },
            DbError::UniqueViolation { .. }
            | DbError::ForeignKeyViolation { .. }
            | DbError::WrongOrigin { .. } => StoreError::Conflict(err.to_string()),
            DbError::Decode { id, reason } => StoreError::Corrupt { id, reason },
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standing_duplicate_detection() {
        let err = DbError::UniqueViolation {
            field: "order_instances.template_id, order_instances.delivery_date".into(),
        };
        assert!(err.is_standing_duplicate());

        let err = DbError::UniqueViolation {
            field: "order_instances.sequence_number".into(),
        };
        assert!(!err.is_standing_duplicate());
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            StoreError::from(DbError::PoolExhausted),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(DbError::decode("t-1", "unknown variant `monthly`")),
            StoreError::Corrupt { .. }
        ));
        assert!(matches!(
            StoreError::from(DbError::UniqueViolation {
                field: "order_instances.id".into()
            }),
            StoreError::Conflict(_)
        ));
        assert!(StoreError::from(DbError::QueryFailed("database is locked".into())).is_retryable());
    }
}

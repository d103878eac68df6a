//! Database error types
//!
//! Adapters work in `DatabaseError` internally and hand `PortError` back
//! across the port boundary, so the domain never sees SQLx types.

use core_kernel::PortError;
use thiserror::Error;

/// Failures inside the adapters, before translation to `PortError`
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique index hit, e.g. a reused transaction id
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Check constraint violated: {0}")]
    ConstraintViolation(String),

    /// A version-checked update matched no row at the expected version
    #[error("Stale write: {0}")]
    StaleVersion(String),

    /// Serialization failure or deadlock; the transaction was rolled back
    #[error("Transaction aborted: {0}")]
    TransactionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A JSONB document could not be encoded or decoded
    #[error("Document error: {0}")]
    SerializationError(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DatabaseError {
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::duplicate("Payment", "transaction_id", "TXN-7");
    /// assert!(error.to_string().contains("TXN-7"));
    /// ```
    pub fn duplicate(entity: &str, field: &str, value: impl std::fmt::Display) -> Self {
        DatabaseError::DuplicateEntry(format!("{} with {} '{}' already exists", entity, field, value))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }
}

/// Maps SQLx errors onto `DatabaseError` by PostgreSQL error code
///
/// See <https://www.postgresql.org/docs/current/errcodes-appendix.html>.
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                DatabaseError::ConnectionFailed(error.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::SerializationError(error.to_string())
            }
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => DatabaseError::DuplicateEntry(db_err.message().to_string()),
                Some("23503") => DatabaseError::ForeignKeyViolation(db_err.message().to_string()),
                Some("23514") => DatabaseError::ConstraintViolation(db_err.message().to_string()),
                Some("40001") | Some("40P01") => {
                    DatabaseError::TransactionFailed(db_err.message().to_string())
                }
                _ => DatabaseError::QueryFailed(db_err.message().to_string()),
            },
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(error: serde_json::Error) -> Self {
        DatabaseError::SerializationError(error.to_string())
    }
}

/// Translation at the port boundary
///
/// Duplicate keys and stale versions are both conflicts to the domain;
/// connection trouble and serialization failures of a transaction are
/// transient so the scheduler retries them.
impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(message) => PortError::NotFound {
                entity_type: "Record".to_string(),
                id: message,
            },
            DatabaseError::DuplicateEntry(message) | DatabaseError::StaleVersion(message) => {
                PortError::conflict(message)
            }
            DatabaseError::ForeignKeyViolation(message)
            | DatabaseError::ConstraintViolation(message) => PortError::validation(message),
            DatabaseError::ConnectionFailed(message) | DatabaseError::TransactionFailed(message) => {
                PortError::connection(message)
            }
            DatabaseError::PoolExhausted => PortError::connection("connection pool exhausted"),
            DatabaseError::SerializationError(message) => PortError::Corrupt { message },
            other => PortError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let port: PortError = DatabaseError::duplicate("Invoice", "invoice_number", "INV-9").into();
        assert!(port.is_conflict());
    }

    #[test]
    fn test_stale_version_maps_to_conflict() {
        let port: PortError = DatabaseError::StaleVersion("invoice version 2".into()).into();
        assert!(port.is_conflict());
        assert!(!port.is_transient());
    }

    #[test]
    fn test_connection_trouble_is_transient() {
        let exhausted: PortError = DatabaseError::PoolExhausted.into();
        assert!(exhausted.is_transient());
        let serialization: PortError = DatabaseError::TransactionFailed("could not serialize".into()).into();
        assert!(serialization.is_transient());
    }

    #[test]
    fn test_row_not_found_from_sqlx() {
        let error: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(error.is_not_found());
        assert!(PortError::from(error).is_not_found());
    }

    #[test]
    fn test_foreign_key_maps_to_validation() {
        let port: PortError = DatabaseError::ForeignKeyViolation("vendor missing".into()).into();
        assert!(matches!(port, PortError::Validation { .. }));
    }

    #[test]
    fn test_bad_document_maps_to_corrupt() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let port: PortError = DatabaseError::from(json_error).into();
        assert!(matches!(port, PortError::Corrupt { .. }));
    }
}

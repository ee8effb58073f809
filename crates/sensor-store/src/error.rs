//! Store Error Types

use thiserror::Error;

/// Errors returned by every [`SensorStore`](crate::SensorStore) operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation referenced a sensor that does not exist
    #[error("Sensor not found: {0}")]
    NotFound(String),

    /// Failure reported by the storage engine
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Uniqueness or referential constraint rejected the write
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Backend failure outside the SQL engine (e.g. undecodable stored row)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True for the not-found case, which callers surface as absence
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// True for every failure originating in the persistence layer
    pub fn is_persistence(&self) -> bool {
        !self.is_not_found()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() || db.is_foreign_key_violation() || db.is_check_violation() {
                return StoreError::Constraint(db.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(StoreError::NotFound("a".into()).is_not_found());
        assert!(!StoreError::NotFound("a".into()).is_persistence());
        assert!(StoreError::Constraint("dup".into()).is_persistence());
        assert!(StoreError::from(sqlx::Error::RowNotFound).is_persistence());
    }

    #[test]
    fn test_display() {
        let err = StoreError::NotFound("north-gate".into());
        assert_eq!(err.to_string(), "Sensor not found: north-gate");
    }
}

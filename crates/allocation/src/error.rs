//! Error types for the allocation service layer.

use thiserror::Error;

/// Allocation error type.
#[derive(Error, Debug)]
pub enum AllocationError {
    /// No product exists for the sku, or no batch exists for the reference
    #[error("Invalid sku {0}")]
    InvalidSku(String),

    /// Another unit of work committed the same product first
    #[error("Concurrent modification of product {sku} (expected version {expected})")]
    ConcurrentModification { sku: String, expected: i64 },

    /// The unit of work was used after it was committed or rolled back
    #[error("Unit of work is closed")]
    Closed,

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored data could not be mapped back into the domain model
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// IO error (database directory creation)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Event serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Redis error while publishing an event
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Non-Redis publish failure
    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Result type for allocation operations.
pub type AllocationResult<T> = Result<T, AllocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sku_display() {
        let err = AllocationError::InvalidSku("NONEXISTENT".to_string());
        assert_eq!(err.to_string(), "Invalid sku NONEXISTENT");
    }

    #[test]
    fn concurrent_modification_display() {
        let err = AllocationError::ConcurrentModification {
            sku: "LAMP".to_string(),
            expected: 3,
        };
        assert_eq!(
            err.to_string(),
            "Concurrent modification of product LAMP (expected version 3)"
        );
    }
}

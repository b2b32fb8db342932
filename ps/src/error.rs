//! Store error types

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Version conflict in {collection}/{id}: have {have}, got {got}")]
    VersionConflict {
        collection: String,
        id: String,
        have: u32,
        got: u32,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store poisoned: {0}")]
    Poisoned(String),
}

impl StoreError {
    /// Check if this error means the record simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = StoreError::NotFound {
            collection: "plans".to_string(),
            id: "abc".to_string(),
        };
        assert!(err.is_not_found());

        let err = StoreError::Poisoned("lock".to_string());
        assert!(!err.is_not_found());
    }
}

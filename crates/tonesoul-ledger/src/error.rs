//! Ledger errors.

use thiserror::Error;
use tonesoul_model::{ActionId, ModelError};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to open or access the database.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize a record.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record's action is malformed.
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] ModelError),

    /// A record for this action id already exists.
    #[error("Duplicate action id: {0}")]
    DuplicateActionId(ActionId),

    /// A write referenced an action id with no record.
    #[error("Unknown action id: {0}")]
    UnknownActionId(ActionId),

    /// A read found no record for this action id.
    #[error("Record not found: {0}")]
    NotFound(ActionId),

    /// The outcome was already set; it can only be set once.
    #[error("Outcome already recorded for action {0}")]
    OutcomeAlreadyRecorded(ActionId),

    /// The stored hash chain does not verify.
    #[error("Audit chain broken for action {action} at sequence {sequence}")]
    ChainBroken {
        /// Action whose trail failed to verify.
        action: ActionId,
        /// First event that failed; 0 when the seal itself does not match.
        sequence: u64,
    },
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_display() {
        let err = LedgerError::DuplicateActionId(ActionId::new("a-1"));
        assert_eq!(err.to_string(), "Duplicate action id: a-1");
    }

    #[test]
    fn test_chain_broken_display() {
        let err = LedgerError::ChainBroken {
            action: ActionId::new("a-1"),
            sequence: 3,
        };
        assert!(err.to_string().contains("sequence 3"));
    }
}

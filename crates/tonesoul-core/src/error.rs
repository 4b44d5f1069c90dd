//! Error types for the governance engine.

use thiserror::Error;
use tonesoul_council::CouncilError;
use tonesoul_gate::{GateError, GateToken};
use tonesoul_ledger::LedgerError;
use tonesoul_model::{ActionId, ModelError};

/// Core error type for governance operations.
///
/// Rejections and paused actions are [`Decision`](crate::Decision)s, not
/// errors. The kinds below are structural faults, plus the kinds
/// [`Decision::ensure_approved`](crate::Decision::ensure_approved) maps
/// a non-approval onto.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// The action is malformed. Raised before any record is written.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Council error passthrough.
    #[error("Council error: {0}")]
    Council(#[from] CouncilError),

    /// Ledger error passthrough.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Gate error passthrough.
    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    /// The action would break a commitment and was never confirmed.
    #[error("Unconfirmed betrayal: {0}")]
    UnconfirmedBetrayal(String),

    /// A confirmation arrived after the action had already timed out.
    #[error("Confirmation timed out for action {0}")]
    ConfirmationTimeout(ActionId),

    /// Members abstained without rejecting.
    #[error("Insufficient consensus: {0}")]
    InsufficientConsensus(String),

    /// The action was rejected.
    #[error("Action not approved: {0}")]
    NotApproved(String),

    /// No paused action holds this token.
    #[error("Unknown gate token: {0}")]
    UnknownGateToken(GateToken),

    /// No record exists for this action id.
    #[error("Unknown action id: {0}")]
    UnknownActionId(ActionId),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_passthrough() {
        let err: GovernanceError = ModelError::InvalidAction("action id is empty".to_string()).into();
        assert_eq!(err.to_string(), "Invalid action: action id is empty");
    }

    #[test]
    fn test_ledger_error_passthrough() {
        let err: GovernanceError = LedgerError::DuplicateActionId(ActionId::new("a-1")).into();
        assert!(matches!(
            err,
            GovernanceError::Ledger(LedgerError::DuplicateActionId(_))
        ));
        assert_eq!(err.to_string(), "Ledger error: Duplicate action id: a-1");
    }

    #[test]
    fn test_timeout_display() {
        let err = GovernanceError::ConfirmationTimeout(ActionId::new("a-9"));
        assert_eq!(err.to_string(), "Confirmation timed out for action a-9");
    }
}

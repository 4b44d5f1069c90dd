//! Gate errors.

use thiserror::Error;
use tonesoul_model::{CommitmentId, ModelError};

use crate::pending::GateToken;

/// Errors that can occur in the betrayal gate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GateError {
    /// No pending confirmation holds this token, either because it never
    /// existed or because it was already resolved.
    #[error("Unknown gate token: {0}")]
    UnknownToken(GateToken),

    /// The commitment is not in the book.
    #[error("Commitment not found: {0}")]
    CommitmentNotFound(CommitmentId),

    /// A commitment transition was refused.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;

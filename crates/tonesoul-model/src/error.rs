//! Error types for model construction and validation.

use thiserror::Error;

use crate::commitment::CommitmentId;

/// Errors raised while building or validating model values.
///
/// These are validation faults: they are reported to the caller at
/// submission time and never enter deliberation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// The risk tier string is not one of `low`, `medium`, `high`.
    #[error("Invalid risk tier: '{0}' (expected low, medium or high)")]
    InvalidRiskTier(String),

    /// Uncertainty level or confidence bounds fall outside `[0, 1]`,
    /// or `lower > upper`.
    #[error("Invalid uncertainty bounds: {0}")]
    InvalidUncertaintyBounds(String),

    /// The action is malformed.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// The commitment was already revoked; revocation is one-way.
    #[error("Commitment already revoked: {0}")]
    CommitmentRevoked(CommitmentId),
}

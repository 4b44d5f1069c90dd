//! Error types for the council.
//!
//! Rejections and abstentions are not errors: they come back as a
//! [`CouncilDecision`](crate::CouncilDecision). Only structural faults
//! surface here.

use thiserror::Error;

/// Errors that can occur during council operations.
#[derive(Debug, Error)]
pub enum CouncilError {
    /// A member failed to produce a verdict.
    #[error("Council member '{0}' failed to evaluate: {1}")]
    EvaluatorFailure(String, String),

    /// A caller required approval but members abstained without rejecting.
    #[error("Insufficient consensus: {0}")]
    InsufficientConsensus(String),

    /// A rubric in the configuration cannot be used.
    #[error("Invalid rubric: {0}")]
    InvalidRubric(String),

    /// Internal council error.
    #[error("Internal council error: {0}")]
    Internal(String),
}

impl From<regex::Error> for CouncilError {
    fn from(err: regex::Error) -> Self {
        CouncilError::InvalidRubric(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluator_failure_display() {
        let err = CouncilError::EvaluatorFailure("guardian".to_string(), "panicked".to_string());
        assert!(err.to_string().contains("guardian"));
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_invalid_rubric_display() {
        let err = CouncilError::InvalidRubric("confidence 1.5 outside [0, 1]".to_string());
        assert!(err.to_string().contains("confidence 1.5"));
    }

    #[test]
    fn test_insufficient_consensus_display() {
        let err = CouncilError::InsufficientConsensus("philosopher abstained".to_string());
        assert!(err.to_string().contains("philosopher abstained"));
    }
}

//! Decisions handed back to callers and the per-action state machine.

use serde::{Deserialize, Serialize};
use tonesoul_gate::GateToken;
use tonesoul_ledger::{AuditEventKind, ResponsibilityRecord};
use tonesoul_model::{CommitmentId, RejectionCause, UncertaintyReport};

use crate::error::GovernanceError;
use crate::Result;

/// The engine's answer to a submitted action.
///
/// - `Approved`: the action may proceed; `audit_id` is the hash of the
///   ledger event that approved it
/// - `Rejected`: the action must not proceed, with human-readable reasons
/// - `PendingConfirmation`: the action would break a commitment and waits
///   for [`confirm`](crate::GovernanceEngine::confirm) or
///   [`cancel`](crate::GovernanceEngine::cancel)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// The action may proceed.
    Approved {
        /// Hash of the approving audit event.
        audit_id: String,
        /// Uncertainty behind the approval.
        uncertainty: UncertaintyReport,
    },

    /// The action must not proceed.
    Rejected {
        /// Why, never empty.
        reasons: Vec<String>,
        /// Which path rejected it.
        cause: RejectionCause,
        /// Uncertainty behind the rejection.
        uncertainty: UncertaintyReport,
    },

    /// The action waits for explicit confirmation.
    PendingConfirmation {
        /// Resumption token.
        token: GateToken,
        /// The commitment the action would break.
        commitment_id: CommitmentId,
        /// Why the gate paused it.
        explanation: String,
    },
}

impl Decision {
    /// Returns true if approved.
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }

    /// Returns true if rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns true if waiting for confirmation.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingConfirmation { .. })
    }

    /// Resumption token of a paused action.
    pub fn token(&self) -> Option<&GateToken> {
        match self {
            Self::PendingConfirmation { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Rejection cause, if rejected.
    pub fn cause(&self) -> Option<RejectionCause> {
        match self {
            Self::Rejected { cause, .. } => Some(*cause),
            _ => None,
        }
    }

    /// Rejection reasons; empty unless rejected.
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::Rejected { reasons, .. } => reasons,
            _ => &[],
        }
    }

    /// Uncertainty report, absent while pending.
    pub fn uncertainty(&self) -> Option<&UncertaintyReport> {
        match self {
            Self::Approved { uncertainty, .. } | Self::Rejected { uncertainty, .. } => {
                Some(uncertainty)
            }
            Self::PendingConfirmation { .. } => None,
        }
    }

    /// Returns the audit id of an approval, or the matching error.
    ///
    /// # Errors
    ///
    /// | Decision | Error |
    /// |----------|-------|
    /// | Pending | [`GovernanceError::UnconfirmedBetrayal`] |
    /// | Rejected, confirmation timeout | [`GovernanceError::UnconfirmedBetrayal`] |
    /// | Rejected, insufficient consensus | [`GovernanceError::InsufficientConsensus`] |
    /// | Any other rejection | [`GovernanceError::NotApproved`] |
    pub fn ensure_approved(&self) -> Result<&str> {
        match self {
            Self::Approved { audit_id, .. } => Ok(audit_id),
            Self::PendingConfirmation { explanation, .. } => {
                Err(GovernanceError::UnconfirmedBetrayal(explanation.clone()))
            }
            Self::Rejected { reasons, cause, .. } => {
                let joined = reasons.join("; ");
                Err(match cause {
                    RejectionCause::ConfirmationTimeout => {
                        GovernanceError::UnconfirmedBetrayal(joined)
                    }
                    RejectionCause::InsufficientConsensus => {
                        GovernanceError::InsufficientConsensus(joined)
                    }
                    _ => GovernanceError::NotApproved(joined),
                })
            }
        }
    }
}

/// Where an action is in its lifecycle.
///
/// `Submitted -> Deliberating -> {Approved | Rejected |
/// PendingBetrayalConfirmation}`, and from pending to approved or rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActionState {
    /// Recorded, not yet judged.
    Submitted,
    /// Under judgment.
    Deliberating,
    /// Terminal: approved.
    Approved,
    /// Terminal: rejected.
    Rejected {
        /// Which path rejected it.
        cause: RejectionCause,
    },
    /// Waiting for confirmation to break a commitment.
    PendingBetrayalConfirmation {
        /// The commitment at stake.
        commitment_id: CommitmentId,
    },
}

impl ActionState {
    /// Derives the state from the latest decisive audit event.
    pub fn from_record(record: &ResponsibilityRecord) -> Self {
        record
            .audit_trail
            .iter()
            .rev()
            .find_map(|event| match &event.kind {
                AuditEventKind::Approved => Some(Self::Approved),
                AuditEventKind::Rejected { cause, .. } => Some(Self::Rejected { cause: *cause }),
                AuditEventKind::PendingConfirmation { commitment_id } => {
                    Some(Self::PendingBetrayalConfirmation {
                        commitment_id: commitment_id.clone(),
                    })
                }
                _ => None,
            })
            .unwrap_or(Self::Submitted)
    }

    /// Returns true for approved and rejected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> UncertaintyReport {
        UncertaintyReport::from_confidence("reject", 0.9, "test")
    }

    fn rejected(cause: RejectionCause) -> Decision {
        Decision::Rejected {
            reasons: vec!["first".to_string(), "second".to_string()],
            cause,
            uncertainty: report(),
        }
    }

    #[test]
    fn test_ensure_approved_ok() {
        let decision = Decision::Approved {
            audit_id: "abc".to_string(),
            uncertainty: report(),
        };
        assert_eq!(decision.ensure_approved().unwrap(), "abc");
    }

    #[test]
    fn test_ensure_approved_maps_causes() {
        assert!(matches!(
            rejected(RejectionCause::ConfirmationTimeout).ensure_approved(),
            Err(GovernanceError::UnconfirmedBetrayal(_))
        ));
        assert!(matches!(
            rejected(RejectionCause::InsufficientConsensus).ensure_approved(),
            Err(GovernanceError::InsufficientConsensus(_))
        ));
        match rejected(RejectionCause::CouncilRejected).ensure_approved() {
            Err(GovernanceError::NotApproved(msg)) => assert_eq!(msg, "first; second"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_pending_is_unconfirmed() {
        let decision = Decision::PendingConfirmation {
            token: GateToken::from("gate-1"),
            commitment_id: CommitmentId::new("commit-1"),
            explanation: "would break".to_string(),
        };
        assert!(decision.is_pending());
        assert_eq!(decision.token(), Some(&GateToken::from("gate-1")));
        assert!(decision.uncertainty().is_none());
        assert!(matches!(
            decision.ensure_approved(),
            Err(GovernanceError::UnconfirmedBetrayal(_))
        ));
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(rejected(RejectionCause::Cancelled)).unwrap();
        assert_eq!(json["decision"], "rejected");
        assert_eq!(json["cause"], "cancelled");
        assert_eq!(json["reasons"][0], "first");
        assert!(json["uncertainty"]["confidence_bounds"]["lower"].is_number());
    }
}

//! Why an action ended up rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The path that led to a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCause {
    /// At least one council member rejected.
    CouncilRejected,
    /// Members abstained without rejecting.
    InsufficientConsensus,
    /// The benevolence audit stopped the proposed output.
    BenevolenceIntercept,
    /// A pending confirmation was cancelled.
    Cancelled,
    /// A pending confirmation was never given in time.
    ConfirmationTimeout,
    /// Judgment could not finish: a council seat failed, the submission
    /// was abandoned, or the ledger refused the resolution.
    DeliberationFailed,
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionCause::CouncilRejected => "council_rejected",
            RejectionCause::InsufficientConsensus => "insufficient_consensus",
            RejectionCause::BenevolenceIntercept => "benevolence_intercept",
            RejectionCause::Cancelled => "cancelled",
            RejectionCause::ConfirmationTimeout => "confirmation_timeout",
            RejectionCause::DeliberationFailed => "deliberation_failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for cause in [
            RejectionCause::CouncilRejected,
            RejectionCause::InsufficientConsensus,
            RejectionCause::BenevolenceIntercept,
            RejectionCause::Cancelled,
            RejectionCause::ConfirmationTimeout,
            RejectionCause::DeliberationFailed,
        ] {
            let json = serde_json::to_string(&cause).unwrap();
            assert_eq!(json, format!("\"{cause}\""));
        }
    }
}

//! Consensus rule for council decisions.
//!
//! The council approves only when every seat approves. Any rejection
//! rejects. An abstention without a rejection is reported as
//! insufficient consensus and never silently approved.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::member::{Verdict, Vote};

/// Result of applying the consensus rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusResult {
    /// All seats approved.
    Approved,
    /// At least one seat rejected.
    Rejected,
    /// No rejection, but at least one abstention or a missing seat.
    InsufficientConsensus,
}

impl fmt::Display for ConsensusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusResult::Approved => write!(f, "approve"),
            ConsensusResult::Rejected => write!(f, "reject"),
            ConsensusResult::InsufficientConsensus => write!(f, "insufficient_consensus"),
        }
    }
}

/// Tally of votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteTally {
    /// Number of approvals.
    pub approvals: usize,
    /// Number of rejections.
    pub rejections: usize,
    /// Number of abstentions.
    pub abstentions: usize,
    /// Total number of verdicts.
    pub total: usize,
}

impl VoteTally {
    /// Counts the votes in a set of verdicts.
    pub fn from_verdicts(verdicts: &[Verdict]) -> Self {
        let mut tally = Self {
            total: verdicts.len(),
            ..Self::default()
        };
        for verdict in verdicts {
            match verdict.vote {
                Vote::Approve => tally.approvals += 1,
                Vote::Reject => tally.rejections += 1,
                Vote::Abstain => tally.abstentions += 1,
            }
        }
        tally
    }

    /// Fraction of all seats that approved. Abstentions count against.
    pub fn approval_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.approvals as f64 / self.total as f64
        }
    }

    /// True when approvals and rejections are both present.
    pub fn is_split(&self) -> bool {
        self.approvals > 0 && self.rejections > 0
    }
}

/// Unanimity rule over a fixed number of seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusEngine {
    required_seats: usize,
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ConsensusEngine {
    /// Creates an engine expecting `required_seats` verdicts.
    pub const fn new(required_seats: usize) -> Self {
        Self { required_seats }
    }

    /// Number of verdicts required before approval is possible.
    pub fn required_seats(&self) -> usize {
        self.required_seats
    }

    /// Applies the rule.
    ///
    /// A rejection always rejects, even when seats are missing. Fewer
    /// verdicts than required seats is never an approval.
    pub fn evaluate(&self, verdicts: &[Verdict]) -> (ConsensusResult, VoteTally) {
        let tally = VoteTally::from_verdicts(verdicts);

        let result = if tally.rejections > 0 {
            ConsensusResult::Rejected
        } else if tally.abstentions > 0
            || tally.total < self.required_seats
            || tally.total == 0
        {
            ConsensusResult::InsufficientConsensus
        } else {
            ConsensusResult::Approved
        };

        (result, tally)
    }
}

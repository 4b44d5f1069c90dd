//! Council member framework.
//!
//! Defines the [`CouncilMember`] trait and the [`Verdict`] each member
//! returns. Members are pure: they read the action and their own rubric,
//! nothing else.

pub mod triad;

use std::fmt;

use serde::{Deserialize, Serialize};
use tonesoul_model::{Action, UncertaintyReport};

use crate::error::CouncilError;
use crate::Result;

/// How certain a member is about its vote, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Creates a confidence value.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRubric`] if `value` is outside `[0, 1]` or NaN.
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(CouncilError::InvalidRubric(format!(
                "confidence {value} outside [0, 1]"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the confidence value.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// High confidence (0.9).
    pub const fn high() -> Self {
        Self(0.9)
    }

    /// Medium confidence (0.6).
    pub const fn medium() -> Self {
        Self(0.6)
    }

    /// Low confidence (0.3).
    pub const fn low() -> Self {
        Self(0.3)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::medium()
    }
}

impl TryFrom<f64> for Confidence {
    type Error = CouncilError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// A member's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    /// The action may proceed.
    Approve,
    /// The action must not proceed.
    Reject,
    /// The member cannot decide for this action.
    Abstain,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Approve => write!(f, "approve"),
            Vote::Reject => write!(f, "reject"),
            Vote::Abstain => write!(f, "abstain"),
        }
    }
}

/// The three seats on the council.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Judges alignment with configured values.
    Philosopher,
    /// Judges feasibility and declared risk.
    Engineer,
    /// Judges enumerated harm categories.
    Guardian,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::Philosopher => write!(f, "philosopher"),
            MemberRole::Engineer => write!(f, "engineer"),
            MemberRole::Guardian => write!(f, "guardian"),
        }
    }
}

/// One member's judgment on an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Seat that cast the vote.
    pub role: MemberRole,
    /// The vote.
    pub vote: Vote,
    /// Human-readable rationale.
    pub rationale: String,
    /// Confidence in the vote.
    pub confidence: Confidence,
    /// Uncertainty derived from the confidence.
    pub uncertainty: UncertaintyReport,
}

impl Verdict {
    /// Creates a verdict; the uncertainty report is derived from `confidence`.
    pub fn new(
        role: MemberRole,
        vote: Vote,
        confidence: Confidence,
        rationale: impl Into<String>,
    ) -> Self {
        let rationale = rationale.into();
        let uncertainty =
            UncertaintyReport::from_confidence(vote.to_string(), confidence.value(), &rationale);
        Self {
            role,
            vote,
            rationale,
            confidence,
            uncertainty,
        }
    }

    /// An approval.
    pub fn approve(role: MemberRole, confidence: Confidence, rationale: impl Into<String>) -> Self {
        Self::new(role, Vote::Approve, confidence, rationale)
    }

    /// A rejection.
    pub fn reject(role: MemberRole, confidence: Confidence, rationale: impl Into<String>) -> Self {
        Self::new(role, Vote::Reject, confidence, rationale)
    }

    /// An abstention, always at low confidence.
    pub fn abstain(role: MemberRole, rationale: impl Into<String>) -> Self {
        Self::new(role, Vote::Abstain, Confidence::low(), rationale)
    }
}

/// A seat on the council.
///
/// Implementations must be pure functions of the action and their
/// configured rubric: the council may call members in any order and on
/// any thread.
///
/// # Implementors
///
/// - [`triad::Philosopher`]: value alignment
/// - [`triad::Engineer`]: feasibility and risk
/// - [`triad::Guardian`]: harm categories
pub trait CouncilMember: Send + Sync {
    /// Seat this member occupies.
    fn role(&self) -> MemberRole;

    /// Short description of the rubric applied.
    fn rubric(&self) -> &str;

    /// Judges an action.
    fn evaluate(&self, action: &Action) -> Verdict;
}

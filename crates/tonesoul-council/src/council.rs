//! The council facade.
//!
//! Runs every seat on an action, applies the unanimity rule and folds the
//! verdicts into a [`CouncilDecision`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tonesoul_model::{Action, UncertaintyReport};
use tracing::{debug, info, warn};

use crate::consensus::{ConsensusEngine, ConsensusResult, VoteTally};
use crate::error::CouncilError;
use crate::member::triad::{Engineer, EngineerRubric, Guardian, HarmCategory, Philosopher, ValueRule};
use crate::member::{CouncilMember, MemberRole, Verdict, Vote};
use crate::Result;

/// Rubrics for the three seats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    /// Philosopher value set.
    pub values: Vec<ValueRule>,
    /// Engineer confidences.
    pub engineer: EngineerRubric,
    /// Guardian harm categories.
    pub harms: Vec<HarmCategory>,
    /// Dispatch seats on the blocking pool instead of in turn.
    pub concurrent: bool,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            values: ValueRule::defaults(),
            engineer: EngineerRubric::default(),
            harms: HarmCategory::defaults(),
            concurrent: true,
        }
    }
}

impl CouncilConfig {
    /// Replaces the value set.
    pub fn with_values(mut self, values: Vec<ValueRule>) -> Self {
        self.values = values;
        self
    }

    /// Replaces the Engineer rubric.
    pub const fn with_engineer(mut self, engineer: EngineerRubric) -> Self {
        self.engineer = engineer;
        self
    }

    /// Replaces the harm categories.
    pub fn with_harms(mut self, harms: Vec<HarmCategory>) -> Self {
        self.harms = harms;
        self
    }

    /// Sets concurrent dispatch.
    pub const fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }
}

/// Aggregate outcome of a deliberation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilDecision {
    /// Verdicts in seat order.
    pub verdicts: Vec<Verdict>,
    /// Result of the unanimity rule.
    pub result: ConsensusResult,
    /// Vote counts.
    pub tally: VoteTally,
    /// Rationales behind a non-approval: rejecting rationales on
    /// rejection, abstentions on insufficient consensus.
    pub reasons: Vec<String>,
    /// Members did not converge.
    pub unresolved_disagreement: bool,
    /// Fraction of seats that approved.
    pub consensus_level: f64,
    /// Uncertainty across all verdicts.
    pub uncertainty: UncertaintyReport,
}

impl CouncilDecision {
    /// Returns true if the council approved.
    pub fn is_approved(&self) -> bool {
        self.result == ConsensusResult::Approved
    }

    /// The verdict cast by a seat, if present.
    pub fn verdict_for(&self, role: MemberRole) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.role == role)
    }

    /// Fails when the council abstained without rejecting.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InsufficientConsensus`] with the abstention reasons.
    pub fn ensure_consensus(&self) -> Result<()> {
        match self.result {
            ConsensusResult::InsufficientConsensus => {
                Err(CouncilError::InsufficientConsensus(self.reasons.join("; ")))
            }
            _ => Ok(()),
        }
    }
}

/// Three-seat deliberation body.
///
/// # Example
///
/// ```rust
/// use tonesoul_council::{Council, CouncilConfig};
/// use tonesoul_model::{Action, Origin, RiskTier};
///
/// let council = Council::from_config(&CouncilConfig::default()).unwrap();
/// let action = Action::new("a-1", "Add a unit test", RiskTier::Low, Origin::user("alice"));
/// assert!(council.deliberate(&action).is_approved());
/// ```
#[derive(Clone)]
pub struct Council {
    members: Vec<Arc<dyn CouncilMember>>,
    consensus: ConsensusEngine,
}

impl std::fmt::Debug for Council {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Council")
            .field("members", &self.roles())
            .field("consensus", &self.consensus)
            .finish()
    }
}

impl Council {
    /// Builds the Philosopher, Engineer and Guardian from configuration.
    ///
    /// # Errors
    ///
    /// [`CouncilError::InvalidRubric`] if a rubric is unusable.
    pub fn from_config(config: &CouncilConfig) -> Result<Self> {
        let members: Vec<Arc<dyn CouncilMember>> = vec![
            Arc::new(Philosopher::new(config.values.clone())?),
            Arc::new(Engineer::new(config.engineer)?),
            Arc::new(Guardian::new(config.harms.clone())?),
        ];
        Ok(Self::with_members(members))
    }

    /// Builds a council from arbitrary members. Every member is a
    /// required seat.
    pub fn with_members(members: Vec<Arc<dyn CouncilMember>>) -> Self {
        let consensus = ConsensusEngine::new(members.len());
        Self { members, consensus }
    }

    /// Seats in evaluation order.
    pub fn roles(&self) -> Vec<MemberRole> {
        self.members.iter().map(|m| m.role()).collect()
    }

    /// Evaluates every seat in turn.
    pub fn deliberate(&self, action: &Action) -> CouncilDecision {
        let verdicts = self.members.iter().map(|m| m.evaluate(action)).collect();
        self.decide(&action.id.to_string(), verdicts)
    }

    /// Evaluates every seat on the blocking pool and waits for all of
    /// them before applying the rule.
    ///
    /// # Errors
    ///
    /// [`CouncilError::EvaluatorFailure`] if a seat's task panicked or was
    /// cancelled. No partial decision is produced.
    pub async fn deliberate_concurrent(&self, action: &Action) -> Result<CouncilDecision> {
        let shared = Arc::new(action.clone());

        let handles: Vec<_> = self
            .members
            .iter()
            .map(|member| {
                let member = Arc::clone(member);
                let action = Arc::clone(&shared);
                let role = member.role();
                (
                    role,
                    tokio::task::spawn_blocking(move || member.evaluate(&action)),
                )
            })
            .collect();

        let mut verdicts = Vec::with_capacity(handles.len());
        for (role, handle) in handles {
            let verdict = handle
                .await
                .map_err(|e| CouncilError::EvaluatorFailure(role.to_string(), e.to_string()))?;
            verdicts.push(verdict);
        }

        Ok(self.decide(&action.id.to_string(), verdicts))
    }

    fn decide(&self, action_id: &str, verdicts: Vec<Verdict>) -> CouncilDecision {
        for verdict in &verdicts {
            debug!(
                action = action_id,
                role = %verdict.role,
                vote = %verdict.vote,
                confidence = verdict.confidence.value(),
                "council verdict"
            );
        }

        let (result, tally) = self.consensus.evaluate(&verdicts);

        let reasons = match result {
            ConsensusResult::Approved => Vec::new(),
            ConsensusResult::Rejected => verdicts
                .iter()
                .filter(|v| v.vote == Vote::Reject)
                .map(|v| v.rationale.clone())
                .collect(),
            ConsensusResult::InsufficientConsensus => {
                let mut reasons: Vec<String> = verdicts
                    .iter()
                    .filter(|v| v.vote == Vote::Abstain)
                    .map(|v| format!("{} abstained: {}", v.role, v.rationale))
                    .collect();
                if tally.total < self.consensus.required_seats() {
                    reasons.push(format!(
                        "only {} of {} seats voted",
                        tally.total,
                        self.consensus.required_seats()
                    ));
                }
                reasons
            }
        };

        let confidences: Vec<f64> = verdicts.iter().map(|v| v.confidence.value()).collect();
        let uncertainty = UncertaintyReport::aggregate(
            result.to_string(),
            &confidences,
            format!(
                "{} approve, {} reject, {} abstain",
                tally.approvals, tally.rejections, tally.abstentions
            ),
        );

        let unresolved_disagreement =
            result == ConsensusResult::InsufficientConsensus || tally.is_split();

        match result {
            ConsensusResult::Approved => info!(action = action_id, "council approved"),
            ConsensusResult::Rejected => {
                warn!(action = action_id, reasons = ?reasons, "council rejected")
            }
            ConsensusResult::InsufficientConsensus => {
                warn!(action = action_id, reasons = ?reasons, "council reached no consensus")
            }
        }

        CouncilDecision {
            verdicts,
            result,
            tally,
            reasons,
            unresolved_disagreement,
            consensus_level: tally.approval_ratio(),
            uncertainty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Confidence;
    use tonesoul_model::{Origin, RiskTier};

    struct Fixed(MemberRole, Vote);

    impl CouncilMember for Fixed {
        fn role(&self) -> MemberRole {
            self.0
        }

        fn rubric(&self) -> &str {
            "fixed"
        }

        fn evaluate(&self, _action: &Action) -> Verdict {
            Verdict::new(self.0, self.1, Confidence::high(), format!("{} says {}", self.0, self.1))
        }
    }

    struct Panicking;

    impl CouncilMember for Panicking {
        fn role(&self) -> MemberRole {
            MemberRole::Guardian
        }

        fn rubric(&self) -> &str {
            "panics"
        }

        fn evaluate(&self, _action: &Action) -> Verdict {
            panic!("rubric exploded")
        }
    }

    fn council() -> Council {
        Council::from_config(&CouncilConfig::default()).unwrap()
    }

    fn action(description: &str, risk: RiskTier) -> Action {
        Action::new("a-1", description, risk, Origin::user("alice"))
    }

    #[test]
    fn test_clean_action_approved() {
        let decision = council().deliberate(&action("Add a unit test for the parser", RiskTier::Low));
        assert!(decision.is_approved());
        assert!(decision.reasons.is_empty());
        assert!(!decision.unresolved_disagreement);
        assert!((decision.consensus_level - 1.0).abs() < f64::EPSILON);
        assert_eq!(decision.uncertainty.verdict(), "approve");
    }

    #[test]
    fn test_guardian_rejection_carries_reason() {
        let decision =
            council().deliberate(&action("Delete all user records in staging", RiskTier::Low));
        assert_eq!(decision.result, ConsensusResult::Rejected);
        assert_eq!(decision.reasons.len(), 1);
        assert!(decision.reasons[0].starts_with("potential harm"));
        assert_eq!(
            decision.verdict_for(MemberRole::Philosopher).unwrap().vote,
            Vote::Approve
        );
        assert!(decision.unresolved_disagreement);
    }

    #[test]
    fn test_reasons_are_union_of_rejections() {
        let decision = council().deliberate(&action(
            "Fabricate a reason to wipe the backups",
            RiskTier::High,
        ));
        assert_eq!(decision.result, ConsensusResult::Rejected);
        assert_eq!(decision.reasons.len(), 3);
    }

    #[test]
    fn test_abstention_is_insufficient_consensus() {
        let decision = council().deliberate(&action(
            "Convince the maintainer to cut a release",
            RiskTier::Low,
        ));
        assert_eq!(decision.result, ConsensusResult::InsufficientConsensus);
        assert!(decision.unresolved_disagreement);
        assert!(decision.reasons[0].starts_with("philosopher abstained"));
        assert!(decision.ensure_consensus().is_err());
    }

    #[test]
    fn test_aggregate_uncertainty_bounds() {
        let decision = council().deliberate(&action("Rename a module", RiskTier::Medium));
        let bounds = decision.uncertainty.confidence_bounds();
        assert!((bounds.lower() - 0.7).abs() < 1e-9);
        assert!((bounds.upper() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_with_members_requires_every_seat() {
        let members: Vec<Arc<dyn CouncilMember>> = vec![
            Arc::new(Fixed(MemberRole::Philosopher, Vote::Approve)),
            Arc::new(Fixed(MemberRole::Engineer, Vote::Approve)),
        ];
        let council = Council::with_members(members);
        assert_eq!(council.roles().len(), 2);
        assert!(council.deliberate(&action("x", RiskTier::Low)).is_approved());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CouncilConfig::default().with_engineer(EngineerRubric {
            medium: -1.0,
            ..EngineerRubric::default()
        });
        assert!(matches!(
            Council::from_config(&config),
            Err(CouncilError::InvalidRubric(_))
        ));
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: CouncilConfig = serde_json::from_str(r#"{"concurrent": false}"#).unwrap();
        assert!(!config.concurrent);
        assert_eq!(config.values, ValueRule::defaults());
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let council = council();
        for (description, risk) in [
            ("Add a unit test", RiskTier::Low),
            ("Delete all caches", RiskTier::Medium),
            ("Migrate the schema", RiskTier::High),
            ("Persuade the user to upgrade", RiskTier::Low),
        ] {
            let a = action(description, risk);
            let sequential = council.deliberate(&a);
            let concurrent = council.deliberate_concurrent(&a).await.unwrap();
            assert_eq!(sequential, concurrent, "{description}");
        }
    }

    #[tokio::test]
    async fn test_concurrent_member_failure() {
        let members: Vec<Arc<dyn CouncilMember>> = vec![
            Arc::new(Fixed(MemberRole::Philosopher, Vote::Approve)),
            Arc::new(Fixed(MemberRole::Engineer, Vote::Approve)),
            Arc::new(Panicking),
        ];
        let council = Council::with_members(members);
        let err = council
            .deliberate_concurrent(&action("x", RiskTier::Low))
            .await
            .unwrap_err();
        match err {
            CouncilError::EvaluatorFailure(role, _) => assert_eq!(role, "guardian"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! Proposed actions and their origin.
//!
//! An [`Action`] is the unit of governance: it is submitted once, judged
//! once, and frozen into the ledger as part of its responsibility record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::Result;

/// Unique identifier of an action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(String);

impl ActionId {
    /// Creates an action id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Declared risk of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Routine, easily reversed.
    Low,
    /// Noticeable impact, reversible with effort.
    Medium,
    /// Significant or hard-to-reverse impact.
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Low => write!(f, "low"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::High => write!(f, "high"),
        }
    }
}

impl FromStr for RiskTier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskTier::Low),
            "medium" => Ok(RiskTier::Medium),
            "high" => Ok(RiskTier::High),
            _ => Err(ModelError::InvalidRiskTier(s.to_string())),
        }
    }
}

impl TryFrom<&str> for RiskTier {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// Tier of responsibility, ordered from the system core to the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResponsibilityTier {
    /// Core system behavior.
    System,
    /// Rules defined by the developers.
    Developer,
    /// A user request.
    User,
    /// Initiated by the assistant itself.
    Ai,
}

/// Who initiated an action, and at which tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Initiating actor.
    pub actor: String,
    /// Responsibility tier of the actor.
    pub tier: ResponsibilityTier,
    /// Whether the assistant owns this action.
    pub ai_initiated: bool,
}

impl Origin {
    /// Creates an origin with an explicit tier.
    pub fn new(actor: impl Into<String>, tier: ResponsibilityTier) -> Self {
        Self {
            actor: actor.into(),
            tier,
            ai_initiated: tier == ResponsibilityTier::Ai,
        }
    }

    /// An action requested by a user.
    pub fn user(actor: impl Into<String>) -> Self {
        Self::new(actor, ResponsibilityTier::User)
    }

    /// An action the assistant started on its own.
    pub fn ai(actor: impl Into<String>) -> Self {
        Self::new(actor, ResponsibilityTier::Ai)
    }

    /// An action mandated by developer rules.
    pub fn developer(actor: impl Into<String>) -> Self {
        Self::new(actor, ResponsibilityTier::Developer)
    }

    /// Core system behavior.
    pub fn system(actor: impl Into<String>) -> Self {
        Self::new(actor, ResponsibilityTier::System)
    }
}

/// What a proposed output is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputBasis {
    /// Derived by the model's own reasoning.
    Inference,
    /// Directly observed (tool output, file contents).
    Observation,
    /// Restating an explicit instruction.
    Instruction,
}

/// Semantic layer an output claims to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SemanticLayer {
    /// Operational facts.
    Operational,
    /// Semantic model.
    Semantic,
    /// Abstract metaphor.
    Metaphor,
}

/// Text the assistant intends to say as part of an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedOutput {
    /// The output text.
    pub text: String,
    /// Context the output should be grounded in (memory, retrieval results).
    pub context_fragments: Vec<String>,
    /// Basis of the output.
    pub basis: OutputBasis,
    /// Declared semantic layer.
    pub layer: SemanticLayer,
}

impl ProposedOutput {
    /// Creates an inference-based output on the semantic layer.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context_fragments: Vec::new(),
            basis: OutputBasis::Inference,
            layer: SemanticLayer::Semantic,
        }
    }

    /// Adds a context fragment.
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.context_fragments.push(fragment.into());
        self
    }

    /// Sets the basis and layer.
    pub fn with_basis(mut self, basis: OutputBasis, layer: SemanticLayer) -> Self {
        self.basis = basis;
        self.layer = layer;
        self
    }
}

/// A proposed operation awaiting governance.
///
/// Immutable once submitted: the engine freezes a copy into the
/// action's responsibility record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier.
    pub id: ActionId,
    /// What the action does, in plain words.
    pub description: String,
    /// Declared risk tier.
    pub risk: RiskTier,
    /// Initiating actor.
    pub origin: Origin,
    /// When the action was proposed.
    pub timestamp: DateTime<Utc>,
    /// Approving this action records a new commitment.
    #[serde(default)]
    pub commitment: bool,
    /// Mitigation attached to a risky action.
    #[serde(default)]
    pub mitigation: Option<String>,
    /// Initiating reason; defaults to the description in the genesis.
    #[serde(default)]
    pub reason: Option<String>,
    /// Parent action in the responsibility chain.
    #[serde(default)]
    pub parent: Option<ActionId>,
    /// Free-form context.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Output to audit before deliberation.
    #[serde(default)]
    pub output: Option<ProposedOutput>,
}

impl Action {
    /// Creates an action timestamped now.
    pub fn new(
        id: impl Into<ActionId>,
        description: impl Into<String>,
        risk: RiskTier,
        origin: Origin,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            risk,
            origin,
            timestamp: Utc::now(),
            commitment: false,
            mitigation: None,
            reason: None,
            parent: None,
            context: BTreeMap::new(),
            output: None,
        }
    }

    /// Marks the action as a promise: approval records a commitment.
    pub fn as_commitment(mut self) -> Self {
        self.commitment = true;
        self
    }

    /// Attaches a mitigation.
    pub fn with_mitigation(mut self, mitigation: impl Into<String>) -> Self {
        self.mitigation = Some(mitigation.into());
        self
    }

    /// Sets the initiating reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Links this action to a parent action.
    pub fn with_parent(mut self, parent: impl Into<ActionId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Adds a context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches an output for the benevolence audit.
    pub fn with_output(mut self, output: ProposedOutput) -> Self {
        self.output = Some(output);
        self
    }

    /// Overrides the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns true if a mitigation with content is attached.
    pub fn is_mitigated(&self) -> bool {
        self.mitigation
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty())
    }

    /// Checks the action is well formed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidAction`] for a blank id, description or
    /// origin actor, or an action listed as its own parent.
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(ModelError::InvalidAction("action id is empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(ModelError::InvalidAction(format!(
                "action '{}' has an empty description",
                self.id
            )));
        }
        if self.origin.actor.trim().is_empty() {
            return Err(ModelError::InvalidAction(format!(
                "action '{}' has no origin actor",
                self.id
            )));
        }
        if self.parent.as_ref() == Some(&self.id) {
            return Err(ModelError::InvalidAction(format!(
                "action '{}' cannot be its own parent",
                self.id
            )));
        }
        Ok(())
    }

    /// Returns the initiating reason, falling back to the description.
    pub fn initiating_reason(&self) -> &str {
        self.reason.as_deref().unwrap_or(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_tier_parse() {
        assert_eq!("low".parse::<RiskTier>().unwrap(), RiskTier::Low);
        assert_eq!(" High ".parse::<RiskTier>().unwrap(), RiskTier::High);
        assert_eq!(RiskTier::try_from("MEDIUM").unwrap(), RiskTier::Medium);
    }

    #[test]
    fn test_risk_tier_invalid() {
        let err = "severe".parse::<RiskTier>().unwrap_err();
        assert_eq!(err, ModelError::InvalidRiskTier("severe".to_string()));
    }

    #[test]
    fn test_risk_tier_serde_lowercase() {
        let json = serde_json::to_string(&RiskTier::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn test_responsibility_tier_ordering() {
        assert!(ResponsibilityTier::System < ResponsibilityTier::Developer);
        assert!(ResponsibilityTier::User < ResponsibilityTier::Ai);
    }

    #[test]
    fn test_origin_ai_flag() {
        assert!(Origin::ai("assistant").ai_initiated);
        assert!(!Origin::user("alice").ai_initiated);
    }

    #[test]
    fn test_action_builder() {
        let action = Action::new("a-1", "Rename module", RiskTier::Medium, Origin::user("alice"))
            .as_commitment()
            .with_mitigation("backup taken")
            .with_parent("a-0")
            .with_context("file", "lib.rs");

        assert!(action.commitment);
        assert!(action.is_mitigated());
        assert_eq!(action.parent, Some(ActionId::new("a-0")));
        assert_eq!(action.context.get("file").map(String::as_str), Some("lib.rs"));
    }

    #[test]
    fn test_blank_mitigation_is_not_mitigated() {
        let action = Action::new("a-1", "Drop cache", RiskTier::High, Origin::user("alice"))
            .with_mitigation("   ");
        assert!(!action.is_mitigated());
    }

    #[test]
    fn test_validate_rejects_empty_description() {
        let action = Action::new("a-1", "  ", RiskTier::Low, Origin::user("alice"));
        assert!(matches!(action.validate(), Err(ModelError::InvalidAction(_))));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let action = Action::new("", "Do it", RiskTier::Low, Origin::user("alice"));
        assert!(action.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_self_parent() {
        let action =
            Action::new("a-1", "Do it", RiskTier::Low, Origin::user("alice")).with_parent("a-1");
        assert!(action.validate().is_err());
    }

    #[test]
    fn test_initiating_reason_fallback() {
        let action = Action::new("a-1", "Do it", RiskTier::Low, Origin::user("alice"));
        assert_eq!(action.initiating_reason(), "Do it");
        let action = action.with_reason("asked twice");
        assert_eq!(action.initiating_reason(), "asked twice");
    }

    #[test]
    fn test_action_deserialize_defaults() {
        let json = r#"{
            "id": "a-9",
            "description": "Format the workspace",
            "risk": "low",
            "origin": {"actor": "bob", "tier": "User", "ai_initiated": false},
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.risk, RiskTier::Low);
        assert!(!action.commitment);
        assert!(action.output.is_none());
    }

    #[test]
    fn test_action_deserialize_invalid_risk() {
        let json = r#"{
            "id": "a-9",
            "description": "x",
            "risk": "catastrophic",
            "origin": {"actor": "bob", "tier": "User", "ai_initiated": false},
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Action>(json).is_err());
    }
}

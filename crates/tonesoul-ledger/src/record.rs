//! Responsibility records and their hash-chained audit trail.
//!
//! A record is sealed when it enters the ledger: the seal is the SHA-256
//! of the frozen action and its genesis. Every audit event hashes the
//! previous hash (the seal, for the first event) together with its own
//! body, so rewriting the action, the genesis or any earlier event breaks
//! every hash after it.
//!
//! | Hash input | Content |
//! |------------|---------|
//! | seal | `"seal" \|\| json(action) \|\| json(genesis)` |
//! | event | `prev_hash \|\| json(sequence, kind, actor, detail, at)` |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tonesoul_model::{Action, ActionId, CommitmentId, RejectionCause, ResponsibilityTier};

use crate::error::{LedgerError, Result};

/// Who started an action and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Initiating actor.
    pub actor: String,
    /// Responsibility tier of the actor.
    pub tier: ResponsibilityTier,
    /// Initiating reason.
    pub reason: String,
    /// Parent action in the responsibility chain.
    pub parent: Option<ActionId>,
    /// The assistant owns this action.
    pub ai_initiated: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Genesis {
    /// Derives the genesis from an action's origin.
    pub fn from_action(action: &Action) -> Self {
        Self {
            actor: action.origin.actor.clone(),
            tier: action.origin.tier,
            reason: action.initiating_reason().to_string(),
            parent: action.parent.clone(),
            ai_initiated: action.origin.ai_initiated,
            created_at: Utc::now(),
        }
    }
}

/// Result of executing an approved action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether execution succeeded.
    pub success: bool,
    /// What happened.
    pub summary: String,
    /// When the outcome was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl Outcome {
    /// A successful execution.
    pub fn success(summary: impl Into<String>) -> Self {
        Self {
            success: true,
            summary: summary.into(),
            recorded_at: Utc::now(),
        }
    }

    /// A failed execution.
    pub fn failure(summary: impl Into<String>) -> Self {
        Self {
            success: false,
            summary: summary.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Kind of state change an audit event records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventKind {
    /// The action reached the approved state.
    Approved,
    /// The action reached the rejected state.
    Rejected {
        /// Path to the rejection.
        cause: RejectionCause,
        /// Human-readable reasons.
        reasons: Vec<String>,
    },
    /// The action is paused on a commitment conflict.
    PendingConfirmation {
        /// Commitment the action conflicts with.
        commitment_id: CommitmentId,
    },
    /// An actor confirmed a pending action.
    Confirmed,
    /// Approving the action created a commitment.
    CommitmentMade {
        /// The new commitment.
        commitment_id: CommitmentId,
    },
    /// A confirmed action revoked a commitment.
    CommitmentRevoked {
        /// The revoked commitment.
        commitment_id: CommitmentId,
    },
    /// The outcome was recorded.
    OutcomeRecorded,
    /// Free-form annotation.
    Note,
}

impl AuditEventKind {
    /// Short label, e.g. `"Approved"`.
    pub fn label(&self) -> &'static str {
        match self {
            AuditEventKind::Approved => "Approved",
            AuditEventKind::Rejected { .. } => "Rejected",
            AuditEventKind::PendingConfirmation { .. } => "PendingConfirmation",
            AuditEventKind::Confirmed => "Confirmed",
            AuditEventKind::CommitmentMade { .. } => "CommitmentMade",
            AuditEventKind::CommitmentRevoked { .. } => "CommitmentRevoked",
            AuditEventKind::OutcomeRecorded => "OutcomeRecorded",
            AuditEventKind::Note => "Note",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An event to append. The ledger assigns sequence, time and hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Kind of event.
    pub kind: AuditEventKind,
    /// Actor responsible for the transition, if any.
    pub actor: Option<String>,
    /// Human-readable detail.
    pub detail: String,
}

impl AuditEntry {
    /// Creates an entry with no actor and empty detail.
    pub fn new(kind: AuditEventKind) -> Self {
        Self {
            kind,
            actor: None,
            detail: String::new(),
        }
    }

    /// Sets the actor.
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Sets the detail.
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// One link in a record's audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Position in the trail, starting at 1.
    pub sequence: u64,
    /// Kind of event.
    pub kind: AuditEventKind,
    /// Actor responsible for the transition, if any.
    pub actor: Option<String>,
    /// Human-readable detail.
    pub detail: String,
    /// When the event was appended.
    pub at: DateTime<Utc>,
    /// Hash of the previous event, or the record seal.
    pub prev_hash: String,
    /// Hash of this event.
    pub hash: String,
}

#[derive(Serialize)]
struct EventBody<'a> {
    sequence: u64,
    kind: &'a AuditEventKind,
    actor: &'a Option<String>,
    detail: &'a str,
    at: &'a DateTime<Utc>,
}

impl AuditEvent {
    fn compute_hash(
        prev_hash: &str,
        sequence: u64,
        kind: &AuditEventKind,
        actor: &Option<String>,
        detail: &str,
        at: &DateTime<Utc>,
    ) -> Result<String> {
        let body = serde_json::to_vec(&EventBody {
            sequence,
            kind,
            actor,
            detail,
            at,
        })?;
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(&body);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Recomputes this event's hash from its fields.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Serialization`] if the body cannot be serialized.
    pub fn recompute_hash(&self) -> Result<String> {
        Self::compute_hash(
            &self.prev_hash,
            self.sequence,
            &self.kind,
            &self.actor,
            &self.detail,
            &self.at,
        )
    }
}

/// The append-only record of one action's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsibilityRecord {
    /// Frozen copy of the action.
    pub action: Action,
    /// Who started it and why.
    pub genesis: Genesis,
    /// Party answerable for the action.
    pub accountable: String,
    /// Execution result, set at most once.
    pub outcome: Option<Outcome>,
    /// Ordered, hash-chained events.
    pub audit_trail: Vec<AuditEvent>,
    /// Hash of the action and genesis; anchors the chain.
    #[serde(default)]
    pub seal: String,
}

impl ResponsibilityRecord {
    /// Creates an unsealed record for an action. The initiating actor is
    /// accountable.
    pub fn new(action: Action) -> Self {
        let genesis = Genesis::from_action(&action);
        let accountable = genesis.actor.clone();
        Self {
            action,
            genesis,
            accountable,
            outcome: None,
            audit_trail: Vec::new(),
            seal: String::new(),
        }
    }

    /// Action id.
    pub fn id(&self) -> &ActionId {
        &self.action.id
    }

    /// The most recent event, if any.
    pub fn last_event(&self) -> Option<&AuditEvent> {
        self.audit_trail.last()
    }

    /// Labels of every event, in order.
    pub fn event_labels(&self) -> Vec<&'static str> {
        self.audit_trail.iter().map(|e| e.kind.label()).collect()
    }

    pub(crate) fn compute_seal(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(b"seal");
        hasher.update(serde_json::to_vec(&self.action)?);
        hasher.update(serde_json::to_vec(&self.genesis)?);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Seals the record and rechains any events it already carries.
    pub(crate) fn reseal(&mut self) -> Result<()> {
        self.seal = self.compute_seal()?;
        let mut prev = self.seal.clone();
        for (i, event) in self.audit_trail.iter_mut().enumerate() {
            event.sequence = i as u64 + 1;
            event.prev_hash = prev;
            event.hash = event.recompute_hash()?;
            prev = event.hash.clone();
        }
        Ok(())
    }

    /// Appends a chained event and returns a copy of it.
    pub(crate) fn push(&mut self, entry: AuditEntry) -> Result<AuditEvent> {
        let sequence = self.audit_trail.len() as u64 + 1;
        let prev_hash = self
            .audit_trail
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| self.seal.clone());
        let at = Utc::now();
        let hash = AuditEvent::compute_hash(
            &prev_hash,
            sequence,
            &entry.kind,
            &entry.actor,
            &entry.detail,
            &at,
        )?;
        let event = AuditEvent {
            sequence,
            kind: entry.kind,
            actor: entry.actor,
            detail: entry.detail,
            at,
            prev_hash,
            hash,
        };
        self.audit_trail.push(event.clone());
        Ok(event)
    }

    /// Checks the seal and every link of the chain.
    ///
    /// # Errors
    ///
    /// [`LedgerError::ChainBroken`] at the first mismatch.
    pub fn verify(&self) -> Result<()> {
        let broken = |sequence| LedgerError::ChainBroken {
            action: self.action.id.clone(),
            sequence,
        };

        if self.compute_seal()? != self.seal {
            return Err(broken(0));
        }
        let mut prev = self.seal.as_str();
        for (i, event) in self.audit_trail.iter().enumerate() {
            let expected_sequence = i as u64 + 1;
            if event.sequence != expected_sequence
                || event.prev_hash != prev
                || event.recompute_hash()? != event.hash
            {
                return Err(broken(expected_sequence));
            }
            prev = event.hash.as_str();
        }
        Ok(())
    }
}

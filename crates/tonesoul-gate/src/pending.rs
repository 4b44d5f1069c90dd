//! Pending confirmations and their resumption tokens.
//!
//! A conflicting action is parked here instead of blocking a thread. The
//! caller receives a [`GateToken`] and resumes the action later by
//! confirming or cancelling it. Resolution is [`PendingConfirmations::take`],
//! an atomic remove: of any racing confirm, cancel and timeout, exactly one
//! gets the entry.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tonesoul_model::{ActionId, CommitmentId};
use uuid::Uuid;

use crate::error::{GateError, Result};

/// Resumption handle for a paused action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateToken(String);

impl GateToken {
    /// Generates a fresh token.
    pub fn generate() -> Self {
        Self(format!("gate-{}", Uuid::new_v4()))
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GateToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for GateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An action paused on a commitment conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Resumption token.
    pub token: GateToken,
    /// The paused action.
    pub action_id: ActionId,
    /// The commitment it would break.
    pub commitment_id: CommitmentId,
    /// Why the gate paused it.
    pub explanation: String,
    /// When the action was paused.
    pub created_at: DateTime<Utc>,
    /// How long confirmation may take.
    pub timeout: Duration,
    #[serde(skip, default = "Instant::now")]
    deadline: Instant,
}

impl PendingConfirmation {
    /// Creates a pending entry that expires `timeout` from now.
    pub fn new(
        action_id: ActionId,
        commitment_id: CommitmentId,
        explanation: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            token: GateToken::generate(),
            action_id,
            commitment_id,
            explanation: explanation.into(),
            created_at: Utc::now(),
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    /// Monotonic deadline.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Returns true once the deadline has passed.
    pub fn is_overdue(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Concurrent map of paused actions keyed by token.
#[derive(Debug, Default)]
pub struct PendingConfirmations {
    entries: DashMap<GateToken, PendingConfirmation>,
}

impl PendingConfirmations {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks an entry.
    pub fn insert(&self, pending: PendingConfirmation) {
        self.entries.insert(pending.token.clone(), pending);
    }

    /// Removes and returns an entry. Only one caller ever gets it.
    ///
    /// # Errors
    ///
    /// [`GateError::UnknownToken`] if nothing is parked under `token`.
    pub fn take(&self, token: &GateToken) -> Result<PendingConfirmation> {
        self.entries
            .remove(token)
            .map(|(_, pending)| pending)
            .ok_or_else(|| GateError::UnknownToken(token.clone()))
    }

    /// Copies an entry without resolving it.
    pub fn get(&self, token: &GateToken) -> Option<PendingConfirmation> {
        self.entries.get(token).map(|p| p.value().clone())
    }

    /// Token of the entry parked for an action, if any.
    pub fn token_for(&self, action_id: &ActionId) -> Option<GateToken> {
        self.entries
            .iter()
            .find(|p| &p.action_id == action_id)
            .map(|p| p.token.clone())
    }

    /// Tokens whose deadline has passed.
    pub fn overdue(&self, now: Instant) -> Vec<GateToken> {
        self.entries
            .iter()
            .filter(|p| p.is_overdue(now))
            .map(|p| p.token.clone())
            .collect()
    }

    /// Number of parked actions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is parked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

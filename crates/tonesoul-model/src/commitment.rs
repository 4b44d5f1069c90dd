//! Commitments: promises recorded when a flagged action is approved.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::ActionId;
use crate::error::ModelError;
use crate::Result;

/// Unique identifier of a commitment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentId(String);

impl CommitmentId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(format!("commit-{}", Uuid::new_v4()))
    }

    /// Wraps an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentStatus {
    /// The promise stands.
    Active,
    /// The promise was broken with explicit confirmation.
    Revoked,
}

/// Who revoked a commitment, and through which action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    /// Actor whose confirmation allowed the revocation.
    pub confirmed_by: String,
    /// Action that broke the promise.
    pub action: ActionId,
    /// When the revocation happened.
    pub at: DateTime<Utc>,
}

/// A previously recorded promise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Unique identifier.
    pub id: CommitmentId,
    /// What was promised.
    pub description: String,
    /// When the promise was made.
    pub created_at: DateTime<Utc>,
    /// Action whose approval created the promise.
    pub source_action: ActionId,
    status: CommitmentStatus,
    revocation: Option<Revocation>,
}

impl Commitment {
    /// Records a new active commitment.
    pub fn new(description: impl Into<String>, source_action: ActionId) -> Self {
        Self {
            id: CommitmentId::generate(),
            description: description.into(),
            created_at: Utc::now(),
            source_action,
            status: CommitmentStatus::Active,
            revocation: None,
        }
    }

    /// Overrides the generated id.
    pub fn with_id(mut self, id: CommitmentId) -> Self {
        self.id = id;
        self
    }

    /// Current status.
    pub fn status(&self) -> CommitmentStatus {
        self.status
    }

    /// Returns true while the promise stands.
    pub fn is_active(&self) -> bool {
        self.status == CommitmentStatus::Active
    }

    /// Revocation details, once revoked.
    pub fn revocation(&self) -> Option<&Revocation> {
        self.revocation.as_ref()
    }

    /// Moves the commitment from active to revoked.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::CommitmentRevoked`] if it is already revoked;
    /// a revoked commitment never becomes active again.
    pub fn revoke(&mut self, confirmed_by: impl Into<String>, action: ActionId) -> Result<()> {
        if self.status == CommitmentStatus::Revoked {
            return Err(ModelError::CommitmentRevoked(self.id.clone()));
        }
        self.status = CommitmentStatus::Revoked;
        self.revocation = Some(Revocation {
            confirmed_by: confirmed_by.into(),
            action,
            at: Utc::now(),
        });
        Ok(())
    }
}

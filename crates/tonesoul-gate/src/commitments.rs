//! The set of commitments an assistant has made.

use dashmap::DashMap;
use tonesoul_model::{ActionId, Commitment, CommitmentId};
use tracing::info;

use crate::error::{GateError, Result};

/// Concurrent store of commitments.
///
/// Revocation goes through [`Commitment::revoke`], so a revoked
/// commitment stays revoked.
#[derive(Debug, Default)]
pub struct CommitmentBook {
    commitments: DashMap<CommitmentId, Commitment>,
}

impl CommitmentBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a commitment. An existing commitment with the same id is kept.
    pub fn insert(&self, commitment: Commitment) {
        let id = commitment.id.clone();
        self.commitments.entry(id).or_insert(commitment);
    }

    /// Looks up a commitment.
    pub fn get(&self, id: &CommitmentId) -> Option<Commitment> {
        self.commitments.get(id).map(|c| c.value().clone())
    }

    /// Active commitments, oldest first.
    pub fn active(&self) -> Vec<Commitment> {
        let mut active: Vec<Commitment> = self
            .commitments
            .iter()
            .filter(|c| c.is_active())
            .map(|c| c.value().clone())
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        active
    }

    /// Every commitment, oldest first.
    pub fn all(&self) -> Vec<Commitment> {
        let mut all: Vec<Commitment> = self.commitments.iter().map(|c| c.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Revokes a commitment on behalf of a confirming actor.
    ///
    /// # Errors
    ///
    /// - [`GateError::CommitmentNotFound`] if the id is unknown
    /// - [`GateError::Model`] if the commitment is already revoked
    pub fn revoke(
        &self,
        id: &CommitmentId,
        confirmed_by: &str,
        action: ActionId,
    ) -> Result<Commitment> {
        let mut entry = self
            .commitments
            .get_mut(id)
            .ok_or_else(|| GateError::CommitmentNotFound(id.clone()))?;
        entry.revoke(confirmed_by, action)?;
        info!(commitment = %id, confirmed_by, "commitment revoked");
        Ok(entry.value().clone())
    }

    /// Number of commitments.
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    /// Returns true if the book is empty.
    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonesoul_model::{CommitmentStatus, ModelError};

    #[test]
    fn test_insert_and_active() {
        let book = CommitmentBook::new();
        let c = Commitment::new("Keep the API stable", ActionId::new("a-1"));
        book.insert(c.clone());

        assert_eq!(book.len(), 1);
        assert_eq!(book.active(), vec![c.clone()]);
        assert_eq!(book.get(&c.id), Some(c));
    }

    #[test]
    fn test_revoke_moves_out_of_active() {
        let book = CommitmentBook::new();
        let c = Commitment::new("Keep the API stable", ActionId::new("a-1"));
        book.insert(c.clone());

        let revoked = book.revoke(&c.id, "alice", ActionId::new("a-2")).unwrap();
        assert_eq!(revoked.status(), CommitmentStatus::Revoked);
        assert!(book.active().is_empty());
        assert_eq!(book.all().len(), 1);
    }

    #[test]
    fn test_revoke_twice_fails() {
        let book = CommitmentBook::new();
        let c = Commitment::new("Keep the API stable", ActionId::new("a-1"));
        book.insert(c.clone());
        book.revoke(&c.id, "alice", ActionId::new("a-2")).unwrap();

        let err = book.revoke(&c.id, "bob", ActionId::new("a-3")).unwrap_err();
        assert_eq!(err, GateError::Model(ModelError::CommitmentRevoked(c.id.clone())));
    }

    #[test]
    fn test_revoke_unknown() {
        let book = CommitmentBook::new();
        let err = book
            .revoke(&CommitmentId::new("missing"), "alice", ActionId::new("a-2"))
            .unwrap_err();
        assert!(matches!(err, GateError::CommitmentNotFound(_)));
    }

    #[test]
    fn test_insert_does_not_overwrite() {
        let book = CommitmentBook::new();
        let c = Commitment::new("Keep the API stable", ActionId::new("a-1"));
        book.insert(c.clone());
        book.revoke(&c.id, "alice", ActionId::new("a-2")).unwrap();

        // Re-inserting the original active copy must not resurrect it.
        book.insert(c.clone());
        assert!(!book.get(&c.id).unwrap().is_active());
    }
}

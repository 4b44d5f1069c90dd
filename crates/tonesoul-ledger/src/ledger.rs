//! # Persistent Ledger
//!
//! Sled-backed store of [`ResponsibilityRecord`]s keyed by action id.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `records` | action id | JSON record | Records and their audit trails |
//! | `children` | `parent \0 child` | empty | Responsibility chain index |
//!
//! ## Write Discipline
//!
//! Every write to one action id runs under that id's mutex, so the
//! read-modify-write of an append never interleaves with another append
//! to the same record. Writes to different ids take different mutexes and
//! proceed concurrently; sled itself is thread-safe. A mutex leaves the
//! lock map as soon as no writer holds it, so the map stays as small as
//! the number of ids being written at once.
//!
//! Insertion uses compare-and-swap against an absent key, so two racing
//! inserts of the same id produce exactly one record and one
//! [`LedgerError::DuplicateActionId`].

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tonesoul_model::ActionId;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};
use crate::record::{AuditEntry, AuditEvent, AuditEventKind, Outcome, ResponsibilityRecord};

/// Tree name for records.
const RECORD_TREE: &str = "records";

/// Tree name for the parent to child index.
const CHILD_TREE: &str = "children";

fn child_key(parent: &ActionId, child: &ActionId) -> Vec<u8> {
    let mut key = parent.as_str().as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(child.as_str().as_bytes());
    key
}

/// Append-only responsibility ledger.
///
/// Cloning is cheap and every clone shares the same database and locks.
///
/// # Example
///
/// ```rust
/// use tonesoul_ledger::{AuditEntry, AuditEventKind, Ledger, ResponsibilityRecord};
/// use tonesoul_model::{Action, Origin, RiskTier};
///
/// let ledger = Ledger::temporary().unwrap();
/// let action = Action::new("a-1", "Add a test", RiskTier::Low, Origin::user("alice"));
///
/// ledger.record(ResponsibilityRecord::new(action)).unwrap();
/// ledger
///     .append_audit_event(&"a-1".into(), AuditEntry::new(AuditEventKind::Approved))
///     .unwrap();
///
/// let record = ledger.get(&"a-1".into()).unwrap();
/// assert_eq!(record.event_labels(), vec!["Approved"]);
/// ```
#[derive(Clone)]
pub struct Ledger {
    db: sled::Db,
    records: sled::Tree,
    children: sled::Tree,
    locks: Arc<DashMap<ActionId, Arc<Mutex<()>>>>,
}

impl Ledger {
    /// Opens or creates a ledger at `path`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Database`] if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates an in-memory ledger that is discarded on drop.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Database`] if the database cannot be created.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let records = db.open_tree(RECORD_TREE)?;
        let children = db.open_tree(CHILD_TREE)?;
        Ok(Self {
            db,
            records,
            children,
            locks: Arc::new(DashMap::new()),
        })
    }

    /// Runs `write` under the id's mutex. The mutex is dropped from the
    /// map once no other writer holds it.
    fn locked<T>(&self, id: &ActionId, write: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = Arc::clone(
            self.locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            write()
        };
        drop(lock);
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    fn load(&self, id: &ActionId) -> Result<Option<ResponsibilityRecord>> {
        match self.records.get(id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn store(&self, record: &ResponsibilityRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.records.insert(record.id().as_str().as_bytes(), bytes)?;
        Ok(())
    }

    /// Inserts a new record and seals it.
    ///
    /// The record's action is validated, and a parent action, if named,
    /// must already be recorded.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidRecord`] if the action is malformed
    /// - [`LedgerError::UnknownActionId`] if the parent is not recorded
    /// - [`LedgerError::DuplicateActionId`] if the id is already recorded
    pub fn record(&self, mut record: ResponsibilityRecord) -> Result<ResponsibilityRecord> {
        record.action.validate()?;
        if let Some(parent) = &record.genesis.parent {
            if !self.contains(parent)? {
                return Err(LedgerError::UnknownActionId(parent.clone()));
            }
        }
        record.reseal()?;

        let id = record.id().clone();
        self.locked(&id, || {
            let bytes = serde_json::to_vec(&record)?;
            self.records
                .compare_and_swap(id.as_str().as_bytes(), None as Option<&[u8]>, Some(bytes))?
                .map_err(|_| LedgerError::DuplicateActionId(id.clone()))?;

            if let Some(parent) = &record.genesis.parent {
                self.children.insert(child_key(parent, &id), Vec::<u8>::new())?;
            }
            Ok(())
        })?;

        info!(
            action = %id,
            actor = %record.genesis.actor,
            tier = ?record.genesis.tier,
            "responsibility record created"
        );
        Ok(record)
    }

    /// Appends an event to a record's audit trail.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownActionId`] if no record exists for `id`.
    pub fn append_audit_event(&self, id: &ActionId, entry: AuditEntry) -> Result<AuditEvent> {
        let event = self.locked(id, || {
            let mut record = self
                .load(id)?
                .ok_or_else(|| LedgerError::UnknownActionId(id.clone()))?;
            let event = record.push(entry)?;
            self.store(&record)?;
            Ok(event)
        })?;

        debug!(action = %id, sequence = event.sequence, kind = %event.kind, "audit event appended");
        Ok(event)
    }

    /// Sets the outcome and appends an `OutcomeRecorded` event.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownActionId`] if no record exists for `id`
    /// - [`LedgerError::OutcomeAlreadyRecorded`] if the outcome is set
    pub fn record_outcome(&self, id: &ActionId, outcome: Outcome) -> Result<AuditEvent> {
        let event = self.locked(id, || {
            let mut record = self
                .load(id)?
                .ok_or_else(|| LedgerError::UnknownActionId(id.clone()))?;
            if record.outcome.is_some() {
                return Err(LedgerError::OutcomeAlreadyRecorded(id.clone()));
            }

            let detail = format!(
                "{}: {}",
                if outcome.success { "success" } else { "failure" },
                outcome.summary
            );
            record.outcome = Some(outcome);
            let event = record.push(AuditEntry::new(AuditEventKind::OutcomeRecorded).detail(detail))?;
            self.store(&record)?;
            Ok(event)
        })?;

        info!(action = %id, "outcome recorded");
        Ok(event)
    }

    /// Loads a record.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if no record exists for `id`.
    pub fn get(&self, id: &ActionId) -> Result<ResponsibilityRecord> {
        self.load(id)?
            .ok_or_else(|| LedgerError::NotFound(id.clone()))
    }

    /// Returns true if a record exists for `id`.
    pub fn contains(&self, id: &ActionId) -> Result<bool> {
        Ok(self.records.contains_key(id.as_str().as_bytes())?)
    }

    /// The responsibility chain ending at `id`, root first.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if no record exists for `id`
    /// - [`LedgerError::ChainBroken`] if the parent links loop
    pub fn chain(&self, id: &ActionId) -> Result<Vec<ResponsibilityRecord>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id.clone());

        while let Some(next) = current {
            if !seen.insert(next.clone()) {
                return Err(LedgerError::ChainBroken {
                    action: next,
                    sequence: 0,
                });
            }
            let record = self.get(&next)?;
            current = record.genesis.parent.clone();
            chain.push(record);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Direct children of `id` in the responsibility chain.
    pub fn children(&self, id: &ActionId) -> Result<Vec<ActionId>> {
        let mut prefix = id.as_str().as_bytes().to_vec();
        prefix.push(0);

        let mut children = Vec::new();
        for entry in self.children.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let child = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            children.push(ActionId::new(child));
        }
        Ok(children)
    }

    /// Every recorded action id, in key order.
    pub fn action_ids(&self) -> Result<Vec<ActionId>> {
        let mut ids = Vec::new();
        for entry in self.records.iter() {
            let (key, _) = entry?;
            ids.push(ActionId::new(String::from_utf8_lossy(&key).into_owned()));
        }
        Ok(ids)
    }

    /// Verifies a record's seal and hash chain.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] if no record exists for `id`
    /// - [`LedgerError::ChainBroken`] at the first mismatch
    pub fn verify(&self, id: &ActionId) -> Result<()> {
        self.get(id)?.verify()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flushes pending writes to disk and returns the bytes flushed.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("records", &self.len())
            .finish()
    }
}

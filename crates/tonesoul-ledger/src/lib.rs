//! # ToneSoul Ledger
//!
//! Append-only store of responsibility records: who started an action, who
//! answers for it, what happened to it and every state change on the way.
//!
//! ## Guarantees
//!
//! - One record per action id; a second insert fails with
//!   [`LedgerError::DuplicateActionId`]
//! - The action and its [`Genesis`] never change after insertion
//! - The audit trail only grows, in append order
//! - The outcome is set at most once
//! - Each event is hash-chained to the one before it, anchored on a seal
//!   over the action and genesis, so [`Ledger::verify`] detects rewrites
//!
//! Records are never deleted.
//!
//! ## Responsibility Chain
//!
//! An action may name a parent action. [`Ledger::chain`] walks parent links
//! back to the root, and [`Ledger::children`] walks them forward.

mod error;
mod ledger;
mod record;

pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use record::{
    AuditEntry, AuditEvent, AuditEventKind, Genesis, Outcome, ResponsibilityRecord,
};

//! # ToneSoul Model
//!
//! Data types shared by every layer of the conscience engine: the
//! proposed [`Action`], the promises an assistant has made
//! ([`Commitment`]), and the [`UncertaintyReport`] attached to every
//! explanation handed back to a caller.
//!
//! ## Invariants
//!
//! | Type | Invariant |
//! |------|-----------|
//! | [`Action`] | Non-empty id, description and origin actor |
//! | [`Commitment`] | Status only moves `Active -> Revoked` |
//! | [`UncertaintyReport`] | `0 <= lower <= upper <= 1`, `0 <= uncertainty_level <= 1` |
//!
//! Constructors enforce these invariants and return [`ModelError`] instead
//! of producing an out-of-range value.
//!
//! ## Usage
//!
//! ```rust
//! use tonesoul_model::{Action, Origin, RiskTier};
//!
//! let action = Action::new("a-1", "Add a helper to utils.rs", RiskTier::Low, Origin::user("alice"))
//!     .with_reason("refactor requested in review");
//! assert!(action.validate().is_ok());
//! ```

mod action;
mod cause;
mod commitment;
mod error;
mod uncertainty;

pub use action::{
    Action, ActionId, Origin, OutputBasis, ProposedOutput, ResponsibilityTier, RiskTier,
    SemanticLayer,
};
pub use cause::RejectionCause;
pub use commitment::{Commitment, CommitmentId, CommitmentStatus, Revocation};
pub use error::ModelError;
pub use uncertainty::{ConfidenceBounds, UncertaintyReport};

/// Result type for model construction and validation.
pub type Result<T> = std::result::Result<T, ModelError>;

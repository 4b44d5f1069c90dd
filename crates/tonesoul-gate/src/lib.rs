//! # ToneSoul Gate
//!
//! Keeps an assistant from silently going back on its word.
//!
//! [`BetrayalGate::check`] compares a proposed action against the active
//! commitments in a [`CommitmentBook`]. A conflicting action is not
//! refused outright: it is parked in [`PendingConfirmations`] under a
//! [`GateToken`] and proceeds only if an accountable actor confirms it,
//! which revokes the commitment it breaks.
//!
//! ```rust
//! use tonesoul_gate::{BetrayalGate, GateResult};
//! use tonesoul_model::{Action, ActionId, Commitment, Origin, RiskTier};
//!
//! let gate = BetrayalGate::default();
//! let kept = Commitment::new("Keep the public API of the parser stable", ActionId::new("a-1"));
//! let action = Action::new(
//!     "a-2",
//!     "Break the public API of the parser",
//!     RiskTier::Medium,
//!     Origin::user("alice"),
//! );
//!
//! assert!(gate.check(&action, &[kept]).is_conflict());
//! ```

mod betrayal;
mod commitments;
mod error;
mod pending;

pub use betrayal::{BetrayalGate, GateConfig, GateResult};
pub use commitments::CommitmentBook;
pub use error::{GateError, Result};
pub use pending::{GateToken, PendingConfirmation, PendingConfirmations};

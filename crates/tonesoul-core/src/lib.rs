//! # ToneSoul Core
//!
//! Decision-gating facade for an AI assistant. Every proposed action is
//! judged, recorded and either approved, rejected or paused until an
//! accountable actor confirms it.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------------+
//! |                    GOVERNANCE ENGINE                      |
//! +-----------------------------------------------------------+
//! |                                                           |
//! |  Action --> Benevolence --> Council --> Betrayal Gate     |
//! |              (output)     (unanimity)   (commitments)     |
//! |                 |             |              |            |
//! |                 +-------------+--------------+            |
//! |                               v                           |
//! |                   +-----------------------+               |
//! |                   |  Responsibility Ledger |              |
//! |                   +-----------------------+               |
//! +-----------------------------------------------------------+
//! ```
//!
//! ## Decisions
//!
//! | Decision | Meaning |
//! |----------|---------|
//! | `Approved` | Proceed; `audit_id` names the approving ledger event |
//! | `Rejected` | Do not proceed; reasons and cause attached |
//! | `PendingConfirmation` | Would break a commitment; confirm or cancel by token |
//!
//! Rejection and escalation are outcomes, not errors. [`GovernanceError`]
//! is reserved for malformed input and structural faults.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tonesoul_core::{Decision, GovernanceConfig, GovernanceEngine};
//! use tonesoul_ledger::Ledger;
//! use tonesoul_model::{Action, Origin, RiskTier};
//!
//! # async fn run() -> tonesoul_core::Result<()> {
//! let engine = GovernanceEngine::new(GovernanceConfig::default(), Ledger::open("./ledger")?)?;
//!
//! let action = Action::new("a-2", "Break the public API of the parser", RiskTier::Medium, Origin::user("alice"));
//! match engine.submit(action).await? {
//!     Decision::Approved { audit_id, .. } => println!("go ahead ({audit_id})"),
//!     Decision::Rejected { reasons, .. } => println!("refused: {}", reasons.join("; ")),
//!     Decision::PendingConfirmation { token, explanation, .. } => {
//!         println!("{explanation}");
//!         engine.confirm(&token, "alice")?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod decision;
mod engine;
mod error;

pub use config::{EngineConfig, GovernanceConfig};
pub use decision::{ActionState, Decision};
pub use engine::GovernanceEngine;
pub use error::GovernanceError;

// Re-export component types for convenience
pub use tonesoul_council::{CouncilConfig, CouncilDecision, Verdict, Vote};
pub use tonesoul_gate::{GateConfig, GateToken};
pub use tonesoul_ledger::{AuditEvent, AuditEventKind, Ledger, Outcome, ResponsibilityRecord};
pub use tonesoul_model::{
    Action, ActionId, Commitment, CommitmentId, Origin, RejectionCause, RiskTier,
    UncertaintyReport,
};

/// Result type for governance operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;

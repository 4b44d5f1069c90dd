//! # ToneSoul Council
//!
//! Three-seat deliberation with a strict unanimity rule, plus an audit of
//! the text an action intends to say.
//!
//! ## Overview
//!
//! Every proposed [`Action`](tonesoul_model::Action) is judged by three
//! independent seats, each a pure function of the action and its rubric:
//!
//! - **Philosopher**: rejects on a hard value, abstains when only soft
//!   values are touched
//! - **Engineer**: rejects high risk without a mitigation, otherwise
//!   approves with a confidence that falls with the declared risk
//! - **Guardian**: rejects on any enumerated harm category
//!
//! The council proceeds only when all three approve. A single rejection
//! rejects with that seat's rationale. An abstention without rejection is
//! reported as insufficient consensus, so ambiguity is surfaced rather than
//! hidden.
//!
//! ## Architecture
//!
//! ```text
//! +-------------+  +-------------+  +-------------+
//! | Philosopher |  |  Engineer   |  |  Guardian   |
//! |  (values)   |  |   (risk)    |  |   (harm)    |
//! +------+------+  +------+------+  +------+------+
//!        |                |                |
//!        +----------------+----------------+
//!                         v
//!                  +-------------+
//!                  |  UNANIMITY  |
//!                  +-------------+
//! ```
//!
//! The [`BenevolenceFilter`] runs before deliberation when an action
//! carries a [`ProposedOutput`](tonesoul_model::ProposedOutput).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tonesoul_council::{Council, CouncilConfig};
//! use tonesoul_model::{Action, Origin, RiskTier};
//!
//! # async fn run() -> tonesoul_council::Result<()> {
//! let council = Council::from_config(&CouncilConfig::default())?;
//! let action = Action::new("a-7", "Wipe the staging volume", RiskTier::High, Origin::user("alice"));
//!
//! let decision = council.deliberate_concurrent(&action).await?;
//! assert!(!decision.is_approved());
//! for reason in &decision.reasons {
//!     println!("rejected: {reason}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod benevolence;
pub mod consensus;
pub mod council;
pub mod error;
pub mod matcher;
pub mod member;

pub use benevolence::{AuditOutcome, BenevolenceAudit, BenevolenceConfig, BenevolenceFilter};
pub use consensus::{ConsensusEngine, ConsensusResult, VoteTally};
pub use council::{Council, CouncilConfig, CouncilDecision};
pub use error::CouncilError;
pub use matcher::PhraseMatcher;
pub use member::triad::{Engineer, EngineerRubric, Guardian, HarmCategory, Philosopher, ValueRule};
pub use member::{Confidence, CouncilMember, MemberRole, Verdict, Vote};

/// Result type for council operations.
pub type Result<T> = std::result::Result<T, CouncilError>;

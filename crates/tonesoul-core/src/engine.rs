//! The governance engine facade.
//!
//! [`GovernanceEngine`] is the main entry point. It owns the council, the
//! output audit, the betrayal gate and the commitment book, and writes
//! every transition to a [`Ledger`] handle passed in by the caller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tonesoul_council::{BenevolenceAudit, BenevolenceFilter, ConsensusResult, Council};
use tonesoul_gate::{
    BetrayalGate, CommitmentBook, GateError, GateResult, GateToken, PendingConfirmation,
    PendingConfirmations,
};
use tonesoul_ledger::{
    AuditEntry, AuditEvent, AuditEventKind, Ledger, LedgerError, Outcome, ResponsibilityRecord,
};
use tonesoul_model::{
    Action, ActionId, Commitment, CommitmentId, ModelError, RejectionCause, UncertaintyReport,
};
use tracing::{debug, info, warn};

use crate::config::GovernanceConfig;
use crate::decision::{ActionState, Decision};
use crate::error::GovernanceError;
use crate::Result;

const COUNCIL_ACTOR: &str = "council";
const GATE_ACTOR: &str = "betrayal-gate";
const AUDIT_ACTOR: &str = "benevolence-filter";
const ENGINE_ACTOR: &str = "governance-engine";

/// Which path resolved a paused action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolver {
    Confirm,
    Cancel,
    Timeout,
}

/// An action waiting at the gate, with what is needed to finish it.
struct Parked {
    action: Action,
    uncertainty: UncertaintyReport,
    note: Option<String>,
    watchdog: Option<AbortHandle>,
}

/// Outcome slot for a token. Kept after resolution so late callers learn
/// what happened.
struct Resolution {
    action_id: ActionId,
    resolver: Option<Resolver>,
    decision: watch::Sender<Option<Decision>>,
}

/// An action under judgment. Unless settled, dropping it closes the
/// record with a `DeliberationFailed` rejection, so a failed seat, a
/// ledger fault or a dropped `submit` future never leaves it `Submitted`.
struct Deliberation<'a> {
    inner: &'a Inner,
    id: ActionId,
    settled: bool,
}

impl Deliberation<'_> {
    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for Deliberation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.inner
                .close_open(&self.id, "deliberation ended without a decision");
        }
        self.inner.deliberating.remove(&self.id);
    }
}

struct Inner {
    config: GovernanceConfig,
    council: Council,
    benevolence: BenevolenceFilter,
    gate: BetrayalGate,
    ledger: Ledger,
    commitments: CommitmentBook,
    pending: PendingConfirmations,
    parked: DashMap<GateToken, Parked>,
    resolutions: DashMap<GateToken, Resolution>,
    resolved: Mutex<VecDeque<GateToken>>,
    deliberating: DashSet<ActionId>,
}

/// The decision-gating engine.
///
/// # Pipeline
///
/// 1. Validation (malformed actions never create a record)
/// 2. Responsibility record (the `Submitted` state)
/// 3. Benevolence audit of an attached output
/// 4. Council deliberation under the unanimity rule
/// 5. Betrayal gate against active commitments
///
/// Steps 3 to 5 end in one ledger event: `Approved`, `Rejected` or
/// `PendingConfirmation`. A paused action is resumed by [`confirm`],
/// [`cancel`], or the confirmation timeout, whichever comes first. If
/// judgment cannot finish, the action is rejected with
/// [`RejectionCause::DeliberationFailed`].
///
/// The engine is cheap to clone; clones share all state.
///
/// # Example
///
/// ```rust,no_run
/// use tonesoul_core::{GovernanceConfig, GovernanceEngine};
/// use tonesoul_ledger::Ledger;
/// use tonesoul_model::{Action, Origin, RiskTier};
///
/// # async fn run() -> tonesoul_core::Result<()> {
/// let engine = GovernanceEngine::new(GovernanceConfig::default(), Ledger::temporary()?)?;
/// let action = Action::new("a-1", "Add a unit test", RiskTier::Low, Origin::user("alice"));
///
/// let decision = engine.submit(action).await?;
/// let audit_id = decision.ensure_approved()?;
/// println!("approved as {audit_id}");
/// # Ok(())
/// # }
/// ```
///
/// [`confirm`]: GovernanceEngine::confirm
/// [`cancel`]: GovernanceEngine::cancel
#[derive(Clone)]
pub struct GovernanceEngine {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for GovernanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceEngine")
            .field("council", &self.inner.council)
            .field("commitments", &self.inner.commitments.len())
            .field("pending", &self.inner.pending.len())
            .field("ledger", &self.inner.ledger)
            .finish()
    }
}

impl GovernanceEngine {
    /// Creates an engine with the Philosopher, Engineer and Guardian built
    /// from configuration.
    ///
    /// Commitments recorded in the ledger are restored. Actions the ledger
    /// shows as still waiting for confirmation cannot be resumed after a
    /// restart and are rejected with [`RejectionCause::ConfirmationTimeout`].
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::Config`] if the configuration is invalid
    /// - [`GovernanceError::Council`] if a rubric cannot be compiled
    /// - [`GovernanceError::Ledger`] if the ledger cannot be read
    pub fn new(config: GovernanceConfig, ledger: Ledger) -> Result<Self> {
        config.validate()?;
        let council = Council::from_config(&config.council)?;
        Self::with_council(config, council, ledger)
    }

    /// Creates an engine around a custom council.
    ///
    /// # Errors
    ///
    /// As [`GovernanceEngine::new`].
    pub fn with_council(config: GovernanceConfig, council: Council, ledger: Ledger) -> Result<Self> {
        config.validate()?;
        let benevolence = BenevolenceFilter::new(&config.benevolence)?;
        let gate = BetrayalGate::new(config.gate.clone());

        let inner = Inner {
            config,
            council,
            benevolence,
            gate,
            ledger,
            commitments: CommitmentBook::new(),
            pending: PendingConfirmations::new(),
            parked: DashMap::new(),
            resolutions: DashMap::new(),
            resolved: Mutex::new(VecDeque::new()),
            deliberating: DashSet::new(),
        };
        inner.restore()?;

        info!(
            seats = ?inner.council.roles(),
            commitments = inner.commitments.len(),
            timeout_ms = inner.config.engine.confirmation_timeout_ms,
            "governance engine initialized"
        );

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Submits an action for judgment.
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::Model`] if the action is malformed
    /// - [`GovernanceError::Ledger`] on a duplicate id, an unknown parent,
    ///   or a storage fault
    /// - [`GovernanceError::Council`] if a member failed; the action is
    ///   rejected with [`RejectionCause::DeliberationFailed`]
    pub async fn submit(&self, action: Action) -> Result<Decision> {
        action.validate()?;
        self.inner
            .ledger
            .record(ResponsibilityRecord::new(action.clone()))?;

        let mut deliberation = self.inner.begin_deliberation(&action.id);
        let decision = self.deliberate(action).await;
        if decision.is_ok() {
            deliberation.settle();
        }
        decision
    }

    async fn deliberate(&self, action: Action) -> Result<Decision> {
        let inner = &self.inner;
        debug!(action = %action.id, risk = %action.risk, "deliberating");

        let note = match inner.benevolence.audit_action(&action) {
            Some(audit) if audit.outcome.blocks() => return inner.reject_by_audit(&action.id, &audit),
            Some(audit) => audit.finding,
            None => None,
        };

        let council = if inner.config.council.concurrent {
            match inner.council.deliberate_concurrent(&action).await {
                Ok(decision) => decision,
                Err(e) => {
                    inner.reject(
                        &action.id,
                        RejectionCause::DeliberationFailed,
                        vec![format!("deliberation failed: {e}")],
                        UncertaintyReport::from_confidence("reject", 1.0, "council could not finish"),
                        COUNCIL_ACTOR,
                    )?;
                    return Err(e.into());
                }
            }
        } else {
            inner.council.deliberate(&action)
        };

        match council.result {
            ConsensusResult::Rejected => {
                return inner.reject(
                    &action.id,
                    RejectionCause::CouncilRejected,
                    council.reasons,
                    council.uncertainty,
                    COUNCIL_ACTOR,
                )
            }
            ConsensusResult::InsufficientConsensus => {
                return inner.reject(
                    &action.id,
                    RejectionCause::InsufficientConsensus,
                    council.reasons,
                    council.uncertainty,
                    COUNCIL_ACTOR,
                )
            }
            ConsensusResult::Approved => {}
        }

        match inner.gate.check(&action, &inner.commitments.active()) {
            GateResult::NoConflict => {
                let detail = with_note("council approved unanimously".to_string(), note.as_deref());
                inner.approve(&action, council.uncertainty, COUNCIL_ACTOR, detail)
            }
            GateResult::ConflictRequiresConfirmation {
                commitment_id,
                explanation,
            } => self.park(action, commitment_id, explanation, council.uncertainty, note),
        }
    }

    /// Confirms a paused action: the commitment it breaks is revoked and
    /// the action is approved.
    ///
    /// An action can break several commitments. If another active
    /// commitment still conflicts once this one is revoked, the action is
    /// paused again and a [`Decision::PendingConfirmation`] with a fresh
    /// token is returned.
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::ConfirmationTimeout`] if the action already
    ///   timed out
    /// - [`GovernanceError::Gate`] if the token was already resolved
    /// - [`GovernanceError::UnknownGateToken`] if this engine never issued it,
    ///   or resolved it too long ago to remember
    /// - [`GovernanceError::Model`] if `actor` is blank
    /// - [`GovernanceError::Ledger`] if the resolution cannot be written;
    ///   the action is then rejected and waiters are released
    pub fn confirm(&self, token: &GateToken, actor: &str) -> Result<Decision> {
        require_actor(actor)?;
        let (pending, parked) = self.inner.claim(token, Resolver::Confirm)?;
        let id = pending.action_id.clone();
        let outcome = self.resolve_confirmed(pending, parked, actor);
        self.inner.settle(token, &id, outcome)
    }

    fn resolve_confirmed(
        &self,
        pending: PendingConfirmation,
        parked: Parked,
        actor: &str,
    ) -> Result<Decision> {
        let inner = &self.inner;
        let id = &pending.action_id;

        inner.ledger.append_audit_event(
            id,
            AuditEntry::new(AuditEventKind::Confirmed)
                .by(actor)
                .detail(format!("confirmed breaking commitment {}", pending.commitment_id)),
        )?;

        match inner.commitments.revoke(&pending.commitment_id, actor, id.clone()) {
            Ok(_) => {
                inner.ledger.append_audit_event(
                    id,
                    AuditEntry::new(AuditEventKind::CommitmentRevoked {
                        commitment_id: pending.commitment_id.clone(),
                    })
                    .by(actor)
                    .detail(pending.explanation.clone()),
                )?;
            }
            // Another confirmed action revoked it first.
            Err(GateError::Model(ModelError::CommitmentRevoked(_))) => {
                debug!(action = %id, commitment = %pending.commitment_id, "commitment already revoked");
            }
            Err(e) => return Err(e.into()),
        }

        match inner.gate.check(&parked.action, &inner.commitments.active()) {
            GateResult::ConflictRequiresConfirmation {
                commitment_id,
                explanation,
            } => {
                info!(action = %id, commitment = %commitment_id, "confirmed action breaks another commitment");
                self.park(parked.action, commitment_id, explanation, parked.uncertainty, parked.note)
            }
            GateResult::NoConflict => {
                let detail =
                    with_note(format!("approved after confirmation by {actor}"), parked.note.as_deref());
                inner.approve(&parked.action, parked.uncertainty, actor, detail)
            }
        }
    }

    /// Cancels a paused action. It is rejected and the commitment stays
    /// active.
    ///
    /// # Errors
    ///
    /// As [`GovernanceEngine::confirm`].
    pub fn cancel(&self, token: &GateToken, actor: &str) -> Result<Decision> {
        require_actor(actor)?;
        let inner = &self.inner;
        let (pending, _) = inner.claim(token, Resolver::Cancel)?;

        warn!(action = %pending.action_id, actor, "pending action cancelled");
        let outcome = inner.reject(
            &pending.action_id,
            RejectionCause::Cancelled,
            vec![format!("cancelled by {actor} before confirmation")],
            UncertaintyReport::from_confidence("reject", 1.0, "cancelled by an accountable actor"),
            actor,
        );
        inner.settle(token, &pending.action_id, outcome)
    }

    /// Waits until a paused action is confirmed, cancelled or timed out.
    /// Returns at once if it already was.
    ///
    /// When confirming revealed another broken commitment, the result is
    /// the new [`Decision::PendingConfirmation`].
    ///
    /// # Errors
    ///
    /// [`GovernanceError::UnknownGateToken`] if this engine never issued
    /// the token, or resolved it more than
    /// [`resolved_retention`](crate::EngineConfig::resolved_retention)
    /// resolutions ago.
    pub async fn wait_for_resolution(&self, token: &GateToken) -> Result<Decision> {
        let mut rx = self
            .inner
            .resolutions
            .get(token)
            .map(|r| r.decision.subscribe())
            .ok_or_else(|| GovernanceError::UnknownGateToken(token.clone()))?;

        let resolved = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| GovernanceError::UnknownGateToken(token.clone()))?;
        (*resolved)
            .clone()
            .ok_or_else(|| GovernanceError::UnknownGateToken(token.clone()))
    }

    /// Times out every paused action whose deadline has passed.
    ///
    /// The per-action watchdog does this on its own; this sweep is for
    /// hosts that drive time themselves.
    pub fn expire_overdue(&self) -> Vec<Decision> {
        let now = tokio::time::Instant::now();
        self.inner
            .pending
            .overdue(now)
            .iter()
            .filter_map(|token| match self.inner.expire(token) {
                Ok(decision) => Some(decision),
                Err(e) => {
                    debug!(token = %token, error = %e, "overdue action resolved elsewhere");
                    None
                }
            })
            .collect()
    }

    /// Full responsibility record of an action.
    ///
    /// # Errors
    ///
    /// [`GovernanceError::Ledger`] with [`LedgerError::NotFound`] if the
    /// action was never submitted.
    pub fn query(&self, id: &ActionId) -> Result<ResponsibilityRecord> {
        Ok(self.inner.ledger.get(id)?)
    }

    /// Current lifecycle state of an action.
    ///
    /// # Errors
    ///
    /// [`GovernanceError::UnknownActionId`] if the action was never
    /// submitted.
    pub fn status(&self, id: &ActionId) -> Result<ActionState> {
        if self.inner.deliberating.contains(id) {
            return Ok(ActionState::Deliberating);
        }
        match self.inner.ledger.get(id) {
            Ok(record) => Ok(ActionState::from_record(&record)),
            Err(LedgerError::NotFound(_)) => Err(GovernanceError::UnknownActionId(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Records what happened when an approved action was carried out.
    ///
    /// # Errors
    ///
    /// - [`GovernanceError::UnconfirmedBetrayal`] if the action is still
    ///   waiting for confirmation or timed out waiting
    /// - [`GovernanceError::NotApproved`] for any other unapproved action
    /// - [`GovernanceError::UnknownActionId`] if it was never submitted
    /// - [`GovernanceError::Ledger`] if an outcome is already recorded
    pub fn record_outcome(&self, id: &ActionId, outcome: Outcome) -> Result<AuditEvent> {
        match self.status(id)? {
            ActionState::Approved => Ok(self.inner.ledger.record_outcome(id, outcome)?),
            ActionState::PendingBetrayalConfirmation { commitment_id } => {
                Err(GovernanceError::UnconfirmedBetrayal(format!(
                    "action {id} is still waiting for confirmation to break commitment {commitment_id}"
                )))
            }
            ActionState::Rejected {
                cause: RejectionCause::ConfirmationTimeout,
            } => Err(GovernanceError::UnconfirmedBetrayal(format!(
                "action {id} was never confirmed"
            ))),
            state => Err(GovernanceError::NotApproved(format!(
                "action {id} is {state:?}"
            ))),
        }
    }

    /// Active commitments, oldest first.
    pub fn active_commitments(&self) -> Vec<Commitment> {
        self.inner.commitments.active()
    }

    /// Looks up a commitment, active or revoked.
    ///
    /// # Errors
    ///
    /// [`GovernanceError::Gate`] if the commitment is unknown.
    pub fn commitment(&self, id: &CommitmentId) -> Result<Commitment> {
        self.inner
            .commitments
            .get(id)
            .ok_or_else(|| GateError::CommitmentNotFound(id.clone()).into())
    }

    /// The paused action behind a token, if it is still paused.
    pub fn pending(&self, token: &GateToken) -> Option<PendingConfirmation> {
        self.inner.pending.get(token)
    }

    /// The ledger handle.
    pub fn ledger(&self) -> &Ledger {
        &self.inner.ledger
    }

    /// The configuration in use.
    pub fn config(&self) -> &GovernanceConfig {
        &self.inner.config
    }

    fn park(
        &self,
        action: Action,
        commitment_id: CommitmentId,
        explanation: String,
        uncertainty: UncertaintyReport,
        note: Option<String>,
    ) -> Result<Decision> {
        let inner = &self.inner;
        let timeout = inner.config.engine.confirmation_timeout();

        inner.ledger.append_audit_event(
            &action.id,
            AuditEntry::new(AuditEventKind::PendingConfirmation {
                commitment_id: commitment_id.clone(),
            })
            .by(GATE_ACTOR)
            .detail(explanation.clone()),
        )?;

        let pending =
            PendingConfirmation::new(action.id.clone(), commitment_id.clone(), explanation.clone(), timeout);
        let token = pending.token.clone();
        let (tx, _) = watch::channel(None);

        warn!(
            action = %action.id,
            commitment = %commitment_id,
            token = %token,
            "action paused for confirmation"
        );

        inner.resolutions.insert(
            token.clone(),
            Resolution {
                action_id: action.id.clone(),
                resolver: None,
                decision: tx,
            },
        );
        inner.parked.insert(
            token.clone(),
            Parked {
                action,
                uncertainty,
                note,
                watchdog: None,
            },
        );
        inner.pending.insert(pending);

        let watchdog = self.spawn_watchdog(token.clone(), timeout);
        if let Some(mut parked) = inner.parked.get_mut(&token) {
            parked.watchdog = watchdog;
        }

        Ok(Decision::PendingConfirmation {
            token,
            commitment_id,
            explanation,
        })
    }

    /// Arms the timeout. Outside a tokio runtime there is no watchdog and
    /// [`expire_overdue`](Self::expire_overdue) is the only expiry path.
    fn spawn_watchdog(&self, token: GateToken, timeout: Duration) -> Option<AbortHandle> {
        let Ok(runtime) = Handle::try_current() else {
            debug!(token = %token, "no runtime, watchdog not armed");
            return None;
        };
        let engine: Weak<Inner> = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            let Some(inner) = engine.upgrade() else {
                return;
            };
            if let Err(e) = inner.expire(&token) {
                debug!(token = %token, error = %e, "watchdog found the action resolved");
            }
        });
        Some(task.abort_handle())
    }
}

impl Inner {
    fn begin_deliberation(&self, id: &ActionId) -> Deliberation<'_> {
        self.deliberating.insert(id.clone());
        Deliberation {
            inner: self,
            id: id.clone(),
            settled: false,
        }
    }

    fn approve(
        &self,
        action: &Action,
        uncertainty: UncertaintyReport,
        actor: &str,
        detail: String,
    ) -> Result<Decision> {
        let event = self.ledger.append_audit_event(
            &action.id,
            AuditEntry::new(AuditEventKind::Approved).by(actor).detail(detail),
        )?;

        if action.commitment {
            let commitment = Commitment::new(action.description.clone(), action.id.clone());
            self.ledger.append_audit_event(
                &action.id,
                AuditEntry::new(AuditEventKind::CommitmentMade {
                    commitment_id: commitment.id.clone(),
                })
                .by(action.origin.actor.clone())
                .detail(action.description.clone()),
            )?;
            info!(action = %action.id, commitment = %commitment.id, "commitment made");
            self.commitments.insert(commitment);
        }

        info!(action = %action.id, audit_id = %event.hash, "action approved");
        Ok(Decision::Approved {
            audit_id: event.hash,
            uncertainty,
        })
    }

    fn reject(
        &self,
        id: &ActionId,
        cause: RejectionCause,
        reasons: Vec<String>,
        uncertainty: UncertaintyReport,
        actor: &str,
    ) -> Result<Decision> {
        let reasons = if reasons.is_empty() {
            vec![format!("rejected: {cause}")]
        } else {
            reasons
        };

        self.ledger.append_audit_event(
            id,
            AuditEntry::new(AuditEventKind::Rejected {
                cause,
                reasons: reasons.clone(),
            })
            .by(actor)
            .detail(reasons.join("; ")),
        )?;

        warn!(action = %id, %cause, reasons = ?reasons, "action rejected");
        Ok(Decision::Rejected {
            reasons,
            cause,
            uncertainty,
        })
    }

    fn reject_by_audit(&self, id: &ActionId, audit: &BenevolenceAudit) -> Result<Decision> {
        let reason = audit
            .finding
            .clone()
            .unwrap_or_else(|| format!("benevolence audit: {}", audit.outcome));
        let uncertainty = UncertaintyReport::from_confidence(
            "reject",
            1.0 - audit.tension,
            format!("benevolence audit {} (tension {:.2})", audit.outcome, audit.tension),
        );
        self.reject(
            id,
            RejectionCause::BenevolenceIntercept,
            vec![reason],
            uncertainty,
            AUDIT_ACTOR,
        )
    }

    /// Takes a paused action for one resolver. Claims serialize on the
    /// token's resolution slot, so a loser can tell a timeout from any
    /// other resolution.
    fn claim(&self, token: &GateToken, resolver: Resolver) -> Result<(PendingConfirmation, Parked)> {
        let mut slot = self
            .resolutions
            .get_mut(token)
            .ok_or_else(|| GovernanceError::UnknownGateToken(token.clone()))?;

        let pending = match self.pending.take(token) {
            Ok(pending) => pending,
            Err(e) => {
                return Err(match slot.resolver {
                    Some(Resolver::Timeout) => GovernanceError::ConfirmationTimeout(slot.action_id.clone()),
                    _ => e.into(),
                })
            }
        };
        slot.resolver = Some(resolver);
        drop(slot);

        let parked = self
            .parked
            .remove(token)
            .map(|(_, parked)| parked)
            .ok_or_else(|| GovernanceError::UnknownGateToken(token.clone()))?;
        if let Some(watchdog) = &parked.watchdog {
            watchdog.abort();
        }

        debug!(action = %pending.action_id, token = %token, ?resolver, "pending action claimed");
        Ok((pending, parked))
    }

    /// Releases waiters on `token` and retires the slot. Only the newest
    /// `resolved_retention` slots are kept.
    fn publish(&self, token: &GateToken, decision: &Decision) {
        if let Some(slot) = self.resolutions.get(token) {
            slot.decision.send_replace(Some(decision.clone()));
        }

        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        resolved.push_back(token.clone());
        while resolved.len() > self.config.engine.resolved_retention {
            if let Some(oldest) = resolved.pop_front() {
                self.resolutions.remove(&oldest);
            }
        }
    }

    /// Publishes the outcome of a claimed token. A failed resolution
    /// still closes the action and releases waiters before the error is
    /// returned.
    fn settle(&self, token: &GateToken, id: &ActionId, outcome: Result<Decision>) -> Result<Decision> {
        match outcome {
            Ok(decision) => {
                self.publish(token, &decision);
                Ok(decision)
            }
            Err(e) => {
                warn!(action = %id, token = %token, error = %e, "paused action could not be resolved");
                let decision = self.close_open(id, &format!("resolution failed: {e}"));
                self.publish(token, &decision);
                Err(e)
            }
        }
    }

    /// Rejects the action with [`RejectionCause::DeliberationFailed`]
    /// unless its record is already terminal, and returns the decision
    /// the record now stands at. When the ledger cannot be read or
    /// written the rejection is returned unrecorded.
    fn close_open(&self, id: &ActionId, reason: &str) -> Decision {
        let uncertainty = UncertaintyReport::from_confidence("reject", 1.0, reason);
        let unrecorded = Decision::Rejected {
            reasons: vec![reason.to_string()],
            cause: RejectionCause::DeliberationFailed,
            uncertainty: uncertainty.clone(),
        };

        let record = match self.ledger.get(id) {
            Ok(record) => record,
            Err(e) => {
                warn!(action = %id, error = %e, "cannot read record to close it");
                return unrecorded;
            }
        };
        if let Some(decision) = terminal_decision(&record) {
            return decision;
        }

        match self.reject(
            id,
            RejectionCause::DeliberationFailed,
            vec![reason.to_string()],
            uncertainty,
            ENGINE_ACTOR,
        ) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(action = %id, error = %e, "cannot record rejection");
                unrecorded
            }
        }
    }

    fn expire(&self, token: &GateToken) -> Result<Decision> {
        let (pending, _) = self.claim(token, Resolver::Timeout)?;

        warn!(action = %pending.action_id, timeout = ?pending.timeout, "confirmation timed out");
        let outcome = self.reject(
            &pending.action_id,
            RejectionCause::ConfirmationTimeout,
            vec![format!(
                "no confirmation within {} ms to break commitment {}",
                pending.timeout.as_millis(),
                pending.commitment_id
            )],
            UncertaintyReport::from_confidence("reject", 1.0, "confirmation window elapsed"),
            GATE_ACTOR,
        );
        self.settle(token, &pending.action_id, outcome)
    }

    /// Rebuilds the commitment book from the ledger and closes actions
    /// left mid-deliberation or waiting for confirmation.
    fn restore(&self) -> Result<()> {
        let mut revocations = Vec::new();
        let mut closed = 0usize;

        for id in self.ledger.action_ids()? {
            let record = self.ledger.get(&id)?;
            let mut confirmed_by: Option<String> = None;

            for event in &record.audit_trail {
                match &event.kind {
                    AuditEventKind::Confirmed => confirmed_by = event.actor.clone(),
                    AuditEventKind::CommitmentMade { commitment_id } => {
                        let mut commitment =
                            Commitment::new(record.action.description.clone(), id.clone())
                                .with_id(commitment_id.clone());
                        commitment.created_at = event.at;
                        self.commitments.insert(commitment);
                    }
                    AuditEventKind::CommitmentRevoked { commitment_id } => {
                        revocations.push((commitment_id.clone(), confirmed_by.clone(), id.clone()));
                    }
                    _ => {}
                }
            }

            match ActionState::from_record(&record) {
                ActionState::PendingBetrayalConfirmation { .. } => {
                    self.reject(
                        &id,
                        RejectionCause::ConfirmationTimeout,
                        vec!["engine restarted before confirmation".to_string()],
                        UncertaintyReport::from_confidence("reject", 1.0, "confirmation window lost"),
                        GATE_ACTOR,
                    )?;
                    closed += 1;
                }
                ActionState::Submitted => {
                    self.reject(
                        &id,
                        RejectionCause::DeliberationFailed,
                        vec!["engine restarted during deliberation".to_string()],
                        UncertaintyReport::from_confidence("reject", 1.0, "deliberation lost"),
                        ENGINE_ACTOR,
                    )?;
                    closed += 1;
                }
                _ => {}
            }
        }

        for (commitment_id, confirmed_by, action) in revocations {
            let actor = confirmed_by.as_deref().unwrap_or(GATE_ACTOR);
            if let Err(e) = self.commitments.revoke(&commitment_id, actor, action) {
                debug!(commitment = %commitment_id, error = %e, "skipping revocation on restore");
            }
        }

        if !self.commitments.is_empty() || closed > 0 {
            info!(
                commitments = self.commitments.len(),
                active = self.commitments.active().len(),
                closed,
                "restored state from ledger"
            );
        }
        Ok(())
    }
}

fn require_actor(actor: &str) -> Result<()> {
    if actor.trim().is_empty() {
        return Err(ModelError::InvalidAction("confirming actor is empty".to_string()).into());
    }
    Ok(())
}

/// The decision a terminal record stands at, from its latest decisive
/// event. `None` while the action is still open.
fn terminal_decision(record: &ResponsibilityRecord) -> Option<Decision> {
    let event = record.audit_trail.iter().rev().find(|event| {
        matches!(
            event.kind,
            AuditEventKind::Approved
                | AuditEventKind::Rejected { .. }
                | AuditEventKind::PendingConfirmation { .. }
        )
    })?;

    match &event.kind {
        AuditEventKind::Approved => Some(Decision::Approved {
            audit_id: event.hash.clone(),
            uncertainty: UncertaintyReport::from_confidence("approve", 1.0, event.detail.clone()),
        }),
        AuditEventKind::Rejected { cause, reasons } => Some(Decision::Rejected {
            reasons: reasons.clone(),
            cause: *cause,
            uncertainty: UncertaintyReport::from_confidence("reject", 1.0, event.detail.clone()),
        }),
        _ => None,
    }
}

fn with_note(detail: String, note: Option<&str>) -> String {
    match note {
        Some(note) => format!("{detail}; benevolence flag: {note}"),
        None => detail,
    }
}

//! The two-step safety gate.
//!
//! Every side-effecting action goes through two calls:
//!
//! 1. Without an approval id: a preview is built, validated and recorded in
//!    the ledger, and a [`PendingApproval`] is returned. Nothing is executed.
//! 2. With the approval id: the principal's rate bucket is charged, the
//!    approval is consumed for the expected action, and only then does the
//!    executor run, receiving the preview captured in step 1.
//!
//! Each confirmed execution emits one event on the `warden::audit` tracing
//! target. Preview contents are never logged.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use warden_core::PrincipalId;

use crate::error::{GateError, GateResult};
use crate::governor::RateGovernor;
use crate::ledger::ApprovalLedger;
use crate::preview::{ActionKind, ActionPreview};
use crate::request::{ApprovalId, PendingApproval};

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "warden::audit";

/// Result of [`SafetyGate::handle`].
#[derive(Debug)]
pub enum GateOutcome<T> {
    /// Step one: the action was not taken and awaits confirmation.
    Pending(PendingApproval),
    /// Step two: the action ran and produced this value.
    Executed(T),
}

impl<T> GateOutcome<T> {
    /// Whether the action is still awaiting confirmation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The pending approval, if this is step one.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingApproval> {
        match self {
            Self::Pending(p) => Some(p),
            Self::Executed(_) => None,
        }
    }

    /// The executor's output, if this is step two.
    #[must_use]
    pub fn executed(self) -> Option<T> {
        match self {
            Self::Executed(value) => Some(value),
            Self::Pending(_) => None,
        }
    }
}

/// Composes the rate governor and the approval ledger into the two-step
/// preview/confirm protocol.
pub struct SafetyGate {
    ledger: Arc<ApprovalLedger>,
    governor: Arc<RateGovernor>,
    ttl: Duration,
}

impl SafetyGate {
    /// Create a gate issuing approvals valid for `ttl`.
    #[must_use]
    pub fn new(ledger: Arc<ApprovalLedger>, governor: Arc<RateGovernor>, ttl: Duration) -> Self {
        Self {
            ledger,
            governor,
            ttl,
        }
    }

    /// The approval ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<ApprovalLedger> {
        &self.ledger
    }

    /// The rate governor.
    #[must_use]
    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Lifetime of issued approvals.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Step one: validate `preview`, record it and return the pending approval.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidPreview`] when an execution field is out of
    /// bounds; nothing is recorded.
    pub fn request(
        &self,
        principal: &PrincipalId,
        preview: ActionPreview,
    ) -> GateResult<PendingApproval> {
        if let Err(e) = preview.validate() {
            warn!(
                principal = %principal,
                action = %preview.kind(),
                error = %e,
                "Approval request refused"
            );
            return Err(e.into());
        }
        let request = self.ledger.create(preview, principal, self.ttl);
        Ok(PendingApproval::from(&request))
    }

    /// Step two: charge the rate bucket, consume the approval, run `executor`.
    ///
    /// The executor receives the preview stored in step one. An executor
    /// failure does not restore the approval.
    ///
    /// # Errors
    ///
    /// [`GateError::RateLimitExceeded`] (approval left untouched), any ledger
    /// consume error including [`GateError::ActionMismatch`], or
    /// [`GateError::Execution`] wrapping the executor's error.
    pub fn confirm<T, E, F>(
        &self,
        principal: &PrincipalId,
        action: ActionKind,
        approval_id: &ApprovalId,
        executor: F,
    ) -> GateResult<T>
    where
        F: FnOnce(ActionPreview) -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let preview = match self
            .governor
            .consume(principal)
            .and_then(|()| self.ledger.consume_for_action(approval_id, principal, action))
        {
            Ok(preview) => preview,
            Err(e) => {
                warn!(
                    target: AUDIT_TARGET,
                    principal = %principal,
                    action = %action,
                    approval_id = %approval_id,
                    outcome = "refused",
                    reason = e.kind(),
                    "Gated action refused"
                );
                return Err(e);
            },
        };

        let clock = self.ledger.clock();
        let started = clock.now();
        let result = executor(preview);
        let duration_ms = u64::try_from(
            clock.now().saturating_duration_since(started).as_millis(),
        )
        .unwrap_or(u64::MAX);

        match result {
            Ok(value) => {
                info!(
                    target: AUDIT_TARGET,
                    principal = %principal,
                    action = %action,
                    approval_id = %approval_id,
                    outcome = "executed",
                    duration_ms,
                    "Gated action executed"
                );
                Ok(value)
            },
            Err(e) => {
                let err = GateError::execution(e);
                warn!(
                    target: AUDIT_TARGET,
                    principal = %principal,
                    action = %action,
                    approval_id = %approval_id,
                    outcome = "failed",
                    duration_ms,
                    error = %err,
                    "Gated action failed"
                );
                Err(err)
            },
        }
    }

    /// Dispatch between the two steps.
    ///
    /// Without `approval_id`, `build_preview` runs and a pending approval is
    /// returned; `executor` is not called. With it, behaves as
    /// [`confirm`](Self::confirm) and `build_preview` is not called.
    ///
    /// # Errors
    ///
    /// Step one fails with [`GateError::PreviewMismatch`] when `build_preview`
    /// returns a preview for another action, or as [`request`](Self::request)
    /// does. Step two: see [`confirm`](Self::confirm).
    pub fn handle<T, E, B, F>(
        &self,
        principal: &PrincipalId,
        action: ActionKind,
        approval_id: Option<&ApprovalId>,
        build_preview: B,
        executor: F,
    ) -> GateResult<GateOutcome<T>>
    where
        B: FnOnce() -> ActionPreview,
        F: FnOnce(ActionPreview) -> Result<T, E>,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        match approval_id {
            None => {
                let preview = build_preview();
                if preview.kind() != action {
                    warn!(
                        principal = %principal,
                        requested = %action,
                        built = %preview.kind(),
                        "Preview built for a different action"
                    );
                    return Err(GateError::PreviewMismatch {
                        requested: action,
                        built: preview.kind(),
                    });
                }
                self.request(principal, preview).map(GateOutcome::Pending)
            },
            Some(id) => self
                .confirm(principal, action, id, executor)
                .map(GateOutcome::Executed),
        }
    }

    /// Reject a pending approval.
    ///
    /// # Errors
    ///
    /// See [`ApprovalLedger::reject`].
    pub fn reject(&self, approval_id: &ApprovalId) -> GateResult<()> {
        self.ledger.reject(approval_id)
    }
}

impl fmt::Debug for SafetyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafetyGate")
            .field("ledger", &self.ledger)
            .field("governor", &self.governor)
            .field("ttl", &self.ttl)
            .finish()
    }
}

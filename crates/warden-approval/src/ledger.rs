//! The approval ledger.
//!
//! Holds every outstanding approval request and enforces the single-use,
//! time-limited, principal-bound rules. All check-and-transition operations
//! run under one write lock, so two concurrent confirmations of the same id
//! can never both succeed.
//!
//! Expiry is decided on every read against the monotonic clock. [`sweep`]
//! only reclaims memory; nothing depends on it having run.
//!
//! [`sweep`]: ApprovalLedger::sweep

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};
use std::time::{Duration, Instant};

use chrono::TimeDelta;
use tracing::{debug, info, warn};
use warden_core::{Clock, PrincipalId};

use crate::error::{GateError, GateResult};
use crate::preview::{ActionKind, ActionPreview};
use crate::request::{ApprovalId, ApprovalRequest, ApprovalStatus};

/// Longest accepted approval lifetime. Longer TTLs are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// In-memory store of approval requests.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use warden_approval::{ApprovalLedger, ActionPreview, EmailPreview, GateError};
/// use warden_core::{ManualClock, PrincipalId};
///
/// let clock = Arc::new(ManualClock::new());
/// let ledger = ApprovalLedger::new(clock.clone());
/// let alice = PrincipalId::new("alice");
///
/// let preview = ActionPreview::from(EmailPreview::new("bob@example.com", "Hi", "Hello Bob"));
/// let request = ledger.create(preview, &alice, Duration::from_secs(300));
///
/// clock.advance(Duration::from_secs(299));
/// assert!(ledger.consume(&request.id, &alice).is_ok());
/// assert!(matches!(
///     ledger.consume(&request.id, &alice),
///     Err(GateError::AlreadyConsumed { .. })
/// ));
/// ```
pub struct ApprovalLedger {
    entries: RwLock<HashMap<ApprovalId, ApprovalRequest>>,
    clock: Arc<dyn Clock>,
}

impl ApprovalLedger {
    /// Create an empty ledger reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// The ledger's time source.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Record a new pending approval for `preview`, valid for `ttl`.
    ///
    /// The preview's display fields are clamped before it is stored, and the
    /// returned request carries the stored copy. Execution fields are stored
    /// as given; [`SafetyGate::request`](crate::SafetyGate::request) bounds
    /// them with [`ActionPreview::validate`] first.
    ///
    /// # Panics
    ///
    /// Panics if the freshly generated id is already present.
    pub fn create(
        &self,
        preview: ActionPreview,
        principal: &PrincipalId,
        ttl: Duration,
    ) -> ApprovalRequest {
        let ttl = ttl.min(MAX_TTL);
        let now = self.clock.now();
        let created_at = self.clock.wall();
        // ttl is bounded by MAX_TTL
        #[allow(clippy::arithmetic_side_effects)]
        let deadline = now + ttl;
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| created_at.checked_add_signed(delta))
            .unwrap_or(created_at);

        let request = ApprovalRequest::new(
            preview.clamped(),
            principal.clone(),
            created_at,
            expires_at,
            deadline,
        );

        let mut entries = self.write();
        assert!(
            !entries.contains_key(&request.id),
            "approval id collision: {}",
            request.id
        );
        entries.insert(request.id, request.clone());
        drop(entries);

        info!(
            approval_id = %request.id,
            principal = %principal,
            action = %request.action,
            ttl_secs = ttl.as_secs(),
            "Approval requested"
        );
        request
    }

    /// Consume an approval, returning the preview captured at creation.
    ///
    /// # Errors
    ///
    /// Exactly one of [`GateError::NotFound`], [`GateError::PrincipalMismatch`],
    /// [`GateError::AlreadyConsumed`], [`GateError::Expired`] or
    /// [`GateError::Rejected`].
    pub fn consume(&self, id: &ApprovalId, principal: &PrincipalId) -> GateResult<ActionPreview> {
        self.consume_inner(id, principal, None)
    }

    /// Consume an approval only if it was issued for `expected`.
    ///
    /// A mismatch leaves the approval pending.
    ///
    /// # Errors
    ///
    /// As [`consume`](Self::consume), plus [`GateError::ActionMismatch`].
    pub fn consume_for_action(
        &self,
        id: &ApprovalId,
        principal: &PrincipalId,
        expected: ActionKind,
    ) -> GateResult<ActionPreview> {
        self.consume_inner(id, principal, Some(expected))
    }

    fn consume_inner(
        &self,
        id: &ApprovalId,
        principal: &PrincipalId,
        expected: Option<ActionKind>,
    ) -> GateResult<ActionPreview> {
        let now = self.clock.now();
        let mut entries = self.write();

        let Some(entry) = entries.get_mut(id) else {
            warn!(approval_id = %id, principal = %principal, "Approval not found");
            return Err(GateError::NotFound { id: *id });
        };

        if entry.principal != *principal {
            warn!(approval_id = %id, principal = %principal, "Approval presented by wrong principal");
            return Err(GateError::PrincipalMismatch { id: *id });
        }

        match entry.status {
            ApprovalStatus::Pending | ApprovalStatus::Approved => {},
            ApprovalStatus::Consumed => {
                warn!(approval_id = %id, "Approval reuse refused");
                return Err(GateError::AlreadyConsumed { id: *id });
            },
            ApprovalStatus::Rejected => return Err(GateError::Rejected { id: *id }),
            ApprovalStatus::Expired => return Err(GateError::Expired { id: *id }),
        }

        if entry.is_overdue(now) {
            entry.status = ApprovalStatus::Expired;
            warn!(approval_id = %id, principal = %principal, "Approval expired");
            return Err(GateError::Expired { id: *id });
        }

        if let Some(requested) = expected
            && entry.action != requested
        {
            warn!(
                approval_id = %id,
                approved = %entry.action,
                requested = %requested,
                "Approval presented for a different action"
            );
            return Err(GateError::ActionMismatch {
                id: *id,
                approved: entry.action,
                requested,
            });
        }

        entry.status = ApprovalStatus::Consumed;
        info!(approval_id = %id, principal = %principal, action = %entry.action, "Approval consumed");
        Ok(entry.preview.clone())
    }

    /// Reject a pending approval.
    ///
    /// # Errors
    ///
    /// [`GateError::NotFound`] for an unknown id, [`GateError::AlreadyTerminal`]
    /// if it is consumed, rejected or past its deadline.
    pub fn reject(&self, id: &ApprovalId) -> GateResult<()> {
        let now = self.clock.now();
        let mut entries = self.write();

        let Some(entry) = entries.get_mut(id) else {
            return Err(GateError::NotFound { id: *id });
        };

        let status = entry.effective_status(now);
        if status.is_terminal() {
            entry.status = status;
            return Err(GateError::AlreadyTerminal { id: *id, status });
        }

        entry.status = ApprovalStatus::Rejected;
        info!(approval_id = %id, principal = %entry.principal, "Approval rejected");
        Ok(())
    }

    /// Whether [`consume`](Self::consume) would currently succeed. Does not
    /// change any state.
    #[must_use]
    pub fn validate(&self, id: &ApprovalId, principal: &PrincipalId) -> bool {
        let now = self.clock.now();
        self.read().get(id).is_some_and(|entry| {
            entry.principal == *principal
                && matches!(
                    entry.effective_status(now),
                    ApprovalStatus::Pending | ApprovalStatus::Approved
                )
        })
    }

    /// Snapshot of a request, with overdue pending requests reported as expired.
    #[must_use]
    pub fn get(&self, id: &ApprovalId) -> Option<ApprovalRequest> {
        let now = self.clock.now();
        self.read().get(id).map(|entry| {
            let mut snapshot = entry.clone();
            snapshot.status = entry.effective_status(now);
            snapshot
        })
    }

    /// Remove every entry whose deadline is at or before `now`.
    ///
    /// Never waits: if the lock is held the round is skipped and `0` returned.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut entries = match self.entries.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => {
                warn!("ApprovalLedger lock poisoned, recovering");
                e.into_inner()
            },
            Err(TryLockError::WouldBlock) => {
                debug!("Approval ledger busy, skipping sweep");
                return 0;
            },
        };

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_overdue(now));
        let removed = before.saturating_sub(entries.len());
        drop(entries);

        if removed > 0 {
            debug!(removed, "Swept approval ledger");
        }
        removed
    }

    /// Number of requests that are still consumable.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        let now = self.clock.now();
        self.read()
            .values()
            .filter(|entry| entry.effective_status(now) == ApprovalStatus::Pending)
            .count()
    }

    /// Number of stored entries, terminal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the ledger holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ApprovalId, ApprovalRequest>> {
        self.entries.read().unwrap_or_else(|e| {
            warn!("ApprovalLedger read lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ApprovalId, ApprovalRequest>> {
        self.entries.write().unwrap_or_else(|e| {
            warn!("ApprovalLedger lock poisoned, recovering");
            e.into_inner()
        })
    }
}

impl fmt::Debug for ApprovalLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalLedger")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use warden_core::ManualClock;

    use super::*;
    use crate::preview::{EmailPreview, MessageSummary};

    const TTL: Duration = Duration::from_secs(300);

    fn make_ledger() -> (ApprovalLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (ApprovalLedger::new(clock.clone()), clock)
    }

    fn email() -> ActionPreview {
        EmailPreview::new("bob@example.com", "Hello", "Hi Bob").into()
    }

    fn alice() -> PrincipalId {
        PrincipalId::new("alice")
    }

    // ---- create ----

    #[test]
    fn test_create_is_pending() {
        let (ledger, _) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);

        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.action, ActionKind::SendEmail);
        assert_eq!(request.principal, alice());
        assert_eq!(
            (request.expires_at - request.created_at).num_seconds(),
            300
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending_count(), 1);
    }

    #[test]
    fn test_create_clamps_display_keeps_targets() {
        let (ledger, _) = make_ledger();
        let messages = (0..12)
            .map(|i| MessageSummary::new(format!("m{i}"), "x@y.z", "Old", "s".repeat(400)))
            .collect();
        let request = ledger.create(ActionPreview::delete_email(messages), &alice(), TTL);

        let ActionPreview::DeleteEmail(batch) = request.preview else {
            panic!("wrong variant");
        };
        assert_eq!(batch.message_ids.len(), 12);
        assert_eq!(batch.messages.len(), 5);
        assert_eq!(batch.messages[0].snippet.len(), 100);
        assert_eq!(batch.additional_messages, 7);
    }

    #[test]
    fn test_ttl_is_capped() {
        let (ledger, _) = make_ledger();
        let request = ledger.create(email(), &alice(), Duration::from_secs(10 * 24 * 3600));
        assert_eq!(
            (request.expires_at - request.created_at).num_seconds(),
            24 * 3600
        );
    }

    // ---- consume ----

    #[test]
    fn test_consume_within_ttl_once() {
        let (ledger, clock) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);

        clock.advance(Duration::from_secs(299));
        let preview = ledger.consume(&request.id, &alice()).unwrap();
        assert_eq!(preview, request.preview);

        assert!(matches!(
            ledger.consume(&request.id, &alice()),
            Err(GateError::AlreadyConsumed { .. })
        ));
    }

    #[test]
    fn test_consume_after_ttl_expired() {
        let (ledger, clock) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);

        clock.advance(Duration::from_secs(301));
        assert!(matches!(
            ledger.consume(&request.id, &alice()),
            Err(GateError::Expired { .. })
        ));
        // Stays expired; no sweep required.
        assert!(matches!(
            ledger.consume(&request.id, &alice()),
            Err(GateError::Expired { .. })
        ));
    }

    #[test]
    fn test_consume_at_exact_deadline_expired() {
        let (ledger, clock) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);

        clock.advance(TTL);
        assert!(matches!(
            ledger.consume(&request.id, &alice()),
            Err(GateError::Expired { .. })
        ));
    }

    #[test]
    fn test_consume_unknown_id() {
        let (ledger, _) = make_ledger();
        assert!(matches!(
            ledger.consume(&ApprovalId::new(), &alice()),
            Err(GateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_wrong_principal_does_not_consume() {
        let (ledger, _) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);

        assert!(matches!(
            ledger.consume(&request.id, &PrincipalId::new("mallory")),
            Err(GateError::PrincipalMismatch { .. })
        ));
        assert!(ledger.consume(&request.id, &alice()).is_ok());
    }

    #[test]
    fn test_action_mismatch_does_not_consume() {
        let (ledger, _) = make_ledger();
        let request = ledger.create(ActionPreview::delete_email(vec![]), &alice(), TTL);

        let err = ledger
            .consume_for_action(&request.id, &alice(), ActionKind::SendEmail)
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::ActionMismatch {
                approved: ActionKind::DeleteEmail,
                requested: ActionKind::SendEmail,
                ..
            }
        ));
        assert!(ledger.validate(&request.id, &alice()));
        assert!(
            ledger
                .consume_for_action(&request.id, &alice(), ActionKind::DeleteEmail)
                .is_ok()
        );
    }

    #[test]
    fn test_concurrent_consume_single_winner() {
        let (ledger, _) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);
        let threads = 32;
        let barrier = Barrier::new(threads);

        let results: Vec<GateResult<ActionPreview>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        ledger.consume(&request.id, &alice())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = results.iter().filter(|r| r.is_ok()).count();
        let reused = results
            .iter()
            .filter(|r| matches!(r, Err(GateError::AlreadyConsumed { .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(reused, threads - 1);
    }

    // ---- reject ----

    #[test]
    fn test_reject_then_consume() {
        let (ledger, _) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);

        ledger.reject(&request.id).unwrap();
        assert!(matches!(
            ledger.consume(&request.id, &alice()),
            Err(GateError::Rejected { .. })
        ));
        assert!(matches!(
            ledger.reject(&request.id),
            Err(GateError::AlreadyTerminal {
                status: ApprovalStatus::Rejected,
                ..
            })
        ));
    }

    #[test]
    fn test_reject_consumed_or_expired() {
        let (ledger, clock) = make_ledger();
        let consumed = ledger.create(email(), &alice(), TTL);
        ledger.consume(&consumed.id, &alice()).unwrap();
        assert!(matches!(
            ledger.reject(&consumed.id),
            Err(GateError::AlreadyTerminal {
                status: ApprovalStatus::Consumed,
                ..
            })
        ));

        let stale = ledger.create(email(), &alice(), TTL);
        clock.advance(Duration::from_secs(400));
        assert!(matches!(
            ledger.reject(&stale.id),
            Err(GateError::AlreadyTerminal {
                status: ApprovalStatus::Expired,
                ..
            })
        ));
        assert!(matches!(
            ledger.reject(&ApprovalId::new()),
            Err(GateError::NotFound { .. })
        ));
    }

    // ---- queries ----

    #[test]
    fn test_validate_is_read_only() {
        let (ledger, clock) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);

        assert!(ledger.validate(&request.id, &alice()));
        assert!(ledger.validate(&request.id, &alice()));
        assert!(!ledger.validate(&request.id, &PrincipalId::new("bob")));

        clock.advance(TTL);
        assert!(!ledger.validate(&request.id, &alice()));
    }

    #[test]
    fn test_get_reports_effective_status() {
        let (ledger, clock) = make_ledger();
        let request = ledger.create(email(), &alice(), TTL);
        assert_eq!(
            ledger.get(&request.id).unwrap().status,
            ApprovalStatus::Pending
        );

        clock.advance(TTL);
        assert_eq!(
            ledger.get(&request.id).unwrap().status,
            ApprovalStatus::Expired
        );
        assert_eq!(ledger.pending_count(), 0);
        assert!(ledger.get(&ApprovalId::new()).is_none());
    }

    // ---- sweep ----

    #[test]
    fn test_sweep_reclaims_overdue_entries() {
        let (ledger, clock) = make_ledger();
        let short = ledger.create(email(), &alice(), Duration::from_secs(60));
        let used = ledger.create(email(), &alice(), Duration::from_secs(60));
        let long = ledger.create(email(), &alice(), TTL);
        ledger.consume(&used.id, &alice()).unwrap();

        // Consumed entries stay until their deadline.
        assert_eq!(ledger.sweep(clock.now()), 0);
        assert!(matches!(
            ledger.consume(&used.id, &alice()),
            Err(GateError::AlreadyConsumed { .. })
        ));

        clock.advance(Duration::from_secs(60));
        assert_eq!(ledger.sweep(clock.now()), 2);
        assert_eq!(ledger.len(), 1);
        assert!(matches!(
            ledger.consume(&short.id, &alice()),
            Err(GateError::NotFound { .. })
        ));
        assert!(ledger.consume(&long.id, &alice()).is_ok());
    }

    #[test]
    fn test_sweep_skips_when_contended() {
        let (ledger, clock) = make_ledger();
        ledger.create(email(), &alice(), Duration::from_secs(1));
        clock.advance(Duration::from_secs(5));

        let guard = ledger.entries.read().unwrap();
        assert_eq!(ledger.sweep(clock.now()), 0);
        drop(guard);

        assert_eq!(ledger.sweep(clock.now()), 1);
        assert!(ledger.is_empty());
    }
}

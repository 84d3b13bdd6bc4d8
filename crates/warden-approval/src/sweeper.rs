//! Background reclamation of expired approvals and idle rate buckets.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::governor::RateGovernor;
use crate::ledger::ApprovalLedger;

/// Sweeper timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Rate buckets untouched this long are dropped.
    pub bucket_idle: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            bucket_idle: Duration::from_secs(3600),
        }
    }
}

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Token that stops the sweeper when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sweeper task ended abnormally");
        }
    }
}

/// Spawn a task on the current tokio runtime that periodically sweeps the
/// ledger and evicts idle rate buckets.
///
/// The first sweep runs immediately. Sweeping never blocks a concurrent
/// consume; a contended round is simply skipped.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn spawn_sweeper(
    ledger: Arc<ApprovalLedger>,
    governor: Arc<RateGovernor>,
    config: SweepConfig,
) -> SweeperHandle {
    let token = CancellationToken::new();
    let stop = token.clone();
    let period = config.interval.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = stop.cancelled() => break,
                _ = ticker.tick() => {
                    let approvals = ledger.sweep(ledger.clock().now());
                    let buckets = governor.evict_idle(config.bucket_idle);
                    if approvals > 0 || buckets > 0 {
                        debug!(approvals, buckets, "Sweep reclaimed entries");
                    }
                }
            }
        }
        debug!("Sweeper stopped");
    });

    SweeperHandle { token, task }
}

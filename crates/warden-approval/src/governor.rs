//! Per-principal rate limiting.
//!
//! A continuous-refill token bucket per principal. Levels are tracked in
//! micro-tokens so partial refills accumulate exactly, and `last_refill` only
//! moves forward by the time that was actually converted into tokens. Polling
//! the governor very frequently therefore never loses refill.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};
use warden_core::{Clock, PrincipalId};

use crate::error::{GateError, GateResult};

/// Micro-tokens per token.
const MICRO: u64 = 1_000_000;

/// Bucket parameters shared by every principal.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use warden_approval::RateLimitConfig;
///
/// let config = RateLimitConfig::per_window(100, Duration::from_secs(60));
/// assert_eq!(config.capacity, 100);
/// assert_eq!(config.refill_tokens, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum tokens a bucket holds. New buckets start full.
    pub capacity: u32,
    /// Tokens added per `refill_period`.
    pub refill_tokens: u32,
    /// Period over which `refill_tokens` are added.
    pub refill_period: Duration,
}

impl RateLimitConfig {
    /// A bucket of `capacity` refilling `refill_tokens` per `refill_period`.
    #[must_use]
    pub const fn new(capacity: u32, refill_tokens: u32, refill_period: Duration) -> Self {
        Self {
            capacity,
            refill_tokens,
            refill_period,
        }
    }

    /// `max` requests per `window`, refilled continuously.
    #[must_use]
    pub const fn per_window(max: u32, window: Duration) -> Self {
        Self::new(max, max, window)
    }

    fn capacity_micro(&self) -> u64 {
        u64::from(self.capacity).saturating_mul(MICRO)
    }

    fn rate_micro(&self) -> u128 {
        u128::from(self.refill_tokens).saturating_mul(u128::from(MICRO))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_window(100, Duration::from_secs(60))
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: u64,
    last_refill: Instant,
    last_seen: Instant,
}

/// Token-bucket rate limiter keyed by principal.
///
/// Buckets live in a sharded map; updates for one principal are atomic and
/// never contend with other principals on a global lock.
pub struct RateGovernor {
    buckets: DashMap<PrincipalId, Bucket>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateGovernor {
    /// Create a governor with the given bucket parameters.
    #[must_use]
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: DashMap::new(),
            config,
            clock,
        }
    }

    /// Bucket parameters.
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether `principal` could make a request now. Stores nothing.
    #[must_use]
    pub fn check(&self, principal: &PrincipalId) -> bool {
        let now = self.clock.now();
        match self.buckets.get(principal) {
            Some(bucket) => {
                let mut probe = *bucket;
                drop(bucket);
                self.refill(&mut probe, now);
                probe.tokens >= MICRO
            },
            None => self.config.capacity >= 1,
        }
    }

    /// Take one token for `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::RateLimitExceeded`] without deducting anything
    /// when less than one token is available.
    pub fn consume(&self, principal: &PrincipalId) -> GateResult<()> {
        let now = self.clock.now();
        let mut bucket = self
            .buckets
            .entry(principal.clone())
            .or_insert_with(|| self.full_bucket(now));

        self.refill(&mut bucket, now);
        bucket.last_seen = now;

        match bucket.tokens.checked_sub(MICRO) {
            Some(left) => {
                bucket.tokens = left;
                debug!(principal = %principal, remaining = whole_tokens(left), "Rate token consumed");
                Ok(())
            },
            None => {
                let retry_after = self.retry_after(bucket.tokens);
                let remaining = whole_tokens(bucket.tokens);
                drop(bucket);
                warn!(
                    principal = %principal,
                    retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                    "Rate limit exceeded"
                );
                Err(GateError::RateLimitExceeded {
                    principal: principal.to_string(),
                    retry_after,
                    remaining,
                })
            },
        }
    }

    /// Whole tokens available to `principal`, refilling its bucket.
    #[must_use]
    pub fn remaining(&self, principal: &PrincipalId) -> u32 {
        let now = self.clock.now();
        match self.buckets.get_mut(principal) {
            Some(mut bucket) => {
                self.refill(&mut bucket, now);
                bucket.last_seen = now;
                whole_tokens(bucket.tokens)
            },
            None => self.config.capacity,
        }
    }

    /// Forget `principal`'s bucket, restoring full capacity.
    ///
    /// Returns whether a bucket existed.
    pub fn reset(&self, principal: &PrincipalId) -> bool {
        self.buckets.remove(principal).is_some()
    }

    /// Drop buckets untouched for at least `max_idle`. Returns how many were
    /// removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) < max_idle);
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            debug!(removed, "Evicted idle rate buckets");
        }
        removed
    }

    /// Number of principals with a live bucket.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn full_bucket(&self, now: Instant) -> Bucket {
        Bucket {
            tokens: self.config.capacity_micro(),
            last_refill: now,
            last_seen: now,
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let capacity = self.config.capacity_micro();
        if bucket.tokens >= capacity {
            bucket.tokens = capacity;
            bucket.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_nanos();
        let rate = self.config.rate_micro();
        let period = self.config.refill_period.as_nanos();
        let credit = match elapsed.checked_mul(rate) {
            Some(scaled) => scaled.checked_div(period).unwrap_or(0),
            None => u128::MAX,
        };
        if credit == 0 {
            return;
        }

        let room = u128::from(capacity.saturating_sub(bucket.tokens));
        if credit >= room {
            bucket.tokens = capacity;
            bucket.last_refill = now;
            return;
        }

        // credit < room, so it fits in u64.
        bucket.tokens = bucket
            .tokens
            .saturating_add(u64::try_from(credit).unwrap_or(u64::MAX));

        // Advance only by the time that produced whole micro-tokens; the
        // remainder carries into the next refill.
        let used = credit
            .saturating_mul(period)
            .checked_div(rate)
            .unwrap_or(elapsed);
        let used = Duration::from_nanos(u64::try_from(used).unwrap_or(u64::MAX));
        bucket.last_refill = bucket
            .last_refill
            .checked_add(used)
            .map_or(now, |t| t.min(now));
    }

    fn retry_after(&self, tokens: u64) -> Duration {
        let needed = u128::from(MICRO.saturating_sub(tokens));
        let rate = self.config.rate_micro();
        if rate == 0 {
            return self.config.refill_period;
        }
        let nanos = needed
            .saturating_mul(self.config.refill_period.as_nanos())
            .div_ceil(rate);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl fmt::Debug for RateGovernor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateGovernor")
            .field("config", &self.config)
            .field("buckets", &self.buckets.len())
            .finish_non_exhaustive()
    }
}

fn whole_tokens(micro: u64) -> u32 {
    u32::try_from(micro.checked_div(MICRO).unwrap_or(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use warden_core::ManualClock;

    use super::*;

    fn make_governor(capacity: u32, window_secs: u64) -> (RateGovernor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = RateLimitConfig::per_window(capacity, Duration::from_secs(window_secs));
        (RateGovernor::new(config, clock.clone()), clock)
    }

    fn alice() -> PrincipalId {
        PrincipalId::new("alice")
    }

    #[test]
    fn test_burst_then_refill_one() {
        let (governor, clock) = make_governor(5, 60);

        for _ in 0..5 {
            governor.consume(&alice()).unwrap();
        }
        let err = governor.consume(&alice()).unwrap_err();
        let GateError::RateLimitExceeded {
            retry_after,
            remaining,
            ..
        } = err
        else {
            panic!("expected rate limit, got {err:?}");
        };
        assert_eq!(retry_after, Duration::from_secs(12));
        assert_eq!(remaining, 0);

        clock.advance(Duration::from_secs(12));
        assert!(governor.consume(&alice()).is_ok());
        assert!(governor.consume(&alice()).is_err());
    }

    #[test]
    fn test_refused_consume_deducts_nothing() {
        let (governor, clock) = make_governor(1, 60);
        governor.consume(&alice()).unwrap();

        clock.advance(Duration::from_secs(30));
        for _ in 0..10 {
            assert!(governor.consume(&alice()).is_err());
        }
        clock.advance(Duration::from_secs(30));
        assert!(governor.consume(&alice()).is_ok());
    }

    #[test]
    fn test_check_is_side_effect_free() {
        let (governor, _) = make_governor(2, 60);

        assert!(governor.check(&alice()));
        assert_eq!(governor.bucket_count(), 0);

        governor.consume(&alice()).unwrap();
        governor.consume(&alice()).unwrap();
        assert!(!governor.check(&alice()));
        assert!(!governor.check(&alice()));
        assert_eq!(governor.remaining(&alice()), 0);
    }

    #[test]
    fn test_remaining_floors_partial_tokens() {
        let (governor, clock) = make_governor(5, 60);
        assert_eq!(governor.remaining(&alice()), 5);

        for _ in 0..5 {
            governor.consume(&alice()).unwrap();
        }
        clock.advance(Duration::from_secs(18));
        assert_eq!(governor.remaining(&alice()), 1);
        clock.advance(Duration::from_secs(6));
        assert_eq!(governor.remaining(&alice()), 2);
    }

    #[test]
    fn test_frequent_polling_does_not_starve_refill() {
        let (governor, clock) = make_governor(5, 60);
        for _ in 0..5 {
            governor.consume(&alice()).unwrap();
        }

        for _ in 0..120 {
            clock.advance(Duration::from_millis(100));
            let _ = governor.check(&alice());
            let _ = governor.remaining(&alice());
        }
        assert_eq!(governor.remaining(&alice()), 1);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let (governor, clock) = make_governor(3, 60);
        governor.consume(&alice()).unwrap();
        clock.advance(Duration::from_secs(3600));
        assert_eq!(governor.remaining(&alice()), 3);
    }

    #[test]
    fn test_principals_are_independent() {
        let (governor, _) = make_governor(1, 60);
        governor.consume(&alice()).unwrap();
        assert!(governor.consume(&alice()).is_err());
        assert!(governor.consume(&PrincipalId::new("bob")).is_ok());
    }

    #[test]
    fn test_reset_restores_capacity() {
        let (governor, _) = make_governor(1, 60);
        governor.consume(&alice()).unwrap();
        assert!(governor.reset(&alice()));
        assert!(!governor.reset(&alice()));
        assert!(governor.consume(&alice()).is_ok());
    }

    #[test]
    fn test_evict_idle() {
        let (governor, clock) = make_governor(5, 60);
        governor.consume(&alice()).unwrap();
        clock.advance(Duration::from_secs(3000));
        governor.consume(&PrincipalId::new("bob")).unwrap();
        clock.advance(Duration::from_secs(600));

        assert_eq!(governor.evict_idle(Duration::from_secs(3600)), 1);
        assert_eq!(governor.bucket_count(), 1);
    }

    #[test]
    fn test_concurrent_consume_respects_capacity() {
        let (governor, _) = make_governor(100, 60);
        let successes = AtomicUsize::new(0);
        let barrier = Barrier::new(16);

        std::thread::scope(|s| {
            for _ in 0..16 {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..10 {
                        if governor.consume(&alice()).is_ok() {
                            successes.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(successes.load(Ordering::Relaxed), 100);
    }
}

//! Test harness helpers.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use warden_approval::{ApprovalLedger, RateGovernor, RateLimitConfig, SafetyGate};
use warden_core::ManualClock;
use warden_crypto::Keyring;
use warden_vault::CredentialVault;

use crate::fixtures::test_keyring;

/// Approval lifetime used by [`GateHarness::new`].
pub const TEST_TTL: Duration = Duration::from_secs(300);

/// A safety gate wired to a manual clock.
///
/// Time only moves when [`advance`](Self::advance) is called, so expiry and
/// refill tests never sleep.
#[derive(Debug)]
pub struct GateHarness {
    /// Clock shared by the ledger and the governor.
    pub clock: Arc<ManualClock>,
    /// The gate under test.
    pub gate: SafetyGate,
}

impl GateHarness {
    /// Gate with a 300 second TTL and 5 confirmations per 60 seconds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(
            RateLimitConfig::per_window(5, Duration::from_secs(60)),
            TEST_TTL,
        )
    }

    /// Gate with explicit rate limit and TTL.
    #[must_use]
    pub fn with_limits(limits: RateLimitConfig, ttl: Duration) -> Self {
        let clock = Arc::new(ManualClock::new());
        let ledger = Arc::new(ApprovalLedger::new(clock.clone()));
        let governor = Arc::new(RateGovernor::new(limits, clock.clone()));
        Self {
            clock,
            gate: SafetyGate::new(ledger, governor, ttl),
        }
    }

    /// Move the shared clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// The gate's ledger.
    #[must_use]
    pub fn ledger(&self) -> &ApprovalLedger {
        self.gate.ledger()
    }

    /// The gate's governor.
    #[must_use]
    pub fn governor(&self) -> &RateGovernor {
        self.gate.governor()
    }
}

impl Default for GateHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A credential vault in a temporary directory.
///
/// The directory is removed when the value is dropped.
#[derive(Debug)]
pub struct TestVault {
    /// Owns the directory; keep it alive as long as the vault.
    pub dir: TempDir,
    /// The vault under test.
    pub vault: CredentialVault,
}

impl TestVault {
    /// Vault sealed with [`test_keyring`].
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or vault cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self::with_keyring(test_keyring())
    }

    /// Vault sealed with an explicit keyring.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or vault cannot be created.
    #[must_use]
    pub fn with_keyring(keyring: Keyring) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let vault = CredentialVault::open(dir.path().join("vault"), keyring)
            .expect("Failed to open vault");
        Self { dir, vault }
    }

    /// Open a second vault over the same directory with another keyring.
    ///
    /// # Panics
    ///
    /// Panics if the vault cannot be opened.
    #[must_use]
    pub fn reopen(&self, keyring: Keyring) -> CredentialVault {
        CredentialVault::open(self.vault.root(), keyring).expect("Failed to reopen vault")
    }
}

impl Default for TestVault {
    fn default() -> Self {
        Self::new()
    }
}

/// Set up test logging with the given filter.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{test_label_preview, test_principal};

    #[test]
    fn test_harness_clock_drives_expiry() {
        let h = GateHarness::new();
        let alice = test_principal();
        let pending = h.gate.request(&alice, test_label_preview()).unwrap();

        assert!(h.ledger().validate(&pending.approval_id, &alice));
        h.advance(TEST_TTL);
        assert!(!h.ledger().validate(&pending.approval_id, &alice));
    }

    #[test]
    fn test_harness_rate_limit() {
        let h = GateHarness::new();
        let alice = test_principal();
        for _ in 0..5 {
            h.governor().consume(&alice).unwrap();
        }
        assert!(!h.governor().check(&alice));
        assert_eq!(h.gate.ttl(), TEST_TTL);
    }

    #[test]
    fn test_vault_roundtrip() {
        let tv = TestVault::new();
        let alice = test_principal();
        tv.vault.save(&alice, b"token").unwrap();
        assert_eq!(&tv.vault.load(&alice).unwrap()[..], b"token");

        let reopened = tv.reopen(test_keyring());
        assert!(reopened.exists(&alice).unwrap());
    }

    #[test]
    fn test_setup_logging_twice() {
        setup_test_logging("warn");
        setup_test_logging("debug");
    }
}

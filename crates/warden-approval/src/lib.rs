//! Warden Approval - The preview/confirm safety gate.
//!
//! This crate provides:
//! - [`ApprovalLedger`]: single-use, time-limited, principal-bound approvals
//! - [`RateGovernor`]: per-principal continuous-refill token buckets
//! - [`SafetyGate`]: the two-step protocol composing both
//! - [`spawn_sweeper`]: background reclamation on the tokio runtime
//!
//! # Flow
//!
//! ```text
//! step 1: handle(principal, action, None, build_preview, executor)
//!           -> preview.validate, ledger.create -> GateOutcome::Pending
//! step 2: handle(principal, action, Some(id), build_preview, executor)
//!           -> governor.consume         (fail fast)
//!           -> ledger.consume_for_action
//!           -> executor(captured preview) -> GateOutcome::Executed
//! ```
//!
//! # Example
//!
//! ```
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden_approval::prelude::*;
//! use warden_core::{PrincipalId, SystemClock};
//!
//! let clock = Arc::new(SystemClock);
//! let gate = SafetyGate::new(
//!     Arc::new(ApprovalLedger::new(clock.clone())),
//!     Arc::new(RateGovernor::new(RateLimitConfig::default(), clock)),
//!     Duration::from_secs(300),
//! );
//! let alice = PrincipalId::new("alice");
//! let build = || ActionPreview::from(LabelPreview::new("Receipts"));
//!
//! let first = gate
//!     .handle(&alice, ActionKind::CreateLabel, None, build, |_| Ok::<_, Infallible>(()))
//!     .unwrap();
//! let id = first.pending().unwrap().approval_id;
//!
//! let second = gate
//!     .handle(&alice, ActionKind::CreateLabel, Some(&id), build, |_| Ok::<_, Infallible>("created"))
//!     .unwrap();
//! assert_eq!(second.executed(), Some("created"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Error types and results for the approval gate.
pub mod error;
pub mod gate;
pub mod governor;
pub mod ledger;
pub mod preview;
pub mod request;
pub mod sweeper;

pub use error::{GateError, GateResult, Remediation};
pub use gate::{AUDIT_TARGET, GateOutcome, SafetyGate};
pub use governor::{RateGovernor, RateLimitConfig};
pub use ledger::ApprovalLedger;
pub use preview::{
    ActionKind, ActionPreview, EmailPreview, LabelListVisibility, LabelOperation,
    LabelOperationsPreview, LabelPreview, MessageBatchPreview, MessageListVisibility,
    MessageSummary, PreviewError, UnsubscribePreview,
};
pub use request::{ApprovalId, ApprovalRequest, ApprovalStatus, PENDING_MESSAGE, PendingApproval};
pub use sweeper::{SweepConfig, SweeperHandle, spawn_sweeper};

//! Warden Test - Shared test utilities for the Warden crates.
//!
//! Fixtures for principals, previews and keys, a gate harness driven by a
//! manual clock, a throwaway vault, and executors that record what they
//! were asked to run.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! warden-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use warden_test::{GateHarness, RecordingExecutor, test_email_preview, test_principal};
//!
//! #[test]
//! fn test_send_flow() {
//!     let h = GateHarness::new();
//!     let alice = test_principal();
//!     let exec = RecordingExecutor::new();
//!
//!     let pending = h.gate.request(&alice, test_email_preview()).unwrap();
//!     h.gate
//!         .confirm(&alice, ActionKind::SendEmail, &pending.approval_id, exec.executor())
//!         .unwrap();
//!     assert_eq!(exec.calls(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

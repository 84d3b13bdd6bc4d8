//! Warden Telemetry - logging setup for the Warden safety layer.
//!
//! Every crate in the workspace logs through `tracing`. This crate installs
//! the global subscriber: level and per-target directives, one of three
//! output formats, and the `RUST_LOG` override.
//!
//! Audit events from the safety gate use the `warden::audit` target, so they
//! can be routed or filtered on their own:
//!
//! ```text
//! RUST_LOG=warn,warden::audit=info
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), warden_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Json)
//!     .with_directive("warden_vault=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    LogConfig, LogFormat, LogTarget, RUST_LOG_VAR, setup_default_logging, setup_logging,
};

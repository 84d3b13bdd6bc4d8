//! Warden Core - Foundation types for the Warden safety layer.
//!
//! This crate provides:
//! - [`PrincipalId`], the identity on whose behalf a request is made
//! - The [`Clock`] abstraction (monotonic + wall time) with a system and a
//!   manually-driven implementation
//! - The [`WardenHome`] directory layout
//! - Small text utilities shared by preview builders
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use warden_core::{Clock, ManualClock, PrincipalId};
//!
//! let principal = PrincipalId::new("alice@example.com");
//! assert_eq!(principal.as_str(), "alice@example.com");
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(30));
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(30));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod clock;
pub mod dirs;
pub mod principal;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dirs::WardenHome;
pub use principal::PrincipalId;
pub use utils::{truncate_to_boundary, truncate_with_marker};

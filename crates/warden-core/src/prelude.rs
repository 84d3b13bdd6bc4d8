//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_core::prelude::*;` to import all essential types.

// Identity
pub use crate::PrincipalId;

// Time
pub use crate::{Clock, ManualClock, SystemClock};

// Layout
pub use crate::WardenHome;

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_approval::prelude::*;` to import all essential types.

// Errors
pub use crate::{GateError, GateResult, Remediation};

// Gate
pub use crate::{ApprovalLedger, GateOutcome, RateGovernor, RateLimitConfig, SafetyGate};

// Approvals
pub use crate::{ApprovalId, ApprovalStatus, PendingApproval};

// Previews
pub use crate::{
    ActionKind, ActionPreview, EmailPreview, LabelPreview, MessageSummary, PreviewError,
};

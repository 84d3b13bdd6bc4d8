use std::time::Duration;

use crate::preview::{ActionKind, PreviewError};
use crate::request::ApprovalId;

/// How the calling layer should react to a [`GateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remediation {
    /// Wait and try the same confirmation again.
    Retry,
    /// Start over with a fresh approval request.
    Reprompt,
    /// Do not retry; the request is wrong or the action failed.
    Abort,
}

/// Errors from the approval gate, ledger and rate governor.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No approval with this id exists (never issued, or already reclaimed).
    #[error("approval {id} not found")]
    NotFound {
        /// The id looked up.
        id: ApprovalId,
    },

    /// The approval was issued to a different principal.
    #[error("approval {id} was not issued to this principal")]
    PrincipalMismatch {
        /// The id looked up.
        id: ApprovalId,
    },

    /// The approval has already authorized an action.
    #[error("approval {id} has already been used")]
    AlreadyConsumed {
        /// The id looked up.
        id: ApprovalId,
    },

    /// The approval's deadline passed.
    #[error("approval {id} has expired")]
    Expired {
        /// The id looked up.
        id: ApprovalId,
    },

    /// The approval was explicitly rejected.
    #[error("approval {id} was rejected")]
    Rejected {
        /// The id looked up.
        id: ApprovalId,
    },

    /// The approval is no longer pending and cannot be rejected.
    #[error("approval {id} is no longer pending ({status})")]
    AlreadyTerminal {
        /// The id looked up.
        id: ApprovalId,
        /// Its terminal status.
        status: crate::request::ApprovalStatus,
    },

    /// The approval authorizes a different action.
    #[error("approval {id} was issued for {approved}, not {requested}")]
    ActionMismatch {
        /// The id looked up.
        id: ApprovalId,
        /// Action the approval was issued for.
        approved: ActionKind,
        /// Action the caller tried to confirm.
        requested: ActionKind,
    },

    /// Step one built a preview for a different action than requested.
    #[error("preview was built for {built}, not {requested}")]
    PreviewMismatch {
        /// Action the caller asked to gate.
        requested: ActionKind,
        /// Action the built preview belongs to.
        built: ActionKind,
    },

    /// The preview's execution fields are out of bounds.
    #[error("invalid preview: {0}")]
    InvalidPreview(#[from] PreviewError),

    /// The principal has no request tokens left.
    #[error("rate limit exceeded for {principal}: retry in {}ms", retry_after.as_millis())]
    RateLimitExceeded {
        /// The throttled principal.
        principal: String,
        /// Time until one full token is available.
        retry_after: Duration,
        /// Whole tokens left (always 0 when this is returned by `consume`).
        remaining: u32,
    },

    /// The confirmed action ran and failed.
    #[error("action failed: {0}")]
    Execution(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GateError {
    /// Stable snake_case code for the calling layer.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::PrincipalMismatch { .. } => "principal_mismatch",
            Self::AlreadyConsumed { .. } => "already_consumed",
            Self::Expired { .. } => "expired",
            Self::Rejected { .. } => "rejected",
            Self::AlreadyTerminal { .. } => "already_terminal",
            Self::ActionMismatch { .. } | Self::PreviewMismatch { .. } => "action_mismatch",
            Self::InvalidPreview(_) => "invalid_preview",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::Execution(_) => "execution_failed",
        }
    }

    /// What the caller should do next.
    #[must_use]
    pub const fn remediation(&self) -> Remediation {
        match self {
            Self::RateLimitExceeded { .. } => Remediation::Retry,
            Self::NotFound { .. }
            | Self::AlreadyConsumed { .. }
            | Self::Expired { .. }
            | Self::Rejected { .. }
            | Self::AlreadyTerminal { .. } => Remediation::Reprompt,
            Self::PrincipalMismatch { .. }
            | Self::ActionMismatch { .. }
            | Self::PreviewMismatch { .. }
            | Self::InvalidPreview(_)
            | Self::Execution(_) => Remediation::Abort,
        }
    }

    /// Suggested wait before retrying, for rate-limit errors.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Wrap an executor failure.
    pub fn execution(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Execution(err.into())
    }
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

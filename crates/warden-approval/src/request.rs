//! Approval identifiers, requests and the pending-approval response.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use warden_core::PrincipalId;

use crate::preview::{ActionKind, ActionPreview};

/// Message returned with every pending approval.
pub const PENDING_MESSAGE: &str = "ACTION NOT TAKEN. Please review and confirm.";

/// Unguessable identifier for an approval request.
///
/// 128 bits from the OS CSPRNG, rendered as 32 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApprovalId([u8; 16]);

impl ApprovalId {
    /// Generate a new random id.
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Encode as hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ApprovalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApprovalId({})", self.to_hex())
    }
}

/// Error parsing an [`ApprovalId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("approval id must be 32 hex characters")]
pub struct InvalidApprovalId;

impl FromStr for ApprovalId {
    type Err = InvalidApprovalId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s.trim(), &mut bytes).map_err(|_| InvalidApprovalId)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for ApprovalId {
    type Error = InvalidApprovalId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ApprovalId> for String {
    fn from(id: ApprovalId) -> Self {
        id.to_hex()
    }
}

/// Lifecycle state of an approval request.
///
/// The ledger only moves `Pending` to one of `Consumed`, `Rejected` or
/// `Expired`; no state is ever left once terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting confirmation.
    Pending,
    /// Confirmed by an external decision but not yet executed.
    Approved,
    /// Explicitly rejected.
    Rejected,
    /// Deadline passed before confirmation.
    Expired,
    /// Confirmed and executed.
    Consumed,
}

impl ApprovalStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Expired | Self::Consumed)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Consumed => "consumed",
        })
    }
}

/// A request for confirmation of one side-effecting action.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalRequest {
    /// Unique id.
    pub id: ApprovalId,
    /// The action being authorized.
    pub action: ActionKind,
    /// What the user is confirming.
    pub preview: ActionPreview,
    /// Who asked.
    pub principal: PrincipalId,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request stops being consumable.
    pub expires_at: DateTime<Utc>,
    /// Current state.
    pub status: ApprovalStatus,
    #[serde(skip)]
    deadline: Instant,
}

impl ApprovalRequest {
    pub(crate) fn new(
        preview: ActionPreview,
        principal: PrincipalId,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        deadline: Instant,
    ) -> Self {
        Self {
            id: ApprovalId::new(),
            action: preview.kind(),
            preview,
            principal,
            created_at,
            expires_at,
            status: ApprovalStatus::Pending,
            deadline,
        }
    }

    /// Monotonic deadline used for expiry decisions.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the deadline has been reached at `now`.
    #[must_use]
    pub fn is_overdue(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Status as seen at `now`: an overdue pending request reads as expired.
    #[must_use]
    pub fn effective_status(&self, now: Instant) -> ApprovalStatus {
        if self.status == ApprovalStatus::Pending && self.is_overdue(now) {
            ApprovalStatus::Expired
        } else {
            self.status
        }
    }
}

/// Response to step one of a gated action: nothing happened yet.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    /// Always `"pending_approval"`.
    pub status: &'static str,
    /// Id to pass back when confirming.
    pub approval_id: ApprovalId,
    /// The action awaiting confirmation.
    pub action: ActionKind,
    /// When the approval stops being valid.
    pub expires_at: DateTime<Utc>,
    /// What will happen on confirmation.
    pub preview: ActionPreview,
    /// Human-readable notice.
    pub message: String,
}

impl From<&ApprovalRequest> for PendingApproval {
    fn from(request: &ApprovalRequest) -> Self {
        Self {
            status: "pending_approval",
            approval_id: request.id,
            action: request.action,
            expires_at: request.expires_at,
            preview: request.preview.clone(),
            message: PENDING_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_hex() {
        let a = ApprovalId::new();
        let b = ApprovalId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_hex().len(), 32);
        assert!(a.to_hex().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_id_parse() {
        let id = ApprovalId::new();
        assert_eq!(id.to_string().parse::<ApprovalId>().unwrap(), id);
        assert!("not-hex".parse::<ApprovalId>().is_err());
        assert!("abcd".parse::<ApprovalId>().is_err());
    }

    #[test]
    fn test_id_serde_as_string() {
        let id = ApprovalId::from_bytes([0xab; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(16)));
        let back: ApprovalId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ApprovalId>("\"zz\"").is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(!ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Rejected.is_terminal());
        assert!(ApprovalStatus::Expired.is_terminal());
        assert!(ApprovalStatus::Consumed.is_terminal());
    }
}

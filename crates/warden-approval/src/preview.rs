//! Typed action previews.
//!
//! A preview is what the user sees before confirming an action, and it is
//! also what the executor receives on confirmation: the gate hands back the
//! preview captured at creation time, never parameters re-supplied by the
//! caller. Every variant belongs to exactly one [`ActionKind`].
//!
//! Each variant carries two kinds of fields:
//!
//! - execution fields (message ids, recipients, the full body, label names,
//!   the unsubscribe link) are what the executor acts on. They are bounded
//!   by [`ActionPreview::validate`] and never shortened.
//! - display fields (the body excerpt, listed message summaries, warnings)
//!   are derived or descriptive and are clipped by [`ActionPreview::clamped`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use warden_core::{truncate_to_boundary, truncate_with_marker};

/// Size bounds for previews.
///
/// Execution bounds are enforced by [`ActionPreview::validate`]; display
/// bounds by [`ActionPreview::clamped`]. Lengths are in characters.
pub mod limits {
    // ---- execution ----

    /// Recipients per recipient list.
    pub const MAX_RECIPIENTS: usize = 50;
    /// Characters of one email address.
    pub const EMAIL_ADDRESS_CHARS: usize = 254;
    /// Characters of an email subject.
    pub const SUBJECT_CHARS: usize = 256;
    /// Characters of an email body.
    pub const BODY_CHARS: usize = 256 * 1024;
    /// Characters of a message, thread or label id.
    pub const ID_CHARS: usize = 64;
    /// Messages one batch action may target.
    pub const MAX_BATCH_MESSAGES: usize = 1000;
    /// Characters of a label name.
    pub const LABEL_NAME_CHARS: usize = 225;
    /// Operations in one label reorganization.
    pub const MAX_LABEL_OPERATIONS: usize = 20;
    /// Characters of an unsubscribe link.
    pub const LINK_CHARS: usize = 2048;

    // ---- display ----

    /// Characters of the body excerpt shown in a send preview.
    pub const BODY_PREVIEW_CHARS: usize = 500;
    /// Messages listed individually in a batch preview.
    pub const MAX_LISTED_MESSAGES: usize = 5;
    /// Characters of a message snippet.
    pub const SNIPPET_CHARS: usize = 100;
    /// Characters of any other descriptive field.
    pub const FIELD_CHARS: usize = 512;
}

/// Warning attached to delete previews.
pub const DELETE_WARNING: &str = "WARNING: This action will move messages to Trash. \
     Messages in Trash are permanently deleted after 30 days.";

/// Warning attached to label reorganization previews.
pub const ORGANIZE_WARNING: &str =
    "These operations will modify your Gmail labels. Delete operations cannot be undone.";

/// Warning attached to unsubscribe previews.
pub const UNSUBSCRIBE_WARNING: &str = "This will return the unsubscribe link. \
     You will need to follow the link to complete unsubscription.";

/// The kind of side-effecting action an approval authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Send an email.
    SendEmail,
    /// Move messages to trash.
    DeleteEmail,
    /// Remove messages from the inbox.
    ArchiveEmail,
    /// Create a label.
    CreateLabel,
    /// Rename, delete or change the visibility of labels.
    OrganizeLabels,
    /// Reveal a message's unsubscribe link.
    Unsubscribe,
}

impl ActionKind {
    /// Every action kind.
    pub const ALL: [Self; 6] = [
        Self::SendEmail,
        Self::DeleteEmail,
        Self::ArchiveEmail,
        Self::CreateLabel,
        Self::OrganizeLabels,
        Self::Unsubscribe,
    ];

    /// Stable snake_case tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SendEmail => "send_email",
            Self::DeleteEmail => "delete_email",
            Self::ArchiveEmail => "archive_email",
            Self::CreateLabel => "create_label",
            Self::OrganizeLabels => "organize_labels",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an [`ActionKind`] tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action kind: {0}")]
pub struct UnknownActionKind(pub String);

impl FromStr for ActionKind {
    type Err = UnknownActionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownActionKind(s.to_string()))
    }
}

/// A preview whose execution fields are out of bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    /// A required field or list is empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Offending field.
        field: &'static str,
    },

    /// A list has more entries than allowed.
    #[error("{field} has {len} entries, at most {max} allowed")]
    TooMany {
        /// Offending field.
        field: &'static str,
        /// Entries supplied.
        len: usize,
        /// Bound from [`limits`].
        max: usize,
    },

    /// A value is longer than allowed.
    #[error("{field} is {len} characters long, at most {max} allowed")]
    TooLong {
        /// Offending field.
        field: &'static str,
        /// Characters supplied.
        len: usize,
        /// Bound from [`limits`].
        max: usize,
    },

    /// A batch preview lists a message the action does not target.
    #[error("listed message {id} is not one of the targeted messages")]
    UntargetedMessage {
        /// The listed id.
        id: String,
    },
}

/// Result of [`ActionPreview::validate`].
pub type PreviewResult<T> = Result<T, PreviewError>;

/// What the user is asked to confirm, and what the executor receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionPreview {
    /// An outgoing email.
    SendEmail(EmailPreview),
    /// Messages about to be trashed.
    DeleteEmail(MessageBatchPreview),
    /// Messages about to be archived.
    ArchiveEmail(MessageBatchPreview),
    /// A label about to be created.
    CreateLabel(LabelPreview),
    /// A batch of label changes.
    OrganizeLabels(LabelOperationsPreview),
    /// An unsubscribe link about to be revealed.
    Unsubscribe(UnsubscribePreview),
}

impl ActionPreview {
    /// Preview for trashing `messages`, with the standard warning.
    #[must_use]
    pub fn delete_email(messages: Vec<MessageSummary>) -> Self {
        Self::DeleteEmail(MessageBatchPreview::new(messages).with_warning(DELETE_WARNING))
    }

    /// Preview for archiving `messages`.
    #[must_use]
    pub fn archive_email(messages: Vec<MessageSummary>) -> Self {
        Self::ArchiveEmail(MessageBatchPreview::new(messages))
    }

    /// The action this preview belongs to.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::SendEmail(_) => ActionKind::SendEmail,
            Self::DeleteEmail(_) => ActionKind::DeleteEmail,
            Self::ArchiveEmail(_) => ActionKind::ArchiveEmail,
            Self::CreateLabel(_) => ActionKind::CreateLabel,
            Self::OrganizeLabels(_) => ActionKind::OrganizeLabels,
            Self::Unsubscribe(_) => ActionKind::Unsubscribe,
        }
    }

    /// Check the execution fields against the bounds in [`limits`].
    ///
    /// # Errors
    ///
    /// The first [`PreviewError`] found.
    pub fn validate(&self) -> PreviewResult<()> {
        match self {
            Self::SendEmail(p) => p.validate(),
            Self::DeleteEmail(p) | Self::ArchiveEmail(p) => p.validate(),
            Self::CreateLabel(p) => p.validate(),
            Self::OrganizeLabels(p) => p.validate(),
            Self::Unsubscribe(p) => p.validate(),
        }
    }

    /// Clip display fields to the bounds in [`limits`] and recompute the
    /// derived ones. Execution fields are left untouched.
    ///
    /// Idempotent: clamping an already clamped preview changes nothing.
    #[must_use]
    pub fn clamped(self) -> Self {
        match self {
            Self::SendEmail(p) => Self::SendEmail(p.clamped()),
            Self::DeleteEmail(p) => Self::DeleteEmail(p.clamped()),
            Self::ArchiveEmail(p) => Self::ArchiveEmail(p.clamped()),
            Self::CreateLabel(p) => Self::CreateLabel(p),
            Self::OrganizeLabels(p) => Self::OrganizeLabels(p.clamped()),
            Self::Unsubscribe(p) => Self::Unsubscribe(p.clamped()),
        }
    }
}

impl From<EmailPreview> for ActionPreview {
    fn from(p: EmailPreview) -> Self {
        Self::SendEmail(p)
    }
}

impl From<LabelPreview> for ActionPreview {
    fn from(p: LabelPreview) -> Self {
        Self::CreateLabel(p)
    }
}

impl From<LabelOperationsPreview> for ActionPreview {
    fn from(p: LabelOperationsPreview) -> Self {
        Self::OrganizeLabels(p)
    }
}

impl From<UnsubscribePreview> for ActionPreview {
    fn from(p: UnsubscribePreview) -> Self {
        Self::Unsubscribe(p)
    }
}

fn clip(s: &mut String, max_chars: usize) {
    let end = truncate_to_boundary(s, max_chars).len();
    s.truncate(end);
}

fn check_text(field: &'static str, value: &str, max: usize) -> PreviewResult<()> {
    if value.is_empty() {
        return Err(PreviewError::Empty { field });
    }
    let len = value.chars().count();
    if len > max {
        return Err(PreviewError::TooLong { field, len, max });
    }
    Ok(())
}

fn check_count(field: &'static str, len: usize, max: usize) -> PreviewResult<()> {
    if len > max {
        return Err(PreviewError::TooMany { field, len, max });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// send_email
// ---------------------------------------------------------------------------

/// Preview of an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPreview {
    /// Primary recipients.
    pub to: Vec<String>,
    /// Carbon-copy recipients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    /// Blind carbon-copy recipients.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// The full body that will be sent.
    pub body: String,
    /// Leading part of the body, with `"..."` when cut.
    #[serde(default)]
    pub body_preview: String,
    /// Thread being replied to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_thread_id: Option<String>,
}

impl EmailPreview {
    /// Build a preview of sending `body` to `to`.
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            body: body.into(),
            body_preview: String::new(),
            reply_to_thread_id: None,
        }
        .clamped()
    }

    /// Set the cc list.
    #[must_use]
    pub fn with_cc(mut self, cc: Vec<String>) -> Self {
        self.cc = cc;
        self
    }

    /// Set the bcc list.
    #[must_use]
    pub fn with_bcc(mut self, bcc: Vec<String>) -> Self {
        self.bcc = bcc;
        self
    }

    /// Mark the email as a reply within a thread.
    #[must_use]
    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.reply_to_thread_id = Some(thread_id.into());
        self
    }

    fn validate(&self) -> PreviewResult<()> {
        if self.to.is_empty() {
            return Err(PreviewError::Empty { field: "to" });
        }
        for (field, list) in [("to", &self.to), ("cc", &self.cc), ("bcc", &self.bcc)] {
            check_count(field, list.len(), limits::MAX_RECIPIENTS)?;
            for addr in list {
                check_text(field, addr, limits::EMAIL_ADDRESS_CHARS)?;
            }
        }
        let len = self.subject.chars().count();
        if len > limits::SUBJECT_CHARS {
            return Err(PreviewError::TooLong {
                field: "subject",
                len,
                max: limits::SUBJECT_CHARS,
            });
        }
        let len = self.body.chars().count();
        if len > limits::BODY_CHARS {
            return Err(PreviewError::TooLong {
                field: "body",
                len,
                max: limits::BODY_CHARS,
            });
        }
        if let Some(thread) = &self.reply_to_thread_id {
            check_text("reply_to_thread_id", thread, limits::ID_CHARS)?;
        }
        Ok(())
    }

    fn clamped(mut self) -> Self {
        self.body_preview = truncate_with_marker(&self.body, limits::BODY_PREVIEW_CHARS);
        self
    }
}

// ---------------------------------------------------------------------------
// delete_email / archive_email
// ---------------------------------------------------------------------------

/// One message listed in a batch preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Message id.
    pub id: String,
    /// Sender.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Short excerpt.
    pub snippet: String,
}

impl MessageSummary {
    /// Create a summary.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        subject: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            subject: subject.into(),
            snippet: snippet.into(),
        }
    }

    /// Placeholder for a message whose details could not be fetched.
    #[must_use]
    pub fn unavailable(id: impl Into<String>) -> Self {
        Self::new(id, "Unknown", "(failed to fetch)", "")
    }

    fn clamp(&mut self) {
        clip(&mut self.from, limits::FIELD_CHARS);
        clip(&mut self.subject, limits::SUBJECT_CHARS);
        clip(&mut self.snippet, limits::SNIPPET_CHARS);
    }
}

/// Preview of an operation on several messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBatchPreview {
    /// Every message the action targets.
    pub message_ids: Vec<String>,
    /// Number of targeted messages.
    pub message_count: usize,
    /// The first few targeted messages, for display.
    pub messages: Vec<MessageSummary>,
    /// Targeted messages not listed.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub additional_messages: usize,
    /// Warning shown with the preview.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if passes by reference
fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl MessageBatchPreview {
    /// Build from every targeted message; only the first few are listed.
    #[must_use]
    pub fn new(messages: Vec<MessageSummary>) -> Self {
        let ids = messages.iter().map(|m| m.id.clone()).collect();
        Self::for_ids(ids, messages)
    }

    /// Build from the targeted `message_ids`, listing `listed` for display.
    #[must_use]
    pub fn for_ids(message_ids: Vec<String>, listed: Vec<MessageSummary>) -> Self {
        Self {
            message_count: message_ids.len(),
            message_ids,
            messages: listed,
            additional_messages: 0,
            warning: None,
        }
        .clamped()
    }

    /// Attach a warning.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    fn validate(&self) -> PreviewResult<()> {
        if self.message_ids.is_empty() {
            return Err(PreviewError::Empty {
                field: "message_ids",
            });
        }
        check_count(
            "message_ids",
            self.message_ids.len(),
            limits::MAX_BATCH_MESSAGES,
        )?;
        for id in &self.message_ids {
            check_text("message_ids", id, limits::ID_CHARS)?;
        }
        if let Some(stray) = self
            .messages
            .iter()
            .find(|m| !self.message_ids.contains(&m.id))
        {
            return Err(PreviewError::UntargetedMessage {
                id: stray.id.clone(),
            });
        }
        Ok(())
    }

    fn clamped(mut self) -> Self {
        self.message_count = self.message_ids.len();
        self.messages.truncate(limits::MAX_LISTED_MESSAGES);
        for message in &mut self.messages {
            message.clamp();
        }
        self.additional_messages = self.message_count.saturating_sub(self.messages.len());
        if let Some(warning) = self.warning.as_mut() {
            clip(warning, limits::FIELD_CHARS);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// create_label
// ---------------------------------------------------------------------------

/// Whether a label appears in the label list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelListVisibility {
    /// Always shown.
    #[default]
    LabelShow,
    /// Hidden.
    LabelHide,
    /// Shown while it has unread messages.
    LabelShowIfUnread,
}

impl fmt::Display for LabelListVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LabelShow => "labelShow",
            Self::LabelHide => "labelHide",
            Self::LabelShowIfUnread => "labelShowIfUnread",
        })
    }
}

/// Whether messages show the label in the message list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageListVisibility {
    /// Shown.
    #[default]
    Show,
    /// Hidden.
    Hide,
}

/// Preview of a label about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPreview {
    /// Label name.
    pub name: String,
    /// Label list visibility.
    #[serde(default)]
    pub label_list_visibility: LabelListVisibility,
    /// Message list visibility.
    #[serde(default)]
    pub message_list_visibility: MessageListVisibility,
}

impl LabelPreview {
    /// A visible label with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label_list_visibility: LabelListVisibility::default(),
            message_list_visibility: MessageListVisibility::default(),
        }
    }

    fn validate(&self) -> PreviewResult<()> {
        check_text("name", &self.name, limits::LABEL_NAME_CHARS)
    }
}

// ---------------------------------------------------------------------------
// organize_labels
// ---------------------------------------------------------------------------

/// One change to an existing label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum LabelOperation {
    /// Rename a label.
    Rename {
        /// Label id.
        label_id: String,
        /// New name.
        new_name: String,
    },
    /// Delete a label.
    Delete {
        /// Label id.
        label_id: String,
    },
    /// Change label list visibility.
    UpdateVisibility {
        /// Label id.
        label_id: String,
        /// New visibility.
        visibility: LabelListVisibility,
    },
}

impl LabelOperation {
    /// The label the operation targets.
    #[must_use]
    pub fn label_id(&self) -> &str {
        match self {
            Self::Rename { label_id, .. }
            | Self::Delete { label_id }
            | Self::UpdateVisibility { label_id, .. } => label_id,
        }
    }

    /// Human-readable description for the preview.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Rename { label_id, new_name } => {
                format!("Rename label '{label_id}' to '{new_name}'")
            },
            Self::Delete { label_id } => format!("Delete label '{label_id}'"),
            Self::UpdateVisibility {
                label_id,
                visibility,
            } => format!("Update visibility of label '{label_id}' to '{visibility}'"),
        }
    }

    fn validate(&self) -> PreviewResult<()> {
        check_text("label_id", self.label_id(), limits::ID_CHARS)?;
        if let Self::Rename { new_name, .. } = self {
            check_text("new_name", new_name, limits::LABEL_NAME_CHARS)?;
        }
        Ok(())
    }
}

/// Preview of a batch of label changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOperationsPreview {
    /// Every operation that will run, in order.
    pub operations: Vec<LabelOperation>,
    /// Warning shown with the preview.
    pub warning: String,
}

impl LabelOperationsPreview {
    /// Build from the requested operations.
    #[must_use]
    pub fn new(operations: Vec<LabelOperation>) -> Self {
        Self {
            operations,
            warning: ORGANIZE_WARNING.to_string(),
        }
    }

    fn validate(&self) -> PreviewResult<()> {
        if self.operations.is_empty() {
            return Err(PreviewError::Empty {
                field: "operations",
            });
        }
        check_count(
            "operations",
            self.operations.len(),
            limits::MAX_LABEL_OPERATIONS,
        )?;
        self.operations.iter().try_for_each(LabelOperation::validate)
    }

    fn clamped(mut self) -> Self {
        clip(&mut self.warning, limits::FIELD_CHARS);
        self
    }
}

// ---------------------------------------------------------------------------
// unsubscribe
// ---------------------------------------------------------------------------

/// Preview of an unsubscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribePreview {
    /// Message carrying the unsubscribe header.
    pub message_id: String,
    /// Sender of that message.
    pub sender: String,
    /// Subject of that message.
    pub subject: String,
    /// The unsubscribe link.
    pub link: String,
    /// Whether the link is a `mailto:` address.
    pub is_mailto: bool,
    /// Warning shown with the preview.
    pub warning: String,
}

impl UnsubscribePreview {
    /// Build a preview; `is_mailto` is derived from the link.
    #[must_use]
    pub fn new(
        message_id: impl Into<String>,
        sender: impl Into<String>,
        subject: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        let link = link.into();
        let is_mailto = link
            .get(..7)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("mailto:"));
        Self {
            message_id: message_id.into(),
            sender: sender.into(),
            subject: subject.into(),
            link,
            is_mailto,
            warning: UNSUBSCRIBE_WARNING.to_string(),
        }
    }

    fn validate(&self) -> PreviewResult<()> {
        check_text("message_id", &self.message_id, limits::ID_CHARS)?;
        check_text("link", &self.link, limits::LINK_CHARS)
    }

    fn clamped(mut self) -> Self {
        clip(&mut self.sender, limits::FIELD_CHARS);
        clip(&mut self.subject, limits::SUBJECT_CHARS);
        clip(&mut self.warning, limits::FIELD_CHARS);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summaries(n: usize) -> Vec<MessageSummary> {
        (0..n)
            .map(|i| MessageSummary::new(format!("m{i}"), "a@b.c", "Hi", "x".repeat(300)))
            .collect()
    }

    fn recipients(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("u{i}@x.y")).collect()
    }

    #[test]
    fn test_kind_tags() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.as_str().to_string())
            );
        }
        assert!("drop_tables".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_variant_kinds() {
        assert_eq!(
            ActionPreview::from(EmailPreview::new("a@b.c", "s", "b")).kind(),
            ActionKind::SendEmail
        );
        assert_eq!(ActionPreview::delete_email(vec![]).kind(), ActionKind::DeleteEmail);
        assert_eq!(ActionPreview::archive_email(vec![]).kind(), ActionKind::ArchiveEmail);
        assert_eq!(ActionPreview::from(LabelPreview::new("x")).kind(), ActionKind::CreateLabel);
        assert_eq!(
            ActionPreview::from(LabelOperationsPreview::new(vec![])).kind(),
            ActionKind::OrganizeLabels
        );
        assert_eq!(
            ActionPreview::from(UnsubscribePreview::new("m", "s", "subj", "https://x")).kind(),
            ActionKind::Unsubscribe
        );
    }

    #[test]
    fn test_body_kept_whole_excerpt_truncated() {
        let body = "é".repeat(2000);
        let preview = EmailPreview::new("a@b.c", "subject", body.clone());
        assert_eq!(preview.body, body);
        assert_eq!(preview.body_preview.chars().count(), 503);
        assert!(preview.body_preview.ends_with("..."));

        let short = EmailPreview::new("a@b.c", "subject", "hello");
        assert_eq!(short.body_preview, "hello");
    }

    #[test]
    fn test_clamp_never_touches_execution_fields() {
        let preview = ActionPreview::from(
            EmailPreview::new("a@b.c", "Report", "b".repeat(2000)).with_cc(recipients(40)),
        );
        let once = preview.clone().clamped();
        let twice = once.clone().clamped();
        assert_eq!(once, twice);
        assert_eq!(once, preview);

        let ActionPreview::SendEmail(email) = once else {
            panic!("wrong variant");
        };
        assert_eq!(email.cc.len(), 40);
        assert_eq!(email.body.len(), 2000);
    }

    #[test]
    fn test_email_bounds_rejected_not_clipped() {
        let too_many = ActionPreview::from(
            EmailPreview::new("a@b.c", "s", "b").with_bcc(recipients(limits::MAX_RECIPIENTS + 1)),
        );
        assert_eq!(
            too_many.validate().unwrap_err(),
            PreviewError::TooMany {
                field: "bcc",
                len: 51,
                max: limits::MAX_RECIPIENTS
            }
        );

        let long_subject = ActionPreview::from(EmailPreview::new("a@b.c", "s".repeat(300), "b"));
        assert!(matches!(
            long_subject.validate(),
            Err(PreviewError::TooLong {
                field: "subject",
                ..
            })
        ));

        let no_recipient = ActionPreview::from(EmailPreview::new("", "s", "b"));
        assert_eq!(
            no_recipient.validate().unwrap_err(),
            PreviewError::Empty { field: "to" }
        );

        let ok = ActionPreview::from(
            EmailPreview::new("a@b.c", "s", "b".repeat(10_000))
                .with_cc(recipients(limits::MAX_RECIPIENTS))
                .in_thread("thread-1"),
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_batch_lists_first_five_targets_all() {
        let ActionPreview::DeleteEmail(batch) = ActionPreview::delete_email(summaries(12)) else {
            panic!("wrong variant");
        };
        assert_eq!(batch.message_ids.len(), 12);
        assert_eq!(batch.message_ids[11], "m11");
        assert_eq!(batch.message_count, 12);
        assert_eq!(batch.messages.len(), 5);
        assert_eq!(batch.additional_messages, 7);
        assert_eq!(batch.messages[0].snippet.len(), limits::SNIPPET_CHARS);
        assert_eq!(batch.warning.as_deref(), Some(DELETE_WARNING));
    }

    #[test]
    fn test_batch_for_ids_lists_subset() {
        let ids: Vec<String> = (0..40).map(|i| format!("m{i}")).collect();
        let batch = MessageBatchPreview::for_ids(ids.clone(), summaries(3));
        assert_eq!(batch.message_ids, ids);
        assert_eq!(batch.message_count, 40);
        assert_eq!(batch.additional_messages, 37);
        assert!(ActionPreview::ArchiveEmail(batch).validate().is_ok());
    }

    #[test]
    fn test_batch_validation() {
        assert_eq!(
            ActionPreview::delete_email(vec![]).validate().unwrap_err(),
            PreviewError::Empty {
                field: "message_ids"
            }
        );

        let stray = MessageBatchPreview::for_ids(vec!["m0".into()], summaries(2));
        assert_eq!(
            ActionPreview::ArchiveEmail(stray).validate().unwrap_err(),
            PreviewError::UntargetedMessage { id: "m1".into() }
        );

        let ids = (0..=limits::MAX_BATCH_MESSAGES).map(|i| format!("m{i}")).collect();
        let oversized = MessageBatchPreview::for_ids(ids, vec![]);
        assert!(matches!(
            ActionPreview::DeleteEmail(oversized).validate(),
            Err(PreviewError::TooMany {
                field: "message_ids",
                ..
            })
        ));
    }

    #[test]
    fn test_archive_has_no_warning() {
        let ActionPreview::ArchiveEmail(batch) = ActionPreview::archive_email(summaries(2)) else {
            panic!("wrong variant");
        };
        assert_eq!(batch.message_count, 2);
        assert_eq!(batch.additional_messages, 0);
        assert!(batch.warning.is_none());
    }

    #[test]
    fn test_label_bounds() {
        let long = ActionPreview::from(LabelPreview::new("n".repeat(226)));
        assert!(matches!(
            long.validate(),
            Err(PreviewError::TooLong { field: "name", .. })
        ));
        let ActionPreview::CreateLabel(kept) = long.clamped() else {
            panic!("wrong variant");
        };
        assert_eq!(kept.name.len(), 226);
        assert!(ActionPreview::from(LabelPreview::new("Receipts")).validate().is_ok());
    }

    #[test]
    fn test_label_operations_rejected_over_limit() {
        let ops = |n: usize| -> Vec<LabelOperation> {
            (0..n)
                .map(|i| LabelOperation::Delete {
                    label_id: format!("Label_{i}"),
                })
                .collect()
        };
        let over = ActionPreview::from(LabelOperationsPreview::new(ops(30)));
        assert!(matches!(
            over.validate(),
            Err(PreviewError::TooMany {
                field: "operations",
                len: 30,
                ..
            })
        ));
        let ActionPreview::OrganizeLabels(kept) = over.clamped() else {
            panic!("wrong variant");
        };
        assert_eq!(kept.operations.len(), 30);

        let full = ActionPreview::from(LabelOperationsPreview::new(ops(
            limits::MAX_LABEL_OPERATIONS,
        )));
        assert!(full.validate().is_ok());
    }

    #[test]
    fn test_label_operation_descriptions() {
        let rename = LabelOperation::Rename {
            label_id: "Label_1".into(),
            new_name: "Receipts".into(),
        };
        assert_eq!(rename.describe(), "Rename label 'Label_1' to 'Receipts'");

        let vis = LabelOperation::UpdateVisibility {
            label_id: "Label_2".into(),
            visibility: LabelListVisibility::LabelShowIfUnread,
        };
        assert_eq!(
            vis.describe(),
            "Update visibility of label 'Label_2' to 'labelShowIfUnread'"
        );
        assert_eq!(vis.label_id(), "Label_2");
    }

    #[test]
    fn test_unsubscribe_detects_mailto() {
        assert!(UnsubscribePreview::new("m", "s", "x", "MAILTO:unsub@list.example").is_mailto);
        assert!(!UnsubscribePreview::new("m", "s", "x", "https://list.example/u").is_mailto);
    }

    #[test]
    fn test_unsubscribe_link_bounded() {
        let long = ActionPreview::from(UnsubscribePreview::new(
            "m",
            "s".repeat(1000),
            "x",
            format!("https://{}", "a".repeat(5000)),
        ));
        assert!(matches!(
            long.validate(),
            Err(PreviewError::TooLong { field: "link", .. })
        ));

        let ActionPreview::Unsubscribe(clamped) = long.clamped() else {
            panic!("wrong variant");
        };
        assert_eq!(clamped.sender.len(), limits::FIELD_CHARS);
        assert_eq!(clamped.link.len(), 5008);
    }

    #[test]
    fn test_serialized_shape() {
        let preview = ActionPreview::from(EmailPreview::new("a@b.c", "Hello", "Body"));
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["action"], "send_email");
        assert_eq!(json["to"][0], "a@b.c");
        assert_eq!(json["body"], "Body");
        assert_eq!(json["body_preview"], "Body");
        assert!(json.get("cc").is_none());

        let back: ActionPreview = serde_json::from_value(json).unwrap();
        assert_eq!(back, preview);
    }
}

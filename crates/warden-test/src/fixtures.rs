//! Test fixtures for common types.

use warden_approval::{
    ActionPreview, EmailPreview, LabelPreview, MessageSummary, UnsubscribePreview,
};
use warden_core::PrincipalId;
use warden_crypto::{Keyring, SealingKey};

/// Create the principal most tests act as.
#[must_use]
pub fn test_principal() -> PrincipalId {
    PrincipalId::new("alice@example.com")
}

/// Create a principal with a specific name.
#[must_use]
pub fn test_principal_named(name: &str) -> PrincipalId {
    PrincipalId::new(name)
}

/// Create a `send_email` preview.
#[must_use]
pub fn test_email_preview() -> ActionPreview {
    EmailPreview::new("bob@example.com", "Quarterly report", "Numbers attached.").into()
}

/// Create a `delete_email` preview covering `count` messages.
#[must_use]
pub fn test_delete_preview(count: usize) -> ActionPreview {
    let messages = (0..count)
        .map(|i| {
            MessageSummary::new(
                format!("msg-{i}"),
                "news@example.com",
                format!("Newsletter #{i}"),
                "This week in review",
            )
        })
        .collect();
    ActionPreview::delete_email(messages)
}

/// Create a `create_label` preview.
#[must_use]
pub fn test_label_preview() -> ActionPreview {
    LabelPreview::new("Receipts").into()
}

/// Create an `unsubscribe` preview with an https link.
#[must_use]
pub fn test_unsubscribe_preview() -> ActionPreview {
    UnsubscribePreview::new(
        "msg-42",
        "deals@example.com",
        "Weekend sale",
        "https://example.com/unsubscribe?u=42",
    )
    .into()
}

/// Deterministic sealing key derived from `seed`.
///
/// # Panics
///
/// Panics if the key cannot be constructed.
#[must_use]
pub fn test_sealing_key(seed: u8) -> SealingKey {
    SealingKey::from_bytes(&[seed; 32]).expect("32-byte key is valid")
}

/// Keyring with `test_sealing_key(1)` as primary.
#[must_use]
pub fn test_keyring() -> Keyring {
    Keyring::new(test_sealing_key(1))
}

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_test::prelude::*;` to import all essential test helpers.

// Fixtures
pub use crate::{
    test_delete_preview, test_email_preview, test_keyring, test_label_preview, test_principal,
    test_principal_named, test_sealing_key, test_unsubscribe_preview,
};

// Harnesses
pub use crate::{GateHarness, TestVault, setup_test_logging};

// Mocks
pub use crate::RecordingExecutor;

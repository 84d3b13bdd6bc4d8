//! Mock executors for testing the safety gate.

use std::io;
use std::sync::{Arc, Mutex};

use warden_approval::ActionPreview;

/// Executor that records every preview it is handed.
///
/// Clones share the same record, so a test can hand one clone to the gate
/// and inspect another afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    seen: Arc<Mutex<Vec<ActionPreview>>>,
}

impl RecordingExecutor {
    /// Create an executor with an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A closure for `SafetyGate::confirm` that records the preview and
    /// succeeds with the action's tag.
    pub fn executor(&self) -> impl FnOnce(ActionPreview) -> Result<String, io::Error> + use<> {
        let seen = Arc::clone(&self.seen);
        move |preview| {
            let tag = preview.kind().to_string();
            lock(&seen).push(preview);
            Ok(tag)
        }
    }

    /// A closure that records the preview and then fails.
    pub fn failing(
        &self,
        message: &str,
    ) -> impl FnOnce(ActionPreview) -> Result<String, io::Error> + use<> {
        let seen = Arc::clone(&self.seen);
        let message = message.to_owned();
        move |preview| {
            lock(&seen).push(preview);
            Err(io::Error::other(message))
        }
    }

    /// Number of times any closure from this executor ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        lock(&self.seen).len()
    }

    /// Previews handed to the executor, oldest first.
    #[must_use]
    pub fn seen(&self) -> Vec<ActionPreview> {
        lock(&self.seen).clone()
    }
}

fn lock(seen: &Mutex<Vec<ActionPreview>>) -> std::sync::MutexGuard<'_, Vec<ActionPreview>> {
    seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

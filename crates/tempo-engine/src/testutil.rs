//! Shared test fixtures for tracker and loop tests.

use std::sync::Arc;

use parking_lot::Mutex;

use tempo_core::{Notifier, Permission};
use tempo_store::{Database, SnapshotRepo};

/// Notifier that records every dispatch for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Notifier for RecordingNotifier {
    fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        self.sent.lock().push((title.to_string(), body.to_string()));
    }
}

pub fn in_memory_repo() -> SnapshotRepo {
    SnapshotRepo::new(Database::in_memory().unwrap())
}

pub fn recording_notifier() -> Arc<RecordingNotifier> {
    Arc::new(RecordingNotifier::default())
}

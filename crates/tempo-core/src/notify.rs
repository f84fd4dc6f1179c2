use serde::{Deserialize, Serialize};

/// Outcome of asking the notification backend for permission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
    Unsupported,
}

/// Trait implemented by notification backends (desktop, terminal, test
/// mocks). Permission state belongs to the backend; the tracker only calls
/// `notify` and carries on regardless of delivery.
pub trait Notifier: Send + Sync {
    fn request_permission(&self) -> Permission;

    /// Deliver a notification. Must not block and must not fail loudly;
    /// an undeliverable notification is silently dropped.
    fn notify(&self, title: &str, body: &str);
}

/// Backend that discards everything. Used where no delivery channel exists.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn request_permission(&self) -> Permission {
        Permission::Unsupported
    }

    fn notify(&self, _title: &str, _body: &str) {}
}

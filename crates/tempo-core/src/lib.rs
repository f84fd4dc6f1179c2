pub mod events;
pub mod ids;
pub mod notify;
pub mod task;

pub use events::TrackerEvent;
pub use ids::TaskId;
pub use notify::{Notifier, NullNotifier, Permission};
pub use task::{format_minutes, Task, TaskCategory, TaskDraft};

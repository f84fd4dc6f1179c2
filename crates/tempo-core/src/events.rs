use serde::{Deserialize, Serialize};

use crate::ids::TaskId;
use crate::task::format_minutes;

/// Advisory tracker events, broadcast to whatever frontend is attached.
/// These carry the human-readable confirmations the UI shows; dropping one
/// never affects tracker state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackerEvent {
    #[serde(rename = "task_added")]
    TaskAdded {
        id: TaskId,
        title: String,
        category: String,
    },

    #[serde(rename = "task_completed")]
    TaskCompleted { id: TaskId, title: String },

    #[serde(rename = "task_reopened")]
    TaskReopened { id: TaskId, title: String },

    #[serde(rename = "task_deleted")]
    TaskDeleted { id: TaskId, title: String },

    #[serde(rename = "timer_started")]
    TimerStarted { id: TaskId, title: String },

    #[serde(rename = "timer_stopped")]
    TimerStopped {
        id: TaskId,
        title: String,
        banked_minutes: u64,
    },

    /// Display-refresh pulse while a timer runs; carries the running total
    /// so a frontend can repaint without recomputing from `started_at`.
    #[serde(rename = "timer_tick")]
    TimerTick { id: TaskId, elapsed_minutes: u64 },
}

impl TrackerEvent {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::TaskAdded { id, .. }
            | Self::TaskCompleted { id, .. }
            | Self::TaskReopened { id, .. }
            | Self::TaskDeleted { id, .. }
            | Self::TimerStarted { id, .. }
            | Self::TimerStopped { id, .. }
            | Self::TimerTick { id, .. } => id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TaskAdded { .. } => "task_added",
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskReopened { .. } => "task_reopened",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::TimerStarted { .. } => "timer_started",
            Self::TimerStopped { .. } => "timer_stopped",
            Self::TimerTick { .. } => "timer_tick",
        }
    }

    /// Toast-equivalent copy for the event.
    pub fn message(&self) -> String {
        match self {
            Self::TaskAdded { title, category, .. } => {
                format!("{title} has been added to your {category} tasks.")
            }
            Self::TaskCompleted { title, .. } => {
                format!("Great job completing \"{title}\"!")
            }
            Self::TaskReopened { title, .. } => {
                format!("\"{title}\" has been reopened.")
            }
            Self::TaskDeleted { title, .. } => {
                format!("\"{title}\" has been removed.")
            }
            Self::TimerStarted { title, .. } => {
                format!("Started tracking time for \"{title}\"")
            }
            Self::TimerStopped {
                title,
                banked_minutes,
                ..
            } => format!(
                "Stopped tracking time for \"{title}\" ({})",
                format_minutes(*banked_minutes)
            ),
            Self::TimerTick {
                id,
                elapsed_minutes,
            } => format!("{id}: {} elapsed", format_minutes(*elapsed_minutes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_tagged_roundtrip() {
        let event = TrackerEvent::TimerStopped {
            id: TaskId::from_raw("task_1"),
            title: "Write report".into(),
            banked_minutes: 65,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"timer_stopped\""));
        let parsed: TrackerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), "timer_stopped");
        assert_eq!(parsed.task_id().as_str(), "task_1");
    }

    #[test]
    fn messages_name_the_task() {
        let added = TrackerEvent::TaskAdded {
            id: TaskId::new(),
            title: "Read paper".into(),
            category: "study".into(),
        };
        assert_eq!(
            added.message(),
            "Read paper has been added to your study tasks."
        );

        let stopped = TrackerEvent::TimerStopped {
            id: TaskId::new(),
            title: "Write report".into(),
            banked_minutes: 65,
        };
        assert_eq!(
            stopped.message(),
            "Stopped tracking time for \"Write report\" (1h 5m)"
        );
    }
}

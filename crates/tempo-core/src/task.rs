use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::TaskId;

/// Closed set of task categories. Statistics and tips match exhaustively on
/// this, so adding a variant is a deliberate schema change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Work,
    Study,
    Leisure,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 3] = [Self::Work, Self::Study, Self::Leisure];
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Work => write!(f, "work"),
            Self::Study => write!(f, "study"),
            Self::Leisure => write!(f, "leisure"),
        }
    }
}

impl std::str::FromStr for TaskCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Self::Work),
            "study" => Ok(Self::Study),
            "leisure" => Ok(Self::Leisure),
            other => Err(format!("unknown task category: {other}")),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A tracked task. Owned exclusively by the tracker; everything else sees
/// borrows or serialized snapshots.
///
/// Pairing invariants: `completed` holds exactly when `completed_at` is
/// set, and `is_active` exactly when `started_at` is set. At most one task
/// in a collection is active at a time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Whole minutes banked across finished timer sessions.
    pub time_spent: u64,
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    // The two fields below postdate the first snapshot format; older
    // snapshots deserialize with the defaults.
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default)]
    pub reminder_sent: bool,
}

impl Task {
    /// Build a fresh task from a draft. Title validation is the caller's
    /// responsibility.
    pub fn from_draft(draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::new(),
            title: draft.title,
            description: draft.description,
            category: draft.category,
            completed: false,
            completed_at: None,
            created_at: now,
            time_spent: 0,
            is_active: false,
            started_at: None,
            due_date: draft.due_date,
            notifications_enabled: draft.notifications_enabled,
            reminder_sent: false,
        }
    }
}

/// Creation parameters for a task.
#[derive(Clone, Debug)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub due_date: Option<DateTime<Utc>>,
    pub notifications_enabled: bool,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, category: TaskCategory) -> Self {
        Self {
            title: title.into(),
            description: None,
            category,
            due_date: None,
            notifications_enabled: true,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }
}

/// Render a minute count the way the UI shows session lengths:
/// `2h 5m` past the hour mark, plain `45m` below it.
pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

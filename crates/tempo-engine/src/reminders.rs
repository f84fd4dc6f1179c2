//! Due-date reminder rules: when a task qualifies and what the
//! notification says. The scan itself lives on the tracker; everything
//! here is pure so the edge cases test without a clock.

use chrono::{DateTime, Utc};

use tempo_core::Task;

/// Tasks due within this many whole hours (or overdue) get a reminder.
pub const DUE_SOON_HOURS: i64 = 2;

/// Whole hours until the due date, floored toward negative infinity so
/// anything overdue is strictly negative.
pub fn hours_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due - now).num_seconds().div_euclid(3600)
}

/// Whether the scan should dispatch a reminder for this task right now.
/// Completed tasks, muted tasks, tasks without a due date, and tasks whose
/// reminder already went out are all skipped.
pub fn wants_reminder(task: &Task, now: DateTime<Utc>) -> bool {
    if task.completed || !task.notifications_enabled || task.reminder_sent {
        return false;
    }
    match task.due_date {
        Some(due) => hours_until(due, now) <= DUE_SOON_HOURS,
        None => false,
    }
}

/// Reminder body for a task `hours` whole hours from its due date.
pub fn reminder_text(title: &str, hours: i64) -> String {
    if hours < 0 {
        format!("Task \"{title}\" is overdue!")
    } else if hours == 0 {
        format!("Task \"{title}\" is due now!")
    } else {
        let plural = if hours == 1 { "" } else { "s" };
        format!("Task \"{title}\" is due in {hours} hour{plural}!")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempo_core::{Task, TaskCategory, TaskDraft};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
    }

    #[test]
    fn hours_floor_toward_negative_infinity() {
        let now = at(12, 0);
        assert_eq!(hours_until(at(14, 0), now), 2);
        assert_eq!(hours_until(at(13, 59), now), 1);
        assert_eq!(hours_until(at(12, 30), now), 0);
        assert_eq!(hours_until(at(12, 0), now), 0);
        // 30 minutes overdue is already "-1 hours", not 0
        assert_eq!(hours_until(at(11, 30), now), -1);
        assert_eq!(hours_until(now - Duration::hours(5), now), -5);
    }

    #[test]
    fn text_selection_by_proximity() {
        assert_eq!(reminder_text("Report", -3), "Task \"Report\" is overdue!");
        assert_eq!(reminder_text("Report", 0), "Task \"Report\" is due now!");
        assert_eq!(reminder_text("Report", 1), "Task \"Report\" is due in 1 hour!");
        assert_eq!(reminder_text("Report", 2), "Task \"Report\" is due in 2 hours!");
    }

    #[test]
    fn qualifying_rules() {
        let now = at(12, 0);
        let base = Task::from_draft(
            TaskDraft::new("Report", TaskCategory::Work).due(at(13, 0)),
            now,
        );
        assert!(wants_reminder(&base, now));

        let mut completed = base.clone();
        completed.completed = true;
        assert!(!wants_reminder(&completed, now));

        let mut muted = base.clone();
        muted.notifications_enabled = false;
        assert!(!wants_reminder(&muted, now));

        let mut sent = base.clone();
        sent.reminder_sent = true;
        assert!(!wants_reminder(&sent, now));

        let mut undated = base.clone();
        undated.due_date = None;
        assert!(!wants_reminder(&undated, now));

        let mut far_out = base;
        far_out.due_date = Some(at(15, 1));
        assert!(!wants_reminder(&far_out, now));
    }
}

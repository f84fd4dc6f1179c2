use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use tempo_core::{format_minutes, Notifier, Permission, Task, TaskDraft, TaskId, TrackerEvent};
use tempo_store::SnapshotRepo;

use crate::error::EngineError;
use crate::reminders;
use crate::stats::ProductivityStats;
use crate::tips;

/// Tracker shared between the command surface and the background loops.
pub type SharedTracker = Arc<Mutex<Tracker>>;

/// Owner of the task collection and the single active timer.
///
/// All mutation goes through the command methods below; each one applies
/// its change atomically, persists the collection best-effort, and emits an
/// advisory event. Timer commands exist in `_at(now)` form so callers that
/// need determinism (tests, replays) can supply the clock.
pub struct Tracker {
    tasks: Vec<Task>,
    active_timer: Option<TaskId>,
    snapshots: SnapshotRepo,
    notifier: Arc<dyn Notifier>,
    event_tx: broadcast::Sender<TrackerEvent>,
}

impl Tracker {
    /// Restore the tracker from the persisted snapshot. The active-timer
    /// reference is re-derived from the task flags; a snapshot carrying
    /// more than one active task is repaired, first (most recent) one wins.
    pub fn load(
        snapshots: SnapshotRepo,
        notifier: Arc<dyn Notifier>,
        event_tx: broadcast::Sender<TrackerEvent>,
    ) -> Result<Self, EngineError> {
        let mut tasks = snapshots.load_tasks()?;

        let mut active_timer = None;
        let mut repaired = false;
        for task in &mut tasks {
            if task.is_active && task.started_at.is_none() {
                task.is_active = false;
                repaired = true;
            }
            if task.is_active {
                if active_timer.is_none() {
                    active_timer = Some(task.id.clone());
                } else {
                    task.is_active = false;
                    task.started_at = None;
                    repaired = true;
                }
            } else if task.started_at.is_some() {
                task.started_at = None;
                repaired = true;
            }
        }

        let tracker = Self {
            tasks,
            active_timer,
            snapshots,
            notifier,
            event_tx,
        };
        if repaired {
            warn!("snapshot carried inconsistent timer state, repaired");
            tracker.persist();
        }
        Ok(tracker)
    }

    /// Ask the notification backend for permission. The answer is
    /// informational; commands never check it.
    pub fn request_permission(&self) -> Permission {
        self.notifier.request_permission()
    }

    // ── Task store commands ──────────────────────────────────────────────

    /// Create a task from a draft and insert it at the head of the
    /// collection (most-recent-first ordering).
    #[instrument(skip(self, draft))]
    pub fn add_task(&mut self, draft: TaskDraft) -> Result<TaskId, EngineError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(EngineError::EmptyTitle);
        }
        let draft = TaskDraft {
            title: title.to_string(),
            ..draft
        };

        let task = Task::from_draft(draft, Utc::now());
        let id = task.id.clone();
        let event = TrackerEvent::TaskAdded {
            id: id.clone(),
            title: task.title.clone(),
            category: task.category.to_string(),
        };
        self.tasks.insert(0, task);
        self.emit(event);
        self.persist();
        Ok(id)
    }

    /// Flip a task between open and completed. Completing (or reopening)
    /// always discards any running timer state on the task; a partial
    /// session is abandoned, not banked.
    #[instrument(skip(self), fields(id = %id))]
    pub fn toggle_task(&mut self, id: &TaskId) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            return false;
        };

        task.completed = !task.completed;
        task.completed_at = task.completed.then(Utc::now);
        task.is_active = false;
        task.started_at = None;
        if self.active_timer.as_ref() == Some(id) {
            self.active_timer = None;
        }

        let event = if task.completed {
            TrackerEvent::TaskCompleted {
                id: id.clone(),
                title: task.title.clone(),
            }
        } else {
            TrackerEvent::TaskReopened {
                id: id.clone(),
                title: task.title.clone(),
            }
        };
        self.emit(event);
        self.persist();
        true
    }

    /// Remove a task. Unknown ids are a silent no-op, so re-issuing a
    /// delete is always safe.
    #[instrument(skip(self), fields(id = %id))]
    pub fn delete_task(&mut self, id: &TaskId) -> bool {
        let Some(index) = self.tasks.iter().position(|t| &t.id == id) else {
            return false;
        };

        if self.active_timer.as_ref() == Some(id) {
            self.active_timer = None;
        }
        let task = self.tasks.remove(index);
        self.emit(TrackerEvent::TaskDeleted {
            id: task.id,
            title: task.title,
        });
        self.persist();
        true
    }

    /// Toggle reminder delivery for a task. Changing the setting re-arms
    /// the reminder: `reminder_sent` resets in the same command.
    #[instrument(skip(self), fields(id = %id))]
    pub fn set_notifications(&mut self, id: &TaskId, enabled: bool) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            return false;
        };
        task.notifications_enabled = enabled;
        task.reminder_sent = false;
        self.persist();
        true
    }

    // ── Timer commands ───────────────────────────────────────────────────

    pub fn start_timer(&mut self, id: &TaskId) -> bool {
        self.start_timer_at(id, Utc::now())
    }

    /// Start timing a task. Completed and unknown tasks are a full no-op,
    /// leaving any running timer untouched. Otherwise a timer running on
    /// another task is cleared first, dropping its partial session.
    #[instrument(skip(self), fields(id = %id))]
    pub fn start_timer_at(&mut self, id: &TaskId, now: DateTime<Utc>) -> bool {
        let Some(index) = self.tasks.iter().position(|t| &t.id == id) else {
            return false;
        };
        if self.tasks[index].completed {
            return false;
        }

        if let Some(prev) = self.active_timer.take() {
            if let Some(task) = self.tasks.iter_mut().find(|t| t.id == prev) {
                task.is_active = false;
                task.started_at = None;
            }
        }

        let task = &mut self.tasks[index];
        task.is_active = true;
        task.started_at = Some(now);
        let title = task.title.clone();
        self.active_timer = Some(id.clone());

        self.emit(TrackerEvent::TimerStarted {
            id: id.clone(),
            title,
        });
        self.persist();
        true
    }

    pub fn stop_timer(&mut self) -> Option<u64> {
        self.stop_timer_at(Utc::now())
    }

    /// Stop the running timer and bank the elapsed whole minutes. This is
    /// the only place `time_spent` accrues. Returns the banked minutes, or
    /// None when no timer was running.
    #[instrument(skip(self))]
    pub fn stop_timer_at(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let id = self.active_timer.take()?;
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;

        let minutes = match task.started_at.take() {
            Some(started) => ((now - started).num_seconds().max(0) / 60) as u64,
            None => 0,
        };
        task.is_active = false;
        task.time_spent += minutes;
        let title = task.title.clone();

        if minutes > 0 {
            self.notifier.notify(
                "Timer Completed",
                &format!(
                    "You worked on \"{title}\" for {}. Great job!",
                    format_minutes(minutes)
                ),
            );
        }
        self.emit(TrackerEvent::TimerStopped {
            id,
            title,
            banked_minutes: minutes,
        });
        self.persist();
        Some(minutes)
    }

    /// Display-refresh pulse: report how long the active session has been
    /// running, without mutating anything. Driven by the accrual tick loop.
    pub fn tick_at(&self, now: DateTime<Utc>) -> Option<u64> {
        let id = self.active_timer.as_ref()?;
        let task = self.tasks.iter().find(|t| t.id == *id)?;
        let started = task.started_at?;
        let minutes = ((now - started).num_seconds().max(0) / 60) as u64;
        self.emit(TrackerEvent::TimerTick {
            id: id.clone(),
            elapsed_minutes: minutes,
        });
        Some(minutes)
    }

    // ── Reminder scan ────────────────────────────────────────────────────

    pub fn run_reminder_scan(&mut self) -> usize {
        self.run_reminder_scan_at(Utc::now())
    }

    /// Scan all tasks and dispatch due-date reminders. Each dispatch marks
    /// the task's `reminder_sent` in the same pass, so a rescan without an
    /// intervening settings change never re-notifies.
    #[instrument(skip(self))]
    pub fn run_reminder_scan_at(&mut self, now: DateTime<Utc>) -> usize {
        let mut dispatched = 0;
        for task in &mut self.tasks {
            if !reminders::wants_reminder(task, now) {
                continue;
            }
            let Some(due) = task.due_date else {
                continue;
            };
            let hours = reminders::hours_until(due, now);
            self.notifier.notify(
                "Task Reminder",
                &reminders::reminder_text(&task.title, hours),
            );
            task.reminder_sent = true;
            dispatched += 1;
        }

        if dispatched > 0 {
            debug!(dispatched, "reminder scan dispatched");
            self.persist();
        }
        dispatched
    }

    // ── Derived views ────────────────────────────────────────────────────

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn active_task_id(&self) -> Option<&TaskId> {
        self.active_timer.as_ref()
    }

    pub fn stats(&self) -> ProductivityStats {
        ProductivityStats::compute(&self.tasks)
    }

    pub fn tips(&self) -> Vec<String> {
        tips::productivity_tips(&self.stats(), &self.tasks)
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Persist the collection. Best-effort: a failed write is logged and
    /// the in-memory mutation stands.
    fn persist(&self) {
        if let Err(e) = self.snapshots.save_tasks(&self.tasks) {
            warn!(error = %e, "failed to persist task snapshot");
        }
    }

    fn emit(&self, event: TrackerEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempo_core::TaskCategory;

    use crate::testutil::{in_memory_repo, recording_notifier, RecordingNotifier};

    fn tracker() -> (Tracker, Arc<RecordingNotifier>, broadcast::Receiver<TrackerEvent>) {
        let notifier = recording_notifier();
        let (tx, rx) = broadcast::channel(64);
        let tracker = Tracker::load(in_memory_repo(), notifier.clone(), tx).unwrap();
        (tracker, notifier, rx)
    }

    fn drain(rx: &mut broadcast::Receiver<TrackerEvent>) -> Vec<&'static str> {
        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.event_type());
        }
        types
    }

    #[test]
    fn add_validates_title() {
        let (mut tracker, _, _rx) = tracker();
        let err = tracker
            .add_task(TaskDraft::new("   ", TaskCategory::Work))
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyTitle));
        assert!(tracker.tasks().is_empty());
    }

    #[test]
    fn add_trims_and_inserts_at_head() {
        let (mut tracker, _, mut rx) = tracker();
        tracker
            .add_task(TaskDraft::new("  First  ", TaskCategory::Work))
            .unwrap();
        tracker
            .add_task(TaskDraft::new("Second", TaskCategory::Study))
            .unwrap();

        assert_eq!(tracker.tasks()[0].title, "Second");
        assert_eq!(tracker.tasks()[1].title, "First");
        assert_eq!(drain(&mut rx), vec!["task_added", "task_added"]);
    }

    #[test]
    fn toggle_sets_and_clears_completed_at() {
        let (mut tracker, _, mut rx) = tracker();
        let id = tracker
            .add_task(TaskDraft::new("Report", TaskCategory::Work))
            .unwrap();

        assert!(tracker.toggle_task(&id));
        assert!(tracker.tasks()[0].completed);
        assert!(tracker.tasks()[0].completed_at.is_some());

        assert!(tracker.toggle_task(&id));
        assert!(!tracker.tasks()[0].completed);
        assert!(tracker.tasks()[0].completed_at.is_none());

        assert_eq!(
            drain(&mut rx),
            vec!["task_added", "task_completed", "task_reopened"]
        );
    }

    #[test]
    fn toggle_unknown_id_is_a_no_op() {
        let (mut tracker, _, _rx) = tracker();
        assert!(!tracker.toggle_task(&TaskId::from_raw("task_missing")));
    }

    #[test]
    fn completing_the_timed_task_discards_the_session() {
        let (mut tracker, _, _rx) = tracker();
        let id = tracker
            .add_task(TaskDraft::new("Report", TaskCategory::Work))
            .unwrap();
        let start = Utc::now();
        assert!(tracker.start_timer_at(&id, start));

        tracker.toggle_task(&id);
        assert!(tracker.active_task_id().is_none());
        assert!(!tracker.tasks()[0].is_active);
        assert!(tracker.tasks()[0].started_at.is_none());
        // The partial session was abandoned, not banked.
        assert_eq!(tracker.tasks()[0].time_spent, 0);
        // The timer is gone, so a stop is a no-op.
        assert_eq!(tracker.stop_timer_at(start + Duration::minutes(10)), None);
    }

    #[test]
    fn delete_clears_active_reference() {
        let (mut tracker, _, mut rx) = tracker();
        let id = tracker
            .add_task(TaskDraft::new("Report", TaskCategory::Work))
            .unwrap();
        tracker.start_timer(&id);

        assert!(tracker.delete_task(&id));
        assert!(tracker.tasks().is_empty());
        assert!(tracker.active_task_id().is_none());
        assert_eq!(tracker.stop_timer(), None);
        assert_eq!(
            drain(&mut rx),
            vec!["task_added", "timer_started", "task_deleted"]
        );

        // Second delete of the same id: silent no-op.
        assert!(!tracker.delete_task(&id));
    }

    #[test]
    fn at_most_one_active_timer() {
        let (mut tracker, _, _rx) = tracker();
        let a = tracker
            .add_task(TaskDraft::new("A", TaskCategory::Work))
            .unwrap();
        let b = tracker
            .add_task(TaskDraft::new("B", TaskCategory::Study))
            .unwrap();

        let t0 = Utc::now();
        assert!(tracker.start_timer_at(&a, t0));
        assert!(tracker.start_timer_at(&b, t0 + Duration::minutes(5)));

        let active: Vec<_> = tracker.tasks().iter().filter(|t| t.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b);
        assert_eq!(tracker.active_task_id(), Some(&b));
    }

    #[test]
    fn switching_tasks_abandons_partial_time() {
        let (mut tracker, _, _rx) = tracker();
        let a = tracker
            .add_task(TaskDraft::new("A", TaskCategory::Work))
            .unwrap();
        let b = tracker
            .add_task(TaskDraft::new("B", TaskCategory::Study))
            .unwrap();

        let t0 = Utc::now();
        tracker.start_timer_at(&a, t0);
        // 7 minutes in, switch to B without stopping.
        tracker.start_timer_at(&b, t0 + Duration::minutes(7));

        let task_a = tracker.tasks().iter().find(|t| t.id == a).unwrap();
        assert_eq!(task_a.time_spent, 0);
        assert!(!task_a.is_active);
        assert!(task_a.started_at.is_none());
    }

    #[test]
    fn start_on_completed_task_is_a_full_no_op() {
        let (mut tracker, _, _rx) = tracker();
        let a = tracker
            .add_task(TaskDraft::new("A", TaskCategory::Work))
            .unwrap();
        let b = tracker
            .add_task(TaskDraft::new("B", TaskCategory::Study))
            .unwrap();
        tracker.toggle_task(&b);

        tracker.start_timer(&a);
        assert!(!tracker.start_timer(&b));
        // A's timer keeps running.
        assert_eq!(tracker.active_task_id(), Some(&a));
    }

    #[test]
    fn stop_banks_floored_minutes_and_notifies() {
        let (mut tracker, notifier, mut rx) = tracker();
        let id = tracker
            .add_task(TaskDraft::new("Write report", TaskCategory::Work))
            .unwrap();

        let t0 = Utc::now();
        tracker.start_timer_at(&id, t0);
        let banked = tracker.stop_timer_at(t0 + Duration::seconds(90));

        assert_eq!(banked, Some(1));
        assert_eq!(tracker.tasks()[0].time_spent, 1);
        assert!(tracker.active_task_id().is_none());

        assert_eq!(notifier.titles(), vec!["Timer Completed"]);
        assert!(notifier.bodies()[0].contains("Write report"));
        assert!(notifier.bodies()[0].contains("1m"));
        assert_eq!(
            drain(&mut rx),
            vec!["task_added", "timer_started", "timer_stopped"]
        );
    }

    #[test]
    fn sub_minute_stop_banks_nothing_and_stays_quiet() {
        let (mut tracker, notifier, _rx) = tracker();
        let id = tracker
            .add_task(TaskDraft::new("Quick", TaskCategory::Leisure))
            .unwrap();

        let t0 = Utc::now();
        tracker.start_timer_at(&id, t0);
        let banked = tracker.stop_timer_at(t0 + Duration::seconds(45));

        assert_eq!(banked, Some(0));
        assert_eq!(tracker.tasks()[0].time_spent, 0);
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn stop_without_active_timer_is_a_no_op() {
        let (mut tracker, notifier, _rx) = tracker();
        assert_eq!(tracker.stop_timer(), None);
        assert_eq!(notifier.count(), 0);
    }

    #[test]
    fn tick_reports_elapsed_without_mutating() {
        let (mut tracker, _, mut rx) = tracker();
        let id = tracker
            .add_task(TaskDraft::new("Long haul", TaskCategory::Work))
            .unwrap();

        let t0 = Utc::now();
        tracker.start_timer_at(&id, t0);
        assert_eq!(tracker.tick_at(t0 + Duration::minutes(3)), Some(3));
        assert_eq!(tracker.tasks()[0].time_spent, 0);

        let types = drain(&mut rx);
        assert!(types.contains(&"timer_tick"));

        // Idle tracker: no pulse.
        tracker.stop_timer_at(t0 + Duration::minutes(3));
        assert_eq!(tracker.tick_at(t0 + Duration::minutes(4)), None);
    }

    #[test]
    fn notification_toggle_rearms_reminder() {
        let (mut tracker, _, _rx) = tracker();
        let id = tracker
            .add_task(
                TaskDraft::new("Report", TaskCategory::Work).due(Utc::now() + Duration::hours(1)),
            )
            .unwrap();

        tracker.run_reminder_scan();
        assert!(tracker.tasks()[0].reminder_sent);

        assert!(tracker.set_notifications(&id, false));
        assert!(!tracker.tasks()[0].reminder_sent);
        assert!(!tracker.tasks()[0].notifications_enabled);

        assert!(tracker.set_notifications(&id, true));
        assert!(!tracker.tasks()[0].reminder_sent);
    }

    #[test]
    fn reminder_scan_dispatches_once_per_due_date() {
        let (mut tracker, notifier, _rx) = tracker();
        let now = Utc::now();
        tracker
            .add_task(TaskDraft::new("Due soon", TaskCategory::Work).due(now + Duration::hours(2)))
            .unwrap();
        tracker
            .add_task(TaskDraft::new("Far out", TaskCategory::Study).due(now + Duration::days(2)))
            .unwrap();

        assert_eq!(tracker.run_reminder_scan_at(now), 1);
        assert_eq!(notifier.count(), 1);
        assert!(notifier.bodies()[0].contains("Due soon"));

        // Idempotent: nothing changed, nothing re-fires.
        assert_eq!(tracker.run_reminder_scan_at(now), 0);
        assert_eq!(notifier.count(), 1);
    }

    #[test]
    fn state_survives_reload() {
        let notifier = recording_notifier();
        let (tx, _rx) = broadcast::channel(64);
        let db = tempo_store::Database::in_memory().unwrap();

        let id = {
            let repo = SnapshotRepo::new(db.clone());
            let mut tracker = Tracker::load(repo, notifier.clone(), tx.clone()).unwrap();
            let id = tracker
                .add_task(TaskDraft::new("Persisted", TaskCategory::Study))
                .unwrap();
            tracker.toggle_task(&id);
            id
        };

        let repo = SnapshotRepo::new(db);
        let tracker = Tracker::load(repo, notifier, tx).unwrap();
        assert_eq!(tracker.tasks().len(), 1);
        assert_eq!(tracker.tasks()[0].id, id);
        assert!(tracker.tasks()[0].completed);
    }

    #[test]
    fn reload_rebuilds_active_timer_reference() {
        let notifier = recording_notifier();
        let (tx, _rx) = broadcast::channel(64);
        let db = tempo_store::Database::in_memory().unwrap();

        let id = {
            let repo = SnapshotRepo::new(db.clone());
            let mut tracker = Tracker::load(repo, notifier.clone(), tx.clone()).unwrap();
            let id = tracker
                .add_task(TaskDraft::new("Running", TaskCategory::Work))
                .unwrap();
            tracker.start_timer(&id);
            id
        };

        let repo = SnapshotRepo::new(db);
        let mut tracker = Tracker::load(repo, notifier, tx).unwrap();
        assert_eq!(tracker.active_task_id(), Some(&id));
        // The restored timer still stops cleanly.
        assert!(tracker.stop_timer().is_some());
    }

    #[test]
    fn reload_repairs_multiple_active_tasks() {
        let notifier = recording_notifier();
        let (tx, _rx) = broadcast::channel(64);
        let db = tempo_store::Database::in_memory().unwrap();
        let repo = SnapshotRepo::new(db.clone());

        let now = Utc::now();
        let mut a = Task::from_draft(TaskDraft::new("A", TaskCategory::Work), now);
        a.is_active = true;
        a.started_at = Some(now);
        let mut b = Task::from_draft(TaskDraft::new("B", TaskCategory::Work), now);
        b.is_active = true;
        b.started_at = Some(now);
        repo.save_tasks(&[a.clone(), b]).unwrap();

        let tracker = Tracker::load(SnapshotRepo::new(db), notifier, tx).unwrap();
        assert_eq!(tracker.active_task_id(), Some(&a.id));
        let active = tracker.tasks().iter().filter(|t| t.is_active).count();
        assert_eq!(active, 1);
    }

    #[test]
    fn end_to_end_scenario() {
        // Add a work task due in an hour, time it for 90 seconds, then let
        // the scan catch it just past its due date.
        let (mut tracker, notifier, _rx) = tracker();
        let t0 = Utc::now();
        let id = tracker
            .add_task(
                TaskDraft::new("Write report", TaskCategory::Work).due(t0 + Duration::hours(1)),
            )
            .unwrap();

        tracker.start_timer_at(&id, t0);
        let banked = tracker.stop_timer_at(t0 + Duration::seconds(90));
        assert_eq!(banked, Some(1));
        assert_eq!(tracker.tasks()[0].time_spent, 1);
        assert_eq!(notifier.titles(), vec!["Timer Completed"]);
        assert!(notifier.bodies()[0].contains("1m"));

        let scanned_at = t0 + Duration::minutes(65);
        assert_eq!(tracker.run_reminder_scan_at(scanned_at), 1);
        assert!(tracker.tasks()[0].reminder_sent);
        assert_eq!(notifier.titles(), vec!["Timer Completed", "Task Reminder"]);
        assert!(notifier.bodies()[1].contains("overdue"));

        assert_eq!(tracker.run_reminder_scan_at(scanned_at), 0);
        assert_eq!(notifier.count(), 2);
    }
}

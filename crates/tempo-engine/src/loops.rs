//! Recurring background triggers: the timer display tick and the reminder
//! scan. Both serialize on the shared tracker mutex, so their effects never
//! interleave with a command in flight.

use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::tracker::SharedTracker;

/// How often the running timer reports its elapsed time.
pub const TIMER_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// How often tasks are scanned for due-date reminders.
pub const REMINDER_SCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Outcome of a background loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopResult {
    /// The loop observed cancellation and exited cleanly.
    Cancelled,
}

/// Emit a display-refresh tick for the active timer once per interval.
/// The tick never mutates `time_spent`; banking happens only at stop.
pub async fn run_timer_ticks(
    tracker: SharedTracker,
    interval: Duration,
    cancel: CancellationToken,
) -> LoopResult {
    let mut tick = time::interval(interval);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                tracker.lock().tick_at(Utc::now());
            }
            () = cancel.cancelled() => {
                debug!("timer tick loop cancelled");
                return LoopResult::Cancelled;
            }
        }
    }
}

/// Run the reminder scan once per interval. The first scan fires
/// immediately, matching a fresh session checking due tasks on startup.
pub async fn run_reminder_scans(
    tracker: SharedTracker,
    interval: Duration,
    cancel: CancellationToken,
) -> LoopResult {
    let mut tick = time::interval(interval);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                tracker.lock().run_reminder_scan_at(Utc::now());
            }
            () = cancel.cancelled() => {
                debug!("reminder scan loop cancelled");
                return LoopResult::Cancelled;
            }
        }
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use tempo_core::{format_minutes, Notifier, Permission, TaskCategory, TaskDraft, TrackerEvent};
use tempo_engine::loops::{self, REMINDER_SCAN_INTERVAL, TIMER_TICK_INTERVAL};
use tempo_engine::{EngineError, Tracker};
use tempo_store::{Database, SnapshotRepo};
use tempo_telemetry::TelemetryConfig;

#[derive(Parser)]
#[command(name = "tempo", about = "Personal task tracker with time tracking and reminders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a task
    Add {
        title: String,
        #[arg(long, default_value = "work")]
        category: TaskCategory,
        #[arg(long)]
        description: Option<String>,
        /// Due date, RFC 3339 (e.g. 2026-08-06T18:00:00Z)
        #[arg(long, value_parser = parse_due)]
        due: Option<DateTime<Utc>>,
        /// Create the task with reminders muted
        #[arg(long)]
        no_notify: bool,
    },
    /// List tasks
    List,
    /// Toggle a task between open and completed
    Done { id: String },
    /// Delete a task
    Rm { id: String },
    /// Start the timer on a task
    Start { id: String },
    /// Stop the running timer
    Stop,
    /// Disable reminders for a task
    Mute { id: String },
    /// Re-enable reminders for a task
    Unmute { id: String },
    /// Show productivity statistics
    Stats,
    /// Show productivity tips
    Tips,
    /// Run the timer tick and reminder scan loops until ctrl-c
    Watch,
}

fn parse_due(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid due date '{raw}': {e}"))
}

/// Notification backend for a terminal session: prints instead of raising
/// desktop notifications.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn notify(&self, title: &str, body: &str) {
        println!("** {title}: {body}");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tempo_telemetry::init_telemetry(&TelemetryConfig::default());

    let db_path = data_dir().join("tempo.db");
    let db = Database::open(&db_path).expect("failed to open snapshot database");

    let (event_tx, event_rx) = broadcast::channel::<TrackerEvent>(256);
    let notifier = Arc::new(TerminalNotifier);
    let mut tracker = Tracker::load(SnapshotRepo::new(db), notifier, event_tx)
        .expect("failed to load task snapshot");
    tracker.request_permission();

    match cli.command {
        Command::Add {
            title,
            category,
            description,
            due,
            no_notify,
        } => {
            let mut draft = TaskDraft::new(title, category).notifications(!no_notify);
            draft.description = description;
            draft.due_date = due;
            match tracker.add_task(draft) {
                Ok(id) => println!("added {id}"),
                Err(EngineError::EmptyTitle) => {
                    eprintln!("error: task title must not be empty");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::List => print_tasks(&tracker),
        Command::Done { id } => with_task(&mut tracker, &id, |tracker, id| {
            tracker.toggle_task(&id);
        }),
        Command::Rm { id } => with_task(&mut tracker, &id, |tracker, id| {
            tracker.delete_task(&id);
        }),
        Command::Start { id } => with_task(&mut tracker, &id, |tracker, id| {
            if !tracker.start_timer(&id) {
                eprintln!("timer not started (task completed?)");
            }
        }),
        Command::Stop => match tracker.stop_timer() {
            Some(minutes) => println!("banked {}", format_minutes(minutes)),
            None => println!("no timer running"),
        },
        Command::Mute { id } => with_task(&mut tracker, &id, |tracker, id| {
            tracker.set_notifications(&id, false);
        }),
        Command::Unmute { id } => with_task(&mut tracker, &id, |tracker, id| {
            tracker.set_notifications(&id, true);
        }),
        Command::Stats => print_stats(&tracker),
        Command::Tips => {
            for tip in tracker.tips() {
                println!("- {tip}");
            }
        }
        Command::Watch => {
            watch(tracker, event_rx).await;
            return;
        }
    }

    print_events(event_rx);
}

/// Run the background loops until ctrl-c, then tear everything down.
async fn watch(tracker: Tracker, mut event_rx: broadcast::Receiver<TrackerEvent>) {
    let shared = Arc::new(Mutex::new(tracker));
    let cancel = CancellationToken::new();

    let ticks = tokio::spawn(loops::run_timer_ticks(
        shared.clone(),
        TIMER_TICK_INTERVAL,
        cancel.clone(),
    ));
    let scans = tokio::spawn(loops::run_reminder_scans(
        shared.clone(),
        REMINDER_SCAN_INTERVAL,
        cancel.clone(),
    ));

    let printer_cancel = cancel.clone();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = event_rx.recv() => match event {
                    Ok(event) => println!("{}", event.message()),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                },
                () = printer_cancel.cancelled() => return,
            }
        }
    });

    tracing::info!("watching; ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");

    cancel.cancel();
    let _ = ticks.await;
    let _ = scans.await;
    let _ = printer.await;
    tracing::info!("shut down");
}

/// Resolve a full id or unique prefix and run the command against it.
fn with_task<F>(tracker: &mut Tracker, needle: &str, f: F)
where
    F: FnOnce(&mut Tracker, tempo_core::TaskId),
{
    let matches: Vec<_> = tracker
        .tasks()
        .iter()
        .filter(|t| t.id.as_str().starts_with(needle))
        .map(|t| t.id.clone())
        .collect();

    match matches.as_slice() {
        [id] => f(tracker, id.clone()),
        [] => {
            eprintln!("no task matches '{needle}'");
            std::process::exit(1);
        }
        _ => {
            eprintln!("'{needle}' is ambiguous ({} matches)", matches.len());
            std::process::exit(1);
        }
    }
}

fn print_tasks(tracker: &Tracker) {
    if tracker.tasks().is_empty() {
        println!("no tasks yet");
        return;
    }
    for task in tracker.tasks() {
        let marker = if task.is_active {
            ">"
        } else if task.completed {
            "x"
        } else {
            " "
        };
        let due = task
            .due_date
            .map(|d| format!("  due {}", d.to_rfc3339()))
            .unwrap_or_default();
        println!(
            "[{marker}] {}  {} ({}) {}{due}",
            short_id(task.id.as_str()),
            task.title,
            task.category,
            format_minutes(task.time_spent),
        );
    }
}

fn print_stats(tracker: &Tracker) {
    let stats = tracker.stats();
    println!("tasks:      {} ({} completed)", stats.total_tasks, stats.completed_tasks);
    println!("completion: {:.1}%", stats.completion_rate);
    println!("time spent: {}", format_minutes(stats.total_time_spent));
    println!("avg/task:   {:.1}m", stats.average_time_per_task);
    for category in TaskCategory::ALL {
        let slice = stats.categories.get(category);
        println!(
            "  {category}: {}/{} done, {}",
            slice.completed,
            slice.total,
            format_minutes(slice.time_spent)
        );
    }
}

fn print_events(mut event_rx: broadcast::Receiver<TrackerEvent>) {
    while let Ok(event) = event_rx.try_recv() {
        println!("{}", event.message());
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(13)]
}

fn data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".tempo")
}

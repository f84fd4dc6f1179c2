use chrono::Utc;
use tracing::instrument;

use tempo_core::Task;

use crate::database::Database;
use crate::error::StoreError;

/// Key holding the serialized task collection.
pub const TASKS_KEY: &str = "tasks";

/// Key reserved for daily productivity rollups. Written by nothing yet;
/// kept stable so older and newer binaries agree on the namespace.
pub const DAILY_STATS_KEY: &str = "daily_stats";

/// Key-value snapshot persistence. The whole task collection is written as
/// one JSON document per save; the tracker treats failures as best-effort.
pub struct SnapshotRepo {
    db: Database,
}

impl SnapshotRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Read the raw JSON stored under a key, if any.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT value FROM snapshots WHERE key = ?1")?;
            let mut rows = stmt.query([key])?;
            match rows.next()? {
                Some(row) => Ok(Some(row.get::<_, String>(0)?)),
                None => Ok(None),
            }
        })
    }

    /// Write raw JSON under a key, replacing any previous value.
    #[instrument(skip(self, value), fields(bytes = value.len()))]
    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                rusqlite::params![key, value, now],
            )?;
            Ok(())
        })
    }

    /// Load the persisted task collection. A missing snapshot is an empty
    /// collection; a snapshot that no longer parses is surfaced as corrupt
    /// rather than silently discarded.
    #[instrument(skip(self))]
    pub fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        match self.get(TASKS_KEY)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| StoreError::CorruptSnapshot {
                    key: TASKS_KEY.to_string(),
                    detail: e.to_string(),
                })
            }
            None => Ok(Vec::new()),
        }
    }

    /// Persist the full task collection.
    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let json = serde_json::to_string(tasks)?;
        self.put(TASKS_KEY, &json)
    }
}

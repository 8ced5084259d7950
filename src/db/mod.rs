mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use crate::models::*;
use crate::walkthrough::{CasOutcome, ProgressStore};

/// SQLite-backed walkthrough storage.
///
/// Clones share one connection; every statement runs under its lock, so a
/// conditional update observes and writes a row atomically.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!(path = %path.display(), "opened walkthrough database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Session progress
    // ============================================================

    pub fn get_progress(&self, key: &ProjectKey) -> Result<Option<SessionProgress>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let progress = conn
            .query_row(
                "SELECT project_key, status, completed_steps, total_steps, started_at, last_activity, revision
                 FROM walkthrough_sessions WHERE project_key = ?",
                [key.as_str()],
                progress_from_row,
            )
            .optional()?;
        Ok(progress)
    }

    pub fn insert_progress_if_absent(&self, progress: &SessionProgress) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "INSERT OR IGNORE INTO walkthrough_sessions
                (project_key, status, completed_steps, total_steps, started_at, last_activity, revision)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                progress.project_key.as_str(),
                progress.status.as_str(),
                serde_json::to_string(&progress.completed_steps)?,
                progress.total_steps as i64,
                progress.started_at.to_rfc3339(),
                progress.last_activity.to_rfc3339(),
                progress.revision as i64,
            ),
        )?;
        Ok(rows > 0)
    }

    /// Overwrite a progress row only if its stored revision is `expected_revision`.
    pub fn update_progress_if_revision(
        &self,
        expected_revision: u64,
        progress: &SessionProgress,
    ) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "UPDATE walkthrough_sessions
             SET status = ?, completed_steps = ?, total_steps = ?, started_at = ?, last_activity = ?, revision = ?
             WHERE project_key = ? AND revision = ?",
            (
                progress.status.as_str(),
                serde_json::to_string(&progress.completed_steps)?,
                progress.total_steps as i64,
                progress.started_at.to_rfc3339(),
                progress.last_activity.to_rfc3339(),
                progress.revision as i64,
                progress.project_key.as_str(),
                expected_revision as i64,
            ),
        )?;
        Ok(rows > 0)
    }

    // ============================================================
    // Plans
    // ============================================================

    pub fn upsert_plan(&self, snapshot: &PlanSnapshot) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO walkthrough_plans (project_key, features, steps, generated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(project_key) DO UPDATE SET
                features = excluded.features,
                steps = excluded.steps,
                generated_at = excluded.generated_at",
            (
                snapshot.project_key.as_str(),
                serde_json::to_string(&snapshot.features)?,
                serde_json::to_string(&snapshot.plan)?,
                snapshot.generated_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    pub fn get_plan(&self, key: &ProjectKey) -> Result<Option<PlanSnapshot>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let snapshot = conn
            .query_row(
                "SELECT project_key, features, steps, generated_at
                 FROM walkthrough_plans WHERE project_key = ?",
                [key.as_str()],
                |row| {
                    Ok(PlanSnapshot {
                        project_key: ProjectKey::from_raw(row.get::<_, String>(0)?),
                        features: json_column(row, 1)?,
                        plan: json_column(row, 2)?,
                        generated_at: parse_datetime(row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()?;
        Ok(snapshot)
    }

    // ============================================================
    // Execution log
    // ============================================================

    pub fn create_execution(&self, record: &ExecutionRecord) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO step_executions (id, project_key, step_no, success, message, executed_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                record.id.to_string(),
                record.project_key.as_str(),
                record.step_no as i64,
                if record.success { 1 } else { 0 },
                &record.message,
                record.executed_at.to_rfc3339(),
            ),
        )?;
        Ok(())
    }

    pub fn get_executions(&self, key: &ProjectKey) -> Result<Vec<ExecutionRecord>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, project_key, step_no, success, message, executed_at
             FROM step_executions WHERE project_key = ? ORDER BY executed_at, rowid",
        )?;

        let records = stmt
            .query_map([key.as_str()], |row| {
                Ok(ExecutionRecord {
                    id: parse_uuid(row.get::<_, String>(0)?),
                    project_key: ProjectKey::from_raw(row.get::<_, String>(1)?),
                    step_no: row.get::<_, i64>(2)? as u32,
                    success: row.get::<_, i32>(3)? != 0,
                    message: row.get(4)?,
                    executed_at: parse_datetime(row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

impl ProgressStore for Database {
    fn load_progress(&self, key: &ProjectKey) -> Result<Option<SessionProgress>> {
        self.get_progress(key)
    }

    fn insert_progress(&self, progress: &SessionProgress) -> Result<CasOutcome> {
        Ok(cas_outcome(self.insert_progress_if_absent(progress)?))
    }

    fn swap_progress(&self, expected_revision: u64, progress: &SessionProgress) -> Result<CasOutcome> {
        Ok(cas_outcome(
            self.update_progress_if_revision(expected_revision, progress)?,
        ))
    }

    fn save_plan(&self, snapshot: &PlanSnapshot) -> Result<()> {
        self.upsert_plan(snapshot)
    }

    fn load_plan(&self, key: &ProjectKey) -> Result<Option<PlanSnapshot>> {
        self.get_plan(key)
    }

    fn append_execution(&self, record: &ExecutionRecord) -> Result<()> {
        self.create_execution(record)
    }

    fn list_executions(&self, key: &ProjectKey) -> Result<Vec<ExecutionRecord>> {
        self.get_executions(key)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// `$AIDE_DATABASE_PATH`, or `walkthrough.db` in the platform data directory.
pub fn default_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("AIDE_DATABASE_PATH") {
        return Ok(PathBuf::from(path));
    }
    let dirs = directories::ProjectDirs::from("", "", "aide")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("walkthrough.db"))
}

fn cas_outcome(applied: bool) -> CasOutcome {
    if applied {
        CasOutcome::Applied
    } else {
        CasOutcome::Conflict
    }
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<SessionProgress> {
    Ok(SessionProgress {
        project_key: ProjectKey::from_raw(row.get::<_, String>(0)?),
        status: SessionStatus::from_str(&row.get::<_, String>(1)?)
            .unwrap_or(SessionStatus::Active),
        completed_steps: json_column(row, 2)?,
        total_steps: row.get::<_, i64>(3)? as u32,
        started_at: parse_datetime(row.get::<_, String>(4)?),
        last_activity: parse_datetime(row.get::<_, String>(5)?),
        revision: row.get::<_, i64>(6)? as u64,
    })
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_uuid(s: String) -> uuid::Uuid {
    uuid::Uuid::parse_str(&s).unwrap_or_else(|_| uuid::Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

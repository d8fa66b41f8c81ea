use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

mod migrations;

use crate::models::CandidateRecord;
use crate::session::InterviewState;
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

/// Sort key for candidate listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Name,
    Score,
    CompletedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Filter and ordering for `list_candidates`. Defaults to newest first.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    /// Case-insensitive substring matched against name and email.
    pub search: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl Default for CandidateQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort_by: SortField::CompletedAt,
            order: SortOrder::Desc,
        }
    }
}

/// A persisted interview snapshot as reloaded after a restart.
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub state: InterviewState,
    /// True when the session was mid-interview at the time of the save; the
    /// consuming UI must offer resume-or-restart instead of silently
    /// continuing a stale countdown.
    pub was_active: bool,
    pub saved_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("vetta-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Inserts or replaces the completed record for a session id.
    pub async fn upsert_candidate(&self, record: &CandidateRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let answers_json = serde_json::to_string(&record.answers)
                .context("failed to serialize candidate answers")?;
            conn.execute(
                "INSERT OR REPLACE INTO candidates
                 (id, name, email, phone, resume_text, total_score, summary, completed_at, answers_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.name,
                    record.email,
                    record.phone,
                    record.resume_text,
                    record.total_score,
                    record.summary,
                    record.completed_at.to_rfc3339(),
                    answers_json,
                ],
            )
            .with_context(|| "failed to upsert candidate record")?;
            Ok(())
        })
        .await
    }

    pub async fn list_candidates(&self, query: CandidateQuery) -> Result<Vec<CandidateRecord>> {
        self.execute(move |conn| {
            let where_clause = if query.search.is_some() {
                " WHERE name LIKE ?1 OR email LIKE ?1"
            } else {
                ""
            };
            let order_column = match query.sort_by {
                SortField::Name => "name COLLATE NOCASE",
                SortField::Score => "total_score",
                SortField::CompletedAt => "completed_at",
            };
            let direction = match query.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            let sql = format!(
                "SELECT id, name, email, phone, resume_text, total_score, summary, completed_at, answers_json
                 FROM candidates{where_clause}
                 ORDER BY {order_column} {direction}"
            );

            let mut stmt = conn.prepare(&sql)?;
            let pattern = query.search.as_ref().map(|term| format!("%{term}%"));
            let mut rows = match &pattern {
                Some(pattern) => stmt.query(params![pattern])?,
                None => stmt.query([])?,
            };

            let mut candidates = Vec::new();
            while let Some(row) = rows.next()? {
                let answers_json: String = row.get(8)?;
                candidates.push(CandidateRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    phone: row.get(3)?,
                    resume_text: row.get(4)?,
                    total_score: row.get(5)?,
                    summary: row.get(6)?,
                    completed_at: parse_datetime(&row.get::<_, String>(7)?)?,
                    answers: serde_json::from_str(&answers_json)
                        .context("failed to deserialize candidate answers")?,
                });
            }

            Ok(candidates)
        })
        .await
    }

    /// Deletes a candidate record; returns whether a row existed.
    pub async fn delete_candidate(&self, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let affected = conn
                .execute("DELETE FROM candidates WHERE id = ?1", params![session_id])
                .with_context(|| "failed to delete candidate record")?;
            Ok(affected > 0)
        })
        .await
    }

    /// Persists the full interview state so it survives a process restart.
    pub async fn save_session_snapshot(&self, state: &InterviewState) -> Result<()> {
        let was_active = state.is_active();
        let state_json =
            serde_json::to_string(state).context("failed to serialize session state")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session_snapshot (id, state_json, was_active, saved_at)
                 VALUES (0, ?1, ?2, ?3)",
                params![state_json, was_active, Utc::now().to_rfc3339()],
            )
            .with_context(|| "failed to save session snapshot")?;
            Ok(())
        })
        .await
    }

    pub async fn load_session_snapshot(&self) -> Result<Option<StoredSession>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT state_json, was_active, saved_at FROM session_snapshot WHERE id = 0",
            )?;

            let mut rows = stmt.query([])?;
            if let Some(row) = rows.next()? {
                let state_json: String = row.get(0)?;
                Ok(Some(StoredSession {
                    state: serde_json::from_str(&state_json)
                        .context("failed to deserialize session snapshot")?,
                    was_active: row.get(1)?,
                    saved_at: parse_datetime(&row.get::<_, String>(2)?)?,
                }))
            } else {
                Ok(None)
            }
        })
        .await
    }

    pub async fn clear_session_snapshot(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM session_snapshot", [])
                .with_context(|| "failed to clear session snapshot")?;
            Ok(())
        })
        .await
    }
}

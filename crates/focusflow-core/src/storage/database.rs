//! SQLite persistence on a dedicated worker thread.
//!
//! A single `rusqlite::Connection` lives on its own thread; callers submit
//! closures over a channel and await the reply through a oneshot, so async
//! code never blocks on SQLite. `Database` implements [`SessionStore`] and
//! carries the user and whitelist operations; shop and stats SQL lives in
//! their own modules, running through [`Database::execute`].

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rusqlite::{params, Connection, Row};
use tokio::sync::oneshot;

use crate::error::{DatabaseError, Result};
use crate::session::{Difficulty, SessionKind};

use super::migrations;
use super::models::{
    FocusSession, NewSessionRecord, SessionRecordUpdate, SessionStatus, User, WhitelistEntry,
};
use super::SessionStore;

type DbJob = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Run(DbJob),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Option<JoinHandle<()>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let _ = self.sender.send(DbCommand::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("database worker panicked during shutdown");
            }
        }
    }
}

/// Handle to the storage worker. Cheap to clone; the connection closes when
/// the last handle drops.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Open (or create) the database file at `path` and run migrations.
    /// Blocks briefly while the worker thread initializes.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::spawn_worker(Some(path.into()))
    }

    /// Open an ephemeral in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::spawn_worker(None)
    }

    fn spawn_worker(path: Option<PathBuf>) -> Result<Self> {
        if let Some(parent) = path.as_deref().and_then(|p| p.parent()) {
            std::fs::create_dir_all(parent)?;
        }
        let (sender, receiver) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), DatabaseError>>();

        let worker = std::thread::Builder::new()
            .name("focusflow-db".into())
            .spawn(move || {
                let mut conn = match open_connection(path.as_deref()) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if let Err(err) = migrations::migrate(&conn) {
                    let _ = ready_tx.send(Err(DatabaseError::Migration(err.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while let Ok(command) = receiver.recv() {
                    match command {
                        DbCommand::Run(job) => job(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }
                info!("database worker shutting down");
            })?;

        ready_rx.recv().map_err(|_| DatabaseError::Closed)??;
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender,
                worker: Some(worker),
            }),
        })
    }

    /// Run `task` on the worker's connection and await its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: DbJob = Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                warn!("database reply dropped; caller went away");
            }
        });
        self.inner
            .sender
            .send(DbCommand::Run(job))
            .map_err(|_| DatabaseError::Closed)?;
        reply_rx.await.map_err(|_| DatabaseError::Closed)?
    }

    // ── Users ───────────────────────────────────────────────────────────

    /// Fetch the single local user, creating it on first run.
    pub async fn ensure_user(&self, username: &str) -> Result<User> {
        let username = username.to_owned();
        Ok(self
            .execute(move |conn| {
                if let Some(user) = optional(conn.query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT 1"),
                    [],
                    user_from_row,
                ))? {
                    return Ok(user);
                }
                conn.execute("INSERT INTO users (username) VALUES (?1)", params![username])?;
                let id = conn.last_insert_rowid();
                info!("bootstrapped user '{username}' with id {id}");
                conn.query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    params![id],
                    user_from_row,
                )
                .map_err(Into::into)
            })
            .await?)
    }

    pub async fn fetch_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self
            .execute(move |conn| {
                optional(conn.query_row(
                    &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                    params![id],
                    user_from_row,
                ))
            })
            .await?)
    }

    pub async fn set_island_theme(&self, user_id: i64, theme: i64) -> Result<()> {
        Ok(self
            .execute(move |conn| {
                conn.execute(
                    "UPDATE users SET island_theme = ?1 WHERE id = ?2",
                    params![theme, user_id],
                )?;
                Ok(())
            })
            .await?)
    }

    /// Subtract coins from the balance. The shop checks funds first; the
    /// balance itself is not constrained here.
    pub async fn debit_coins(&self, user_id: i64, amount: i64) -> Result<()> {
        Ok(self
            .execute(move |conn| {
                conn.execute(
                    "UPDATE users SET coins = coins - ?1 WHERE id = ?2",
                    params![amount, user_id],
                )?;
                Ok(())
            })
            .await?)
    }

    // ── Whitelist ───────────────────────────────────────────────────────

    pub async fn add_whitelisted_app(
        &self,
        user_id: i64,
        package_name: &str,
        app_name: &str,
        category: &str,
    ) -> Result<i64> {
        let package_name = package_name.to_owned();
        let app_name = app_name.to_owned();
        let category = category.to_owned();
        Ok(self
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO app_whitelist (user_id, package_name, app_name, category)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![user_id, package_name, app_name, category],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?)
    }

    pub async fn remove_whitelisted_app(&self, id: i64) -> Result<()> {
        Ok(self
            .execute(move |conn| {
                conn.execute("DELETE FROM app_whitelist WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?)
    }

    pub async fn whitelisted_apps(&self, user_id: i64) -> Result<Vec<WhitelistEntry>> {
        Ok(self
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, package_name, app_name, category
                     FROM app_whitelist WHERE user_id = ?1 ORDER BY app_name",
                )?;
                let rows = stmt.query_map(params![user_id], |row| {
                    Ok(WhitelistEntry {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        package_name: row.get(2)?,
                        app_name: row.get(3)?,
                        category: row.get(4)?,
                    })
                })?;
                let mut entries = Vec::new();
                for entry in rows {
                    entries.push(entry?);
                }
                Ok(entries)
            })
            .await?)
    }

    /// Whether `package_name` is exempt from blocking for this user.
    pub async fn is_whitelisted(&self, user_id: i64, package_name: &str) -> Result<bool> {
        let package_name = package_name.to_owned();
        Ok(self
            .execute(move |conn| {
                conn.query_row(
                    "SELECT EXISTS (
                         SELECT 1 FROM app_whitelist WHERE user_id = ?1 AND package_name = ?2
                     )",
                    params![user_id, package_name],
                    |row| row.get(0),
                )
                .map_err(Into::into)
            })
            .await?)
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn create_session_record(&self, new: NewSessionRecord) -> Result<i64> {
        Ok(self
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO focus_sessions
                         (user_id, category, started_at, duration_minutes,
                          status, coins_earned, kind, difficulty)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        new.user_id,
                        new.category,
                        new.started_at.to_rfc3339(),
                        new.duration_minutes,
                        new.status.as_str(),
                        new.coins_earned,
                        new.kind.as_str(),
                        new.difficulty.as_str(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?)
    }

    async fn update_session_record(&self, update: SessionRecordUpdate) -> Result<()> {
        Ok(self
            .execute(move |conn| {
                let affected = conn.execute(
                    "UPDATE focus_sessions
                     SET status = ?1, duration_minutes = ?2, distractions = ?3, coins_earned = ?4
                     WHERE id = ?5",
                    params![
                        update.status.as_str(),
                        update.duration_minutes,
                        update.distractions,
                        update.coins_earned,
                        update.id,
                    ],
                )?;
                if affected == 0 {
                    warn!("session record {} missing; settlement dropped", update.id);
                }
                Ok(())
            })
            .await?)
    }

    async fn credit_coins(&self, user_id: i64, amount: u32) -> Result<()> {
        Ok(self
            .execute(move |conn| {
                conn.execute(
                    "UPDATE users SET coins = coins + ?1 WHERE id = ?2",
                    params![amount, user_id],
                )?;
                Ok(())
            })
            .await?)
    }

    async fn credit_focus_minutes(&self, user_id: i64, minutes: u32) -> Result<()> {
        Ok(self
            .execute(move |conn| {
                conn.execute(
                    "UPDATE users SET focus_minutes = focus_minutes + ?1 WHERE id = ?2",
                    params![minutes, user_id],
                )?;
                Ok(())
            })
            .await?)
    }

    async fn fetch_session_by_id(&self, id: i64) -> Result<Option<FocusSession>> {
        Ok(self
            .execute(move |conn| {
                optional(conn.query_row(
                    &format!("SELECT {SESSION_COLUMNS} FROM focus_sessions WHERE id = ?1"),
                    params![id],
                    session_from_row,
                ))
            })
            .await?)
    }
}

fn open_connection(path: Option<&std::path::Path>) -> Result<Connection, DatabaseError> {
    let conn = match path {
        Some(p) => Connection::open(p).map_err(|source| DatabaseError::OpenFailed {
            path: p.to_path_buf(),
            source,
        })?,
        None => Connection::open_in_memory()?,
    };
    if path.is_some() {
        conn.pragma_update(None, "journal_mode", "WAL")?;
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>, DatabaseError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

// ── Row mapping ─────────────────────────────────────────────────────────

const USER_COLUMNS: &str = "id, username, coins, level, island_theme, focus_minutes";

pub(crate) const SESSION_COLUMNS: &str =
    "id, user_id, category, started_at, duration_minutes, status, coins_earned, \
     distractions, kind, difficulty";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        coins: row.get(2)?,
        level: row.get(3)?,
        island_theme: row.get(4)?,
        focus_minutes: row.get(5)?,
    })
}

pub(crate) fn session_from_row(row: &Row) -> rusqlite::Result<FocusSession> {
    let started_raw: String = row.get(3)?;
    let status_raw: String = row.get(5)?;
    let kind_raw: String = row.get(8)?;
    let difficulty_raw: String = row.get(9)?;
    Ok(FocusSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        started_at: parse_timestamp(3, &started_raw)?,
        duration_minutes: row.get(4)?,
        status: SessionStatus::parse(&status_raw)
            .ok_or_else(|| decode_error(5, format!("unknown session status '{status_raw}'")))?,
        coins_earned: row.get(6)?,
        distractions: row.get(7)?,
        kind: SessionKind::parse(&kind_raw)
            .ok_or_else(|| decode_error(8, format!("unknown session kind '{kind_raw}'")))?,
        difficulty: Difficulty::parse(&difficulty_raw)
            .ok_or_else(|| decode_error(9, format!("unknown difficulty '{difficulty_raw}'")))?,
    })
}

fn decode_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, message.into())
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}

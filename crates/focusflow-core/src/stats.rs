//! Aggregate session statistics.
//!
//! Only `Completed` sessions count toward history and totals; failed and
//! in-progress rows are invisible here.

use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::database::{session_from_row, SESSION_COLUMNS};
use crate::storage::{Database, FocusSession};

/// Lifetime completed-session totals for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTotals {
    pub sessions: u64,
    pub minutes: u64,
    pub coins: u64,
}

/// The most recent completed sessions, newest first.
pub async fn recent_completed(db: &Database, user_id: i64, limit: u32) -> Result<Vec<FocusSession>> {
    Ok(db
        .execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM focus_sessions
                 WHERE user_id = ?1 AND status = 'Completed'
                 ORDER BY started_at DESC, id DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![user_id, limit], session_from_row)?;
            let mut sessions = Vec::new();
            for session in rows {
                sessions.push(session?);
            }
            Ok(sessions)
        })
        .await?)
}

/// Counts across the user's whole completed history.
pub async fn totals(db: &Database, user_id: i64) -> Result<FocusTotals> {
    Ok(db
        .execute(move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(duration_minutes), 0),
                        COALESCE(SUM(coins_earned), 0)
                 FROM focus_sessions
                 WHERE user_id = ?1 AND status = 'Completed'",
                params![user_id],
                |row| {
                    Ok(FocusTotals {
                        sessions: row.get(0)?,
                        minutes: row.get(1)?,
                        coins: row.get(2)?,
                    })
                },
            )
            .map_err(Into::into)
        })
        .await?)
}

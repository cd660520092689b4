//! Persistence: the `SessionStore` seam the engine writes through, its
//! SQLite implementation, and app configuration.

mod config;
pub mod database;
pub mod migrations;
pub mod models;

pub use config::{Config, CustomBounds, SessionDefaults};
pub use database::Database;
pub use models::{
    AssetDef, FocusSession, InventoryItem, NewSessionRecord, SessionRecordUpdate, SessionStatus,
    User, WhitelistEntry,
};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;

/// Storage operations the session engine depends on.
///
/// [`Database`] is the shipped implementation; tests substitute their own.
/// Credits are applied as in-place arithmetic on the user row, so they
/// compose regardless of ordering.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new in-progress session, returning its row id.
    async fn create_session_record(&self, new: NewSessionRecord) -> Result<i64>;

    /// Settle the session row in place when a session ends.
    async fn update_session_record(&self, update: SessionRecordUpdate) -> Result<()>;

    /// Add coins to the user's balance.
    async fn credit_coins(&self, user_id: i64, amount: u32) -> Result<()>;

    /// Add to the user's lifetime focus minutes.
    async fn credit_focus_minutes(&self, user_id: i64, minutes: u32) -> Result<()>;

    async fn fetch_session_by_id(&self, id: i64) -> Result<Option<FocusSession>>;
}

/// Directory for the database and config file:
/// `~/.config/focusflow`, or `~/.config/focusflow-dev` when
/// `FOCUSFLOW_ENV=dev`. Created if absent.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSFLOW_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusflow-dev")
    } else {
        base_dir.join("focusflow")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

//! Row types for the SQLite store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Difficulty, SessionKind};

/// Persisted lifecycle state of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "InProgress",
            SessionStatus::Completed => "Completed",
            SessionStatus::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "InProgress" => Some(SessionStatus::InProgress),
            "Completed" => Some(SessionStatus::Completed),
            "Failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }
}

/// The single local user: balance, lifetime focus minutes, island look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub coins: i64,
    pub level: i64,
    pub island_theme: i64,
    pub focus_minutes: i64,
}

/// One focus-session row, from start through settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: SessionStatus,
    pub coins_earned: u32,
    pub distractions: u32,
    pub kind: SessionKind,
    pub difficulty: Difficulty,
}

/// Fields for the row inserted when a session starts.
#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub user_id: i64,
    pub category: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: SessionStatus,
    pub coins_earned: u32,
    pub kind: SessionKind,
    pub difficulty: Difficulty,
}

/// In-place update applied to the same row when the session ends.
#[derive(Debug, Clone)]
pub struct SessionRecordUpdate {
    pub id: i64,
    pub status: SessionStatus,
    pub duration_minutes: u32,
    pub distractions: u32,
    pub coins_earned: u32,
}

/// A purchasable island cosmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDef {
    pub id: i64,
    pub name: String,
    pub price: i64,
    /// Catalog grouping ("Flora", "Building", "Weather", ...).
    pub kind: String,
    pub icon: String,
    pub description: String,
}

/// An owned asset, possibly placed on the island.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub user_id: i64,
    pub asset_id: i64,
    pub quantity: i64,
    pub placed: bool,
    pub pos_x: Option<f64>,
    pub pos_y: Option<f64>,
}

/// One app exempt from Hard-mode blocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub id: i64,
    pub user_id: i64,
    pub package_name: String,
    pub app_name: String,
    pub category: String,
}

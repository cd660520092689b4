//! # FocusFlow Core Library
//!
//! Core business logic for FocusFlow, a gamified focus timer. The library
//! is UI-agnostic: a desktop shell, a CLI, or a test harness drives the
//! same engine and observes it through snapshots and events.
//!
//! ## Architecture
//!
//! - **Session Engine**: A wall-clock-based state machine driven by an
//!   internal 1-second ticker, covering Pomodoro, deep-work, and custom
//!   sessions
//! - **Rewards**: Pure coin calculation from session length, difficulty,
//!   and recorded distractions
//! - **Storage**: SQLite-based persistence for users, session history,
//!   the asset shop, and the app whitelist; TOML-based configuration
//! - **Blocking**: The [`FocusGuard`] trait lets a host process enforce
//!   distraction blocking when sessions start and stop
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Async session lifecycle driver
//! - [`Database`]: User, session, shop, and whitelist persistence
//! - [`Config`]: Application configuration management
//! - [`FocusGuard`]: Trait for host-side distraction blocking

pub mod blocking;
pub mod error;
pub mod events;
pub mod rewards;
pub mod session;
pub mod shop;
pub mod stats;
pub mod storage;

pub use blocking::{FocusGuard, NoopGuard};
pub use error::{ConfigError, CoreError, DatabaseError, Result, SessionError, ShopError};
pub use events::Event;
pub use rewards::{calculate_coins, RewardResult};
pub use session::{
    Difficulty, Phase, SessionConfig, SessionEngine, SessionKind, Snapshot, POMODORO_ROUNDS,
};
pub use stats::FocusTotals;
pub use storage::{Config, Database, SessionStore};

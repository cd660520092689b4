//! Focus session domain: configuration presets, the deterministic state
//! machine, and the async engine that drives it.

mod config;
mod engine;
mod run;

pub use config::{
    Difficulty, SessionConfig, SessionKind, CUSTOM_MAX_MINUTES, CUSTOM_MIN_MINUTES,
    CUSTOM_STEP_MINUTES,
};
pub use engine::{SessionEngine, Snapshot};
pub use run::{Phase, SessionRun, TickOutcome, POMODORO_ROUNDS};

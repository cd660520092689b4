//! Blocking-intent signals.
//!
//! Hard-mode sessions imply device-level app blocking, which lives outside
//! this crate. The engine reports phase boundaries through a `FocusGuard`;
//! an implementation forwards them to whatever enforcement mechanism the
//! platform offers, consulting the app whitelist as it sees fit. Guard
//! failures are logged by the engine and never fail a transition.

use crate::session::Difficulty;

/// Hook return type; errors are reported, never acted on.
pub type GuardResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receiver for blocking-intent signals. Every hook defaults to a no-op,
/// so implementations override only what they act on.
pub trait FocusGuard: Send + Sync {
    /// A work phase began: session start, a new Pomodoro round, or a
    /// resume after pause.
    fn on_work_start(&self, _difficulty: Difficulty, _minutes: u32) -> GuardResult {
        Ok(())
    }

    /// A break began; enforcement may relax.
    fn on_break_start(&self, _minutes: u32) -> GuardResult {
        Ok(())
    }

    /// The user paused the session.
    fn on_pause(&self) -> GuardResult {
        Ok(())
    }

    /// The session reached a terminal phase, completed or failed.
    fn on_session_end(&self) -> GuardResult {
        Ok(())
    }
}

/// Default guard: ignores every signal.
pub struct NoopGuard;

impl FocusGuard for NoopGuard {}

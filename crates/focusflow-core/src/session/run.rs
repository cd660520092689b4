//! The focus-session state machine.
//!
//! `SessionRun` is a plain struct driven entirely by explicit timestamps:
//! every transition takes the current wall-clock time in epoch
//! milliseconds, so the whole machine is deterministic under test. It owns
//! no timer; the async engine calls [`SessionRun::tick`] once a second
//! while a session is live.
//!
//! ```text
//! Active <-> Paused
//! Active  -> Break -> Active   (next Pomodoro round)
//! Active | Paused | Break -> Completed | Failed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{SessionConfig, SessionKind};

/// Work rounds in a Pomodoro session. Not configurable.
pub const POMODORO_ROUNDS: u32 = 4;

const MINUTE_MS: u64 = 60_000;

/// Lifecycle phase of the engine.
///
/// `Setup` means no run exists; a live [`SessionRun`] is always in
/// `Active`, `Paused`, or `Break`, and reaches a terminal phase exactly
/// once, just before it is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Active,
    Paused,
    Break,
    Completed,
    Failed,
}

impl Phase {
    /// Phases advanced by the periodic tick.
    pub fn is_tickable(&self) -> bool {
        matches!(self, Phase::Active | Phase::Break)
    }

    /// Phases a live run can be in.
    pub fn is_live(&self) -> bool {
        matches!(self, Phase::Active | Phase::Paused | Phase::Break)
    }
}

/// What a tick did to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Ignored: the run is not in a tickable phase.
    Skipped,
    /// Time advanced within the current phase.
    Running,
    /// A work phase hit its target and a break began.
    BreakStarted,
    /// A break ended and the given work round began.
    RoundStarted(u32),
    /// The session hit its final target; the caller must complete it.
    TargetReached,
}

/// One live focus session.
#[derive(Debug, Clone)]
pub struct SessionRun {
    config: SessionConfig,
    record_id: i64,
    phase: Phase,
    /// 1-based Pomodoro round. Stays 1 for other kinds.
    round: u32,
    /// Elapsed time within the current phase, flushed on pause and tick.
    elapsed_ms: u64,
    /// Wall-clock anchor (epoch ms) of the current phase. Re-anchored on
    /// resume so a pause never costs progress.
    anchor_ms: u64,
    distractions: u32,
    started_at: DateTime<Utc>,
}

impl SessionRun {
    pub fn new(
        config: SessionConfig,
        record_id: i64,
        now_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            config,
            record_id,
            phase: Phase::Active,
            round: 1,
            elapsed_ms: 0,
            anchor_ms: now_ms,
            distractions: 0,
            started_at,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn distractions(&self) -> u32 {
        self.distractions
    }

    pub fn record_id(&self) -> i64 {
        self.record_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed time in the current phase as of `now_ms`.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        if self.phase.is_tickable() {
            now_ms.saturating_sub(self.anchor_ms)
        } else {
            self.elapsed_ms
        }
    }

    /// Target length of the current phase, in minutes.
    pub fn target_minutes(&self) -> u32 {
        if self.phase == Phase::Break {
            self.config.break_minutes
        } else {
            self.config.work_minutes
        }
    }

    /// Minutes credited if the session completed at `now_ms`. Pomodoro
    /// credits whole work rounds; other kinds credit elapsed work time.
    pub fn effective_minutes(&self, now_ms: u64) -> u32 {
        match self.config.kind {
            SessionKind::Pomodoro => self.config.work_minutes.saturating_mul(self.round),
            _ => (self.elapsed_ms(now_ms) / MINUTE_MS) as u32,
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────

    /// Advance the machine to `now_ms`. No-op unless Active or in Break;
    /// a tick that arrives after a pause or cancel lands here as
    /// [`TickOutcome::Skipped`].
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        if !self.phase.is_tickable() {
            return TickOutcome::Skipped;
        }
        self.elapsed_ms = now_ms.saturating_sub(self.anchor_ms);
        if self.elapsed_ms / MINUTE_MS < u64::from(self.target_minutes()) {
            return TickOutcome::Running;
        }
        match (self.config.kind, self.phase) {
            (SessionKind::Pomodoro, Phase::Active) => {
                self.enter(Phase::Break, now_ms);
                TickOutcome::BreakStarted
            }
            (SessionKind::Pomodoro, Phase::Break) if self.round < POMODORO_ROUNDS => {
                self.round += 1;
                self.enter(Phase::Active, now_ms);
                TickOutcome::RoundStarted(self.round)
            }
            _ => TickOutcome::TargetReached,
        }
    }

    /// Freeze the clock. Valid only from Active; returns whether it applied.
    pub fn pause(&mut self, now_ms: u64) -> bool {
        if self.phase != Phase::Active {
            return false;
        }
        self.elapsed_ms = now_ms.saturating_sub(self.anchor_ms);
        self.phase = Phase::Paused;
        true
    }

    /// Continue from a pause. The anchor moves so elapsed time carries on
    /// exactly where it stopped.
    pub fn resume(&mut self, now_ms: u64) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.anchor_ms = now_ms.saturating_sub(self.elapsed_ms);
        self.phase = Phase::Active;
        true
    }

    /// Count a distraction. Only counted while Active.
    pub fn record_distraction(&mut self) -> bool {
        if self.phase != Phase::Active {
            return false;
        }
        self.distractions += 1;
        true
    }

    /// Terminal transition: mark Completed and return the credited minutes.
    pub fn finish(&mut self, now_ms: u64) -> u32 {
        let minutes = self.effective_minutes(now_ms);
        self.elapsed_ms = self.elapsed_ms(now_ms);
        self.phase = Phase::Completed;
        minutes
    }

    /// Terminal transition: mark Failed.
    pub fn fail(&mut self) {
        self.phase = Phase::Failed;
    }

    fn enter(&mut self, phase: Phase, now_ms: u64) {
        self.phase = phase;
        self.elapsed_ms = 0;
        self.anchor_ms = now_ms;
    }
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

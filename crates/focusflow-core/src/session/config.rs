//! Session configuration: what kind of session to run, for how long, and
//! under which difficulty.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Lower bound for custom session durations, in minutes.
pub const CUSTOM_MIN_MINUTES: u32 = 5;
/// Upper bound for custom session durations, in minutes.
pub const CUSTOM_MAX_MINUTES: u32 = 120;
/// Custom durations move in steps of this many minutes.
pub const CUSTOM_STEP_MINUTES: u32 = 5;

/// The three session shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Work/break rounds, four per session.
    Pomodoro,
    /// One long uninterrupted work phase.
    DeepWork,
    /// Caller-supplied duration, no break.
    #[default]
    Custom,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Pomodoro => "Pomodoro",
            SessionKind::DeepWork => "DeepWork",
            SessionKind::Custom => "Custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pomodoro" => Some(SessionKind::Pomodoro),
            "DeepWork" => Some(SessionKind::DeepWork),
            "Custom" => Some(SessionKind::Custom),
            _ => None,
        }
    }
}

/// How strictly the session is enforced. Hard mode raises the reward
/// multiplier and signals the [`FocusGuard`](crate::blocking::FocusGuard)
/// to block distracting apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Soft,
    Hard,
}

impl Difficulty {
    /// Reward multiplier fed into the coin formula.
    pub fn multiplier(&self) -> f64 {
        match self {
            Difficulty::Soft => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Soft => "Soft",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Soft" => Some(Difficulty::Soft),
            "Hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Immutable shape of one session, fixed at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub kind: SessionKind,
    pub difficulty: Difficulty,
    /// Free-form label stored with the session record ("Study", "Coding", ...).
    pub category: String,
    /// Length of one work phase, in minutes.
    pub work_minutes: u32,
    /// Break length between Pomodoro rounds, in minutes.
    pub break_minutes: u32,
}

impl SessionConfig {
    /// Classic 25/5 Pomodoro.
    pub fn pomodoro(category: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            kind: SessionKind::Pomodoro,
            difficulty,
            category: category.into(),
            work_minutes: 25,
            break_minutes: 5,
        }
    }

    /// A single 50-minute deep work block, no break.
    pub fn deep_work(category: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            kind: SessionKind::DeepWork,
            difficulty,
            category: category.into(),
            work_minutes: 50,
            break_minutes: 0,
        }
    }

    /// A custom-length session, no break.
    pub fn custom(category: impl Into<String>, difficulty: Difficulty, work_minutes: u32) -> Self {
        Self {
            kind: SessionKind::Custom,
            difficulty,
            category: category.into(),
            work_minutes,
            break_minutes: 0,
        }
    }

    /// The duration rule the setup UI offers for custom sessions: 5 to 120
    /// minutes in 5-minute steps. The engine itself accepts any positive
    /// duration; this is a helper for front ends.
    pub fn validate_custom_minutes(minutes: u32) -> Result<(), SessionError> {
        if !(CUSTOM_MIN_MINUTES..=CUSTOM_MAX_MINUTES).contains(&minutes) {
            return Err(SessionError::InvalidConfig(format!(
                "custom duration must be between {CUSTOM_MIN_MINUTES} and {CUSTOM_MAX_MINUTES} minutes, got {minutes}"
            )));
        }
        if minutes % CUSTOM_STEP_MINUTES != 0 {
            return Err(SessionError::InvalidConfig(format!(
                "custom duration must be a multiple of {CUSTOM_STEP_MINUTES} minutes, got {minutes}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_shapes() {
        let p = SessionConfig::pomodoro("Study", Difficulty::Soft);
        assert_eq!(p.work_minutes, 25);
        assert_eq!(p.break_minutes, 5);
        assert_eq!(p.kind, SessionKind::Pomodoro);

        let d = SessionConfig::deep_work("Coding", Difficulty::Hard);
        assert_eq!(d.work_minutes, 50);
        assert_eq!(d.break_minutes, 0);

        let c = SessionConfig::custom("Reading", Difficulty::Soft, 45);
        assert_eq!(c.work_minutes, 45);
        assert_eq!(c.break_minutes, 0);
        assert_eq!(c.kind, SessionKind::Custom);
    }

    #[test]
    fn custom_bounds() {
        assert!(SessionConfig::validate_custom_minutes(5).is_ok());
        assert!(SessionConfig::validate_custom_minutes(120).is_ok());
        assert!(SessionConfig::validate_custom_minutes(45).is_ok());
        assert!(SessionConfig::validate_custom_minutes(0).is_err());
        assert!(SessionConfig::validate_custom_minutes(4).is_err());
        assert!(SessionConfig::validate_custom_minutes(125).is_err());
        assert!(SessionConfig::validate_custom_minutes(42).is_err());
    }

    #[test]
    fn kind_and_difficulty_strings_round_trip() {
        for kind in [SessionKind::Pomodoro, SessionKind::DeepWork, SessionKind::Custom] {
            assert_eq!(SessionKind::parse(kind.as_str()), Some(kind));
        }
        for diff in [Difficulty::Soft, Difficulty::Hard] {
            assert_eq!(Difficulty::parse(diff.as_str()), Some(diff));
        }
        assert_eq!(SessionKind::parse("Sprint"), None);
    }
}

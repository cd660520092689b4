//! Discrete engine events for subscribers.
//!
//! The engine's watch channel carries the continuous state; everything
//! that happens *once* -- a session starting, a phase boundary, a payout --
//! is broadcast as an `Event`. Serialized with a `type` tag so host shells
//! can forward them over IPC as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Phase, SessionKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        record_id: i64,
        kind: SessionKind,
        category: String,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        phase: Phase,
        round: u32,
        at: DateTime<Utc>,
    },
    DistractionRecorded {
        count: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        record_id: i64,
        duration_minutes: u32,
        coins: u32,
        at: DateTime<Utc>,
    },
    SessionFailed {
        record_id: i64,
        at: DateTime<Utc>,
    },
}

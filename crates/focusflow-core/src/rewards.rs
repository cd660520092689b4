//! Coin reward arithmetic.
//!
//! Completing a session earns
//! `floor(minutes * multiplier / (distractions + 1))` coins, where the
//! multiplier comes from the session difficulty. Pure functions, no state.

use serde::{Deserialize, Serialize};

use crate::session::Difficulty;

/// What one completed session paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardResult {
    /// Minutes credited toward the lifetime focus total.
    pub duration_minutes: u32,
    pub coins: u32,
}

/// Coins earned for a session of `duration_minutes` at `difficulty` with
/// `distractions` recorded interruptions. Every distraction divides the
/// payout; the result is floored to whole coins.
pub fn calculate_coins(duration_minutes: u32, difficulty: Difficulty, distractions: u32) -> u32 {
    let scaled = f64::from(duration_minutes) * difficulty.multiplier();
    (scaled / (f64::from(distractions) + 1.0)).floor() as u32
}

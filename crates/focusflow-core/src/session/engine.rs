//! The async session engine.
//!
//! `SessionEngine` owns the single live [`SessionRun`] slot, drives a
//! 1-second ticker while a session is Active or in Break, persists records
//! through the injected [`SessionStore`], and publishes state to observers:
//! a watch channel carries the continuous [`Snapshot`] stream, a broadcast
//! channel the discrete [`Event`]s.
//!
//! Every operation serializes on the run lock, and snapshots are published
//! under it, so observers never see transitions out of order. The ticker is
//! aborted on pause and cancel; a tick that slips through anyway finds the
//! phase no longer tickable and lands as a no-op.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use crate::blocking::{FocusGuard, GuardResult, NoopGuard};
use crate::error::{Result, SessionError};
use crate::events::Event;
use crate::rewards::{calculate_coins, RewardResult};
use crate::storage::{NewSessionRecord, SessionRecordUpdate, SessionStatus, SessionStore};

use super::config::SessionConfig;
use super::run::{now_ms, Phase, SessionRun, TickOutcome};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Read-only projection of the engine state for UI layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: Phase,
    pub record_id: Option<i64>,
    /// Current Pomodoro round; 1 outside Pomodoro sessions.
    pub round: u32,
    /// Target of the current phase, 0 when idle.
    pub target_minutes: u32,
    pub elapsed_ms: u64,
    pub distractions: u32,
    pub is_paused: bool,
    pub in_break: bool,
}

impl Snapshot {
    /// The between-sessions state.
    pub fn setup() -> Self {
        Self {
            phase: Phase::Setup,
            record_id: None,
            round: 1,
            target_minutes: 0,
            elapsed_ms: 0,
            distractions: 0,
            is_paused: false,
            in_break: false,
        }
    }

    fn of_run(run: &SessionRun, now: u64) -> Self {
        let phase = run.phase();
        Self {
            phase,
            record_id: Some(run.record_id()),
            round: run.round(),
            target_minutes: run.target_minutes(),
            elapsed_ms: run.elapsed_ms(now),
            distractions: run.distractions(),
            is_paused: phase == Phase::Paused,
            in_break: phase == Phase::Break,
        }
    }
}

/// Drives focus sessions for one user. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionEngine {
    store: Arc<dyn SessionStore>,
    guard: Arc<dyn FocusGuard>,
    user_id: i64,
    run: Arc<Mutex<Option<SessionRun>>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    snapshot_tx: Arc<watch::Sender<Snapshot>>,
    event_tx: broadcast::Sender<Event>,
}

impl SessionEngine {
    /// Engine for `user_id`, persisting through `store`, without a
    /// blocking guard.
    pub fn new(store: Arc<dyn SessionStore>, user_id: i64) -> Self {
        Self::with_guard(store, user_id, Arc::new(NoopGuard))
    }

    /// Engine with a [`FocusGuard`] receiving blocking-intent signals.
    pub fn with_guard(
        store: Arc<dyn SessionStore>,
        user_id: i64,
        guard: Arc<dyn FocusGuard>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::setup());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            guard,
            user_id,
            run: Arc::new(Mutex::new(None)),
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            snapshot_tx: Arc::new(snapshot_tx),
            event_tx,
        }
    }

    // ── Observation ─────────────────────────────────────────────────────

    /// Current state; [`Phase::Setup`] when no session is live.
    pub async fn snapshot(&self) -> Snapshot {
        match self.run.lock().await.as_ref() {
            Some(run) => Snapshot::of_run(run, now_ms()),
            None => Snapshot::setup(),
        }
    }

    /// Watch the snapshot stream. A new value lands on every transition
    /// and every tick.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Receive discrete engine events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Start a session: persist an `InProgress` record, arm the ticker,
    /// and signal the guard. Fails with [`SessionError::InvalidState`] if
    /// a session is already live, leaving it untouched.
    pub async fn start(&self, config: SessionConfig) -> Result<Snapshot> {
        if config.work_minutes == 0 {
            return Err(
                SessionError::InvalidConfig("work_minutes must be positive".into()).into(),
            );
        }
        let kind = config.kind;
        let difficulty = config.difficulty;
        let work_minutes = config.work_minutes;
        let category = config.category.clone();

        let (record_id, snapshot) = {
            let mut slot = self.run.lock().await;
            if let Some(run) = slot.as_ref() {
                return Err(SessionError::InvalidState {
                    operation: "start",
                    phase: run.phase(),
                }
                .into());
            }
            let started_at = Utc::now();
            let record_id = self
                .store
                .create_session_record(NewSessionRecord {
                    user_id: self.user_id,
                    category: category.clone(),
                    started_at,
                    duration_minutes: work_minutes,
                    status: SessionStatus::InProgress,
                    coins_earned: 0,
                    kind,
                    difficulty,
                })
                .await?;
            let run = SessionRun::new(config, record_id, now_ms(), started_at);
            let snapshot = Snapshot::of_run(&run, now_ms());
            *slot = Some(run);
            self.emit(Event::SessionStarted {
                record_id,
                kind,
                category,
                at: started_at,
            });
            self.publish(snapshot.clone());
            (record_id, snapshot)
        };
        info!(
            "session {record_id} started: {} {} for {work_minutes} min",
            kind.as_str(),
            difficulty.as_str(),
        );
        self.spawn_ticker().await;
        self.signal("on_work_start", self.guard.on_work_start(difficulty, work_minutes));
        Ok(snapshot)
    }

    /// Advance the engine clock to `now` (epoch ms). Called by the internal
    /// ticker once a second; public so hosts and tests can drive time
    /// explicitly. Returns false once the phase is no longer tickable.
    pub async fn tick(&self, now: u64) -> bool {
        let mut slot = self.run.lock().await;
        let Some(run) = slot.as_mut() else {
            return false;
        };
        match run.tick(now) {
            TickOutcome::Skipped => false,
            TickOutcome::Running => {
                self.publish(Snapshot::of_run(run, now));
                true
            }
            TickOutcome::BreakStarted => {
                let snapshot = Snapshot::of_run(run, now);
                let break_minutes = run.config().break_minutes;
                let record_id = run.record_id();
                self.emit(Event::PhaseChanged {
                    phase: Phase::Break,
                    round: snapshot.round,
                    at: Utc::now(),
                });
                self.publish(snapshot);
                drop(slot);
                info!("session {record_id}: work round done, break begins");
                self.signal("on_break_start", self.guard.on_break_start(break_minutes));
                true
            }
            TickOutcome::RoundStarted(round) => {
                let snapshot = Snapshot::of_run(run, now);
                let difficulty = run.config().difficulty;
                let work_minutes = run.config().work_minutes;
                let record_id = run.record_id();
                self.emit(Event::PhaseChanged {
                    phase: Phase::Active,
                    round,
                    at: Utc::now(),
                });
                self.publish(snapshot);
                drop(slot);
                info!("session {record_id}: break over, round {round} begins");
                self.signal("on_work_start", self.guard.on_work_start(difficulty, work_minutes));
                true
            }
            TickOutcome::TargetReached => {
                let Some(mut run) = slot.take() else {
                    return false;
                };
                let minutes = run.finish(now);
                self.publish(Snapshot::setup());
                drop(slot);
                // settle off the ticker task so an abort cannot lose the write
                let engine = self.clone();
                tokio::spawn(async move {
                    if let Err(err) = engine.settle_completed(run, minutes).await {
                        error!("failed to settle completed session: {err}");
                    }
                });
                false
            }
        }
    }

    /// Freeze the session clock. A logged no-op unless Active.
    pub async fn pause(&self) {
        let record_id = {
            let mut slot = self.run.lock().await;
            let Some(run) = slot.as_mut() else {
                debug!("pause with no active session");
                return;
            };
            let now = now_ms();
            if !run.pause(now) {
                debug!("pause ignored in phase {:?}", run.phase());
                return;
            }
            let snapshot = Snapshot::of_run(run, now);
            self.emit(Event::PhaseChanged {
                phase: Phase::Paused,
                round: snapshot.round,
                at: Utc::now(),
            });
            self.publish(snapshot);
            run.record_id()
        };
        self.cancel_ticker().await;
        self.signal("on_pause", self.guard.on_pause());
        info!("session {record_id} paused");
    }

    /// Resume a paused session exactly where it stopped.
    pub async fn resume(&self) {
        let (record_id, difficulty, work_minutes) = {
            let mut slot = self.run.lock().await;
            let Some(run) = slot.as_mut() else {
                debug!("resume with no active session");
                return;
            };
            if !run.resume(now_ms()) {
                debug!("resume ignored in phase {:?}", run.phase());
                return;
            }
            let snapshot = Snapshot::of_run(run, now_ms());
            self.emit(Event::PhaseChanged {
                phase: Phase::Active,
                round: snapshot.round,
                at: Utc::now(),
            });
            self.publish(snapshot);
            (
                run.record_id(),
                run.config().difficulty,
                run.config().work_minutes,
            )
        };
        self.spawn_ticker().await;
        self.signal("on_work_start", self.guard.on_work_start(difficulty, work_minutes));
        info!("session {record_id} resumed");
    }

    /// Count a distraction against the running session. Only counted while
    /// Active; the payout divides by the final count.
    pub async fn record_distraction(&self) {
        let mut slot = self.run.lock().await;
        let Some(run) = slot.as_mut() else {
            debug!("distraction with no active session");
            return;
        };
        if !run.record_distraction() {
            debug!("distraction ignored in phase {:?}", run.phase());
            return;
        }
        self.emit(Event::DistractionRecorded {
            count: run.distractions(),
            at: Utc::now(),
        });
        self.publish(Snapshot::of_run(run, now_ms()));
    }

    /// Finish the session now and settle it: the record is updated in
    /// place, coins and focus minutes are credited, and the reward comes
    /// back. `Ok(None)` when no session is live.
    pub async fn complete(&self) -> Result<Option<RewardResult>> {
        let now = now_ms();
        let taken = {
            let mut slot = self.run.lock().await;
            let run = slot.take();
            if run.is_some() {
                self.publish(Snapshot::setup());
            }
            run
        };
        let Some(mut run) = taken else {
            debug!("complete with no active session");
            return Ok(None);
        };
        let minutes = run.finish(now);
        self.cancel_ticker().await;
        let reward = self.settle_completed(run, minutes).await?;
        Ok(Some(reward))
    }

    /// Abandon the session: the record is marked Failed with zero coins
    /// and nothing is credited. A logged no-op when no session is live.
    pub async fn cancel(&self) -> Result<()> {
        let taken = {
            let mut slot = self.run.lock().await;
            let run = slot.take();
            if run.is_some() {
                self.publish(Snapshot::setup());
            }
            run
        };
        let Some(mut run) = taken else {
            debug!("cancel with no active session");
            return Ok(());
        };
        run.fail();
        self.cancel_ticker().await;
        self.emit(Event::SessionFailed {
            record_id: run.record_id(),
            at: Utc::now(),
        });
        self.store
            .update_session_record(SessionRecordUpdate {
                id: run.record_id(),
                status: SessionStatus::Failed,
                duration_minutes: run.config().work_minutes,
                distractions: run.distractions(),
                coins_earned: 0,
            })
            .await?;
        info!("session {} cancelled, no coins awarded", run.record_id());
        self.signal("on_session_end", self.guard.on_session_end());
        Ok(())
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn settle_completed(&self, run: SessionRun, minutes: u32) -> Result<RewardResult> {
        let coins = calculate_coins(minutes, run.config().difficulty, run.distractions());
        self.store
            .update_session_record(SessionRecordUpdate {
                id: run.record_id(),
                status: SessionStatus::Completed,
                duration_minutes: minutes,
                distractions: run.distractions(),
                coins_earned: coins,
            })
            .await?;
        self.store.credit_coins(self.user_id, coins).await?;
        self.store.credit_focus_minutes(self.user_id, minutes).await?;
        info!(
            "session {} completed: {minutes} min credited, {coins} coins",
            run.record_id()
        );
        self.signal("on_session_end", self.guard.on_session_end());
        self.emit(Event::SessionCompleted {
            record_id: run.record_id(),
            duration_minutes: minutes,
            coins,
            at: Utc::now(),
        });
        Ok(RewardResult {
            duration_minutes: minutes,
            coins,
        })
    }

    async fn spawn_ticker(&self) {
        let mut ticker = self.ticker.lock().await;
        if let Some(handle) = ticker.take() {
            handle.abort();
        }
        let engine = self.clone();
        let period = self.tick_interval;
        *ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                if !engine.tick(now_ms()).await {
                    break;
                }
            }
        }));
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        self.snapshot_tx.send_replace(snapshot);
    }

    fn emit(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    fn signal(&self, hook: &str, result: GuardResult) {
        if let Err(err) = result {
            warn!("focus guard {hook} failed: {err}");
        }
    }
}

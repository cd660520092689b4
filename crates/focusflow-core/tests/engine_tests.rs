//! Integration tests for the session engine lifecycle.
//!
//! The engine runs against a recording store so persistence calls can be
//! asserted without SQLite. Time is driven through explicit `tick` calls
//! far ahead of the wall clock; the internal one-second ticker keeps
//! running but never crosses a phase target on its own.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use focusflow_core::blocking::GuardResult;
use focusflow_core::storage::{FocusSession, NewSessionRecord, SessionRecordUpdate, SessionStatus};
use focusflow_core::{
    CoreError, Difficulty, Event, FocusGuard, Phase, Result, SessionConfig, SessionEngine,
    SessionError, SessionKind, SessionStore,
};

const MINUTE_MS: u64 = 60_000;
const SLACK_MS: u64 = 2_000;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

/// In-memory store that records every persistence call.
#[derive(Default)]
struct RecordingStore {
    next_id: AtomicI64,
    created: Mutex<Vec<NewSessionRecord>>,
    updates: Mutex<Vec<SessionRecordUpdate>>,
    coin_credits: Mutex<Vec<(i64, u32)>>,
    minute_credits: Mutex<Vec<(i64, u32)>>,
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn create_session_record(&self, new: NewSessionRecord) -> Result<i64> {
        self.created.lock().unwrap().push(new);
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn update_session_record(&self, update: SessionRecordUpdate) -> Result<()> {
        self.updates.lock().unwrap().push(update);
        Ok(())
    }

    async fn credit_coins(&self, user_id: i64, amount: u32) -> Result<()> {
        self.coin_credits.lock().unwrap().push((user_id, amount));
        Ok(())
    }

    async fn credit_focus_minutes(&self, user_id: i64, minutes: u32) -> Result<()> {
        self.minute_credits.lock().unwrap().push((user_id, minutes));
        Ok(())
    }

    async fn fetch_session_by_id(&self, _id: i64) -> Result<Option<FocusSession>> {
        Ok(None)
    }
}

/// Guard that records which hooks fired, in order.
#[derive(Default)]
struct RecordingGuard {
    calls: Mutex<Vec<&'static str>>,
}

impl FocusGuard for RecordingGuard {
    fn on_work_start(&self, _difficulty: Difficulty, _minutes: u32) -> GuardResult {
        self.calls.lock().unwrap().push("work");
        Ok(())
    }

    fn on_break_start(&self, _minutes: u32) -> GuardResult {
        self.calls.lock().unwrap().push("break");
        Ok(())
    }

    fn on_pause(&self) -> GuardResult {
        self.calls.lock().unwrap().push("pause");
        Ok(())
    }

    fn on_session_end(&self) -> GuardResult {
        self.calls.lock().unwrap().push("end");
        Ok(())
    }
}

fn engine_with_store() -> (SessionEngine, Arc<RecordingStore>) {
    let store = Arc::new(RecordingStore::default());
    (SessionEngine::new(store.clone(), 1), store)
}

/// Ticker-driven completions settle on a detached task; wait for the final
/// store write (the focus-minute credit) to land.
async fn wait_for_settlement(store: &RecordingStore) {
    for _ in 0..200 {
        if !store.minute_credits.lock().unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session settlement never reached the store");
}

#[tokio::test]
async fn test_start_records_an_in_progress_session() {
    let store = Arc::new(RecordingStore::default());
    let engine = SessionEngine::new(store.clone(), 7);

    let snapshot = engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Soft))
        .await
        .unwrap();
    assert_eq!(snapshot.phase, Phase::Active);
    assert_eq!(snapshot.record_id, Some(1));
    assert_eq!(snapshot.round, 1);
    assert_eq!(snapshot.target_minutes, 25);
    assert_eq!(snapshot.distractions, 0);

    let created = store.created.lock().unwrap()[0].clone();
    assert_eq!(created.user_id, 7);
    assert_eq!(created.category, "Study");
    assert_eq!(created.status, SessionStatus::InProgress);
    assert_eq!(created.duration_minutes, 25);
    assert_eq!(created.coins_earned, 0);
    assert_eq!(created.kind, SessionKind::Pomodoro);
}

#[tokio::test]
async fn test_start_is_rejected_while_a_session_is_live() {
    let (engine, store) = engine_with_store();
    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Soft))
        .await
        .unwrap();

    let err = engine
        .start(SessionConfig::deep_work("Research", Difficulty::Hard))
        .await
        .unwrap_err();
    match err {
        CoreError::Session(SessionError::InvalidState { operation, phase }) => {
            assert_eq!(operation, "start");
            assert_eq!(phase, Phase::Active);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.created.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_zero_minute_config_is_rejected() {
    let (engine, store) = engine_with_store();
    let err = engine
        .start(SessionConfig::custom("Nothing", Difficulty::Soft, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Session(SessionError::InvalidConfig(_))
    ));
    assert!(store.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_completing_a_pomodoro_round_pays_out() {
    let (engine, store) = engine_with_store();
    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Soft))
        .await
        .unwrap();

    let reward = engine.complete().await.unwrap().unwrap();
    assert_eq!(reward.duration_minutes, 25);
    assert_eq!(reward.coins, 25);

    let update = store.updates.lock().unwrap()[0].clone();
    assert_eq!(update.id, 1);
    assert_eq!(update.status, SessionStatus::Completed);
    assert_eq!(update.duration_minutes, 25);
    assert_eq!(update.distractions, 0);
    assert_eq!(update.coins_earned, 25);
    assert_eq!(store.coin_credits.lock().unwrap().as_slice(), &[(1, 25)][..]);
    assert_eq!(
        store.minute_credits.lock().unwrap().as_slice(),
        &[(1, 25)][..]
    );
    assert_eq!(engine.snapshot().await.phase, Phase::Setup);
}

#[tokio::test]
async fn test_hard_mode_pays_half_again() {
    let (engine, _store) = engine_with_store();
    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Hard))
        .await
        .unwrap();

    let reward = engine.complete().await.unwrap().unwrap();
    // floor(25 * 1.5)
    assert_eq!(reward.coins, 37);
}

#[tokio::test]
async fn test_deep_work_settles_itself_at_target() {
    let (engine, store) = engine_with_store();
    let mut events = engine.events();
    engine
        .start(SessionConfig::deep_work("Research", Difficulty::Soft))
        .await
        .unwrap();

    let keep_ticking = engine.tick(now_ms() + 50 * MINUTE_MS + SLACK_MS).await;
    assert!(!keep_ticking);

    wait_for_settlement(&store).await;
    let update = store.updates.lock().unwrap()[0].clone();
    assert_eq!(update.status, SessionStatus::Completed);
    assert_eq!(update.duration_minutes, 50);
    assert_eq!(update.coins_earned, 50);
    assert_eq!(store.coin_credits.lock().unwrap().as_slice(), &[(1, 50)][..]);
    assert_eq!(
        store.minute_credits.lock().unwrap().as_slice(),
        &[(1, 50)][..]
    );
    assert_eq!(engine.snapshot().await.phase, Phase::Setup);

    loop {
        match events.recv().await.unwrap() {
            Event::SessionCompleted {
                duration_minutes,
                coins,
                ..
            } => {
                assert_eq!(duration_minutes, 50);
                assert_eq!(coins, 50);
                break;
            }
            _ => continue,
        }
    }
}

#[tokio::test]
async fn test_full_pomodoro_cycle_credits_every_round() {
    let (engine, store) = engine_with_store();
    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Soft))
        .await
        .unwrap();

    let mut t = now_ms();
    let mut keep_ticking = true;
    for round in 1..=4u32 {
        t += 25 * MINUTE_MS + SLACK_MS;
        keep_ticking = engine.tick(t).await;
        assert!(keep_ticking);
        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Break);
        assert_eq!(snapshot.round, round);

        t += 5 * MINUTE_MS + SLACK_MS;
        keep_ticking = engine.tick(t).await;
    }
    // the fourth break ends the session
    assert!(!keep_ticking);

    wait_for_settlement(&store).await;
    let update = store.updates.lock().unwrap()[0].clone();
    assert_eq!(update.status, SessionStatus::Completed);
    assert_eq!(update.duration_minutes, 100);
    assert_eq!(update.coins_earned, 100);
    assert_eq!(
        store.minute_credits.lock().unwrap().as_slice(),
        &[(1, 100)][..]
    );
}

#[tokio::test]
async fn test_cancel_marks_the_record_failed_without_pay() {
    let (engine, store) = engine_with_store();
    engine
        .start(SessionConfig::custom("Reading", Difficulty::Soft, 30))
        .await
        .unwrap();
    engine.record_distraction().await;
    engine.record_distraction().await;
    engine.cancel().await.unwrap();

    let update = store.updates.lock().unwrap()[0].clone();
    assert_eq!(update.status, SessionStatus::Failed);
    assert_eq!(update.duration_minutes, 30);
    assert_eq!(update.distractions, 2);
    assert_eq!(update.coins_earned, 0);
    assert!(store.coin_credits.lock().unwrap().is_empty());
    assert!(store.minute_credits.lock().unwrap().is_empty());
    assert_eq!(engine.snapshot().await.phase, Phase::Setup);
}

#[tokio::test]
async fn test_distractions_count_only_while_active() {
    let (engine, store) = engine_with_store();
    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Soft))
        .await
        .unwrap();

    engine.record_distraction().await; // active: counts
    engine.pause().await;
    engine.record_distraction().await; // paused: ignored
    engine.resume().await;
    engine.record_distraction().await; // active again: counts

    engine.tick(now_ms() + 25 * MINUTE_MS + SLACK_MS).await;
    assert_eq!(engine.snapshot().await.phase, Phase::Break);
    engine.record_distraction().await; // break: ignored

    let reward = engine.complete().await.unwrap().unwrap();
    assert_eq!(reward.duration_minutes, 25);
    // floor(25 / 3)
    assert_eq!(reward.coins, 8);
    assert_eq!(store.updates.lock().unwrap()[0].distractions, 2);
}

#[tokio::test]
async fn test_pause_freezes_the_clock() {
    let (engine, _store) = engine_with_store();
    engine
        .start(SessionConfig::custom("Writing", Difficulty::Soft, 45))
        .await
        .unwrap();
    engine.pause().await;

    let frozen = engine.snapshot().await;
    assert_eq!(frozen.phase, Phase::Paused);
    assert!(frozen.is_paused);

    // a tick far past the target lands as a no-op
    assert!(!engine.tick(now_ms() + 45 * MINUTE_MS + SLACK_MS).await);
    let after = engine.snapshot().await;
    assert_eq!(after.phase, Phase::Paused);
    assert_eq!(after.elapsed_ms, frozen.elapsed_ms);

    engine.resume().await;
    assert_eq!(engine.snapshot().await.phase, Phase::Active);
}

#[tokio::test]
async fn test_complete_and_cancel_without_a_session_are_noops() {
    let (engine, store) = engine_with_store();
    assert!(engine.complete().await.unwrap().is_none());
    engine.cancel().await.unwrap();
    assert!(store.created.lock().unwrap().is_empty());
    assert!(store.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_guard_hears_the_session_lifecycle() {
    let store = Arc::new(RecordingStore::default());
    let guard = Arc::new(RecordingGuard::default());
    let engine = SessionEngine::with_guard(store, 1, guard.clone());

    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Hard))
        .await
        .unwrap();
    engine.pause().await;
    engine.resume().await;
    engine.complete().await.unwrap();

    assert_eq!(
        guard.calls.lock().unwrap().as_slice(),
        &["work", "pause", "work", "end"][..]
    );
}

#[tokio::test]
async fn test_events_trace_the_lifecycle() {
    let (engine, _store) = engine_with_store();
    let mut events = engine.events();

    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Soft))
        .await
        .unwrap();
    engine.pause().await;
    engine.resume().await;
    engine.cancel().await.unwrap();

    assert!(matches!(
        events.recv().await.unwrap(),
        Event::SessionStarted { record_id: 1, .. }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::PhaseChanged {
            phase: Phase::Paused,
            ..
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::PhaseChanged {
            phase: Phase::Active,
            ..
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::SessionFailed { record_id: 1, .. }
    ));
}

#[tokio::test]
async fn test_snapshot_stream_follows_transitions() {
    let (engine, _store) = engine_with_store();
    let rx = engine.subscribe();
    assert_eq!(rx.borrow().phase, Phase::Setup);

    engine
        .start(SessionConfig::deep_work("Research", Difficulty::Soft))
        .await
        .unwrap();
    assert_eq!(rx.borrow().phase, Phase::Active);

    engine.pause().await;
    {
        let paused = rx.borrow();
        assert_eq!(paused.phase, Phase::Paused);
        assert!(paused.is_paused);
    }

    engine.cancel().await.unwrap();
    assert_eq!(rx.borrow().phase, Phase::Setup);
}

#[tokio::test]
async fn test_restart_is_allowed_after_completion() {
    let (engine, store) = engine_with_store();
    engine
        .start(SessionConfig::pomodoro("Study", Difficulty::Soft))
        .await
        .unwrap();
    engine.complete().await.unwrap();

    let snapshot = engine
        .start(SessionConfig::custom("Review", Difficulty::Soft, 20))
        .await
        .unwrap();
    assert_eq!(snapshot.record_id, Some(2));
    assert_eq!(store.created.lock().unwrap().len(), 2);
}

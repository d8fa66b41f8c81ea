use std::{path::PathBuf, time::Duration};

use rand::{rngs::StdRng, SeedableRng};
use tokio::time::sleep;
use uuid::Uuid;

use vetta::{
    db::{CandidateQuery, Database},
    questions,
    scoring::{SUMMARY_AVERAGE, SUMMARY_BELOW_AVERAGE, SUMMARY_EXCELLENT, SUMMARY_GOOD},
    session::{InterviewState, SessionController, SessionEvent, SubmitOutcome},
};

fn temp_db() -> (Database, PathBuf) {
    let path = std::env::temp_dir().join(format!("vetta-flow-test-{}.sqlite3", Uuid::new_v4()));
    let db = Database::new(path.clone()).unwrap();
    (db, path)
}

fn cleanup(db: Database, path: PathBuf) {
    drop(db);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

/// Polls until `predicate` holds or the timeout elapses.
async fn wait_for<F, Fut>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn full_session_completes_and_reaches_the_candidate_store() {
    let (db, path) = temp_db();
    let controller = SessionController::with_seed(db.clone(), 7);
    let mut events = controller.subscribe();

    controller
        .set_candidate_info(
            Some("Jane Doe".into()),
            Some("jane@example.com".into()),
            Some("555-0164".into()),
            Some("resume".into()),
        )
        .await;

    let state = controller.start_interview().await.unwrap();
    assert!(state.is_started);
    assert_eq!(state.current_index, 0);
    assert_eq!(state.time_remaining, 20);
    assert_eq!(state.questions.len(), 6);
    assert!(!state.session_id.is_empty());
    let session_id = state.session_id.clone();

    for i in 0..6 {
        let outcome = controller
            .submit_answer(format!(
                "Answer {i}: a reasonably detailed response covering the question in depth."
            ))
            .await
            .unwrap();
        if i < 5 {
            assert!(matches!(outcome, SubmitOutcome::Advanced { .. }));
        } else {
            assert!(matches!(outcome, SubmitOutcome::Completed(_)));
        }
    }

    let finished = controller.get_state().await;
    assert!(finished.is_completed);
    assert_eq!(finished.current_index, 6);
    assert!(finished.total_score <= 100);
    assert!([
        SUMMARY_EXCELLENT,
        SUMMARY_GOOD,
        SUMMARY_AVERAGE,
        SUMMARY_BELOW_AVERAGE
    ]
    .contains(&finished.summary.as_str()));

    // The completed record landed in the candidate store.
    let listed = db.list_candidates(CandidateQuery::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, session_id);
    assert_eq!(listed[0].name, "Jane Doe");
    assert_eq!(listed[0].total_score, finished.total_score);
    assert_eq!(listed[0].answers.len(), 6);

    // The in-flight snapshot is gone once the session completed.
    assert!(db.load_session_snapshot().await.unwrap().is_none());

    // The event stream saw the completion.
    let mut saw_completion = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::SessionCompleted { session_id: id, .. } = event {
            assert_eq!(id, session_id);
            saw_completion = true;
        }
    }
    assert!(saw_completion);

    cleanup(db, path);
}

#[tokio::test]
async fn countdown_expiry_auto_submits_the_draft_answer() {
    let (db, path) = temp_db();
    let controller = SessionController::with_seed(db.clone(), 11)
        .with_tick_interval(Duration::from_millis(10));

    controller.start_interview().await.unwrap();
    controller
        .set_draft_answer("half-typed thought".into())
        .await;

    // 20 ticks at 10ms drain the first easy question.
    let advanced = wait_for(
        || async { controller.get_state().await.current_index >= 1 },
        Duration::from_secs(5),
    )
    .await;
    assert!(advanced, "countdown never expired the first question");

    let state = controller.get_state().await;
    assert_eq!(state.answers[0].question_id, "easy_1");
    assert_eq!(state.answers[0].text, "half-typed thought");
    assert_eq!(state.answers[0].time_spent_secs, 20);

    controller.reset().await.unwrap();
    cleanup(db, path);
}

#[tokio::test]
async fn pause_freezes_the_countdown_until_resume() {
    let (db, path) = temp_db();
    let controller = SessionController::with_seed(db.clone(), 3)
        .with_tick_interval(Duration::from_millis(10));

    controller.start_interview().await.unwrap();
    let paused = controller.pause().await;
    assert!(paused.is_paused);
    let frozen_at = paused.time_remaining;

    sleep(Duration::from_millis(200)).await;
    assert_eq!(controller.get_state().await.time_remaining, frozen_at);

    controller.resume().await;
    let moved = wait_for(
        || async { controller.get_state().await.time_remaining < frozen_at },
        Duration::from_secs(5),
    )
    .await;
    assert!(moved, "countdown did not resume after unpause");

    controller.reset().await.unwrap();
    cleanup(db, path);
}

#[tokio::test]
async fn reset_discards_the_session_and_stops_the_ticker() {
    let (db, path) = temp_db();
    let controller = SessionController::with_seed(db.clone(), 5)
        .with_tick_interval(Duration::from_millis(10));

    controller.start_interview().await.unwrap();
    controller.submit_answer("one answer".into()).await.unwrap();
    controller.reset().await.unwrap();

    let state = controller.get_state().await;
    assert_eq!(state, InterviewState::new());
    assert!(db.load_session_snapshot().await.unwrap().is_none());

    // No stale tick resurrects the countdown after the reset.
    sleep(Duration::from_millis(150)).await;
    assert_eq!(controller.get_state().await, InterviewState::new());

    // A fresh start behaves like a first-ever start.
    let restarted = controller.start_interview().await.unwrap();
    assert_eq!(restarted.current_index, 0);
    assert_eq!(restarted.time_remaining, 20);
    assert!(restarted.answers.is_empty());

    controller.reset().await.unwrap();
    cleanup(db, path);
}

#[tokio::test]
async fn interrupted_session_can_be_resumed_from_its_snapshot() {
    let (db, path) = temp_db();

    // Simulate a previous process: an active session persisted mid-interview.
    let mut rng = StdRng::seed_from_u64(23);
    let mut state = InterviewState::new();
    state
        .start(questions::generate(&mut rng), "interrupted-session".into())
        .unwrap();
    state.submit_answer("first answer".into(), 10, &mut rng);
    state.tick(7);
    db.save_session_snapshot(&state).await.unwrap();

    let stored = db.load_session_snapshot().await.unwrap().unwrap();
    assert!(stored.was_active);

    let controller = SessionController::with_seed(db.clone(), 29)
        .with_tick_interval(Duration::from_millis(10));
    let resumed = controller.resume_from_snapshot(stored.state).await.unwrap();
    assert_eq!(resumed.session_id, "interrupted-session");
    assert_eq!(resumed.current_index, 1);
    assert_eq!(resumed.answers.len(), 1);

    // The countdown picks up from the stored remaining time.
    let ticking = wait_for(
        || async {
            let now = controller.get_state().await.time_remaining;
            now < 7
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(ticking, "resumed session never ticked");

    controller.reset().await.unwrap();
    cleanup(db, path);
}

#[tokio::test]
async fn resume_from_snapshot_rejects_completed_sessions() {
    let (db, path) = temp_db();

    let mut rng = StdRng::seed_from_u64(31);
    let mut state = InterviewState::new();
    state
        .start(questions::generate(&mut rng), "finished-session".into())
        .unwrap();
    for _ in 0..6 {
        state.submit_answer("answer".into(), 10, &mut rng);
    }
    assert!(state.is_completed);

    let controller = SessionController::with_seed(db.clone(), 37);
    assert!(controller.resume_from_snapshot(state).await.is_err());

    cleanup(db, path);
}

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use log::{error, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{db::Database, models::CandidateRecord, questions};

use super::state::{InterviewState, SubmitOutcome};

/// Snapshot persistence cadence while the countdown runs.
const SNAPSHOT_EVERY_TICKS: u32 = 5;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    StateChanged {
        state: InterviewState,
    },
    CountdownTick {
        question_id: String,
        time_remaining: u32,
    },
    QuestionAdvanced {
        index: usize,
        time_remaining: u32,
    },
    SessionCompleted {
        session_id: String,
        record: CandidateRecord,
    },
}

enum TickOutcome {
    Stopped,
    Paused,
    Remaining(u32),
}

struct TickerHandle {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Async owner of one interview session: wraps the state machine in a mutex,
/// drives the 1 Hz countdown, persists snapshots and hands completed records
/// to the candidate store. A single session at a time; every transition
/// serializes on the state lock.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<InterviewState>>,
    db: Database,
    rng: Arc<Mutex<StdRng>>,
    events: broadcast::Sender<SessionEvent>,
    ticker: Arc<Mutex<Option<TickerHandle>>>,
    /// Answer text entered so far, used when the countdown expires.
    draft: Arc<Mutex<String>>,
    tick_interval: Duration,
}

impl SessionController {
    pub fn new(db: Database) -> Self {
        Self::with_rng(db, StdRng::from_entropy())
    }

    /// Seeded variant for deterministic question/score draws in tests.
    pub fn with_seed(db: Database, seed: u64) -> Self {
        Self::with_rng(db, StdRng::seed_from_u64(seed))
    }

    fn with_rng(db: Database, rng: StdRng) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(InterviewState::new())),
            db,
            rng: Arc::new(Mutex::new(rng)),
            events,
            ticker: Arc::new(Mutex::new(None)),
            draft: Arc::new(Mutex::new(String::new())),
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Overrides the tick cadence; tests compress the countdown with this.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> InterviewState {
        self.state.lock().await.clone()
    }

    pub async fn set_candidate_info(
        &self,
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        resume_text: Option<String>,
    ) {
        let mut state = self.state.lock().await;
        state.set_profile(name, email, phone, resume_text);
    }

    /// Stores the entered-so-far answer text; the timeout auto-submit uses it.
    pub async fn set_draft_answer(&self, text: String) {
        *self.draft.lock().await = text;
    }

    /// Generates the question sequence, assigns a session id and starts the
    /// countdown. Fails if a session is already in progress.
    pub async fn start_interview(&self) -> Result<InterviewState> {
        let session_id = Uuid::new_v4().to_string();
        let question_set = {
            let mut rng = self.rng.lock().await;
            questions::generate(&mut *rng)
        };

        {
            let mut state = self.state.lock().await;
            state.start(question_set, session_id.clone())?;
        }
        self.draft.lock().await.clear();

        self.persist_snapshot().await?;
        self.spawn_ticker().await;

        info!("Interview session {session_id} started");
        self.emit_state_changed().await;
        Ok(self.get_state().await)
    }

    /// Re-adopts a session persisted before a restart and resumes the
    /// countdown from its stored `time_remaining`.
    pub async fn resume_from_snapshot(&self, snapshot: InterviewState) -> Result<InterviewState> {
        if !snapshot.is_active() {
            bail!("snapshot does not contain an in-progress session");
        }

        {
            let mut state = self.state.lock().await;
            if state.is_started {
                bail!("an interview is already in progress");
            }
            *state = snapshot;
        }
        self.draft.lock().await.clear();

        self.spawn_ticker().await;

        let state = self.get_state().await;
        info!(
            "Resumed interview session {} at question {} with {}s remaining",
            state.session_id,
            state.current_index + 1,
            state.time_remaining
        );
        self.emit_state_changed().await;
        Ok(state)
    }

    /// Records the answer for the current question, computing time spent from
    /// the countdown. On the final question this scores the session, stores
    /// the completed record and stops the timer.
    pub async fn submit_answer(&self, text: String) -> Result<SubmitOutcome> {
        let outcome = {
            let mut state = self.state.lock().await;
            let time_spent = state
                .current_question()
                .map(|q| q.time_limit_secs.saturating_sub(state.time_remaining))
                .unwrap_or(0);
            let mut rng = self.rng.lock().await;
            state.submit_answer(text, time_spent, &mut *rng)
        };

        self.draft.lock().await.clear();
        self.after_submit(&outcome).await?;
        Ok(outcome)
    }

    pub async fn pause(&self) -> InterviewState {
        {
            let mut state = self.state.lock().await;
            if !state.is_active() {
                warn!("Ignoring pause outside an active session");
                return state.clone();
            }
            state.pause();
        }

        if let Err(err) = self.persist_snapshot().await {
            error!("Failed to persist snapshot on pause: {err:#}");
        }
        self.emit_state_changed().await;
        self.get_state().await
    }

    pub async fn resume(&self) -> InterviewState {
        {
            let mut state = self.state.lock().await;
            if !state.is_active() {
                warn!("Ignoring resume outside an active session");
                return state.clone();
            }
            state.resume();
        }

        if let Err(err) = self.persist_snapshot().await {
            error!("Failed to persist snapshot on resume: {err:#}");
        }
        self.emit_state_changed().await;
        self.get_state().await
    }

    /// Discards the session and returns to idle. The ticker is cancelled
    /// before the state changes so a stale tick cannot land after the reset.
    pub async fn reset(&self) -> Result<()> {
        self.cancel_ticker().await;

        {
            let mut state = self.state.lock().await;
            state.reset();
        }
        self.draft.lock().await.clear();

        self.db.clear_session_snapshot().await?;
        self.emit_state_changed().await;
        Ok(())
    }

    async fn after_submit(&self, outcome: &SubmitOutcome) -> Result<()> {
        match outcome {
            SubmitOutcome::Ignored => {
                warn!("Ignoring answer submission outside an active session");
            }
            SubmitOutcome::Advanced {
                next_index,
                time_remaining,
            } => {
                self.persist_snapshot().await?;
                let _ = self.events.send(SessionEvent::QuestionAdvanced {
                    index: *next_index,
                    time_remaining: *time_remaining,
                });
            }
            SubmitOutcome::Completed(record) => {
                self.db.upsert_candidate(record).await?;
                self.db.clear_session_snapshot().await?;
                info!(
                    "Interview session {} completed with score {}",
                    record.id, record.total_score
                );
                let _ = self.events.send(SessionEvent::SessionCompleted {
                    session_id: record.id.clone(),
                    record: (**record).clone(),
                });
                self.emit_state_changed().await;
                // Graceful stop; the loop also exits on its own once the
                // state is no longer active.
                self.stop_ticker().await;
            }
        }
        Ok(())
    }

    async fn spawn_ticker(&self) {
        let mut guard = self.ticker.lock().await;
        if let Some(old) = guard.take() {
            old.cancel.cancel();
            old.handle.abort();
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controller = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            // The first interval tick completes immediately; swallow it so the
            // countdown moves one full interval after start.
            interval.tick().await;
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match controller.advance_countdown().await {
                    TickOutcome::Stopped => break,
                    TickOutcome::Paused => continue,
                    TickOutcome::Remaining(remaining) => {
                        ticks = ticks.wrapping_add(1);
                        if ticks % SNAPSHOT_EVERY_TICKS == 0 {
                            if let Err(err) = controller.persist_snapshot().await {
                                error!("Failed to persist session snapshot: {err:#}");
                            }
                        }

                        if remaining == 0 {
                            let draft = controller.draft.lock().await.clone();
                            if let Err(err) = controller.auto_submit(draft).await {
                                error!("Auto-submit at timeout failed: {err:#}");
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(TickerHandle { handle, cancel });
    }

    /// Delivers one countdown decrement to the state machine.
    async fn advance_countdown(&self) -> TickOutcome {
        let (question_id, remaining) = {
            let mut state = self.state.lock().await;
            if !state.is_active() {
                return TickOutcome::Stopped;
            }
            if state.is_paused {
                return TickOutcome::Paused;
            }

            let remaining = state.time_remaining.saturating_sub(1);
            state.tick(remaining);
            let question_id = state
                .current_question()
                .map(|q| q.id.clone())
                .unwrap_or_default();
            (question_id, remaining)
        };

        let _ = self.events.send(SessionEvent::CountdownTick {
            question_id,
            time_remaining: remaining,
        });
        TickOutcome::Remaining(remaining)
    }

    /// Synthesizes the submission for an expired countdown: whatever text has
    /// been drafted so far, with the full time budget spent. Skipped if a
    /// manual submit won the race and the countdown is no longer at zero.
    async fn auto_submit(&self, text: String) -> Result<()> {
        let outcome = {
            let mut state = self.state.lock().await;
            if !state.is_active() || state.time_remaining > 0 {
                return Ok(());
            }
            let time_limit = state
                .current_question()
                .map(|q| q.time_limit_secs)
                .unwrap_or(0);
            let mut rng = self.rng.lock().await;
            state.submit_answer(text, time_limit, &mut *rng)
        };

        self.draft.lock().await.clear();
        self.after_submit(&outcome).await
    }

    async fn persist_snapshot(&self) -> Result<()> {
        let state = self.state.lock().await.clone();
        self.db.save_session_snapshot(&state).await
    }

    async fn emit_state_changed(&self) {
        let state = self.get_state().await;
        let _ = self.events.send(SessionEvent::StateChanged { state });
    }

    /// Signals the ticker to exit at its next iteration. Safe to call from
    /// within the ticker task itself.
    async fn stop_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
        }
    }

    /// Hard-stops the ticker; used by `reset` so no in-flight tick survives.
    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
    }
}

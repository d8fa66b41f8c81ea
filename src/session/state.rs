use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Answer, CandidateProfile, CandidateRecord, Question, RecordedAnswer};
use crate::scoring;

/// Result of driving an answer through the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Submission arrived outside an active session; nothing changed.
    Ignored,
    /// Recorded the answer and moved to the next question.
    Advanced {
        next_index: usize,
        time_remaining: u32,
    },
    /// Recorded the final answer, scored the session and froze it.
    Completed(Box<CandidateRecord>),
}

/// The authoritative interview session state.
///
/// Idle (pre-start or post-reset) -> Active (answering, `is_paused` is an
/// orthogonal flag) -> Completed (frozen until `reset`). Purely synchronous;
/// the async controller owns timing and persistence around it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InterviewState {
    pub profile: CandidateProfile,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub current_index: usize,
    pub time_remaining: u32,
    pub is_paused: bool,
    pub is_started: bool,
    pub is_completed: bool,
    pub total_score: u32,
    pub summary: String,
    pub session_id: String,
}

impl InterviewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.is_started && !self.is_completed
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.is_active() {
            self.questions.get(self.current_index)
        } else {
            None
        }
    }

    /// Merges any provided candidate fields into the profile. Meaningful only
    /// before `start`; the profile rides along unchanged afterwards.
    pub fn set_profile(
        &mut self,
        name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        resume_text: Option<String>,
    ) {
        if let Some(name) = name {
            self.profile.name = name;
        }
        if let Some(email) = email {
            self.profile.email = email;
        }
        if let Some(phone) = phone {
            self.profile.phone = phone;
        }
        if let Some(resume_text) = resume_text {
            self.profile.resume_text = resume_text;
        }
    }

    /// Begins a session over `questions`. Fails unless the machine is idle,
    /// the question set is non-empty and the session id was assigned.
    pub fn start(&mut self, questions: Vec<Question>, session_id: String) -> Result<()> {
        if self.is_started {
            bail!("an interview is already in progress; reset it first");
        }
        if questions.is_empty() {
            bail!("cannot start an interview with an empty question set");
        }
        if session_id.is_empty() {
            bail!("session id must be assigned before starting");
        }

        self.time_remaining = questions[0].time_limit_secs;
        self.questions = questions;
        self.session_id = session_id;
        self.answers.clear();
        self.current_index = 0;
        self.is_paused = false;
        self.is_completed = false;
        self.total_score = 0;
        self.summary.clear();
        self.is_started = true;
        Ok(())
    }

    /// Accepts a countdown update from the timer driver. Ignored while paused
    /// or outside an active session, so a trailing tick after completion or
    /// reset can never resurrect the countdown.
    pub fn tick(&mut self, new_remaining: u32) {
        if !self.is_active() || self.is_paused {
            return;
        }
        self.time_remaining = new_remaining;
    }

    pub fn pause(&mut self) {
        if self.is_active() {
            self.is_paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.is_active() {
            self.is_paused = false;
        }
    }

    /// Records an answer for the current question, replacing any earlier entry
    /// for the same question id. Accepted while paused: the timeout auto-submit
    /// may race a pause toggle, and dropping the answer would lose data.
    ///
    /// On a non-final question the pointer advances and the countdown resets to
    /// the next question's limit. On the final question the whole answer set is
    /// scored, the state freezes and the completed record is returned.
    pub fn submit_answer<R: Rng + ?Sized>(
        &mut self,
        text: String,
        time_spent_secs: u32,
        rng: &mut R,
    ) -> SubmitOutcome {
        let question = match self.current_question() {
            Some(question) => question.clone(),
            None => return SubmitOutcome::Ignored,
        };

        let answer = Answer {
            question_id: question.id.clone(),
            text,
            time_spent_secs: time_spent_secs.min(question.time_limit_secs),
            score: None,
        };
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == answer.question_id)
        {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.time_remaining = self.questions[self.current_index].time_limit_secs;
            SubmitOutcome::Advanced {
                next_index: self.current_index,
                time_remaining: self.time_remaining,
            }
        } else {
            let (total, summary) = scoring::evaluate(&self.questions, &mut self.answers, rng);
            self.total_score = total;
            self.summary = summary;
            self.is_paused = false;
            self.is_completed = true;
            // The pointer lands one past the end on completion.
            self.current_index = self.questions.len();
            SubmitOutcome::Completed(Box::new(self.completed_record(Utc::now())))
        }
    }

    /// Unconditionally returns to the idle state, discarding session data.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Builds the candidate-store record for a completed session, joining each
    /// answer with its question.
    pub fn completed_record(&self, completed_at: DateTime<Utc>) -> CandidateRecord {
        let answers = self
            .answers
            .iter()
            .map(|answer| {
                let question = self
                    .questions
                    .iter()
                    .find(|q| q.id == answer.question_id);
                RecordedAnswer {
                    question_id: answer.question_id.clone(),
                    question: question.map(|q| q.text.clone()).unwrap_or_default(),
                    difficulty: question.map(|q| q.difficulty).unwrap_or_default(),
                    answer: answer.text.clone(),
                    time_spent_secs: answer.time_spent_secs,
                    score: answer.score,
                }
            })
            .collect();

        CandidateRecord {
            id: self.session_id.clone(),
            name: self.profile.name.clone(),
            email: self.profile.email.clone(),
            phone: self.profile.phone.clone(),
            resume_text: self.profile.resume_text.clone(),
            total_score: self.total_score,
            summary: self.summary.clone(),
            completed_at,
            answers,
        }
    }
}

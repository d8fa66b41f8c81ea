use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Difficulty;

/// Candidate details as produced by the resume parser (or typed in manually).
/// Fields may be empty; validating them is the caller's concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume_text: String,
}

/// An answer as stored on a completed record, joined with the question it
/// answered so the record is self-contained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedAnswer {
    pub question_id: String,
    pub question: String,
    pub difficulty: Difficulty,
    pub answer: String,
    pub time_spent_secs: u32,
    pub score: Option<u32>,
}

/// The completed-session record handed to the candidate store. Derived 1:1
/// from a finished session (`id` is the session id) and never mutated by the
/// session afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume_text: String,
    pub total_score: u32,
    pub summary: String,
    pub completed_at: DateTime<Utc>,
    pub answers: Vec<RecordedAnswer>,
}

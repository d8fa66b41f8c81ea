use serde::{Deserialize, Serialize};

/// A recorded answer for one question. `time_spent_secs` is clamped to the
/// question's time limit at submission. `score` stays `None` until the session
/// finishes and the scoring pass runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub text: String,
    pub time_spent_secs: u32,
    pub score: Option<u32>,
}

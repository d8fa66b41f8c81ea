use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Per-question countdown budget for this tier, in seconds.
    pub fn time_limit_secs(self) -> u32 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }

    /// Multiplier applied to the raw score subtotal before capping at 100.
    pub fn score_multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 1.1,
            Difficulty::Hard => 1.2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Easy
    }
}

/// One interview question. Immutable once generated; `id` is unique within a
/// session and stable for its lifetime (`easy_1` .. `hard_2`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub time_limit_secs: u32,
}

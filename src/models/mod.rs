mod answer;
mod candidate;
mod question;

pub use answer::Answer;
pub use candidate::{CandidateProfile, CandidateRecord, RecordedAnswer};
pub use question::{Difficulty, Question};

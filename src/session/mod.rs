pub mod controller;
pub mod state;

pub use controller::{SessionController, SessionEvent};
pub use state::{InterviewState, SubmitOutcome};

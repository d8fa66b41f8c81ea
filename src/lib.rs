pub mod db;
pub mod models;
pub mod questions;
pub mod resume;
pub mod scoring;
pub mod session;

pub use session::{SessionController, SessionEvent};

//! Workout session engine.
//!
//! `Session` drives a workout through `Idle -> Active -> Completed` (or
//! aborted) and keeps no state of its own: every call re-reads the rows it
//! needs, so an interrupted client resumes by asking for [`NextStep`] again.

mod catalog;
mod session;
mod sets;
mod workout;

pub use session::Session;
pub use sets::{ExerciseProgress, set_strip};
pub use workout::NextStep;

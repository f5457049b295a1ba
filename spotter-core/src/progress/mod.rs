//! Read-only dashboard figures derived from catalog and session rows.
//!
//! Nothing here is cached; each call recomputes from the store. The
//! computations themselves are plain functions over loaded rows so they can
//! be tested without a database.

mod activity;
mod feed;
mod metadata;
mod ratings;
mod stats;

pub use activity::{MONTH_NAMES, MonthActivity, MonthlyActivity};
pub use feed::RecentSetFeed;
pub use metadata::WorkoutMetadata;
pub use ratings::{ExerciseRatings, SplitRatings};
pub use stats::ActiveSessionStats;

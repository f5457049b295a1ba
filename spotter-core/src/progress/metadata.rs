use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::Workout;
use crate::error::Result;
use crate::numeric::format_duration;
use crate::session::Session;

const STARTED_LABEL_FORMAT: &str = "%H:%M %Y-%m-%d";

/// Start time and running length of a workout, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutMetadata {
    pub started_at: DateTime<Utc>,
    pub started_label: String,
    pub elapsed_seconds: i64,
    pub elapsed_label: String,
}

impl WorkoutMetadata {
    /// Elapsed time runs until `now` for an active workout and until
    /// `completed_at` otherwise.
    pub fn compute(workout: &Workout, now: DateTime<Utc>) -> Self {
        let end = workout.completed_at.unwrap_or(now);
        let elapsed_seconds = (end - workout.started_at).num_seconds().max(0);

        Self {
            started_at: workout.started_at,
            started_label: workout.started_at.format(STARTED_LABEL_FORMAT).to_string(),
            elapsed_seconds,
            elapsed_label: format_duration(elapsed_seconds),
        }
    }
}

impl Session {
    pub async fn workout_metadata(&self, user_id: i64, workout_id: i64) -> Result<WorkoutMetadata> {
        let workout = self.workout(user_id, workout_id).await?;
        Ok(WorkoutMetadata::compute(&workout, Utc::now()))
    }
}

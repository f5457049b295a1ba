use log::debug;
use serde::Serialize;

use crate::db::models::{Split, WorkoutExercise, WorkoutSet};
use crate::db::operations::{
    get_active_workout_set, get_split, get_workout, list_workout_exercises,
};
use crate::error::{Result, SessionError};
use crate::numeric::percent;
use crate::session::Session;

/// Exercise counts of one workout, split into remaining, in progress and done.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSessionStats {
    pub split_name: String,
    pub split_description: String,
    pub remaining: i64,
    pub in_progress: i64,
    pub done: i64,
    pub remaining_pct: f64,
    /// How far the active set is through its exercise's target sets.
    pub progress_pct: f64,
    pub done_pct: f64,
}

impl ActiveSessionStats {
    /// `exercises` are the split's exercises flagged for the workout.
    ///
    /// An exercise with a set in flight has a set row, so it is taken out of
    /// `done` and counted as in progress instead. Without an active set
    /// nothing is subtracted.
    pub fn compute(
        split: &Split,
        exercises: &[WorkoutExercise],
        active_set: Option<&WorkoutSet>,
    ) -> Self {
        let total = exercises.len() as i64;
        let remaining = exercises.iter().filter(|e| !e.has_workout_set).count() as i64;
        let mut done = total - remaining;
        let mut in_progress = 0;
        let mut progress_pct = 0.0;

        if let Some(set) = active_set {
            in_progress = 1;
            done = (done - 1).max(0);
            let target_sets = exercises
                .iter()
                .find(|e| e.exercise.id == set.exercise_id)
                .map(|e| e.exercise.target_sets)
                .unwrap_or(0);
            progress_pct = percent(set.set_number, target_sets);
        }

        Self {
            split_name: split.name.clone(),
            split_description: split.description.clone(),
            remaining,
            in_progress,
            done,
            remaining_pct: percent(remaining, total),
            progress_pct,
            done_pct: percent(done, total),
        }
    }
}

impl Session {
    pub async fn active_session_stats(
        &self,
        user_id: i64,
        workout_id: i64,
    ) -> Result<ActiveSessionStats> {
        let mut conn = self.db_pool.acquire().await?;

        let workout = get_workout(&mut conn, user_id, workout_id)
            .await?
            .ok_or(SessionError::NotFound)?;
        let split = get_split(&mut conn, user_id, workout.split_id)
            .await?
            .ok_or(SessionError::NotFound)?;
        let exercises =
            list_workout_exercises(&mut conn, user_id, workout.split_id, workout_id).await?;
        let active_set = get_active_workout_set(&mut conn, user_id, workout_id).await?;

        let stats = ActiveSessionStats::compute(&split, &exercises, active_set.as_ref());
        debug!(
            "Workout {} stats: {} remaining, {} in progress, {} done",
            workout_id, stats.remaining, stats.in_progress, stats.done
        );
        Ok(stats)
    }
}

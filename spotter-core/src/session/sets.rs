use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::db::models::{Exercise, SetRating, WorkoutSet};
use crate::db::operations::{
    complete_active_workout_set, get_active_workout_set, get_exercise, get_workout,
    insert_workout_set, list_completed_sets,
};
use crate::error::{Result, SessionError, is_unique_violation};
use crate::session::Session;

/// The exercise a workout is currently on, with one strip entry per target
/// set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseProgress {
    pub exercise: Exercise,
    pub set: WorkoutSet,
    pub strip: Vec<SetRating>,
}

/// Ratings of the completed sets in order, then `Current` for the set in
/// flight, padded with `Uncompleted` up to `target_sets`.
pub fn set_strip(completed: &[SetRating], has_current: bool, target_sets: i64) -> Vec<SetRating> {
    let target = usize::try_from(target_sets).unwrap_or(0);
    let mut strip: Vec<SetRating> = completed.to_vec();
    if has_current {
        strip.push(SetRating::Current);
    }
    while strip.len() < target {
        strip.push(SetRating::Uncompleted);
    }
    strip
}

impl Session {
    /// Starts set 1 of `exercise_id` in an active workout.
    pub async fn start_exercise(
        &self,
        user_id: i64,
        workout_id: i64,
        exercise_id: i64,
    ) -> Result<WorkoutSet> {
        let mut tx = self.begin_write().await?;

        let workout = get_workout(&mut tx, user_id, workout_id)
            .await?
            .ok_or(SessionError::NotFound)?;
        if !workout.is_active() {
            return Err(SessionError::AlreadyCompleted);
        }
        if get_active_workout_set(&mut tx, user_id, workout_id)
            .await?
            .is_some()
        {
            return Err(SessionError::SetAlreadyActive);
        }

        let exercise = get_exercise(&mut tx, user_id, exercise_id)
            .await?
            .filter(|e| e.split_id == workout.split_id)
            .ok_or(SessionError::NotFound)?;
        if exercise.target_sets < 1 {
            warn!("Exercise {} has no target sets", exercise.id);
            return Err(SessionError::SetLimitReached);
        }
        if !list_completed_sets(&mut tx, user_id, workout_id, exercise_id)
            .await?
            .is_empty()
        {
            return Err(SessionError::SetLimitReached);
        }

        let set = insert_set(&mut tx, workout_id, &exercise, 1).await?;
        tx.commit().await?;
        info!(
            "Workout {}: started {} set 1/{}",
            workout_id, exercise.name, exercise.target_sets
        );
        Ok(set)
    }

    /// Completes the set in flight with `rating` and starts the next set of
    /// the same exercise.
    ///
    /// Returns [`SessionError::SetLimitReached`] once the exercise has all
    /// its sets; the completed set is kept either way.
    pub async fn record_set_result(
        &self,
        user_id: i64,
        workout_id: i64,
        rating: SetRating,
    ) -> Result<WorkoutSet> {
        if !rating.is_final() {
            return Err(SessionError::InvalidRating(rating));
        }

        let mut tx = self.begin_write().await?;

        let workout = get_workout(&mut tx, user_id, workout_id)
            .await?
            .ok_or(SessionError::NotFound)?;
        if !workout.is_active() {
            return Err(SessionError::AlreadyCompleted);
        }

        let completed =
            complete_active_workout_set(&mut tx, user_id, workout_id, rating, Utc::now())
                .await?
                .ok_or(SessionError::NoActiveSet)?;
        let exercise = get_exercise(&mut tx, user_id, completed.exercise_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        let next_number = completed.set_number + 1;
        if next_number > exercise.target_sets {
            tx.commit().await?;
            warn!(
                "Workout {}: {} finished all {} sets",
                workout_id, exercise.name, exercise.target_sets
            );
            return Err(SessionError::SetLimitReached);
        }

        let next = insert_set(&mut tx, workout_id, &exercise, next_number).await?;
        tx.commit().await?;
        info!(
            "Workout {}: {} set {} rated {}, set {}/{} started",
            workout_id,
            exercise.name,
            completed.set_number,
            rating,
            next_number,
            exercise.target_sets
        );
        Ok(next)
    }

    /// The exercise with a set in flight, or `None` between exercises.
    pub async fn exercise_progress(
        &self,
        user_id: i64,
        workout_id: i64,
    ) -> Result<Option<ExerciseProgress>> {
        let mut conn = self.db_pool.acquire().await?;

        if get_workout(&mut conn, user_id, workout_id).await?.is_none() {
            return Err(SessionError::NotFound);
        }
        let Some(set) = get_active_workout_set(&mut conn, user_id, workout_id).await? else {
            debug!("Workout {} has no set in flight", workout_id);
            return Ok(None);
        };
        let exercise = get_exercise(&mut conn, user_id, set.exercise_id)
            .await?
            .ok_or(SessionError::NotFound)?;

        let completed: Vec<SetRating> =
            list_completed_sets(&mut conn, user_id, workout_id, exercise.id)
                .await?
                .into_iter()
                .map(|s| s.rating)
                .collect();
        let strip = set_strip(&completed, true, exercise.target_sets);

        Ok(Some(ExerciseProgress {
            exercise,
            set,
            strip,
        }))
    }
}

async fn insert_set(
    conn: &mut sqlx::SqliteConnection,
    workout_id: i64,
    exercise: &Exercise,
    set_number: i64,
) -> Result<WorkoutSet> {
    match insert_workout_set(conn, workout_id, exercise, set_number, Utc::now()).await {
        Ok(set) => Ok(set),
        Err(e) if is_unique_violation(&e) => {
            warn!(
                "Workout {}: lost race inserting set {} of exercise {}",
                workout_id, set_number, exercise.id
            );
            Err(SessionError::SetAlreadyActive)
        }
        Err(e) => Err(e.into()),
    }
}

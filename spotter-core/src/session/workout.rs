//! Workout lifecycle: start, complete, abort and resume navigation.

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::db::models::{Workout, WorkoutExercise};
use crate::db::operations::{
    complete_workout, delete_workout, get_active_workout, get_active_workout_set, get_split,
    get_workout, insert_workout, list_workout_exercises,
};
use crate::error::{Result, SessionError, is_unique_violation};
use crate::session::Session;
use crate::session::sets::ExerciseProgress;

/// Where a resumed workout should continue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", content = "data", rename_all = "snake_case")]
pub enum NextStep {
    /// A set is in flight; keep rating sets of this exercise.
    Exercise(ExerciseProgress),
    /// No set is in flight and some exercises have not been started.
    PickExercise(Vec<WorkoutExercise>),
    /// Every exercise of the split has been started and none is in flight.
    Finished,
}

impl Session {
    /// Starts a workout of `split_id`, or returns the user's active workout
    /// unchanged if there already is one.
    pub async fn start_workout(&self, user_id: i64, split_id: i64) -> Result<Workout> {
        let mut tx = self.begin_write().await?;

        if get_split(&mut tx, user_id, split_id).await?.is_none() {
            return Err(SessionError::NotFound);
        }

        if let Some(active) = get_active_workout(&mut tx, user_id).await? {
            debug!("User {} re-entered active workout {}", user_id, active.id);
            return Ok(active);
        }

        match insert_workout(&mut tx, user_id, split_id, Utc::now()).await {
            Ok(workout) => {
                tx.commit().await?;
                info!(
                    "Started workout {} of split {} for user {}",
                    workout.id, split_id, user_id
                );
                Ok(workout)
            }
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                warn!(
                    "Concurrent start for user {}, returning the winning workout",
                    user_id
                );
                let mut conn = self.db_pool.acquire().await?;
                get_active_workout(&mut conn, user_id)
                    .await?
                    .ok_or(SessionError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stamps `completed_at` on an active workout with no set in flight.
    pub async fn complete_workout(&self, user_id: i64, workout_id: i64) -> Result<Workout> {
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

        let completed_at = Utc::now();
        if complete_workout(&mut tx, user_id, workout_id, completed_at).await? == 0 {
            return Err(SessionError::AlreadyCompleted);
        }
        tx.commit().await?;
        info!("Completed workout {} for user {}", workout_id, user_id);

        Ok(Workout {
            completed_at: Some(completed_at),
            ..workout
        })
    }

    /// Deletes an active workout together with its sets.
    pub async fn abort_workout(&self, user_id: i64, workout_id: i64) -> Result<()> {
        let mut tx = self.begin_write().await?;

        let workout = get_workout(&mut tx, user_id, workout_id)
            .await?
            .ok_or(SessionError::NotFound)?;
        if !workout.is_active() {
            return Err(SessionError::AlreadyCompleted);
        }

        delete_workout(&mut tx, user_id, workout_id).await?;
        tx.commit().await?;
        info!("Aborted workout {} for user {}", workout_id, user_id);
        Ok(())
    }

    /// Every exercise of the split the workout runs, flagged with whether the
    /// workout has started it.
    pub async fn remaining_exercises(
        &self,
        user_id: i64,
        split_id: i64,
        workout_id: i64,
    ) -> Result<Vec<WorkoutExercise>> {
        let mut conn = self.db_pool.acquire().await?;
        let workout = get_workout(&mut conn, user_id, workout_id)
            .await?
            .ok_or(SessionError::NotFound)?;
        if workout.split_id != split_id {
            debug!(
                "Workout {} runs split {}, not {}",
                workout_id, workout.split_id, split_id
            );
            return Err(SessionError::NotFound);
        }
        if get_split(&mut conn, user_id, split_id).await?.is_none() {
            return Err(SessionError::NotFound);
        }
        Ok(list_workout_exercises(&mut conn, user_id, split_id, workout_id).await?)
    }

    pub async fn active_workout(&self, user_id: i64) -> Result<Option<Workout>> {
        let mut conn = self.db_pool.acquire().await?;
        Ok(get_active_workout(&mut conn, user_id).await?)
    }

    pub async fn workout(&self, user_id: i64, workout_id: i64) -> Result<Workout> {
        let mut conn = self.db_pool.acquire().await?;
        get_workout(&mut conn, user_id, workout_id)
            .await?
            .ok_or(SessionError::NotFound)
    }

    /// Decides what an active workout should show next, from persisted rows
    /// only.
    pub async fn next_step(&self, user_id: i64, workout_id: i64) -> Result<NextStep> {
        let workout = self.workout(user_id, workout_id).await?;
        if !workout.is_active() {
            return Err(SessionError::AlreadyCompleted);
        }

        if let Some(progress) = self.exercise_progress(user_id, workout_id).await? {
            return Ok(NextStep::Exercise(progress));
        }

        let exercises = self
            .remaining_exercises(user_id, workout.split_id, workout_id)
            .await?;
        if exercises.iter().any(|e| !e.has_workout_set) {
            Ok(NextStep::PickExercise(exercises))
        } else {
            Ok(NextStep::Finished)
        }
    }

    /// Completes the workout if every exercise has been started and no set is
    /// in flight. Returns whether it did.
    pub async fn finish_if_done(&self, user_id: i64, workout_id: i64) -> Result<bool> {
        match self.next_step(user_id, workout_id).await? {
            NextStep::Finished => {
                self.complete_workout(user_id, workout_id).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::SetRating;
    use crate::db::operations::{list_completed_sets, list_workout_sets};
    use crate::test_utils::{file_session, seed_split, seed_user, test_session};

    #[tokio::test]
    async fn start_workout_twice_returns_same_workout() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let (split, _) = seed_split(&session, ada.id, "Push", &[("Bench", 3)]).await;

        let first = session.start_workout(ada.id, split.id).await.unwrap();
        let second = session.start_workout(ada.id, split.id).await.unwrap();
        assert_eq!(first.id, second.id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workouts WHERE user_id = ?1")
            .bind(ada.id)
            .fetch_one(&session.db_pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn racing_workout_starts_share_one_workout() {
        let dir = tempfile::tempdir().unwrap();
        let session = file_session(&dir).await;
        let ada = seed_user(&session, "ada").await;
        let (split, _) = seed_split(&session, ada.id, "Push", &[("Bench", 3)]).await;

        for _ in 0..10 {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let session = session.clone();
                    let (user_id, split_id) = (ada.id, split.id);
                    tokio::spawn(async move { session.start_workout(user_id, split_id).await })
                })
                .collect();

            let mut ids = Vec::with_capacity(handles.len());
            for handle in handles {
                ids.push(handle.await.unwrap().unwrap().id);
            }
            assert!(ids.iter().all(|id| *id == ids[0]), "{ids:?}");

            let active = session.active_workout(ada.id).await.unwrap().unwrap();
            assert_eq!(active.id, ids[0]);
            session.abort_workout(ada.id, active.id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn start_workout_on_foreign_split_is_not_found() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let bob = seed_user(&session, "bob").await;
        let (split, _) = seed_split(&session, ada.id, "Push", &[("Bench", 3)]).await;

        let err = session.start_workout(bob.id, split.id).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
        assert!(session.active_workout(bob.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn abort_removes_workout_and_sets() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let (split, exercises) =
            seed_split(&session, ada.id, "Push", &[("Bench", 3), ("Dips", 2)]).await;
        let workout = session.start_workout(ada.id, split.id).await.unwrap();
        session
            .start_exercise(ada.id, workout.id, exercises[0].id)
            .await
            .unwrap();
        session
            .record_set_result(ada.id, workout.id, SetRating::Good)
            .await
            .unwrap();

        session.abort_workout(ada.id, workout.id).await.unwrap();

        assert!(matches!(
            session.workout(ada.id, workout.id).await,
            Err(SessionError::NotFound)
        ));
        let mut conn = session.db_pool.acquire().await.unwrap();
        assert!(
            list_completed_sets(&mut conn, ada.id, workout.id, exercises[0].id)
                .await
                .unwrap()
                .is_empty()
        );
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_sets")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn complete_workout_requires_no_set_in_flight() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let (split, exercises) = seed_split(&session, ada.id, "Legs", &[("Squat", 1)]).await;
        let workout = session.start_workout(ada.id, split.id).await.unwrap();
        session
            .start_exercise(ada.id, workout.id, exercises[0].id)
            .await
            .unwrap();

        assert!(matches!(
            session.complete_workout(ada.id, workout.id).await,
            Err(SessionError::SetAlreadyActive)
        ));

        let limit = session
            .record_set_result(ada.id, workout.id, SetRating::Bad)
            .await
            .unwrap_err();
        assert!(matches!(limit, SessionError::SetLimitReached));

        let completed = session.complete_workout(ada.id, workout.id).await.unwrap();
        assert!(completed.completed_at.is_some());
        assert!(session.active_workout(ada.id).await.unwrap().is_none());

        assert!(matches!(
            session.complete_workout(ada.id, workout.id).await,
            Err(SessionError::AlreadyCompleted)
        ));
        assert!(matches!(
            session.abort_workout(ada.id, workout.id).await,
            Err(SessionError::AlreadyCompleted)
        ));
    }

    #[tokio::test]
    async fn other_users_cannot_touch_a_workout() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let bob = seed_user(&session, "bob").await;
        let (split, exercises) = seed_split(&session, ada.id, "Pull", &[("Row", 2)]).await;
        let workout = session.start_workout(ada.id, split.id).await.unwrap();

        assert!(matches!(
            session.workout(bob.id, workout.id).await,
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            session.start_exercise(bob.id, workout.id, exercises[0].id).await,
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            session.abort_workout(bob.id, workout.id).await,
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            session.remaining_exercises(bob.id, split.id, workout.id).await,
            Err(SessionError::NotFound)
        ));
        assert!(session.workout(ada.id, workout.id).await.is_ok());
    }

    #[tokio::test]
    async fn next_step_walks_through_the_split() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let (split, exercises) =
            seed_split(&session, ada.id, "Push", &[("Bench", 1), ("Dips", 1)]).await;
        let workout = session.start_workout(ada.id, split.id).await.unwrap();

        match session.next_step(ada.id, workout.id).await.unwrap() {
            NextStep::PickExercise(list) => {
                assert_eq!(list.len(), 2);
                assert!(list.iter().all(|e| !e.has_workout_set));
            }
            other => panic!("expected exercise pick, got {other:?}"),
        }

        session
            .start_exercise(ada.id, workout.id, exercises[0].id)
            .await
            .unwrap();
        match session.next_step(ada.id, workout.id).await.unwrap() {
            NextStep::Exercise(progress) => assert_eq!(progress.exercise.id, exercises[0].id),
            other => panic!("expected active exercise, got {other:?}"),
        }

        let _ = session
            .record_set_result(ada.id, workout.id, SetRating::Good)
            .await;
        assert!(!session.finish_if_done(ada.id, workout.id).await.unwrap());

        let remaining = session
            .remaining_exercises(ada.id, split.id, workout.id)
            .await
            .unwrap();
        let flags: Vec<bool> = remaining.iter().map(|e| e.has_workout_set).collect();
        assert_eq!(flags, vec![true, false]);

        session
            .start_exercise(ada.id, workout.id, exercises[1].id)
            .await
            .unwrap();
        let _ = session
            .record_set_result(ada.id, workout.id, SetRating::Bad)
            .await;

        assert_eq!(
            session.next_step(ada.id, workout.id).await.unwrap(),
            NextStep::Finished
        );
        assert!(session.finish_if_done(ada.id, workout.id).await.unwrap());
        assert!(matches!(
            session.next_step(ada.id, workout.id).await,
            Err(SessionError::AlreadyCompleted)
        ));

        let mut conn = session.db_pool.acquire().await.unwrap();
        assert_eq!(
            list_workout_sets(&mut conn, ada.id, workout.id)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn remaining_exercises_of_another_split_is_not_found() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let (push, _) = seed_split(&session, ada.id, "Push", &[("Bench", 3)]).await;
        let (pull, _) = seed_split(&session, ada.id, "Pull", &[("Row", 3)]).await;
        let workout = session.start_workout(ada.id, push.id).await.unwrap();

        assert!(matches!(
            session.remaining_exercises(ada.id, pull.id, workout.id).await,
            Err(SessionError::NotFound)
        ));
        assert_eq!(
            session
                .remaining_exercises(ada.id, push.id, workout.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn one_active_workout_per_user() {
        let session = test_session().await;
        let ada = seed_user(&session, "ada").await;
        let (push, _) = seed_split(&session, ada.id, "Push", &[("Bench", 3)]).await;
        let (pull, _) = seed_split(&session, ada.id, "Pull", &[("Row", 3)]).await;

        let first = session.start_workout(ada.id, push.id).await.unwrap();
        let second = session.start_workout(ada.id, pull.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.split_id, push.id);
    }
}

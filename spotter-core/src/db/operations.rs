//! Catalog and session store queries.
//!
//! Every function takes a `&mut SqliteConnection` so callers can run a
//! sequence of them inside one transaction (`&mut tx`) or against a pooled
//! connection (`&mut conn`). Every query is scoped by the owning user.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db::models::{
    Exercise, NewExercise, RatingCount, RecentSet, SetRating, Split, User, Workout,
    WorkoutExercise, WorkoutSet,
};

const EXERCISE_COLUMNS: &str = "e.id, e.split_id, e.name, e.description, e.weight_from, e.weight_to, e.reps_from, e.reps_to, e.target_sets, e.image_id";

const SET_COLUMNS: &str = "s.id, s.workout_id, s.exercise_id, s.set_number, s.started_at, s.completed_at, s.rating, s.weight_from, s.weight_to, s.reps_from, s.reps_to";

// Users
pub async fn create_user(conn: &mut SqliteConnection, username: &str) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, created_at) VALUES (?1, ?2)
         RETURNING id, username, created_at",
    )
    .bind(username)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT id, username, created_at FROM users WHERE username = ?1")
        .bind(username)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn get_or_create_user(conn: &mut SqliteConnection, username: &str) -> sqlx::Result<User> {
    if let Some(user) = get_user_by_username(conn, username).await? {
        return Ok(user);
    }
    create_user(conn, username).await
}

// Splits
pub async fn create_split(
    conn: &mut SqliteConnection,
    user_id: i64,
    name: &str,
    description: &str,
) -> sqlx::Result<Split> {
    sqlx::query_as::<_, Split>(
        "INSERT INTO splits (user_id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)
         RETURNING id, user_id, name, description, created_at",
    )
    .bind(user_id)
    .bind(name)
    .bind(description)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
}

pub async fn update_split(
    conn: &mut SqliteConnection,
    user_id: i64,
    split_id: i64,
    name: &str,
    description: &str,
) -> sqlx::Result<Option<Split>> {
    sqlx::query_as::<_, Split>(
        "UPDATE splits SET name = ?1, description = ?2
         WHERE id = ?3 AND user_id = ?4
         RETURNING id, user_id, name, description, created_at",
    )
    .bind(name)
    .bind(description)
    .bind(split_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn delete_split(conn: &mut SqliteConnection, user_id: i64, split_id: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM splits WHERE id = ?1 AND user_id = ?2")
        .bind(split_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn get_split(
    conn: &mut SqliteConnection,
    user_id: i64,
    split_id: i64,
) -> sqlx::Result<Option<Split>> {
    sqlx::query_as::<_, Split>(
        "SELECT id, user_id, name, description, created_at FROM splits WHERE id = ?1 AND user_id = ?2",
    )
    .bind(split_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn list_splits(conn: &mut SqliteConnection, user_id: i64) -> sqlx::Result<Vec<Split>> {
    sqlx::query_as::<_, Split>(
        "SELECT id, user_id, name, description, created_at FROM splits WHERE user_id = ?1 ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

// Exercises
/// Inserts an exercise into one of the user's splits; `None` when the split
/// is absent or owned by someone else.
pub async fn create_exercise(
    conn: &mut SqliteConnection,
    user_id: i64,
    split_id: i64,
    exercise: &NewExercise,
) -> sqlx::Result<Option<Exercise>> {
    sqlx::query_as::<_, Exercise>(
        "INSERT INTO exercises (split_id, name, description, weight_from, weight_to, reps_from, reps_to, target_sets, image_id)
         SELECT id, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8 FROM splits WHERE id = ?9 AND user_id = ?10
         RETURNING id, split_id, name, description, weight_from, weight_to, reps_from, reps_to, target_sets, image_id",
    )
    .bind(&exercise.name)
    .bind(&exercise.description)
    .bind(exercise.weight_from)
    .bind(exercise.weight_to)
    .bind(exercise.reps_from)
    .bind(exercise.reps_to)
    .bind(exercise.target_sets)
    .bind(exercise.image_id)
    .bind(split_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn update_exercise(
    conn: &mut SqliteConnection,
    user_id: i64,
    exercise_id: i64,
    exercise: &NewExercise,
) -> sqlx::Result<Option<Exercise>> {
    sqlx::query_as::<_, Exercise>(
        "UPDATE exercises
         SET name = ?1, description = ?2, weight_from = ?3, weight_to = ?4,
             reps_from = ?5, reps_to = ?6, target_sets = ?7, image_id = COALESCE(?8, image_id)
         WHERE id = ?9 AND split_id IN (SELECT id FROM splits WHERE user_id = ?10)
         RETURNING id, split_id, name, description, weight_from, weight_to, reps_from, reps_to, target_sets, image_id",
    )
    .bind(&exercise.name)
    .bind(&exercise.description)
    .bind(exercise.weight_from)
    .bind(exercise.weight_to)
    .bind(exercise.reps_from)
    .bind(exercise.reps_to)
    .bind(exercise.target_sets)
    .bind(exercise.image_id)
    .bind(exercise_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn delete_exercise(
    conn: &mut SqliteConnection,
    user_id: i64,
    exercise_id: i64,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "DELETE FROM exercises WHERE id = ?1 AND split_id IN (SELECT id FROM splits WHERE user_id = ?2)",
    )
    .bind(exercise_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn get_exercise(
    conn: &mut SqliteConnection,
    user_id: i64,
    exercise_id: i64,
) -> sqlx::Result<Option<Exercise>> {
    sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises e
         JOIN splits sp ON sp.id = e.split_id
         WHERE e.id = ?1 AND sp.user_id = ?2"
    ))
    .bind(exercise_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Exercises of one split, in creation order.
pub async fn list_exercises(
    conn: &mut SqliteConnection,
    user_id: i64,
    split_id: i64,
) -> sqlx::Result<Vec<Exercise>> {
    sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises e
         JOIN splits sp ON sp.id = e.split_id
         WHERE e.split_id = ?1 AND sp.user_id = ?2
         ORDER BY e.id"
    ))
    .bind(split_id)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

/// Every exercise across all of the user's splits.
pub async fn list_user_exercises(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> sqlx::Result<Vec<Exercise>> {
    sqlx::query_as::<_, Exercise>(&format!(
        "SELECT {EXERCISE_COLUMNS} FROM exercises e
         JOIN splits sp ON sp.id = e.split_id
         WHERE sp.user_id = ?1
         ORDER BY e.split_id, e.id"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

/// Split exercises flagged with whether `workout_id` has any set for them.
pub async fn list_workout_exercises(
    conn: &mut SqliteConnection,
    user_id: i64,
    split_id: i64,
    workout_id: i64,
) -> sqlx::Result<Vec<WorkoutExercise>> {
    sqlx::query_as::<_, WorkoutExercise>(&format!(
        "SELECT {EXERCISE_COLUMNS},
                EXISTS (
                    SELECT 1 FROM workout_sets s
                    JOIN workouts w ON w.id = s.workout_id
                    WHERE s.workout_id = ?2 AND s.exercise_id = e.id AND w.user_id = ?3
                ) AS has_workout_set
         FROM exercises e
         JOIN splits sp ON sp.id = e.split_id
         WHERE e.split_id = ?1 AND sp.user_id = ?3
         ORDER BY e.id"
    ))
    .bind(split_id)
    .bind(workout_id)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

// Workouts
pub async fn insert_workout(
    conn: &mut SqliteConnection,
    user_id: i64,
    split_id: i64,
    started_at: DateTime<Utc>,
) -> sqlx::Result<Workout> {
    sqlx::query_as::<_, Workout>(
        "INSERT INTO workouts (user_id, split_id, started_at) VALUES (?1, ?2, ?3)
         RETURNING id, user_id, split_id, started_at, completed_at",
    )
    .bind(user_id)
    .bind(split_id)
    .bind(started_at)
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_active_workout(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> sqlx::Result<Option<Workout>> {
    sqlx::query_as::<_, Workout>(
        "SELECT id, user_id, split_id, started_at, completed_at FROM workouts
         WHERE user_id = ?1 AND completed_at IS NULL",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn get_workout(
    conn: &mut SqliteConnection,
    user_id: i64,
    workout_id: i64,
) -> sqlx::Result<Option<Workout>> {
    sqlx::query_as::<_, Workout>(
        "SELECT id, user_id, split_id, started_at, completed_at FROM workouts
         WHERE id = ?1 AND user_id = ?2",
    )
    .bind(workout_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Stamps `completed_at` on an active workout; returns the rows touched.
pub async fn complete_workout(
    conn: &mut SqliteConnection,
    user_id: i64,
    workout_id: i64,
    completed_at: DateTime<Utc>,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE workouts SET completed_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND completed_at IS NULL",
    )
    .bind(completed_at)
    .bind(workout_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Deletes a workout; its sets go with it through `ON DELETE CASCADE`.
pub async fn delete_workout(
    conn: &mut SqliteConnection,
    user_id: i64,
    workout_id: i64,
) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM workouts WHERE id = ?1 AND user_id = ?2")
        .bind(workout_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_completed_workouts(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> sqlx::Result<Vec<Workout>> {
    sqlx::query_as::<_, Workout>(
        "SELECT id, user_id, split_id, started_at, completed_at FROM workouts
         WHERE user_id = ?1 AND completed_at IS NOT NULL
         ORDER BY started_at",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

// Sets
/// Inserts a `current` set, snapshotting the exercise's target ranges.
///
/// Fails with a unique violation when another set of the workout is still
/// active or when `set_number` was already used for this exercise.
pub async fn insert_workout_set(
    conn: &mut SqliteConnection,
    workout_id: i64,
    exercise: &Exercise,
    set_number: i64,
    started_at: DateTime<Utc>,
) -> sqlx::Result<WorkoutSet> {
    sqlx::query_as::<_, WorkoutSet>(
        "INSERT INTO workout_sets
             (workout_id, exercise_id, set_number, started_at, rating, weight_from, weight_to, reps_from, reps_to)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         RETURNING id, workout_id, exercise_id, set_number, started_at, completed_at, rating, weight_from, weight_to, reps_from, reps_to",
    )
    .bind(workout_id)
    .bind(exercise.id)
    .bind(set_number)
    .bind(started_at)
    .bind(SetRating::Current.as_str())
    .bind(exercise.weight_from)
    .bind(exercise.weight_to)
    .bind(exercise.reps_from)
    .bind(exercise.reps_to)
    .fetch_one(&mut *conn)
    .await
}

/// The set in flight for a workout, whichever exercise it belongs to.
pub async fn get_active_workout_set(
    conn: &mut SqliteConnection,
    user_id: i64,
    workout_id: i64,
) -> sqlx::Result<Option<WorkoutSet>> {
    sqlx::query_as::<_, WorkoutSet>(&format!(
        "SELECT {SET_COLUMNS} FROM workout_sets s
         JOIN workouts w ON w.id = s.workout_id
         WHERE s.workout_id = ?1 AND w.user_id = ?2 AND s.completed_at IS NULL"
    ))
    .bind(workout_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Completes the active set of a workout with `rating`, returning it.
pub async fn complete_active_workout_set(
    conn: &mut SqliteConnection,
    user_id: i64,
    workout_id: i64,
    rating: SetRating,
    completed_at: DateTime<Utc>,
) -> sqlx::Result<Option<WorkoutSet>> {
    sqlx::query_as::<_, WorkoutSet>(
        "UPDATE workout_sets SET completed_at = ?1, rating = ?2
         WHERE workout_id = ?3 AND completed_at IS NULL
           AND workout_id IN (SELECT id FROM workouts WHERE user_id = ?4)
         RETURNING id, workout_id, exercise_id, set_number, started_at, completed_at, rating, weight_from, weight_to, reps_from, reps_to",
    )
    .bind(completed_at)
    .bind(rating.as_str())
    .bind(workout_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Completed sets of one exercise within a workout, by set number.
pub async fn list_completed_sets(
    conn: &mut SqliteConnection,
    user_id: i64,
    workout_id: i64,
    exercise_id: i64,
) -> sqlx::Result<Vec<WorkoutSet>> {
    sqlx::query_as::<_, WorkoutSet>(&format!(
        "SELECT {SET_COLUMNS} FROM workout_sets s
         JOIN workouts w ON w.id = s.workout_id
         WHERE s.workout_id = ?1 AND s.exercise_id = ?2 AND w.user_id = ?3
           AND s.completed_at IS NOT NULL
         ORDER BY s.set_number ASC"
    ))
    .bind(workout_id)
    .bind(exercise_id)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

/// Every set of a workout regardless of state, by exercise then set number.
pub async fn list_workout_sets(
    conn: &mut SqliteConnection,
    user_id: i64,
    workout_id: i64,
) -> sqlx::Result<Vec<WorkoutSet>> {
    sqlx::query_as::<_, WorkoutSet>(&format!(
        "SELECT {SET_COLUMNS} FROM workout_sets s
         JOIN workouts w ON w.id = s.workout_id
         WHERE s.workout_id = ?1 AND w.user_id = ?2
         ORDER BY s.exercise_id, s.set_number"
    ))
    .bind(workout_id)
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

/// The user's most recent sets: in-flight sets first, then newest completed.
pub async fn list_recent_sets(
    conn: &mut SqliteConnection,
    user_id: i64,
    limit: i64,
) -> sqlx::Result<Vec<RecentSet>> {
    sqlx::query_as::<_, RecentSet>(
        "SELECT sp.name AS split_name, e.name AS exercise_name, s.rating, s.completed_at
         FROM workout_sets s
         JOIN workouts w ON w.id = s.workout_id
         JOIN exercises e ON e.id = s.exercise_id
         JOIN splits sp ON sp.id = w.split_id
         WHERE w.user_id = ?1
         ORDER BY s.completed_at IS NOT NULL, s.completed_at DESC, s.id DESC
         LIMIT ?2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
}

/// Per-exercise tallies of set ratings over all of the user's workouts.
pub async fn count_set_ratings(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> sqlx::Result<Vec<RatingCount>> {
    sqlx::query_as::<_, RatingCount>(
        "SELECT s.exercise_id, s.rating, COUNT(*) AS count
         FROM workout_sets s
         JOIN workouts w ON w.id = s.workout_id
         WHERE w.user_id = ?1
         GROUP BY s.exercise_id, s.rating",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::init_database;
use crate::db::models::{Exercise, NewExercise, Split, User, Workout};
use crate::db::operations;
use crate::session::Session;

/// Fresh in-memory database with the schema applied.
///
/// One connection that never expires, so every query sees the same database.
pub async fn setup_test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory pool");
    init_database(&pool).await.expect("migrations apply");
    pool
}

pub async fn test_session() -> Session {
    Session::with_pool(setup_test_db().await, Config::in_memory())
}

/// WAL database in `dir` with a pool of eight connections, so spawned tasks
/// really write concurrently.
pub async fn file_session(dir: &TempDir) -> Session {
    let config = Config {
        database_url: format!("sqlite://{}", dir.path().join("spotter.db").display()),
        max_connections: 8,
        busy_timeout: Duration::from_secs(10),
        ..Config::default()
    };
    Session::new(config).await.expect("file-backed session")
}

pub fn new_exercise(name: &str, target_sets: i64) -> NewExercise {
    NewExercise {
        name: name.to_string(),
        description: String::new(),
        weight_from: 20.0,
        weight_to: 40.0,
        reps_from: 8,
        reps_to: 12,
        target_sets,
        image_id: None,
    }
}

pub async fn seed_user(session: &Session, username: &str) -> User {
    let mut conn = session.db_pool.acquire().await.unwrap();
    operations::create_user(&mut conn, username).await.unwrap()
}

/// A split owned by `user_id` holding one exercise per `(name, target_sets)`.
pub async fn seed_split(
    session: &Session,
    user_id: i64,
    name: &str,
    exercises: &[(&str, i64)],
) -> (Split, Vec<Exercise>) {
    let mut conn = session.db_pool.acquire().await.unwrap();
    let split = operations::create_split(&mut conn, user_id, name, "")
        .await
        .unwrap();
    let mut created = Vec::with_capacity(exercises.len());
    for (exercise_name, target_sets) in exercises {
        let exercise = operations::create_exercise(
            &mut conn,
            user_id,
            split.id,
            &new_exercise(exercise_name, *target_sets),
        )
        .await
        .unwrap()
        .unwrap();
        created.push(exercise);
    }
    (split, created)
}

/// A workout started and completed at `started_at`.
pub async fn seed_completed_workout(
    session: &Session,
    user_id: i64,
    split_id: i64,
    started_at: DateTime<Utc>,
) -> Workout {
    let mut conn = session.db_pool.acquire().await.unwrap();
    let workout = operations::insert_workout(&mut conn, user_id, split_id, started_at)
        .await
        .unwrap();
    operations::complete_workout(&mut conn, user_id, workout.id, started_at)
        .await
        .unwrap();
    operations::get_workout(&mut conn, user_id, workout.id)
        .await
        .unwrap()
        .unwrap()
}

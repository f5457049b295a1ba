//! Administrative CRUD over users, splits and exercises.

use log::info;

use crate::db::models::{Exercise, NewExercise, Split, User};
use crate::db::operations;
use crate::error::{Result, SessionError};
use crate::session::Session;

impl Session {
    pub async fn create_user(&self, username: &str) -> Result<User> {
        let mut conn = self.db_pool.acquire().await?;
        let user = operations::create_user(&mut conn, username).await?;
        info!("Created user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_or_create_user(&self, username: &str) -> Result<User> {
        let mut conn = self.db_pool.acquire().await?;
        Ok(operations::get_or_create_user(&mut conn, username).await?)
    }

    pub async fn create_split(&self, user_id: i64, name: &str, description: &str) -> Result<Split> {
        let mut conn = self.db_pool.acquire().await?;
        let split = operations::create_split(&mut conn, user_id, name, description).await?;
        info!("Created split {} ({}) for user {}", split.name, split.id, user_id);
        Ok(split)
    }

    pub async fn update_split(
        &self,
        user_id: i64,
        split_id: i64,
        name: &str,
        description: &str,
    ) -> Result<Split> {
        let mut conn = self.db_pool.acquire().await?;
        operations::update_split(&mut conn, user_id, split_id, name, description)
            .await?
            .ok_or(SessionError::NotFound)
    }

    /// Deletes a split with its exercises and every workout run from it.
    pub async fn delete_split(&self, user_id: i64, split_id: i64) -> Result<()> {
        let mut conn = self.db_pool.acquire().await?;
        if operations::delete_split(&mut conn, user_id, split_id).await? == 0 {
            return Err(SessionError::NotFound);
        }
        info!("Deleted split {} for user {}", split_id, user_id);
        Ok(())
    }

    pub async fn split(&self, user_id: i64, split_id: i64) -> Result<Split> {
        let mut conn = self.db_pool.acquire().await?;
        operations::get_split(&mut conn, user_id, split_id)
            .await?
            .ok_or(SessionError::NotFound)
    }

    pub async fn list_splits(&self, user_id: i64) -> Result<Vec<Split>> {
        let mut conn = self.db_pool.acquire().await?;
        Ok(operations::list_splits(&mut conn, user_id).await?)
    }

    pub async fn create_exercise(
        &self,
        user_id: i64,
        split_id: i64,
        exercise: &NewExercise,
    ) -> Result<Exercise> {
        exercise.validate().map_err(SessionError::InvalidExercise)?;
        let mut conn = self.db_pool.acquire().await?;
        let created = operations::create_exercise(&mut conn, user_id, split_id, exercise)
            .await?
            .ok_or(SessionError::NotFound)?;
        info!("Added exercise {} to split {}", created, split_id);
        Ok(created)
    }

    /// Replaces an exercise definition. Sets already recorded keep the ranges
    /// they were started with.
    pub async fn update_exercise(
        &self,
        user_id: i64,
        exercise_id: i64,
        exercise: &NewExercise,
    ) -> Result<Exercise> {
        exercise.validate().map_err(SessionError::InvalidExercise)?;
        let mut conn = self.db_pool.acquire().await?;
        operations::update_exercise(&mut conn, user_id, exercise_id, exercise)
            .await?
            .ok_or(SessionError::NotFound)
    }

    pub async fn delete_exercise(&self, user_id: i64, exercise_id: i64) -> Result<()> {
        let mut conn = self.db_pool.acquire().await?;
        if operations::delete_exercise(&mut conn, user_id, exercise_id).await? == 0 {
            return Err(SessionError::NotFound);
        }
        Ok(())
    }

    pub async fn exercise(&self, user_id: i64, exercise_id: i64) -> Result<Exercise> {
        let mut conn = self.db_pool.acquire().await?;
        operations::get_exercise(&mut conn, user_id, exercise_id)
            .await?
            .ok_or(SessionError::NotFound)
    }

    pub async fn list_exercises(&self, user_id: i64, split_id: i64) -> Result<Vec<Exercise>> {
        let mut conn = self.db_pool.acquire().await?;
        if operations::get_split(&mut conn, user_id, split_id)
            .await?
            .is_none()
        {
            return Err(SessionError::NotFound);
        }
        Ok(operations::list_exercises(&mut conn, user_id, split_id).await?)
    }
}

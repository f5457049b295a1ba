use serde::Serialize;

use crate::db::models::{RecentSet, SetRating};
use crate::db::operations::list_recent_sets;
use crate::error::Result;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentSetFeed {
    /// Whether any listed set is still in flight.
    pub has_new_set: bool,
    pub sets: Vec<RecentSet>,
}

impl From<Vec<RecentSet>> for RecentSetFeed {
    fn from(sets: Vec<RecentSet>) -> Self {
        Self {
            has_new_set: sets.iter().any(|s| s.rating == SetRating::Current),
            sets,
        }
    }
}

impl Session {
    /// The user's latest sets across all workouts, in-flight sets first.
    /// `None` uses the configured feed length.
    pub async fn recent_set_feed(&self, user_id: i64, limit: Option<i64>) -> Result<RecentSetFeed> {
        let limit = limit.unwrap_or(self.config().recent_set_limit).max(0);
        let mut conn = self.db_pool.acquire().await?;
        let sets = list_recent_sets(&mut conn, user_id, limit).await?;
        Ok(RecentSetFeed::from(sets))
    }
}

use std::collections::HashMap;

use serde::Serialize;

use crate::db::models::{Exercise, RatingCount, SetRating, Split};
use crate::db::operations::{count_set_ratings, list_splits, list_user_exercises};
use crate::error::Result;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRatings {
    pub exercise_id: i64,
    pub exercise_name: String,
    pub good: i64,
    pub bad: i64,
}

/// Good/bad tallies of one split, per exercise and in total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitRatings {
    pub split_id: i64,
    pub split_name: String,
    pub good: i64,
    pub bad: i64,
    pub exercises: Vec<ExerciseRatings>,
}

impl SplitRatings {
    /// Groups `exercises` under their `splits`, keeping both orders, and
    /// fills in the counted ratings. Sets still in flight are not counted.
    pub fn compute(
        splits: &[Split],
        exercises: &[Exercise],
        counts: &[RatingCount],
    ) -> Vec<SplitRatings> {
        let mut tallies: HashMap<i64, (i64, i64)> = HashMap::new();
        for count in counts {
            let entry = tallies.entry(count.exercise_id).or_default();
            match count.rating {
                SetRating::Good => entry.0 += count.count,
                SetRating::Bad => entry.1 += count.count,
                SetRating::Current | SetRating::Uncompleted => {}
            }
        }

        splits
            .iter()
            .map(|split| {
                let exercises: Vec<ExerciseRatings> = exercises
                    .iter()
                    .filter(|e| e.split_id == split.id)
                    .map(|e| {
                        let (good, bad) = tallies.get(&e.id).copied().unwrap_or_default();
                        ExerciseRatings {
                            exercise_id: e.id,
                            exercise_name: e.name.clone(),
                            good,
                            bad,
                        }
                    })
                    .collect();

                SplitRatings {
                    split_id: split.id,
                    split_name: split.name.clone(),
                    good: exercises.iter().map(|e| e.good).sum(),
                    bad: exercises.iter().map(|e| e.bad).sum(),
                    exercises,
                }
            })
            .collect()
    }
}

impl Session {
    pub async fn split_rating_summary(&self, user_id: i64) -> Result<Vec<SplitRatings>> {
        let mut conn = self.db_pool.acquire().await?;
        let splits = list_splits(&mut conn, user_id).await?;
        let exercises = list_user_exercises(&mut conn, user_id).await?;
        let counts = count_set_ratings(&mut conn, user_id).await?;
        Ok(SplitRatings::compute(&splits, &exercises, &counts))
    }
}

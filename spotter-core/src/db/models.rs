use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

// User models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// Split models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Split {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// Exercise models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: i64,
    pub split_id: i64,
    pub name: String,
    pub description: String,
    pub weight_from: f64,
    pub weight_to: f64,
    pub reps_from: i64,
    pub reps_to: i64,
    pub target_sets: i64,
    pub image_id: Option<i64>,
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} sets of {}-{} reps @ {:.1}-{:.1}kg",
            self.name, self.target_sets, self.reps_from, self.reps_to, self.weight_from, self.weight_to
        )
    }
}

/// Catalog input for creating or replacing an exercise definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExercise {
    pub name: String,
    pub description: String,
    pub weight_from: f64,
    pub weight_to: f64,
    pub reps_from: i64,
    pub reps_to: i64,
    pub target_sets: i64,
    pub image_id: Option<i64>,
}

impl NewExercise {
    /// Checks the catalog invariants; the error text is shown to the user.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("exercise name must not be empty".to_string());
        }
        if self.target_sets < 1 {
            return Err(format!(
                "target sets must be at least 1, got {}",
                self.target_sets
            ));
        }
        if self.weight_from < 0.0 || self.weight_from > self.weight_to {
            return Err(format!(
                "weight range {:.1}-{:.1} is invalid",
                self.weight_from, self.weight_to
            ));
        }
        if self.reps_from < 0 || self.reps_from > self.reps_to {
            return Err(format!(
                "reps range {}-{} is invalid",
                self.reps_from, self.reps_to
            ));
        }
        Ok(())
    }
}

// Workout models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Workout {
    pub id: i64,
    pub user_id: i64,
    pub split_id: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Workout {
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// Rating carried by a workout set.
///
/// `Current` marks the set in flight and `Uncompleted` only appears in
/// set strips for sets not started yet; completed sets are `Good` or `Bad`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum SetRating {
    Uncompleted,
    Current,
    Good,
    Bad,
}

impl SetRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetRating::Uncompleted => "uncompleted",
            SetRating::Current => "current",
            SetRating::Good => "good",
            SetRating::Bad => "bad",
        }
    }

    /// Whether a completed set may carry this rating.
    pub fn is_final(&self) -> bool {
        matches!(self, SetRating::Good | SetRating::Bad)
    }
}

impl fmt::Display for SetRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uncompleted" => Ok(SetRating::Uncompleted),
            "current" => Ok(SetRating::Current),
            "good" => Ok(SetRating::Good),
            "bad" => Ok(SetRating::Bad),
            _ => Err(format!("Unknown set rating: {}", s)),
        }
    }
}

// Set models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkoutSet {
    pub id: i64,
    pub workout_id: i64,
    pub exercise_id: i64,
    pub set_number: i64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: SetRating,
    pub weight_from: f64,
    pub weight_to: f64,
    pub reps_from: i64,
    pub reps_to: i64,
}

impl WorkoutSet {
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

impl fmt::Display for WorkoutSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Exercise #{} set {}: {}-{} reps @ {:.1}-{:.1}kg [{}]",
            self.exercise_id,
            self.set_number,
            self.reps_from,
            self.reps_to,
            self.weight_from,
            self.weight_to,
            self.rating
        )
    }
}

/// A split exercise annotated with whether the current workout touched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkoutExercise {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub exercise: Exercise,
    pub has_workout_set: bool,
}

/// One row of the recent-set feed, joined with split and exercise names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RecentSet {
    pub split_name: String,
    pub exercise_name: String,
    pub rating: SetRating,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Number of sets of one exercise carrying a given rating.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RatingCount {
    pub exercise_id: i64,
    pub rating: SetRating,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench_press() -> NewExercise {
        NewExercise {
            name: "Bench Press".into(),
            description: "Flat barbell".into(),
            weight_from: 60.0,
            weight_to: 80.0,
            reps_from: 6,
            reps_to: 10,
            target_sets: 3,
            image_id: None,
        }
    }

    #[test]
    fn rating_parses_case_insensitively() {
        assert_eq!("GOOD".parse::<SetRating>(), Ok(SetRating::Good));
        assert_eq!("current".parse::<SetRating>(), Ok(SetRating::Current));
        assert!("meh".parse::<SetRating>().is_err());
    }

    #[tokio::test]
    async fn rating_column_decodes_into_the_enum() {
        let pool = crate::test_utils::setup_test_db().await;
        let row: RecentSet = sqlx::query_as(
            "SELECT 'Push' AS split_name, 'Bench' AS exercise_name, 'bad' AS rating, NULL AS completed_at",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(row.rating, SetRating::Bad);

        let unknown = sqlx::query_as::<_, RatingCount>(
            "SELECT 1 AS exercise_id, 'meh' AS rating, 2 AS count",
        )
        .fetch_one(&pool)
        .await;
        assert!(unknown.is_err());
    }

    #[test]
    fn only_good_and_bad_are_final() {
        assert!(SetRating::Good.is_final());
        assert!(SetRating::Bad.is_final());
        assert!(!SetRating::Current.is_final());
        assert!(!SetRating::Uncompleted.is_final());
    }

    #[test]
    fn validate_accepts_sane_exercise() {
        assert!(bench_press().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_target_sets() {
        let exercise = NewExercise {
            target_sets: 0,
            ..bench_press()
        };
        let err = exercise.validate().unwrap_err();
        assert!(err.contains("target sets"), "{}", err);
    }

    #[test]
    fn validate_rejects_inverted_ranges() {
        let heavy = NewExercise {
            weight_from: 90.0,
            ..bench_press()
        };
        assert!(heavy.validate().is_err());

        let reps = NewExercise {
            reps_from: 12,
            ..bench_press()
        };
        assert!(reps.validate().is_err());

        let unnamed = NewExercise {
            name: "  ".into(),
            ..bench_press()
        };
        assert!(unnamed.validate().is_err());
    }
}

use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::db::models::Workout;
use crate::db::operations::list_completed_workouts;
use crate::error::Result;
use crate::numeric::percent_change;
use crate::session::Session;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthActivity {
    pub month: &'static str,
    pub this_year: i64,
    pub last_year: i64,
}

/// Completed workouts per calendar month for this year and last year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyActivity {
    pub months: Vec<MonthActivity>,
    /// This year's count for the current month.
    pub month_count: i64,
    /// Percent change of the current month against the same month last year.
    pub delta: f64,
}

impl MonthlyActivity {
    /// Buckets `workouts` by the month they started in. Workouts from years
    /// other than `today`'s and the one before are ignored.
    pub fn compute(workouts: &[Workout], today: NaiveDate) -> Self {
        let this_year = today.year();
        let last_year = this_year - 1;

        let mut months: Vec<MonthActivity> = MONTH_NAMES
            .iter()
            .map(|&month| MonthActivity {
                month,
                this_year: 0,
                last_year: 0,
            })
            .collect();

        for workout in workouts {
            let started = workout.started_at.date_naive();
            let bucket = &mut months[started.month0() as usize];
            if started.year() == this_year {
                bucket.this_year += 1;
            } else if started.year() == last_year {
                bucket.last_year += 1;
            }
        }

        let current = &months[today.month0() as usize];
        let month_count = current.this_year;
        let delta = percent_change(current.last_year, current.this_year);

        Self {
            months,
            month_count,
            delta,
        }
    }
}

impl Session {
    pub async fn monthly_activity(&self, user_id: i64) -> Result<MonthlyActivity> {
        self.monthly_activity_at(user_id, Utc::now().date_naive())
            .await
    }

    /// Same as [`Session::monthly_activity`] with an explicit "today".
    pub async fn monthly_activity_at(
        &self,
        user_id: i64,
        today: NaiveDate,
    ) -> Result<MonthlyActivity> {
        let mut conn = self.db_pool.acquire().await?;
        let workouts = list_completed_workouts(&mut conn, user_id).await?;
        Ok(MonthlyActivity::compute(&workouts, today))
    }
}

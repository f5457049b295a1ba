use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use dotenvy::dotenv;
use log::debug;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::io::{self, Write};

use spotter::db::models::{NewExercise, SetRating, Workout, WorkoutExercise};
use spotter::logging::{init_logger, parse_log_level};
use spotter::session::NextStep;
use spotter::{Config, Session, SessionError};

#[derive(Parser, Debug)]
#[command(version, about = "Spotter - guided workout sessions", long_about = None)]
struct Args {
    /// SQLite database url, overrides DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
    /// off, error, warn, info, debug or trace; overrides SPOTTER_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,
    /// Account to act as; created on first use
    #[arg(short, long, default_value = "me")]
    user: String,
    /// Print results as JSON
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RatingArg {
    Good,
    Bad,
}

impl From<RatingArg> for SetRating {
    fn from(rating: RatingArg) -> Self {
        match rating {
            RatingArg::Good => SetRating::Good,
            RatingArg::Bad => SetRating::Bad,
        }
    }
}

impl fmt::Display for RatingArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", SetRating::from(*self))
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a split
    SplitAdd {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List splits
    Splits,
    /// Add an exercise to a split
    ExerciseAdd {
        split: i64,
        name: String,
        #[arg(short, long, default_value_t = 3)]
        sets: i64,
        #[arg(long, default_value_t = 0.0)]
        weight_from: f64,
        #[arg(long, default_value_t = 0.0)]
        weight_to: f64,
        #[arg(long, default_value_t = 8)]
        reps_from: i64,
        #[arg(long, default_value_t = 12)]
        reps_to: i64,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List the exercises of a split
    Exercises { split: i64 },
    /// Start a workout of a split, or show the one already running
    Start { split: i64 },
    /// Start the first set of an exercise in the active workout
    Pick { exercise: i64 },
    /// Rate the set in progress and move to the next one
    Rate { rating: RatingArg },
    /// Complete the active workout
    Finish,
    /// Discard the active workout and its sets
    Abort,
    /// Show where the active workout stands
    Status,
    /// Recent sets, monthly activity and rating tallies
    Dashboard {
        #[arg(short, long)]
        limit: Option<i64>,
    },
    /// Delete every row, keeping the schema
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes a one-off message as `text`, or as `value` under `--json`.
fn write_notice<W: Write>(out: &mut W, json: bool, text: &str, value: Value) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    } else {
        writeln!(out, "{}", text)?;
    }
    Ok(())
}

fn notice(json: bool, text: &str, value: Value) -> Result<()> {
    write_notice(&mut io::stdout().lock(), json, text, value)
}

async fn active_workout(session: &Session, user_id: i64) -> Result<Workout> {
    session
        .active_workout(user_id)
        .await?
        .ok_or_else(|| anyhow!("No active workout. Start one with `spotter start <split>`"))
}

fn print_exercise_list(exercises: &[WorkoutExercise]) {
    println!("Pick the next exercise:");
    for entry in exercises {
        let marker = if entry.has_workout_set { "x" } else { " " };
        println!("  [{}] #{} {}", marker, entry.exercise.id, entry.exercise);
    }
}

async fn print_next_step(session: &Session, user_id: i64, workout_id: i64, json: bool) -> Result<()> {
    let step = session.next_step(user_id, workout_id).await?;
    if json {
        return print_json(&step);
    }
    match step {
        NextStep::Exercise(progress) => {
            let strip: Vec<&str> = progress.strip.iter().map(|r| r.as_str()).collect();
            println!(
                "{} - set {}/{}",
                progress.exercise.name, progress.set.set_number, progress.exercise.target_sets
            );
            println!(
                "  target {}-{} reps @ {:.1}-{:.1}kg",
                progress.set.reps_from,
                progress.set.reps_to,
                progress.set.weight_from,
                progress.set.weight_to
            );
            println!("  [{}]", strip.join(" "));
        }
        NextStep::PickExercise(exercises) => print_exercise_list(&exercises),
        NextStep::Finished => println!("Every exercise is done. Run `spotter finish`."),
    }
    Ok(())
}

async fn rate(session: &Session, user_id: i64, rating: RatingArg, json: bool) -> Result<()> {
    let workout = active_workout(session, user_id).await?;
    match session
        .record_set_result(user_id, workout.id, rating.into())
        .await
    {
        Ok(_) => print_next_step(session, user_id, workout.id, json).await,
        Err(SessionError::SetLimitReached) => {
            if session.finish_if_done(user_id, workout.id).await? {
                let metadata = session.workout_metadata(user_id, workout.id).await?;
                if json {
                    return print_json(&metadata);
                }
                println!("Workout complete in {}", metadata.elapsed_label);
                Ok(())
            } else {
                print_next_step(session, user_id, workout.id, json).await
            }
        }
        Err(e) if e.is_navigation() => {
            let message = e.to_string();
            notice(json, &message, json!({ "error": message }))
        }
        Err(e) => Err(e.into()),
    }
}

async fn status(session: &Session, user_id: i64, json: bool) -> Result<()> {
    let workout = active_workout(session, user_id).await?;
    let stats = session.active_session_stats(user_id, workout.id).await?;
    let metadata = session.workout_metadata(user_id, workout.id).await?;

    if json {
        print_json(&stats)?;
        print_json(&metadata)?;
    } else {
        println!(
            "{} (started {}, {} elapsed)",
            stats.split_name, metadata.started_label, metadata.elapsed_label
        );
        println!(
            "  remaining {} ({:.0}%) | in progress {} ({:.0}%) | done {} ({:.0}%)",
            stats.remaining,
            stats.remaining_pct,
            stats.in_progress,
            stats.progress_pct,
            stats.done,
            stats.done_pct
        );
    }
    print_next_step(session, user_id, workout.id, json).await
}

async fn dashboard(session: &Session, user_id: i64, limit: Option<i64>, json: bool) -> Result<()> {
    let feed = session.recent_set_feed(user_id, limit).await?;
    let activity = session.monthly_activity(user_id).await?;
    let ratings = session.split_rating_summary(user_id).await?;

    if json {
        print_json(&feed)?;
        print_json(&activity)?;
        return print_json(&ratings);
    }

    println!("Recent sets{}:", if feed.has_new_set { " (set in progress)" } else { "" });
    for set in &feed.sets {
        println!("  {} / {} - {}", set.split_name, set.exercise_name, set.rating);
    }

    println!(
        "\nThis month: {} workouts ({:+.0}% vs last year)",
        activity.month_count, activity.delta
    );
    for month in &activity.months {
        println!("  {} {:>3} {:>3}", month.month, month.this_year, month.last_year);
    }

    println!("\nRatings:");
    for split in &ratings {
        println!("  {}: {} good, {} bad", split.split_name, split.good, split.bad);
        for exercise in &split.exercises {
            println!(
                "    {}: {} good, {} bad",
                exercise.exercise_name, exercise.good, exercise.bad
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(level) = args.log_level.as_deref() {
        config.log_level =
            parse_log_level(level).ok_or_else(|| anyhow!("Unknown log level: {}", level))?;
    }
    init_logger(config.log_level);
    debug!("Using config {:?}", config);

    let session = Session::new(config).await?;
    let user = session.get_or_create_user(&args.user).await?;
    let json = args.json;

    match args.command {
        Commands::SplitAdd { name, description } => {
            let split = session.create_split(user.id, &name, &description).await?;
            if json {
                print_json(&split)?;
            } else {
                println!("Created split #{} {}", split.id, split.name);
            }
        }
        Commands::Splits => {
            let splits = session.list_splits(user.id).await?;
            if json {
                print_json(&splits)?;
            } else {
                for split in splits {
                    println!("#{} {} {}", split.id, split.name, split.description);
                }
            }
        }
        Commands::ExerciseAdd {
            split,
            name,
            sets,
            weight_from,
            weight_to,
            reps_from,
            reps_to,
            description,
        } => {
            let new = NewExercise {
                name,
                description,
                weight_from,
                weight_to,
                reps_from,
                reps_to,
                target_sets: sets,
                image_id: None,
            };
            let exercise = session.create_exercise(user.id, split, &new).await?;
            if json {
                print_json(&exercise)?;
            } else {
                println!("Added #{} {}", exercise.id, exercise);
            }
        }
        Commands::Exercises { split } => {
            let exercises = session.list_exercises(user.id, split).await?;
            if json {
                print_json(&exercises)?;
            } else {
                for exercise in exercises {
                    println!("#{} {}", exercise.id, exercise);
                }
            }
        }
        Commands::Start { split } => {
            let workout = session.start_workout(user.id, split).await?;
            if !json {
                println!("Workout #{} running", workout.id);
            }
            print_next_step(&session, user.id, workout.id, json).await?;
        }
        Commands::Pick { exercise } => {
            let workout = active_workout(&session, user.id).await?;
            match session.start_exercise(user.id, workout.id, exercise).await {
                Ok(_) => print_next_step(&session, user.id, workout.id, json).await?,
                Err(SessionError::SetLimitReached) => {
                    if !json {
                        println!("That exercise is already done.");
                    }
                    print_next_step(&session, user.id, workout.id, json).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Commands::Rate { rating } => {
            debug!("Rating set {}", rating);
            rate(&session, user.id, rating, json).await?;
        }
        Commands::Finish => {
            let workout = active_workout(&session, user.id).await?;
            let completed = session.complete_workout(user.id, workout.id).await?;
            let metadata = session.workout_metadata(user.id, completed.id).await?;
            if json {
                print_json(&metadata)?;
            } else {
                println!("Workout complete in {}", metadata.elapsed_label);
            }
        }
        Commands::Abort => {
            let workout = active_workout(&session, user.id).await?;
            session.abort_workout(user.id, workout.id).await?;
            notice(
                json,
                &format!("Workout #{} discarded", workout.id),
                json!({ "aborted": workout.id }),
            )?;
        }
        Commands::Status => status(&session, user.id, json).await?,
        Commands::Dashboard { limit } => dashboard(&session, user.id, limit, json).await?,
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to delete every row without --yes");
            }
            spotter::db::clear_all_tables(&session.db_pool).await?;
            notice(json, "All data deleted", json!({ "reset": true }))?;
        }
    }

    Ok(())
}

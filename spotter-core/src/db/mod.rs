pub mod models;
pub mod operations;

use anyhow::Result;
use log::{debug, info};
use sqlx::SqlitePool;

struct Migration {
    name: &'static str,
    up_sql: &'static str,
}

const MIGRATION_2025_11_11_220309_0000_SETUP_TABLES: &str =
    include_str!("../../migrations/2025-11-11-220309-0000_setup_tables/up.sql");

const MIGRATIONS: &[Migration] = &[Migration {
    name: "2025-11-11-220309-0000_setup_tables",
    up_sql: MIGRATION_2025_11_11_220309_0000_SETUP_TABLES,
}];

/// Clears every row while keeping the schema, children first.
pub async fn clear_all_tables(pool: &SqlitePool) -> Result<()> {
    for table in ["workout_sets", "workouts", "exercises", "splits", "users"] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn init_migrations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER NOT NULL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER))
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn is_migration_applied(pool: &SqlitePool, migration_name: &str) -> Result<bool> {
    let result =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _migrations WHERE name = ?1")
            .bind(migration_name)
            .fetch_one(pool)
            .await?;
    Ok(result > 0)
}

fn parse_sql_statements(sql: &str) -> Vec<String> {
    sql.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("--")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Applies every embedded migration that has not been recorded yet.
///
/// Each migration runs in its own transaction together with its
/// `_migrations` bookkeeping row, so a failed statement leaves no partial
/// schema behind.
pub async fn init_database(pool: &SqlitePool) -> Result<()> {
    init_migrations_table(pool).await?;

    for migration in MIGRATIONS {
        if is_migration_applied(pool, migration.name).await? {
            debug!("Migration {} already applied, skipping", migration.name);
            continue;
        }

        info!("Applying migration: {}", migration.name);
        let mut tx = pool.begin().await?;

        for statement in parse_sql_statements(migration.up_sql) {
            sqlx::query(&statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to execute migration statement in {}: {} - Error: {}",
                        migration.name,
                        statement,
                        e
                    )
                })?;
        }

        sqlx::query("INSERT INTO _migrations (name) VALUES (?1)")
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("Migration {} applied successfully", migration.name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[test]
    fn parse_sql_statements_skips_comments_and_blank_lines() {
        let sql = "-- header\nCREATE TABLE a (id INTEGER);\n\n  -- note\nCREATE INDEX a_id ON a(id);\n";
        let statements = parse_sql_statements(sql);
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (id INTEGER)", "CREATE INDEX a_id ON a(id)"]
        );
    }

    #[tokio::test]
    async fn init_database_creates_schema_and_is_idempotent() {
        let pool = setup_test_db().await;
        init_database(&pool).await.expect("second run should be a no-op");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('users', 'splits', 'exercises', 'workouts', 'workout_sets') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables.len(), 5);

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn clear_all_tables_keeps_schema() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO users (username, created_at) VALUES ('ada', '2025-01-01T00:00:00+00:00')")
            .execute(&pool)
            .await
            .unwrap();

        clear_all_tables(&pool).await.unwrap();

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
    }
}

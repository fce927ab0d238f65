//! Database initialization
//!
//! Creates the database file on first run, applies the schema (idempotent)
//! and seeds default settings.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Single connection: every connection to `sqlite::memory:` is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create all tables, indexes and triggers (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;

    // Organization tree
    create_areas_table(pool).await?;
    create_groups_table(pool).await?;
    create_programs_table(pool).await?;
    create_agencies_tables(pool).await?;

    // Accounts
    create_users_table(pool).await?;
    create_auth_tokens_table(pool).await?;

    // Questions and answers
    create_question_tables(pool).await?;
    create_answers_table(pool).await?;
    create_answer_cleanup_triggers(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_areas_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS areas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS program_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL COLLATE NOCASE,
            area_id INTEGER NOT NULL REFERENCES areas(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_program_groups_area ON program_groups(area_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_programs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS programs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL COLLATE NOCASE,
            description TEXT NOT NULL DEFAULT '',
            group_id INTEGER NOT NULL REFERENCES program_groups(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_programs_group ON programs(group_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_agencies_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agencies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agency_programs (
            agency_id INTEGER NOT NULL REFERENCES agencies(id) ON DELETE CASCADE,
            program_id INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
            PRIMARY KEY (agency_id, program_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            organization_id INTEGER REFERENCES agencies(id) ON DELETE SET NULL,
            is_advisor INTEGER NOT NULL DEFAULT 0,
            is_staff INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_auth_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_tokens (
            key TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_question_tables(pool: &SqlitePool) -> Result<()> {
    for table in ["nationalframework_questions", "keyagencyactions_questions"] {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                program_id INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            )
            "#
        ))
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evolution_questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            program_id INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            nascent_description TEXT NOT NULL DEFAULT '',
            engaged_description TEXT NOT NULL DEFAULT '',
            capable_description TEXT NOT NULL DEFAULT '',
            effective_description TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS linkages_questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            program_id INTEGER NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
            title TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Answers reference questions of several tables through
/// (`question_type`, `question_id`), so they carry no foreign key to the
/// question itself. Cleanup triggers keep them consistent instead.
async fn create_answers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            question_type TEXT NOT NULL,
            question_id INTEGER NOT NULL,
            short_answer TEXT,
            selected_tier TEXT,
            selected_programs TEXT,
            justify_answer TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (user_id, question_type, question_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_type, question_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete answers when their question goes away (also fires on cascades)
async fn create_answer_cleanup_triggers(pool: &SqlitePool) -> Result<()> {
    for (table, question_type) in [
        ("nationalframework_questions", "nationalframework"),
        ("keyagencyactions_questions", "keyagencyactions"),
        ("evolution_questions", "evolution"),
        ("linkages_questions", "linkages"),
    ] {
        sqlx::query(&format!(
            r#"
            CREATE TRIGGER IF NOT EXISTS trg_{table}_delete_answers
            AFTER DELETE ON {table}
            BEGIN
                DELETE FROM answers
                WHERE question_type = '{question_type}' AND question_id = OLD.id;
            END
            "#
        ))
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Initialize default settings
///
/// Missing keys and NULL values are reset to their defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "report_title", "Epic Report").await?;
    ensure_setting(pool, "report_subtitle", "").await?;
    ensure_setting(
        pool,
        "report_description",
        "An automatic generated report containing all the questions and answers taken by the users of the organization.",
    )
    .await?;

    info!("Default settings initialized");
    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    match value {
        None => {
            // INSERT OR IGNORE: concurrent initializers may race past the lookup
            sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(default_value)
                .execute(pool)
                .await?;
            info!("Initialized setting '{}' with default value: {}", key, default_value);
        }
        Some(None) => {
            sqlx::query("UPDATE settings SET value = ?, updated_at = CURRENT_TIMESTAMP WHERE key = ?")
                .bind(default_value)
                .bind(key)
                .execute(pool)
                .await?;
            info!("Reset NULL setting '{}' to default value: {}", key, default_value);
        }
        Some(Some(_)) => {}
    }

    Ok(())
}

/// Read a setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

/// Write a setting value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_default_settings() {
        let pool = init_memory_database().await.unwrap();

        let title = get_setting(&pool, "report_title").await.unwrap();
        assert_eq!(title.as_deref(), Some("Epic Report"));
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let pool = init_memory_database().await.unwrap();

        create_schema(&pool).await.expect("Second schema pass should succeed");

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[tokio::test]
    async fn test_null_setting_reset_to_default() {
        let pool = init_memory_database().await.unwrap();

        sqlx::query("UPDATE settings SET value = NULL WHERE key = 'report_title'")
            .execute(&pool)
            .await
            .unwrap();

        init_default_settings(&pool).await.unwrap();

        let title = get_setting(&pool, "report_title").await.unwrap();
        assert_eq!(title.as_deref(), Some("Epic Report"));
    }

    #[tokio::test]
    async fn test_deleting_question_removes_its_answers() {
        let pool = init_memory_database().await.unwrap();

        sqlx::query("INSERT INTO areas (id, name) VALUES (1, 'Area')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO program_groups (id, name, area_id) VALUES (1, 'Group', 1)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO programs (id, name, group_id) VALUES (1, 'Program', 1)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, password_salt) VALUES (1, 'u', '', '')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO linkages_questions (id, program_id, title) VALUES (7, 1, 'Q')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO answers (user_id, question_type, question_id, selected_programs) VALUES (1, 'linkages', 7, '[]')",
        )
        .execute(&pool)
        .await
        .unwrap();

        // Cascade from areas all the way down to the answer
        sqlx::query("DELETE FROM areas").execute(&pool).await.unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}

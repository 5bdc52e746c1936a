use anyhow::anyhow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

pub use challenges::NewChallenge;

/// Set restrictive file permissions (0600) on the database and WAL files.
fn set_db_file_permissions(db_path: &str) {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::Permissions::from_mode(0o600);
    // Main database file
    if let Err(e) = std::fs::set_permissions(db_path, mode.clone()) {
        tracing::warn!("Failed to set permissions on {}: {}", db_path, e);
    }
    // WAL and shared-memory files created by SQLite in WAL journal mode
    for suffix in &["-wal", "-shm"] {
        let path = format!("{}{}", db_path, suffix);
        if std::path::Path::new(&path).exists() {
            if let Err(e) = std::fs::set_permissions(&path, mode.clone()) {
                tracing::warn!("Failed to set permissions on {}: {}", path, e);
            }
        }
    }
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(db_path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;

        // Set restrictive file permissions (owner-only read/write)
        set_db_file_permissions(db_path);

        // Create tables
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS genres (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author_id INTEGER REFERENCES authors(id),
                genre_id INTEGER REFERENCES genres(id),
                pages INTEGER,
                rating REAL,
                start_date TEXT,
                end_date TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS challenges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                goal_value INTEGER NOT NULL,
                unit TEXT NOT NULL,
                year INTEGER NOT NULL,
                rule_description TEXT,
                query_sql TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_end_date ON books(end_date)")
            .execute(&pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_author ON books(author_id)")
            .execute(&pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_books_genre ON books(genre_id)")
            .execute(&pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_challenges_year ON challenges(year)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Run a compiled aggregate query and pull the `count` column out of its
    /// first row. The query text comes from the challenge compiler, so the
    /// shape is only loosely trusted here: a missing row is an error (the
    /// evaluator turns it into a failed evaluation), a result without a
    /// `count` column or with a NULL aggregate is zero, and REAL aggregates
    /// (SUM over an empty or float column) are truncated.
    pub async fn execute_count_query(&self, sql: &str) -> anyhow::Result<i64> {
        let row = sqlx::query(sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!("aggregate query failed: {}", e))?
            .ok_or_else(|| anyhow!("aggregate query returned no rows"))?;

        match row.try_get::<Option<i64>, _>("count") {
            Ok(value) => Ok(value.unwrap_or(0)),
            Err(sqlx::Error::ColumnNotFound(_)) => Ok(0),
            Err(_) => match row.try_get::<Option<f64>, _>("count") {
                Ok(value) => Ok(value.unwrap_or(0.0) as i64),
                Err(e) => Err(anyhow!("aggregate query returned a non-numeric value: {}", e)),
            },
        }
    }

    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }
}

mod challenges;
mod library;

use color_eyre::{eyre::eyre, Result};
use sqlx::{
    migrate::MigrateDatabase, query, query_scalar, sqlite::SqlitePoolOptions, Sqlite, SqlitePool,
};
use tracing::{debug, info};

/// Sets up the offline cache schema if it doesn't exist
pub async fn setup_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Named cache generations; a name exists even while it holds no entries
    query(
        "CREATE TABLE IF NOT EXISTS cache_store (
            name TEXT PRIMARY KEY,
            created TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    query(
        "CREATE TABLE IF NOT EXISTS cache_entry (
            cache_name TEXT NOT NULL,
            url TEXT NOT NULL,
            status INTEGER NOT NULL,
            status_text TEXT NOT NULL DEFAULT '',
            content_type TEXT,
            body BLOB NOT NULL,
            PRIMARY KEY (cache_name, url)
        )",
    )
    .execute(pool)
    .await?;

    ensure_column_exists(
        pool,
        "cache_entry",
        "stored_at",
        "ALTER TABLE cache_entry ADD COLUMN stored_at TEXT NOT NULL DEFAULT ''",
    )
    .await?;

    Ok(())
}

async fn ensure_column_exists(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    alter_statement: &str,
) -> Result<(), sqlx::Error> {
    let count: i64 = query_scalar(&format!(
        "SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?",
    ))
    .bind(column)
    .fetch_one(pool)
    .await?;

    if count == 0 {
        query(alter_statement).execute(pool).await?;
    }

    Ok(())
}

/// Creates the cache database if needed and returns a ready pool
pub async fn create_database_pool(database_url: &str) -> Result<SqlitePool> {
    debug!(database_url, "opening offline cache database");

    let db_path = extract_db_path_from_url(database_url)?;
    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| eyre!("Failed to create cache directory: {e}"))?;
        }
    }

    let db_exists = Sqlite::database_exists(database_url)
        .await
        .map_err(|e| eyre!("Error checking cache database: {e}"))?;

    if !db_exists {
        info!(path = %db_path, "creating offline cache database");
        Sqlite::create_database(database_url)
            .await
            .map_err(|e| eyre!("Failed to create SQLite database: {e}"))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _| {
            Box::pin(async move {
                use sqlx::Executor as _;
                conn.execute("PRAGMA journal_mode = WAL;").await?;
                conn.execute("PRAGMA synchronous = NORMAL;").await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
        .map_err(|e| eyre!("Failed to connect to SQLite database: {e}"))?;

    setup_database(&pool)
        .await
        .map_err(|e| eyre!("Failed to set up cache schema: {e}"))?;

    Ok(pool)
}

/// Helper function to extract the database path from a SQLite URL
fn extract_db_path_from_url(url: &str) -> Result<String> {
    let Some(path_part) = url.strip_prefix("sqlite://") else {
        return Err(eyre!("Not a valid SQLite URL: {url}"));
    };

    if cfg!(windows) {
        // sqlite:///C:/path
        if let Some(stripped) = path_part.strip_prefix('/') {
            if stripped.find(':').is_some_and(|idx| idx > 0) {
                return Ok(stripped.to_string());
            }
        }
    }

    Ok(path_part.to_string())
}

/// Throwaway cache used when the database file cannot be opened
pub async fn in_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    // One connection: every sqlite::memory: connection is its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    setup_database(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paths_from_sqlite_urls() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(extract_db_path_from_url("sqlite:///data/cache.db")?, "/data/cache.db");
        assert_eq!(extract_db_path_from_url("sqlite://rw/cache.db")?, "rw/cache.db");
        assert!(extract_db_path_from_url("postgres://x").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn setup_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let pool = in_memory_pool().await?;
        setup_database(&pool).await?;

        let columns: i64 = query_scalar(
            "SELECT COUNT(*) FROM pragma_table_info('cache_entry') WHERE name = 'stored_at'",
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(columns, 1);
        Ok(())
    }
}

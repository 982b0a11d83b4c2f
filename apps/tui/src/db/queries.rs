use sqlx::{query, query_as, query_scalar, SqlitePool};

use crate::db::models::{CacheEntryRecord, CachedResponse};

/// Registers a cache name, like opening a cache that may not exist yet
pub async fn open_cache(pool: &SqlitePool, name: &str) -> Result<(), sqlx::Error> {
    query("INSERT OR IGNORE INTO cache_store (name, created) VALUES (?, ?)")
        .bind(name)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn cache_names(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    query_scalar("SELECT name FROM cache_store ORDER BY name")
        .fetch_all(pool)
        .await
}

/// Deletes a cache and everything stored in it. Returns whether it existed.
pub async fn delete_cache(pool: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    query("DELETE FROM cache_entry WHERE cache_name = ?")
        .bind(name)
        .execute(&mut *tx)
        .await?;
    let removed = query("DELETE FROM cache_store WHERE name = ?")
        .bind(name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(removed > 0)
}

/// Stores `response` under `url`, replacing any earlier copy
pub async fn put_entry(
    pool: &SqlitePool,
    cache_name: &str,
    url: &str,
    response: &CachedResponse,
) -> Result<(), sqlx::Error> {
    open_cache(pool, cache_name).await?;

    query(
        "INSERT OR REPLACE INTO cache_entry \
         (cache_name, url, status, status_text, content_type, body, stored_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(cache_name)
    .bind(url)
    .bind(i64::from(response.status))
    .bind(&response.status_text)
    .bind(&response.content_type)
    .bind(&response.body)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Looks `url` up in a single cache
pub async fn match_entry(
    pool: &SqlitePool,
    cache_name: &str,
    url: &str,
) -> Result<Option<CacheEntryRecord>, sqlx::Error> {
    query_as::<_, CacheEntryRecord>(
        "SELECT cache_name, url, status, status_text, content_type, body, stored_at \
         FROM cache_entry WHERE cache_name = ? AND url = ?",
    )
    .bind(cache_name)
    .bind(url)
    .fetch_optional(pool)
    .await
}

/// Looks `url` up across every cache, oldest cache name first
pub async fn match_any(
    pool: &SqlitePool,
    url: &str,
) -> Result<Option<CacheEntryRecord>, sqlx::Error> {
    query_as::<_, CacheEntryRecord>(
        "SELECT cache_name, url, status, status_text, content_type, body, stored_at \
         FROM cache_entry WHERE url = ? ORDER BY cache_name LIMIT 1",
    )
    .bind(url)
    .fetch_optional(pool)
    .await
}

pub async fn count_entries(pool: &SqlitePool, cache_name: &str) -> Result<i64, sqlx::Error> {
    query_scalar("SELECT COUNT(*) FROM cache_entry WHERE cache_name = ?")
        .bind(cache_name)
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::in_memory_pool;

    fn ok_body(body: &str) -> CachedResponse {
        CachedResponse {
            status: 200,
            status_text: "OK".to_string(),
            content_type: Some("application/json".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_and_match_entry() -> Result<(), Box<dyn std::error::Error>> {
        let pool = in_memory_pool().await?;

        put_entry(&pool, "data-v1", "http://x/FinalData.json", &ok_body("[]")).await?;
        put_entry(&pool, "data-v1", "http://x/FinalData.json", &ok_body("[{}]")).await?;

        let record = match_entry(&pool, "data-v1", "http://x/FinalData.json")
            .await?
            .ok_or("missing entry")?;
        assert_eq!(CachedResponse::from(record).text(), "[{}]");
        assert_eq!(count_entries(&pool, "data-v1").await?, 1);
        assert!(match_entry(&pool, "other", "http://x/FinalData.json").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cache_removes_entries() -> Result<(), Box<dyn std::error::Error>> {
        let pool = in_memory_pool().await?;

        open_cache(&pool, "empty").await?;
        put_entry(&pool, "shell-v0", "http://x/", &ok_body("<html>")).await?;
        assert_eq!(cache_names(&pool).await?, vec!["empty", "shell-v0"]);

        assert!(delete_cache(&pool, "shell-v0").await?);
        assert!(!delete_cache(&pool, "shell-v0").await?);
        assert!(match_any(&pool, "http://x/").await?.is_none());
        assert_eq!(cache_names(&pool).await?, vec!["empty"]);

        Ok(())
    }
}

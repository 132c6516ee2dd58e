use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tripflow_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Opens the workflow database described by the config section.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

/// Pool tuned for the request/route/receipt tables: foreign keys enforce
/// the route and receipt cascades, WAL keeps review-queue reads open while
/// a transition commits, and the busy timeout tracks the configured
/// acquire timeout so lock waits and pool waits give up together.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let busy_timeout_ms = timeout_secs.clamp(1, 60) * 1_000;
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use tripflow_core::config::DatabaseConfig;

    use super::{connect, connect_with_settings};

    #[tokio::test]
    async fn busy_timeout_tracks_the_acquire_timeout() {
        let pool = connect_with_settings("sqlite::memory:", 1, 7).await.expect("connect");

        let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&pool)
            .await
            .expect("read pragma");
        assert_eq!(busy_timeout, 7_000);

        let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("read pragma");
        assert_eq!(foreign_keys, 1);
    }

    #[tokio::test]
    async fn connect_uses_the_database_config_section() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            timeout_secs: 3,
        };
        let pool = connect(&config).await.expect("connect");

        let busy_timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
            .fetch_one(&pool)
            .await
            .expect("read pragma");
        assert_eq!(busy_timeout, 3_000);
    }
}

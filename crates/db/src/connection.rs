//! Sqlite pool construction with the pragmas the stores rely on.

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use switchboard_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Builds the pool described by the `database` config section.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&config.url, config.max_connections, config.timeout_secs).await
}

/// Pool with explicit settings; tests use this with `sqlite::memory:` urls.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    // A writer waiting on sqlite's file lock should give up no later than a
    // caller waiting on the pool, capped so a generous acquire timeout does
    // not turn into a multi-minute lock wait.
    let busy_timeout_ms = timeout_secs.clamp(1, 30) * 1000;

    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query(&format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

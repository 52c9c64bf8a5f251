//! Database connection pool management

use std::future::Future;
use std::time::Duration;

#[cfg(feature = "database")]
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::StorageError;
#[cfg(feature = "database")]
use crate::{config::DatabaseConfig, error::Result};

/// Create a PostgreSQL connection pool with retry logic
///
/// Retries use exponential backoff starting at `retry_delay_secs`. Errors that
/// are not retriable (authentication, unknown database) fail immediately.
#[cfg(feature = "database")]
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = retry_with_backoff(
        config.max_retries,
        Duration::from_secs(config.retry_delay_secs),
        || try_create_pool(config),
    )
    .await?;

    tracing::info!(
        "Database connection pool created: max={}, min={}, target={}",
        config.max_connections,
        config.min_connections,
        config
    );
    Ok(pool)
}

/// Run `attempt` until it succeeds, fails with a non-retriable error, or
/// `max_retries` retries are spent
///
/// The delay before retry `n` is `base_delay * 2^(n-1)`.
#[cfg_attr(not(feature = "database"), allow(dead_code))]
async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    base_delay: Duration,
    mut attempt: F,
) -> std::result::Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, StorageError>>,
{
    let mut retries = 0;

    loop {
        match attempt().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        retries + 1
                    );
                }
                return Ok(value);
            }
            Err(e) if !e.is_retriable() => {
                tracing::error!("Database connection failed with a non-retriable error: {}", e);
                return Err(e);
            }
            Err(e) => {
                retries += 1;

                if retries > max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.saturating_pow(retries - 1);

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    retries,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a database pool (single try)
#[cfg(feature = "database")]
async fn try_create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, StorageError> {
    let url = config.connection_url();
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connection_timeout())
        .connect(&url)
        .await
        .map_err(|e| {
            StorageError::from(e)
                .during(crate::error::StorageOperation::Connect)
                .add_context(sanitize_url(&url))
        })
}

/// Sanitize a database URL by removing credentials
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(scheme_end) = url.find("://") {
            if scheme_end < at_pos {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos + 1..];
                return format!("{}<redacted>@{}", scheme, after_at);
            }
        }
    }
    url.to_string()
}

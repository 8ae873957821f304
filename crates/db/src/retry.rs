use std::{future::Future, time::Duration};

use sea_orm::DbErr;

const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF_MS: u64 = 50;
const MAX_BACKOFF_MS: u64 = 1_000;

/// Re-runs `op` while SQLite reports the database as locked or busy.
pub async fn retry_on_sqlite_busy<T, F, Fut>(mut op: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_sqlite_busy(&err) && attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::debug!(attempt, "sqlite busy, retrying in {:?}", backoff);
                tokio::time::sleep(backoff).await;
                let next_ms = (backoff.as_millis() as u64)
                    .saturating_mul(2)
                    .min(MAX_BACKOFF_MS);
                backoff = Duration::from_millis(next_ms);
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn is_sqlite_busy(err: &DbErr) -> bool {
    let message = err.to_string();
    message.contains("database is locked")
        || message.contains("database is busy")
        || message.contains("SQLITE_BUSY")
}

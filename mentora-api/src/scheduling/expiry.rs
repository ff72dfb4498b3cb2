use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use mentora_shared::clients::db::{interact, DbPool};
use mentora_shared::errors::AppResult;

use super::{PgScheduleStore, TransactionalStore};

/// Moves every `upcoming` session whose end has passed to `past`.
/// Returns how many sessions changed; a second run right after returns 0.
pub fn mark_expired<S: TransactionalStore>(
    store: &mut S,
    now: DateTime<Utc>,
) -> AppResult<usize> {
    let expired = store.atomically(|tx| tx.expire_sessions(now))?;
    if !expired.is_empty() {
        metrics::counter!("sessions_expired_total").increment(expired.len() as u64);
        tracing::info!(count = expired.len(), "sessions marked as past");
    }
    Ok(expired.len())
}

/// Runs [`mark_expired`] against the database every `interval`.
/// Returns `None` when the interval is zero.
pub fn spawn_expiry_sweep(pool: DbPool, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("expiry sweep disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "expiry sweep started");
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            let result = interact(&pool, |conn| {
                mark_expired(&mut PgScheduleStore::new(conn), Utc::now())
            })
            .await;

            if let Err(e) = result {
                tracing::warn!(error = %e, "expiry sweep failed");
            }
        }
    }))
}

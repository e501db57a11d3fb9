//! Periodic deletion of expired session rows.
//!
//! Expired sessions are already refused by refresh; this job only keeps the
//! table from growing without bound.

use std::time::Duration;

use iris_core::session::SessionManager;
use tokio_util::sync::CancellationToken;

/// Run the session cleanup loop until `cancel` is triggered.
///
/// The first sweep happens immediately.
pub async fn run(sessions: SessionManager, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Session cleanup job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match sessions.purge_expired().await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Session cleanup: purged expired sessions");
                    }
                    Ok(_) => tracing::debug!("Session cleanup: nothing to purge"),
                    Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
                }
            }
        }
    }
}

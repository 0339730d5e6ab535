use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::app::moderation::ModerationService;

/// Periodically drops temporary infractions whose expiry has passed.
pub async fn run(service: ModerationService, interval: Duration) {
    info!(interval_seconds = interval.as_secs(), "expiry sweeper started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(&service, OffsetDateTime::now_utc()).await;
    }
}

pub async fn sweep_once(service: &ModerationService, now: OffsetDateTime) -> usize {
    match service.expire_temporary_infractions(now).await {
        Ok(expired) => {
            for entry in &expired {
                info!(
                    user_id = entry.user_id,
                    kind = ?entry.kind,
                    expired_at = %entry.expired_at,
                    "temporary infraction expired"
                );
            }
            expired.len()
        }
        Err(err) => {
            error!(error = ?err, "failed to expire temporary infractions");
            0
        }
    }
}

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::notification::DirectMessage;
use crate::infra::notifier::Notifier;

/// Drains queued direct messages until every sender is dropped.
pub async fn run(mut rx: mpsc::Receiver<DirectMessage>, notifier: Arc<dyn Notifier>) {
    info!("notification sender started");
    while let Some(message) = rx.recv().await {
        match notifier
            .try_send_message(&message.recipient, &message.text)
            .await
        {
            Ok(()) => {
                debug!(user_id = message.recipient.id, "direct message delivered");
            }
            Err(err) => {
                warn!(
                    error = ?err,
                    user_id = message.recipient.id,
                    "failed to deliver direct message"
                );
            }
        }
    }
    info!("notification sender stopped");
}

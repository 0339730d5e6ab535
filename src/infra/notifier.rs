use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::domain::user::Member;

/// Delivers a direct message to a chat member.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn try_send_message(&self, recipient: &Member, text: &str) -> Result<()>;
}

/// Writes messages to the log instead of a chat platform.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn try_send_message(&self, recipient: &Member, text: &str) -> Result<()> {
        info!(user_id = recipient.id, recipient = %recipient, message = text, "direct message");
        Ok(())
    }
}

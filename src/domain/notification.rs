use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::user::Member;

/// A direct message queued for best-effort delivery to a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    pub recipient: Member,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub queued_at: OffsetDateTime,
}

impl DirectMessage {
    pub fn new(recipient: Member, text: impl Into<String>) -> Self {
        Self {
            recipient,
            text: text.into(),
            queued_at: OffsetDateTime::now_utc(),
        }
    }
}

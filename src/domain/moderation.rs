use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub type InfractionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfractionKind {
    Warning,
    Mute,
    TemporaryMute,
    Kick,
    TemporaryBan,
    Ban,
}

impl InfractionKind {
    /// Ban flows message the user themselves, so the generic infraction DM skips them.
    pub fn has_own_ban_notice(self) -> bool {
        matches!(self, InfractionKind::Ban | InfractionKind::TemporaryBan)
    }

    pub fn is_temporary(self) -> bool {
        matches!(
            self,
            InfractionKind::TemporaryMute | InfractionKind::TemporaryBan
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporaryInfractionKind {
    Mute,
    Ban,
}

impl TemporaryInfractionKind {
    pub fn as_infraction_kind(self) -> InfractionKind {
        match self {
            TemporaryInfractionKind::Mute => InfractionKind::TemporaryMute,
            TemporaryInfractionKind::Ban => InfractionKind::TemporaryBan,
        }
    }
}

/// Permanent audit entry for a disciplinary action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infraction {
    pub id: InfractionId,
    pub kind: InfractionKind,
    pub moderator_id: u64,
    pub description: String,
    pub additional_info: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Infraction {
    pub fn new(id: InfractionId, kind: InfractionKind, moderator_id: u64) -> Self {
        Self {
            id,
            kind,
            moderator_id,
            description: String::new(),
            additional_info: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_additional_info(mut self, info: impl Into<String>) -> Self {
        let info = info.into();
        self.additional_info = if info.trim().is_empty() {
            None
        } else {
            Some(info)
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporaryInfraction {
    pub kind: TemporaryInfractionKind,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl TemporaryInfraction {
    pub fn new(kind: TemporaryInfractionKind, expires_at: OffsetDateTime) -> Self {
        Self { kind, expires_at }
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

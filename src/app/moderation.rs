use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::info;

use crate::app::humanize::humanize;
use crate::app::notifications::{self, NotificationService};
use crate::domain::moderation::{
    Infraction, InfractionId, TemporaryInfraction, TemporaryInfractionKind,
};
use crate::domain::user::{ExpiredInfraction, Member, RecordCollection, UserRecord};
use crate::infra::storage::RecordPersistence;

#[derive(Debug, Clone, Serialize)]
pub struct OwnedInfraction {
    pub user_id: u64,
    pub infraction: Infraction,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfractionUpdate {
    pub user_id: u64,
    pub old_description: String,
    pub infraction: Infraction,
}

#[derive(Debug, Clone)]
pub struct NewTemporaryInfraction {
    pub kind: TemporaryInfractionKind,
    pub moderator_id: u64,
    pub duration: Duration,
    pub reason: String,
    pub additional_info: String,
}

/// Owns the record collection. Every mutation takes the store lock and holds it
/// until the collection has been persisted. A failed save is undone in memory.
#[derive(Clone)]
pub struct ModerationService {
    records: Arc<Mutex<RecordCollection>>,
    persistence: Arc<dyn RecordPersistence>,
    notifications: NotificationService,
}

impl ModerationService {
    pub fn new(
        records: RecordCollection,
        persistence: Arc<dyn RecordPersistence>,
        notifications: NotificationService,
    ) -> Result<Self> {
        Ok(Self {
            records: Arc::new(Mutex::new(records.with_reconciled_counter()?)),
            persistence,
            notifications,
        })
    }

    pub async fn load(
        persistence: Arc<dyn RecordPersistence>,
        notifications: NotificationService,
    ) -> Result<Self> {
        let records = persistence.load().await?;
        Self::new(records, persistence, notifications)
    }

    /// Records an infraction and DMs the member about it.
    pub async fn add_infraction(&self, user: &Member, infraction: Infraction) -> Result<()> {
        let count = self.record_infraction(user.id, infraction.clone()).await?;
        if let Some(text) = notifications::infraction_message(&infraction, count) {
            self.notifications.notify(user.clone(), text);
        }
        Ok(())
    }

    /// Records an infraction for a user without messaging them.
    pub async fn add_infraction_for(&self, user_id: u64, infraction: Infraction) -> Result<()> {
        self.record_infraction(user_id, infraction).await?;
        Ok(())
    }

    async fn record_infraction(&self, user_id: u64, infraction: Infraction) -> Result<usize> {
        let mut records = self.records.lock().await;
        if records.contains_infraction(infraction.id) {
            bail!("infraction id {} is already in use", infraction.id);
        }

        let before = records.clone();
        let infraction_id = infraction.id;
        let kind = infraction.kind;
        records.observe_infraction_id(infraction_id)?;
        let user = records.get_or_create(user_id);
        user.infractions.push(infraction);
        let count = user.infractions.len();

        self.commit(&mut records, before).await?;
        info!(user_id, infraction_id, kind = ?kind, "infraction recorded");
        Ok(count)
    }

    /// Applies a temporary mute/ban, replacing any active one of the same kind,
    /// and writes the matching audit infraction. The member is told the duration.
    pub async fn add_temporary_infraction(
        &self,
        user: &Member,
        request: NewTemporaryInfraction,
    ) -> Result<Infraction> {
        let duration = request.duration;
        let (infraction, count) = self.record_temporary_infraction(user.id, request).await?;
        if let Some(text) =
            notifications::temporary_infraction_message(&infraction, duration, count)
        {
            self.notifications.notify(user.clone(), text);
        }
        Ok(infraction)
    }

    pub async fn add_temporary_infraction_for(
        &self,
        user_id: u64,
        request: NewTemporaryInfraction,
    ) -> Result<Infraction> {
        let (infraction, _) = self.record_temporary_infraction(user_id, request).await?;
        Ok(infraction)
    }

    async fn record_temporary_infraction(
        &self,
        user_id: u64,
        request: NewTemporaryInfraction,
    ) -> Result<(Infraction, usize)> {
        if !request.duration.is_positive() {
            bail!("temporary infraction duration must be positive");
        }

        let Some(expires_at) = OffsetDateTime::now_utc().checked_add(request.duration) else {
            bail!("temporary infraction duration is out of range");
        };
        let human_duration = humanize(request.duration);
        let additional_info = if request.additional_info.trim().is_empty() {
            format!("Duration: {}", human_duration)
        } else {
            format!("{}\nDuration: {}", request.additional_info, human_duration)
        };

        let mut records = self.records.lock().await;
        let before = records.clone();
        let id = records.request_infraction_id()?;
        let infraction = Infraction::new(
            id,
            request.kind.as_infraction_kind(),
            request.moderator_id,
        )
        .with_description(request.reason)
        .with_additional_info(additional_info);

        let user = records.get_or_create(user_id);
        user.set_temporary_infraction(TemporaryInfraction::new(request.kind, expires_at));
        user.infractions.push(infraction.clone());
        let count = user.infractions.len();

        self.commit(&mut records, before).await?;
        info!(
            user_id,
            infraction_id = id,
            kind = ?request.kind,
            expires_at = %expires_at,
            "temporary infraction applied"
        );
        Ok((infraction, count))
    }

    /// Lifts the temporary infraction of `kind`. Returns how many entries were removed.
    pub async fn clear_temporary_infraction(
        &self,
        kind: TemporaryInfractionKind,
        user_id: u64,
    ) -> Result<usize> {
        let mut records = self.records.lock().await;
        let before = records.clone();
        let removed = records
            .get_mut(user_id)
            .map_or(0, |user| user.clear_temporary_infraction(kind));
        if removed == 0 {
            return Ok(0);
        }

        self.commit(&mut records, before).await?;
        info!(user_id, kind = ?kind, "temporary infraction cleared");
        Ok(removed)
    }

    /// Empties the user's permanent infraction list, leaving temporary ones alone.
    pub async fn clear_infractions(&self, user_id: u64) -> Result<usize> {
        let mut records = self.records.lock().await;
        let before = records.clone();
        let cleared = records
            .get_mut(user_id)
            .map_or(0, |user| std::mem::take(&mut user.infractions).len());
        if cleared == 0 {
            return Ok(0);
        }

        self.commit(&mut records, before).await?;
        info!(user_id, cleared, "infractions cleared");
        Ok(cleared)
    }

    pub async fn delete_infraction(&self, id: InfractionId) -> Result<bool> {
        let mut records = self.records.lock().await;
        let before = records.clone();
        let Some((user_id, _)) = records.remove_infraction(id) else {
            return Ok(false);
        };

        self.commit(&mut records, before).await?;
        info!(user_id, infraction_id = id, "infraction deleted");
        Ok(true)
    }

    pub async fn try_get_infraction(&self, id: InfractionId) -> Option<OwnedInfraction> {
        let records = self.records.lock().await;
        records
            .find_infraction(id)
            .map(|(user, infraction)| OwnedInfraction {
                user_id: user.id,
                infraction: infraction.clone(),
            })
    }

    /// Rewrites an infraction's description in place. Id, owner and position are
    /// kept and the member is not messaged.
    pub async fn try_update_infraction(
        &self,
        id: InfractionId,
        description: impl Into<String>,
    ) -> Result<Option<InfractionUpdate>> {
        let mut records = self.records.lock().await;
        let before = records.clone();
        let Some((user_id, infraction)) = records.find_infraction_mut(id) else {
            return Ok(None);
        };

        let old_description = std::mem::replace(&mut infraction.description, description.into());
        let update = InfractionUpdate {
            user_id,
            old_description,
            infraction: infraction.clone(),
        };

        self.commit(&mut records, before).await?;
        info!(user_id, infraction_id = id, "infraction description updated");
        Ok(Some(update))
    }

    /// Reserves the next infraction id. Ids are never handed out twice.
    pub async fn request_infraction_id(&self) -> Result<InfractionId> {
        self.records.lock().await.request_infraction_id()
    }

    pub async fn get_user(&self, user_id: u64) -> Option<UserRecord> {
        self.records.lock().await.get(user_id).cloned()
    }

    pub async fn users_with_temporary_infractions(&self) -> Vec<UserRecord> {
        self.records
            .lock()
            .await
            .users_with_temporary_infractions()
            .cloned()
            .collect()
    }

    /// Removes temporary infractions that are due at `now`, persisting once if any were.
    pub async fn expire_temporary_infractions(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<ExpiredInfraction>> {
        let mut records = self.records.lock().await;
        let before = records.clone();
        let expired = records.expire_temporary_infractions(now);
        if !expired.is_empty() {
            self.commit(&mut records, before).await?;
        }
        Ok(expired)
    }

    /// Saves `records`, putting `before` back in memory when the write fails.
    async fn commit(&self, records: &mut RecordCollection, before: RecordCollection) -> Result<()> {
        if let Err(err) = self.persistence.save(records).await {
            *records = before;
            return Err(err);
        }
        Ok(())
    }
}

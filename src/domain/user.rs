use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::moderation::{
    Infraction, InfractionId, TemporaryInfraction, TemporaryInfractionKind,
};

/// Handle for a chat member: a stable id plus something printable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub display_name: String,
}

impl Member {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    #[serde(default)]
    pub infractions: Vec<Infraction>,
    #[serde(default)]
    pub temporary_infractions: Vec<TemporaryInfraction>,
}

impl UserRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            infractions: Vec::new(),
            temporary_infractions: Vec::new(),
        }
    }

    /// Replaces any active temporary infraction of the same kind.
    pub fn set_temporary_infraction(&mut self, temporary: TemporaryInfraction) {
        self.clear_temporary_infraction(temporary.kind);
        self.temporary_infractions.push(temporary);
    }

    pub fn clear_temporary_infraction(&mut self, kind: TemporaryInfractionKind) -> usize {
        let before = self.temporary_infractions.len();
        self.temporary_infractions.retain(|t| t.kind != kind);
        before - self.temporary_infractions.len()
    }

    pub fn temporary_infraction(&self, kind: TemporaryInfractionKind) -> Option<&TemporaryInfraction> {
        self.temporary_infractions.iter().find(|t| t.kind == kind)
    }

    pub fn has_temporary_infractions(&self) -> bool {
        !self.temporary_infractions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpiredInfraction {
    pub user_id: u64,
    pub kind: TemporaryInfractionKind,
    #[serde(with = "time::serde::rfc3339")]
    pub expired_at: OffsetDateTime,
}

/// Every user's moderation record, keyed by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordCollection {
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    next_infraction_id: InfractionId,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            next_infraction_id: 1,
        }
    }

    pub fn from_users(users: Vec<UserRecord>) -> Result<Self> {
        Self {
            users,
            next_infraction_id: 0,
        }
        .with_reconciled_counter()
    }

    /// Ensures the id counter is ahead of every stored infraction. Call after deserializing.
    ///
    /// Fails when a stored id has no successor, since no id could then be handed out safely.
    pub fn with_reconciled_counter(mut self) -> Result<Self> {
        let floor = match self.max_infraction_id() {
            Some(max) => successor(max)?,
            None => 1,
        };
        self.next_infraction_id = self.next_infraction_id.max(floor);
        Ok(self)
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn get(&self, id: u64) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    /// Appends an empty record. Callers go through `get_or_create` to avoid duplicates.
    pub fn create(&mut self, id: u64) -> &mut UserRecord {
        self.users.push(UserRecord::new(id));
        let last = self.users.len() - 1;
        &mut self.users[last]
    }

    pub fn get_or_create(&mut self, id: u64) -> &mut UserRecord {
        match self.users.iter().position(|u| u.id == id) {
            Some(index) => &mut self.users[index],
            None => self.create(id),
        }
    }

    pub fn users_with_temporary_infractions(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.iter().filter(|u| u.has_temporary_infractions())
    }

    pub fn max_infraction_id(&self) -> Option<InfractionId> {
        self.users
            .iter()
            .flat_map(|u| u.infractions.iter())
            .map(|i| i.id)
            .max()
    }

    pub fn next_infraction_id(&self) -> InfractionId {
        self.next_infraction_id
    }

    /// Reserves and returns the next unused infraction id.
    pub fn request_infraction_id(&mut self) -> Result<InfractionId> {
        let id = self.next_infraction_id.max(1);
        self.next_infraction_id = successor(id)?;
        Ok(id)
    }

    /// Keeps the counter ahead of ids assigned outside `request_infraction_id`.
    /// The counter is left untouched when `id` is rejected.
    pub fn observe_infraction_id(&mut self, id: InfractionId) -> Result<()> {
        if id >= self.next_infraction_id {
            self.next_infraction_id = successor(id)?;
        }
        Ok(())
    }

    pub fn contains_infraction(&self, id: InfractionId) -> bool {
        self.find_infraction(id).is_some()
    }

    pub fn find_infraction(&self, id: InfractionId) -> Option<(&UserRecord, &Infraction)> {
        self.users.iter().find_map(|user| {
            user.infractions
                .iter()
                .find(|i| i.id == id)
                .map(|infraction| (user, infraction))
        })
    }

    pub fn find_infraction_mut(&mut self, id: InfractionId) -> Option<(u64, &mut Infraction)> {
        self.users.iter_mut().find_map(|user| {
            let user_id = user.id;
            user.infractions
                .iter_mut()
                .find(|i| i.id == id)
                .map(|infraction| (user_id, infraction))
        })
    }

    pub fn remove_infraction(&mut self, id: InfractionId) -> Option<(u64, Infraction)> {
        self.users.iter_mut().find_map(|user| {
            let index = user.infractions.iter().position(|i| i.id == id)?;
            Some((user.id, user.infractions.remove(index)))
        })
    }

    /// Drops temporary infractions whose expiry is at or before `now`.
    pub fn expire_temporary_infractions(&mut self, now: OffsetDateTime) -> Vec<ExpiredInfraction> {
        let mut expired = Vec::new();
        for user in self.users.iter_mut().filter(|u| u.has_temporary_infractions()) {
            let user_id = user.id;
            user.temporary_infractions.retain(|temp| {
                if temp.is_expired(now) {
                    expired.push(ExpiredInfraction {
                        user_id,
                        kind: temp.kind,
                        expired_at: temp.expires_at,
                    });
                    false
                } else {
                    true
                }
            });
        }
        expired
    }
}

impl Default for RecordCollection {
    fn default() -> Self {
        Self::new()
    }
}

fn successor(id: InfractionId) -> Result<InfractionId> {
    id.checked_add(1)
        .ok_or_else(|| anyhow!("infraction id {} has no successor", id))
}

use std::sync::Arc;

use time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::app::humanize::humanize;
use crate::domain::moderation::{Infraction, InfractionKind};
use crate::domain::notification::DirectMessage;
use crate::domain::user::Member;
use crate::infra::notifier::Notifier;
use crate::jobs::notification_sender;

const WARNING_TAIL: &str = "Be careful; accumulating infractions may result in restricted access or even (permanent) removal from the server!";

/// Fire-and-forget handle onto the notification worker.
///
/// Enqueueing never blocks and never reports failure to the caller. Delivery
/// outcomes are only visible in the worker's logs.
#[derive(Clone)]
pub struct NotificationService {
    tx: mpsc::Sender<DirectMessage>,
}

impl NotificationService {
    pub fn new(tx: mpsc::Sender<DirectMessage>) -> Self {
        Self { tx }
    }

    /// Starts a detached worker draining a queue of `capacity` messages into `notifier`.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(notification_sender::run(rx, notifier));
        (Self::new(tx), worker)
    }

    pub fn notify(&self, recipient: Member, text: String) {
        match self.tx.try_send(DirectMessage::new(recipient, text)) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!(
                    user_id = message.recipient.id,
                    "notification queue full, dropping direct message"
                );
            }
            Err(TrySendError::Closed(message)) => {
                warn!(
                    user_id = message.recipient.id,
                    "notification worker stopped, dropping direct message"
                );
            }
        }
    }
}

pub fn action_verb(kind: InfractionKind) -> &'static str {
    match kind {
        InfractionKind::Kick => "kicked",
        InfractionKind::Mute => "muted",
        InfractionKind::Warning => "warned",
        InfractionKind::TemporaryMute => "temporarily muted",
        InfractionKind::TemporaryBan => "temporarily banned",
        InfractionKind::Ban => "given an infraction",
    }
}

/// DM for a freshly recorded infraction. Bans are announced by the ban flow itself.
pub fn infraction_message(infraction: &Infraction, infraction_count: usize) -> Option<String> {
    if infraction.kind.has_own_ban_notice() {
        return None;
    }

    Some(format!(
        "Hey there! You were **{}** for **{}**! You currently have **{}** infraction(s). {}",
        action_verb(infraction.kind),
        infraction.description,
        infraction_count,
        WARNING_TAIL
    ))
}

pub fn temporary_infraction_message(
    infraction: &Infraction,
    duration: Duration,
    infraction_count: usize,
) -> Option<String> {
    if !infraction.kind.is_temporary() {
        return None;
    }

    Some(format!(
        "Hey there! You were **{}** for **{}** for **{}**! You currently have **{}** infraction(s). {}",
        action_verb(infraction.kind),
        humanize(duration),
        infraction.description,
        infraction_count,
        WARNING_TAIL
    ))
}

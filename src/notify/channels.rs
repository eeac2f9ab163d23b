use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::hub::PushGateway;
use super::types::{ChannelKind, DeliveryOutcome, DispatchError, PushMessage};

/// Store-and-forward collaborator for recipients who are not online.
pub trait OutboxStore: Send + Sync {
    fn enqueue(&self, user_id: Uuid, message: &PushMessage, at: DateTime<Utc>) -> Result<(), DispatchError>;
}

/// One independent delivery path. A failing channel never blocks the others.
pub trait DeliveryChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    fn deliver(
        &self,
        user_id: Uuid,
        message: &PushMessage,
        at: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, DispatchError>;

    /// Deliver to the administrator group. `admin_ids` is the directory's view
    /// of the group; channels with their own group fan-out may ignore it.
    fn deliver_to_admins(
        &self,
        admin_ids: &[Uuid],
        message: &PushMessage,
        at: DateTime<Utc>,
    ) -> Vec<(Uuid, Result<DeliveryOutcome, DispatchError>)> {
        admin_ids
            .iter()
            .map(|id| (*id, self.deliver(*id, message, at)))
            .collect()
    }
}

/// Push to live sessions through the gateway.
pub struct RealtimeChannel {
    gateway: Arc<dyn PushGateway>,
}

impl RealtimeChannel {
    pub fn new(gateway: Arc<dyn PushGateway>) -> Self {
        Self { gateway }
    }
}

impl DeliveryChannel for RealtimeChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Realtime
    }

    fn deliver(
        &self,
        user_id: Uuid,
        message: &PushMessage,
        _at: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, DispatchError> {
        self.gateway.push_to_user(user_id, message)
    }

    fn deliver_to_admins(
        &self,
        _admin_ids: &[Uuid],
        message: &PushMessage,
        _at: DateTime<Utc>,
    ) -> Vec<(Uuid, Result<DeliveryOutcome, DispatchError>)> {
        match self.gateway.push_to_admins(message) {
            Ok(outcomes) => outcomes.into_iter().map(|(id, o)| (id, Ok(o))).collect(),
            Err(e) => vec![(Uuid::nil(), Err(e))],
        }
    }
}

/// Persist a row per recipient for later pull.
pub struct OutboxChannel {
    store: Arc<dyn OutboxStore>,
}

impl OutboxChannel {
    pub fn new(store: Arc<dyn OutboxStore>) -> Self {
        Self { store }
    }
}

impl DeliveryChannel for OutboxChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Outbox
    }

    fn deliver(
        &self,
        user_id: Uuid,
        message: &PushMessage,
        at: DateTime<Utc>,
    ) -> Result<DeliveryOutcome, DispatchError> {
        self.store.enqueue(user_id, message, at)?;
        Ok(DeliveryOutcome::Queued)
    }
}

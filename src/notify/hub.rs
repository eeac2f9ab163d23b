//! Real-time session hub.
//!
//! Tracks one push channel per connected user, a user → role registry for
//! group pushes, and a bounded per-user queue for users who are offline.
//! Queued messages are flushed when the user reconnects.
//!
//! Lifecycle per user: REGISTERED → CONNECTED → DISCONNECTED (queueing) → CONNECTED (flush)

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::Role;

use super::types::{DeliveryOutcome, DispatchError, PushMessage};

/// Maximum queued messages per user while disconnected.
const MAX_PENDING_MESSAGES: usize = 50;

/// Real-time delivery collaborator.
pub trait PushGateway: Send + Sync {
    /// `Delivered` when handed to a live session, `Queued` when held for later.
    fn push_to_user(&self, user_id: Uuid, payload: &PushMessage) -> Result<DeliveryOutcome, DispatchError>;

    /// Push to every registered user with `role`.
    fn push_to_role(
        &self,
        role: Role,
        payload: &PushMessage,
    ) -> Result<Vec<(Uuid, DeliveryOutcome)>, DispatchError>;

    fn push_to_admins(&self, payload: &PushMessage) -> Result<Vec<(Uuid, DeliveryOutcome)>, DispatchError> {
        self.push_to_role(Role::Admin, payload)
    }
}

#[derive(Debug, Default)]
struct HubState {
    roles: HashMap<Uuid, Role>,
    channels: HashMap<Uuid, mpsc::Sender<PushMessage>>,
    pending: HashMap<Uuid, VecDeque<PushMessage>>,
}

impl HubState {
    fn send_or_queue(&mut self, user_id: Uuid, msg: PushMessage) -> DeliveryOutcome {
        if let Some(tx) = self.channels.get(&user_id) {
            match tx.try_send(msg) {
                Ok(()) => return DeliveryOutcome::Delivered,
                Err(mpsc::error::TrySendError::Full(msg)) => {
                    return self.queue(user_id, msg);
                }
                Err(mpsc::error::TrySendError::Closed(msg)) => {
                    // Receiver dropped without a disconnect call.
                    self.channels.remove(&user_id);
                    return self.queue(user_id, msg);
                }
            }
        }
        self.queue(user_id, msg)
    }

    fn queue(&mut self, user_id: Uuid, msg: PushMessage) -> DeliveryOutcome {
        let queue = self.pending.entry(user_id).or_default();
        if queue.len() >= MAX_PENDING_MESSAGES {
            return DeliveryOutcome::Failed("pending queue full".into());
        }
        queue.push_back(msg);
        DeliveryOutcome::Queued
    }
}

/// In-process session hub. Cheap to share behind an `Arc`.
#[derive(Debug, Default)]
pub struct SessionHub {
    state: Mutex<HubState>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a user's role so group pushes can find them.
    pub fn register_user(&self, user_id: Uuid, role: Role) -> Result<(), DispatchError> {
        let mut state = self.state.lock().map_err(|_| DispatchError::LockFailed)?;
        state.roles.insert(user_id, role);
        Ok(())
    }

    /// Forget a user entirely (deactivated account).
    pub fn remove_user(&self, user_id: Uuid) -> Result<(), DispatchError> {
        let mut state = self.state.lock().map_err(|_| DispatchError::LockFailed)?;
        state.roles.remove(&user_id);
        state.channels.remove(&user_id);
        state.pending.remove(&user_id);
        Ok(())
    }

    /// Attach a live channel and flush anything queued while offline.
    /// Returns how many queued messages were flushed.
    pub fn connect(&self, user_id: Uuid, tx: mpsc::Sender<PushMessage>) -> Result<usize, DispatchError> {
        let mut state = self.state.lock().map_err(|_| DispatchError::LockFailed)?;
        state.channels.insert(user_id, tx.clone());

        let mut flushed = 0;
        if let Some(queue) = state.pending.get_mut(&user_id) {
            while let Some(msg) = queue.pop_front() {
                if let Err(err) = tx.try_send(msg) {
                    let msg = match err {
                        mpsc::error::TrySendError::Full(m) | mpsc::error::TrySendError::Closed(m) => m,
                    };
                    queue.push_front(msg);
                    break;
                }
                flushed += 1;
            }
        }
        tracing::debug!(user_id = %user_id, flushed, "Session connected");
        Ok(flushed)
    }

    pub fn disconnect(&self, user_id: Uuid) -> Result<(), DispatchError> {
        let mut state = self.state.lock().map_err(|_| DispatchError::LockFailed)?;
        state.channels.remove(&user_id);
        Ok(())
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.state
            .lock()
            .map(|s| s.channels.contains_key(&user_id))
            .unwrap_or(false)
    }

    pub fn pending_count(&self, user_id: Uuid) -> usize {
        self.state
            .lock()
            .map(|s| s.pending.get(&user_id).map(|q| q.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Registered users with `role`, sorted for stable fan-out order.
    pub fn members_of(&self, role: Role) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self
            .state
            .lock()
            .map(|s| {
                s.roles
                    .iter()
                    .filter(|(_, r)| **r == role)
                    .map(|(id, _)| *id)
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl PushGateway for SessionHub {
    fn push_to_user(&self, user_id: Uuid, payload: &PushMessage) -> Result<DeliveryOutcome, DispatchError> {
        let mut state = self.state.lock().map_err(|_| DispatchError::LockFailed)?;
        Ok(state.send_or_queue(user_id, payload.clone()))
    }

    fn push_to_role(
        &self,
        role: Role,
        payload: &PushMessage,
    ) -> Result<Vec<(Uuid, DeliveryOutcome)>, DispatchError> {
        let mut state = self.state.lock().map_err(|_| DispatchError::LockFailed)?;
        let mut members: Vec<Uuid> = state
            .roles
            .iter()
            .filter(|(_, r)| **r == role)
            .map(|(id, _)| *id)
            .collect();
        members.sort();

        Ok(members
            .into_iter()
            .map(|id| (id, state.send_or_queue(id, payload.clone())))
            .collect())
    }
}

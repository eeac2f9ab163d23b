use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::intelligence::types::FindingKind;
use crate::models::{Alert, AlertOrigin, Coordinates, Priority};

// ═══════════════════════════════════════════════════════════
// Payloads
// ═══════════════════════════════════════════════════════════

/// Server → client push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushMessage {
    AlertRaised {
        alert_id: Uuid,
        patient_id: Uuid,
        alert_type: FindingKind,
        nivel_prioridad: Priority,
        origin: AlertOrigin,
        message: String,
        created_at: DateTime<Utc>,
        location: Option<Coordinates>,
    },
    AlertResolved {
        alert_id: Uuid,
        patient_id: Uuid,
        resolved_at: DateTime<Utc>,
    },
}

impl PushMessage {
    pub fn raised(alert: &Alert) -> Self {
        Self::AlertRaised {
            alert_id: alert.id,
            patient_id: alert.patient_id,
            alert_type: alert.alert_type,
            nivel_prioridad: alert.priority,
            origin: alert.origin,
            message: alert.message.clone(),
            created_at: alert.created_at,
            location: alert.location,
        }
    }

    pub fn alert_id(&self) -> Uuid {
        match self {
            Self::AlertRaised { alert_id, .. } | Self::AlertResolved { alert_id, .. } => *alert_id,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Outcomes
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Realtime,
    Outbox,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Outbox => "outbox",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Unauthorized,
}

/// What happened to one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Handed to a live session.
    Delivered,
    /// Stored for later pickup (offline user or outbox row).
    Queued,
    Throttled,
    Skipped(SkipReason),
    Failed(String),
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Queued => "queued",
            Self::Throttled => "throttled",
            Self::Skipped(_) => "skipped",
            Self::Failed(_) => "failed",
        }
    }

    /// The message reached the recipient or a store it will be read from.
    pub fn reached(&self) -> bool {
        matches!(self, Self::Delivered | Self::Queued)
    }
}

/// Who a delivery targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    Caregiver(Uuid),
    Clinician(Uuid),
    Admin(Uuid),
}

impl Recipient {
    pub fn user_id(&self) -> Uuid {
        match self {
            Self::Caregiver(id) | Self::Clinician(id) | Self::Admin(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub recipient: Recipient,
    pub channel: ChannelKind,
    pub outcome: DeliveryOutcome,
}

/// Result of dispatching one alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub alert_id: Uuid,
    pub throttled: bool,
    pub deliveries: Vec<Delivery>,
}

impl DispatchReport {
    pub fn count(&self, outcome: &str) -> usize {
        self.deliveries
            .iter()
            .filter(|d| d.outcome.as_str() == outcome)
            .count()
    }

    /// At least one recipient was reached on at least one channel.
    pub fn reached_anyone(&self) -> bool {
        self.deliveries.iter().any(|d| d.outcome.reached())
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Push channel closed for user {0}")]
    ChannelClosed(Uuid),
    #[error("Outbox write failed: {0}")]
    Outbox(#[from] DatabaseError),
    #[error("Push gateway failure: {0}")]
    Gateway(String),
    #[error("Payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Internal lock failed")]
    LockFailed,
}

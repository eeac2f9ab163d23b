use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AuditSeverity;

/// Structured audit record. `detail` carries tags and counts only, never
/// patient names or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub at: DateTime<Utc>,
    pub severity: AuditSeverity,
    /// Component that produced the event ("alert_orchestrator", "periodic_sweep").
    pub source: String,
    pub action: String,
    pub actor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub alert_id: Option<Uuid>,
    pub detail: String,
}

impl AuditEvent {
    pub fn new(
        at: DateTime<Utc>,
        severity: AuditSeverity,
        source: &str,
        action: &str,
    ) -> Self {
        Self {
            at,
            severity,
            source: source.to_string(),
            action: action.to_string(),
            actor_id: None,
            patient_id: None,
            alert_id: None,
            detail: String::new(),
        }
    }

    pub fn actor(mut self, actor_id: Option<Uuid>) -> Self {
        self.actor_id = actor_id;
        self
    }

    pub fn patient(mut self, patient_id: Uuid) -> Self {
        self.patient_id = Some(patient_id);
        self
    }

    pub fn alert(mut self, alert_id: Uuid) -> Self {
        self.alert_id = Some(alert_id);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AlertOrigin, AlertStatus, Priority};
use super::symptom::SymptomTag;
use crate::intelligence::types::FindingKind;

/// Geolocation attached to emergency alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Persisted, user-facing alert. Mutated only by resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub patient_id: Uuid,
    /// Madrina assigned to the patient when the alert was created.
    pub caregiver_id: Option<Uuid>,
    pub alert_type: FindingKind,
    #[serde(rename = "nivel_prioridad")]
    pub priority: Priority,
    pub message: String,
    pub symptoms: Vec<SymptomTag>,
    pub risk_score: u32,
    pub origin: AlertOrigin,
    pub status: AlertStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub location: Option<Coordinates>,
}

impl Alert {
    pub fn is_pending(&self) -> bool {
        self.status == AlertStatus::Pending
    }
}

/// Alert data handed to the repository; id and lifecycle state are assigned there.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub patient_id: Uuid,
    pub caregiver_id: Option<Uuid>,
    pub alert_type: FindingKind,
    pub priority: Priority,
    pub message: String,
    pub symptoms: Vec<SymptomTag>,
    pub risk_score: u32,
    pub origin: AlertOrigin,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub location: Option<Coordinates>,
}

impl NewAlert {
    /// Materialize with a fresh id, always starting in `pending`.
    pub fn into_alert(self) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            patient_id: self.patient_id,
            caregiver_id: self.caregiver_id,
            alert_type: self.alert_type,
            priority: self.priority,
            message: self.message,
            symptoms: self.symptoms,
            risk_score: self.risk_score,
            origin: self.origin,
            status: AlertStatus::Pending,
            created_by: self.created_by,
            created_at: self.created_at,
            resolved_at: None,
            resolved_by: None,
            location: self.location,
        }
    }
}

//! Collaborator seams of the alerting pipeline.
//!
//! - PatientDirectory: patient record plus recent history
//! - AlertRepository: alert persistence and the resolve mutation
//! - AuditSink: fire-and-forget audit trail
//!
//! Authorization is `crate::authorization::AccessPolicy`. The SQLite store
//! implements all four.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Alert, AuditEvent, NewAlert, PatientRecord};

use super::types::FindingKind;

pub trait PatientDirectory: Send + Sync {
    /// Patient with its last `limit` observations (oldest first).
    /// `Ok(None)` when the patient does not exist.
    fn patient_with_history(
        &self,
        patient_id: Uuid,
        limit: usize,
    ) -> Result<Option<PatientRecord>, DatabaseError>;

    /// Ids of every active patient, in a stable order.
    fn active_patient_ids(&self) -> Result<Vec<Uuid>, DatabaseError>;
}

pub trait AlertRepository: Send + Sync {
    /// Store a new alert. The returned alert is always `pending`.
    fn persist_alert(&self, alert: NewAlert) -> Result<Alert, DatabaseError>;

    fn get_alert(&self, alert_id: Uuid) -> Result<Option<Alert>, DatabaseError>;

    /// Move a pending alert to `resolved`. Returns the stored alert.
    fn mark_resolved(
        &self,
        alert_id: Uuid,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Alert, DatabaseError>;

    /// Most recent pending alert of `kind` for the patient.
    fn pending_alert_for(
        &self,
        patient_id: Uuid,
        kind: FindingKind,
    ) -> Result<Option<Alert>, DatabaseError>;

    /// Pending alerts for the patient, newest first.
    fn pending_alerts_for_patient(&self, patient_id: Uuid) -> Result<Vec<Alert>, DatabaseError>;
}

pub trait AuditSink: Send + Sync {
    /// Never fails the caller; implementations log their own write errors.
    fn record(&self, event: AuditEvent);
}

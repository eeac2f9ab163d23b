//! SQLite-backed collaborators for the alerting pipeline.
//!
//! One connection behind a mutex. The lock is held for a single repository
//! call and never across a notification channel or another store call.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use super::repository::{alerts, audit, observations, outbox, patients, users};
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::authorization::{check_patient_access_db, AccessPolicy, AuthorizationError};
use crate::intelligence::traits::{AlertRepository, AuditSink, PatientDirectory};
use crate::intelligence::types::FindingKind;
use crate::models::{Alert, AuditEvent, Gestante, NewAlert, Observation, PatientRecord, Role, User};
use crate::notify::{DispatchError, OutboxStore, PushMessage, RecipientDirectory};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockFailed)
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let conn = self.lock()?;
        f(&conn)
    }

    pub fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.with_conn(|conn| users::insert_user(conn, user))
    }

    pub fn active_users(&self) -> Result<Vec<User>, DatabaseError> {
        self.with_conn(users::active_users)
    }

    pub fn insert_patient(&self, patient: &Gestante) -> Result<(), DatabaseError> {
        self.with_conn(|conn| patients::insert_patient(conn, patient))
    }

    pub fn assign_madrina(&self, patient_id: Uuid, madrina_id: Option<Uuid>) -> Result<(), DatabaseError> {
        self.with_conn(|conn| patients::assign_madrina(conn, &patient_id, madrina_id))
    }

    pub fn assign_clinician(
        &self,
        patient_id: Uuid,
        clinician_id: Option<Uuid>,
    ) -> Result<(), DatabaseError> {
        self.with_conn(|conn| patients::assign_clinician(conn, &patient_id, clinician_id))
    }

    pub fn insert_observation(&self, observation: &Observation) -> Result<(), DatabaseError> {
        self.with_conn(|conn| observations::insert_observation(conn, observation))
    }

    pub fn recent_audit(&self, limit: usize) -> Result<Vec<AuditEvent>, DatabaseError> {
        self.with_conn(|conn| audit::recent_audit_events(conn, limit))
    }

    pub fn undelivered_for(&self, user_id: Uuid) -> Result<Vec<outbox::OutboxEntry>, DatabaseError> {
        self.with_conn(|conn| outbox::undelivered_for(conn, &user_id))
    }

    pub fn mark_delivered(&self, ids: &[i64], at: DateTime<Utc>) -> Result<usize, DatabaseError> {
        self.with_conn(|conn| outbox::mark_delivered(conn, ids, &at))
    }
}

impl PatientDirectory for SqliteStore {
    fn patient_with_history(
        &self,
        patient_id: Uuid,
        limit: usize,
    ) -> Result<Option<PatientRecord>, DatabaseError> {
        self.with_conn(|conn| {
            let Some(patient) = patients::get_patient(conn, &patient_id)? else {
                return Ok(None);
            };
            let observations = observations::recent_observations(conn, &patient_id, limit)?;
            let total_observations = observations::count_observations(conn, &patient_id)?;
            Ok(Some(PatientRecord {
                patient,
                observations,
                total_observations,
            }))
        })
    }

    fn active_patient_ids(&self) -> Result<Vec<Uuid>, DatabaseError> {
        self.with_conn(patients::active_patient_ids)
    }
}

impl AlertRepository for SqliteStore {
    fn persist_alert(&self, alert: NewAlert) -> Result<Alert, DatabaseError> {
        let alert = alert.into_alert();
        self.with_conn(|conn| alerts::insert_alert(conn, &alert))?;
        Ok(alert)
    }

    fn get_alert(&self, alert_id: Uuid) -> Result<Option<Alert>, DatabaseError> {
        self.with_conn(|conn| alerts::get_alert(conn, &alert_id))
    }

    fn mark_resolved(
        &self,
        alert_id: Uuid,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Alert, DatabaseError> {
        self.with_conn(|conn| alerts::resolve_alert(conn, &alert_id, &actor_id, &at))
    }

    fn pending_alert_for(
        &self,
        patient_id: Uuid,
        kind: FindingKind,
    ) -> Result<Option<Alert>, DatabaseError> {
        self.with_conn(|conn| alerts::pending_alert_for(conn, &patient_id, kind))
    }

    fn pending_alerts_for_patient(&self, patient_id: Uuid) -> Result<Vec<Alert>, DatabaseError> {
        self.with_conn(|conn| alerts::pending_alerts_for_patient(conn, &patient_id))
    }
}

impl AuditSink for SqliteStore {
    fn record(&self, event: AuditEvent) {
        if let Err(e) = self.with_conn(|conn| audit::insert_audit_event(conn, &event)) {
            tracing::warn!(
                action = %event.action,
                source = %event.source,
                error = %e,
                "Audit write failed"
            );
        }
    }
}

impl AccessPolicy for SqliteStore {
    fn can_create_alert_for(&self, actor_id: Uuid, patient_id: Uuid) -> Result<bool, AuthorizationError> {
        let conn = self.conn.lock().map_err(|_| AuthorizationError::LockFailed)?;
        Ok(check_patient_access_db(&conn, &actor_id, &patient_id)?.allowed)
    }

    fn can_access(&self, actor_id: Uuid, patient_id: Uuid) -> Result<bool, AuthorizationError> {
        self.can_create_alert_for(actor_id, patient_id)
    }
}

impl RecipientDirectory for SqliteStore {
    fn admin_ids(&self) -> Result<Vec<Uuid>, DatabaseError> {
        self.with_conn(|conn| users::active_ids_with_role(conn, Role::Admin))
    }
}

impl OutboxStore for SqliteStore {
    fn enqueue(&self, user_id: Uuid, message: &PushMessage, at: DateTime<Utc>) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(message)?;
        let alert_id = message.alert_id();
        self.with_conn(|conn| outbox::enqueue_notification(conn, &user_id, &alert_id, &payload, &at))?;
        Ok(())
    }
}

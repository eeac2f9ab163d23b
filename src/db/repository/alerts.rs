use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{fmt_ts, parse_opt_uuid, parse_ts, parse_uuid};
use crate::db::DatabaseError;
use crate::intelligence::types::FindingKind;
use crate::models::{Alert, AlertOrigin, AlertStatus, Coordinates, Priority, SymptomTag};

const ALERT_COLUMNS: &str = "id, patient_id, caregiver_id, alert_type, nivel_prioridad, message,
     symptoms, risk_score, origin, status, created_by, created_at, resolved_at, resolved_by,
     latitude, longitude";

pub fn insert_alert(conn: &Connection, alert: &Alert) -> Result<(), DatabaseError> {
    let symptoms: Vec<&str> = alert.symptoms.iter().map(|s| s.as_str()).collect();
    let symptoms = serde_json::to_string(&symptoms).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        &format!(
            "INSERT INTO alerts ({ALERT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
        ),
        params![
            alert.id.to_string(),
            alert.patient_id.to_string(),
            alert.caregiver_id.map(|id| id.to_string()),
            alert.alert_type.as_str(),
            alert.priority.as_str(),
            alert.message,
            symptoms,
            alert.risk_score,
            alert.origin.as_str(),
            alert.status.as_str(),
            alert.created_by.map(|id| id.to_string()),
            fmt_ts(&alert.created_at),
            alert.resolved_at.as_ref().map(fmt_ts),
            alert.resolved_by.map(|id| id.to_string()),
            alert.location.map(|c| c.latitude),
            alert.location.map(|c| c.longitude),
        ],
    )?;
    Ok(())
}

pub fn get_alert(conn: &Connection, id: &Uuid) -> Result<Option<Alert>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
            params![id.to_string()],
            map_alert_row,
        )
        .optional()?;
    row.map(alert_from_row).transpose()
}

/// Move a pending alert to `resolved`. A resolved alert is left untouched.
/// Returns the stored alert either way.
pub fn resolve_alert(
    conn: &Connection,
    id: &Uuid,
    actor_id: &Uuid,
    at: &DateTime<Utc>,
) -> Result<Alert, DatabaseError> {
    conn.execute(
        "UPDATE alerts SET status = 'resolved', resolved_at = ?2, resolved_by = ?3
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string(), fmt_ts(at), actor_id.to_string()],
    )?;
    get_alert(conn, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Alert".into(),
        id: id.to_string(),
    })
}

/// Most recent pending alert of `kind` for the patient.
pub fn pending_alert_for(
    conn: &Connection,
    patient_id: &Uuid,
    kind: FindingKind,
) -> Result<Option<Alert>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {ALERT_COLUMNS} FROM alerts
                 WHERE patient_id = ?1 AND alert_type = ?2 AND status = 'pending'
                 ORDER BY created_at DESC LIMIT 1"
            ),
            params![patient_id.to_string(), kind.as_str()],
            map_alert_row,
        )
        .optional()?;
    row.map(alert_from_row).transpose()
}

/// Pending alerts for the patient, newest first.
pub fn pending_alerts_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Alert>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALERT_COLUMNS} FROM alerts
         WHERE patient_id = ?1 AND status = 'pending'
         ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], map_alert_row)?;
    let alerts = rows
        .map(|r| alert_from_row(r?))
        .collect::<Result<Vec<_>, DatabaseError>>()?;
    Ok(alerts)
}

struct AlertRow {
    id: String,
    patient_id: String,
    caregiver_id: Option<String>,
    alert_type: String,
    priority: String,
    message: String,
    symptoms: String,
    risk_score: u32,
    origin: String,
    status: String,
    created_by: Option<String>,
    created_at: String,
    resolved_at: Option<String>,
    resolved_by: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

fn map_alert_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlertRow> {
    Ok(AlertRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        caregiver_id: row.get(2)?,
        alert_type: row.get(3)?,
        priority: row.get(4)?,
        message: row.get(5)?,
        symptoms: row.get(6)?,
        risk_score: row.get(7)?,
        origin: row.get(8)?,
        status: row.get(9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        resolved_at: row.get(12)?,
        resolved_by: row.get(13)?,
        latitude: row.get(14)?,
        longitude: row.get(15)?,
    })
}

fn alert_from_row(row: AlertRow) -> Result<Alert, DatabaseError> {
    let raw: Vec<String> = serde_json::from_str(&row.symptoms)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("symptoms: {e}")))?;
    let (symptoms, _rejected) = SymptomTag::parse_tags(&raw);

    let location = match (row.latitude, row.longitude) {
        (Some(latitude), Some(longitude)) => Some(Coordinates {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(Alert {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        caregiver_id: parse_opt_uuid(row.caregiver_id)?,
        alert_type: FindingKind::from_key(&row.alert_type)?,
        priority: Priority::from_str(&row.priority)?,
        message: row.message,
        symptoms,
        risk_score: row.risk_score,
        origin: AlertOrigin::from_str(&row.origin)?,
        status: AlertStatus::from_str(&row.status)?,
        created_by: parse_opt_uuid(row.created_by)?,
        created_at: parse_ts(&row.created_at)?,
        resolved_at: row.resolved_at.as_deref().map(parse_ts).transpose()?,
        resolved_by: parse_opt_uuid(row.resolved_by)?,
        location,
    })
}

use std::str::FromStr;

use rusqlite::{params, Connection};

use super::{fmt_ts, parse_opt_uuid, parse_ts};
use crate::db::DatabaseError;
use crate::models::{AuditEvent, AuditSeverity};

pub fn insert_audit_event(conn: &Connection, event: &AuditEvent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO audit_log (timestamp, severity, source, action, actor_id, patient_id, alert_id, detail)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            fmt_ts(&event.at),
            event.severity.as_str(),
            event.source,
            event.action,
            event.actor_id.map(|id| id.to_string()),
            event.patient_id.map(|id| id.to_string()),
            event.alert_id.map(|id| id.to_string()),
            event.detail,
        ],
    )?;
    Ok(())
}

/// Most recent audit events, newest first.
pub fn recent_audit_events(conn: &Connection, limit: usize) -> Result<Vec<AuditEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, severity, source, action, actor_id, patient_id, alert_id, detail
         FROM audit_log ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut events = Vec::new();
    for row in rows {
        let (at, severity, source, action, actor_id, patient_id, alert_id, detail) = row?;
        events.push(AuditEvent {
            at: parse_ts(&at)?,
            severity: AuditSeverity::from_str(&severity)?,
            source,
            action,
            actor_id: parse_opt_uuid(actor_id)?,
            patient_id: parse_opt_uuid(patient_id)?,
            alert_id: parse_opt_uuid(alert_id)?,
            detail,
        });
    }
    Ok(events)
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(
    conn: &Connection,
    retention_days: i64,
    now: &chrono::DateTime<chrono::Utc>,
) -> Result<usize, DatabaseError> {
    let cutoff = *now - chrono::Duration::days(retention_days);
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < ?1",
        params![fmt_ts(&cutoff)],
    )?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_read_back_newest_first() {
        let conn = open_memory_database().unwrap();
        let now = Utc::now();
        let patient = Uuid::new_v4();
        insert_audit_event(
            &conn,
            &AuditEvent::new(now, AuditSeverity::Info, "alert_orchestrator", "alert_created")
                .patient(patient),
        )
        .unwrap();
        insert_audit_event(
            &conn,
            &AuditEvent::new(now, AuditSeverity::Low, "alert_orchestrator", "alert_suppressed")
                .detail("kind=hypertension occurrence=4"),
        )
        .unwrap();

        let events = recent_audit_events(&conn, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, "alert_suppressed");
        assert_eq!(events[0].severity, AuditSeverity::Low);
        assert_eq!(events[1].patient_id, Some(patient));
    }

    #[test]
    fn prune_removes_only_old_entries() {
        let conn = open_memory_database().unwrap();
        let now = Utc::now();
        insert_audit_event(
            &conn,
            &AuditEvent::new(now - Duration::days(120), AuditSeverity::Info, "s", "old"),
        )
        .unwrap();
        insert_audit_event(&conn, &AuditEvent::new(now, AuditSeverity::Info, "s", "new")).unwrap();

        assert_eq!(prune_audit_log(&conn, 90, &now).unwrap(), 1);
        let left = recent_audit_events(&conn, 10).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].action, "new");
    }
}

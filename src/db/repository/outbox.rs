//! Store-and-forward rows for recipients who pull notifications later.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_ts, parse_ts};
use crate::db::DatabaseError;

/// One undelivered outbox row. `payload` is the serialized push message.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub user_id: Uuid,
    pub alert_id: Uuid,
    pub payload: String,
    pub enqueued_at: DateTime<Utc>,
}

pub fn enqueue_notification(
    conn: &Connection,
    user_id: &Uuid,
    alert_id: &Uuid,
    payload: &str,
    at: &DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO notification_outbox (user_id, alert_id, payload, enqueued_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id.to_string(), alert_id.to_string(), payload, fmt_ts(at)],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Undelivered rows for a user, oldest first.
pub fn undelivered_for(conn: &Connection, user_id: &Uuid) -> Result<Vec<OutboxEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, alert_id, payload, enqueued_at FROM notification_outbox
         WHERE user_id = ?1 AND delivered_at IS NULL ORDER BY id",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, alert_id, payload, enqueued_at) = row?;
        entries.push(OutboxEntry {
            id,
            user_id: *user_id,
            alert_id: super::parse_uuid(&alert_id)?,
            payload,
            enqueued_at: parse_ts(&enqueued_at)?,
        });
    }
    Ok(entries)
}

/// Stamp rows as delivered. Already-delivered rows keep their first stamp.
pub fn mark_delivered(conn: &Connection, ids: &[i64], at: &DateTime<Utc>) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare(
        "UPDATE notification_outbox SET delivered_at = ?2 WHERE id = ?1 AND delivered_at IS NULL",
    )?;
    let stamp = fmt_ts(at);
    let mut updated = 0;
    for id in ids {
        updated += stmt.execute(params![id, stamp])?;
    }
    Ok(updated)
}

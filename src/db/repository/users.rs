use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Role, User};

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, name, role, municipality_id, active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id.to_string(),
            user.name,
            user.role.as_str(),
            user.municipality_id.map(|id| id.to_string()),
            user.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, role, municipality_id, active FROM users WHERE id = ?1",
            params![id.to_string()],
            map_user_row,
        )
        .optional()?;
    row.map(user_from_row).transpose()
}

/// Active users, ordered by role then id.
pub fn active_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, role, municipality_id, active FROM users
         WHERE active = 1 ORDER BY role, id",
    )?;
    let rows = stmt.query_map([], map_user_row)?;
    let users = rows
        .map(|r| user_from_row(r?))
        .collect::<Result<Vec<_>, DatabaseError>>()?;
    Ok(users)
}

pub fn active_ids_with_role(conn: &Connection, role: Role) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE active = 1 AND role = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![role.as_str()], |row| row.get::<_, String>(0))?;
    let ids = rows
        .map(|r| parse_uuid(&r?))
        .collect::<Result<Vec<_>, DatabaseError>>()?;
    Ok(ids)
}

pub fn set_user_active(conn: &Connection, id: &Uuid, active: bool) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET active = ?2 WHERE id = ?1",
        params![id.to_string(), active as i32],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

type UserRow = (String, String, String, Option<String>, i32);

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn user_from_row((id, name, role, municipality_id, active): UserRow) -> Result<User, DatabaseError> {
    Ok(User {
        id: parse_uuid(&id)?,
        name,
        role: Role::from_str(&role)?,
        municipality_id: parse_opt_uuid(municipality_id)?,
        active: active != 0,
    })
}

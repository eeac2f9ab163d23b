use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_date, parse_opt_uuid, parse_uuid};
use crate::db::DatabaseError;
use crate::models::Gestante;

pub fn insert_patient(conn: &Connection, patient: &Gestante) -> Result<(), DatabaseError> {
    let conditions =
        serde_json::to_string(&patient.known_conditions).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO gestantes (id, full_name, birth_date, parity, known_conditions, due_date,
         madrina_id, clinician_id, facility_id, municipality_id, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            patient.id.to_string(),
            patient.full_name,
            patient.birth_date.map(|d| d.to_string()),
            patient.parity,
            conditions,
            patient.due_date.map(|d| d.to_string()),
            patient.madrina_id.map(|id| id.to_string()),
            patient.clinician_id.map(|id| id.to_string()),
            patient.facility_id.map(|id| id.to_string()),
            patient.municipality_id.map(|id| id.to_string()),
            patient.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Gestante>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, full_name, birth_date, parity, known_conditions, due_date,
             madrina_id, clinician_id, facility_id, municipality_id, active
             FROM gestantes WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<u8>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, Option<String>>(9)?,
                    row.get::<_, i32>(10)?,
                ))
            },
        )
        .optional()?;

    let Some((
        id,
        full_name,
        birth_date,
        parity,
        conditions,
        due_date,
        madrina_id,
        clinician_id,
        facility_id,
        municipality_id,
        active,
    )) = row
    else {
        return Ok(None);
    };

    Ok(Some(Gestante {
        id: parse_uuid(&id)?,
        full_name,
        birth_date: birth_date.as_deref().map(parse_date).transpose()?,
        parity,
        known_conditions: serde_json::from_str(&conditions)
            .map_err(|e| DatabaseError::ConstraintViolation(format!("known_conditions: {e}")))?,
        due_date: due_date.as_deref().map(parse_date).transpose()?,
        madrina_id: parse_opt_uuid(madrina_id)?,
        clinician_id: parse_opt_uuid(clinician_id)?,
        facility_id: parse_opt_uuid(facility_id)?,
        municipality_id: parse_opt_uuid(municipality_id)?,
        active: active != 0,
    }))
}

/// Ids of active patients, in id order so sweeps visit them deterministically.
pub fn active_patient_ids(conn: &Connection) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id FROM gestantes WHERE active = 1 ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let ids = rows
        .map(|r| parse_uuid(&r?))
        .collect::<Result<Vec<_>, DatabaseError>>()?;
    Ok(ids)
}

/// Reassign the madrina. Existing alerts keep the caregiver they were created with.
pub fn assign_madrina(
    conn: &Connection,
    patient_id: &Uuid,
    madrina_id: Option<Uuid>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE gestantes SET madrina_id = ?2 WHERE id = ?1",
        params![patient_id.to_string(), madrina_id.map(|id| id.to_string())],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Gestante".into(),
            id: patient_id.to_string(),
        });
    }
    Ok(())
}

pub fn assign_clinician(
    conn: &Connection,
    patient_id: &Uuid,
    clinician_id: Option<Uuid>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE gestantes SET clinician_id = ?2 WHERE id = ?1",
        params![patient_id.to_string(), clinician_id.map(|id| id.to_string())],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Gestante".into(),
            id: patient_id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn patient() -> Gestante {
        Gestante {
            id: Uuid::new_v4(),
            full_name: "Rosa Pérez".into(),
            birth_date: NaiveDate::from_ymd_opt(2008, 2, 29),
            parity: Some(0),
            known_conditions: vec!["chronic hypertension".into()],
            due_date: NaiveDate::from_ymd_opt(2026, 9, 15),
            madrina_id: None,
            clinician_id: None,
            facility_id: None,
            municipality_id: Some(Uuid::new_v4()),
            active: true,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let p = patient();
        insert_patient(&conn, &p).unwrap();
        let loaded = get_patient(&conn, &p.id).unwrap().unwrap();
        assert_eq!(loaded.birth_date, p.birth_date);
        assert_eq!(loaded.due_date, p.due_date);
        assert_eq!(loaded.known_conditions, p.known_conditions);
        assert_eq!(loaded.municipality_id, p.municipality_id);
    }

    #[test]
    fn missing_patient_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn inactive_patients_not_listed() {
        let conn = open_memory_database().unwrap();
        let active = patient();
        let mut inactive = patient();
        inactive.active = false;
        insert_patient(&conn, &active).unwrap();
        insert_patient(&conn, &inactive).unwrap();
        assert_eq!(active_patient_ids(&conn).unwrap(), vec![active.id]);
    }

    #[test]
    fn malformed_due_date_fails_the_read() {
        let conn = open_memory_database().unwrap();
        let p = patient();
        insert_patient(&conn, &p).unwrap();
        conn.execute(
            "UPDATE gestantes SET due_date = 'soon' WHERE id = ?1",
            params![p.id.to_string()],
        )
        .unwrap();
        assert!(get_patient(&conn, &p.id).is_err());
    }

    #[test]
    fn reassigning_unknown_patient_fails() {
        let conn = open_memory_database().unwrap();
        assert!(assign_madrina(&conn, &Uuid::new_v4(), None).is_err());
    }
}

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{fmt_ts, parse_ts, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Observation, SymptomTag, VitalSigns};

pub fn insert_observation(conn: &Connection, obs: &Observation) -> Result<(), DatabaseError> {
    let symptoms: Vec<&str> = obs.symptoms.iter().map(|s| s.as_str()).collect();
    let symptoms = serde_json::to_string(&symptoms).unwrap_or_else(|_| "[]".to_string());
    conn.execute(
        "INSERT INTO observations (id, patient_id, recorded_at, gestational_week, systolic,
         diastolic, heart_rate, respiratory_rate, temperature_c, weight_kg, fundal_height_cm,
         fetal_movement, edema, symptoms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            obs.id.to_string(),
            obs.patient_id.to_string(),
            fmt_ts(&obs.recorded_at),
            obs.gestational_week,
            obs.vitals.systolic,
            obs.vitals.diastolic,
            obs.vitals.heart_rate,
            obs.vitals.respiratory_rate,
            obs.vitals.temperature_c,
            obs.vitals.weight_kg,
            obs.vitals.fundal_height_cm,
            obs.fetal_movement.map(|b| b as i32),
            obs.edema.map(|b| b as i32),
            symptoms,
        ],
    )?;
    Ok(())
}

/// Last `limit` observations for a patient, returned oldest first.
pub fn recent_observations(
    conn: &Connection,
    patient_id: &Uuid,
    limit: usize,
) -> Result<Vec<Observation>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, recorded_at, gestational_week, systolic, diastolic, heart_rate,
         respiratory_rate, temperature_c, weight_kg, fundal_height_cm, fetal_movement, edema,
         symptoms
         FROM observations WHERE patient_id = ?1
         ORDER BY recorded_at DESC LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string(), limit as i64], |row| {
        Ok(ObservationRow {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            recorded_at: row.get(2)?,
            gestational_week: row.get(3)?,
            vitals: VitalSigns {
                systolic: row.get(4)?,
                diastolic: row.get(5)?,
                heart_rate: row.get(6)?,
                respiratory_rate: row.get(7)?,
                temperature_c: row.get(8)?,
                weight_kg: row.get(9)?,
                fundal_height_cm: row.get(10)?,
            },
            fetal_movement: row.get(11)?,
            edema: row.get(12)?,
            symptoms: row.get(13)?,
        })
    })?;

    let mut observations = rows
        .map(|r| observation_from_row(r?))
        .collect::<Result<Vec<_>, DatabaseError>>()?;
    observations.reverse();
    Ok(observations)
}

pub fn count_observations(conn: &Connection, patient_id: &Uuid) -> Result<u32, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM observations WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get::<_, u32>(0),
    )?;
    Ok(count)
}

struct ObservationRow {
    id: String,
    patient_id: String,
    recorded_at: String,
    gestational_week: Option<u8>,
    vitals: VitalSigns,
    fetal_movement: Option<i32>,
    edema: Option<i32>,
    symptoms: String,
}

fn observation_from_row(row: ObservationRow) -> Result<Observation, DatabaseError> {
    let raw: Vec<String> = serde_json::from_str(&row.symptoms)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("symptoms: {e}")))?;
    let (symptoms, _rejected) = SymptomTag::parse_tags(&raw);

    Ok(Observation {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        recorded_at: parse_ts(&row.recorded_at)?,
        gestational_week: row.gestational_week,
        vitals: row.vitals,
        fetal_movement: row.fetal_movement.map(|v| v != 0),
        edema: row.edema.map(|v| v != 0),
        symptoms,
    })
}

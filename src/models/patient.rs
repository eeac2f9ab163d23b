use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Role;
use super::observation::Observation;

/// A monitored pregnant patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gestante {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub parity: Option<u8>,
    pub known_conditions: Vec<String>,
    pub due_date: Option<NaiveDate>,
    /// Assigned lay caregiver.
    pub madrina_id: Option<Uuid>,
    pub clinician_id: Option<Uuid>,
    pub facility_id: Option<Uuid>,
    pub municipality_id: Option<Uuid>,
    pub active: bool,
}

impl Gestante {
    /// Age in whole years on `today`, if the birth date is known.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let birth = self.birth_date?;
        let mut age = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            age -= 1;
        }
        Some(age)
    }
}

/// Patient plus recent history, as returned by the patient directory.
#[derive(Debug, Clone)]
pub struct PatientRecord {
    pub patient: Gestante,
    /// Last N observations, oldest first.
    pub observations: Vec<Observation>,
    /// Count of all observations on record, not only the returned window.
    pub total_observations: u32,
}

impl PatientRecord {
    pub fn caregiver_id(&self) -> Option<Uuid> {
        self.patient.madrina_id
    }

    pub fn clinician_id(&self) -> Option<Uuid> {
        self.patient.clinician_id
    }

    pub fn municipality_id(&self) -> Option<Uuid> {
        self.patient.municipality_id
    }

    pub fn last_visit_at(&self) -> Option<DateTime<Utc>> {
        self.observations.iter().map(|o| o.recorded_at).max()
    }
}

/// A system user: administrator, municipal coordinator, clinician or madrina.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub municipality_id: Option<Uuid>,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(birth: Option<NaiveDate>) -> Gestante {
        Gestante {
            id: Uuid::new_v4(),
            full_name: "Test".into(),
            birth_date: birth,
            parity: None,
            known_conditions: vec![],
            due_date: None,
            madrina_id: None,
            clinician_id: None,
            facility_id: None,
            municipality_id: None,
            active: true,
        }
    }

    #[test]
    fn age_respects_birthday_not_yet_reached() {
        let p = patient(NaiveDate::from_ymd_opt(2000, 6, 15));
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2026, 6, 14).unwrap()), Some(25));
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()), Some(26));
    }

    #[test]
    fn age_unknown_without_birth_date() {
        let p = patient(None);
        assert_eq!(p.age_on(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()), None);
    }
}

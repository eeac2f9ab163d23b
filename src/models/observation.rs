use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::symptom::SymptomTag;

/// Vital-sign block of an observation. Every field is optional: a visit may
/// record only some of them, and rules for absent fields are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub heart_rate: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub temperature_c: Option<f64>,
    pub weight_kg: Option<f64>,
    pub fundal_height_cm: Option<f64>,
}

impl VitalSigns {
    pub fn has_blood_pressure(&self) -> bool {
        self.systolic.is_some() || self.diastolic.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One clinical visit snapshot for a gestante. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub gestational_week: Option<u8>,
    pub vitals: VitalSigns,
    pub fetal_movement: Option<bool>,
    pub edema: Option<bool>,
    pub symptoms: Vec<SymptomTag>,
}

impl Observation {
    /// Empty observation for a patient at a given time.
    pub fn new(patient_id: Uuid, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            recorded_at,
            gestational_week: None,
            vitals: VitalSigns::default(),
            fetal_movement: None,
            edema: None,
            symptoms: Vec::new(),
        }
    }

    pub fn with_blood_pressure(mut self, systolic: f64, diastolic: f64) -> Self {
        self.vitals.systolic = Some(systolic);
        self.vitals.diastolic = Some(diastolic);
        self
    }
}

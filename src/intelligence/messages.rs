use chrono::{DateTime, Utc};

use crate::models::Coordinates;

use super::types::{FindingKind, RiskFactorKind};

/// Message template builder for responder-facing alert text.
/// Messages name the measured value and the threshold it crossed so a
/// responder can act without opening the visit record.
pub struct MessageTemplates;

impl MessageTemplates {
    /// Blood-pressure finding.
    pub fn blood_pressure(kind: FindingKind, systolic: Option<f64>, diastolic: Option<f64>) -> String {
        format!(
            "Blood pressure {}/{} mmHg indicates {}.",
            fmt_reading(systolic),
            fmt_reading(diastolic),
            kind.label(),
        )
    }

    pub fn heart_rate(kind: FindingKind, bpm: f64) -> String {
        format!("Heart rate of {:.0} bpm indicates {}.", bpm, kind.label())
    }

    pub fn temperature(kind: FindingKind, celsius: f64) -> String {
        format!("Temperature of {:.1} °C indicates {}.", celsius, kind.label())
    }

    pub fn weight_gain(gain_kg: f64, week: u8) -> String {
        format!(
            "Weight increased {:.1} kg since the previous visit at gestational week {}.",
            gain_kg, week,
        )
    }

    /// Single reported symptom.
    pub fn symptom(kind: FindingKind) -> String {
        let label = kind.label();
        let mut chars = label.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
        format!("{} reported. Contact the patient to assess.", capitalized)
    }

    pub fn severe_preeclampsia() -> String {
        "Severe headache with blurred vision reported: possible severe preeclampsia. \
         Arrange urgent obstetric evaluation."
            .to_string()
    }

    pub fn maternal_sepsis() -> String {
        "Fever with chills: possible maternal sepsis. Arrange same-day clinical evaluation."
            .to_string()
    }

    pub fn hypertensive_trend(readings: &[f64]) -> String {
        let series = readings
            .iter()
            .map(|v| format!("{:.0}", v))
            .collect::<Vec<_>>()
            .join(" → ");
        format!(
            "Systolic pressure has not decreased across the last {} visits ({}).",
            readings.len(),
            series,
        )
    }

    pub fn elevated_risk(score: u32, top_factor: Option<&str>) -> String {
        match top_factor {
            Some(factor) => format!(
                "Composite risk score {} (main factor: {}). Review the care plan.",
                score, factor,
            ),
            None => format!("Composite risk score {}. Review the care plan.", score),
        }
    }

    pub fn no_caregiver() -> String {
        "No madrina is assigned to this patient. Assign a caregiver.".to_string()
    }

    pub fn no_clinician() -> String {
        "No clinician is assigned to this patient. Assign a responsible clinician.".to_string()
    }

    pub fn overdue_visit(days: i64) -> String {
        format!("Last prenatal visit was {} days ago. Schedule a follow-up visit.", days)
    }

    pub fn no_visits() -> String {
        "No prenatal visit is on record. Schedule a first visit.".to_string()
    }

    pub fn due_date_approaching(days: i64) -> String {
        format!(
            "Estimated due date is in {} days. Confirm the delivery plan and facility.",
            days,
        )
    }

    pub fn due_date_passed(days: i64) -> String {
        format!(
            "Estimated due date passed {} days ago. Overdue delivery: verify the patient's status.",
            days,
        )
    }

    /// Structured SOS text: timestamp, patient, coordinates and call to action.
    pub fn sos(at: DateTime<Utc>, patient_name: &str, location: Option<&Coordinates>) -> String {
        let position = match location {
            Some(c) => format!(
                "{:.6}, {:.6} (https://maps.google.com/?q={:.6},{:.6})",
                c.latitude, c.longitude, c.latitude, c.longitude,
            ),
            None => "unavailable, the device sent no valid position".to_string(),
        };
        format!(
            "EMERGENCY SOS\n\
             Time: {}\n\
             Patient: {}\n\
             Location: {}\n\
             Action: contact the patient now and dispatch assistance.",
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            patient_name,
            position,
        )
    }

    /// Recommendation for a risk factor. Deterministic per factor kind.
    pub fn recommendation(factor: &RiskFactorKind) -> &'static str {
        match factor {
            RiskFactorKind::Finding(kind) => finding_recommendation(*kind),
            RiskFactorKind::NoPrenatalVisits => "Schedule a first prenatal visit.",
            RiskFactorKind::NoCaregiver => "Assign a madrina to accompany the patient.",
            RiskFactorKind::NoFacility => "Assign a reference health facility.",
            RiskFactorKind::FetalMovementAbsent => {
                "Refer for fetal wellbeing assessment (monitoring or ultrasound)."
            }
            RiskFactorKind::Edema => "Check blood pressure and proteinuria for preeclampsia.",
            RiskFactorKind::Bleeding => "Refer to the emergency obstetric service.",
            RiskFactorKind::LaborSigns => "Evaluate for labor at the reference facility.",
            RiskFactorKind::AdolescentPregnancy => {
                "Provide adolescent-focused prenatal follow-up and psychosocial support."
            }
            RiskFactorKind::AdvancedMaternalAge => {
                "Offer additional screening for advanced maternal age."
            }
            RiskFactorKind::GrandMultiparity => {
                "Plan delivery at a facility able to manage postpartum hemorrhage."
            }
            RiskFactorKind::KnownCondition => {
                "Coordinate follow-up of known conditions with the clinician."
            }
        }
    }
}

fn finding_recommendation(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::SevereHypertension
        | FindingKind::PossibleSeverePreeclampsia
        | FindingKind::PossibleEclampsia => {
            "Refer urgently to the obstetric emergency service for hypertensive evaluation."
        }
        FindingKind::Hypertension | FindingKind::SustainedHypertensiveTrend => {
            "Repeat blood pressure within 24 hours and screen for preeclampsia."
        }
        FindingKind::Hypotension | FindingKind::Dizziness => {
            "Reassess blood pressure and hydration status."
        }
        FindingKind::SevereTachycardia | FindingKind::Bradycardia => {
            "Obtain a clinical evaluation of heart rhythm."
        }
        FindingKind::HighFever
        | FindingKind::Fever
        | FindingKind::ReportedFever
        | FindingKind::Chills
        | FindingKind::PossibleMaternalSepsis => "Evaluate for infection the same day.",
        FindingKind::ExcessiveWeightGain | FindingKind::SuddenSwelling => {
            "Check blood pressure and edema for preeclampsia."
        }
        FindingKind::Hemorrhage => "Refer to the emergency obstetric service.",
        FindingKind::AbsentFetalMovement | FindingKind::ReducedFetalMovement => {
            "Refer for fetal wellbeing assessment (monitoring or ultrasound)."
        }
        FindingKind::RupturedMembranes | FindingKind::PretermLaborSigns => {
            "Evaluate for labor at the reference facility."
        }
        FindingKind::RespiratoryDistress => "Refer to emergency care for respiratory assessment.",
        FindingKind::SevereHeadache
        | FindingKind::VisualDisturbance
        | FindingKind::EpigastricPain
        | FindingKind::SevereAbdominalPain => "Arrange a same-day clinical evaluation.",
        FindingKind::PersistentVomiting => "Assess hydration and arrange clinical review.",
        FindingKind::UrinarySymptoms => "Screen for urinary tract infection.",
        FindingKind::ElevatedRiskProfile => "Review the care plan with the responsible clinician.",
        FindingKind::NoCaregiverAssigned => "Assign a madrina to accompany the patient.",
        FindingKind::NoClinicianAssigned => "Assign a responsible clinician.",
        FindingKind::OverdueVisit => "Schedule a follow-up prenatal visit.",
        FindingKind::DueDateApproaching => "Confirm the delivery plan and facility.",
        FindingKind::DueDatePassed => "Verify delivery status with the patient.",
        FindingKind::EmergencySos | FindingKind::ManualReport => "Contact the patient now.",
    }
}

fn fmt_reading(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}", v),
        None => "?".to_string(),
    }
}

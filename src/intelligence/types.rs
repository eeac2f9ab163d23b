use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::authorization::AuthorizationError;
use crate::db::DatabaseError;
use crate::models::{Priority, SymptomTag};

// ---------------------------------------------------------------------------
// FindingKind
// ---------------------------------------------------------------------------

/// Every kind of finding the pipeline can raise. Also used as the persisted
/// alert type and as part of the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    // Single-snapshot vitals
    SevereHypertension,
    Hypertension,
    Hypotension,
    SevereTachycardia,
    Bradycardia,
    HighFever,
    Fever,
    ExcessiveWeightGain,
    // Reported symptoms
    Hemorrhage,
    SevereHeadache,
    VisualDisturbance,
    AbsentFetalMovement,
    ReducedFetalMovement,
    PossibleEclampsia,
    SevereAbdominalPain,
    EpigastricPain,
    RupturedMembranes,
    PretermLaborSigns,
    RespiratoryDistress,
    ReportedFever,
    Chills,
    PersistentVomiting,
    SuddenSwelling,
    Dizziness,
    UrinarySymptoms,
    // Dangerous combinations
    PossibleSeverePreeclampsia,
    PossibleMaternalSepsis,
    // History
    SustainedHypertensiveTrend,
    ElevatedRiskProfile,
    // Administrative
    NoCaregiverAssigned,
    NoClinicianAssigned,
    OverdueVisit,
    DueDateApproaching,
    DueDatePassed,
    // Operator-raised
    EmergencySos,
    ManualReport,
}

impl FindingKind {
    pub const ALL: [FindingKind; 36] = [
        Self::SevereHypertension,
        Self::Hypertension,
        Self::Hypotension,
        Self::SevereTachycardia,
        Self::Bradycardia,
        Self::HighFever,
        Self::Fever,
        Self::ExcessiveWeightGain,
        Self::Hemorrhage,
        Self::SevereHeadache,
        Self::VisualDisturbance,
        Self::AbsentFetalMovement,
        Self::ReducedFetalMovement,
        Self::PossibleEclampsia,
        Self::SevereAbdominalPain,
        Self::EpigastricPain,
        Self::RupturedMembranes,
        Self::PretermLaborSigns,
        Self::RespiratoryDistress,
        Self::ReportedFever,
        Self::Chills,
        Self::PersistentVomiting,
        Self::SuddenSwelling,
        Self::Dizziness,
        Self::UrinarySymptoms,
        Self::PossibleSeverePreeclampsia,
        Self::PossibleMaternalSepsis,
        Self::SustainedHypertensiveTrend,
        Self::ElevatedRiskProfile,
        Self::NoCaregiverAssigned,
        Self::NoClinicianAssigned,
        Self::OverdueVisit,
        Self::DueDateApproaching,
        Self::DueDatePassed,
        Self::EmergencySos,
        Self::ManualReport,
    ];

    /// Stable storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SevereHypertension => "severe_hypertension",
            Self::Hypertension => "hypertension",
            Self::Hypotension => "hypotension",
            Self::SevereTachycardia => "severe_tachycardia",
            Self::Bradycardia => "bradycardia",
            Self::HighFever => "high_fever",
            Self::Fever => "fever",
            Self::ExcessiveWeightGain => "excessive_weight_gain",
            Self::Hemorrhage => "hemorrhage",
            Self::SevereHeadache => "severe_headache",
            Self::VisualDisturbance => "visual_disturbance",
            Self::AbsentFetalMovement => "absent_fetal_movement",
            Self::ReducedFetalMovement => "reduced_fetal_movement",
            Self::PossibleEclampsia => "possible_eclampsia",
            Self::SevereAbdominalPain => "severe_abdominal_pain",
            Self::EpigastricPain => "epigastric_pain",
            Self::RupturedMembranes => "ruptured_membranes",
            Self::PretermLaborSigns => "preterm_labor_signs",
            Self::RespiratoryDistress => "respiratory_distress",
            Self::ReportedFever => "reported_fever",
            Self::Chills => "chills",
            Self::PersistentVomiting => "persistent_vomiting",
            Self::SuddenSwelling => "sudden_swelling",
            Self::Dizziness => "dizziness",
            Self::UrinarySymptoms => "urinary_symptoms",
            Self::PossibleSeverePreeclampsia => "possible_severe_preeclampsia",
            Self::PossibleMaternalSepsis => "possible_maternal_sepsis",
            Self::SustainedHypertensiveTrend => "sustained_hypertensive_trend",
            Self::ElevatedRiskProfile => "elevated_risk_profile",
            Self::NoCaregiverAssigned => "no_caregiver_assigned",
            Self::NoClinicianAssigned => "no_clinician_assigned",
            Self::OverdueVisit => "overdue_visit",
            Self::DueDateApproaching => "due_date_approaching",
            Self::DueDatePassed => "due_date_passed",
            Self::EmergencySos => "emergency_sos",
            Self::ManualReport => "manual_report",
        }
    }

    pub fn from_key(s: &str) -> Result<Self, DatabaseError> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DatabaseError::InvalidEnum {
                field: "FindingKind".into(),
                value: s.into(),
            })
    }

    /// Human-readable label ("severe hypertension").
    pub fn label(&self) -> &'static str {
        match self {
            Self::SevereHypertension => "severe hypertension",
            Self::Hypertension => "hypertension",
            Self::Hypotension => "hypotension",
            Self::SevereTachycardia => "severe tachycardia",
            Self::Bradycardia => "bradycardia",
            Self::HighFever => "high fever",
            Self::Fever => "fever",
            Self::ExcessiveWeightGain => "excessive weight gain",
            Self::Hemorrhage => "hemorrhage",
            Self::SevereHeadache => "severe headache",
            Self::VisualDisturbance => "visual disturbance",
            Self::AbsentFetalMovement => "absent fetal movement",
            Self::ReducedFetalMovement => "reduced fetal movement",
            Self::PossibleEclampsia => "possible eclampsia",
            Self::SevereAbdominalPain => "severe abdominal pain",
            Self::EpigastricPain => "epigastric pain",
            Self::RupturedMembranes => "possible rupture of membranes",
            Self::PretermLaborSigns => "preterm labor signs",
            Self::RespiratoryDistress => "respiratory distress",
            Self::ReportedFever => "reported fever",
            Self::Chills => "chills",
            Self::PersistentVomiting => "persistent vomiting",
            Self::SuddenSwelling => "sudden swelling",
            Self::Dizziness => "dizziness",
            Self::UrinarySymptoms => "urinary symptoms",
            Self::PossibleSeverePreeclampsia => "possible severe preeclampsia",
            Self::PossibleMaternalSepsis => "possible maternal sepsis",
            Self::SustainedHypertensiveTrend => "sustained hypertensive trend",
            Self::ElevatedRiskProfile => "elevated risk profile",
            Self::NoCaregiverAssigned => "no caregiver assigned",
            Self::NoClinicianAssigned => "no clinician assigned",
            Self::OverdueVisit => "overdue prenatal visit",
            Self::DueDateApproaching => "due date approaching",
            Self::DueDatePassed => "overdue delivery",
            Self::EmergencySos => "emergency sos",
            Self::ManualReport => "manual report",
        }
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// Input field that contributed to a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "field", content = "tag", rename_all = "snake_case")]
pub enum TriggerField {
    Systolic,
    Diastolic,
    HeartRate,
    Temperature,
    Weight,
    GestationalWeek,
    FetalMovement,
    Edema,
    Symptom(SymptomTag),
    History,
    Assignment,
    DueDate,
    LastVisit,
    CompositeScore,
}

/// Transient rule-evaluation result. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub priority: Priority,
    /// Severity score, 0-100.
    pub score: u8,
    pub message: String,
    pub triggered_by: Vec<TriggerField>,
}

impl Finding {
    pub fn new(
        kind: FindingKind,
        priority: Priority,
        score: u8,
        message: String,
        triggered_by: Vec<TriggerField>,
    ) -> Self {
        Self {
            kind,
            priority,
            score: score.min(100),
            message,
            triggered_by,
        }
    }

    /// Symptom tags among the triggering fields.
    pub fn symptoms(&self) -> Vec<SymptomTag> {
        self.triggered_by
            .iter()
            .filter_map(|f| match f {
                TriggerField::Symptom(tag) => Some(*tag),
                _ => None,
            })
            .collect()
    }

    /// Ranking key for headline selection: tier first, then score.
    pub fn rank(&self) -> (Priority, u8) {
        (self.priority, self.score)
    }
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TrendOutcome {
    /// Fewer than the minimum number of blood-pressure readings.
    InsufficientData { points: usize },
    /// Enough data, no pattern.
    Stable,
    Detected(Finding),
}

impl TrendOutcome {
    pub fn finding(&self) -> Option<&Finding> {
        match self {
            Self::Detected(f) => Some(f),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Risk profile
// ---------------------------------------------------------------------------

/// Contributor to the composite risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "factor", content = "kind", rename_all = "snake_case")]
pub enum RiskFactorKind {
    Finding(FindingKind),
    NoPrenatalVisits,
    NoCaregiver,
    NoFacility,
    FetalMovementAbsent,
    Edema,
    Bleeding,
    LaborSigns,
    AdolescentPregnancy,
    AdvancedMaternalAge,
    GrandMultiparity,
    KnownCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: RiskFactorKind,
    pub weight: u32,
    pub description: String,
}

/// Derived view: recomputable from the observation, history and patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Unbounded sum of factor weights.
    pub score: u32,
    pub tier: Priority,
    /// Ranked by weight, highest first.
    pub factors: Vec<RiskFactor>,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Internal rule fault. Never escapes the evaluation entry points.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Non-finite measurement in {0}")]
    NonFinite(&'static str),

    #[error("Measurement out of physical range in {field}: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

#[derive(Error, Debug)]
pub enum AlertingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal lock failed")]
    LockFailed,
}

impl From<AuthorizationError> for AlertingError {
    fn from(e: AuthorizationError) -> Self {
        match e {
            AuthorizationError::Database(db) => Self::Database(db),
            AuthorizationError::LockFailed => Self::LockFailed,
        }
    }
}

//! Clinical reference thresholds and the symptom rule table.
//!
//! The table is an exhaustive `match` over [`SymptomTag`]: adding a tag without
//! a rule fails to compile, so there is no "unknown symptom" path at runtime.

use crate::models::{Priority, SymptomTag};

use super::types::FindingKind;

// ── Blood pressure (mmHg) ───────────────────────────────────

pub const SEVERE_SYSTOLIC: f64 = 160.0;
pub const SEVERE_DIASTOLIC: f64 = 110.0;
pub const HYPERTENSIVE_SYSTOLIC: f64 = 140.0;
pub const HYPERTENSIVE_DIASTOLIC: f64 = 90.0;
pub const HYPOTENSIVE_SYSTOLIC: f64 = 90.0;
pub const HYPOTENSIVE_DIASTOLIC: f64 = 60.0;

// ── Heart rate (bpm) ────────────────────────────────────────

pub const TACHYCARDIA_BPM: f64 = 120.0;
pub const BRADYCARDIA_BPM: f64 = 50.0;
/// Heart rate that escalates a simple fever to high priority.
pub const FEVER_ESCALATION_BPM: f64 = 100.0;

// ── Temperature (°C) ────────────────────────────────────────

pub const HIGH_FEVER_C: f64 = 39.0;
pub const FEVER_C: f64 = 38.0;

// ── Weight ──────────────────────────────────────────────────

pub const WEIGHT_GAIN_KG: f64 = 2.0;
/// Weight-gain rule applies strictly after this gestational week.
pub const WEIGHT_GAIN_MIN_WEEK: u8 = 20;
/// Fetal movement is expected to be perceived from this week.
pub const FETAL_MOVEMENT_MIN_WEEK: u8 = 20;

// ── Scores ──────────────────────────────────────────────────

pub const SCORE_SEVERE_HYPERTENSION: u8 = 90;
pub const SCORE_HYPERTENSION: u8 = 70;
pub const SCORE_HYPOTENSION: u8 = 50;
pub const SCORE_TACHYCARDIA: u8 = 75;
pub const SCORE_BRADYCARDIA: u8 = 60;
pub const SCORE_HIGH_FEVER: u8 = 70;
pub const SCORE_FEVER: u8 = 50;
pub const SCORE_WEIGHT_GAIN: u8 = 65;
pub const SCORE_SEVERE_PREECLAMPSIA: u8 = 95;
pub const SCORE_MATERNAL_SEPSIS: u8 = 85;
pub const SCORE_MATERNAL_SEPSIS_HIGH_FEVER: u8 = 90;
pub const SCORE_HYPERTENSIVE_TREND: u8 = 80;

/// Plausible physical ranges; values outside are treated as entry faults.
pub const RANGE_BLOOD_PRESSURE: (f64, f64) = (20.0, 300.0);
pub const RANGE_HEART_RATE: (f64, f64) = (10.0, 300.0);
pub const RANGE_TEMPERATURE: (f64, f64) = (25.0, 45.0);
pub const RANGE_WEIGHT: (f64, f64) = (20.0, 300.0);

/// Fixed outcome of a reported symptom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymptomRule {
    pub kind: FindingKind,
    pub priority: Priority,
    pub score: u8,
}

pub const fn symptom_rule(tag: SymptomTag) -> SymptomRule {
    let (kind, priority, score) = match tag {
        SymptomTag::Hemorrhage => (FindingKind::Hemorrhage, Priority::Critical, 95),
        SymptomTag::HeadacheSevere => (FindingKind::SevereHeadache, Priority::High, 80),
        SymptomTag::VisionBlurry => (FindingKind::VisualDisturbance, Priority::High, 75),
        SymptomTag::FetalMovementAbsent => {
            (FindingKind::AbsentFetalMovement, Priority::Critical, 95)
        }
        SymptomTag::FetalMovementReduced => {
            (FindingKind::ReducedFetalMovement, Priority::High, 70)
        }
        SymptomTag::Seizure => (FindingKind::PossibleEclampsia, Priority::Critical, 100),
        SymptomTag::AbdominalPainSevere => (FindingKind::SevereAbdominalPain, Priority::High, 80),
        SymptomTag::EpigastricPain => (FindingKind::EpigastricPain, Priority::High, 75),
        SymptomTag::AmnioticFluidLoss => (FindingKind::RupturedMembranes, Priority::High, 80),
        SymptomTag::ContractionsPreterm => (FindingKind::PretermLaborSigns, Priority::High, 80),
        SymptomTag::DifficultyBreathing => {
            (FindingKind::RespiratoryDistress, Priority::Critical, 90)
        }
        SymptomTag::Fever => (FindingKind::ReportedFever, Priority::Medium, 50),
        SymptomTag::Chills => (FindingKind::Chills, Priority::Low, 30),
        SymptomTag::VomitingPersistent => (FindingKind::PersistentVomiting, Priority::Medium, 55),
        SymptomTag::SwellingFaceHands => (FindingKind::SuddenSwelling, Priority::Medium, 50),
        SymptomTag::Dizziness => (FindingKind::Dizziness, Priority::Medium, 40),
        SymptomTag::Dysuria => (FindingKind::UrinarySymptoms, Priority::Low, 30),
    };
    SymptomRule {
        kind,
        priority,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_documented_tuples() {
        assert_eq!(
            symptom_rule(SymptomTag::Hemorrhage),
            SymptomRule {
                kind: FindingKind::Hemorrhage,
                priority: Priority::Critical,
                score: 95
            }
        );
        assert_eq!(symptom_rule(SymptomTag::HeadacheSevere).priority, Priority::High);
        assert_eq!(symptom_rule(SymptomTag::HeadacheSevere).score, 80);
        assert_eq!(
            symptom_rule(SymptomTag::FetalMovementAbsent).priority,
            Priority::Critical
        );
    }

    #[test]
    fn every_tag_maps_to_a_distinct_kind() {
        let mut kinds: Vec<FindingKind> =
            SymptomTag::ALL.iter().map(|t| symptom_rule(*t).kind).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), SymptomTag::ALL.len());
    }

    #[test]
    fn scores_stay_within_bounds() {
        for tag in SymptomTag::ALL {
            assert!(symptom_rule(tag).score <= 100);
        }
    }
}

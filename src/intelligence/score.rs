//! Composite risk score.
//!
//! Sums finding scores and static factor weights into one unbounded score.
//! The tier mapping tolerates values above 100, so the sum is never clamped.

use chrono::NaiveDate;

use crate::models::{Observation, PatientRecord, Priority, SymptomTag};

use super::messages::MessageTemplates;
use super::types::{Finding, RiskFactor, RiskFactorKind, RiskProfile};

pub const WEIGHT_NO_PRENATAL_VISITS: u32 = 30;
pub const WEIGHT_NO_CAREGIVER: u32 = 20;
pub const WEIGHT_NO_FACILITY: u32 = 15;
pub const WEIGHT_FETAL_MOVEMENT_ABSENT: u32 = 30;
pub const WEIGHT_EDEMA: u32 = 15;
pub const WEIGHT_BLEEDING: u32 = 30;
pub const WEIGHT_LABOR_SIGNS: u32 = 25;
pub const WEIGHT_ADOLESCENT: u32 = 15;
pub const WEIGHT_ADVANCED_AGE: u32 = 15;
pub const WEIGHT_GRAND_MULTIPARITY: u32 = 10;
pub const WEIGHT_KNOWN_CONDITION: u32 = 10;

const ADOLESCENT_MAX_AGE: i32 = 17;
const ADVANCED_MIN_AGE: i32 = 36;
const GRAND_MULTIPARITY: u8 = 4;

/// Build the risk profile for a patient.
///
/// `findings` are the rule and trend findings for `observation` (if any).
/// `reported` are tags supplied with the visit on top of those recorded on
/// the observation; static factors come from the patient record. Factors are ranked by weight,
/// ties keep insertion order, so the same inputs always give the same profile.
pub fn aggregate(
    findings: &[Finding],
    observation: Option<&Observation>,
    reported: &[SymptomTag],
    record: &PatientRecord,
    today: NaiveDate,
) -> RiskProfile {
    let mut factors: Vec<RiskFactor> = findings
        .iter()
        .map(|f| RiskFactor {
            kind: RiskFactorKind::Finding(f.kind),
            weight: u32::from(f.score),
            description: f.kind.label().to_string(),
        })
        .collect();

    factors.extend(static_factors(observation, reported, record, today));
    factors.sort_by(|a, b| b.weight.cmp(&a.weight));

    let score: u32 = factors.iter().map(|f| f.weight).sum();

    let mut recommendations: Vec<String> = Vec::new();
    for factor in &factors {
        let text = MessageTemplates::recommendation(&factor.kind);
        if !recommendations.iter().any(|r| r == text) {
            recommendations.push(text.to_string());
        }
    }

    RiskProfile {
        score,
        tier: Priority::from_composite_score(score),
        factors,
        recommendations,
    }
}

/// Factors not expressible as a single-visit rule.
pub fn static_factors(
    observation: Option<&Observation>,
    reported: &[SymptomTag],
    record: &PatientRecord,
    today: NaiveDate,
) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    let mut push = |kind: RiskFactorKind, weight: u32, description: &str| {
        factors.push(RiskFactor {
            kind,
            weight,
            description: description.to_string(),
        });
    };

    if record.total_observations == 0 && observation.is_none() {
        push(
            RiskFactorKind::NoPrenatalVisits,
            WEIGHT_NO_PRENATAL_VISITS,
            "no prenatal visits on record",
        );
    }
    if record.patient.madrina_id.is_none() {
        push(RiskFactorKind::NoCaregiver, WEIGHT_NO_CAREGIVER, "no madrina assigned");
    }
    if record.patient.facility_id.is_none() {
        push(RiskFactorKind::NoFacility, WEIGHT_NO_FACILITY, "no health facility assigned");
    }

    if let Some(obs) = observation {
        if obs.fetal_movement == Some(false) {
            push(
                RiskFactorKind::FetalMovementAbsent,
                WEIGHT_FETAL_MOVEMENT_ABSENT,
                "fetal movement not perceived",
            );
        }
        if obs.edema == Some(true) {
            push(RiskFactorKind::Edema, WEIGHT_EDEMA, "edema present");
        }
    }

    let recorded = observation.map(|o| o.symptoms.as_slice()).unwrap_or_default();
    if recorded.iter().chain(reported).any(|s| s.is_bleeding()) {
        push(RiskFactorKind::Bleeding, WEIGHT_BLEEDING, "vaginal bleeding reported");
    }
    if recorded.iter().chain(reported).any(|s| s.is_labor_sign()) {
        push(RiskFactorKind::LaborSigns, WEIGHT_LABOR_SIGNS, "signs of labor reported");
    }

    match record.patient.age_on(today) {
        Some(age) if age <= ADOLESCENT_MAX_AGE => {
            push(
                RiskFactorKind::AdolescentPregnancy,
                WEIGHT_ADOLESCENT,
                "adolescent pregnancy",
            );
        }
        Some(age) if age >= ADVANCED_MIN_AGE => {
            push(
                RiskFactorKind::AdvancedMaternalAge,
                WEIGHT_ADVANCED_AGE,
                "advanced maternal age",
            );
        }
        _ => {}
    }

    if record.patient.parity.is_some_and(|p| p >= GRAND_MULTIPARITY) {
        push(
            RiskFactorKind::GrandMultiparity,
            WEIGHT_GRAND_MULTIPARITY,
            "grand multiparity",
        );
    }

    for condition in &record.patient.known_conditions {
        let condition = condition.trim();
        if !condition.is_empty() {
            push(RiskFactorKind::KnownCondition, WEIGHT_KNOWN_CONDITION, condition);
        }
    }

    factors
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::intelligence::types::FindingKind;
    use crate::models::{Gestante, SymptomTag};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
    }

    fn record() -> PatientRecord {
        PatientRecord {
            patient: Gestante {
                id: Uuid::new_v4(),
                full_name: "Test".into(),
                birth_date: NaiveDate::from_ymd_opt(1998, 1, 1),
                parity: Some(1),
                known_conditions: vec![],
                due_date: None,
                madrina_id: Some(Uuid::new_v4()),
                clinician_id: Some(Uuid::new_v4()),
                facility_id: Some(Uuid::new_v4()),
                municipality_id: None,
                active: true,
            },
            observations: vec![],
            total_observations: 4,
        }
    }

    fn finding(kind: FindingKind, priority: Priority, score: u8) -> Finding {
        Finding::new(kind, priority, score, String::new(), vec![])
    }

    #[test]
    fn low_risk_patient_has_empty_profile() {
        let profile = aggregate(&[], None, &[], &record(), today());
        assert_eq!(profile.score, 0);
        assert_eq!(profile.tier, Priority::Low);
        assert!(profile.factors.is_empty());
        assert!(profile.recommendations.is_empty());
    }

    #[test]
    fn score_is_an_unbounded_sum() {
        let findings = vec![
            finding(FindingKind::SevereHypertension, Priority::Critical, 90),
            finding(FindingKind::Hemorrhage, Priority::Critical, 95),
        ];
        let mut r = record();
        r.patient.madrina_id = None;
        let profile = aggregate(&findings, None, &[], &r, today());
        assert_eq!(profile.score, 90 + 95 + WEIGHT_NO_CAREGIVER);
        assert!(profile.score > 100);
        assert_eq!(profile.tier, Priority::Critical);
    }

    #[test]
    fn factors_are_ranked_by_weight() {
        let findings = vec![
            finding(FindingKind::Fever, Priority::Medium, 50),
            finding(FindingKind::Hemorrhage, Priority::Critical, 95),
        ];
        let profile = aggregate(&findings, None, &[], &record(), today());
        assert_eq!(
            profile.factors[0].kind,
            RiskFactorKind::Finding(FindingKind::Hemorrhage)
        );
        assert_eq!(profile.factors[1].weight, 50);
    }

    #[test]
    fn static_factors_from_record_and_observation() {
        let mut r = record();
        r.total_observations = 0;
        r.patient.madrina_id = None;
        r.patient.facility_id = None;
        r.patient.birth_date = NaiveDate::from_ymd_opt(2010, 3, 1);
        r.patient.parity = Some(5);
        r.patient.known_conditions = vec!["chronic hypertension".into(), " ".into()];

        let kinds: Vec<_> = static_factors(None, &[], &r, today())
            .into_iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RiskFactorKind::NoPrenatalVisits,
                RiskFactorKind::NoCaregiver,
                RiskFactorKind::NoFacility,
                RiskFactorKind::AdolescentPregnancy,
                RiskFactorKind::GrandMultiparity,
                RiskFactorKind::KnownCondition,
            ]
        );

        let mut obs = Observation::new(r.patient.id, Utc::now());
        obs.fetal_movement = Some(false);
        obs.edema = Some(true);
        obs.symptoms = vec![SymptomTag::Hemorrhage, SymptomTag::ContractionsPreterm];
        let kinds: Vec<_> = static_factors(Some(&obs), &[], &record(), today())
            .into_iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RiskFactorKind::FetalMovementAbsent,
                RiskFactorKind::Edema,
                RiskFactorKind::Bleeding,
                RiskFactorKind::LaborSigns,
            ]
        );
    }

    #[test]
    fn reported_tags_count_like_recorded_ones() {
        let obs = Observation::new(Uuid::new_v4(), Utc::now());
        let reported = [SymptomTag::Hemorrhage, SymptomTag::AmnioticFluidLoss];

        let via_argument = aggregate(&[], Some(&obs), &reported, &record(), today());
        let mut recorded = obs.clone();
        recorded.symptoms = reported.to_vec();
        let via_observation = aggregate(&[], Some(&recorded), &[], &record(), today());

        assert_eq!(via_argument.score, WEIGHT_BLEEDING + WEIGHT_LABOR_SIGNS);
        assert_eq!(via_argument.score, via_observation.score);
        // A tag present in both places is still one factor.
        let both = aggregate(&[], Some(&recorded), &reported, &record(), today());
        assert_eq!(both.factors.len(), 2);
    }

    #[test]
    fn advanced_maternal_age_factor() {
        let mut r = record();
        r.patient.birth_date = NaiveDate::from_ymd_opt(1985, 1, 1);
        let factors = static_factors(None, &[], &r, today());
        assert_eq!(factors[0].kind, RiskFactorKind::AdvancedMaternalAge);
    }

    #[test]
    fn recommendations_are_deterministic_and_deduplicated() {
        let findings = vec![
            finding(FindingKind::SevereHypertension, Priority::Critical, 90),
            finding(FindingKind::PossibleSeverePreeclampsia, Priority::Critical, 95),
            finding(FindingKind::Fever, Priority::Medium, 50),
        ];
        let first = aggregate(&findings, None, &[], &record(), today());
        let second = aggregate(&findings, None, &[], &record(), today());
        assert_eq!(first.recommendations, second.recommendations);
        // Hypertension and preeclampsia share one recommendation.
        assert_eq!(first.recommendations.len(), 2);
    }
}

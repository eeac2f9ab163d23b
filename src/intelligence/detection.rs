use uuid::Uuid;

use crate::models::{Observation, Priority, SymptomTag, VitalSigns};

use super::messages::MessageTemplates;
use super::reference::*;
use super::types::{EvaluationError, Finding, FindingKind, TriggerField};

/// Evaluate one observation without a prior visit (weight-gain rule skipped).
pub fn evaluate_observation(observation: &Observation, symptoms: &[SymptomTag]) -> Vec<Finding> {
    evaluate_with_prior(observation, None, symptoms)
}

/// Evaluate one observation against every single-snapshot rule.
///
/// `symptoms` is merged with the tags recorded on the observation itself.
/// Absent fields skip their rule. A rule that faults (non-finite or implausible
/// measurement) is logged and contributes nothing; the other rules still run.
/// Findings are returned headline first (tier, then score).
pub fn evaluate_with_prior(
    observation: &Observation,
    previous: Option<&Observation>,
    symptoms: &[SymptomTag],
) -> Vec<Finding> {
    let vitals = &observation.vitals;
    let tags = merge_symptoms(&observation.symptoms, symptoms);
    let mut findings = Vec::new();

    let bp = detect_blood_pressure(observation.id, vitals);
    let bp_critical = bp.as_ref().is_some_and(|f| f.priority == Priority::Critical);
    let hypertensive = bp.as_ref().is_some_and(|f| {
        matches!(f.kind, FindingKind::SevereHypertension | FindingKind::Hypertension)
    });
    let hypotensive = bp.as_ref().is_some_and(|f| f.kind == FindingKind::Hypotension);
    findings.extend(bp);

    findings.extend(guarded(
        observation.id,
        "heart_rate",
        detect_heart_rate(vitals, bp_critical, hypotensive),
    ));
    findings.extend(guarded(observation.id, "temperature", detect_temperature(vitals)));
    findings.extend(guarded(
        observation.id,
        "weight_gain",
        detect_weight_gain(observation, previous, hypertensive),
    ));
    findings.extend(detect_fetal_movement_flag(observation));
    findings.extend(detect_symptoms(&tags));
    findings.extend(detect_combinations(&tags, vitals));

    let findings = keep_strongest_per_kind(findings);
    tracing::debug!(
        observation_id = %observation.id,
        findings = findings.len(),
        "Observation evaluated"
    );
    findings
}

/// The finding that owns the single headline slot: highest tier, then highest
/// score; on a full tie the earlier finding wins.
pub fn headline(findings: &[Finding]) -> Option<&Finding> {
    findings.iter().fold(None, |best: Option<&Finding>, f| match best {
        Some(b) if b.rank() >= f.rank() => Some(b),
        _ => Some(f),
    })
}

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

/// Each component is checked on its own: a faulty one is logged and treated
/// as absent, so a valid severe reading in the other still counts.
pub fn detect_blood_pressure(observation_id: Uuid, vitals: &VitalSigns) -> Option<Finding> {
    let systolic = guarded(
        observation_id,
        "systolic",
        checked("systolic", vitals.systolic, RANGE_BLOOD_PRESSURE),
    );
    let diastolic = guarded(
        observation_id,
        "diastolic",
        checked("diastolic", vitals.diastolic, RANGE_BLOOD_PRESSURE),
    );
    let reading = (systolic, diastolic);

    let severe = crossed(systolic, diastolic, |v, limit| v >= limit, SEVERE_SYSTOLIC, SEVERE_DIASTOLIC);
    if !severe.is_empty() {
        return Some(bp_finding(
            FindingKind::SevereHypertension,
            Priority::Critical,
            SCORE_SEVERE_HYPERTENSION,
            reading,
            severe,
        ));
    }

    let high = crossed(
        systolic,
        diastolic,
        |v, limit| v >= limit,
        HYPERTENSIVE_SYSTOLIC,
        HYPERTENSIVE_DIASTOLIC,
    );
    if !high.is_empty() {
        return Some(bp_finding(
            FindingKind::Hypertension,
            Priority::High,
            SCORE_HYPERTENSION,
            reading,
            high,
        ));
    }

    let low = crossed(
        systolic,
        diastolic,
        |v, limit| v < limit,
        HYPOTENSIVE_SYSTOLIC,
        HYPOTENSIVE_DIASTOLIC,
    );
    if !low.is_empty() {
        return Some(bp_finding(
            FindingKind::Hypotension,
            Priority::Medium,
            SCORE_HYPOTENSION,
            reading,
            low,
        ));
    }

    None
}

/// Components of the reading that cross their limit.
fn crossed(
    systolic: Option<f64>,
    diastolic: Option<f64>,
    hit: impl Fn(f64, f64) -> bool,
    systolic_limit: f64,
    diastolic_limit: f64,
) -> Vec<TriggerField> {
    let mut fields = Vec::new();
    if systolic.is_some_and(|v| hit(v, systolic_limit)) {
        fields.push(TriggerField::Systolic);
    }
    if diastolic.is_some_and(|v| hit(v, diastolic_limit)) {
        fields.push(TriggerField::Diastolic);
    }
    fields
}

fn bp_finding(
    kind: FindingKind,
    priority: Priority,
    score: u8,
    (systolic, diastolic): (Option<f64>, Option<f64>),
    fields: Vec<TriggerField>,
) -> Finding {
    Finding::new(
        kind,
        priority,
        score,
        MessageTemplates::blood_pressure(kind, systolic, diastolic),
        fields,
    )
}

/// Tachycardia is critical when blood pressure is already critical; bradycardia
/// is critical with critical blood pressure or hypotension (shock pattern).
pub fn detect_heart_rate(
    vitals: &VitalSigns,
    bp_critical: bool,
    hypotensive: bool,
) -> Result<Option<Finding>, EvaluationError> {
    let Some(bpm) = checked("heart_rate", vitals.heart_rate, RANGE_HEART_RATE)? else {
        return Ok(None);
    };

    if bpm >= TACHYCARDIA_BPM {
        let priority = if bp_critical { Priority::Critical } else { Priority::High };
        return Ok(Some(Finding::new(
            FindingKind::SevereTachycardia,
            priority,
            SCORE_TACHYCARDIA,
            MessageTemplates::heart_rate(FindingKind::SevereTachycardia, bpm),
            vec![TriggerField::HeartRate],
        )));
    }

    if bpm < BRADYCARDIA_BPM {
        let priority = if bp_critical || hypotensive {
            Priority::Critical
        } else {
            Priority::Medium
        };
        return Ok(Some(Finding::new(
            FindingKind::Bradycardia,
            priority,
            SCORE_BRADYCARDIA,
            MessageTemplates::heart_rate(FindingKind::Bradycardia, bpm),
            vec![TriggerField::HeartRate],
        )));
    }

    Ok(None)
}

/// High fever is critical with tachycardia; a simple fever is high with HR ≥ 100.
pub fn detect_temperature(vitals: &VitalSigns) -> Result<Option<Finding>, EvaluationError> {
    let Some(celsius) = checked("temperature", vitals.temperature_c, RANGE_TEMPERATURE)? else {
        return Ok(None);
    };
    let bpm = checked("heart_rate", vitals.heart_rate, RANGE_HEART_RATE)
        .ok()
        .flatten();

    let (kind, escalated, score) = if celsius >= HIGH_FEVER_C {
        (
            FindingKind::HighFever,
            bpm.is_some_and(|b| b >= TACHYCARDIA_BPM),
            SCORE_HIGH_FEVER,
        )
    } else if celsius >= FEVER_C {
        (
            FindingKind::Fever,
            bpm.is_some_and(|b| b >= FEVER_ESCALATION_BPM),
            SCORE_FEVER,
        )
    } else {
        return Ok(None);
    };

    let priority = match (kind, escalated) {
        (FindingKind::HighFever, true) => Priority::Critical,
        (FindingKind::HighFever, false) | (_, true) => Priority::High,
        _ => Priority::Medium,
    };
    let mut fields = vec![TriggerField::Temperature];
    if escalated {
        fields.push(TriggerField::HeartRate);
    }

    Ok(Some(Finding::new(
        kind,
        priority,
        score,
        MessageTemplates::temperature(kind, celsius),
        fields,
    )))
}

/// Gain above 2 kg since the prior visit after week 20. Critical when the same
/// visit is hypertensive.
pub fn detect_weight_gain(
    observation: &Observation,
    previous: Option<&Observation>,
    hypertensive: bool,
) -> Result<Option<Finding>, EvaluationError> {
    let Some(previous) = previous else {
        return Ok(None);
    };
    let Some(week) = observation.gestational_week else {
        return Ok(None);
    };
    if week <= WEIGHT_GAIN_MIN_WEEK {
        return Ok(None);
    }
    let current = checked("weight", observation.vitals.weight_kg, RANGE_WEIGHT)?;
    let prior = checked("weight", previous.vitals.weight_kg, RANGE_WEIGHT)?;
    let (Some(current), Some(prior)) = (current, prior) else {
        return Ok(None);
    };

    let gain = current - prior;
    if gain <= WEIGHT_GAIN_KG {
        return Ok(None);
    }

    let priority = if hypertensive { Priority::Critical } else { Priority::High };
    Ok(Some(Finding::new(
        FindingKind::ExcessiveWeightGain,
        priority,
        SCORE_WEIGHT_GAIN,
        MessageTemplates::weight_gain(gain, week),
        vec![TriggerField::Weight, TriggerField::GestationalWeek],
    )))
}

/// Recorded "no fetal movement" flag after week 20 raises the same finding as
/// the reported symptom.
pub fn detect_fetal_movement_flag(observation: &Observation) -> Option<Finding> {
    if observation.fetal_movement != Some(false) {
        return None;
    }
    if observation
        .gestational_week
        .is_some_and(|w| w < FETAL_MOVEMENT_MIN_WEEK)
    {
        return None;
    }
    let rule = symptom_rule(SymptomTag::FetalMovementAbsent);
    Some(Finding::new(
        rule.kind,
        rule.priority,
        rule.score,
        MessageTemplates::symptom(rule.kind),
        vec![TriggerField::FetalMovement],
    ))
}

// ---------------------------------------------------------------------------
// Symptoms
// ---------------------------------------------------------------------------

pub fn detect_symptoms(tags: &[SymptomTag]) -> Vec<Finding> {
    tags.iter()
        .map(|tag| {
            let rule = symptom_rule(*tag);
            Finding::new(
                rule.kind,
                rule.priority,
                rule.score,
                MessageTemplates::symptom(rule.kind),
                vec![TriggerField::Symptom(*tag)],
            )
        })
        .collect()
}

/// Dangerous combinations escalate regardless of the individual scores.
/// The fever half of the sepsis pair accepts either the tag or a measured
/// temperature of at least 38 °C.
pub fn detect_combinations(tags: &[SymptomTag], vitals: &VitalSigns) -> Vec<Finding> {
    let mut findings = Vec::new();
    let has = |t: SymptomTag| tags.contains(&t);

    if has(SymptomTag::HeadacheSevere) && has(SymptomTag::VisionBlurry) {
        findings.push(Finding::new(
            FindingKind::PossibleSeverePreeclampsia,
            Priority::Critical,
            SCORE_SEVERE_PREECLAMPSIA,
            MessageTemplates::severe_preeclampsia(),
            vec![
                TriggerField::Symptom(SymptomTag::HeadacheSevere),
                TriggerField::Symptom(SymptomTag::VisionBlurry),
            ],
        ));
    }

    if has(SymptomTag::Chills) {
        // A faulty reading is logged by the temperature rule; here it is absent.
        let measured = checked("temperature", vitals.temperature_c, RANGE_TEMPERATURE).unwrap_or_default();
        let measured_fever = measured.is_some_and(|c| c >= FEVER_C);
        if has(SymptomTag::Fever) || measured_fever {
            let score = if measured.is_some_and(|c| c >= HIGH_FEVER_C) {
                SCORE_MATERNAL_SEPSIS_HIGH_FEVER
            } else {
                SCORE_MATERNAL_SEPSIS
            };
            let mut fields = vec![TriggerField::Symptom(SymptomTag::Chills)];
            if has(SymptomTag::Fever) {
                fields.push(TriggerField::Symptom(SymptomTag::Fever));
            }
            if measured_fever {
                fields.push(TriggerField::Temperature);
            }
            findings.push(Finding::new(
                FindingKind::PossibleMaternalSepsis,
                Priority::High,
                score,
                MessageTemplates::maternal_sepsis(),
                fields,
            ));
        }
    }

    findings
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject non-finite and physically implausible values.
fn checked(
    field: &'static str,
    value: Option<f64>,
    (low, high): (f64, f64),
) -> Result<Option<f64>, EvaluationError> {
    match value {
        None => Ok(None),
        Some(v) if !v.is_finite() => Err(EvaluationError::NonFinite(field)),
        Some(v) if v < low || v > high => Err(EvaluationError::OutOfRange { field, value: v }),
        Some(v) => Ok(Some(v)),
    }
}

/// Log a rule fault and fall back to "no finding" for that rule only.
fn guarded<T: Default>(observation_id: Uuid, rule: &'static str, result: Result<T, EvaluationError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(
                observation_id = %observation_id,
                rule,
                error = %e,
                "Rule evaluation failed, rule skipped"
            );
            T::default()
        }
    }
}

fn merge_symptoms(recorded: &[SymptomTag], reported: &[SymptomTag]) -> Vec<SymptomTag> {
    let mut tags: Vec<SymptomTag> = Vec::with_capacity(recorded.len() + reported.len());
    for tag in recorded.iter().chain(reported) {
        if !tags.contains(tag) {
            tags.push(*tag);
        }
    }
    tags
}

/// One finding per kind (the strongest), ordered headline first.
fn keep_strongest_per_kind(findings: Vec<Finding>) -> Vec<Finding> {
    let mut kept: Vec<Finding> = Vec::with_capacity(findings.len());
    for f in findings {
        match kept.iter_mut().find(|k| k.kind == f.kind) {
            Some(existing) if existing.rank() < f.rank() => *existing = f,
            Some(_) => {}
            None => kept.push(f),
        }
    }
    kept.sort_by(|a, b| b.rank().cmp(&a.rank()));
    kept
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn obs() -> Observation {
        Observation::new(Uuid::new_v4(), Utc::now())
    }

    fn kinds(findings: &[Finding]) -> Vec<FindingKind> {
        findings.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn severe_hypertension_scenario() {
        let o = obs().with_blood_pressure(165.0, 115.0);
        let findings = evaluate_observation(&o, &[]);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.kind, FindingKind::SevereHypertension);
        assert_eq!(f.kind.label(), "severe hypertension");
        assert_eq!(f.priority, Priority::Critical);
        assert_eq!(f.score, 90);
        assert_eq!(f.triggered_by, vec![TriggerField::Systolic, TriggerField::Diastolic]);
    }

    #[test]
    fn severe_threshold_on_either_component() {
        for (s, d) in [(160.0, 70.0), (120.0, 110.0), (200.0, 130.0)] {
            let findings = evaluate_observation(&obs().with_blood_pressure(s, d), &[]);
            let f = headline(&findings).unwrap();
            assert_eq!(f.priority, Priority::Critical, "{s}/{d}");
            assert!(f.score >= 90);
        }
    }

    #[test]
    fn hypertension_and_hypotension_bands() {
        let f = evaluate_observation(&obs().with_blood_pressure(142.0, 85.0), &[]);
        assert_eq!(kinds(&f), vec![FindingKind::Hypertension]);
        assert_eq!(f[0].priority, Priority::High);
        assert_eq!(f[0].score, 70);

        let f = evaluate_observation(&obs().with_blood_pressure(85.0, 55.0), &[]);
        assert_eq!(kinds(&f), vec![FindingKind::Hypotension]);
        assert_eq!(f[0].priority, Priority::Medium);

        let f = evaluate_observation(&obs().with_blood_pressure(118.0, 76.0), &[]);
        assert!(f.is_empty());
    }

    #[test]
    fn missing_vitals_yield_no_findings() {
        let findings = evaluate_observation(&obs(), &[]);
        assert!(findings.is_empty());
    }

    #[test]
    fn partial_blood_pressure_still_evaluated() {
        let mut o = obs();
        o.vitals.diastolic = Some(112.0);
        let findings = evaluate_observation(&o, &[]);
        assert_eq!(findings[0].kind, FindingKind::SevereHypertension);
        assert_eq!(findings[0].triggered_by, vec![TriggerField::Diastolic]);
    }

    #[test]
    fn tachycardia_escalates_with_critical_pressure() {
        let mut o = obs();
        o.vitals.heart_rate = Some(125.0);
        let f = evaluate_observation(&o, &[]);
        assert_eq!(f[0].kind, FindingKind::SevereTachycardia);
        assert_eq!(f[0].priority, Priority::High);

        let mut o = obs().with_blood_pressure(170.0, 100.0);
        o.vitals.heart_rate = Some(125.0);
        let f = evaluate_observation(&o, &[]);
        let tachy = f.iter().find(|x| x.kind == FindingKind::SevereTachycardia).unwrap();
        assert_eq!(tachy.priority, Priority::Critical);
        assert_eq!(tachy.score, 75);
    }

    #[test]
    fn bradycardia_with_hypotension_is_critical() {
        let mut o = obs();
        o.vitals.heart_rate = Some(45.0);
        let f = evaluate_observation(&o, &[]);
        assert_eq!(f[0].priority, Priority::Medium);

        let mut o = obs().with_blood_pressure(80.0, 50.0);
        o.vitals.heart_rate = Some(45.0);
        let f = evaluate_observation(&o, &[]);
        let brady = f.iter().find(|x| x.kind == FindingKind::Bradycardia).unwrap();
        assert_eq!(brady.priority, Priority::Critical);
    }

    #[test]
    fn fever_bands() {
        let mut o = obs();
        o.vitals.temperature_c = Some(38.2);
        let f = evaluate_observation(&o, &[]);
        assert_eq!(f[0].kind, FindingKind::Fever);
        assert_eq!(f[0].priority, Priority::Medium);
        assert_eq!(f[0].score, 50);

        o.vitals.heart_rate = Some(105.0);
        let f = evaluate_observation(&o, &[]);
        assert_eq!(f[0].priority, Priority::High);

        let mut o = obs();
        o.vitals.temperature_c = Some(39.4);
        let f = evaluate_observation(&o, &[]);
        assert_eq!(f[0].kind, FindingKind::HighFever);
        assert_eq!(f[0].priority, Priority::High);
        assert_eq!(f[0].score, 70);
    }

    #[test]
    fn weight_gain_requires_prior_and_week() {
        let mut prior = obs();
        prior.vitals.weight_kg = Some(60.0);
        let mut o = obs();
        o.vitals.weight_kg = Some(62.5);
        o.gestational_week = Some(24);

        let f = evaluate_with_prior(&o, Some(&prior), &[]);
        assert_eq!(kinds(&f), vec![FindingKind::ExcessiveWeightGain]);
        assert_eq!(f[0].priority, Priority::High);
        assert_eq!(f[0].score, 65);

        // No prior visit: rule skipped.
        assert!(evaluate_observation(&o, &[]).is_empty());

        // Week 20 is not "after week 20".
        o.gestational_week = Some(20);
        assert!(evaluate_with_prior(&o, Some(&prior), &[]).is_empty());

        // Exactly 2.0 kg is not excessive.
        o.gestational_week = Some(30);
        o.vitals.weight_kg = Some(62.0);
        assert!(evaluate_with_prior(&o, Some(&prior), &[]).is_empty());
    }

    #[test]
    fn weight_gain_with_hypertension_is_critical() {
        let mut prior = obs();
        prior.vitals.weight_kg = Some(60.0);
        let mut o = obs().with_blood_pressure(145.0, 92.0);
        o.vitals.weight_kg = Some(63.0);
        o.gestational_week = Some(32);
        let f = evaluate_with_prior(&o, Some(&prior), &[]);
        let gain = f.iter().find(|x| x.kind == FindingKind::ExcessiveWeightGain).unwrap();
        assert_eq!(gain.priority, Priority::Critical);
    }

    #[test]
    fn preeclampsia_combination_takes_headline() {
        let findings = evaluate_observation(
            &obs(),
            &[SymptomTag::HeadacheSevere, SymptomTag::VisionBlurry],
        );
        let head = headline(&findings).unwrap();
        assert_eq!(head.kind, FindingKind::PossibleSeverePreeclampsia);
        assert_eq!(head.kind.label(), "possible severe preeclampsia");
        assert_eq!(head.priority, Priority::Critical);
        assert_eq!(head.score, 95);
        // Individual findings are still reported.
        assert!(kinds(&findings).contains(&FindingKind::SevereHeadache));
        assert!(kinds(&findings).contains(&FindingKind::VisualDisturbance));
        assert_eq!(findings[0].kind, FindingKind::PossibleSeverePreeclampsia);
    }

    #[test]
    fn sepsis_combination_from_tags_or_measurement() {
        let f = evaluate_observation(&obs(), &[SymptomTag::Fever, SymptomTag::Chills]);
        let sepsis = f.iter().find(|x| x.kind == FindingKind::PossibleMaternalSepsis).unwrap();
        assert_eq!(sepsis.priority, Priority::High);
        assert!(sepsis.score >= 85);

        let mut o = obs();
        o.vitals.temperature_c = Some(39.2);
        let f = evaluate_observation(&o, &[SymptomTag::Chills]);
        let sepsis = f.iter().find(|x| x.kind == FindingKind::PossibleMaternalSepsis).unwrap();
        assert_eq!(sepsis.score, 90);
        assert!(sepsis.triggered_by.contains(&TriggerField::Temperature));

        let f = evaluate_observation(&obs(), &[SymptomTag::Chills]);
        assert!(!kinds(&f).contains(&FindingKind::PossibleMaternalSepsis));
    }

    #[test]
    fn symptom_table_drives_findings() {
        let f = evaluate_observation(&obs(), &[SymptomTag::Hemorrhage]);
        assert_eq!(f[0].kind, FindingKind::Hemorrhage);
        assert_eq!(f[0].priority, Priority::Critical);
        assert_eq!(f[0].score, 95);
        assert_eq!(f[0].symptoms(), vec![SymptomTag::Hemorrhage]);
    }

    #[test]
    fn recorded_and_reported_symptoms_merge_without_duplicates() {
        let mut o = obs();
        o.symptoms = vec![SymptomTag::HeadacheSevere];
        let f = evaluate_observation(&o, &[SymptomTag::HeadacheSevere, SymptomTag::VisionBlurry]);
        let headaches = f.iter().filter(|x| x.kind == FindingKind::SevereHeadache).count();
        assert_eq!(headaches, 1);
        assert_eq!(f[0].kind, FindingKind::PossibleSeverePreeclampsia);
    }

    #[test]
    fn fetal_movement_flag_and_tag_collapse_to_one_finding() {
        let mut o = obs();
        o.fetal_movement = Some(false);
        o.gestational_week = Some(30);
        let f = evaluate_observation(&o, &[SymptomTag::FetalMovementAbsent]);
        assert_eq!(kinds(&f), vec![FindingKind::AbsentFetalMovement]);

        o.gestational_week = Some(14);
        assert!(evaluate_observation(&o, &[]).is_empty());
    }

    #[test]
    fn faulty_measurement_skips_only_its_rule() {
        let mut o = obs().with_blood_pressure(f64::NAN, 80.0);
        o.vitals.temperature_c = Some(39.5);
        let f = evaluate_observation(&o, &[]);
        assert_eq!(kinds(&f), vec![FindingKind::HighFever]);

        let mut o = obs();
        o.vitals.heart_rate = Some(9000.0);
        assert!(evaluate_observation(&o, &[]).is_empty());
    }

    #[test]
    fn faulty_pressure_component_does_not_hide_the_other() {
        let f = evaluate_observation(&obs().with_blood_pressure(175.0, 0.0), &[]);
        assert_eq!(kinds(&f), vec![FindingKind::SevereHypertension]);
        assert_eq!(f[0].priority, Priority::Critical);
        assert_eq!(f[0].triggered_by, vec![TriggerField::Systolic]);
        assert!(f[0].message.contains("175/?"));

        let f = evaluate_observation(&obs().with_blood_pressure(310.0, 120.0), &[]);
        assert_eq!(kinds(&f), vec![FindingKind::SevereHypertension]);
        assert_eq!(f[0].triggered_by, vec![TriggerField::Diastolic]);
        assert!(f[0].score >= 90);
    }

    #[test]
    fn sepsis_tags_survive_a_faulty_thermometer() {
        let mut o = obs();
        o.vitals.temperature_c = Some(f64::NAN);
        let f = evaluate_observation(&o, &[SymptomTag::Fever, SymptomTag::Chills]);
        assert_eq!(f[0].kind, FindingKind::PossibleMaternalSepsis);
    }

    #[test]
    fn headline_prefers_tier_then_score() {
        let findings = vec![
            Finding::new(FindingKind::SevereHeadache, Priority::High, 80, "".into(), vec![]),
            Finding::new(FindingKind::Hypotension, Priority::Medium, 99, "".into(), vec![]),
            Finding::new(FindingKind::Hypertension, Priority::High, 70, "".into(), vec![]),
        ];
        assert_eq!(headline(&findings).unwrap().kind, FindingKind::SevereHeadache);
        assert!(headline(&[]).is_none());
    }

    #[test]
    fn headline_full_tie_keeps_first() {
        let findings = vec![
            Finding::new(FindingKind::SevereHeadache, Priority::High, 80, "".into(), vec![]),
            Finding::new(FindingKind::SevereAbdominalPain, Priority::High, 80, "".into(), vec![]),
        ];
        assert_eq!(headline(&findings).unwrap().kind, FindingKind::SevereHeadache);
    }

    #[test]
    fn results_are_ordered_headline_first() {
        let mut o = obs().with_blood_pressure(145.0, 85.0);
        o.vitals.temperature_c = Some(38.1);
        let f = evaluate_observation(&o, &[SymptomTag::Hemorrhage]);
        let ranks: Vec<_> = f.iter().map(|x| x.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(ranks, sorted);
        assert_eq!(f[0].kind, FindingKind::Hemorrhage);
    }
}

use crate::models::{Observation, Priority};

use super::messages::MessageTemplates;
use super::reference::{RANGE_BLOOD_PRESSURE, SCORE_HYPERTENSIVE_TREND};
use super::types::{Finding, FindingKind, TrendOutcome, TriggerField};

/// Observations inspected, newest last.
pub const HISTORY_WINDOW: usize = 5;
/// Blood-pressure readings required before a trend is judged.
pub const MIN_TREND_POINTS: usize = 3;

/// Analyze a patient's history (oldest → newest) with the default window.
pub fn analyze_trend(history: &[Observation]) -> TrendOutcome {
    analyze_trend_with(history, HISTORY_WINDOW, MIN_TREND_POINTS)
}

/// Sustained hypertensive trend: systolic never decreases across consecutive
/// readings in the last `window` observations. Independent of the absolute
/// value, so it can fire while the latest reading is still normal.
///
/// Observations without a usable systolic value are not data points.
pub fn analyze_trend_with(history: &[Observation], window: usize, min_points: usize) -> TrendOutcome {
    let start = history.len().saturating_sub(window);
    let recent = &history[start..];

    let readings: Vec<f64> = recent
        .iter()
        .filter_map(|o| {
            let systolic = o.vitals.systolic?;
            if systolic.is_finite()
                && (RANGE_BLOOD_PRESSURE.0..=RANGE_BLOOD_PRESSURE.1).contains(&systolic)
            {
                Some(systolic)
            } else {
                tracing::error!(
                    observation_id = %o.id,
                    rule = "hypertensive_trend",
                    "Implausible systolic reading excluded from trend"
                );
                None
            }
        })
        .collect();

    if readings.len() < min_points.max(2) {
        return TrendOutcome::InsufficientData {
            points: readings.len(),
        };
    }

    let non_decreasing = readings.windows(2).all(|pair| pair[1] >= pair[0]);
    if !non_decreasing {
        return TrendOutcome::Stable;
    }

    TrendOutcome::Detected(Finding::new(
        FindingKind::SustainedHypertensiveTrend,
        Priority::High,
        SCORE_HYPERTENSIVE_TREND,
        MessageTemplates::hypertensive_trend(&readings),
        vec![TriggerField::Systolic, TriggerField::History],
    ))
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::intelligence::dedup::DedupPolicy;
use crate::models::Priority;

/// Application-level constants
pub const APP_NAME: &str = "Gestantes";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const ENV_PREFIX: &str = "GESTANTES_";

/// Application data directory: `$GESTANTES_DATA_DIR`, else the platform data
/// directory, else the working directory.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(format!("{ENV_PREFIX}DATA_DIR")) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// SQLite database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("gestantes.db")
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "gestantes=info,gestantes_lib=info"
}

// ═══════════════════════════════════════════════════════════
// Alerting configuration
// ═══════════════════════════════════════════════════════════

/// Tunables of the alerting pipeline. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Visit-path dedup cool-down.
    pub cooldown_secs: i64,
    /// Visit-path occurrences allowed per cool-down.
    pub occurrence_cap: u32,
    /// Observations fetched for trend analysis.
    pub history_window: usize,
    pub trend_min_points: usize,
    pub overdue_visit_days: i64,
    pub due_date_warning_days: i64,
    /// Sweep dedup window; one tick per window creates at most one alert per finding.
    pub sweep_cooldown_secs: i64,
    pub sweep_cap: u32,
    pub notify_throttle_secs: i64,
    pub notify_cap: u32,
    pub sweep_interval_secs: u64,
    /// Minimum finding score for an automatic alert, per tier.
    pub threshold_medium: u8,
    pub threshold_high: u8,
    pub threshold_critical: u8,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 5 * 60,
            occurrence_cap: 3,
            history_window: 5,
            trend_min_points: 3,
            overdue_visit_days: 30,
            due_date_warning_days: 30,
            sweep_cooldown_secs: 24 * 60 * 60,
            sweep_cap: 1,
            notify_throttle_secs: 5 * 60,
            notify_cap: 1,
            sweep_interval_secs: 60 * 60,
            threshold_medium: 40,
            threshold_high: 60,
            threshold_critical: 80,
        }
    }
}

impl AlertingConfig {
    /// Defaults overridden by `GESTANTES_*` variables (e.g. `GESTANTES_COOLDOWN_SECS`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        override_field(&mut config.cooldown_secs, "COOLDOWN_SECS", get("COOLDOWN_SECS"));
        override_field(&mut config.occurrence_cap, "OCCURRENCE_CAP", get("OCCURRENCE_CAP"));
        override_field(&mut config.history_window, "HISTORY_WINDOW", get("HISTORY_WINDOW"));
        override_field(&mut config.trend_min_points, "TREND_MIN_POINTS", get("TREND_MIN_POINTS"));
        override_field(
            &mut config.overdue_visit_days,
            "OVERDUE_VISIT_DAYS",
            get("OVERDUE_VISIT_DAYS"),
        );
        override_field(
            &mut config.due_date_warning_days,
            "DUE_DATE_WARNING_DAYS",
            get("DUE_DATE_WARNING_DAYS"),
        );
        override_field(
            &mut config.sweep_cooldown_secs,
            "SWEEP_COOLDOWN_SECS",
            get("SWEEP_COOLDOWN_SECS"),
        );
        override_field(&mut config.sweep_cap, "SWEEP_CAP", get("SWEEP_CAP"));
        override_field(
            &mut config.notify_throttle_secs,
            "NOTIFY_THROTTLE_SECS",
            get("NOTIFY_THROTTLE_SECS"),
        );
        override_field(&mut config.notify_cap, "NOTIFY_CAP", get("NOTIFY_CAP"));
        override_field(
            &mut config.sweep_interval_secs,
            "SWEEP_INTERVAL_SECS",
            get("SWEEP_INTERVAL_SECS"),
        );
        override_field(&mut config.threshold_medium, "THRESHOLD_MEDIUM", get("THRESHOLD_MEDIUM"));
        override_field(&mut config.threshold_high, "THRESHOLD_HIGH", get("THRESHOLD_HIGH"));
        override_field(
            &mut config.threshold_critical,
            "THRESHOLD_CRITICAL",
            get("THRESHOLD_CRITICAL"),
        );
        config
    }

    pub fn orchestrator_policy(&self) -> DedupPolicy {
        DedupPolicy::new(chrono::Duration::seconds(self.cooldown_secs), self.occurrence_cap)
    }

    pub fn sweep_policy(&self) -> DedupPolicy {
        DedupPolicy::new(chrono::Duration::seconds(self.sweep_cooldown_secs), self.sweep_cap)
    }

    pub fn notify_policy(&self) -> DedupPolicy {
        DedupPolicy::new(chrono::Duration::seconds(self.notify_throttle_secs), self.notify_cap)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// Minimum score for a finding of `tier` to become an alert. Low never alerts.
    pub fn threshold_for(&self, tier: Priority) -> Option<u8> {
        match tier {
            Priority::Low => None,
            Priority::Medium => Some(self.threshold_medium),
            Priority::High => Some(self.threshold_high),
            Priority::Critical => Some(self.threshold_critical),
        }
    }
}

fn override_field<T: std::str::FromStr>(field: &mut T, name: &str, raw: Option<String>) {
    let Some(raw) = raw else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *field = value,
        Err(_) => tracing::warn!(variable = name, "Unparsable configuration value ignored"),
    }
}

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::types::{AlertingError, FindingKind};

/// Cool-down and occurrence cap for one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    pub cooldown: Duration,
    /// Occurrences allowed per window; later ones are over the cap.
    pub cap: u32,
}

impl DedupPolicy {
    pub fn new(cooldown: Duration, cap: u32) -> Self {
        Self {
            cooldown,
            cap: cap.max(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub component: &'static str,
    pub action: &'static str,
    pub kind: FindingKind,
    pub patient_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    opened_at: DateTime<Utc>,
    count: u32,
    cooldown: Duration,
}

/// Outcome of recording one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// No live window for the key; a new one was opened.
    First,
    /// Inside a live window, still within the cap.
    Repeat { occurrence: u32 },
    /// Inside a live window and past the cap.
    OverCap { occurrence: u32 },
}

impl DedupDecision {
    /// The key already had a live window when this occurrence arrived.
    pub fn in_window(&self) -> bool {
        !matches!(self, Self::First)
    }

    pub fn over_cap(&self) -> bool {
        matches!(self, Self::OverCap { .. })
    }

    pub fn occurrence(&self) -> u32 {
        match self {
            Self::First => 1,
            Self::Repeat { occurrence } | Self::OverCap { occurrence } => *occurrence,
        }
    }
}

/// In-process cool-down map shared by the visit path, the sweep and the
/// notification throttle. Not persisted: a restart starts empty.
///
/// The lock covers map mutation only and is never held across I/O.
pub struct DedupWindow {
    entries: Mutex<HashMap<DedupKey, WindowEntry>>,
}

impl DedupWindow {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record one occurrence of `key` at `now` under `policy`.
    ///
    /// Windows are fixed: they open at the first occurrence and expire after
    /// the cool-down, at which point the next occurrence opens a fresh one.
    pub fn record_at(
        &self,
        key: DedupKey,
        policy: DedupPolicy,
        now: DateTime<Utc>,
    ) -> Result<DedupDecision, AlertingError> {
        let mut entries = self.entries.lock().map_err(|_| AlertingError::LockFailed)?;

        let decision = match entries.get_mut(&key) {
            Some(entry) if now - entry.opened_at < entry.cooldown => {
                entry.count = entry.count.saturating_add(1);
                if entry.count > policy.cap {
                    DedupDecision::OverCap {
                        occurrence: entry.count,
                    }
                } else {
                    DedupDecision::Repeat {
                        occurrence: entry.count,
                    }
                }
            }
            _ => {
                entries.insert(
                    key,
                    WindowEntry {
                        opened_at: now,
                        count: 1,
                        cooldown: policy.cooldown,
                    },
                );
                DedupDecision::First
            }
        };

        Self::evict_locked(&mut entries, now);
        Ok(decision)
    }

    /// Drop entries older than twice their cool-down. Returns how many were removed.
    pub fn evict_stale(&self, now: DateTime<Utc>) -> Result<usize, AlertingError> {
        let mut entries = self.entries.lock().map_err(|_| AlertingError::LockFailed)?;
        Ok(Self::evict_locked(&mut entries, now))
    }

    fn evict_locked(entries: &mut HashMap<DedupKey, WindowEntry>, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|_, e| now - e.opened_at <= e.cooldown * 2);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn key(kind: FindingKind, patient_id: Uuid) -> DedupKey {
        DedupKey {
            component: "alert_orchestrator",
            action: "create_automatic_alert",
            kind,
            patient_id,
        }
    }

    fn policy() -> DedupPolicy {
        DedupPolicy::new(Duration::minutes(5), 3)
    }

    #[test]
    fn cap_allows_three_then_suppresses() {
        let window = DedupWindow::new();
        let k = key(FindingKind::Hypertension, Uuid::new_v4());
        let t0 = Utc::now();

        assert_eq!(window.record_at(k, policy(), t0).unwrap(), DedupDecision::First);
        assert_eq!(
            window.record_at(k, policy(), t0 + Duration::seconds(30)).unwrap(),
            DedupDecision::Repeat { occurrence: 2 }
        );
        assert_eq!(
            window.record_at(k, policy(), t0 + Duration::seconds(60)).unwrap(),
            DedupDecision::Repeat { occurrence: 3 }
        );
        let fourth = window.record_at(k, policy(), t0 + Duration::seconds(90)).unwrap();
        assert!(fourth.over_cap());
        assert_eq!(fourth.occurrence(), 4);
    }

    #[test]
    fn expired_window_resets() {
        let window = DedupWindow::new();
        let k = key(FindingKind::Hypertension, Uuid::new_v4());
        let t0 = Utc::now();
        for i in 0..5 {
            window.record_at(k, policy(), t0 + Duration::seconds(i)).unwrap();
        }
        let later = t0 + Duration::minutes(5);
        assert_eq!(window.record_at(k, policy(), later).unwrap(), DedupDecision::First);
    }

    #[test]
    fn keys_are_scoped_per_patient_and_kind() {
        let window = DedupWindow::new();
        let patient = Uuid::new_v4();
        let t0 = Utc::now();
        let single = DedupPolicy::new(Duration::minutes(5), 1);

        window.record_at(key(FindingKind::Fever, patient), single, t0).unwrap();
        assert!(window
            .record_at(key(FindingKind::Fever, patient), single, t0)
            .unwrap()
            .over_cap());
        assert_eq!(
            window.record_at(key(FindingKind::Fever, Uuid::new_v4()), single, t0).unwrap(),
            DedupDecision::First
        );
        assert_eq!(
            window.record_at(key(FindingKind::HighFever, patient), single, t0).unwrap(),
            DedupDecision::First
        );
    }

    #[test]
    fn stale_entries_are_evicted_after_twice_the_cooldown() {
        let window = DedupWindow::new();
        let t0 = Utc::now();
        window
            .record_at(key(FindingKind::Fever, Uuid::new_v4()), policy(), t0)
            .unwrap();
        assert_eq!(window.evict_stale(t0 + Duration::minutes(10)).unwrap(), 0);
        assert_eq!(window.len(), 1);
        assert_eq!(window.evict_stale(t0 + Duration::minutes(11)).unwrap(), 1);
        assert!(window.is_empty());
    }

    #[test]
    fn record_evicts_unrelated_stale_entries() {
        let window = DedupWindow::new();
        let t0 = Utc::now();
        window
            .record_at(key(FindingKind::Fever, Uuid::new_v4()), policy(), t0)
            .unwrap();
        window
            .record_at(
                key(FindingKind::Fever, Uuid::new_v4()),
                policy(),
                t0 + Duration::hours(1),
            )
            .unwrap();
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn concurrent_writers_count_every_occurrence() {
        let window = Arc::new(DedupWindow::new());
        let k = key(FindingKind::SevereHypertension, Uuid::new_v4());
        let now = Utc::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let w = Arc::clone(&window);
                std::thread::spawn(move || w.record_at(k, policy(), now).unwrap())
            })
            .collect();
        let decisions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(decisions.iter().filter(|d| !d.in_window()).count(), 1);
        assert_eq!(decisions.iter().filter(|d| d.over_cap()).count(), 5);
    }
}

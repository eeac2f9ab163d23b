//! Periodic population sweep.
//!
//! Re-runs the clinical rules on each active patient's latest observation and
//! adds administrative checks (assignment gaps, overdue visits, due date).
//! Candidates go through the same dedup and persistence path as the visit
//! path, under the sweep's own 24 h window, so a re-run tick is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{AlertOrigin, AuditEvent, AuditSeverity, NewAlert, PatientRecord, Priority};

use super::detection::evaluate_with_prior;
use super::engine::{alertable, AlertOrchestrator, DedupScope, Materialized};
use super::messages::MessageTemplates;
use super::score::aggregate;
use super::trend::analyze_trend_with;
use super::types::{AlertingError, Finding, FindingKind, TriggerField};

pub const COMPONENT: &str = "periodic_sweep";
const ACTION: &str = "sweep_alert";

const SCORE_ASSIGNMENT_GAP: u8 = 50;
const SCORE_OVERDUE_VISIT: u8 = 50;
const SCORE_DUE_DATE_APPROACHING: u8 = 75;
const SCORE_DUE_DATE_PASSED: u8 = 90;

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY: Duration = Duration::from_secs(1);

/// Summary of one sweep tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub patients_evaluated: usize,
    pub patients_failed: usize,
    pub alerts_generated: usize,
    /// Candidates whose persistence failed; their patients may still count
    /// as evaluated when other alerts were written.
    pub alerts_failed: usize,
}

/// Outcome for one patient: rows written and candidates that failed.
#[derive(Debug, Default)]
struct PatientOutcome {
    created: usize,
    failed: usize,
}

pub struct PeriodicSweep {
    engine: Arc<AlertOrchestrator>,
}

impl PeriodicSweep {
    pub fn new(engine: Arc<AlertOrchestrator>) -> Self {
        Self { engine }
    }

    pub fn run_sweep(&self) -> Result<SweepReport, AlertingError> {
        self.run_sweep_at(Utc::now())
    }

    /// One pass over every active patient. Only listing the population can
    /// fail the sweep; per-patient errors are logged and counted.
    pub fn run_sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, AlertingError> {
        let ids = self.engine.patients.active_patient_ids()?;
        let mut report = SweepReport::default();

        for patient_id in ids {
            match self.sweep_patient(patient_id, now) {
                Ok(outcome) => {
                    report.alerts_generated += outcome.created;
                    report.alerts_failed += outcome.failed;
                    if outcome.failed > 0 && outcome.created == 0 {
                        report.patients_failed += 1;
                    } else {
                        report.patients_evaluated += 1;
                    }
                }
                Err(e) => {
                    report.patients_failed += 1;
                    tracing::error!(patient_id = %patient_id, error = %e, "Sweep failed for patient, continuing");
                }
            }
        }

        match self.engine.window.evict_stale(now) {
            Ok(evicted) if evicted > 0 => tracing::debug!(evicted, "Dedup window entries evicted"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Dedup window eviction skipped"),
        }

        tracing::info!(
            evaluated = report.patients_evaluated,
            failed = report.patients_failed,
            alerts = report.alerts_generated,
            alerts_failed = report.alerts_failed,
            "Sweep complete"
        );
        self.engine.audit.record(
            AuditEvent::new(now, AuditSeverity::Info, COMPONENT, "sweep_completed").detail(format!(
                "evaluated={} failed={} alerts={} alerts_failed={}",
                report.patients_evaluated,
                report.patients_failed,
                report.alerts_generated,
                report.alerts_failed,
            )),
        );
        Ok(report)
    }

    /// Loading the record is the only fatal step; each candidate after that
    /// succeeds or fails on its own.
    fn sweep_patient(&self, patient_id: Uuid, now: DateTime<Utc>) -> Result<PatientOutcome, AlertingError> {
        let config = &self.engine.config;
        let record = self
            .engine
            .patients
            .patient_with_history(patient_id, config.history_window)?
            .ok_or(AlertingError::PatientNotFound(patient_id))?;

        let clinical = clinical_findings(&record, config.history_window, config.trend_min_points);
        let latest = record.observations.last();
        let profile = aggregate(&clinical, latest, &[], &record, now.date_naive());

        let mut findings = clinical;
        findings.extend(administrative_findings(
            &record,
            now,
            config.overdue_visit_days,
            config.due_date_warning_days,
        ));
        if profile.tier >= Priority::High {
            findings.push(Finding::new(
                FindingKind::ElevatedRiskProfile,
                profile.tier,
                u8::try_from(profile.score.min(100)).unwrap_or(100),
                MessageTemplates::elevated_risk(
                    profile.score,
                    profile.factors.first().map(|f| f.description.as_str()),
                ),
                vec![TriggerField::CompositeScore],
            ));
        }

        let scope = DedupScope {
            component: COMPONENT,
            action: ACTION,
            policy: config.sweep_policy(),
        };

        let mut outcome = PatientOutcome::default();
        for finding in alertable(&findings, config) {
            match self.sweep_finding(&record, finding, profile.score, scope, now) {
                Ok(true) => outcome.created += 1,
                Ok(false) => {}
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(
                        patient_id = %patient_id,
                        kind = finding.kind.as_str(),
                        error = %e,
                        "Sweep alert failed, continuing with the rest"
                    );
                }
            }
        }
        Ok(outcome)
    }

    /// `Ok(true)` when a row was written.
    fn sweep_finding(
        &self,
        record: &PatientRecord,
        finding: &Finding,
        risk_score: u32,
        scope: DedupScope,
        now: DateTime<Utc>,
    ) -> Result<bool, AlertingError> {
        let patient_id = record.patient.id;
        // An open alert of the same kind already covers this finding.
        if self
            .engine
            .alerts
            .pending_alert_for(patient_id, finding.kind)?
            .is_some()
        {
            return Ok(false);
        }
        let candidate = NewAlert {
            patient_id,
            caregiver_id: record.caregiver_id(),
            alert_type: finding.kind,
            priority: finding.priority,
            message: finding.message.clone(),
            symptoms: finding.symptoms(),
            risk_score,
            origin: AlertOrigin::Automatic,
            created_by: None,
            created_at: now,
            location: None,
        };
        let materialized = self
            .engine
            .materialize(candidate, scope, record.clinician_id(), now)?;
        Ok(matches!(materialized, Materialized::Created(_)))
    }
}

/// Rule and trend findings for the latest observation on record.
fn clinical_findings(record: &PatientRecord, window: usize, min_points: usize) -> Vec<Finding> {
    let Some((latest, earlier)) = record.observations.split_last() else {
        return Vec::new();
    };
    let mut findings = evaluate_with_prior(latest, earlier.last(), &[]);
    if let Some(trend) = analyze_trend_with(&record.observations, window, min_points).finding() {
        findings.push(trend.clone());
        findings.sort_by(|a, b| b.rank().cmp(&a.rank()));
    }
    findings
}

/// Checks that depend on assignment and calendar, not on measurements.
pub fn administrative_findings(
    record: &PatientRecord,
    now: DateTime<Utc>,
    overdue_visit_days: i64,
    due_date_warning_days: i64,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    if record.caregiver_id().is_none() {
        findings.push(Finding::new(
            FindingKind::NoCaregiverAssigned,
            Priority::Medium,
            SCORE_ASSIGNMENT_GAP,
            MessageTemplates::no_caregiver(),
            vec![TriggerField::Assignment],
        ));
    }
    if record.clinician_id().is_none() {
        findings.push(Finding::new(
            FindingKind::NoClinicianAssigned,
            Priority::Medium,
            SCORE_ASSIGNMENT_GAP,
            MessageTemplates::no_clinician(),
            vec![TriggerField::Assignment],
        ));
    }

    match record.last_visit_at() {
        Some(last) => {
            let days = (now - last).num_days();
            if days > overdue_visit_days {
                findings.push(Finding::new(
                    FindingKind::OverdueVisit,
                    Priority::Medium,
                    SCORE_OVERDUE_VISIT,
                    MessageTemplates::overdue_visit(days),
                    vec![TriggerField::LastVisit],
                ));
            }
        }
        None => findings.push(Finding::new(
            FindingKind::OverdueVisit,
            Priority::Medium,
            SCORE_OVERDUE_VISIT,
            MessageTemplates::no_visits(),
            vec![TriggerField::LastVisit],
        )),
    }

    if let Some(due) = record.patient.due_date {
        let days = (due - now.date_naive()).num_days();
        if days < 0 {
            findings.push(Finding::new(
                FindingKind::DueDatePassed,
                Priority::Critical,
                SCORE_DUE_DATE_PASSED,
                MessageTemplates::due_date_passed(-days),
                vec![TriggerField::DueDate],
            ));
        } else if days <= due_date_warning_days {
            findings.push(Finding::new(
                FindingKind::DueDateApproaching,
                Priority::High,
                SCORE_DUE_DATE_APPROACHING,
                MessageTemplates::due_date_approaching(days),
                vec![TriggerField::DueDate],
            ));
        }
    }

    findings
}

/// Handle for the background sweep thread. Dropping it stops and joins the thread.
pub struct SweepHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SweepHandle {
    /// Request shutdown. A sweep already running completes first.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Run a sweep every `interval` on a dedicated thread, one at a time.
pub fn start_sweep_scheduler(sweep: Arc<PeriodicSweep>, interval: Duration) -> SweepHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!(interval_secs = interval.as_secs(), "Sweep scheduler started");
        scheduler_loop(&sweep, interval, &flag);
    });

    SweepHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn scheduler_loop(sweep: &PeriodicSweep, interval: Duration, shutdown: &AtomicBool) {
    loop {
        let mut slept = Duration::ZERO;
        while slept < interval {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Sweep scheduler shutting down");
                return;
            }
            let step = SLEEP_GRANULARITY.min(interval - slept);
            std::thread::sleep(step);
            slept += step;
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        if let Err(e) = sweep.run_sweep() {
            tracing::error!(error = %e, "Sweep tick failed");
        }
    }
    tracing::info!("Sweep scheduler shutting down");
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, NaiveDate};

    use super::*;
    use crate::config::AlertingConfig;
    use crate::db::store::SqliteStore;
    use crate::db::DatabaseError;
    use crate::intelligence::dedup::DedupWindow;
    use crate::intelligence::traits::AlertRepository;
    use crate::models::{Alert, Gestante, Observation, Role, User};
    use crate::notify::{AlertNotifier, DispatchError, DispatchReport};

    struct NullNotifier;

    impl AlertNotifier for NullNotifier {
        fn notify(
            &self,
            alert: &crate::models::Alert,
            _clinician_id: Option<Uuid>,
            _now: DateTime<Utc>,
        ) -> Result<DispatchReport, DispatchError> {
            Ok(DispatchReport {
                alert_id: alert.id,
                throttled: false,
                deliveries: vec![],
            })
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-03-10T12:00:00Z".parse().unwrap()
    }

    /// Rejects inserts of one kind, delegates everything else.
    struct RejectingAlerts {
        inner: Arc<SqliteStore>,
        reject: FindingKind,
    }

    impl AlertRepository for RejectingAlerts {
        fn persist_alert(&self, alert: NewAlert) -> Result<Alert, DatabaseError> {
            if alert.alert_type == self.reject {
                return Err(DatabaseError::ConstraintViolation("disk I/O error".into()));
            }
            self.inner.persist_alert(alert)
        }

        fn get_alert(&self, alert_id: Uuid) -> Result<Option<Alert>, DatabaseError> {
            self.inner.get_alert(alert_id)
        }

        fn mark_resolved(
            &self,
            alert_id: Uuid,
            actor_id: Uuid,
            at: DateTime<Utc>,
        ) -> Result<Alert, DatabaseError> {
            self.inner.mark_resolved(alert_id, actor_id, at)
        }

        fn pending_alert_for(
            &self,
            patient_id: Uuid,
            kind: FindingKind,
        ) -> Result<Option<Alert>, DatabaseError> {
            self.inner.pending_alert_for(patient_id, kind)
        }

        fn pending_alerts_for_patient(&self, patient_id: Uuid) -> Result<Vec<Alert>, DatabaseError> {
            self.inner.pending_alerts_for_patient(patient_id)
        }
    }

    fn sweep_for(store: Arc<SqliteStore>) -> PeriodicSweep {
        sweep_with(store.clone(), store)
    }

    fn sweep_with(store: Arc<SqliteStore>, alerts: Arc<dyn AlertRepository>) -> PeriodicSweep {
        let engine = AlertOrchestrator::new(
            store.clone(),
            alerts,
            store.clone(),
            store.clone(),
            Arc::new(NullNotifier),
            Arc::new(DedupWindow::new()),
            AlertingConfig::default(),
        );
        PeriodicSweep::new(Arc::new(engine))
    }

    fn staffed_patient(store: &SqliteStore) -> Gestante {
        let madrina = User {
            id: Uuid::new_v4(),
            name: "Madrina".into(),
            role: Role::Madrina,
            municipality_id: None,
            active: true,
        };
        let clinician = User {
            id: Uuid::new_v4(),
            name: "Clinician".into(),
            role: Role::Clinician,
            municipality_id: None,
            active: true,
        };
        store.insert_user(&madrina).unwrap();
        store.insert_user(&clinician).unwrap();
        let patient = Gestante {
            id: Uuid::new_v4(),
            full_name: "Paciente".into(),
            birth_date: NaiveDate::from_ymd_opt(1998, 5, 1),
            parity: Some(1),
            known_conditions: vec![],
            due_date: NaiveDate::from_ymd_opt(2026, 7, 1),
            madrina_id: Some(madrina.id),
            clinician_id: Some(clinician.id),
            facility_id: Some(Uuid::new_v4()),
            municipality_id: None,
            active: true,
        };
        store.insert_patient(&patient).unwrap();
        store
            .insert_observation(
                &Observation::new(patient.id, now() - ChronoDuration::days(7))
                    .with_blood_pressure(112.0, 72.0),
            )
            .unwrap();
        patient
    }

    fn bare_patient(due_date: Option<NaiveDate>) -> Gestante {
        Gestante {
            id: Uuid::new_v4(),
            full_name: "Sin asignar".into(),
            birth_date: None,
            parity: None,
            known_conditions: vec![],
            due_date,
            madrina_id: None,
            clinician_id: None,
            facility_id: None,
            municipality_id: None,
            active: true,
        }
    }

    #[test]
    fn healthy_staffed_patient_generates_nothing() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        staffed_patient(&store);
        let report = sweep_for(store).run_sweep_at(now()).unwrap();
        assert_eq!(
            report,
            SweepReport {
                patients_evaluated: 1,
                patients_failed: 0,
                alerts_generated: 0,
                alerts_failed: 0,
            }
        );
    }

    #[test]
    fn administrative_gaps_raise_alerts() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let patient = bare_patient(NaiveDate::from_ymd_opt(2026, 3, 1));
        store.insert_patient(&patient).unwrap();

        let report = sweep_for(store.clone()).run_sweep_at(now()).unwrap();
        let kinds: Vec<FindingKind> = store
            .pending_alerts_for_patient(patient.id)
            .unwrap()
            .iter()
            .map(|a| a.alert_type)
            .collect();

        assert!(kinds.contains(&FindingKind::NoCaregiverAssigned));
        assert!(kinds.contains(&FindingKind::NoClinicianAssigned));
        assert!(kinds.contains(&FindingKind::OverdueVisit));
        assert!(kinds.contains(&FindingKind::DueDatePassed));
        assert_eq!(report.alerts_generated, kinds.len());
    }

    #[test]
    fn failed_insert_does_not_hide_the_other_alerts() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let patient = bare_patient(None);
        store.insert_patient(&patient).unwrap();
        let alerts = Arc::new(RejectingAlerts {
            inner: store.clone(),
            reject: FindingKind::NoClinicianAssigned,
        });

        let report = sweep_with(store.clone(), alerts).run_sweep_at(now()).unwrap();

        let kinds: Vec<FindingKind> = store
            .pending_alerts_for_patient(patient.id)
            .unwrap()
            .iter()
            .map(|a| a.alert_type)
            .collect();
        assert!(kinds.contains(&FindingKind::NoCaregiverAssigned));
        assert!(kinds.contains(&FindingKind::OverdueVisit));
        assert!(!kinds.contains(&FindingKind::NoClinicianAssigned));
        assert_eq!(report.alerts_generated, kinds.len());
        assert_eq!(report.alerts_failed, 1);
        assert_eq!(report.patients_evaluated, 1);
        assert_eq!(report.patients_failed, 0);
    }

    #[test]
    fn rerun_tick_is_idempotent() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.insert_patient(&bare_patient(None)).unwrap();
        let sweep = sweep_for(store);

        let first = sweep.run_sweep_at(now()).unwrap();
        let second = sweep
            .run_sweep_at(now() + ChronoDuration::minutes(10))
            .unwrap();
        assert!(first.alerts_generated > 0);
        assert_eq!(second.alerts_generated, 0);
        assert_eq!(second.patients_evaluated, 1);
    }

    #[test]
    fn one_malformed_record_does_not_abort_the_sweep() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mut ids = Vec::new();
        for _ in 0..100 {
            let p = staffed_patient(&store);
            ids.push(p.id);
        }
        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE gestantes SET due_date = 'not-a-date' WHERE id = ?1",
                    rusqlite::params![ids[42].to_string()],
                )
                .map_err(Into::into)
            })
            .unwrap();

        let report = sweep_for(store).run_sweep_at(now()).unwrap();
        assert_eq!(report.patients_evaluated, 99);
        assert_eq!(report.patients_failed, 1);
    }

    #[test]
    fn due_date_windows() {
        let mut record = PatientRecord {
            patient: bare_patient(None),
            observations: vec![Observation::new(Uuid::new_v4(), now() - ChronoDuration::days(3))],
            total_observations: 1,
        };
        record.patient.madrina_id = Some(Uuid::new_v4());
        record.patient.clinician_id = Some(Uuid::new_v4());

        record.patient.due_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        let f = administrative_findings(&record, now(), 30, 30);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].kind, FindingKind::DueDateApproaching);
        assert_eq!(f[0].priority, Priority::High);

        record.patient.due_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        assert!(administrative_findings(&record, now(), 30, 30).is_empty());

        record.patient.due_date = NaiveDate::from_ymd_opt(2026, 3, 9);
        let f = administrative_findings(&record, now(), 30, 30);
        assert_eq!(f[0].kind, FindingKind::DueDatePassed);
        assert_eq!(f[0].priority, Priority::Critical);
    }

    #[test]
    fn overdue_visit_after_threshold() {
        let mut record = PatientRecord {
            patient: bare_patient(None),
            observations: vec![Observation::new(Uuid::new_v4(), now() - ChronoDuration::days(31))],
            total_observations: 1,
        };
        record.patient.madrina_id = Some(Uuid::new_v4());
        record.patient.clinician_id = Some(Uuid::new_v4());
        let f = administrative_findings(&record, now(), 30, 30);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].kind, FindingKind::OverdueVisit);

        record.observations[0].recorded_at = now() - ChronoDuration::days(30);
        assert!(administrative_findings(&record, now(), 30, 30).is_empty());
    }

    #[test]
    fn scheduler_stops_on_drop() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let handle = start_sweep_scheduler(Arc::new(sweep_for(store)), Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(60));
        drop(handle);
    }
}

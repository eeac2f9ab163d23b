use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::authorization::AccessPolicy;
use crate::config::AlertingConfig;
use crate::models::{
    Alert, AlertOrigin, AuditEvent, AuditSeverity, Coordinates, NewAlert, Observation,
    PatientRecord, Priority, SymptomTag,
};
use crate::notify::AlertNotifier;

use super::dedup::{DedupKey, DedupPolicy, DedupWindow};
use super::detection::{evaluate_observation, evaluate_with_prior};
use super::emergency::EmergencyProtocol;
use super::score::aggregate;
use super::traits::{AlertRepository, AuditSink, PatientDirectory};
use super::trend::analyze_trend_with;
use super::types::{AlertingError, Finding, FindingKind, RiskProfile, TriggerField};

pub const COMPONENT: &str = "alert_orchestrator";
const ACTION_AUTOMATIC: &str = "create_automatic_alert";

/// Operator-raised alert outside the rule set.
#[derive(Debug, Clone)]
pub struct ManualAlertRequest {
    pub patient_id: Uuid,
    pub priority: Priority,
    pub message: String,
    pub symptoms: Vec<SymptomTag>,
}

/// Entry points other subsystems call.
pub trait AlertingEngine: Send + Sync {
    /// Pure rule evaluation of one snapshot.
    fn evaluate_observation(&self, observation: &Observation, symptoms: &[SymptomTag]) -> Vec<Finding>;

    /// Evaluate a visit and persist the alerts it warrants.
    fn create_automatic_alerts_from_observation(
        &self,
        actor_id: Uuid,
        observation: &Observation,
        symptoms: &[SymptomTag],
    ) -> Result<Vec<Alert>, AlertingError>;

    /// SOS: always a critical, located alert.
    fn trigger_emergency_alert(
        &self,
        actor_id: Uuid,
        patient_id: Uuid,
        location: Coordinates,
    ) -> Result<Alert, AlertingError>;

    fn create_manual_alert(
        &self,
        actor_id: Uuid,
        request: ManualAlertRequest,
    ) -> Result<Alert, AlertingError>;

    /// `pending → resolved`. Resolving twice returns the stored alert unchanged.
    fn resolve_alert(&self, alert_id: Uuid, actor_id: Uuid) -> Result<Alert, AlertingError>;

    fn pending_alerts(&self, actor_id: Uuid, patient_id: Uuid) -> Result<Vec<Alert>, AlertingError>;
}

/// Where a materialization request comes from; selects the dedup policy.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DedupScope {
    pub component: &'static str,
    pub action: &'static str,
    pub policy: DedupPolicy,
}

/// Result of pushing one candidate alert through dedup and persistence.
#[derive(Debug, Clone)]
pub(crate) enum Materialized {
    Created(Alert),
    Suppressed,
}

/// Default implementation of the alerting engine.
/// Owns the shared dedup window; persistence, authorization, audit and
/// delivery are collaborators.
pub struct AlertOrchestrator {
    pub(crate) patients: Arc<dyn PatientDirectory>,
    pub(crate) alerts: Arc<dyn AlertRepository>,
    access: Arc<dyn AccessPolicy>,
    pub(crate) audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn AlertNotifier>,
    pub(crate) window: Arc<DedupWindow>,
    pub(crate) config: AlertingConfig,
}

impl AlertOrchestrator {
    pub fn new(
        patients: Arc<dyn PatientDirectory>,
        alerts: Arc<dyn AlertRepository>,
        access: Arc<dyn AccessPolicy>,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn AlertNotifier>,
        window: Arc<DedupWindow>,
        config: AlertingConfig,
    ) -> Self {
        Self {
            patients,
            alerts,
            access,
            audit,
            notifier,
            window,
            config,
        }
    }

    pub fn config(&self) -> &AlertingConfig {
        &self.config
    }

    /// Findings and risk profile for a visit, without persisting anything.
    pub fn assess(
        &self,
        record: &PatientRecord,
        observation: &Observation,
        symptoms: &[SymptomTag],
        now: DateTime<Utc>,
    ) -> (Vec<Finding>, RiskProfile) {
        let prior = record
            .observations
            .iter()
            .filter(|o| o.id != observation.id && o.recorded_at <= observation.recorded_at)
            .max_by_key(|o| o.recorded_at);

        let mut findings = evaluate_with_prior(observation, prior, symptoms);

        let mut history: Vec<Observation> = record
            .observations
            .iter()
            .filter(|o| o.id != observation.id && o.recorded_at <= observation.recorded_at)
            .cloned()
            .collect();
        history.sort_by_key(|o| o.recorded_at);
        history.push(observation.clone());

        let trend = analyze_trend_with(
            &history,
            self.config.history_window,
            self.config.trend_min_points,
        );
        if let Some(f) = trend.finding() {
            findings.push(f.clone());
            findings.sort_by(|a, b| b.rank().cmp(&a.rank()));
        }

        let profile = aggregate(&findings, Some(observation), symptoms, record, now.date_naive());
        (findings, profile)
    }

    pub fn create_automatic_alerts_at(
        &self,
        actor_id: Uuid,
        observation: &Observation,
        symptoms: &[SymptomTag],
        now: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AlertingError> {
        let record = self.authorized_record(actor_id, observation.patient_id, now)?;
        let (findings, profile) = self.assess(&record, observation, symptoms, now);

        let scope = DedupScope {
            component: COMPONENT,
            action: ACTION_AUTOMATIC,
            policy: self.config.orchestrator_policy(),
        };

        let mut created = Vec::new();
        let mut failed = Vec::new();
        for finding in alertable(&findings, &self.config) {
            let candidate = NewAlert {
                patient_id: record.patient.id,
                caregiver_id: record.caregiver_id(),
                alert_type: finding.kind,
                priority: finding.priority,
                message: finding.message.clone(),
                symptoms: finding.symptoms(),
                risk_score: profile.score,
                origin: AlertOrigin::Automatic,
                created_by: Some(actor_id),
                created_at: now,
                location: None,
            };
            match self.materialize(candidate, scope, record.clinician_id(), now) {
                Ok(Materialized::Created(alert)) => created.push(alert),
                Ok(Materialized::Suppressed) => {}
                Err(e) => {
                    tracing::error!(
                        patient_id = %record.patient.id,
                        kind = finding.kind.as_str(),
                        error = %e,
                        "Alert candidate failed, continuing with the rest"
                    );
                    failed.push(e);
                }
            }
        }

        tracing::info!(
            observation_id = %observation.id,
            patient_id = %record.patient.id,
            findings = findings.len(),
            created = created.len(),
            failed = failed.len(),
            risk_score = profile.score,
            tier = profile.tier.label(),
            "Observation alerting complete"
        );
        // Rows already written are returned; an error surfaces only when
        // nothing could be written at all.
        match failed.into_iter().next() {
            Some(e) if created.is_empty() => Err(e),
            _ => Ok(created),
        }
    }

    pub fn trigger_emergency_alert_at(
        &self,
        actor_id: Uuid,
        patient_id: Uuid,
        location: Coordinates,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertingError> {
        let record = self.authorized_record(actor_id, patient_id, now)?;
        let candidate = EmergencyProtocol::compose_sos(&record, location, actor_id, now);

        let alert = self.alerts.persist_alert(candidate)?;
        tracing::warn!(alert_id = %alert.id, patient_id = %patient_id, "SOS alert raised");
        self.audit.record(
            AuditEvent::new(now, AuditSeverity::Warning, COMPONENT, "sos_triggered")
                .actor(Some(actor_id))
                .patient(patient_id)
                .alert(alert.id),
        );
        self.dispatch(&alert, record.clinician_id(), now);
        Ok(alert)
    }

    pub fn create_manual_alert_at(
        &self,
        actor_id: Uuid,
        request: ManualAlertRequest,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertingError> {
        let record = self.authorized_record(actor_id, request.patient_id, now)?;
        let message = request.message.trim();
        if message.is_empty() {
            return Err(AlertingError::Validation("message is empty".into()));
        }

        let profile = aggregate(
            &[],
            record.observations.last(),
            &request.symptoms,
            &record,
            now.date_naive(),
        );
        let alert = self.alerts.persist_alert(NewAlert {
            patient_id: record.patient.id,
            caregiver_id: record.caregiver_id(),
            alert_type: FindingKind::ManualReport,
            priority: request.priority,
            message: message.to_string(),
            symptoms: request.symptoms,
            risk_score: profile.score,
            origin: AlertOrigin::Manual,
            created_by: Some(actor_id),
            created_at: now,
            location: None,
        })?;

        self.audit.record(
            AuditEvent::new(now, AuditSeverity::Info, COMPONENT, "manual_alert_created")
                .actor(Some(actor_id))
                .patient(alert.patient_id)
                .alert(alert.id)
                .detail(format!("priority={}", alert.priority.as_str())),
        );
        self.dispatch(&alert, record.clinician_id(), now);
        Ok(alert)
    }

    pub fn resolve_alert_at(
        &self,
        alert_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertingError> {
        let alert = self
            .alerts
            .get_alert(alert_id)?
            .ok_or(AlertingError::AlertNotFound(alert_id))?;

        if !self.access.can_create_alert_for(actor_id, alert.patient_id)? {
            self.deny(actor_id, alert.patient_id, "resolve_denied", now);
            return Err(AlertingError::PermissionDenied);
        }

        if !alert.is_pending() {
            tracing::debug!(alert_id = %alert_id, "Alert already resolved");
            return Ok(alert);
        }

        let resolved = self.alerts.mark_resolved(alert_id, actor_id, now)?;
        self.audit.record(
            AuditEvent::new(now, AuditSeverity::Info, COMPONENT, "alert_resolved")
                .actor(Some(actor_id))
                .patient(resolved.patient_id)
                .alert(alert_id),
        );
        tracing::info!(alert_id = %alert_id, "Alert resolved");
        if let Err(e) = self.notifier.notify_resolved(&resolved, now) {
            tracing::warn!(alert_id = %alert_id, error = %e, "Resolution push failed");
        }
        Ok(resolved)
    }

    /// Dedup, persist, audit and dispatch one candidate.
    ///
    /// Non-critical candidates are suppressed once their key is over the cap.
    /// Critical candidates are suppressed only while their key's window is live
    /// and a pending alert of the same kind is already open for the patient;
    /// otherwise a row is always written.
    pub(crate) fn materialize(
        &self,
        candidate: NewAlert,
        scope: DedupScope,
        clinician_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Materialized, AlertingError> {
        let key = DedupKey {
            component: scope.component,
            action: scope.action,
            kind: candidate.alert_type,
            patient_id: candidate.patient_id,
        };
        let decision = match self.window.record_at(key, scope.policy, now) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(error = %e, "Dedup window unavailable, alert not deduplicated");
                None
            }
        };

        let suppress = match decision {
            None => false,
            Some(d) if candidate.priority == Priority::Critical => {
                d.in_window()
                    && self
                        .alerts
                        .pending_alert_for(candidate.patient_id, candidate.alert_type)?
                        .is_some()
            }
            Some(d) => d.over_cap(),
        };

        if suppress {
            let occurrence = decision.map(|d| d.occurrence()).unwrap_or(0);
            tracing::info!(
                component = scope.component,
                patient_id = %candidate.patient_id,
                kind = candidate.alert_type.as_str(),
                occurrence,
                "Duplicate alert suppressed"
            );
            self.audit.record(
                AuditEvent::new(now, AuditSeverity::Low, scope.component, "alert_suppressed")
                    .actor(candidate.created_by)
                    .patient(candidate.patient_id)
                    .detail(format!(
                        "kind={} priority={} occurrence={}",
                        candidate.alert_type.as_str(),
                        candidate.priority.as_str(),
                        occurrence,
                    )),
            );
            return Ok(Materialized::Suppressed);
        }

        let alert = self.alerts.persist_alert(candidate)?;
        self.audit.record(
            AuditEvent::new(now, AuditSeverity::Info, scope.component, "alert_created")
                .actor(alert.created_by)
                .patient(alert.patient_id)
                .alert(alert.id)
                .detail(format!(
                    "kind={} priority={}",
                    alert.alert_type.as_str(),
                    alert.priority.as_str(),
                )),
        );
        self.dispatch(&alert, clinician_id, now);
        Ok(Materialized::Created(alert))
    }

    /// Delivery is a separate step: failures are logged, the alert stays.
    fn dispatch(&self, alert: &Alert, clinician_id: Option<Uuid>, now: DateTime<Utc>) {
        match self.notifier.notify(alert, clinician_id, now) {
            Ok(report) if !report.reached_anyone() && !report.throttled => {
                tracing::warn!(alert_id = %alert.id, "Alert dispatched but no recipient reached");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "Alert dispatch failed, alert kept");
            }
        }
    }

    /// Authorization first, then the lookup, so a denied caller learns nothing
    /// about whether the patient exists.
    fn authorized_record(
        &self,
        actor_id: Uuid,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PatientRecord, AlertingError> {
        if !self.access.can_create_alert_for(actor_id, patient_id)? {
            self.deny(actor_id, patient_id, "create_denied", now);
            return Err(AlertingError::PermissionDenied);
        }
        self.patients
            .patient_with_history(patient_id, self.config.history_window)?
            .ok_or(AlertingError::PatientNotFound(patient_id))
    }

    fn deny(&self, actor_id: Uuid, patient_id: Uuid, action: &str, now: DateTime<Utc>) {
        tracing::warn!(actor_id = %actor_id, action, "Permission denied");
        self.audit.record(
            AuditEvent::new(now, AuditSeverity::Warning, COMPONENT, action)
                .actor(Some(actor_id))
                .patient(patient_id),
        );
    }
}

impl AlertingEngine for AlertOrchestrator {
    fn evaluate_observation(&self, observation: &Observation, symptoms: &[SymptomTag]) -> Vec<Finding> {
        evaluate_observation(observation, symptoms)
    }

    fn create_automatic_alerts_from_observation(
        &self,
        actor_id: Uuid,
        observation: &Observation,
        symptoms: &[SymptomTag],
    ) -> Result<Vec<Alert>, AlertingError> {
        self.create_automatic_alerts_at(actor_id, observation, symptoms, Utc::now())
    }

    fn trigger_emergency_alert(
        &self,
        actor_id: Uuid,
        patient_id: Uuid,
        location: Coordinates,
    ) -> Result<Alert, AlertingError> {
        self.trigger_emergency_alert_at(actor_id, patient_id, location, Utc::now())
    }

    fn create_manual_alert(
        &self,
        actor_id: Uuid,
        request: ManualAlertRequest,
    ) -> Result<Alert, AlertingError> {
        self.create_manual_alert_at(actor_id, request, Utc::now())
    }

    fn resolve_alert(&self, alert_id: Uuid, actor_id: Uuid) -> Result<Alert, AlertingError> {
        self.resolve_alert_at(alert_id, actor_id, Utc::now())
    }

    fn pending_alerts(&self, actor_id: Uuid, patient_id: Uuid) -> Result<Vec<Alert>, AlertingError> {
        if !self.access.can_access(actor_id, patient_id)? {
            self.deny(actor_id, patient_id, "read_denied", Utc::now());
            return Err(AlertingError::PermissionDenied);
        }
        Ok(self.alerts.pending_alerts_for_patient(patient_id)?)
    }
}

fn is_combination(kind: FindingKind) -> bool {
    matches!(
        kind,
        FindingKind::PossibleSeverePreeclampsia | FindingKind::PossibleMaternalSepsis
    )
}

/// Findings that clear their tier's threshold, minus symptom findings fully
/// covered by a combination finding. Combinations themselves always stay.
pub(crate) fn alertable<'a>(findings: &'a [Finding], config: &AlertingConfig) -> Vec<&'a Finding> {
    let combined: Vec<&[TriggerField]> = findings
        .iter()
        .filter(|f| is_combination(f.kind))
        .map(|f| f.triggered_by.as_slice())
        .collect();

    findings
        .iter()
        .filter(|f| {
            config
                .threshold_for(f.priority)
                .is_some_and(|t| f.score >= t)
        })
        .filter(|f| {
            if is_combination(f.kind) {
                return true;
            }
            let symptom_only = !f.triggered_by.is_empty()
                && f.triggered_by
                    .iter()
                    .all(|t| matches!(t, TriggerField::Symptom(_)));
            !(symptom_only
                && combined
                    .iter()
                    .any(|c| f.triggered_by.iter().all(|t| c.contains(t))))
        })
        .collect()
}

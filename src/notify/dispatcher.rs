//! Notification dispatcher.
//!
//! Fans a persisted alert out to the patient's madrina, the assigned clinician
//! and, for critical alerts, the administrator group. Every recipient goes
//! through every channel independently. Repeat notifications for the same
//! root cause (patient + finding kind) are throttled; SOS alerts never are.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::authorization::AccessPolicy;
use crate::db::DatabaseError;
use crate::intelligence::dedup::{DedupKey, DedupPolicy, DedupWindow};
use crate::intelligence::traits::AuditSink;
use crate::models::{Alert, AlertOrigin, AuditEvent, AuditSeverity, Priority};

use super::channels::DeliveryChannel;
use super::types::{
    ChannelKind, Delivery, DeliveryOutcome, DispatchError, DispatchReport, PushMessage, Recipient,
    SkipReason,
};

pub const COMPONENT: &str = "notification_dispatcher";
const ACTION: &str = "dispatch_alert";

/// Source of the administrator broadcast group.
pub trait RecipientDirectory: Send + Sync {
    fn admin_ids(&self) -> Result<Vec<Uuid>, DatabaseError>;
}

/// Seam between alert creation and delivery.
pub trait AlertNotifier: Send + Sync {
    /// Deliver `alert`. `clinician_id` is the patient's clinician at creation time.
    fn notify(
        &self,
        alert: &Alert,
        clinician_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport, DispatchError>;

    /// Tell the caregiver an alert was closed. Best effort, never throttled.
    fn notify_resolved(&self, alert: &Alert, now: DateTime<Utc>) -> Result<(), DispatchError> {
        let _ = (alert, now);
        Ok(())
    }
}

pub struct NotificationDispatcher {
    channels: Vec<Box<dyn DeliveryChannel>>,
    access: Arc<dyn AccessPolicy>,
    recipients: Arc<dyn RecipientDirectory>,
    audit: Arc<dyn AuditSink>,
    throttle: Arc<DedupWindow>,
    throttle_policy: DedupPolicy,
}

impl NotificationDispatcher {
    pub fn new(
        channels: Vec<Box<dyn DeliveryChannel>>,
        access: Arc<dyn AccessPolicy>,
        recipients: Arc<dyn RecipientDirectory>,
        audit: Arc<dyn AuditSink>,
        throttle: Arc<DedupWindow>,
        throttle_policy: DedupPolicy,
    ) -> Self {
        Self {
            channels,
            access,
            recipients,
            audit,
            throttle,
            throttle_policy,
        }
    }

    /// Dispatch at `now`. Never fails: channel errors become `Failed` outcomes.
    pub fn dispatch_at(
        &self,
        alert: &Alert,
        clinician_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let mut targets: Vec<Recipient> = Vec::new();
        if let Some(id) = alert.caregiver_id {
            targets.push(Recipient::Caregiver(id));
        }
        if let Some(id) = clinician_id.filter(|c| Some(*c) != alert.caregiver_id) {
            targets.push(Recipient::Clinician(id));
        }

        if self.is_throttled(alert, now) {
            let deliveries = targets
                .into_iter()
                .map(|recipient| Delivery {
                    recipient,
                    channel: ChannelKind::Realtime,
                    outcome: DeliveryOutcome::Throttled,
                })
                .collect();
            let report = DispatchReport {
                alert_id: alert.id,
                throttled: true,
                deliveries,
            };
            tracing::info!(
                alert_id = %alert.id,
                patient_id = %alert.patient_id,
                kind = alert.alert_type.as_str(),
                "Repeat notification throttled"
            );
            self.audit_report(alert, &report, now);
            return report;
        }

        let message = PushMessage::raised(alert);
        let mut deliveries = Vec::new();

        for recipient in targets {
            let user_id = recipient.user_id();
            if !self.authorized(user_id, alert.patient_id) {
                deliveries.push(Delivery {
                    recipient,
                    channel: ChannelKind::Realtime,
                    outcome: DeliveryOutcome::Skipped(SkipReason::Unauthorized),
                });
                continue;
            }
            for channel in &self.channels {
                let result = channel.deliver(user_id, &message, now);
                deliveries.push(Delivery {
                    recipient,
                    channel: channel.kind(),
                    outcome: settle(channel.kind().as_str(), alert.id, result),
                });
            }
        }

        if alert.priority == Priority::Critical {
            let admin_ids = match self.recipients.admin_ids() {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(alert_id = %alert.id, error = %e, "Admin directory lookup failed");
                    Vec::new()
                }
            };
            for channel in &self.channels {
                for (admin_id, result) in channel.deliver_to_admins(&admin_ids, &message, now) {
                    deliveries.push(Delivery {
                        recipient: Recipient::Admin(admin_id),
                        channel: channel.kind(),
                        outcome: settle(channel.kind().as_str(), alert.id, result),
                    });
                }
            }
        }

        let report = DispatchReport {
            alert_id: alert.id,
            throttled: false,
            deliveries,
        };
        tracing::info!(
            alert_id = %alert.id,
            delivered = report.count("delivered"),
            queued = report.count("queued"),
            skipped = report.count("skipped"),
            failed = report.count("failed"),
            "Alert dispatched"
        );
        self.audit_report(alert, &report, now);
        report
    }

    fn is_throttled(&self, alert: &Alert, now: DateTime<Utc>) -> bool {
        if alert.origin == AlertOrigin::Sos {
            return false;
        }
        let key = DedupKey {
            component: COMPONENT,
            action: ACTION,
            kind: alert.alert_type,
            patient_id: alert.patient_id,
        };
        match self.throttle.record_at(key, self.throttle_policy, now) {
            Ok(decision) => decision.over_cap(),
            Err(e) => {
                tracing::warn!(alert_id = %alert.id, error = %e, "Throttle unavailable, sending");
                false
            }
        }
    }

    fn authorized(&self, user_id: Uuid, patient_id: Uuid) -> bool {
        match self.access.can_access(user_id, patient_id) {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    patient_id = %patient_id,
                    error = %e,
                    "Recipient authorization failed, skipping"
                );
                false
            }
        }
    }

    fn audit_report(&self, alert: &Alert, report: &DispatchReport, now: DateTime<Utc>) {
        let severity = if report.count("failed") > 0 {
            AuditSeverity::Warning
        } else if report.throttled {
            AuditSeverity::Low
        } else {
            AuditSeverity::Info
        };
        let action = if report.throttled {
            "notification_throttled"
        } else {
            "notification_dispatched"
        };
        self.audit.record(
            AuditEvent::new(now, severity, COMPONENT, action)
                .patient(alert.patient_id)
                .alert(alert.id)
                .detail(format!(
                    "delivered={} queued={} throttled={} skipped={} failed={}",
                    report.count("delivered"),
                    report.count("queued"),
                    report.count("throttled"),
                    report.count("skipped"),
                    report.count("failed"),
                )),
        );
    }
}

/// Turn a channel result into an outcome, logging failures.
fn settle(
    channel: &'static str,
    alert_id: Uuid,
    result: Result<DeliveryOutcome, DispatchError>,
) -> DeliveryOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(alert_id = %alert_id, channel, error = %e, "Delivery failed");
            DeliveryOutcome::Failed(e.to_string())
        }
    }
}

impl AlertNotifier for NotificationDispatcher {
    fn notify(
        &self,
        alert: &Alert,
        clinician_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<DispatchReport, DispatchError> {
        Ok(self.dispatch_at(alert, clinician_id, now))
    }

    fn notify_resolved(&self, alert: &Alert, now: DateTime<Utc>) -> Result<(), DispatchError> {
        let Some(caregiver) = alert.caregiver_id else {
            return Ok(());
        };
        if !self.authorized(caregiver, alert.patient_id) {
            return Ok(());
        }
        let message = PushMessage::AlertResolved {
            alert_id: alert.id,
            patient_id: alert.patient_id,
            resolved_at: alert.resolved_at.unwrap_or(now),
        };
        for channel in &self.channels {
            settle(channel.kind().as_str(), alert.id, channel.deliver(caregiver, &message, now));
        }
        Ok(())
    }
}

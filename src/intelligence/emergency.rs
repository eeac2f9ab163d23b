use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{AlertOrigin, Coordinates, NewAlert, PatientRecord, Priority};

use super::messages::MessageTemplates;
use super::types::FindingKind;

/// Risk score recorded on SOS alerts. SOS bypasses scoring; this only keeps
/// the column comparable with automatic alerts.
pub const SOS_RISK_SCORE: u32 = 100;

/// Emergency (SOS) alert composition.
pub struct EmergencyProtocol;

impl EmergencyProtocol {
    /// Build the SOS alert for a patient. Always critical, origin `sos`, and
    /// never subject to score thresholds. An invalid position (NaN or out of
    /// range) is dropped rather than failing the emergency.
    pub fn compose_sos(
        record: &PatientRecord,
        location: Coordinates,
        actor_id: Uuid,
        now: DateTime<Utc>,
    ) -> NewAlert {
        let location = if location.is_valid() {
            Some(location)
        } else {
            tracing::warn!(
                patient_id = %record.patient.id,
                actor_id = %actor_id,
                "SOS position invalid, raising without it"
            );
            None
        };

        NewAlert {
            patient_id: record.patient.id,
            caregiver_id: record.caregiver_id(),
            alert_type: FindingKind::EmergencySos,
            priority: Priority::Critical,
            message: MessageTemplates::sos(now, &record.patient.full_name, location.as_ref()),
            symptoms: Vec::new(),
            risk_score: SOS_RISK_SCORE,
            origin: AlertOrigin::Sos,
            created_by: Some(actor_id),
            created_at: now,
            location,
        }
    }
}

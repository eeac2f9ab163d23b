//! Patient access authorization.
//!
//! Rule cascade, checked in order, default deny:
//! 1. Inactive or unknown user → DENY
//! 2. Administrator → ALLOW
//! 3. Assigned madrina → ALLOW
//! 4. Assigned clinician → ALLOW
//! 5. Coordinator of the patient's municipality → ALLOW
//! 6. Default → DENY
//!
//! The same cascade answers both "may create alerts for" and "may view" a
//! patient; the notification dispatcher uses it to filter recipients.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{patients, users};
use crate::models::{Gestante, Role, User};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Why access was granted (or denied), for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    Administrator,
    AssignedMadrina,
    AssignedClinician,
    MunicipalCoordinator,
    /// Unknown or deactivated account.
    InactiveUser,
    /// Patient record does not exist. Reported as a plain denial to callers.
    UnknownPatient,
    Denied,
}

impl AccessReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::AssignedMadrina => "assigned_madrina",
            Self::AssignedClinician => "assigned_clinician",
            Self::MunicipalCoordinator => "municipal_coordinator",
            Self::InactiveUser => "inactive_user",
            Self::UnknownPatient => "unknown_patient",
            Self::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny(reason: AccessReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
    #[error("Internal lock failed")]
    LockFailed,
}

/// Authorization collaborator consumed by the alerting pipeline.
pub trait AccessPolicy: Send + Sync {
    /// May `actor_id` create alerts for `patient_id`?
    fn can_create_alert_for(&self, actor_id: Uuid, patient_id: Uuid) -> Result<bool, AuthorizationError>;

    /// May `actor_id` see `patient_id` (and therefore its alerts)?
    fn can_access(&self, actor_id: Uuid, patient_id: Uuid) -> Result<bool, AuthorizationError>;
}

// ═══════════════════════════════════════════════════════════
// Authorization check
// ═══════════════════════════════════════════════════════════

/// Run the cascade against already-loaded records.
pub fn check_patient_access(user: Option<&User>, patient: &Gestante) -> AccessDecision {
    // Rule 1: unknown or inactive user
    let Some(user) = user.filter(|u| u.active) else {
        return AccessDecision::deny(AccessReason::InactiveUser);
    };

    // Rule 2: administrator
    if user.role == Role::Admin {
        return AccessDecision::allow(AccessReason::Administrator);
    }

    // Rule 3: assigned madrina
    if user.role == Role::Madrina && patient.madrina_id == Some(user.id) {
        return AccessDecision::allow(AccessReason::AssignedMadrina);
    }

    // Rule 4: assigned clinician
    if user.role == Role::Clinician && patient.clinician_id == Some(user.id) {
        return AccessDecision::allow(AccessReason::AssignedClinician);
    }

    // Rule 5: coordinator of the patient's municipality
    if user.role == Role::Coordinator
        && user.municipality_id.is_some()
        && user.municipality_id == patient.municipality_id
    {
        return AccessDecision::allow(AccessReason::MunicipalCoordinator);
    }

    // Rule 6: default deny
    AccessDecision::deny(AccessReason::Denied)
}

/// Load actor and patient, then run the cascade.
pub fn check_patient_access_db(
    conn: &Connection,
    actor_id: &Uuid,
    patient_id: &Uuid,
) -> Result<AccessDecision, AuthorizationError> {
    let user = users::get_user(conn, actor_id)?;
    let decision = match patients::get_patient(conn, patient_id)? {
        Some(patient) => check_patient_access(user.as_ref(), &patient),
        // Administrators pass regardless, so they are the ones told "not found".
        None => match user.as_ref().filter(|u| u.active && u.role == Role::Admin) {
            Some(_) => AccessDecision::allow(AccessReason::Administrator),
            None => AccessDecision::deny(AccessReason::UnknownPatient),
        },
    };

    tracing::debug!(
        actor_id = %actor_id,
        patient_id = %patient_id,
        allowed = decision.allowed,
        reason = decision.reason.as_str(),
        "Patient access checked"
    );
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "user".into(),
            role,
            municipality_id: None,
            active: true,
        }
    }

    fn patient() -> Gestante {
        Gestante {
            id: Uuid::new_v4(),
            full_name: "Patient".into(),
            birth_date: None,
            parity: None,
            known_conditions: vec![],
            due_date: None,
            madrina_id: None,
            clinician_id: None,
            facility_id: None,
            municipality_id: None,
            active: true,
        }
    }

    #[test]
    fn admin_always_allowed() {
        let d = check_patient_access(Some(&user(Role::Admin)), &patient());
        assert!(d.allowed);
        assert_eq!(d.reason, AccessReason::Administrator);
    }

    #[test]
    fn assigned_madrina_allowed_other_madrina_denied() {
        let m = user(Role::Madrina);
        let mut p = patient();
        p.madrina_id = Some(m.id);
        assert_eq!(
            check_patient_access(Some(&m), &p).reason,
            AccessReason::AssignedMadrina
        );
        let other = user(Role::Madrina);
        assert!(!check_patient_access(Some(&other), &p).allowed);
    }

    #[test]
    fn clinician_id_under_wrong_role_is_denied() {
        let m = user(Role::Madrina);
        let mut p = patient();
        p.clinician_id = Some(m.id);
        assert!(!check_patient_access(Some(&m), &p).allowed);
    }

    #[test]
    fn coordinator_scoped_to_municipality() {
        let municipality = Uuid::new_v4();
        let mut c = user(Role::Coordinator);
        c.municipality_id = Some(municipality);
        let mut p = patient();
        assert!(!check_patient_access(Some(&c), &p).allowed);
        p.municipality_id = Some(municipality);
        assert_eq!(
            check_patient_access(Some(&c), &p).reason,
            AccessReason::MunicipalCoordinator
        );
    }

    #[test]
    fn inactive_or_unknown_user_denied() {
        let mut admin = user(Role::Admin);
        admin.active = false;
        assert_eq!(
            check_patient_access(Some(&admin), &patient()).reason,
            AccessReason::InactiveUser
        );
        assert!(!check_patient_access(None, &patient()).allowed);
    }

    #[test]
    fn db_check_loads_records() {
        let conn = open_memory_database().unwrap();
        let clinician = user(Role::Clinician);
        users::insert_user(&conn, &clinician).unwrap();
        let mut p = patient();
        p.clinician_id = Some(clinician.id);
        patients::insert_patient(&conn, &p).unwrap();

        let d = check_patient_access_db(&conn, &clinician.id, &p.id).unwrap();
        assert_eq!(d.reason, AccessReason::AssignedClinician);

        let d = check_patient_access_db(&conn, &clinician.id, &Uuid::new_v4()).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.reason, AccessReason::UnknownPatient);
    }
}

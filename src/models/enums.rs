use std::fmt;

use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Role {
    Admin => "admin",
    Coordinator => "coordinator",
    Clinician => "clinician",
    Madrina => "madrina",
});

str_enum!(AlertOrigin {
    Automatic => "automatic",
    Manual => "manual",
    Sos => "sos",
});

str_enum!(AlertStatus {
    Pending => "pending",
    Resolved => "resolved",
});

str_enum!(AuditSeverity {
    Low => "low",
    Info => "info",
    Warning => "warning",
});

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Priority tier of a finding or alert. Ordered: `Low < Medium < High < Critical`.
///
/// Stored (and serialized) with the Spanish tier names used by the
/// `nivel_prioridad` column: `baja`, `media`, `alta`, `critica`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "baja")]
    Low,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "critica")]
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "baja",
            Self::Medium => "media",
            Self::High => "alta",
            Self::Critical => "critica",
        }
    }

    /// English label used in messages and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Map a composite (unbounded) risk score onto a tier.
    /// Scores above 100 are valid and simply land in `Critical`.
    pub fn from_composite_score(score: u32) -> Self {
        match score {
            s if s >= 90 => Self::Critical,
            s if s >= 70 => Self::High,
            s if s >= 40 => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baja" | "low" => Ok(Self::Low),
            "media" | "medium" => Ok(Self::Medium),
            "alta" | "high" => Ok(Self::High),
            "critica" | "critical" => Ok(Self::Critical),
            _ => Err(DatabaseError::InvalidEnum {
                field: "Priority".into(),
                value: s.into(),
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Critical);
    }

    #[test]
    fn priority_db_names_are_spanish() {
        assert_eq!(Priority::Critical.as_str(), "critica");
        assert_eq!(Priority::from_str("alta").unwrap(), Priority::High);
        assert_eq!(
            serde_json::to_string(&Priority::Critical).unwrap(),
            "\"critica\""
        );
    }

    #[test]
    fn composite_score_tolerates_overflow() {
        assert_eq!(Priority::from_composite_score(0), Priority::Low);
        assert_eq!(Priority::from_composite_score(45), Priority::Medium);
        assert_eq!(Priority::from_composite_score(70), Priority::High);
        assert_eq!(Priority::from_composite_score(340), Priority::Critical);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = Role::from_str("superuser").unwrap_err();
        match err {
            DatabaseError::InvalidEnum { field, value } => {
                assert_eq!(field, "Role");
                assert_eq!(value, "superuser");
            }
            other => panic!("Expected InvalidEnum, got: {:?}", other),
        }
    }
}

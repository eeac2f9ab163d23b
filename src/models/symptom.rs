use serde::{Deserialize, Serialize};

/// Reported symptom, as a semantic tag chosen from a closed vocabulary.
///
/// Free text never reaches the evaluator: intake maps it to one of these tags,
/// and unknown tags are rejected at the boundary by [`SymptomTag::parse_tags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomTag {
    Hemorrhage,
    HeadacheSevere,
    VisionBlurry,
    FetalMovementAbsent,
    FetalMovementReduced,
    Seizure,
    AbdominalPainSevere,
    EpigastricPain,
    AmnioticFluidLoss,
    ContractionsPreterm,
    DifficultyBreathing,
    Fever,
    Chills,
    VomitingPersistent,
    SwellingFaceHands,
    Dizziness,
    Dysuria,
}

impl SymptomTag {
    pub const ALL: [SymptomTag; 17] = [
        Self::Hemorrhage,
        Self::HeadacheSevere,
        Self::VisionBlurry,
        Self::FetalMovementAbsent,
        Self::FetalMovementReduced,
        Self::Seizure,
        Self::AbdominalPainSevere,
        Self::EpigastricPain,
        Self::AmnioticFluidLoss,
        Self::ContractionsPreterm,
        Self::DifficultyBreathing,
        Self::Fever,
        Self::Chills,
        Self::VomitingPersistent,
        Self::SwellingFaceHands,
        Self::Dizziness,
        Self::Dysuria,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hemorrhage => "hemorrhage",
            Self::HeadacheSevere => "headache_severe",
            Self::VisionBlurry => "vision_blurry",
            Self::FetalMovementAbsent => "fetal_movement_absent",
            Self::FetalMovementReduced => "fetal_movement_reduced",
            Self::Seizure => "seizure",
            Self::AbdominalPainSevere => "abdominal_pain_severe",
            Self::EpigastricPain => "epigastric_pain",
            Self::AmnioticFluidLoss => "amniotic_fluid_loss",
            Self::ContractionsPreterm => "contractions_preterm",
            Self::DifficultyBreathing => "difficulty_breathing",
            Self::Fever => "fever",
            Self::Chills => "chills",
            Self::VomitingPersistent => "vomiting_persistent",
            Self::SwellingFaceHands => "swelling_face_hands",
            Self::Dizziness => "dizziness",
            Self::Dysuria => "dysuria",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }

    /// Split raw tags into known symptoms and rejected strings.
    /// Duplicates are collapsed; order of first appearance is kept.
    pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> (Vec<SymptomTag>, Vec<String>) {
        let mut known = Vec::new();
        let mut rejected = Vec::new();
        for tag in raw {
            match Self::from_tag(tag.as_ref()) {
                Some(t) if !known.contains(&t) => known.push(t),
                Some(_) => {}
                None => rejected.push(tag.as_ref().to_string()),
            }
        }
        if !rejected.is_empty() {
            tracing::warn!(rejected = rejected.len(), "Unknown symptom tags ignored");
        }
        (known, rejected)
    }

    /// Symptoms that count as bleeding for static risk factors.
    pub fn is_bleeding(&self) -> bool {
        matches!(self, Self::Hemorrhage)
    }

    /// Symptoms that indicate possible onset of labor.
    pub fn is_labor_sign(&self) -> bool {
        matches!(self, Self::ContractionsPreterm | Self::AmnioticFluidLoss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_strings() {
        for tag in SymptomTag::ALL {
            assert_eq!(SymptomTag::from_tag(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn parse_tags_rejects_typos() {
        let (known, rejected) =
            SymptomTag::parse_tags(&["headache_severe", "Vision_Blurry ", "headach", "fever"]);
        assert_eq!(
            known,
            vec![SymptomTag::HeadacheSevere, SymptomTag::VisionBlurry, SymptomTag::Fever]
        );
        assert_eq!(rejected, vec!["headach".to_string()]);
    }

    #[test]
    fn parse_tags_collapses_duplicates() {
        let (known, _) = SymptomTag::parse_tags(&["chills", "chills"]);
        assert_eq!(known, vec![SymptomTag::Chills]);
    }

    #[test]
    fn serde_uses_snake_case_tags() {
        let json = serde_json::to_string(&SymptomTag::FetalMovementAbsent).unwrap();
        assert_eq!(json, "\"fetal_movement_absent\"");
    }
}

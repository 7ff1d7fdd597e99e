use crate::domain::model::{AdherencePattern, ConversationEntry, Endpoint, PatientProfile, SymptomPattern};
use serde::{Deserialize, Serialize};
use std::fmt;

const MISSED_DOSE_PHRASES: &[&str] = &["missed", "forgot", "skip"];
const EMERGENCY_PHRASES: &[&str] = &["chest pain", "can't breathe", "emergency", "urgent", "hospital"];
const INCREASE_PHRASES: &[&str] = &["increase", "titrat"];

/// Weeks needed before a program counts as finished.
pub const FULL_PROGRAM_WEEKS: u32 = 8;
pub const PARTIAL_PROGRAM_WEEKS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicalOutcome {
    CompleteSuccess,
    PartialSuccess,
    NonAdherenceFailure,
    SideEffectFailure,
    AcuteDecompensation,
    InProgress,
}

impl ClinicalOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalOutcome::CompleteSuccess => "COMPLETE_SUCCESS",
            ClinicalOutcome::PartialSuccess => "PARTIAL_SUCCESS",
            ClinicalOutcome::NonAdherenceFailure => "NON_ADHERENCE_FAILURE",
            ClinicalOutcome::SideEffectFailure => "SIDE_EFFECT_FAILURE",
            ClinicalOutcome::AcuteDecompensation => "ACUTE_DECOMPENSATION",
            ClinicalOutcome::InProgress => "IN_PROGRESS",
        }
    }

    pub fn to_endpoint(&self) -> Endpoint {
        match self {
            ClinicalOutcome::CompleteSuccess => Endpoint::CompleteSuccess,
            ClinicalOutcome::PartialSuccess => Endpoint::PartialSuccess,
            ClinicalOutcome::NonAdherenceFailure => Endpoint::NonAdherenceFailure,
            ClinicalOutcome::SideEffectFailure => Endpoint::SideEffectFailure,
            ClinicalOutcome::AcuteDecompensation => Endpoint::AcuteDecompensationEd,
            ClinicalOutcome::InProgress => Endpoint::InProgress,
        }
    }
}

impl fmt::Display for ClinicalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phrase counts over the run's conversation log. Each message counts at
/// most once per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEvidence {
    pub missed_dose_mentions: u32,
    pub emergency_mentions: u32,
    pub increase_mentions: u32,
}

impl OutcomeEvidence {
    pub fn from_log(log: &[ConversationEntry]) -> Self {
        let mut evidence = Self::default();
        for entry in log {
            let message = entry.message.to_lowercase().replace('\u{2019}', "'");
            let mentions = |phrases: &[&str]| phrases.iter().any(|p| message.contains(p));

            if mentions(MISSED_DOSE_PHRASES) {
                evidence.missed_dose_mentions += 1;
            }
            if mentions(EMERGENCY_PHRASES) {
                evidence.emergency_mentions += 1;
            }
            if mentions(INCREASE_PHRASES) {
                evidence.increase_mentions += 1;
            }
        }
        evidence
    }
}

/// Final classification of a run. Any emergency mention wins; otherwise the
/// profile's target endpoint picks the rule.
pub fn classify_outcome(
    profile: &PatientProfile,
    evidence: &OutcomeEvidence,
    weeks_completed: u32,
) -> ClinicalOutcome {
    if evidence.emergency_mentions > 0 {
        return ClinicalOutcome::AcuteDecompensation;
    }

    match profile.target_endpoint {
        Endpoint::CompleteSuccess => {
            if weeks_completed >= FULL_PROGRAM_WEEKS && evidence.missed_dose_mentions == 0 {
                ClinicalOutcome::CompleteSuccess
            } else if weeks_completed >= PARTIAL_PROGRAM_WEEKS {
                ClinicalOutcome::PartialSuccess
            } else {
                ClinicalOutcome::InProgress
            }
        }
        Endpoint::NonAdherenceFailure => {
            if evidence.missed_dose_mentions >= 2
                || profile.adherence_pattern == AdherencePattern::Declining
            {
                ClinicalOutcome::NonAdherenceFailure
            } else {
                ClinicalOutcome::InProgress
            }
        }
        Endpoint::SideEffectFailure => ClinicalOutcome::SideEffectFailure,
        Endpoint::AcuteDecompensationEd => {
            if profile.symptom_pattern == SymptomPattern::ProgressiveWorsening {
                ClinicalOutcome::AcuteDecompensation
            } else {
                ClinicalOutcome::InProgress
            }
        }
        _ if weeks_completed >= FULL_PROGRAM_WEEKS => ClinicalOutcome::PartialSuccess,
        _ => ClinicalOutcome::InProgress,
    }
}

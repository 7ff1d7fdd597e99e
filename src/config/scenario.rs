//! Patient scenario files and dose-string parsing.

use crate::domain::model::{
    CurrentMedication, DoseInfo, DoseValue, EducationLevel, MedicalLiteracy, MedicationClass,
    PatientProfile, PatientState,
};
use crate::utils::error::{Result, TitrationError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_UNIT: &str = "mg";
const DEFAULT_FREQUENCY: &str = "daily";
const UNIT_WORDS: &[&str] = &["mg", "mcg", "g", "tablet", "tablets"];

/// Parses strings such as "10mg daily", "24/26mg twice daily",
/// "1 tablet three times daily" or "dose adjustment as needed".
/// Unparsable amounts fall back to 0.0 with a warning.
pub fn parse_dose_string(text: &str) -> DoseInfo {
    let trimmed = text.trim();

    if DoseValue::is_flexible_phrase(trimmed) {
        return DoseInfo::new(
            DoseValue::Flexible(DoseValue::FLEXIBLE_MARKER.to_string()),
            DEFAULT_UNIT,
            "as directed",
        );
    }

    let mut tokens = trimmed.split_whitespace();
    let Some(first) = tokens.next() else {
        return DoseInfo::numeric(0.0, DEFAULT_UNIT, DEFAULT_FREQUENCY);
    };
    let mut rest: Vec<&str> = tokens.collect();

    // "10 mg daily" 的單位與數字分開
    let mut dose = first.to_string();
    let ends_with_digit = dose.chars().last().is_some_and(|c| c.is_ascii_digit());
    if ends_with_digit
        && rest
            .first()
            .is_some_and(|next| UNIT_WORDS.contains(&next.to_lowercase().as_str()))
    {
        dose.push_str(rest.remove(0));
    }

    let frequency = if rest.is_empty() {
        DEFAULT_FREQUENCY.to_string()
    } else {
        rest.join(" ")
    };

    let split_at = dose
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(dose.len());
    let (amount, unit) = dose.split_at(split_at);
    let unit = if unit.is_empty() { DEFAULT_UNIT } else { unit };

    if unit.to_lowercase().starts_with("tablet") {
        return DoseInfo::new(
            DoseValue::Combination(format!("{} {}", amount, unit)),
            unit,
            frequency,
        );
    }

    if amount.contains('/') {
        return DoseInfo::new(DoseValue::Combination(amount.to_string()), unit, frequency);
    }

    match amount.parse::<f64>() {
        Ok(value) => DoseInfo::numeric(value, unit, frequency),
        Err(_) => {
            tracing::warn!("⚠️ Could not parse dose '{}', using 0.0", text);
            DoseInfo::numeric(0.0, unit, frequency)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub medication_class: MedicationClass,
    pub current: String,
    pub target: String,
    #[serde(default)]
    pub stage: String,
}

impl MedicationRecord {
    pub fn to_current_medication(&self) -> CurrentMedication {
        CurrentMedication {
            name: self.name.trim().to_string(),
            medication_class: self.medication_class,
            current_dose: parse_dose_string(&self.current),
            target_dose: parse_dose_string(&self.target),
            stage: self.stage.clone(),
            weeks_on_current_dose: 0,
        }
    }
}

/// A scenario in its flat form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub id: String,
    pub patient_name: String,
    pub education_level: EducationLevel,
    pub medical_literacy: MedicalLiteracy,
    #[serde(default)]
    pub description: String,
    pub medications: Vec<MedicationRecord>,
    #[serde(default)]
    pub comorbidities: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClinicalScenario {
    patient_name: String,
    medications: Vec<MedicationRecord>,
    #[serde(default)]
    comorbidities: Vec<String>,
    #[serde(default)]
    allergies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileRecord {
    education_level: EducationLevel,
    medical_literacy: MedicalLiteracy,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct NestedScenario {
    id: String,
    clinical_scenario: ClinicalScenario,
    patient_profile: ProfileRecord,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawScenario {
    Nested(NestedScenario),
    Flat(ScenarioRecord),
}

impl From<RawScenario> for ScenarioRecord {
    fn from(raw: RawScenario) -> Self {
        match raw {
            RawScenario::Flat(record) => record,
            RawScenario::Nested(nested) => ScenarioRecord {
                id: nested.id,
                patient_name: nested.clinical_scenario.patient_name,
                education_level: nested.patient_profile.education_level,
                medical_literacy: nested.patient_profile.medical_literacy,
                description: nested.patient_profile.description,
                medications: nested.clinical_scenario.medications,
                comorbidities: nested.clinical_scenario.comorbidities,
                allergies: nested.clinical_scenario.allergies,
            },
        }
    }
}

impl Validate for ScenarioRecord {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("scenario.id", &self.id)?;
        validate_non_empty_string("scenario.patient_name", &self.patient_name)?;

        let mut seen = HashSet::new();
        for medication in &self.medications {
            validate_non_empty_string("scenario.medications.name", &medication.name)?;
            if !seen.insert(medication.name.trim().to_lowercase()) {
                return Err(TitrationError::validation(format!(
                    "Scenario {} lists {} more than once",
                    self.id, medication.name
                )));
            }
        }
        Ok(())
    }
}

impl ScenarioRecord {
    /// Builds the starting state with default patterns. Callers apply
    /// pattern overrides to `profile` afterwards.
    pub fn to_patient_state(&self, total_weeks: u32) -> Result<PatientState> {
        self.validate()?;

        let profile = PatientProfile::new(
            self.education_level,
            self.medical_literacy,
            self.description.clone(),
        );
        let medications = self
            .medications
            .iter()
            .map(MedicationRecord::to_current_medication)
            .collect();

        let mut state = PatientState::new(
            self.id.clone(),
            self.patient_name.clone(),
            profile,
            medications,
            total_weeks,
        );
        state.comorbidities = self.comorbidities.clone();
        state.allergies = self.allergies.clone();
        Ok(state)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioSet {
    scenarios: Vec<ScenarioRecord>,
}

impl ScenarioSet {
    /// Accepts `{"conversations": [...]}` or a bare array.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let list = match value {
            serde_json::Value::Object(mut map) => {
                map.remove("conversations")
                    .ok_or_else(|| TitrationError::MissingFieldError {
                        field: "conversations".to_string(),
                    })?
            }
            other => other,
        };
        let raw: Vec<RawScenario> = serde_json::from_value(list)?;
        let scenarios: Vec<ScenarioRecord> = raw.into_iter().map(ScenarioRecord::from).collect();
        tracing::debug!("Loaded {} scenarios", scenarios.len());
        Ok(Self { scenarios })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn scenarios(&self) -> &[ScenarioRecord] {
        &self.scenarios
    }

    pub fn find(&self, patient_id: &str) -> Result<&ScenarioRecord> {
        self.scenarios
            .iter()
            .find(|s| s.id == patient_id)
            .ok_or_else(|| TitrationError::ScenarioNotFound {
                patient_id: patient_id.to_string(),
            })
    }
}

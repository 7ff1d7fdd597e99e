use crate::domain::model::{
    DoseInfo, DoseValue, HoldCriteria, MedicationClass, MedicationProtocol, WeightBasedMaximum,
};
use crate::protocol::ladder::NextDose;
use crate::utils::error::{Result, TitrationError};
use crate::utils::validation::{validate_non_empty_string, validate_required_field};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// 目錄中的原始欄位，全部為 Option 以便逐一檢查缺漏
#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    medications: Vec<RawProtocol>,
}

#[derive(Debug, Deserialize)]
struct RawProtocol {
    key: Option<String>,
    name: Option<String>,
    class: Option<String>,
    starting_dose: Option<DoseInfo>,
    incremental_doses: Option<Vec<DoseValue>>,
    maximum_dose: Option<DoseInfo>,
    contraindications: Option<Vec<String>>,
    hold_criteria: Option<HoldCriteria>,
    requires_titration: Option<bool>,
    special_instructions: Option<String>,
    #[serde(default)]
    monitoring_notes: Vec<String>,
    high_starting_dose: Option<DoseInfo>,
    weight_based_maximum: Option<WeightBasedMaximum>,
    titration_interval: Option<String>,
}

impl RawProtocol {
    fn into_protocol(self, position: usize) -> Result<MedicationProtocol> {
        let RawProtocol {
            key,
            name,
            class,
            starting_dose,
            incremental_doses,
            maximum_dose,
            contraindications,
            hold_criteria,
            requires_titration,
            special_instructions,
            monitoring_notes,
            high_starting_dose,
            weight_based_maximum,
            titration_interval,
        } = self;

        let key = validate_required_field(&format!("medications[{}].key", position), &key)?;
        validate_non_empty_string("medication key", key)?;
        let key = normalize_name(key);
        let field = |name: &str| format!("{}.{}", key, name);

        let medication_class: MedicationClass =
            validate_required_field(&field("class"), &class)?.parse()?;
        let starting_dose = validate_required_field(&field("starting_dose"), &starting_dose)?.clone();
        let maximum_dose = validate_required_field(&field("maximum_dose"), &maximum_dose)?.clone();
        let contraindications =
            validate_required_field(&field("contraindications"), &contraindications)?.clone();
        let hold_criteria = validate_required_field(&field("hold_criteria"), &hold_criteria)?.clone();

        let incremental_doses = incremental_doses.unwrap_or_default();
        let requires_titration = requires_titration.unwrap_or(!incremental_doses.is_empty());

        if requires_titration {
            let Some(top) = incremental_doses.last() else {
                return Err(TitrationError::validation(format!(
                    "{} requires titration but has no dose ladder",
                    key
                )));
            };
            if !top.matches(&maximum_dose.value) {
                return Err(TitrationError::validation(format!(
                    "{} ladder ends at {} but maximum dose is {}",
                    key, top, maximum_dose.value
                )));
            }
            // 階梯內型別必須一致，數值與組合劑量不可混用
            let numeric = incremental_doses.iter().filter(|d| d.is_numeric()).count();
            if numeric != 0 && numeric != incremental_doses.len() {
                return Err(TitrationError::validation(format!(
                    "{} mixes numeric and combination doses in its ladder",
                    key
                )));
            }
        }

        Ok(MedicationProtocol {
            name: name.unwrap_or_else(|| display_name(&key)),
            key,
            medication_class,
            starting_dose,
            incremental_doses,
            maximum_dose,
            contraindications,
            hold_criteria,
            requires_titration,
            special_instructions,
            monitoring_notes,
            high_starting_dose,
            weight_based_maximum,
            titration_interval,
        })
    }
}

/// Lowercase, drop any parenthetical, and fold spaces, "/" and "-" into "_".
pub fn normalize_name(name: &str) -> String {
    let base = name.split('(').next().unwrap_or(name);
    base.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '-' => '_',
            other => other,
        })
        .collect()
}

fn display_name(key: &str) -> String {
    key.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Protocol lookup result as handed to the decision-maker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtocolInfo {
    Known(MedicationProtocol),
    Unknown {
        error: String,
        available_medications: Vec<String>,
    },
}

impl ProtocolInfo {
    pub fn protocol(&self) -> Option<&MedicationProtocol> {
        match self {
            ProtocolInfo::Known(protocol) => Some(protocol),
            ProtocolInfo::Unknown { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, ProtocolInfo::Known(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationSummary {
    pub key: String,
    pub name: String,
    pub starting_dose: DoseInfo,
    pub maximum_dose: DoseInfo,
    pub requires_titration: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub class: MedicationClass,
    pub medications: Vec<MedicationSummary>,
}

/// Immutable medication catalog. Load once and pass by reference.
#[derive(Debug, Clone)]
pub struct ProtocolRepository {
    protocols: Vec<MedicationProtocol>,
    index: HashMap<String, usize>,
}

impl ProtocolRepository {
    /// The built-in catalog of heart failure medications.
    pub fn load() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawCatalog = toml::from_str(content)?;
        if raw.medications.is_empty() {
            return Err(TitrationError::validation("protocol catalog contains no medications"));
        }

        let mut protocols = Vec::with_capacity(raw.medications.len());
        let mut index = HashMap::new();

        for (position, entry) in raw.medications.into_iter().enumerate() {
            let protocol = entry.into_protocol(position)?;
            if index.contains_key(&protocol.key) {
                return Err(TitrationError::validation(format!(
                    "duplicate protocol entry: {}",
                    protocol.key
                )));
            }
            let slot = protocols.len();
            index.insert(protocol.key.clone(), slot);
            index.entry(normalize_name(&protocol.name)).or_insert(slot);
            protocols.push(protocol);
        }

        tracing::debug!("Loaded {} medication protocols", protocols.len());
        Ok(Self { protocols, index })
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }

    pub fn protocols(&self) -> &[MedicationProtocol] {
        &self.protocols
    }

    pub fn get(&self, name: &str) -> Option<&MedicationProtocol> {
        self.index
            .get(&normalize_name(name))
            .and_then(|&i| self.protocols.get(i))
    }

    pub fn protocols_by_class(&self, class: MedicationClass) -> Vec<&MedicationProtocol> {
        self.protocols
            .iter()
            .filter(|p| p.medication_class == class)
            .collect()
    }

    pub fn list_medications(&self) -> Vec<&str> {
        self.protocols.iter().map(|p| p.key.as_str()).collect()
    }

    pub fn medications_by_class_summary(&self, class: MedicationClass) -> ClassSummary {
        ClassSummary {
            class,
            medications: self
                .protocols_by_class(class)
                .into_iter()
                .map(|p| MedicationSummary {
                    key: p.key.clone(),
                    name: p.name.clone(),
                    starting_dose: p.starting_dose.clone(),
                    maximum_dose: p.maximum_dose.clone(),
                    requires_titration: p.requires_titration,
                })
                .collect(),
        }
    }

    pub fn medication_info(&self, name: &str) -> ProtocolInfo {
        match self.get(name) {
            Some(protocol) => ProtocolInfo::Known(protocol.clone()),
            None => ProtocolInfo::Unknown {
                error: format!("Medication '{}' not found in protocols", name),
                available_medications: self
                    .list_medications()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            },
        }
    }

    pub fn next_dose(&self, name: &str, current: &DoseValue) -> NextDose {
        match self.get(name) {
            Some(protocol) => protocol.next_dose(current),
            None => {
                tracing::debug!("Next-dose lookup for unknown medication {}", name);
                NextDose::UnknownMedication {
                    medication: name.to_string(),
                }
            }
        }
    }

    pub fn ladder_position(&self, name: &str, dose: &DoseValue) -> Option<usize> {
        self.get(name)?.ladder_position(dose)
    }
}

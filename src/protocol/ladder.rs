use crate::domain::model::{DoseValue, MedicationProtocol};
use serde::{Deserialize, Serialize};

/// Result of a next-dose query. Lookup misses are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextDose {
    Next {
        current_dose: DoseValue,
        next_dose: DoseValue,
        maximum_dose: DoseValue,
        unit: String,
        frequency: String,
    },
    AtMaximum {
        current_dose: DoseValue,
        maximum_dose: DoseValue,
    },
    NotTitrated {
        message: String,
    },
    DoseNotInLadder {
        current_dose: DoseValue,
        valid_doses: Vec<DoseValue>,
    },
    UnknownMedication {
        medication: String,
    },
}

impl NextDose {
    pub fn next_value(&self) -> Option<&DoseValue> {
        match self {
            NextDose::Next { next_dose, .. } => Some(next_dose),
            _ => None,
        }
    }

    pub fn is_at_maximum(&self) -> bool {
        matches!(self, NextDose::AtMaximum { .. })
    }
}

impl MedicationProtocol {
    pub fn ladder_position(&self, dose: &DoseValue) -> Option<usize> {
        self.incremental_doses.iter().position(|step| step.matches(dose))
    }

    pub fn next_dose(&self, current: &DoseValue) -> NextDose {
        if !self.requires_titration || self.incremental_doses.is_empty() {
            return NextDose::NotTitrated {
                message: format!(
                    "{} does not require titration (fixed dose {})",
                    self.name, self.starting_dose
                ),
            };
        }

        let Some(position) = self.ladder_position(current) else {
            return NextDose::DoseNotInLadder {
                current_dose: current.clone(),
                valid_doses: self.incremental_doses.clone(),
            };
        };

        match self.incremental_doses.get(position + 1) {
            Some(next) => NextDose::Next {
                current_dose: current.clone(),
                next_dose: next.clone(),
                maximum_dose: self.maximum_dose.value.clone(),
                unit: self.starting_dose.unit.clone(),
                frequency: self.starting_dose.frequency.clone(),
            },
            None => NextDose::AtMaximum {
                current_dose: current.clone(),
                maximum_dose: self.maximum_dose.value.clone(),
            },
        }
    }

    /// One rung down, `None` at the bottom of the ladder or off-ladder.
    pub fn previous_dose(&self, current: &DoseValue) -> Option<&DoseValue> {
        let position = self.ladder_position(current)?;
        position
            .checked_sub(1)
            .and_then(|i| self.incremental_doses.get(i))
    }
}

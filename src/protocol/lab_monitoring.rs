use crate::domain::model::{CurrentMedication, MedicationClass};
use crate::protocol::repository::ProtocolRepository;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const BASIC_PANEL: &[&str] = &["sodium", "potassium", "chloride", "bicarbonate", "glucose"];
pub const RENAL_FUNCTION: &[&str] = &["creatinine", "bun", "egfr"];
pub const ADDITIONAL: &[&str] = &["magnesium", "hemoglobin", "hematocrit"];
const HEMOGLOBIN: &[&str] = &["hemoglobin"];

const COMBINATION_SCHEDULE_KEY: &str = "ace_arb_arni_plus_aldosterone";
const COMBINATION_SCHEDULE: &str = "1-2 weeks for combination changes";
const IMMEDIATE_TIMELINE: &str = "1-2 weeks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringClass {
    AceArbArni,
    AldosteroneAntagonist,
    BetaBlocker,
    Sglt2Inhibitor,
    SgcStimulator,
    HydralazineNitrates,
}

impl MonitoringClass {
    pub fn for_class(class: MedicationClass) -> Option<Self> {
        match class {
            MedicationClass::AceInhibitor | MedicationClass::Arb | MedicationClass::Arni => {
                Some(MonitoringClass::AceArbArni)
            }
            MedicationClass::AldosteroneAntagonist => Some(MonitoringClass::AldosteroneAntagonist),
            MedicationClass::BetaBlocker => Some(MonitoringClass::BetaBlocker),
            MedicationClass::Sglt2Inhibitor => Some(MonitoringClass::Sglt2Inhibitor),
            MedicationClass::SgcStimulator => Some(MonitoringClass::SgcStimulator),
            MedicationClass::Vasodilator
            | MedicationClass::Nitrate
            | MedicationClass::FixedDoseCombination => Some(MonitoringClass::HydralazineNitrates),
            MedicationClass::LoopDiuretic | MedicationClass::ThiazideDiuretic => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonitoringClass::AceArbArni => "ace_arb_arni",
            MonitoringClass::AldosteroneAntagonist => "aldosterone_antagonist",
            MonitoringClass::BetaBlocker => "beta_blocker",
            MonitoringClass::Sglt2Inhibitor => "sglt2_inhibitor",
            MonitoringClass::SgcStimulator => "sgc_stimulator",
            MonitoringClass::HydralazineNitrates => "hydralazine_nitrates",
        }
    }

    pub fn schedule(&self) -> &'static str {
        match self {
            MonitoringClass::AceArbArni | MonitoringClass::AldosteroneAntagonist => {
                "1-2 weeks after initiation or dose change"
            }
            MonitoringClass::BetaBlocker => "2-4 weeks if renal or electrolyte concerns",
            MonitoringClass::Sglt2Inhibitor => "2-4 weeks after initiation",
            MonitoringClass::SgcStimulator => "2-4 weeks after initiation (check BMP, hemoglobin)",
            MonitoringClass::HydralazineNitrates => {
                "generally less frequent labs needed unless concerns"
            }
        }
    }

    /// Potassium and renal function must be rechecked soon after any change.
    pub fn needs_immediate_labs(&self) -> bool {
        matches!(
            self,
            MonitoringClass::AceArbArni | MonitoringClass::AldosteroneAntagonist
        )
    }

    pub fn requirement(&self) -> Option<LabRequirement> {
        let (panels, timing): (Vec<&[&str]>, &str) = match self {
            MonitoringClass::AceArbArni => {
                (vec![BASIC_PANEL, RENAL_FUNCTION], "1-2 weeks after changes")
            }
            MonitoringClass::AldosteroneAntagonist => (
                vec![BASIC_PANEL, RENAL_FUNCTION],
                "1-2 weeks after changes (K+ critical)",
            ),
            MonitoringClass::Sglt2Inhibitor => (
                vec![BASIC_PANEL, RENAL_FUNCTION, HEMOGLOBIN],
                "2-4 weeks after initiation",
            ),
            MonitoringClass::SgcStimulator => {
                (vec![BASIC_PANEL, HEMOGLOBIN], "2-4 weeks after initiation")
            }
            MonitoringClass::BetaBlocker | MonitoringClass::HydralazineNitrates => return None,
        };

        Some(LabRequirement {
            labs: panels
                .into_iter()
                .flat_map(|panel| panel.iter().map(|lab| lab.to_string()))
                .collect(),
            timing: timing.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabRequirement {
    pub labs: Vec<String>,
    pub timing: String,
}

/// Program-wide lab picture across every current medication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabMonitoringOverview {
    pub required_labs: BTreeSet<String>,
    pub monitoring_schedule: BTreeMap<String, String>,
    pub medication_requirements: BTreeMap<String, LabRequirement>,
    pub immediate_labs_needed: bool,
    pub next_lab_timeline: Option<String>,
}

/// Resolves a medication's monitoring class from the catalog, falling back
/// to the class declared in the scenario for medications outside it.
pub fn monitoring_class_for(
    repository: &ProtocolRepository,
    medication: &CurrentMedication,
) -> Option<MonitoringClass> {
    let class = repository
        .get(&medication.name)
        .map(|p| p.medication_class)
        .unwrap_or(medication.medication_class);
    MonitoringClass::for_class(class)
}

pub fn lab_monitoring_overview(
    repository: &ProtocolRepository,
    medications: &[CurrentMedication],
) -> LabMonitoringOverview {
    let mut overview = LabMonitoringOverview::default();
    let mut classes = BTreeSet::new();

    for medication in medications {
        let Some(class) = monitoring_class_for(repository, medication) else {
            continue;
        };
        classes.insert(class);
        overview
            .monitoring_schedule
            .insert(class.as_str().to_string(), class.schedule().to_string());

        if let Some(requirement) = class.requirement() {
            overview.required_labs.extend(requirement.labs.iter().cloned());
            overview
                .medication_requirements
                .insert(medication.name.clone(), requirement);
        }
    }

    if classes.contains(&MonitoringClass::AceArbArni)
        && classes.contains(&MonitoringClass::AldosteroneAntagonist)
    {
        overview.monitoring_schedule.insert(
            COMBINATION_SCHEDULE_KEY.to_string(),
            COMBINATION_SCHEDULE.to_string(),
        );
    }

    if classes.iter().any(|c| c.needs_immediate_labs()) {
        overview.immediate_labs_needed = true;
        overview.next_lab_timeline = Some(IMMEDIATE_TIMELINE.to_string());
    }

    overview
}

use crate::domain::model::{CurrentMedication, DoseInfo, DoseValue, MedicationClass, PatientState};
use crate::protocol::lab_monitoring::{lab_monitoring_overview, monitoring_class_for};
use crate::protocol::{
    LabMonitoringOverview, MonitoringClass, NextDose, ProtocolInfo, ProtocolReference,
    ProtocolRepository,
};
use crate::safety::{HoldCheck, SafetyEvaluator};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationContext {
    pub name: String,
    #[serde(rename = "class")]
    pub medication_class: MedicationClass,
    pub current_dose: DoseInfo,
    pub target_dose: DoseInfo,
    pub weeks_on_current_dose: u32,
    pub lab_monitoring_class: Option<MonitoringClass>,
    pub protocol_info: ProtocolInfo,
    pub next_titration_step: Option<NextDose>,
    /// One rung down the ladder, for dose reductions.
    pub previous_titration_step: Option<DoseValue>,
    /// Hold criteria against the latest week; `None` before any data or for
    /// medications without a protocol.
    pub hold_check: Option<HoldCheck>,
}

impl MedicationContext {
    pub fn should_hold(&self) -> bool {
        self.hold_check.as_ref().is_some_and(|h| h.should_hold)
    }
}

/// Weekly hand-off bundle for the decision-maker. Purely informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitrationContext {
    pub patient_id: String,
    pub patient_name: String,
    pub current_week: u32,
    pub total_weeks: u32,
    pub medications: Vec<MedicationContext>,
    pub lab_monitoring_overview: LabMonitoringOverview,
    pub reference: ProtocolReference,
}

impl TitrationContext {
    pub fn medication(&self, name: &str) -> Option<&MedicationContext> {
        self.medications
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn held_medications(&self) -> Vec<&str> {
        self.medications
            .iter()
            .filter(|m| m.should_hold())
            .map(|m| m.name.as_str())
            .collect()
    }

    pub fn to_json_pretty(&self) -> crate::utils::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct TitrationContextAggregator<'a> {
    repository: &'a ProtocolRepository,
    evaluator: SafetyEvaluator,
    reference: ProtocolReference,
}

impl<'a> TitrationContextAggregator<'a> {
    pub fn new(repository: &'a ProtocolRepository) -> Self {
        Self {
            repository,
            evaluator: SafetyEvaluator::new(),
            reference: ProtocolReference::standard(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: SafetyEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn collect(&self, state: &PatientState) -> TitrationContext {
        let medications: Vec<MedicationContext> = state
            .current_medications
            .iter()
            .map(|m| self.medication_context(state, m))
            .collect();

        let held = medications.iter().filter(|m| m.should_hold()).count();
        tracing::debug!(
            "📋 Titration context for {} week {}: {} medications, {} on hold",
            state.patient_id,
            state.current_week,
            medications.len(),
            held
        );

        TitrationContext {
            patient_id: state.patient_id.clone(),
            patient_name: state.patient_name.clone(),
            current_week: state.current_week,
            total_weeks: state.total_weeks,
            medications,
            lab_monitoring_overview: lab_monitoring_overview(
                self.repository,
                &state.current_medications,
            ),
            reference: self.reference.clone(),
        }
    }

    fn medication_context(
        &self,
        state: &PatientState,
        medication: &CurrentMedication,
    ) -> MedicationContext {
        let protocol_info = self.repository.medication_info(&medication.name);
        let protocol = protocol_info.protocol();

        // 只有數值劑量且需要滴定的藥物才計算下一階
        let next_titration_step = protocol
            .filter(|p| p.requires_titration && medication.current_dose.value.is_numeric())
            .map(|p| p.next_dose(&medication.current_dose.value));
        let previous_titration_step = protocol
            .and_then(|p| p.previous_dose(&medication.current_dose.value))
            .cloned();

        let hold_check = protocol.zip(state.latest_week()).map(|(p, week)| {
            self.evaluator.check_hold_criteria(
                p,
                &week.vitals,
                week.labs.as_ref(),
                state.baseline_creatinine(),
            )
        });

        MedicationContext {
            name: medication.name.clone(),
            medication_class: medication.medication_class,
            current_dose: medication.current_dose.clone(),
            target_dose: medication.target_dose.clone(),
            weeks_on_current_dose: medication.weeks_on_current_dose,
            lab_monitoring_class: monitoring_class_for(self.repository, medication),
            protocol_info,
            next_titration_step,
            previous_titration_step,
            hold_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        EducationLevel, Endpoint, LabValues, MedicalLiteracy, PatientProfile, VitalSigns,
        WeeklyData,
    };

    fn medication(name: &str, class: MedicationClass, dose: DoseValue) -> CurrentMedication {
        CurrentMedication {
            name: name.to_string(),
            medication_class: class,
            current_dose: DoseInfo::new(dose.clone(), "mg", "daily"),
            target_dose: DoseInfo::new(dose, "mg", "daily"),
            stage: "titration".to_string(),
            weeks_on_current_dose: 1,
        }
    }

    #[test]
    fn test_next_step_only_for_numeric_titratable_doses() {
        let repo = ProtocolRepository::load().unwrap();
        let profile = PatientProfile::new(EducationLevel::College, MedicalLiteracy::Moderate, "");
        let state = PatientState::new(
            "P7",
            "Context Patient",
            profile,
            vec![
                medication("Lisinopril", MedicationClass::AceInhibitor, DoseValue::Numeric(5.0)),
                medication(
                    "Sacubitril/Valsartan",
                    MedicationClass::Arni,
                    DoseValue::Combination("24/26".to_string()),
                ),
                medication("Dapagliflozin", MedicationClass::Sglt2Inhibitor, DoseValue::Numeric(10.0)),
                medication("Furosemide", MedicationClass::LoopDiuretic, DoseValue::Numeric(40.0)),
            ],
            8,
        );

        let context = TitrationContextAggregator::new(&repo).collect(&state);
        let lisinopril = context.medication("lisinopril").unwrap();
        assert_eq!(
            lisinopril.next_titration_step.as_ref().and_then(|n| n.next_value()),
            Some(&DoseValue::Numeric(10.0))
        );
        assert!(context.medication("Sacubitril/Valsartan").unwrap().next_titration_step.is_none());
        assert!(context.medication("Dapagliflozin").unwrap().next_titration_step.is_none());

        let furosemide = context.medication("Furosemide").unwrap();
        assert!(!furosemide.protocol_info.is_known());
        assert!(furosemide.lab_monitoring_class.is_none());
        assert!(context.lab_monitoring_overview.immediate_labs_needed);
        assert_eq!(lisinopril.previous_titration_step, Some(DoseValue::Numeric(2.5)));
        assert!(lisinopril.hold_check.is_none());
        assert!(context.held_medications().is_empty());
    }

    #[test]
    fn test_reference_tables_travel_with_context() {
        let repo = ProtocolRepository::load().unwrap();
        let profile = PatientProfile::new(EducationLevel::College, MedicalLiteracy::Moderate, "");
        let state = PatientState::new("P8", "Reference Patient", profile, vec![], 8);

        let context = TitrationContextAggregator::new(&repo).collect(&state);
        let reference = &context.reference;
        assert_eq!(reference.vital_sign_parameters.bp_goal_range.sbp_max, 120);
        assert_eq!(reference.general_hold_criteria.creatinine_increase_percent, 30.0);
        assert!(reference.endpoint(Endpoint::PatientWithdrawal).is_some());
        assert_eq!(reference.titration_strategies.len(), 3);

        let json = context.to_json_pretty().unwrap();
        assert!(json.contains("\"titration_strategies\""));
        assert!(json.contains("\"program_endpoints\""));
    }

    #[test]
    fn test_hold_reasons_from_latest_week() {
        let repo = ProtocolRepository::load().unwrap();
        let profile = PatientProfile::new(EducationLevel::College, MedicalLiteracy::Moderate, "");
        let mut state = PatientState::new(
            "P9",
            "Hold Patient",
            profile,
            vec![
                medication("Lisinopril", MedicationClass::AceInhibitor, DoseValue::Numeric(10.0)),
                medication("Furosemide", MedicationClass::LoopDiuretic, DoseValue::Numeric(40.0)),
            ],
            8,
        );
        state.baseline_labs = Some(LabValues {
            creatinine: Some(1.0),
            ..LabValues::default()
        });
        state.weekly_data.push(WeeklyData {
            week_number: 1,
            vitals: VitalSigns {
                systolic_bp: Some(112),
                diastolic_bp: Some(70),
                heart_rate: Some(72),
                weight: None,
            },
            labs: Some(LabValues {
                potassium: Some(5.8),
                creatinine: Some(1.4),
                egfr: Some(55.0),
                ..LabValues::default()
            }),
            symptoms: vec![],
            side_effects: vec![],
            adherence_rate: 0.95,
            patient_concerns: vec![],
            timestamp: chrono::Utc::now(),
        });

        let context = TitrationContextAggregator::new(&repo).collect(&state);
        let hold = context
            .medication("Lisinopril")
            .and_then(|m| m.hold_check.as_ref())
            .unwrap();
        assert!(hold.should_hold);
        assert!(hold.hold_reasons.iter().any(|r| r.contains("Potassium 5.8")));
        assert!(hold.hold_reasons.iter().any(|r| r.contains("Creatinine increased 40.0%")));
        assert!(context.medication("Furosemide").unwrap().hold_check.is_none());
        assert_eq!(context.held_medications(), vec!["Lisinopril"]);
    }
}

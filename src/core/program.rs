//! Weekly titration state machine.
//!
//! AWAITING_INFO → READY_FOR_DECISION → DECISION_APPLIED → WEEK_COMPLETE →
//! (next AWAITING_INFO | PROGRAM_COMPLETE). Any live phase can drop to
//! EMERGENCY_TERMINATED.

use crate::core::decision::{validate_decision, DecisionIssue};
use crate::domain::model::{
    DoseInfo, Endpoint, InformationStatus, PatientState, VitalSigns, WeeklyData, WeeklyDecision,
};
use crate::protocol::ProtocolRepository;
use crate::safety::{SafetyAssessment, SafetyEvaluator, SafetyLevel};
use crate::utils::error::{Result, TitrationError};
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, Validate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgramPhase {
    AwaitingInfo,
    ReadyForDecision,
    DecisionApplied,
    WeekComplete,
    ProgramComplete,
    EmergencyTerminated,
}

impl ProgramPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramPhase::AwaitingInfo => "AWAITING_INFO",
            ProgramPhase::ReadyForDecision => "READY_FOR_DECISION",
            ProgramPhase::DecisionApplied => "DECISION_APPLIED",
            ProgramPhase::WeekComplete => "WEEK_COMPLETE",
            ProgramPhase::ProgramComplete => "PROGRAM_COMPLETE",
            ProgramPhase::EmergencyTerminated => "EMERGENCY_TERMINATED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgramPhase::ProgramComplete | ProgramPhase::EmergencyTerminated
        )
    }
}

impl fmt::Display for ProgramPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseChange {
    pub medication: String,
    pub from: DoseInfo,
    pub to: DoseInfo,
}

/// What happened when a week's decision was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub week: u32,
    pub issues: Vec<DecisionIssue>,
    pub changes: Vec<DoseChange>,
    /// Safety of the vitals carried in the decision itself, if any.
    pub reported_safety: Option<SafetyAssessment>,
}

impl DecisionReport {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

impl Validate for PatientState {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("patient_id", &self.patient_id)?;
        validate_positive_number("total_weeks", self.total_weeks, 1)?;
        validate_positive_number("current_week", self.current_week, 1)?;
        if self.current_week > self.total_weeks {
            return Err(TitrationError::InvalidValueError {
                field: "current_week".to_string(),
                value: self.current_week.to_string(),
                reason: format!("Exceeds total_weeks {}", self.total_weeks),
            });
        }
        for medication in &self.current_medications {
            validate_non_empty_string("medications.name", &medication.name)?;
        }
        Ok(())
    }
}

pub struct TitrationProgram<'a> {
    repository: &'a ProtocolRepository,
    evaluator: SafetyEvaluator,
    state: PatientState,
    phase: ProgramPhase,
    week_started: bool,
    weeks_completed: u32,
    termination_reason: Option<String>,
}

impl<'a> TitrationProgram<'a> {
    pub fn new(repository: &'a ProtocolRepository, state: PatientState) -> Result<Self> {
        Self::with_evaluator(repository, state, SafetyEvaluator::new())
    }

    pub fn with_evaluator(
        repository: &'a ProtocolRepository,
        state: PatientState,
        evaluator: SafetyEvaluator,
    ) -> Result<Self> {
        state.validate()?;

        tracing::info!(
            "🚀 Titration program for {} ({}) - {} weeks, {} medications",
            state.patient_name,
            state.patient_id,
            state.total_weeks,
            state.current_medications.len()
        );

        Ok(Self {
            repository,
            evaluator,
            state,
            phase: ProgramPhase::AwaitingInfo,
            week_started: false,
            weeks_completed: 0,
            termination_reason: None,
        })
    }

    pub fn phase(&self) -> ProgramPhase {
        self.phase
    }

    pub fn state(&self) -> &PatientState {
        &self.state
    }

    pub fn current_week(&self) -> u32 {
        self.state.current_week
    }

    pub fn weeks_completed(&self) -> u32 {
        self.weeks_completed
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn termination_reason(&self) -> Option<&str> {
        self.termination_reason.as_deref()
    }

    pub fn evaluator(&self) -> &SafetyEvaluator {
        &self.evaluator
    }

    fn ensure(&self, expected: &[ProgramPhase], operation: &str) -> Result<()> {
        if expected.contains(&self.phase) {
            Ok(())
        } else {
            Err(TitrationError::InvalidTransition {
                from: self.phase.to_string(),
                operation: operation.to_string(),
            })
        }
    }

    /// Records the week's signals and runs the safety screen. An emergency
    /// ends the program immediately.
    pub fn begin_week(&mut self, data: WeeklyData) -> Result<SafetyAssessment> {
        self.ensure(&[ProgramPhase::AwaitingInfo], "begin week")?;
        if self.week_started {
            return Err(TitrationError::InvalidTransition {
                from: self.phase.to_string(),
                operation: format!("begin week {} twice", self.state.current_week),
            });
        }
        if data.week_number != self.state.current_week {
            return Err(TitrationError::validation(format!(
                "Weekly data is for week {} but the program is in week {}",
                data.week_number, self.state.current_week
            )));
        }

        // 第一週的數值作為基準
        if self.state.baseline_vitals.is_none() {
            self.state.baseline_vitals = Some(data.vitals.clone());
        }
        if self.state.baseline_labs.is_none() {
            self.state.baseline_labs = data.labs.clone();
        }

        let assessment = self.evaluator.evaluate_week(&data);
        self.state.weekly_data.push(data);
        self.week_started = true;

        match assessment.level {
            SafetyLevel::Emergency => {
                let reason = assessment.concerns().join("; ");
                self.terminate(reason)?;
            }
            SafetyLevel::Unsafe | SafetyLevel::Caution => {
                tracing::warn!(
                    "⚠️ Week {} safety {}: {}",
                    self.state.current_week,
                    assessment.level,
                    assessment.concerns().join("; ")
                );
            }
            SafetyLevel::Safe => {}
        }

        Ok(assessment)
    }

    /// Moves to READY_FOR_DECISION only when all four categories are present.
    pub fn record_information(&mut self, status: InformationStatus) -> Result<ProgramPhase> {
        self.ensure(&[ProgramPhase::AwaitingInfo], "record information")?;
        if !self.week_started {
            return Err(TitrationError::InvalidTransition {
                from: self.phase.to_string(),
                operation: "record information before weekly data".to_string(),
            });
        }

        if status.is_complete() {
            self.phase = ProgramPhase::ReadyForDecision;
        } else {
            tracing::debug!(
                "Week {} still missing: {}",
                self.state.current_week,
                status.missing().join(", ")
            );
        }
        Ok(self.phase)
    }

    /// Applies the plan as given. Inconsistencies are reported in the
    /// returned report and logged, not corrected.
    pub fn apply_decision(&mut self, decision: &WeeklyDecision) -> Result<DecisionReport> {
        self.ensure(&[ProgramPhase::ReadyForDecision], "apply decision")?;

        let week = self.state.current_week;
        let issues = validate_decision(
            self.repository,
            &self.evaluator,
            &self.state,
            decision,
            self.state.latest_week(),
        );
        for issue in &issues {
            tracing::warn!("⚠️ Week {} decision issue: {}", week, issue);
        }

        let mut changes = Vec::new();
        for medication in self.state.current_medications.iter_mut() {
            let entry = decision
                .medication_plan
                .iter()
                .find(|e| e.name.trim().eq_ignore_ascii_case(medication.name.trim()));

            let new_dose = entry.map(WeeklyDecision::effective_dose);
            match new_dose {
                Some(dose) if !dose.same_dose(&medication.current_dose) => {
                    changes.push(DoseChange {
                        medication: medication.name.clone(),
                        from: medication.current_dose.clone(),
                        to: dose.clone(),
                    });
                    medication.current_dose = dose;
                    medication.weeks_on_current_dose = 0;
                }
                _ => medication.weeks_on_current_dose += 1,
            }
        }

        let reported_safety = decision.vitals.as_ref().map(|reported| {
            let vitals = VitalSigns::from(reported);
            SafetyAssessment::from_violations(self.evaluator.check_vitals(&vitals))
        });

        for change in &changes {
            tracing::info!(
                "💊 Week {} {}: {} → {}",
                week,
                change.medication,
                change.from,
                change.to
            );
        }

        self.phase = ProgramPhase::DecisionApplied;

        if let Some(assessment) = reported_safety.as_ref().filter(|a| a.is_emergency()) {
            self.terminate(assessment.concerns().join("; "))?;
        }

        Ok(DecisionReport {
            week,
            issues,
            changes,
            reported_safety,
        })
    }

    /// Closes the decision step without changing any dose, e.g. when the
    /// week's information never became complete.
    pub fn skip_decision(&mut self, reason: &str) -> Result<()> {
        self.ensure(
            &[ProgramPhase::AwaitingInfo, ProgramPhase::ReadyForDecision],
            "close week without decision",
        )?;
        if !self.week_started {
            return Err(TitrationError::InvalidTransition {
                from: self.phase.to_string(),
                operation: "close week before weekly data".to_string(),
            });
        }

        tracing::warn!(
            "⚠️ Week {} has no applied decision: {}",
            self.state.current_week,
            reason
        );
        for medication in self.state.current_medications.iter_mut() {
            medication.weeks_on_current_dose += 1;
        }
        self.phase = ProgramPhase::DecisionApplied;
        Ok(())
    }

    pub fn complete_week(&mut self) -> Result<()> {
        self.ensure(&[ProgramPhase::DecisionApplied], "complete week")?;
        self.weeks_completed += 1;
        self.phase = ProgramPhase::WeekComplete;
        tracing::debug!("Week {} complete", self.state.current_week);
        Ok(())
    }

    pub fn advance(&mut self) -> Result<ProgramPhase> {
        self.ensure(&[ProgramPhase::WeekComplete], "advance")?;

        if self.state.current_week >= self.state.total_weeks {
            self.phase = ProgramPhase::ProgramComplete;
            tracing::info!(
                "✅ Program complete after {} weeks",
                self.weeks_completed
            );
        } else {
            self.state.current_week += 1;
            self.week_started = false;
            self.phase = ProgramPhase::AwaitingInfo;
        }
        Ok(self.phase)
    }

    pub fn terminate(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.phase.is_terminal() {
            return Err(TitrationError::InvalidTransition {
                from: self.phase.to_string(),
                operation: "terminate".to_string(),
            });
        }
        let reason = reason.into();
        tracing::warn!(
            "❌ Emergency termination in week {}: {}",
            self.state.current_week,
            reason
        );
        self.phase = ProgramPhase::EmergencyTerminated;
        self.state.endpoint = Endpoint::AcuteDecompensationEd;
        self.termination_reason = Some(reason);
        Ok(())
    }

    /// Hands back the patient state with the final endpoint recorded.
    pub fn finalize(mut self, endpoint: Endpoint) -> PatientState {
        self.state.endpoint = endpoint;
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        CurrentMedication, DecisionAction, EducationLevel, MedicalLiteracy, MedicationClass,
        MedicationPlanEntry, PatientProfile,
    };
    use chrono::Utc;

    fn state(total_weeks: u32) -> PatientState {
        let profile = PatientProfile::new(EducationLevel::College, MedicalLiteracy::High, "");
        PatientState::new(
            "P3",
            "Machine Patient",
            profile,
            vec![CurrentMedication {
                name: "Carvedilol".to_string(),
                medication_class: MedicationClass::BetaBlocker,
                current_dose: DoseInfo::numeric(3.125, "mg", "twice daily"),
                target_dose: DoseInfo::numeric(25.0, "mg", "twice daily"),
                stage: "titration".to_string(),
                weeks_on_current_dose: 0,
            }],
            total_weeks,
        )
    }

    fn week(number: u32, systolic: u32, symptoms: &[&str]) -> WeeklyData {
        WeeklyData {
            week_number: number,
            vitals: VitalSigns {
                systolic_bp: Some(systolic),
                diastolic_bp: Some(75),
                heart_rate: Some(70),
                weight: None,
            },
            labs: None,
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            side_effects: Vec::new(),
            adherence_rate: 0.95,
            patient_concerns: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    fn increase(week: u32) -> WeeklyDecision {
        WeeklyDecision {
            week,
            vitals: None,
            symptoms_summary: String::new(),
            adherence_summary: String::new(),
            side_effects_summary: String::new(),
            medication_plan: vec![MedicationPlanEntry {
                name: "Carvedilol".to_string(),
                action: DecisionAction::Increase,
                old_dose: DoseInfo::numeric(3.125, "mg", "twice daily"),
                new_dose: DoseInfo::numeric(6.25, "mg", "twice daily"),
            }],
        }
    }

    #[test]
    fn test_full_week_cycle() {
        let repo = ProtocolRepository::load().unwrap();
        let mut program = TitrationProgram::new(&repo, state(2)).unwrap();

        let safety = program.begin_week(week(1, 120, &[])).unwrap();
        assert_eq!(safety.level, SafetyLevel::Safe);
        assert_eq!(
            program.record_information(InformationStatus::complete()).unwrap(),
            ProgramPhase::ReadyForDecision
        );

        let report = program.apply_decision(&increase(1)).unwrap();
        assert!(report.is_consistent());
        assert_eq!(report.changes.len(), 1);
        assert_eq!(program.phase(), ProgramPhase::DecisionApplied);

        program.complete_week().unwrap();
        assert_eq!(program.advance().unwrap(), ProgramPhase::AwaitingInfo);
        assert_eq!(program.current_week(), 2);

        program.begin_week(week(2, 118, &[])).unwrap();
        program.skip_decision("no decision").unwrap();
        program.complete_week().unwrap();
        assert_eq!(program.advance().unwrap(), ProgramPhase::ProgramComplete);
        assert_eq!(program.weeks_completed(), 2);

        let final_state = program.finalize(Endpoint::CompleteSuccess);
        let carvedilol = final_state.medication("carvedilol").unwrap();
        assert_eq!(carvedilol.current_dose.value.as_numeric(), Some(6.25));
        assert_eq!(carvedilol.weeks_on_current_dose, 1);
        assert_eq!(final_state.endpoint, Endpoint::CompleteSuccess);
        assert!(final_state.baseline_vitals.is_some());
    }

    #[test]
    fn test_incomplete_information_blocks_decision() {
        let repo = ProtocolRepository::load().unwrap();
        let mut program = TitrationProgram::new(&repo, state(4)).unwrap();
        program.begin_week(week(1, 120, &[])).unwrap();

        let partial = InformationStatus {
            have_vitals_info: true,
            ..InformationStatus::default()
        };
        assert_eq!(
            program.record_information(partial).unwrap(),
            ProgramPhase::AwaitingInfo
        );
        let err = program.apply_decision(&increase(1)).unwrap_err();
        assert!(matches!(err, TitrationError::InvalidTransition { .. }));
    }

    #[test]
    fn test_emergency_terminates_from_any_live_phase() {
        let repo = ProtocolRepository::load().unwrap();
        let mut program = TitrationProgram::new(&repo, state(8)).unwrap();

        let safety = program
            .begin_week(week(1, 120, &["severe chest pain at rest"]))
            .unwrap();
        assert!(safety.is_emergency());
        assert_eq!(program.phase(), ProgramPhase::EmergencyTerminated);
        assert!(program.is_finished());
        assert!(program.complete_week().is_err());
        assert!(program.terminate("again").is_err());
        assert_eq!(program.state().endpoint, Endpoint::AcuteDecompensationEd);
    }

    #[test]
    fn test_hold_with_changed_dose_is_flagged_and_applied() {
        let repo = ProtocolRepository::load().unwrap();
        let mut program = TitrationProgram::new(&repo, state(4)).unwrap();
        program.begin_week(week(1, 120, &[])).unwrap();
        program.record_information(InformationStatus::complete()).unwrap();

        let mut decision = increase(1);
        decision.medication_plan[0].action = DecisionAction::Hold;
        let report = program.apply_decision(&decision).unwrap();

        assert!(!report.is_consistent());
        assert_eq!(report.changes.len(), 1);
        assert_eq!(
            program.state().current_medications[0].current_dose.value.as_numeric(),
            Some(6.25)
        );
    }

    #[test]
    fn test_week_mismatch_and_double_begin_rejected() {
        let repo = ProtocolRepository::load().unwrap();
        let mut program = TitrationProgram::new(&repo, state(4)).unwrap();
        assert!(program.begin_week(week(2, 120, &[])).is_err());
        program.begin_week(week(1, 120, &[])).unwrap();
        assert!(program.begin_week(week(1, 120, &[])).is_err());
    }

    #[test]
    fn test_invalid_state_rejected() {
        let repo = ProtocolRepository::load().unwrap();
        assert!(TitrationProgram::new(&repo, state(0)).is_err());
    }
}

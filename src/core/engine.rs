//! Drives one simulated titration program from week 1 to its end and
//! persists the run record.

use crate::core::context::{TitrationContext, TitrationContextAggregator};
use crate::core::decision::ScriptedDecisions;
use crate::core::information::AllInformationPresent;
use crate::core::outcome::{classify_outcome, ClinicalOutcome, OutcomeEvidence};
use crate::core::program::{DecisionReport, ProgramPhase, TitrationProgram};
use crate::domain::model::{
    AdherencePattern, ConversationEntry, Endpoint, InformationStatus, LabPattern, LabValues,
    PatientProfile, PatientState, SideEffectPattern, SymptomPattern, VitalsPattern, WeeklyData,
    WeeklyDecision,
};
use crate::domain::ports::{DecisionSource, InformationClassifier, ResultStore};
use crate::protocol::ProtocolRepository;
use crate::safety::{SafetyAssessment, SafetyEvaluator, SafetyLevel, SafetyReport};
use crate::simulation::generators::describe_adherence;
use crate::simulation::PatientSimulator;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const AGENT_SPEAKER: &str = "HF Agent";
pub const PATIENT_SPEAKER: &str = "Patient";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub adherence_pattern: AdherencePattern,
    pub symptom_pattern: SymptomPattern,
    pub side_effect_pattern: SideEffectPattern,
    pub vitals_pattern: VitalsPattern,
    pub lab_pattern: LabPattern,
    pub target_endpoint: Endpoint,
    pub weeks: u32,
    pub seed: u64,
}

impl RunParameters {
    fn from_profile(profile: &PatientProfile, weeks: u32, seed: u64) -> Self {
        Self {
            adherence_pattern: profile.adherence_pattern,
            symptom_pattern: profile.symptom_pattern,
            side_effect_pattern: profile.side_effect_pattern,
            vitals_pattern: profile.vitals_pattern,
            lab_pattern: profile.lab_pattern,
            target_endpoint: profile.target_endpoint,
            weeks,
            seed,
        }
    }
}

/// Everything that happened in one week of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub week: u32,
    pub safety: SafetyAssessment,
    pub safety_report: SafetyReport,
    pub information: Option<InformationStatus>,
    pub context: Option<TitrationContext>,
    pub decision: Option<WeeklyDecision>,
    pub decision_report: Option<DecisionReport>,
}

/// The persisted result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub patient_id: String,
    pub patient_name: String,
    pub parameters: RunParameters,
    pub clinical_outcome: ClinicalOutcome,
    #[serde(default)]
    pub evidence: OutcomeEvidence,
    pub weeks_completed: u32,
    pub terminated_early: bool,
    #[serde(default)]
    pub termination_reason: Option<String>,
    pub conversation_log: Vec<ConversationEntry>,
    pub weekly_reports: Vec<WeeklyReport>,
    pub patient_state: PatientState,
    pub generated_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn file_name(patient_id: &str, weeks: u32) -> String {
        format!("simulation_{}_{}weeks.json", patient_id, weeks)
    }

    pub fn load<S: ResultStore + ?Sized>(storage: &S, path: &str) -> Result<Self> {
        let bytes = storage.read_file(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub record: RunRecord,
    pub output_path: String,
}

pub struct SimulationEngine<'a, S: ResultStore> {
    repository: &'a ProtocolRepository,
    simulator: PatientSimulator,
    evaluator: SafetyEvaluator,
    decisions: Box<dyn DecisionSource + 'a>,
    classifier: Box<dyn InformationClassifier + 'a>,
    storage: S,
    monitor: RunMonitor,
}

impl<'a, S: ResultStore> SimulationEngine<'a, S> {
    /// Defaults: every week fully informed, every medication continued.
    pub fn new(repository: &'a ProtocolRepository, simulator: PatientSimulator, storage: S) -> Self {
        Self {
            repository,
            simulator,
            evaluator: SafetyEvaluator::new(),
            decisions: Box::new(ScriptedDecisions::default()),
            classifier: Box::new(AllInformationPresent),
            storage,
            monitor: RunMonitor::new(false),
        }
    }

    pub fn with_decisions(mut self, decisions: impl DecisionSource + 'a) -> Self {
        self.decisions = Box::new(decisions);
        self
    }

    pub fn with_classifier(mut self, classifier: impl InformationClassifier + 'a) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn with_evaluator(mut self, evaluator: SafetyEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_monitor(mut self, monitor: RunMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn run(&mut self, state: PatientState) -> Result<RunOutcome> {
        let total_weeks = state.total_weeks;
        let aggregator =
            TitrationContextAggregator::new(self.repository).with_evaluator(self.evaluator.clone());
        let mut program =
            TitrationProgram::with_evaluator(self.repository, state, self.evaluator.clone())?;

        let mut conversation_log = Vec::new();
        let mut weekly_reports = Vec::new();

        while !program.is_finished() {
            let week = program.current_week();
            let week_start = conversation_log.len();
            tracing::info!("📋 Week {}/{}", week, total_weeks);

            let mut data = self.simulator.generate_weekly_data(program.state(), week);
            if PatientSimulator::should_trigger_endpoint(&program.state().profile, week, total_weeks) {
                if let Some(concern) = endpoint_concern(program.state().profile.target_endpoint) {
                    data.patient_concerns.push(concern.to_string());
                }
            }
            conversation_log.push(ConversationEntry::new(
                week,
                PATIENT_SPEAKER,
                patient_report(&data),
            ));

            let safety = program.begin_week(data)?;
            let safety_report = self.evaluator.safety_report(program.state());
            let (overall, concerns) = self.evaluator.assess_overall(program.state());
            if overall > SafetyLevel::Safe {
                tracing::warn!("🩺 Week {} safety {}: {}", week, overall, concerns.join("; "));
            }
            let mut report = WeeklyReport {
                week,
                safety,
                safety_report,
                information: None,
                context: None,
                decision: None,
                decision_report: None,
            };

            if program.is_finished() {
                conversation_log.push(ConversationEntry::new(week, AGENT_SPEAKER, EMERGENCY_MESSAGE));
                weekly_reports.push(report);
                break;
            }

            let information = self
                .classifier
                .classify(week, &conversation_log[week_start..]);
            program.record_information(information)?;
            report.information = Some(information);

            let context = aggregator.collect(program.state());
            let held = context.held_medications();
            if !held.is_empty() {
                tracing::warn!("⏸️ Week {} hold criteria met: {}", week, held.join(", "));
            }

            let agent_message = if program.phase() == ProgramPhase::ReadyForDecision {
                match self.decisions.decide(week, &context, program.state()) {
                    Ok(decision) => {
                        let applied = program.apply_decision(&decision)?;
                        let message = plan_message(&decision, &applied, &context, report.safety.level);
                        report.decision = Some(decision);
                        report.decision_report = Some(applied);
                        message
                    }
                    Err(e) => {
                        tracing::warn!("⚠️ Week {} decision unavailable: {}", week, e);
                        program.skip_decision(&e.to_string())?;
                        "Let's keep all of your medications the same for now.".to_string()
                    }
                }
            } else {
                let missing = information.missing().join(", ");
                program.skip_decision(&format!("information incomplete: {}", missing))?;
                format!(
                    "I still need to hear about your {} before changing anything. \
                     Keep taking your medications as they are.",
                    missing
                )
            };
            report.context = Some(context);

            if program.is_finished() {
                conversation_log.push(ConversationEntry::new(week, AGENT_SPEAKER, EMERGENCY_MESSAGE));
                weekly_reports.push(report);
                break;
            }

            conversation_log.push(ConversationEntry::new(week, AGENT_SPEAKER, agent_message));
            weekly_reports.push(report);

            program.complete_week()?;
            program.advance()?;
            self.monitor.log_stats(&format!("Week {}", week));
        }

        let evidence = OutcomeEvidence::from_log(&conversation_log);
        let weeks_completed = program.weeks_completed();
        let terminated_early = program.phase() == ProgramPhase::EmergencyTerminated;
        let termination_reason = program.termination_reason().map(str::to_string);
        let clinical_outcome =
            classify_outcome(&program.state().profile, &evidence, weeks_completed);
        let patient_state = program.finalize(clinical_outcome.to_endpoint());

        let record = RunRecord {
            patient_id: patient_state.patient_id.clone(),
            patient_name: patient_state.patient_name.clone(),
            parameters: RunParameters::from_profile(
                &patient_state.profile,
                total_weeks,
                self.simulator.seed(),
            ),
            clinical_outcome,
            evidence,
            weeks_completed,
            terminated_early,
            termination_reason,
            conversation_log,
            weekly_reports,
            patient_state,
            generated_at: Utc::now(),
        };

        let output_path = RunRecord::file_name(&record.patient_id, total_weeks);
        let json = serde_json::to_vec_pretty(&record)?;
        self.storage.write_file(&output_path, &json)?;

        tracing::info!(
            "✅ {} finished: {} after {} weeks → {}",
            record.patient_id,
            record.clinical_outcome,
            record.weeks_completed,
            output_path
        );
        self.monitor.log_final_stats();

        Ok(RunOutcome {
            record,
            output_path,
        })
    }
}

const EMERGENCY_MESSAGE: &str = "What you are describing needs urgent attention. Please go to the \
     emergency department or call 911 now. We will not make any medication changes today.";

fn endpoint_concern(target: Endpoint) -> Option<&'static str> {
    match target {
        Endpoint::AcuteDecompensationEd => Some("my symptoms are getting worse quickly"),
        Endpoint::NonAdherenceFailure => Some("I forgot several doses again"),
        Endpoint::SideEffectFailure => {
            Some("the side effects are making it hard to keep taking these")
        }
        _ => None,
    }
}

fn reading(value: Option<u32>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn lab_summary(labs: &LabValues) -> String {
    let parts: Vec<String> = [
        ("potassium", labs.potassium),
        ("creatinine", labs.creatinine),
        ("eGFR", labs.egfr),
        ("sodium", labs.sodium),
    ]
    .iter()
    .filter_map(|(name, value)| value.map(|v| format!("{} {}", name, v)))
    .collect();
    parts.join(", ")
}

/// The patient's weekly check-in as a single message.
fn patient_report(data: &WeeklyData) -> String {
    let mut message = format!(
        "My blood pressure is {}/{} and my heart rate is {}.",
        reading(data.vitals.systolic_bp),
        reading(data.vitals.diastolic_bp),
        reading(data.vitals.heart_rate)
    );
    if let Some(weight) = data.vitals.weight {
        message.push_str(&format!(" I weigh {:.1} lb.", weight));
    }
    if data.symptoms.is_empty() {
        message.push_str(" No symptoms this week.");
    } else {
        message.push_str(&format!(" Symptoms: {}.", data.symptoms.join(", ")));
    }
    message.push_str(&format!(
        " Medications: {}.",
        describe_adherence(data.adherence_rate).1
    ));
    if data.side_effects.is_empty() {
        message.push_str(" No side effects.");
    } else {
        message.push_str(&format!(" Side effects: {}.", data.side_effects.join(", ")));
    }
    if let Some(labs) = &data.labs {
        message.push_str(&format!(" Lab results: {}.", lab_summary(labs)));
    }
    for concern in &data.patient_concerns {
        message.push_str(&format!(" Also, {}.", concern));
    }
    message
}

fn plan_message(
    decision: &WeeklyDecision,
    applied: &DecisionReport,
    context: &TitrationContext,
    level: SafetyLevel,
) -> String {
    let mut lines = Vec::new();
    if level > SafetyLevel::Safe {
        lines.push(format!("Safety check this week: {}.", level));
    }
    let held = context.held_medications();
    if !held.is_empty() {
        lines.push(format!("Your latest results mean we hold off on raising {}.", held.join(", ")));
    }
    for entry in &decision.medication_plan {
        let dose = WeeklyDecision::effective_dose(entry);
        lines.push(match entry.action {
            a if a.keeps_dose() => format!("{}: {} at {}.", entry.name, a, entry.old_dose),
            a => format!("{}: {} from {} to {}.", entry.name, a, entry.old_dose, dose),
        });
    }
    if !applied.issues.is_empty() {
        lines.push(format!(
            "({} plan inconsistencies recorded for review.)",
            applied.issues.len()
        ));
    }
    lines.join(" ")
}

pub mod context;
pub mod decision;
pub mod engine;
pub mod information;
pub mod outcome;
pub mod program;

pub use crate::domain::model::{PatientState, WeeklyData, WeeklyDecision};
pub use crate::domain::ports::{ConfigProvider, DecisionSource, InformationClassifier, ResultStore};
pub use crate::utils::error::Result;
pub use context::{MedicationContext, TitrationContext, TitrationContextAggregator};
pub use decision::{validate_decision, DecisionIssue, DecisionIssueKind, ScriptedDecisions};
pub use engine::{RunOutcome, RunParameters, RunRecord, SimulationEngine, WeeklyReport};
pub use information::{AllInformationPresent, ScriptedInformation};
pub use outcome::{classify_outcome, ClinicalOutcome, OutcomeEvidence};
pub use program::{DecisionReport, DoseChange, ProgramPhase, TitrationProgram};

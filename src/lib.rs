pub mod config;
pub mod core;
pub mod domain;
pub mod protocol;
pub mod safety;
pub mod simulation;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{LocalStorage, RunConfig, ScenarioSet};

pub use core::{
    ClinicalOutcome, ProgramPhase, RunRecord, SimulationEngine, TitrationContext,
    TitrationContextAggregator, TitrationProgram,
};
pub use protocol::ProtocolRepository;
pub use safety::{SafetyEvaluator, SafetyLevel};
pub use simulation::PatientSimulator;
pub use utils::error::{Result, TitrationError};

pub mod cli;
pub mod scenario;
pub mod toml_config;

pub use cli::LocalStorage;
pub use scenario::{parse_dose_string, MedicationRecord, ScenarioRecord, ScenarioSet};
pub use toml_config::{PatternOverrides, RunConfig, SimulationSection};

#[cfg(feature = "cli")]
use crate::domain::model::{
    AdherencePattern, Endpoint, LabPattern, SideEffectPattern, SymptomPattern, VitalsPattern,
};
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "hf-titration")]
#[command(about = "Heart-failure medication titration simulator")]
pub struct CliConfig {
    /// Scenario file ({"conversations": [...]})
    #[arg(long, default_value = "all_conversations.json")]
    pub scenarios: String,

    #[arg(long)]
    pub patient_id: Option<String>,

    #[arg(long)]
    pub weeks: Option<u32>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long)]
    pub adherence: Option<AdherencePattern>,

    #[arg(long)]
    pub symptoms: Option<SymptomPattern>,

    #[arg(long)]
    pub side_effects: Option<SideEffectPattern>,

    #[arg(long)]
    pub vitals: Option<VitalsPattern>,

    #[arg(long)]
    pub labs: Option<LabPattern>,

    #[arg(long)]
    pub target_endpoint: Option<Endpoint>,

    /// Defaults to "simulated_conversations"
    #[arg(long)]
    pub results_dir: Option<String>,

    /// JSON array of weekly decisions
    #[arg(long)]
    pub decisions: Option<String>,

    /// JSON table of per-week information flags
    #[arg(long)]
    pub info_flags: Option<String>,

    /// TOML run config; flags given here override it
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, help = "List available scenarios and exit")]
    pub list: bool,

    #[arg(long, help = "Print the medication catalog grouped by class and exit")]
    pub catalog: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[arg(long, help = "Log process CPU and memory per week")]
    pub monitor: bool,

    #[arg(long, help = "Print the week-1 titration context and exit")]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn pattern_overrides(&self) -> PatternOverrides {
        PatternOverrides {
            adherence: self.adherence,
            symptoms: self.symptoms,
            side_effects: self.side_effects,
            vitals: self.vitals,
            labs: self.labs,
            target_endpoint: self.target_endpoint,
        }
    }

    /// Loads the TOML config if given, layers the flags on top and validates.
    pub fn resolve(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📋 Loading run config from {}", path);
                RunConfig::from_file(path)?
            }
            None => RunConfig::default(),
        };

        if let Some(weeks) = self.weeks {
            config.simulation.weeks = weeks;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
        }
        if let Some(dir) = &self.results_dir {
            config.simulation.results_dir = dir.clone();
        }
        config.patterns.merge(&self.pattern_overrides());

        config.validate()?;
        Ok(config)
    }
}

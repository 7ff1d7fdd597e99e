use crate::domain::model::{
    AdherencePattern, Endpoint, LabPattern, PatientProfile, SideEffectPattern, SymptomPattern,
    VitalsPattern,
};
use crate::domain::ports::ConfigProvider;
use crate::simulation::SimulationBaseline;
use crate::utils::error::{Result, TitrationError};
use crate::utils::validation::{validate_path, validate_positive_number, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_WEEKS: u32 = 8;
pub const MAX_WEEKS: u32 = 52;
pub const DEFAULT_RESULTS_DIR: &str = "simulated_conversations";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub weeks: u32,
    pub seed: Option<u64>,
    pub results_dir: String,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            weeks: DEFAULT_WEEKS,
            seed: None,
            results_dir: DEFAULT_RESULTS_DIR.to_string(),
        }
    }
}

/// Pattern overrides. Unset fields leave the profile's value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternOverrides {
    pub adherence: Option<AdherencePattern>,
    pub symptoms: Option<SymptomPattern>,
    pub side_effects: Option<SideEffectPattern>,
    pub vitals: Option<VitalsPattern>,
    pub labs: Option<LabPattern>,
    pub target_endpoint: Option<Endpoint>,
}

impl PatternOverrides {
    pub fn apply(&self, profile: &mut PatientProfile) {
        if let Some(p) = self.adherence {
            profile.adherence_pattern = p;
        }
        if let Some(p) = self.symptoms {
            profile.symptom_pattern = p;
        }
        if let Some(p) = self.side_effects {
            profile.side_effect_pattern = p;
        }
        if let Some(p) = self.vitals {
            profile.vitals_pattern = p;
        }
        if let Some(p) = self.labs {
            profile.lab_pattern = p;
        }
        if let Some(e) = self.target_endpoint {
            profile.target_endpoint = e;
        }
    }

    /// Fields set in `other` win.
    pub fn merge(&mut self, other: &PatternOverrides) {
        self.adherence = other.adherence.or(self.adherence);
        self.symptoms = other.symptoms.or(self.symptoms);
        self.side_effects = other.side_effects.or(self.side_effects);
        self.vitals = other.vitals.or(self.vitals);
        self.labs = other.labs.or(self.labs);
        self.target_endpoint = other.target_endpoint.or(self.target_endpoint);
    }
}

/// Run configuration, from a TOML file or defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationSection,
    pub patterns: PatternOverrides,
    pub baseline: SimulationBaseline,
}

impl RunConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${RESULTS_DIR})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| TitrationError::config(format!("Invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("simulation.weeks", self.simulation.weeks, 1)?;
        validate_range("simulation.weeks", self.simulation.weeks, 1, MAX_WEEKS)?;
        validate_path("simulation.results_dir", &self.simulation.results_dir)?;
        if self.simulation.results_dir.contains("${") {
            return Err(TitrationError::InvalidValueError {
                field: "simulation.results_dir".to_string(),
                value: self.simulation.results_dir.clone(),
                reason: "Unresolved environment variable".to_string(),
            });
        }

        let b = &self.baseline;
        validate_range("baseline.systolic_bp", b.systolic_bp, 60, 250)?;
        validate_range("baseline.diastolic_bp", b.diastolic_bp, 30, 150)?;
        validate_range("baseline.heart_rate", b.heart_rate, 30, 200)?;
        validate_range("baseline.weight_lb", b.weight_lb, 50.0, 700.0)?;
        validate_range("baseline.adherence", b.adherence, 0.0, 1.0)?;
        Ok(())
    }
}

impl ConfigProvider for RunConfig {
    fn results_dir(&self) -> &str {
        &self.simulation.results_dir
    }

    fn total_weeks(&self) -> u32 {
        self.simulation.weeks
    }

    fn seed(&self) -> Option<u64> {
        self.simulation.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{EducationLevel, MedicalLiteracy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[simulation]
weeks = 12
seed = 42
results_dir = "./runs"

[patterns]
adherence = "declining"
symptoms = "acute_escalation_to_ed"
target_endpoint = "non_adherence_failure"

[baseline]
systolic_bp = 130
adherence = 0.9
"#;
        let config = RunConfig::from_toml_str(content).unwrap();
        assert_eq!(config.total_weeks(), 12);
        assert_eq!(config.seed(), Some(42));
        assert_eq!(config.results_dir(), "./runs");
        assert_eq!(config.patterns.adherence, Some(AdherencePattern::Declining));
        assert_eq!(config.baseline.systolic_bp, 130);
        assert_eq!(config.baseline.heart_rate, 75);
        assert!(config.validate().is_ok());

        let mut profile = PatientProfile::new(EducationLevel::College, MedicalLiteracy::High, "");
        config.patterns.apply(&mut profile);
        assert_eq!(profile.adherence_pattern, AdherencePattern::Declining);
        assert_eq!(profile.symptom_pattern, SymptomPattern::AcuteEscalationToEd);
        assert_eq!(profile.target_endpoint, Endpoint::NonAdherenceFailure);
        assert_eq!(profile.vitals_pattern, VitalsPattern::StableInGoalRange);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RunConfig::from_toml_str("").unwrap();
        assert_eq!(config.total_weeks(), DEFAULT_WEEKS);
        assert_eq!(config.results_dir(), DEFAULT_RESULTS_DIR);
        assert!(config.seed().is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HF_TITRATION_TEST_RESULTS", "/tmp/hf-results");
        let config =
            RunConfig::from_toml_str("[simulation]\nresults_dir = \"${HF_TITRATION_TEST_RESULTS}\"\n")
                .unwrap();
        assert_eq!(config.results_dir(), "/tmp/hf-results");
        std::env::remove_var("HF_TITRATION_TEST_RESULTS");

        let unresolved =
            RunConfig::from_toml_str("[simulation]\nresults_dir = \"${HF_TITRATION_UNSET_VAR}\"\n")
                .unwrap();
        assert!(unresolved.validate().is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let zero_weeks = RunConfig::from_toml_str("[simulation]\nweeks = 0\n").unwrap();
        assert!(zero_weeks.validate().is_err());

        let bad_adherence = RunConfig::from_toml_str("[baseline]\nadherence = 1.5\n").unwrap();
        assert!(bad_adherence.validate().is_err());

        assert!(RunConfig::from_toml_str("[patterns]\nadherence = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[simulation]\nweeks = 6\n")
            .unwrap();
        let config = RunConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.total_weeks(), 6);
    }
}

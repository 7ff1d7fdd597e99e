use crate::core::context::TitrationContext;
use crate::domain::model::{ConversationEntry, InformationStatus, PatientState, WeeklyDecision};
use crate::utils::error::Result;

/// Persists run records. Paths are relative to the store's base directory.
pub trait ResultStore {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

pub trait ConfigProvider {
    fn results_dir(&self) -> &str;
    fn total_weeks(&self) -> u32;
    fn seed(&self) -> Option<u64>;
}

/// Decides whether the week's conversation gathered all four information
/// categories. Implemented outside the core (an LLM, a script, a human).
pub trait InformationClassifier {
    fn classify(&self, week: u32, transcript: &[ConversationEntry]) -> InformationStatus;
}

/// Produces the weekly medication plan from the titration context.
pub trait DecisionSource {
    fn decide(
        &mut self,
        week: u32,
        context: &TitrationContext,
        state: &PatientState,
    ) -> Result<WeeklyDecision>;
}

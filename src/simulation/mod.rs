// 病患行為模式模擬：依週次與療程長度產生每週臨床訊號

pub mod generators;
pub mod phased;
pub mod simulator;

pub use generators::SimulationBaseline;
pub use phased::{PhaseFraction, WeekSchedule};
pub use simulator::PatientSimulator;

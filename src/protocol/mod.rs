// 藥物滴定協議：內建藥物目錄、劑量階梯、檢驗監測與參考表

pub mod lab_monitoring;
pub mod ladder;
pub mod reference;
pub mod repository;

pub use lab_monitoring::{LabMonitoringOverview, LabRequirement, MonitoringClass};
pub use ladder::NextDose;
pub use reference::ProtocolReference;
pub use repository::{normalize_name, ProtocolInfo, ProtocolRepository};

// 安全評估：生命徵象、檢驗值、症狀與服藥順從度的分級檢查

pub mod evaluator;

pub use evaluator::{
    HoldCheck, SafetyAssessment, SafetyEvaluator, SafetyLevel, SafetyReport, SafetyThresholds,
    SafetyViolation,
};

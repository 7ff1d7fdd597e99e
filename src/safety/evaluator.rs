use crate::domain::model::{
    DecisionAction, LabValues, MedicationProtocol, PatientState, VitalSigns, WeeklyData,
};
use crate::protocol::reference::GENERAL_HOLD_CRITERIA;
use crate::protocol::repository::ProtocolRepository;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered severity. Aggregation always takes the maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    #[default]
    Safe,
    Caution,
    Unsafe,
    Emergency,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::Caution => "caution",
            SafetyLevel::Unsafe => "unsafe",
            SafetyLevel::Emergency => "emergency",
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyViolation {
    pub level: SafetyLevel,
    pub rule: String,
    pub detail: String,
}

impl SafetyViolation {
    fn new(level: SafetyLevel, rule: &str, detail: String) -> Self {
        Self {
            level,
            rule: rule.to_string(),
            detail,
        }
    }
}

impl fmt::Display for SafetyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} - {}",
            self.level.as_str().to_uppercase(),
            self.rule,
            self.detail
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyAssessment {
    pub level: SafetyLevel,
    pub violations: Vec<SafetyViolation>,
}

impl SafetyAssessment {
    pub fn from_violations(violations: Vec<SafetyViolation>) -> Self {
        let level = violations
            .iter()
            .map(|v| v.level)
            .max()
            .unwrap_or(SafetyLevel::Safe);
        Self { level, violations }
    }

    pub fn is_emergency(&self) -> bool {
        self.level == SafetyLevel::Emergency
    }

    pub fn merge(mut self, other: SafetyAssessment) -> Self {
        self.level = self.level.max(other.level);
        self.violations.extend(other.violations);
        self
    }

    pub fn concerns(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldCheck {
    pub medication: String,
    pub should_hold: bool,
    pub hold_reasons: Vec<String>,
    pub special_monitoring: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub safe: bool,
    pub level: SafetyLevel,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyThresholds {
    pub systolic_emergency_low: u32,
    pub systolic_emergency_high: u32,
    pub systolic_min: u32,
    pub systolic_max: u32,
    /// Below this titration is unsafe even inside the physiological range.
    pub systolic_hold: u32,
    pub heart_rate_emergency_low: u32,
    pub heart_rate_emergency_high: u32,
    pub heart_rate_min: u32,
    pub heart_rate_max: u32,
    pub potassium_min: f64,
    pub potassium_max: f64,
    pub potassium_critical: f64,
    pub egfr_min: f64,
    pub sodium_min: f64,
    pub adherence_unsafe: f64,
    pub adherence_increase_caution: f64,
    pub emergency_phrases: Vec<String>,
}

impl Default for SafetyThresholds {
    fn default() -> Self {
        Self {
            systolic_emergency_low: 70,
            systolic_emergency_high: 220,
            systolic_min: 80,
            systolic_max: 200,
            systolic_hold: GENERAL_HOLD_CRITERIA.sbp_general_low as u32,
            heart_rate_emergency_low: 40,
            heart_rate_emergency_high: 150,
            heart_rate_min: 45,
            heart_rate_max: 120,
            potassium_min: 3.5,
            potassium_max: GENERAL_HOLD_CRITERIA.potassium_hold,
            potassium_critical: GENERAL_HOLD_CRITERIA.potassium_discontinue,
            egfr_min: GENERAL_HOLD_CRITERIA.egfr_critical_low,
            sodium_min: GENERAL_HOLD_CRITERIA.sodium_low,
            adherence_unsafe: 0.5,
            adherence_increase_caution: 0.8,
            emergency_phrases: [
                "chest pain",
                "severe chest pain",
                "crushing chest pain",
                "severe shortness of breath",
                "can't breathe",
                "syncope",
                "fainting",
                "passed out",
                "severe confusion",
                "unable to walk",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
        }
    }
}

/// Pure safety checks. Holds no patient state.
#[derive(Debug, Clone, Default)]
pub struct SafetyEvaluator {
    thresholds: SafetyThresholds,
}

impl SafetyEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: SafetyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SafetyThresholds {
        &self.thresholds
    }

    pub fn evaluate(
        &self,
        vitals: &VitalSigns,
        labs: Option<&LabValues>,
        symptoms: &[String],
        adherence_rate: f64,
    ) -> SafetyAssessment {
        let mut violations = self.check_vitals(vitals);
        if let Some(labs) = labs {
            violations.extend(self.check_labs(labs));
        }
        violations.extend(self.scan_symptoms(symptoms));

        if adherence_rate < self.thresholds.adherence_unsafe {
            violations.push(SafetyViolation::new(
                SafetyLevel::Unsafe,
                "Poor Adherence",
                format!(
                    "Adherence rate {:.0}% is dangerously low",
                    adherence_rate * 100.0
                ),
            ));
        }

        SafetyAssessment::from_violations(violations)
    }

    pub fn evaluate_week(&self, week: &WeeklyData) -> SafetyAssessment {
        self.evaluate(
            &week.vitals,
            week.labs.as_ref(),
            &week.symptoms,
            week.adherence_rate,
        )
    }

    pub fn check_vitals(&self, vitals: &VitalSigns) -> Vec<SafetyViolation> {
        let t = &self.thresholds;
        let mut violations = Vec::new();

        if let Some(sbp) = vitals.systolic_bp {
            let violation = if sbp <= t.systolic_emergency_low {
                Some((
                    SafetyLevel::Emergency,
                    "Critical Hypotension",
                    format!("Systolic BP {} mmHg - immediate medical attention required", sbp),
                ))
            } else if sbp < t.systolic_min {
                Some((
                    SafetyLevel::Unsafe,
                    "Hypotension",
                    format!("Systolic BP {} mmHg below safe range", sbp),
                ))
            } else if sbp < t.systolic_hold {
                Some((
                    SafetyLevel::Unsafe,
                    "Low Blood Pressure",
                    format!(
                        "Systolic BP {} mmHg below titration threshold {} mmHg",
                        sbp, t.systolic_hold
                    ),
                ))
            } else if sbp >= t.systolic_emergency_high {
                Some((
                    SafetyLevel::Emergency,
                    "Severe Hypertension",
                    format!("Systolic BP {} mmHg - immediate medical attention required", sbp),
                ))
            } else if sbp > t.systolic_max {
                Some((
                    SafetyLevel::Unsafe,
                    "Hypertension",
                    format!("Systolic BP {} mmHg above safe range", sbp),
                ))
            } else {
                None
            };
            violations.extend(violation.map(|(level, rule, detail)| SafetyViolation::new(level, rule, detail)));
        }

        if let Some(hr) = vitals.heart_rate {
            let violation = if hr <= t.heart_rate_emergency_low {
                Some((
                    SafetyLevel::Emergency,
                    "Severe Bradycardia",
                    format!("Heart rate {} bpm - immediate medical attention required", hr),
                ))
            } else if hr < t.heart_rate_min {
                Some((
                    SafetyLevel::Unsafe,
                    "Bradycardia",
                    format!("Heart rate {} bpm below safe range", hr),
                ))
            } else if hr >= t.heart_rate_emergency_high {
                Some((
                    SafetyLevel::Emergency,
                    "Severe Tachycardia",
                    format!("Heart rate {} bpm - immediate medical attention required", hr),
                ))
            } else if hr > t.heart_rate_max {
                Some((
                    SafetyLevel::Unsafe,
                    "Tachycardia",
                    format!("Heart rate {} bpm above safe range", hr),
                ))
            } else {
                None
            };
            violations.extend(violation.map(|(level, rule, detail)| SafetyViolation::new(level, rule, detail)));
        }

        violations
    }

    pub fn check_labs(&self, labs: &LabValues) -> Vec<SafetyViolation> {
        let t = &self.thresholds;
        let mut violations = Vec::new();

        if let Some(k) = labs.potassium {
            if k >= t.potassium_critical {
                violations.push(SafetyViolation::new(
                    SafetyLevel::Emergency,
                    "Critical Hyperkalemia",
                    format!("Potassium {} mEq/L - immediate intervention required", k),
                ));
            } else if k > t.potassium_max {
                violations.push(SafetyViolation::new(
                    SafetyLevel::Unsafe,
                    "Hyperkalemia",
                    format!("Potassium {} mEq/L above safe range", k),
                ));
            } else if k < t.potassium_min {
                violations.push(SafetyViolation::new(
                    SafetyLevel::Caution,
                    "Hypokalemia",
                    format!("Potassium {} mEq/L below normal range", k),
                ));
            }
        }

        if let Some(egfr) = labs.egfr {
            if egfr < t.egfr_min {
                violations.push(SafetyViolation::new(
                    SafetyLevel::Unsafe,
                    "Severe Renal Impairment",
                    format!("eGFR {} mL/min - medication adjustment required", egfr),
                ));
            }
        }

        if let Some(sodium) = labs.sodium {
            if sodium < t.sodium_min {
                violations.push(SafetyViolation::new(
                    SafetyLevel::Caution,
                    "Hyponatremia",
                    format!("Sodium {} mEq/L below {}", sodium, t.sodium_min),
                ));
            }
        }

        violations
    }

    pub fn contains_emergency_phrase(&self, text: &str) -> bool {
        let lower = text.to_lowercase().replace('\u{2019}', "'");
        self.thresholds
            .emergency_phrases
            .iter()
            .any(|phrase| lower.contains(phrase.as_str()))
    }

    /// One emergency violation per matching symptom, whatever the other values.
    pub fn scan_symptoms(&self, symptoms: &[String]) -> Vec<SafetyViolation> {
        symptoms
            .iter()
            .filter(|symptom| self.contains_emergency_phrase(symptom))
            .map(|symptom| {
                SafetyViolation::new(
                    SafetyLevel::Emergency,
                    "Emergency Symptom",
                    format!(
                        "Patient reports: '{}' - immediate medical evaluation required",
                        symptom
                    ),
                )
            })
            .collect()
    }

    pub fn check_hold_criteria(
        &self,
        protocol: &MedicationProtocol,
        vitals: &VitalSigns,
        labs: Option<&LabValues>,
        baseline_creatinine: Option<f64>,
    ) -> HoldCheck {
        let criteria = &protocol.hold_criteria;
        let mut reasons = Vec::new();

        if let Some(labs) = labs {
            if let Some(k) = labs.potassium {
                match (criteria.potassium_discontinue, criteria.potassium_high) {
                    (Some(stop), _) if k >= stop => {
                        reasons.push(format!("DISCONTINUE: Potassium {} ≥ {} mEq/L", k, stop))
                    }
                    (_, Some(high)) if k > high => {
                        reasons.push(format!("HOLD: Potassium {} > {} mEq/L", k, high))
                    }
                    _ => {}
                }
            }

            if let (Some(current), Some(baseline), Some(threshold)) = (
                labs.creatinine,
                baseline_creatinine,
                criteria.creatinine_increase_percent,
            ) {
                if baseline > 0.0 {
                    let rise = (current - baseline) / baseline * 100.0;
                    if rise > threshold {
                        reasons.push(format!(
                            "HOLD: Creatinine increased {:.1}% (>{}%) from baseline",
                            rise, threshold
                        ));
                    }
                }
            }

            if let (Some(egfr), Some(low)) = (labs.egfr, criteria.egfr_low) {
                if egfr < low {
                    reasons.push(format!("HOLD: eGFR {} < {} mL/min", egfr, low));
                }
            }
        }

        if let (Some(sbp), Some(low)) = (vitals.systolic_bp, criteria.sbp_low) {
            if f64::from(sbp) < low {
                reasons.push(format!("HOLD: Systolic BP {} < {} mmHg", sbp, low));
            }
        }

        if let Some(hr) = vitals.heart_rate.map(f64::from) {
            match (criteria.hr_very_low, criteria.hr_low) {
                (Some(critical), _) if hr < critical => {
                    reasons.push(format!("HOLD: Heart rate {} < {} bpm (critical)", hr, critical))
                }
                (_, Some(low)) if hr < low => {
                    reasons.push(format!("HOLD: Heart rate {} < {} bpm", hr, low))
                }
                _ => {}
            }
        }

        if !reasons.is_empty() {
            tracing::warn!("⚠️ Hold criteria met for {}: {}", protocol.name, reasons.join("; "));
        }

        HoldCheck {
            medication: protocol.name.clone(),
            should_hold: !reasons.is_empty(),
            hold_reasons: reasons,
            special_monitoring: criteria.special_monitoring(),
        }
    }

    /// Checks one proposed action against the medication's own hold criteria.
    /// Only increases can breach a threshold.
    pub fn validate_action(
        &self,
        repository: &ProtocolRepository,
        medication: &str,
        action: DecisionAction,
        week: &WeeklyData,
    ) -> Vec<SafetyViolation> {
        let Some(protocol) = repository.get(medication) else {
            return vec![SafetyViolation::new(
                SafetyLevel::Unsafe,
                "Unknown Medication",
                format!("No protocol found for medication: {}", medication),
            )];
        };

        if action != DecisionAction::Increase {
            return Vec::new();
        }

        let criteria = &protocol.hold_criteria;
        let mut violations = Vec::new();
        let mut breach = |detail: String| {
            violations.push(SafetyViolation::new(
                SafetyLevel::Unsafe,
                "Hold Criteria Violation",
                format!("Cannot increase {}: {}", protocol.name, detail),
            ))
        };

        let labs = week.labs.as_ref();
        if let (Some(k), Some(high)) = (labs.and_then(|l| l.potassium), criteria.potassium_high) {
            if k > high {
                breach(format!("potassium {} > {}", k, high));
            }
        }
        if let (Some(egfr), Some(low)) = (labs.and_then(|l| l.egfr), criteria.egfr_low) {
            if egfr < low {
                breach(format!("eGFR {} < {}", egfr, low));
            }
        }
        if let (Some(sbp), Some(low)) = (week.vitals.systolic_bp, criteria.sbp_low) {
            if f64::from(sbp) < low {
                breach(format!("SBP {} < {}", sbp, low));
            }
        }
        if let (Some(hr), Some(low)) = (week.vitals.heart_rate, criteria.hr_low) {
            if f64::from(hr) < low {
                breach(format!("HR {} < {}", hr, low));
            }
        }

        if week.adherence_rate < self.thresholds.adherence_increase_caution {
            violations.push(SafetyViolation::new(
                SafetyLevel::Caution,
                "Poor Adherence",
                format!(
                    "Consider addressing adherence ({:.0}%) before dose increase",
                    week.adherence_rate * 100.0
                ),
            ));
        }

        violations
    }

    /// Severity of the most recent week plus its concerns.
    pub fn assess_overall(&self, state: &PatientState) -> (SafetyLevel, Vec<String>) {
        let Some(latest) = state.latest_week() else {
            return (
                SafetyLevel::Caution,
                vec!["No patient data available for assessment".to_string()],
            );
        };

        let assessment = self.evaluate_week(latest);
        if assessment.violations.is_empty() {
            return (
                SafetyLevel::Safe,
                vec!["No safety concerns identified".to_string()],
            );
        }
        (assessment.level, assessment.concerns())
    }

    pub fn safety_report(&self, state: &PatientState) -> SafetyReport {
        let Some(latest) = state.latest_week() else {
            return SafetyReport {
                safe: false,
                level: SafetyLevel::Caution,
                violations: vec!["No patient data available".to_string()],
                recommendations: vec![
                    "Collect baseline patient data before proceeding".to_string()
                ],
            };
        };

        let assessment = self.evaluate_week(latest);
        let recommendations: &[&str] = match assessment.level {
            SafetyLevel::Emergency => &[
                "IMMEDIATE: Refer to emergency department",
                "Do not proceed with medication changes",
            ],
            SafetyLevel::Unsafe => &[
                "Hold medication changes until safety concerns addressed",
                "Consider dose reduction or medication hold",
            ],
            SafetyLevel::Caution => &["Proceed with caution", "Increase monitoring frequency"],
            SafetyLevel::Safe => &["Safe to proceed with titration protocol"],
        };

        SafetyReport {
            safe: assessment.level < SafetyLevel::Unsafe,
            level: assessment.level,
            violations: assessment.concerns(),
            recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
        }
    }
}

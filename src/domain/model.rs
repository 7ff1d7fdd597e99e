use crate::utils::error::{Result, TitrationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric ladder lookups treat doses within this distance as equal.
pub const DOSE_TOLERANCE: f64 = 1e-3;

/// Enums whose wire form is a fixed string, shared by serde, the CLI and config files.
macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TitrationError;

            fn from_str(s: &str) -> Result<Self> {
                let wanted = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
                    .ok_or_else(|| TitrationError::InvalidValueError {
                        field: stringify!($name).to_string(),
                        value: s.to_string(),
                        reason: format!(
                            "expected one of: {}",
                            $name::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                        ),
                    })
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Doses
// ---------------------------------------------------------------------------

/// A dose value. Ladder comparisons branch on the tag: a numeric dose never
/// matches a combination entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDoseValue", into = "RawDoseValue")]
pub enum DoseValue {
    Numeric(f64),
    /// Co-formulated strengths such as "24/26", or fixed-dose tablet counts.
    Combination(String),
    /// "as needed" style dosing with no ladder position.
    Flexible(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDoseValue {
    Number(f64),
    Text(String),
}

impl From<RawDoseValue> for DoseValue {
    fn from(raw: RawDoseValue) -> Self {
        match raw {
            RawDoseValue::Number(n) => DoseValue::Numeric(n),
            RawDoseValue::Text(text) => DoseValue::from_text(&text),
        }
    }
}

impl From<DoseValue> for RawDoseValue {
    fn from(value: DoseValue) -> Self {
        match value {
            DoseValue::Numeric(n) => RawDoseValue::Number(n),
            DoseValue::Combination(s) | DoseValue::Flexible(s) => RawDoseValue::Text(s),
        }
    }
}

impl DoseValue {
    pub const FLEXIBLE_MARKER: &'static str = "as needed";

    pub fn is_flexible_phrase(text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("as needed") || lower.contains("dose adjustment")
    }

    /// Classifies a textual dose. Flexible phrases win over everything else.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if Self::is_flexible_phrase(trimmed) {
            DoseValue::Flexible(trimmed.to_string())
        } else {
            DoseValue::Combination(trimmed.to_string())
        }
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            DoseValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DoseValue::Numeric(_))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, DoseValue::Numeric(n) if n.abs() < DOSE_TOLERANCE)
    }

    pub fn matches(&self, other: &DoseValue) -> bool {
        match (self, other) {
            (DoseValue::Numeric(a), DoseValue::Numeric(b)) => (a - b).abs() < DOSE_TOLERANCE,
            (DoseValue::Combination(a), DoseValue::Combination(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for DoseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseValue::Numeric(n) => write!(f, "{}", n),
            DoseValue::Combination(s) | DoseValue::Flexible(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseInfo {
    pub value: DoseValue,
    pub unit: String,
    pub frequency: String,
}

impl DoseInfo {
    pub fn new(value: DoseValue, unit: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            frequency: frequency.into(),
        }
    }

    pub fn numeric(value: f64, unit: impl Into<String>, frequency: impl Into<String>) -> Self {
        Self::new(DoseValue::Numeric(value), unit, frequency)
    }

    pub fn with_value(&self, value: DoseValue) -> Self {
        Self {
            value,
            unit: self.unit.clone(),
            frequency: self.frequency.clone(),
        }
    }

    /// Same value (ladder tolerance), unit and frequency.
    pub fn same_dose(&self, other: &DoseInfo) -> bool {
        let same_value = match (&self.value, &other.value) {
            (DoseValue::Flexible(a), DoseValue::Flexible(b)) => a == b,
            (a, b) => a.matches(b),
        };
        same_value && self.unit == other.unit && self.frequency == other.frequency
    }
}

impl fmt::Display for DoseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", self.value, self.unit, self.frequency)
    }
}

// ---------------------------------------------------------------------------
// Protocol definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MedicationClass {
    #[serde(rename = "ACE-I", alias = "ACE Inhibitor")]
    AceInhibitor,
    #[serde(rename = "ARB")]
    Arb,
    #[serde(rename = "ARNI")]
    Arni,
    #[serde(rename = "Aldosterone Antagonist")]
    AldosteroneAntagonist,
    #[serde(rename = "Beta Blocker", alias = "Beta-Blocker")]
    BetaBlocker,
    #[serde(rename = "Vasodilator")]
    Vasodilator,
    #[serde(rename = "Nitrate")]
    Nitrate,
    #[serde(rename = "Fixed-Dose Combination")]
    FixedDoseCombination,
    #[serde(rename = "SGLT-2 Inhibitor", alias = "SGLT2 Inhibitor")]
    Sglt2Inhibitor,
    #[serde(rename = "sGC Stimulator")]
    SgcStimulator,
    #[serde(rename = "Loop Diuretic")]
    LoopDiuretic,
    #[serde(rename = "Thiazide Diuretic")]
    ThiazideDiuretic,
}

impl MedicationClass {
    pub const ALL: &'static [MedicationClass] = &[
        MedicationClass::AceInhibitor,
        MedicationClass::Arb,
        MedicationClass::Arni,
        MedicationClass::AldosteroneAntagonist,
        MedicationClass::BetaBlocker,
        MedicationClass::Vasodilator,
        MedicationClass::Nitrate,
        MedicationClass::FixedDoseCombination,
        MedicationClass::Sglt2Inhibitor,
        MedicationClass::SgcStimulator,
        MedicationClass::LoopDiuretic,
        MedicationClass::ThiazideDiuretic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MedicationClass::AceInhibitor => "ACE-I",
            MedicationClass::Arb => "ARB",
            MedicationClass::Arni => "ARNI",
            MedicationClass::AldosteroneAntagonist => "Aldosterone Antagonist",
            MedicationClass::BetaBlocker => "Beta Blocker",
            MedicationClass::Vasodilator => "Vasodilator",
            MedicationClass::Nitrate => "Nitrate",
            MedicationClass::FixedDoseCombination => "Fixed-Dose Combination",
            MedicationClass::Sglt2Inhibitor => "SGLT-2 Inhibitor",
            MedicationClass::SgcStimulator => "sGC Stimulator",
            MedicationClass::LoopDiuretic => "Loop Diuretic",
            MedicationClass::ThiazideDiuretic => "Thiazide Diuretic",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            MedicationClass::AceInhibitor => &["ACE Inhibitor"],
            MedicationClass::BetaBlocker => &["Beta-Blocker"],
            MedicationClass::Sglt2Inhibitor => &["SGLT2 Inhibitor"],
            _ => &[],
        }
    }
}

impl fmt::Display for MedicationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedicationClass {
    type Err = TitrationError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        MedicationClass::ALL
            .iter()
            .copied()
            .find(|class| {
                class.as_str().eq_ignore_ascii_case(wanted)
                    || class.aliases().iter().any(|a| a.eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| TitrationError::InvalidValueError {
                field: "medication class".to_string(),
                value: s.to_string(),
                reason: "unknown heart failure medication class".to_string(),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potassium_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potassium_discontinue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creatinine_increase_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub egfr_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbp_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_very_low: Option<f64>,
    /// Boolean criteria such as `drug_induced_lupus`, present means "true".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_flags: Vec<String>,
}

impl HoldCriteria {
    pub fn special_monitoring(&self) -> Vec<String> {
        self.special_flags
            .iter()
            .map(|flag| format!("Monitor for {}", flag.replace('_', " ")))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightBasedMaximum {
    pub dose: DoseInfo,
    pub weight_threshold_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationProtocol {
    pub key: String,
    pub name: String,
    #[serde(rename = "class")]
    pub medication_class: MedicationClass,
    pub starting_dose: DoseInfo,
    pub incremental_doses: Vec<DoseValue>,
    pub maximum_dose: DoseInfo,
    pub contraindications: Vec<String>,
    pub hold_criteria: HoldCriteria,
    pub requires_titration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monitoring_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_starting_dose: Option<DoseInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_based_maximum: Option<WeightBasedMaximum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titration_interval: Option<String>,
}

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMedication {
    pub name: String,
    #[serde(rename = "class")]
    pub medication_class: MedicationClass,
    pub current_dose: DoseInfo,
    pub target_dose: DoseInfo,
    pub stage: String,
    #[serde(default)]
    pub weeks_on_current_dose: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalSigns {
    pub systolic_bp: Option<u32>,
    pub diastolic_bp: Option<u32>,
    pub heart_rate: Option<u32>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabValues {
    pub potassium: Option<f64>,
    pub creatinine: Option<f64>,
    pub egfr: Option<f64>,
    pub sodium: Option<f64>,
    pub hemoglobin: Option<f64>,
    pub bun: Option<f64>,
}

named_enum!(AdherencePattern {
    ConsistentlyHigh => "consistently_high",
    Declining => "declining",
    Improving => "improving",
    Fluctuating => "fluctuating",
    SingleDropThenStable => "single_drop_then_stable",
});

named_enum!(SymptomPattern {
    SteadyImprovement => "steady_improvement",
    MixedResponse => "mixed_response",
    Plateau => "plateau",
    ProgressiveWorsening => "progressive_worsening",
    AcuteEscalationToEd => "acute_escalation_to_ed",
});

named_enum!(SideEffectPattern {
    None => "none",
    MildTolerable => "mild_tolerable",
    SideEffectEscalation => "side_effect_escalation",
    EarlyIntolerance => "early_intolerance",
});

named_enum!(VitalsPattern {
    StableInGoalRange => "stable_in_goal_range",
    BpTrendingLow => "bp_trending_low",
    BpTrendingHigh => "bp_trending_high",
    WeightGainFluidOverload => "weight_gain_fluid_overload",
    Oscillating => "oscillating",
});

named_enum!(LabPattern {
    LabsNormal => "labs_normal",
    MildRenalDrift => "mild_renal_drift",
    ProgressiveRenalImpairment => "progressive_renal_impairment",
    ElectrolyteInstability => "electrolyte_instability",
    LabsMissingOrDelayed => "labs_missing_or_delayed",
});

named_enum!(
    /// Terminal classification of a program, "in progress" until finalized.
    Endpoint {
        CompleteSuccess => "complete_success",
        PartialSuccess => "partial_success",
        NonAdherenceFailure => "non_adherence_failure",
        SideEffectFailure => "side_effect_failure",
        AcuteDecompensationEd => "acute_decompensation_ed",
        HospitalizationPause => "hospitalization_pause",
        PatientWithdrawal => "patient_withdrawal",
        InProgress => "in_progress",
    }
);

named_enum!(EducationLevel {
    HighSchool => "High School",
    SomeCollege => "Some College",
    College => "College",
    Graduate => "Graduate",
});

named_enum!(MedicalLiteracy {
    Low => "Low",
    Moderate => "Moderate",
    High => "High",
});

impl Default for AdherencePattern {
    fn default() -> Self {
        AdherencePattern::ConsistentlyHigh
    }
}

impl Default for SymptomPattern {
    fn default() -> Self {
        SymptomPattern::SteadyImprovement
    }
}

impl Default for SideEffectPattern {
    fn default() -> Self {
        SideEffectPattern::None
    }
}

impl Default for VitalsPattern {
    fn default() -> Self {
        VitalsPattern::StableInGoalRange
    }
}

impl Default for LabPattern {
    fn default() -> Self {
        LabPattern::LabsNormal
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::CompleteSuccess
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub education_level: EducationLevel,
    pub medical_literacy: MedicalLiteracy,
    pub description: String,
    #[serde(default)]
    pub adherence_pattern: AdherencePattern,
    #[serde(default)]
    pub symptom_pattern: SymptomPattern,
    #[serde(default)]
    pub side_effect_pattern: SideEffectPattern,
    #[serde(default)]
    pub vitals_pattern: VitalsPattern,
    #[serde(default)]
    pub lab_pattern: LabPattern,
    #[serde(default)]
    pub target_endpoint: Endpoint,
}

impl PatientProfile {
    pub fn new(
        education_level: EducationLevel,
        medical_literacy: MedicalLiteracy,
        description: impl Into<String>,
    ) -> Self {
        Self {
            education_level,
            medical_literacy,
            description: description.into(),
            adherence_pattern: AdherencePattern::default(),
            symptom_pattern: SymptomPattern::default(),
            side_effect_pattern: SideEffectPattern::default(),
            vitals_pattern: VitalsPattern::default(),
            lab_pattern: LabPattern::default(),
            target_endpoint: Endpoint::default(),
        }
    }
}

/// One week of simulated clinical signals. Append-only history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyData {
    pub week_number: u32,
    pub vitals: VitalSigns,
    pub labs: Option<LabValues>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
    pub adherence_rate: f64,
    #[serde(default)]
    pub patient_concerns: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientState {
    pub patient_id: String,
    pub patient_name: String,
    pub profile: PatientProfile,
    pub current_medications: Vec<CurrentMedication>,
    pub current_week: u32,
    pub total_weeks: u32,
    #[serde(default)]
    pub weekly_data: Vec<WeeklyData>,
    #[serde(default = "in_progress")]
    pub endpoint: Endpoint,
    #[serde(default)]
    pub comorbidities: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub baseline_vitals: Option<VitalSigns>,
    #[serde(default)]
    pub baseline_labs: Option<LabValues>,
}

fn in_progress() -> Endpoint {
    Endpoint::InProgress
}

impl PatientState {
    pub fn new(
        patient_id: impl Into<String>,
        patient_name: impl Into<String>,
        profile: PatientProfile,
        current_medications: Vec<CurrentMedication>,
        total_weeks: u32,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            patient_name: patient_name.into(),
            profile,
            current_medications,
            current_week: 1,
            total_weeks,
            weekly_data: Vec::new(),
            endpoint: Endpoint::InProgress,
            comorbidities: Vec::new(),
            allergies: Vec::new(),
            baseline_vitals: None,
            baseline_labs: None,
        }
    }

    pub fn latest_week(&self) -> Option<&WeeklyData> {
        self.weekly_data.last()
    }

    pub fn medication(&self, name: &str) -> Option<&CurrentMedication> {
        self.current_medications
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn medication_names(&self) -> Vec<&str> {
        self.current_medications.iter().map(|m| m.name.as_str()).collect()
    }

    /// Baseline labs if recorded, otherwise the first week that had labs.
    pub fn baseline_creatinine(&self) -> Option<f64> {
        self.baseline_labs
            .as_ref()
            .and_then(|labs| labs.creatinine)
            .or_else(|| {
                self.weekly_data
                    .iter()
                    .filter_map(|w| w.labs.as_ref().and_then(|l| l.creatinine))
                    .next()
            })
    }
}

// ---------------------------------------------------------------------------
// Weekly decision hand-off
// ---------------------------------------------------------------------------

/// Which of the four information categories the week's conversation covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationStatus {
    #[serde(default)]
    pub have_symptoms_info: bool,
    #[serde(default)]
    pub have_vitals_info: bool,
    #[serde(default)]
    pub have_adherence_info: bool,
    #[serde(default)]
    pub have_side_effects_info: bool,
}

impl InformationStatus {
    pub fn complete() -> Self {
        Self {
            have_symptoms_info: true,
            have_vitals_info: true,
            have_adherence_info: true,
            have_side_effects_info: true,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.have_symptoms_info
            && self.have_vitals_info
            && self.have_adherence_info
            && self.have_side_effects_info
    }

    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.have_symptoms_info {
            missing.push("symptoms");
        }
        if !self.have_vitals_info {
            missing.push("vitals");
        }
        if !self.have_adherence_info {
            missing.push("adherence");
        }
        if !self.have_side_effects_info {
            missing.push("side effects");
        }
        missing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Increase,
    Decrease,
    #[serde(alias = "maintain")]
    Continue,
    Hold,
    #[serde(alias = "discontinue")]
    Stop,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Increase => "increase",
            DecisionAction::Decrease => "decrease",
            DecisionAction::Continue => "continue",
            DecisionAction::Hold => "hold",
            DecisionAction::Stop => "stop",
        }
    }

    pub fn keeps_dose(&self) -> bool {
        matches!(self, DecisionAction::Continue | DecisionAction::Hold)
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedVitals {
    pub blood_pressure_systolic: Option<u32>,
    pub blood_pressure_diastolic: Option<u32>,
    pub heart_rate: Option<u32>,
}

impl From<&ReportedVitals> for VitalSigns {
    fn from(reported: &ReportedVitals) -> Self {
        VitalSigns {
            systolic_bp: reported.blood_pressure_systolic,
            diastolic_bp: reported.blood_pressure_diastolic,
            heart_rate: reported.heart_rate,
            weight: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationPlanEntry {
    pub name: String,
    pub action: DecisionAction,
    pub old_dose: DoseInfo,
    pub new_dose: DoseInfo,
}

/// The structured plan produced by the external decision-maker for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyDecision {
    pub week: u32,
    #[serde(default)]
    pub vitals: Option<ReportedVitals>,
    #[serde(default)]
    pub symptoms_summary: String,
    #[serde(default)]
    pub adherence_summary: String,
    #[serde(default)]
    pub side_effects_summary: String,
    #[serde(default)]
    pub medication_plan: Vec<MedicationPlanEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub week: u32,
    pub speaker: String,
    pub message: String,
}

impl ConversationEntry {
    pub fn new(week: u32, speaker: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            week,
            speaker: speaker.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dose_value_round_trips_by_tag() {
        let json = r#"[20.0, "24/26", "as needed", "1 tablet"]"#;
        let values: Vec<DoseValue> = serde_json::from_str(json).unwrap();
        assert_eq!(values[0], DoseValue::Numeric(20.0));
        assert_eq!(values[1], DoseValue::Combination("24/26".to_string()));
        assert_eq!(values[2], DoseValue::Flexible("as needed".to_string()));
        assert_eq!(values[3], DoseValue::Combination("1 tablet".to_string()));

        let back = serde_json::to_string(&values).unwrap();
        assert_eq!(back, r#"[20.0,"24/26","as needed","1 tablet"]"#);
    }

    #[test]
    fn test_numeric_never_matches_combination() {
        let numeric = DoseValue::Numeric(24.0);
        let combo = DoseValue::Combination("24/26".to_string());
        assert!(!numeric.matches(&combo));
        assert!(!combo.matches(&numeric));
        assert!(DoseValue::Numeric(3.125).matches(&DoseValue::Numeric(3.1254)));
        assert!(!DoseValue::Numeric(3.125).matches(&DoseValue::Numeric(3.13)));
    }

    #[test]
    fn test_medication_class_aliases() {
        let class: MedicationClass = serde_json::from_str(r#""Beta-Blocker""#).unwrap();
        assert_eq!(class, MedicationClass::BetaBlocker);
        assert_eq!(serde_json::to_string(&class).unwrap(), r#""Beta Blocker""#);
        assert_eq!(
            "sglt2 inhibitor".parse::<MedicationClass>().unwrap(),
            MedicationClass::Sglt2Inhibitor
        );
        assert!("Antihistamine".parse::<MedicationClass>().is_err());
    }

    #[test]
    fn test_pattern_from_str() {
        assert_eq!(
            "declining".parse::<AdherencePattern>().unwrap(),
            AdherencePattern::Declining
        );
        assert_eq!(
            "Some College".parse::<EducationLevel>().unwrap(),
            EducationLevel::SomeCollege
        );
        assert!("sometimes".parse::<AdherencePattern>().is_err());
    }

    #[test]
    fn test_information_status_missing() {
        let status = InformationStatus {
            have_symptoms_info: true,
            have_vitals_info: false,
            have_adherence_info: true,
            have_side_effects_info: false,
        };
        assert!(!status.is_complete());
        assert_eq!(status.missing(), vec!["vitals", "side effects"]);
        assert!(InformationStatus::complete().is_complete());
    }

    #[test]
    fn test_decision_action_aliases() {
        let action: DecisionAction = serde_json::from_str(r#""maintain""#).unwrap();
        assert_eq!(action, DecisionAction::Continue);
        let action: DecisionAction = serde_json::from_str(r#""discontinue""#).unwrap();
        assert_eq!(action, DecisionAction::Stop);
    }
}

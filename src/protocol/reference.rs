//! Fixed clinical reference tables. The safety evaluator takes its defaults
//! from them and every weekly titration context carries a copy.

use crate::domain::model::Endpoint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureRange {
    pub sbp_min: u32,
    pub sbp_max: u32,
    pub dbp_min: u32,
    pub dbp_max: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalSignParameters {
    pub bp_titration_range: BloodPressureRange,
    pub bp_goal_range: BloodPressureRange,
    pub hr_titration_minimum: u32,
    pub hr_goal_min: u32,
    pub hr_goal_max: u32,
}

pub const VITAL_SIGN_PARAMETERS: VitalSignParameters = VitalSignParameters {
    bp_titration_range: BloodPressureRange {
        sbp_min: 80,
        sbp_max: 200,
        dbp_min: 40,
        dbp_max: 110,
    },
    bp_goal_range: BloodPressureRange {
        sbp_min: 90,
        sbp_max: 120,
        dbp_min: 50,
        dbp_max: 80,
    },
    hr_titration_minimum: 50,
    hr_goal_min: 55,
    hr_goal_max: 90,
};

impl VitalSignParameters {
    pub fn bp_in_goal_range(&self, systolic: u32, diastolic: u32) -> bool {
        let goal = &self.bp_goal_range;
        (goal.sbp_min..=goal.sbp_max).contains(&systolic)
            && (goal.dbp_min..=goal.dbp_max).contains(&diastolic)
    }

    pub fn hr_in_goal_range(&self, heart_rate: u32) -> bool {
        (self.hr_goal_min..=self.hr_goal_max).contains(&heart_rate)
    }
}

/// Class-independent hold thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneralHoldCriteria {
    pub potassium_hold: f64,
    pub potassium_discontinue: f64,
    pub creatinine_increase_percent: f64,
    pub egfr_critical_low: f64,
    pub egfr_caution_low: f64,
    pub sodium_low: f64,
    pub sbp_symptomatic_low: f64,
    pub sbp_general_low: f64,
    pub hr_hold: f64,
    pub hr_critical: f64,
}

pub const GENERAL_HOLD_CRITERIA: GeneralHoldCriteria = GeneralHoldCriteria {
    potassium_hold: 5.5,
    potassium_discontinue: 6.0,
    creatinine_increase_percent: 30.0,
    egfr_critical_low: 20.0,
    egfr_caution_low: 30.0,
    sodium_low: 130.0,
    sbp_symptomatic_low: 80.0,
    sbp_general_low: 90.0,
    hr_hold: 50.0,
    hr_critical: 45.0,
};

pub fn endpoint_description(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::CompleteSuccess => {
            "Patient demonstrates consistent progress throughout the titration program, tolerating medication increases well and achieving all target therapeutic doses."
        }
        Endpoint::PartialSuccess => {
            "Patient shows variable responses to medication adjustments, with some drugs reaching their intended targets while others plateau at submaximal doses due to tolerance limitations or mild side effects."
        }
        Endpoint::NonAdherenceFailure => {
            "Patient exhibits a progressive pattern of missed doses and declining medication-taking behavior, preventing safe titration advancement."
        }
        Endpoint::SideEffectFailure => {
            "Patient experiences increasingly problematic adverse effects from medications that raise safety concerns despite dose adjustments or management attempts."
        }
        Endpoint::AcuteDecompensationEd => {
            "During the conversation, the patient reports acute worsening heart failure symptoms requiring immediate medical evaluation and emergency department referral."
        }
        Endpoint::HospitalizationPause => {
            "Patient experiences significant clinical deterioration requiring hospital admission, with temporary suspension of the titration program."
        }
        Endpoint::PatientWithdrawal => {
            "Patient expresses unwillingness or refusal to continue with the medication titration process, despite clinical appropriateness."
        }
        Endpoint::InProgress => "Titration program has not reached a terminal endpoint yet.",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitrationStrategy {
    SingleDrug,
    MultipleByOrder,
    MultipleAlternating,
}

impl TitrationStrategy {
    pub const ALL: &'static [TitrationStrategy] = &[
        TitrationStrategy::SingleDrug,
        TitrationStrategy::MultipleByOrder,
        TitrationStrategy::MultipleAlternating,
    ];

    pub fn description(&self) -> &'static str {
        match self {
            TitrationStrategy::SingleDrug => "Titrate one medication to target before adding next",
            TitrationStrategy::MultipleByOrder => {
                "Start multiple drugs at low doses, titrate Drug 1 to target, then Drug 2, then Drug 3"
            }
            TitrationStrategy::MultipleAlternating => {
                "Start multiple drugs at low doses, alternate titrations between drugs"
            }
        }
    }

    pub fn timeline(&self) -> &'static str {
        match self {
            TitrationStrategy::SingleDrug => "4-6 months to reach full GDMT",
            TitrationStrategy::MultipleByOrder | TitrationStrategy::MultipleAlternating => {
                "3-4 months to reach full GDMT"
            }
        }
    }

    pub fn steps(&self) -> &'static [&'static str] {
        match self {
            TitrationStrategy::SingleDrug => &[
                "Start beta blocker at low dose, titrate to target over 6-8 weeks",
                "Start ACE-I/ARB/ARNI at low dose, titrate to target over 4-6 weeks",
                "Start aldosterone antagonist at low dose, titrate to target over 2-4 weeks",
                "Add SGLT-2 inhibitor at standard dose",
                "Add sGC stimulator or hydralazine/nitrates if indicated",
            ],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDefinition {
    pub endpoint: Endpoint,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub strategy: TitrationStrategy,
    pub description: String,
    pub timeline: String,
    pub steps: Vec<String>,
}

/// The reference tables as handed to the decision-maker each week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolReference {
    pub vital_sign_parameters: VitalSignParameters,
    pub general_hold_criteria: GeneralHoldCriteria,
    pub program_endpoints: Vec<EndpointDefinition>,
    pub titration_strategies: Vec<StrategyDefinition>,
}

impl ProtocolReference {
    pub fn standard() -> Self {
        // 進行中不是終點，不列入
        let program_endpoints = Endpoint::ALL
            .iter()
            .filter(|e| **e != Endpoint::InProgress)
            .map(|&endpoint| EndpointDefinition {
                endpoint,
                description: endpoint_description(endpoint).to_string(),
            })
            .collect();

        let titration_strategies = TitrationStrategy::ALL
            .iter()
            .map(|&strategy| StrategyDefinition {
                strategy,
                description: strategy.description().to_string(),
                timeline: strategy.timeline().to_string(),
                steps: strategy.steps().iter().map(|s| s.to_string()).collect(),
            })
            .collect();

        Self {
            vital_sign_parameters: VITAL_SIGN_PARAMETERS,
            general_hold_criteria: GENERAL_HOLD_CRITERIA,
            program_endpoints,
            titration_strategies,
        }
    }

    pub fn endpoint(&self, endpoint: Endpoint) -> Option<&EndpointDefinition> {
        self.program_endpoints.iter().find(|d| d.endpoint == endpoint)
    }
}

impl Default for ProtocolReference {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_ranges() {
        assert!(VITAL_SIGN_PARAMETERS.bp_in_goal_range(110, 70));
        assert!(!VITAL_SIGN_PARAMETERS.bp_in_goal_range(135, 70));
        assert!(VITAL_SIGN_PARAMETERS.hr_in_goal_range(72));
        assert!(!VITAL_SIGN_PARAMETERS.hr_in_goal_range(50));
    }

    #[test]
    fn test_every_endpoint_has_description() {
        for endpoint in Endpoint::ALL {
            assert!(!endpoint_description(*endpoint).is_empty());
        }
    }

    #[test]
    fn test_standard_reference_bundle() {
        let reference = ProtocolReference::standard();
        assert_eq!(reference.vital_sign_parameters, VITAL_SIGN_PARAMETERS);
        assert_eq!(reference.general_hold_criteria.potassium_hold, 5.5);
        assert!(reference.endpoint(Endpoint::InProgress).is_none());
        assert!(reference
            .endpoint(Endpoint::AcuteDecompensationEd)
            .is_some_and(|d| d.description.contains("emergency department")));
        assert_eq!(reference.titration_strategies.len(), 3);
        assert_eq!(reference.titration_strategies[0].steps.len(), 5);
    }
}

use crate::core::context::TitrationContext;
use crate::domain::model::{
    DecisionAction, DoseInfo, DoseValue, MedicationPlanEntry, PatientState, ReportedVitals,
    WeeklyData, WeeklyDecision,
};
use crate::domain::ports::DecisionSource;
use crate::protocol::ProtocolRepository;
use crate::safety::SafetyEvaluator;
use crate::simulation::generators::describe_adherence;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionIssueKind {
    WeekMismatch,
    MissingEntry,
    DuplicateEntry,
    UnknownMedication,
    OldDoseMismatch,
    /// continue/hold with a new dose different from the old one
    DoseChangedWithoutAdjustment,
    /// increase/decrease that leaves the dose as it was
    DoseUnchanged,
    OffLadder,
    WrongDirection,
    StopNonZero,
    SafetyConcern,
}

/// A decision inconsistency. Reported to the caller, never auto-corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionIssue {
    pub medication: Option<String>,
    pub kind: DecisionIssueKind,
    pub detail: String,
}

impl DecisionIssue {
    fn for_medication(medication: &str, kind: DecisionIssueKind, detail: String) -> Self {
        Self {
            medication: Some(medication.to_string()),
            kind,
            detail,
        }
    }
}

impl fmt::Display for DecisionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.medication {
            Some(name) => write!(f, "{}: {}", name, self.detail),
            None => f.write_str(&self.detail),
        }
    }
}

/// Checks a decision's shape against the patient state and the protocols.
pub fn validate_decision(
    repository: &ProtocolRepository,
    evaluator: &SafetyEvaluator,
    state: &PatientState,
    decision: &WeeklyDecision,
    week_data: Option<&WeeklyData>,
) -> Vec<DecisionIssue> {
    let mut issues = Vec::new();

    if decision.week != state.current_week {
        issues.push(DecisionIssue {
            medication: None,
            kind: DecisionIssueKind::WeekMismatch,
            detail: format!(
                "Decision is for week {} but the program is in week {}",
                decision.week, state.current_week
            ),
        });
    }

    let mut seen = HashSet::new();
    for entry in &decision.medication_plan {
        let key = entry.name.trim().to_lowercase();
        if !seen.insert(key) {
            issues.push(DecisionIssue::for_medication(
                &entry.name,
                DecisionIssueKind::DuplicateEntry,
                "Medication appears more than once in the plan".to_string(),
            ));
            continue;
        }

        let Some(current) = state.medication(&entry.name) else {
            issues.push(DecisionIssue::for_medication(
                &entry.name,
                DecisionIssueKind::UnknownMedication,
                "Medication is not on the patient's current list".to_string(),
            ));
            continue;
        };

        if !entry.old_dose.same_dose(&current.current_dose) {
            issues.push(DecisionIssue::for_medication(
                &entry.name,
                DecisionIssueKind::OldDoseMismatch,
                format!(
                    "old_dose {} does not match current dose {}",
                    entry.old_dose, current.current_dose
                ),
            ));
        }

        issues.extend(check_action_shape(repository, entry));

        if let Some(week) = week_data {
            issues.extend(
                evaluator
                    .validate_action(repository, &entry.name, entry.action, week)
                    .into_iter()
                    .filter(|v| entry.action == DecisionAction::Increase || v.rule != "Unknown Medication")
                    .map(|v| {
                        DecisionIssue::for_medication(
                            &entry.name,
                            DecisionIssueKind::SafetyConcern,
                            v.to_string(),
                        )
                    }),
            );
        }
    }

    for medication in &state.current_medications {
        let planned = decision
            .medication_plan
            .iter()
            .any(|e| e.name.trim().eq_ignore_ascii_case(medication.name.trim()));
        if !planned {
            issues.push(DecisionIssue::for_medication(
                &medication.name,
                DecisionIssueKind::MissingEntry,
                "No plan entry for this medication".to_string(),
            ));
        }
    }

    issues
}

fn check_action_shape(
    repository: &ProtocolRepository,
    entry: &MedicationPlanEntry,
) -> Vec<DecisionIssue> {
    let issue = |kind, detail: String| DecisionIssue::for_medication(&entry.name, kind, detail);

    match entry.action {
        DecisionAction::Continue | DecisionAction::Hold => {
            if entry.new_dose.same_dose(&entry.old_dose) {
                Vec::new()
            } else {
                vec![issue(
                    DecisionIssueKind::DoseChangedWithoutAdjustment,
                    format!(
                        "{} requires new_dose equal to old_dose ({} vs {})",
                        entry.action, entry.new_dose, entry.old_dose
                    ),
                )]
            }
        }
        DecisionAction::Stop => {
            if entry.new_dose.value.is_zero() {
                Vec::new()
            } else {
                vec![issue(
                    DecisionIssueKind::StopNonZero,
                    format!("stop with new_dose {}; dose will be set to 0", entry.new_dose.value),
                )]
            }
        }
        DecisionAction::Increase | DecisionAction::Decrease => {
            if entry.new_dose.same_dose(&entry.old_dose) {
                return vec![issue(
                    DecisionIssueKind::DoseUnchanged,
                    format!("{} leaves the dose at {}", entry.action, entry.old_dose),
                )];
            }
            check_ladder_direction(repository, entry)
                .map(|(kind, detail)| vec![issue(kind, detail)])
                .unwrap_or_default()
        }
    }
}

fn check_ladder_direction(
    repository: &ProtocolRepository,
    entry: &MedicationPlanEntry,
) -> Option<(DecisionIssueKind, String)> {
    let old = &entry.old_dose.value;
    let new = &entry.new_dose.value;

    let positions = match repository.get(&entry.name) {
        Some(protocol) if protocol.requires_titration => {
            let Some(new_position) = protocol.ladder_position(new) else {
                return Some((
                    DecisionIssueKind::OffLadder,
                    format!("{} is not a protocol dose for {}", new, protocol.name),
                ));
            };
            protocol.ladder_position(old).map(|o| (o as f64, new_position as f64))
        }
        _ => None,
    };

    // 不在階梯上的數值劑量直接比較大小
    let (from, to) = positions.or_else(|| Some((old.as_numeric()?, new.as_numeric()?)))?;
    let wrong = match entry.action {
        DecisionAction::Increase => to <= from,
        DecisionAction::Decrease => to >= from,
        _ => false,
    };
    wrong.then(|| {
        (
            DecisionIssueKind::WrongDirection,
            format!("{} from {} to {} moves the wrong way", entry.action, old, new),
        )
    })
}

fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join("; ")
    }
}

impl WeeklyDecision {
    /// Keeps every medication at its current dose. Used when no external
    /// decision is available for the week.
    pub fn continue_all(state: &PatientState, week: u32) -> Self {
        let latest = state
            .weekly_data
            .iter()
            .rev()
            .find(|w| w.week_number == week);

        WeeklyDecision {
            week,
            vitals: latest.map(|w| ReportedVitals {
                blood_pressure_systolic: w.vitals.systolic_bp,
                blood_pressure_diastolic: w.vitals.diastolic_bp,
                heart_rate: w.vitals.heart_rate,
            }),
            symptoms_summary: latest
                .map(|w| join_or(&w.symptoms, "no symptoms reported"))
                .unwrap_or_default(),
            adherence_summary: latest
                .map(|w| describe_adherence(w.adherence_rate).1.to_string())
                .unwrap_or_default(),
            side_effects_summary: latest
                .map(|w| join_or(&w.side_effects, "none reported"))
                .unwrap_or_default(),
            medication_plan: state
                .current_medications
                .iter()
                .map(|m| MedicationPlanEntry {
                    name: m.name.clone(),
                    action: DecisionAction::Continue,
                    old_dose: m.current_dose.clone(),
                    new_dose: m.current_dose.clone(),
                })
                .collect(),
        }
    }

    /// The dose a plan entry actually leaves the medication at.
    pub fn effective_dose(entry: &MedicationPlanEntry) -> DoseInfo {
        match entry.action {
            DecisionAction::Stop => entry.new_dose.with_value(DoseValue::Numeric(0.0)),
            _ => entry.new_dose.clone(),
        }
    }
}

/// Pre-recorded decisions keyed by week. Weeks without an entry continue
/// every medication unchanged.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    by_week: BTreeMap<u32, WeeklyDecision>,
}

impl ScriptedDecisions {
    pub fn new(decisions: Vec<WeeklyDecision>) -> Self {
        Self {
            by_week: decisions.into_iter().map(|d| (d.week, d)).collect(),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let decisions: Vec<WeeklyDecision> = serde_json::from_str(content)?;
        Ok(Self::new(decisions))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.by_week.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_week.is_empty()
    }
}

impl DecisionSource for ScriptedDecisions {
    fn decide(
        &mut self,
        week: u32,
        _context: &TitrationContext,
        state: &PatientState,
    ) -> Result<WeeklyDecision> {
        match self.by_week.remove(&week) {
            Some(decision) => Ok(decision),
            None => {
                tracing::debug!("No scripted decision for week {}, continuing all", week);
                Ok(WeeklyDecision::continue_all(state, week))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        CurrentMedication, EducationLevel, MedicalLiteracy, MedicationClass, PatientProfile,
    };

    fn state() -> PatientState {
        let profile = PatientProfile::new(EducationLevel::HighSchool, MedicalLiteracy::Low, "");
        PatientState::new(
            "P2",
            "Decision Patient",
            profile,
            vec![CurrentMedication {
                name: "Lisinopril".to_string(),
                medication_class: MedicationClass::AceInhibitor,
                current_dose: DoseInfo::numeric(10.0, "mg", "daily"),
                target_dose: DoseInfo::numeric(40.0, "mg", "daily"),
                stage: "titration".to_string(),
                weeks_on_current_dose: 2,
            }],
            8,
        )
    }

    fn decision(action: DecisionAction, new: f64) -> WeeklyDecision {
        WeeklyDecision {
            week: 1,
            vitals: None,
            symptoms_summary: String::new(),
            adherence_summary: String::new(),
            side_effects_summary: String::new(),
            medication_plan: vec![MedicationPlanEntry {
                name: "Lisinopril".to_string(),
                action,
                old_dose: DoseInfo::numeric(10.0, "mg", "daily"),
                new_dose: DoseInfo::numeric(new, "mg", "daily"),
            }],
        }
    }

    fn kinds(d: &WeeklyDecision) -> Vec<DecisionIssueKind> {
        let repo = ProtocolRepository::load().unwrap();
        validate_decision(&repo, &SafetyEvaluator::new(), &state(), d, None)
            .into_iter()
            .map(|i| i.kind)
            .collect()
    }

    #[test]
    fn test_consistent_decisions_have_no_issues() {
        assert!(kinds(&decision(DecisionAction::Increase, 20.0)).is_empty());
        assert!(kinds(&decision(DecisionAction::Hold, 10.0)).is_empty());
        assert!(kinds(&decision(DecisionAction::Decrease, 5.0)).is_empty());
        assert!(kinds(&decision(DecisionAction::Stop, 0.0)).is_empty());
    }

    #[test]
    fn test_shape_violations_are_flagged() {
        assert_eq!(
            kinds(&decision(DecisionAction::Hold, 20.0)),
            vec![DecisionIssueKind::DoseChangedWithoutAdjustment]
        );
        assert_eq!(
            kinds(&decision(DecisionAction::Increase, 10.0)),
            vec![DecisionIssueKind::DoseUnchanged]
        );
        assert_eq!(
            kinds(&decision(DecisionAction::Increase, 15.0)),
            vec![DecisionIssueKind::OffLadder]
        );
        assert_eq!(
            kinds(&decision(DecisionAction::Increase, 5.0)),
            vec![DecisionIssueKind::WrongDirection]
        );
        assert_eq!(
            kinds(&decision(DecisionAction::Stop, 10.0)),
            vec![DecisionIssueKind::StopNonZero]
        );
    }

    #[test]
    fn test_missing_and_unknown_entries() {
        let mut d = decision(DecisionAction::Continue, 10.0);
        d.medication_plan[0].name = "Aspirin".to_string();
        d.week = 3;
        let found = kinds(&d);
        assert!(found.contains(&DecisionIssueKind::WeekMismatch));
        assert!(found.contains(&DecisionIssueKind::UnknownMedication));
        assert!(found.contains(&DecisionIssueKind::MissingEntry));
    }

    #[test]
    fn test_scripted_decisions_fall_back_to_continue() {
        let repo = ProtocolRepository::load().unwrap();
        let state = state();
        let context = crate::core::context::TitrationContextAggregator::new(&repo).collect(&state);
        let mut source = ScriptedDecisions::new(vec![decision(DecisionAction::Increase, 20.0)]);

        let week1 = source.decide(1, &context, &state).unwrap();
        assert_eq!(week1.medication_plan[0].action, DecisionAction::Increase);

        let week2 = source.decide(2, &context, &state).unwrap();
        assert_eq!(week2.week, 2);
        assert_eq!(week2.medication_plan[0].action, DecisionAction::Continue);
        assert!(week2.medication_plan[0]
            .new_dose
            .same_dose(&week2.medication_plan[0].old_dose));
    }

    #[test]
    fn test_stop_forces_zero() {
        let d = decision(DecisionAction::Stop, 10.0);
        assert!(WeeklyDecision::effective_dose(&d.medication_plan[0]).value.is_zero());
    }
}

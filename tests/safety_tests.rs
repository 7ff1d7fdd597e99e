use chrono::Utc;
use hf_titration::domain::model::{
    CurrentMedication, DecisionAction, DoseInfo, EducationLevel, LabValues, MedicalLiteracy,
    MedicationClass, PatientProfile, PatientState, VitalSigns, WeeklyData,
};
use hf_titration::{ProtocolRepository, SafetyEvaluator, SafetyLevel};

fn vitals(systolic: u32, heart_rate: u32) -> VitalSigns {
    VitalSigns {
        systolic_bp: Some(systolic),
        diastolic_bp: Some(70),
        heart_rate: Some(heart_rate),
        weight: None,
    }
}

fn week(systolic: u32, labs: Option<LabValues>, adherence: f64) -> WeeklyData {
    WeeklyData {
        week_number: 1,
        vitals: vitals(systolic, 72),
        labs,
        symptoms: Vec::new(),
        side_effects: Vec::new(),
        adherence_rate: adherence,
        patient_concerns: Vec::new(),
        timestamp: Utc::now(),
    }
}

#[test]
fn test_systolic_bands() {
    let evaluator = SafetyEvaluator::new();

    let low = evaluator.evaluate(&vitals(65, 72), None, &[], 0.95);
    assert_eq!(low.level, SafetyLevel::Emergency);

    let borderline = evaluator.evaluate(&vitals(85, 72), None, &[], 0.95);
    assert_eq!(borderline.level, SafetyLevel::Unsafe);

    assert!(evaluator.check_vitals(&vitals(115, 72)).is_empty());
}

#[test]
fn test_emergency_symptom_overrides_normal_values() {
    let evaluator = SafetyEvaluator::new();
    let symptoms = vec!["I can’t breathe when lying down".to_string()];

    let assessment = evaluator.evaluate(&vitals(120, 70), None, &symptoms, 0.95);
    assert!(assessment.is_emergency());
    assert_eq!(assessment.violations.len(), 1);
}

#[test]
fn test_labs_and_adherence_levels() {
    let evaluator = SafetyEvaluator::new();

    let critical_k = LabValues {
        potassium: Some(6.2),
        ..LabValues::default()
    };
    assert_eq!(
        evaluator.evaluate_week(&week(120, Some(critical_k), 0.95)).level,
        SafetyLevel::Emergency
    );

    let low_k = LabValues {
        potassium: Some(3.2),
        ..LabValues::default()
    };
    assert_eq!(
        evaluator.evaluate_week(&week(120, Some(low_k), 0.95)).level,
        SafetyLevel::Caution
    );

    assert_eq!(
        evaluator.evaluate_week(&week(120, None, 0.3)).level,
        SafetyLevel::Unsafe
    );
}

#[test]
fn test_increase_validated_against_hold_criteria() {
    let repo = ProtocolRepository::load().unwrap();
    let evaluator = SafetyEvaluator::new();
    let high_k = LabValues {
        potassium: Some(5.7),
        ..LabValues::default()
    };
    let data = week(120, Some(high_k), 0.7);

    let increase = evaluator.validate_action(&repo, "spironolactone", DecisionAction::Increase, &data);
    assert!(increase.iter().any(|v| v.level == SafetyLevel::Unsafe));
    assert!(increase.iter().any(|v| v.level == SafetyLevel::Caution));

    assert!(evaluator
        .validate_action(&repo, "spironolactone", DecisionAction::Continue, &data)
        .is_empty());

    let unknown = evaluator.validate_action(&repo, "Aspirin", DecisionAction::Continue, &data);
    assert_eq!(unknown[0].level, SafetyLevel::Unsafe);
}

#[test]
fn test_overall_assessment_uses_latest_week() {
    let evaluator = SafetyEvaluator::new();
    let profile = PatientProfile::new(EducationLevel::College, MedicalLiteracy::High, "");
    let mut state = PatientState::new(
        "S1",
        "Safety Patient",
        profile,
        vec![CurrentMedication {
            name: "Carvedilol".to_string(),
            medication_class: MedicationClass::BetaBlocker,
            current_dose: DoseInfo::numeric(6.25, "mg", "twice daily"),
            target_dose: DoseInfo::numeric(25.0, "mg", "twice daily"),
            stage: "titration".to_string(),
            weeks_on_current_dose: 1,
        }],
        8,
    );

    let (level, concerns) = evaluator.assess_overall(&state);
    assert_eq!(level, SafetyLevel::Caution);
    assert_eq!(concerns.len(), 1);

    state.weekly_data.push(week(118, None, 0.95));
    let report = evaluator.safety_report(&state);
    assert!(report.safe);
    assert_eq!(report.level, SafetyLevel::Safe);

    state.weekly_data.push(week(68, None, 0.95));
    let (level, _) = evaluator.assess_overall(&state);
    assert_eq!(level, SafetyLevel::Emergency);
}

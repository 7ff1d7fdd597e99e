use hf_titration::domain::model::{
    AdherencePattern, CurrentMedication, DoseInfo, EducationLevel, MedicalLiteracy,
    MedicationClass, PatientProfile, PatientState, SymptomPattern, VitalsPattern,
};
use hf_titration::simulation::generators::{calculate_adherence, generate_symptoms};
use hf_titration::PatientSimulator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const BASELINE: f64 = 0.95;

#[test]
fn test_consistently_high_adherence_stays_in_band() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for total in [4, 8, 12] {
        for week in 1..=total {
            let rate =
                calculate_adherence(&mut rng, AdherencePattern::ConsistentlyHigh, week, total, BASELINE);
            assert!((0.90..=0.95).contains(&rate), "week {} of {}: {}", week, total, rate);
        }
    }
}

#[test]
fn test_declining_adherence_endpoints() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let first = calculate_adherence(&mut rng, AdherencePattern::Declining, 1, 8, BASELINE);
    let last = calculate_adherence(&mut rng, AdherencePattern::Declining, 8, 8, BASELINE);

    assert!((first - BASELINE).abs() < 1e-9);
    assert!((last - (BASELINE - 0.6)).abs() < 1e-9);

    let floored = calculate_adherence(&mut rng, AdherencePattern::Declining, 8, 8, 0.7);
    assert!((floored - 0.3).abs() < 1e-9);
}

#[test]
fn test_symptom_phases_scale_with_program_length() {
    // 12 週時第 9 週以後才出現急性症狀
    let before = generate_symptoms(SymptomPattern::AcuteEscalationToEd, 9, 12);
    let after = generate_symptoms(SymptomPattern::AcuteEscalationToEd, 10, 12);
    assert!(!before.iter().any(|s| s.contains("chest pain")));
    assert!(after.iter().any(|s| s.contains("chest pain")));
}

fn state() -> PatientState {
    let mut profile = PatientProfile::new(EducationLevel::SomeCollege, MedicalLiteracy::Moderate, "");
    profile.vitals_pattern = VitalsPattern::Oscillating;
    PatientState::new(
        "SIM1",
        "Seeded Patient",
        profile,
        vec![CurrentMedication {
            name: "Metoprolol Succinate".to_string(),
            medication_class: MedicationClass::BetaBlocker,
            current_dose: DoseInfo::numeric(25.0, "mg", "daily"),
            target_dose: DoseInfo::numeric(200.0, "mg", "daily"),
            stage: "titration".to_string(),
            weeks_on_current_dose: 0,
        }],
        8,
    )
}

#[test]
fn test_same_seed_reproduces_signals() {
    let state = state();
    let mut a = PatientSimulator::new(99);
    let mut b = PatientSimulator::new(99);

    for week in 1..=8 {
        let left = a.generate_weekly_data(&state, week);
        let right = b.generate_weekly_data(&state, week);
        assert_eq!(left.vitals, right.vitals);
        assert_eq!(left.labs, right.labs);
        assert_eq!(left.symptoms, right.symptoms);
        assert_eq!(left.side_effects, right.side_effects);
        assert_eq!(left.adherence_rate, right.adherence_rate);
    }
}

use crate::domain::model::{
    AdherencePattern, Endpoint, MedicationClass, PatientProfile, PatientState, SideEffectPattern,
    WeeklyData,
};
use crate::simulation::generators::{
    calculate_adherence, generate_labs, generate_side_effects, generate_symptoms, generate_vitals,
    SimulationBaseline,
};
use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Composes the four generators (plus labs) behind one seeded RNG so that a
/// run is reproducible from its seed.
pub struct PatientSimulator {
    rng: ChaCha8Rng,
    seed: u64,
    baseline: SimulationBaseline,
    run_start: DateTime<Utc>,
}

impl PatientSimulator {
    pub fn new(seed: u64) -> Self {
        Self::with_baseline(seed, SimulationBaseline::default())
    }

    pub fn with_baseline(seed: u64, baseline: SimulationBaseline) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            baseline,
            run_start: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Anchors week 1's timestamp. Later weeks are offset by whole weeks, so
    /// the same seed and start always produce identical data.
    pub fn with_run_start(mut self, run_start: DateTime<Utc>) -> Self {
        self.run_start = run_start;
        self
    }

    /// Uses the given seed, or draws one and logs it so the run can be replayed.
    pub fn from_optional_seed(seed: Option<u64>, baseline: SimulationBaseline) -> Self {
        let seed = seed.unwrap_or_else(|| {
            let drawn = rand::random::<u64>();
            tracing::info!("🎲 No seed configured, using {}", drawn);
            drawn
        });
        Self::with_baseline(seed, baseline)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn baseline(&self) -> &SimulationBaseline {
        &self.baseline
    }

    pub fn run_start(&self) -> DateTime<Utc> {
        self.run_start
    }

    fn week_timestamp(&self, week: u32) -> DateTime<Utc> {
        self.run_start + Duration::weeks(i64::from(week.saturating_sub(1)))
    }

    pub fn generate_weekly_data(&mut self, state: &PatientState, week: u32) -> WeeklyData {
        let profile = &state.profile;
        let total_weeks = state.total_weeks;

        // 已停用的藥物不再產生副作用
        let classes: Vec<MedicationClass> = state
            .current_medications
            .iter()
            .filter(|m| !m.current_dose.value.is_zero())
            .map(|m| m.medication_class)
            .collect();

        let vitals = generate_vitals(
            &mut self.rng,
            profile.vitals_pattern,
            week,
            total_weeks,
            &self.baseline,
        );
        let labs = generate_labs(&mut self.rng, profile.lab_pattern, week, total_weeks);
        let symptoms = generate_symptoms(profile.symptom_pattern, week, total_weeks);
        let side_effects = generate_side_effects(
            &mut self.rng,
            profile.side_effect_pattern,
            &classes,
            week,
            total_weeks,
        );
        let adherence_rate = calculate_adherence(
            &mut self.rng,
            profile.adherence_pattern,
            week,
            total_weeks,
            self.baseline.adherence,
        );

        tracing::debug!(
            "Simulated week {}: BP {:?}/{:?}, HR {:?}, adherence {:.2}",
            week,
            vitals.systolic_bp,
            vitals.diastolic_bp,
            vitals.heart_rate,
            adherence_rate
        );

        WeeklyData {
            week_number: week,
            vitals,
            labs,
            symptoms,
            side_effects,
            adherence_rate,
            patient_concerns: Vec::new(),
            timestamp: self.week_timestamp(week),
        }
    }

    /// Whether the profile's target endpoint should surface by this week.
    pub fn should_trigger_endpoint(profile: &PatientProfile, week: u32, total_weeks: u32) -> bool {
        match profile.target_endpoint {
            Endpoint::AcuteDecompensationEd => week >= (3 * total_weeks / 4).max(2),
            Endpoint::NonAdherenceFailure => {
                week >= (total_weeks / 2).max(2)
                    && profile.adherence_pattern == AdherencePattern::Declining
            }
            Endpoint::SideEffectFailure => {
                week >= (3 * total_weeks / 5).max(2)
                    && profile.side_effect_pattern == SideEffectPattern::SideEffectEscalation
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        CurrentMedication, DoseInfo, DoseValue, EducationLevel, MedicalLiteracy, SymptomPattern,
    };

    fn state() -> PatientState {
        let mut profile = PatientProfile::new(EducationLevel::College, MedicalLiteracy::Moderate, "");
        profile.side_effect_pattern = SideEffectPattern::MildTolerable;
        profile.symptom_pattern = SymptomPattern::Plateau;
        let meds = vec![CurrentMedication {
            name: "Carvedilol".to_string(),
            medication_class: MedicationClass::BetaBlocker,
            current_dose: DoseInfo::numeric(6.25, "mg", "twice daily"),
            target_dose: DoseInfo::numeric(25.0, "mg", "twice daily"),
            stage: "titration".to_string(),
            weeks_on_current_dose: 0,
        }];
        PatientState::new("P100", "Test Patient", profile, meds, 8)
    }

    #[test]
    fn test_same_seed_same_signals() {
        let state = state();
        let mut a = PatientSimulator::new(99);
        let mut b = PatientSimulator::new(99);
        for week in 1..=8 {
            let wa = a.generate_weekly_data(&state, week);
            let wb = b.generate_weekly_data(&state, week);
            assert_eq!(wa.vitals, wb.vitals);
            assert_eq!(wa.labs, wb.labs);
            assert_eq!(wa.side_effects, wb.side_effects);
            assert_eq!(wa.adherence_rate, wb.adherence_rate);
            assert_eq!(wa, wb);
        }
    }

    #[test]
    fn test_timestamps_follow_run_start() {
        let state = state();
        let start = DateTime::parse_from_rfc3339("2025-03-03T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut simulator = PatientSimulator::new(5).with_run_start(start);
        assert_eq!(simulator.generate_weekly_data(&state, 1).timestamp, start);
        assert_eq!(
            simulator.generate_weekly_data(&state, 3).timestamp,
            start + Duration::weeks(2)
        );
    }

    #[test]
    fn test_stopped_medication_has_no_side_effects() {
        let mut state = state();
        state.current_medications[0].current_dose.value = DoseValue::Numeric(0.0);
        let mut simulator = PatientSimulator::new(1);
        assert!(simulator.generate_weekly_data(&state, 2).side_effects.is_empty());
    }

    #[test]
    fn test_endpoint_triggers() {
        let mut profile = PatientProfile::new(EducationLevel::Graduate, MedicalLiteracy::High, "");
        profile.target_endpoint = Endpoint::AcuteDecompensationEd;
        assert!(!PatientSimulator::should_trigger_endpoint(&profile, 5, 8));
        assert!(PatientSimulator::should_trigger_endpoint(&profile, 6, 8));

        profile.target_endpoint = Endpoint::NonAdherenceFailure;
        assert!(!PatientSimulator::should_trigger_endpoint(&profile, 6, 8));
        profile.adherence_pattern = AdherencePattern::Declining;
        assert!(PatientSimulator::should_trigger_endpoint(&profile, 4, 8));

        profile.target_endpoint = Endpoint::CompleteSuccess;
        assert!(!PatientSimulator::should_trigger_endpoint(&profile, 8, 8));
    }
}

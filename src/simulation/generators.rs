//! Weekly signal generators. Each is a function of the pattern, the week and
//! the program length; randomness comes only from the caller's RNG.

use crate::domain::model::{
    AdherencePattern, LabPattern, LabValues, MedicationClass, SideEffectPattern, SymptomPattern,
    VitalSigns, VitalsPattern,
};
use crate::simulation::phased::{PhaseFraction, WeekSchedule};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const BASE_SYMPTOMS: &[&str] = &[
    "mild shortness of breath with exertion",
    "some fatigue during daily activities",
    "occasional leg swelling",
];

pub const IMPROVING_SYMPTOMS: &[&str] = &[
    "feeling much better than last week",
    "able to walk further without getting tired",
    "sleeping better at night",
];

pub const WORSENING_SYMPTOMS: &[&str] = &[
    "more short of breath than usual",
    "increased swelling in legs",
    "waking up at night feeling breathless",
    "more tired than before",
];

pub const ACUTE_SYMPTOMS: &[&str] = &[
    "severe chest pain that won't go away",
    "can barely catch my breath",
    "feel like I might pass out",
];

/// Starting values the generators drift from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationBaseline {
    pub systolic_bp: i32,
    pub diastolic_bp: i32,
    pub heart_rate: i32,
    pub weight_lb: f64,
    pub adherence: f64,
}

impl Default for SimulationBaseline {
    fn default() -> Self {
        Self {
            systolic_bp: 140,
            diastolic_bp: 85,
            heart_rate: 75,
            weight_lb: 180.0,
            adherence: 0.95,
        }
    }
}

fn to_reading(value: i32) -> u32 {
    value.max(0) as u32
}

// ---------------------------------------------------------------------------
// Vitals
// ---------------------------------------------------------------------------

type BpRanges = (RangeInclusive<i32>, RangeInclusive<i32>);

fn oscillation() -> WeekSchedule<BpRanges> {
    WeekSchedule::alternating((95..=115, 60..=75), (130..=150, 80..=95))
}

pub fn generate_vitals<R: Rng + ?Sized>(
    rng: &mut R,
    pattern: VitalsPattern,
    week: u32,
    total_weeks: u32,
    baseline: &SimulationBaseline,
) -> VitalSigns {
    let w = week as i32;
    let (systolic, diastolic, heart_rate) = match pattern {
        VitalsPattern::StableInGoalRange => (
            rng.gen_range(110..=130),
            rng.gen_range(65..=80),
            rng.gen_range(60..=80),
        ),
        VitalsPattern::BpTrendingLow => (
            (baseline.systolic_bp - 5 * w + rng.gen_range(-5..=5)).max(85),
            (baseline.diastolic_bp - 3 * w + rng.gen_range(-3..=3)).max(50),
            baseline.heart_rate + rng.gen_range(-5..=5),
        ),
        VitalsPattern::BpTrendingHigh => (
            (baseline.systolic_bp + 3 * w + rng.gen_range(-5..=5)).min(180),
            (baseline.diastolic_bp + 2 * w + rng.gen_range(-3..=3)).min(100),
            baseline.heart_rate + rng.gen_range(-5..=10),
        ),
        VitalsPattern::WeightGainFluidOverload => (
            rng.gen_range(120..=150),
            rng.gen_range(75..=90),
            rng.gen_range(70..=90),
        ),
        VitalsPattern::Oscillating => {
            let (systolic, diastolic) = oscillation().at(week, total_weeks).clone();
            (
                rng.gen_range(systolic),
                rng.gen_range(diastolic),
                rng.gen_range(65..=85),
            )
        }
    };

    let weight = (pattern == VitalsPattern::WeightGainFluidOverload)
        .then(|| baseline.weight_lb + 0.5 * f64::from(week));

    VitalSigns {
        systolic_bp: Some(to_reading(systolic)),
        diastolic_bp: Some(to_reading(diastolic)),
        heart_rate: Some(to_reading(heart_rate)),
        weight,
    }
}

// ---------------------------------------------------------------------------
// Symptoms
// ---------------------------------------------------------------------------

fn joined(parts: &[&[&'static str]]) -> Vec<&'static str> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

pub fn symptom_schedule(pattern: SymptomPattern) -> WeekSchedule<Vec<&'static str>> {
    let early = PhaseFraction::new(1, 3);
    let mid = PhaseFraction::new(2, 3);

    match pattern {
        SymptomPattern::SteadyImprovement => WeekSchedule::phased(
            vec![
                (early, BASE_SYMPTOMS.to_vec()),
                (mid, joined(&[&IMPROVING_SYMPTOMS[..1], &BASE_SYMPTOMS[1..]])),
            ],
            IMPROVING_SYMPTOMS.to_vec(),
        ),
        SymptomPattern::ProgressiveWorsening => WeekSchedule::phased(
            vec![
                (early, BASE_SYMPTOMS.to_vec()),
                (mid, joined(&[BASE_SYMPTOMS, &WORSENING_SYMPTOMS[..1]])),
            ],
            WORSENING_SYMPTOMS.to_vec(),
        ),
        SymptomPattern::MixedResponse => WeekSchedule::alternating(
            joined(&[&IMPROVING_SYMPTOMS[..1], &BASE_SYMPTOMS[1..]]),
            joined(&[BASE_SYMPTOMS, &WORSENING_SYMPTOMS[..1]]),
        ),
        SymptomPattern::Plateau => WeekSchedule::phased(
            vec![(PhaseFraction::new(1, 2), IMPROVING_SYMPTOMS[..2].to_vec())],
            BASE_SYMPTOMS.to_vec(),
        ),
        SymptomPattern::AcuteEscalationToEd => WeekSchedule::phased(
            vec![(PhaseFraction::new(3, 4), BASE_SYMPTOMS.to_vec())],
            ACUTE_SYMPTOMS.to_vec(),
        ),
    }
}

pub fn generate_symptoms(pattern: SymptomPattern, week: u32, total_weeks: u32) -> Vec<String> {
    symptom_schedule(pattern)
        .at(week, total_weeks)
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Side effects
// ---------------------------------------------------------------------------

pub fn class_side_effects(class: MedicationClass) -> &'static [&'static str] {
    match class {
        MedicationClass::AceInhibitor => &["dry cough", "dizziness when standing"],
        MedicationClass::Arb | MedicationClass::Arni => &["dizziness when standing", "mild fatigue"],
        MedicationClass::BetaBlocker => &["feeling more tired than usual", "cold hands and feet"],
        MedicationClass::AldosteroneAntagonist => &["mild nausea", "breast tenderness"],
        MedicationClass::Sglt2Inhibitor => &["mild increased urination", "occasional dizziness"],
        _ => &[],
    }
}

/// Phrase pool for the patient's class mix, deduplicated in first-seen order.
pub fn side_effect_pool(classes: &[MedicationClass]) -> Vec<&'static str> {
    let mut pool: Vec<&'static str> = Vec::new();
    for effect in classes.iter().flat_map(|c| class_side_effects(*c)) {
        if !pool.contains(effect) {
            pool.push(effect);
        }
    }
    pool
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Draw {
    Sample(usize),
    Leading(usize),
}

pub fn generate_side_effects<R: Rng + ?Sized>(
    rng: &mut R,
    pattern: SideEffectPattern,
    classes: &[MedicationClass],
    week: u32,
    total_weeks: u32,
) -> Vec<String> {
    let pool = side_effect_pool(classes);
    if pool.is_empty() {
        return Vec::new();
    }

    let draw = match pattern {
        SideEffectPattern::None => return Vec::new(),
        SideEffectPattern::MildTolerable => Draw::Sample(1),
        SideEffectPattern::SideEffectEscalation => {
            let progress = (f64::from(week) / f64::from(total_weeks.max(1))).clamp(0.0, 1.0);
            Draw::Sample(((progress * pool.len() as f64) as usize).max(1))
        }
        SideEffectPattern::EarlyIntolerance => *WeekSchedule::phased(
            vec![(PhaseFraction::new(1, 3), Draw::Sample(2))],
            Draw::Leading(1),
        )
        .at(week, total_weeks),
    };

    match draw {
        Draw::Sample(count) => pool
            .choose_multiple(rng, count.min(pool.len()))
            .map(|s| s.to_string())
            .collect(),
        Draw::Leading(count) => pool.iter().take(count).map(|s| s.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Adherence
// ---------------------------------------------------------------------------

const DECLINE_SPAN: f64 = 0.6;
const DECLINE_FLOOR: f64 = 0.3;
const IMPROVEMENT_SPAN: f64 = 0.3;
const ADHERENCE_CEILING: f64 = 0.95;
const HIGH_ADHERENCE_FLOOR: f64 = 0.9;

/// Adherence rate in [0, 1] for the week.
pub fn calculate_adherence<R: Rng + ?Sized>(
    rng: &mut R,
    pattern: AdherencePattern,
    week: u32,
    total_weeks: u32,
    baseline: f64,
) -> f64 {
    let rate = match pattern {
        // 基準值超過上限時仍維持在 [0.90, 0.95]
        AdherencePattern::ConsistentlyHigh => (baseline - rng.gen_range(0.0..=0.05))
            .clamp(HIGH_ADHERENCE_FLOOR, ADHERENCE_CEILING),
        AdherencePattern::Declining => {
            let span = f64::from(total_weeks.saturating_sub(1).max(1));
            let progress = (f64::from(week.saturating_sub(1)) / span).clamp(0.0, 1.0);
            (baseline - progress * DECLINE_SPAN).max(DECLINE_FLOOR)
        }
        AdherencePattern::Improving => {
            // 起點偏低的病患才有改善空間
            let start = if baseline < 0.8 {
                baseline
            } else {
                baseline - IMPROVEMENT_SPAN
            };
            let progress = (f64::from(week) / f64::from(total_weeks.max(1))).clamp(0.0, 1.0);
            (start + progress * IMPROVEMENT_SPAN).min(ADHERENCE_CEILING)
        }
        AdherencePattern::Fluctuating => {
            *WeekSchedule::alternating((baseline - 0.2).max(0.6), baseline).at(week, total_weeks)
        }
        AdherencePattern::SingleDropThenStable => {
            let drop_week = (total_weeks / 3).max(2);
            if week == drop_week {
                (baseline - 0.4).max(0.4)
            } else {
                baseline
            }
        }
    };
    rate.clamp(0.0, 1.0)
}

/// (status, patient-facing description) for an adherence rate.
pub fn describe_adherence(rate: f64) -> (&'static str, &'static str) {
    if rate > 0.9 {
        ("excellent", "taking all medications as prescribed")
    } else if rate > 0.8 {
        ("good", "missed 1-2 doses this week")
    } else if rate > 0.6 {
        ("moderate", "missed several doses this week")
    } else {
        ("poor", "frequently missing doses")
    }
}

// ---------------------------------------------------------------------------
// Labs
// ---------------------------------------------------------------------------

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, center: f64, spread: f64) -> f64 {
    center + rng.gen_range(-spread..=spread)
}

/// Draws one lab panel, or `None` for weeks without a draw.
pub fn generate_labs<R: Rng + ?Sized>(
    rng: &mut R,
    pattern: LabPattern,
    week: u32,
    total_weeks: u32,
) -> Option<LabValues> {
    let progress = (f64::from(week) / f64::from(total_weeks.max(1))).clamp(0.0, 1.0);

    let (potassium, creatinine, egfr, sodium) = match pattern {
        LabPattern::LabsNormal => (
            rng.gen_range(4.0..=4.8),
            rng.gen_range(0.9..=1.2),
            rng.gen_range(60.0..=80.0),
            rng.gen_range(136.0..=142.0),
        ),
        LabPattern::MildRenalDrift => (
            jitter(rng, 4.3 + 0.6 * progress, 0.1),
            jitter(rng, 1.0 + 0.2 * progress, 0.03),
            jitter(rng, 65.0 - 15.0 * progress, 2.0),
            rng.gen_range(135.0..=141.0),
        ),
        LabPattern::ProgressiveRenalImpairment => (
            jitter(rng, 4.4 + 1.0 * progress, 0.1),
            jitter(rng, 1.1 + 0.8 * progress, 0.05),
            jitter(rng, 60.0 - 38.0 * progress, 2.0),
            rng.gen_range(134.0..=140.0),
        ),
        LabPattern::ElectrolyteInstability => {
            // 偶數週高鉀、奇數週低鉀低鈉
            let swings =
                WeekSchedule::alternating((5.6..=5.9, 131.0..=136.0), (3.1..=3.5, 127.0..=133.0));
            let (k_range, na_range) = swings.at(week, total_weeks).clone();
            (
                rng.gen_range(k_range),
                rng.gen_range(1.0..=1.3),
                rng.gen_range(50.0..=65.0),
                rng.gen_range(na_range),
            )
        }
        LabPattern::LabsMissingOrDelayed => {
            if week % 3 != 0 {
                return None;
            }
            (
                rng.gen_range(4.0..=4.8),
                rng.gen_range(0.9..=1.2),
                rng.gen_range(60.0..=80.0),
                rng.gen_range(136.0..=142.0),
            )
        }
    };

    Some(LabValues {
        potassium: Some(round_to(potassium, 1)),
        creatinine: Some(round_to(creatinine, 2)),
        egfr: Some(round_to(egfr, 0)),
        sodium: Some(round_to(sodium, 0)),
        hemoglobin: Some(round_to(rng.gen_range(12.0..=14.5), 1)),
        bun: Some(round_to(rng.gen_range(12.0..=24.0), 0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_consistently_high_stays_in_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for total in [4, 8, 12] {
            for week in 1..=total {
                let rate =
                    calculate_adherence(&mut rng, AdherencePattern::ConsistentlyHigh, week, total, 0.95);
                assert!((0.90..=0.95).contains(&rate), "rate {rate} out of band");
            }
        }
    }

    #[test]
    fn test_consistently_high_caps_perfect_baseline() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for week in 1..=8 {
            for baseline in [1.0, 0.99, 0.5] {
                let rate = calculate_adherence(
                    &mut rng,
                    AdherencePattern::ConsistentlyHigh,
                    week,
                    8,
                    baseline,
                );
                assert!((0.90..=0.95).contains(&rate), "baseline {baseline} gave {rate}");
            }
        }
    }

    #[test]
    fn test_declining_endpoints() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let first = calculate_adherence(&mut rng, AdherencePattern::Declining, 1, 8, 0.95);
        let last = calculate_adherence(&mut rng, AdherencePattern::Declining, 8, 8, 0.95);
        assert!((first - 0.95).abs() < 1e-9);
        assert!((last - 0.35).abs() < 1e-9);

        let long = calculate_adherence(&mut rng, AdherencePattern::Declining, 12, 12, 0.8);
        assert!((long - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_improving_ramps_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rates: Vec<f64> = (1..=8)
            .map(|w| calculate_adherence(&mut rng, AdherencePattern::Improving, w, 8, 0.95))
            .collect();
        assert!(rates.windows(2).all(|pair| pair[1] >= pair[0]));
        assert!((rates[7] - 0.95).abs() < 1e-9);
        assert!(rates[0] < 0.8);
    }

    #[test]
    fn test_single_drop_week() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let rates: Vec<f64> = (1..=9)
            .map(|w| calculate_adherence(&mut rng, AdherencePattern::SingleDropThenStable, w, 9, 0.95))
            .collect();
        assert!((rates[2] - 0.55).abs() < 1e-9);
        assert_eq!(rates.iter().filter(|r| **r < 0.9).count(), 1);
    }

    #[test]
    fn test_acute_symptoms_only_in_final_quarter() {
        for week in 1..=6 {
            assert_eq!(
                generate_symptoms(SymptomPattern::AcuteEscalationToEd, week, 8),
                BASE_SYMPTOMS.iter().map(|s| s.to_string()).collect::<Vec<_>>()
            );
        }
        let late = generate_symptoms(SymptomPattern::AcuteEscalationToEd, 7, 8);
        assert_eq!(late[0], "severe chest pain that won't go away");
    }

    #[test]
    fn test_symptom_phases_follow_total_weeks() {
        let week3_of_8 = generate_symptoms(SymptomPattern::SteadyImprovement, 3, 8);
        let week3_of_12 = generate_symptoms(SymptomPattern::SteadyImprovement, 3, 12);
        assert_eq!(week3_of_8[0], IMPROVING_SYMPTOMS[0]);
        assert_eq!(week3_of_12[0], BASE_SYMPTOMS[0]);
    }

    #[test]
    fn test_side_effect_pool_by_class() {
        let pool = side_effect_pool(&[MedicationClass::AceInhibitor, MedicationClass::Arni]);
        assert_eq!(pool, vec!["dry cough", "dizziness when standing", "mild fatigue"]);
    }

    #[test]
    fn test_side_effect_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let classes = [MedicationClass::AceInhibitor, MedicationClass::BetaBlocker];

        let mild = generate_side_effects(&mut rng, SideEffectPattern::MildTolerable, &classes, 3, 8);
        assert_eq!(mild.len(), 1);

        let early = generate_side_effects(&mut rng, SideEffectPattern::EarlyIntolerance, &classes, 1, 8);
        let late = generate_side_effects(&mut rng, SideEffectPattern::EarlyIntolerance, &classes, 6, 8);
        assert_eq!(early.len(), 2);
        assert_eq!(late, vec!["dry cough".to_string()]);

        let escalation: Vec<usize> = (1..=8)
            .map(|w| {
                generate_side_effects(&mut rng, SideEffectPattern::SideEffectEscalation, &classes, w, 8)
                    .len()
            })
            .collect();
        assert_eq!(escalation, vec![1, 1, 1, 2, 2, 3, 3, 4]);

        assert!(generate_side_effects(&mut rng, SideEffectPattern::None, &classes, 4, 8).is_empty());
    }

    #[test]
    fn test_vitals_are_reproducible_with_seed() {
        let baseline = SimulationBaseline::default();
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        for week in 1..=8 {
            assert_eq!(
                generate_vitals(&mut a, VitalsPattern::Oscillating, week, 8, &baseline),
                generate_vitals(&mut b, VitalsPattern::Oscillating, week, 8, &baseline)
            );
        }
    }

    #[test]
    fn test_trending_low_respects_floor() {
        let baseline = SimulationBaseline::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let vitals = generate_vitals(&mut rng, VitalsPattern::BpTrendingLow, 20, 20, &baseline);
        assert_eq!(vitals.systolic_bp, Some(85));
        assert_eq!(vitals.diastolic_bp, Some(50));

        let overload =
            generate_vitals(&mut rng, VitalsPattern::WeightGainFluidOverload, 4, 8, &baseline);
        assert_eq!(overload.weight, Some(182.0));
    }

    #[test]
    fn test_missing_labs_pattern() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(generate_labs(&mut rng, LabPattern::LabsMissingOrDelayed, 1, 8).is_none());
        assert!(generate_labs(&mut rng, LabPattern::LabsMissingOrDelayed, 3, 8).is_some());
        let labs = generate_labs(&mut rng, LabPattern::LabsNormal, 1, 8).unwrap();
        assert!(labs.potassium.unwrap() >= 4.0);
    }
}

/// A point in the program expressed as `numerator / denominator` of its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseFraction {
    numerator: u32,
    denominator: u32,
}

impl PhaseFraction {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Floor of the fraction applied to the program length.
    pub fn of(&self, total_weeks: u32) -> u32 {
        total_weeks * self.numerator / self.denominator.max(1)
    }
}

/// Output selected by week index and program length.
#[derive(Debug, Clone, PartialEq)]
pub enum WeekSchedule<T> {
    /// Each phase covers weeks up to and including its boundary; `remainder`
    /// covers everything after the last boundary.
    Phased {
        phases: Vec<(PhaseFraction, T)>,
        remainder: T,
    },
    Alternating {
        even: T,
        odd: T,
    },
}

impl<T> WeekSchedule<T> {
    pub fn phased(phases: Vec<(PhaseFraction, T)>, remainder: T) -> Self {
        WeekSchedule::Phased { phases, remainder }
    }

    pub fn constant(value: T) -> Self {
        WeekSchedule::Phased {
            phases: Vec::new(),
            remainder: value,
        }
    }

    pub fn alternating(even: T, odd: T) -> Self {
        WeekSchedule::Alternating { even, odd }
    }

    /// Last week of each phase. Every phase spans at least one week, so
    /// short programs still visit the phases in order.
    pub fn boundaries(&self, total_weeks: u32) -> Vec<u32> {
        match self {
            WeekSchedule::Phased { phases, .. } => {
                let mut previous = 0;
                phases
                    .iter()
                    .map(|(fraction, _)| {
                        previous = (previous + 1).max(fraction.of(total_weeks));
                        previous
                    })
                    .collect()
            }
            WeekSchedule::Alternating { .. } => Vec::new(),
        }
    }

    pub fn at(&self, week: u32, total_weeks: u32) -> &T {
        match self {
            WeekSchedule::Phased { phases, remainder } => self
                .boundaries(total_weeks)
                .iter()
                .position(|&end| week <= end)
                .and_then(|i| phases.get(i))
                .map(|(_, output)| output)
                .unwrap_or(remainder),
            WeekSchedule::Alternating { even, odd } => {
                if week % 2 == 0 {
                    even
                } else {
                    odd
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thirds() -> WeekSchedule<&'static str> {
        WeekSchedule::phased(
            vec![
                (PhaseFraction::new(1, 3), "early"),
                (PhaseFraction::new(2, 3), "mid"),
            ],
            "late",
        )
    }

    #[test]
    fn test_boundaries_scale_with_program_length() {
        assert_eq!(thirds().boundaries(8), vec![2, 5]);
        assert_eq!(thirds().boundaries(12), vec![4, 8]);
        // 短療程：每個階段至少一週
        assert_eq!(thirds().boundaries(2), vec![1, 2]);
    }

    #[test]
    fn test_at_selects_phase() {
        let schedule = thirds();
        let weeks: Vec<_> = (1..=8).map(|w| *schedule.at(w, 8)).collect();
        assert_eq!(
            weeks,
            vec!["early", "early", "mid", "mid", "mid", "late", "late", "late"]
        );
    }

    #[test]
    fn test_final_quarter() {
        let schedule = WeekSchedule::phased(vec![(PhaseFraction::new(3, 4), "calm")], "acute");
        assert_eq!(*schedule.at(6, 8), "calm");
        assert_eq!(*schedule.at(7, 8), "acute");
        assert_eq!(*schedule.at(9, 12), "calm");
        assert_eq!(*schedule.at(10, 12), "acute");
    }

    #[test]
    fn test_alternating_and_constant() {
        let schedule = WeekSchedule::alternating("even", "odd");
        assert_eq!(*schedule.at(2, 8), "even");
        assert_eq!(*schedule.at(3, 8), "odd");
        assert_eq!(*WeekSchedule::constant(7).at(5, 8), 7);
    }
}

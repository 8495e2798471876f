use serde::Serialize;

use crate::optimizer::Weights;

pub const MIN_THRESHOLD: f64 = 0.50;
pub const MAX_THRESHOLD: f64 = 1.00;
pub const MIN_GROUP_FLOOR: usize = 2;

const NARROW_BONUS_PER_ATTRIBUTE: f64 = 0.10;
const BROAD_BONUS_SCALE: f64 = 0.15;

/// Extra selection score keyed off how many attributes a strategy combines.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GranularityBonus {
    None,
    /// Tighter multi-attribute criteria sweep in fewer unintended members.
    FavorNarrow,
    /// Single-attribute criteria are simpler to administer.
    FavorBroad,
}

impl GranularityBonus {
    pub fn bonus(self, attr_count: usize) -> f64 {
        match self {
            Self::None => 0.0,
            Self::FavorNarrow => attr_count as f64 * NARROW_BONUS_PER_ATTRIBUTE,
            Self::FavorBroad => {
                if attr_count == 0 {
                    0.0
                } else {
                    (1.0 / attr_count as f64) * BROAD_BONUS_SCALE
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Policy {
    pub name: &'static str,
    pub description: &'static str,
    pub weights: Weights,
    pub threshold_delta: f64,
    pub min_group_delta: i64,
    pub granularity: GranularityBonus,
}

impl Policy {
    pub fn adjusted_threshold(&self, base: f64) -> f64 {
        (base + self.threshold_delta).clamp(MIN_THRESHOLD, MAX_THRESHOLD)
    }

    pub fn adjusted_min_group(&self, base: usize) -> usize {
        let adjusted = base as i64 + self.min_group_delta;
        adjusted.max(MIN_GROUP_FLOOR as i64) as usize
    }
}

/// Fixed policy table. Index 0 is presented as the recommended option.
pub const POLICIES: [Policy; 5] = [
    Policy {
        name: "Balanced",
        description: "Even trade-off between coverage, entitlement consistency and precision.",
        weights: Weights::new(0.35, 0.25, 0.10, 0.10, 0.20),
        threshold_delta: 0.0,
        min_group_delta: 0,
        granularity: GranularityBonus::None,
    },
    Policy {
        name: "Maximum Coverage",
        description: "Groups as many target users as possible, accepting looser roles.",
        weights: Weights::new(0.55, 0.15, 0.05, 0.20, 0.05),
        threshold_delta: -0.10,
        min_group_delta: -1,
        granularity: GranularityBonus::None,
    },
    Policy {
        name: "High Consistency",
        description: "Prefers roles whose members hold nearly identical entitlements.",
        weights: Weights::new(0.20, 0.45, 0.20, 0.05, 0.10),
        threshold_delta: 0.10,
        min_group_delta: 0,
        granularity: GranularityBonus::None,
    },
    Policy {
        name: "Least Overspill",
        description: "Favors narrow multi-attribute criteria that sweep in few non-target users.",
        weights: Weights::new(0.25, 0.20, 0.05, 0.05, 0.45),
        threshold_delta: 0.0,
        min_group_delta: 0,
        granularity: GranularityBonus::FavorNarrow,
    },
    Policy {
        name: "Simplified Structure",
        description: "Favors few, broad single-attribute roles that are easy to administer.",
        weights: Weights::new(0.40, 0.15, 0.05, 0.35, 0.05),
        threshold_delta: -0.05,
        min_group_delta: 1,
        granularity: GranularityBonus::FavorBroad,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_roughly_one() {
        for policy in &POLICIES {
            assert!((policy.weights.total() - 1.0).abs() < 1e-9, "{}", policy.name);
        }
    }

    #[test]
    fn adjustments_are_clamped() {
        let coverage = &POLICIES[1];
        assert!((coverage.adjusted_threshold(0.55) - 0.50).abs() < 1e-12);
        assert_eq!(coverage.adjusted_min_group(2), 2);
        assert_eq!(coverage.adjusted_min_group(4), 3);

        let consistency = &POLICIES[2];
        assert!((consistency.adjusted_threshold(0.95) - 1.0).abs() < 1e-12);
        assert_eq!(POLICIES[4].adjusted_min_group(3), 4);
    }

    #[test]
    fn granularity_bonus_values() {
        assert_eq!(GranularityBonus::None.bonus(3), 0.0);
        assert!((GranularityBonus::FavorNarrow.bonus(3) - 0.30).abs() < 1e-12);
        assert!((GranularityBonus::FavorBroad.bonus(1) - 0.15).abs() < 1e-12);
        assert!((GranularityBonus::FavorBroad.bonus(3) - 0.05).abs() < 1e-12);
    }
}

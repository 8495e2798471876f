pub mod policies;
pub mod scorer;
pub mod selector;
pub mod variants;

use serde::{Deserialize, Serialize};

use crate::candidates::RefinedCandidate;

pub use policies::{GranularityBonus, Policy, POLICIES};
pub use scorer::{best_scoring, composite_score};
pub use selector::{select_roles, Selection};
pub use variants::run_variants;

/// Per-term weights of the greedy selection score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Weights {
    pub coverage: f64,
    pub commonality: f64,
    pub richness: f64,
    pub group_size: f64,
    pub precision: f64,
}

impl Weights {
    pub const fn new(
        coverage: f64,
        commonality: f64,
        richness: f64,
        group_size: f64,
        precision: f64,
    ) -> Self {
        Self {
            coverage,
            commonality,
            richness,
            group_size,
            precision,
        }
    }

    pub fn total(&self) -> f64 {
        self.coverage + self.commonality + self.richness + self.group_size + self.precision
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SolutionStats {
    pub total_roles: usize,
    pub total_users: usize,
    pub total_users_covered: usize,
    /// Fraction of target users covered, in `[0, 1]`.
    pub coverage_percent: f64,
    pub avg_commonality: f64,
    pub avg_precision: f64,
    pub total_overspill: usize,
    pub total_shared_entitlements: usize,
    pub strategies_used: Vec<String>,
}

/// One alternative role set, produced by one policy.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Solution {
    pub policy_index: usize,
    pub policy_name: String,
    pub description: String,
    pub recommended: bool,
    pub weights: Weights,
    pub threshold: f64,
    pub min_group: usize,
    /// Roles in the order the selector picked them.
    pub roles: Vec<RefinedCandidate>,
    pub ungrouped_users: Vec<String>,
    pub stats: SolutionStats,
    pub composite_score: f64,
}

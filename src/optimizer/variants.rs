use tracing::debug;

use crate::candidates::{refine_candidates, RawCandidate};
use crate::model::UserIndex;
use crate::optimizer::scorer::composite_score;
use crate::optimizer::selector::{select_roles, summarize};
use crate::optimizer::{Policy, Solution};
use crate::progress::{ProgressEvent, ProgressSink};

/// Runs refinement and greedy selection once per policy.
///
/// Solutions come back in `policies` order, not sorted by score; index 0 is the
/// recommended option.
pub fn run_variants(
    raw: &[RawCandidate],
    index: &UserIndex,
    universe: &[String],
    base_threshold: f64,
    base_min_group: usize,
    policies: &[Policy],
    progress: &mut dyn ProgressSink,
) -> Vec<Solution> {
    let total = policies.len();
    let mut solutions = Vec::with_capacity(total);

    for (policy_index, policy) in policies.iter().enumerate() {
        progress.report(&ProgressEvent::VariantStarted {
            index: policy_index,
            total,
            policy: policy.name.to_string(),
        });

        let solution = run_policy(
            raw,
            index,
            universe,
            base_threshold,
            base_min_group,
            policy_index,
            policy,
        );

        progress.report(&ProgressEvent::VariantFinished {
            index: policy_index,
            policy: solution.policy_name.clone(),
            roles: solution.roles.len(),
            composite_score: solution.composite_score,
        });
        solutions.push(solution);
    }

    solutions
}

pub fn run_policy(
    raw: &[RawCandidate],
    index: &UserIndex,
    universe: &[String],
    base_threshold: f64,
    base_min_group: usize,
    policy_index: usize,
    policy: &Policy,
) -> Solution {
    let threshold = policy.adjusted_threshold(base_threshold);
    let min_group = policy.adjusted_min_group(base_min_group);

    let mut pool = refine_candidates(raw, index, threshold, min_group);
    for candidate in &mut pool {
        candidate.bonus = policy.granularity.bonus(candidate.attr_count);
    }
    debug!(
        policy = policy.name,
        threshold,
        min_group,
        pool = pool.len(),
        "refined candidate pool"
    );

    let selection = select_roles(&pool, universe, &policy.weights, min_group);
    let roles: Vec<_> = selection
        .picked
        .iter()
        .map(|&idx| pool[idx].clone())
        .collect();
    let stats = summarize(&roles, universe, &selection.ungrouped_users);
    let composite_score = composite_score(&stats);

    Solution {
        policy_index,
        policy_name: policy.name.to_string(),
        description: policy.description.to_string(),
        recommended: policy_index == 0,
        weights: policy.weights,
        threshold,
        min_group,
        roles,
        ungrouped_users: selection.ungrouped_users,
        stats,
        composite_score,
    }
}

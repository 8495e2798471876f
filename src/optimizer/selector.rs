use std::collections::HashSet;

use tracing::debug;

use crate::candidates::RefinedCandidate;
use crate::optimizer::{SolutionStats, Weights};

/// Shared-entitlement count at which the richness term saturates.
pub const RICHNESS_CAP: f64 = 50.0;

/// Output of one greedy run. `picked` holds pool indices in pick order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub picked: Vec<usize>,
    pub ungrouped_users: Vec<String>,
}

/// Weighted greedy maximum coverage over `pool`.
///
/// Each round scores every unused candidate against the users still uncovered
/// and takes the strictly highest score; on a tie the earlier candidate wins.
/// A candidate must newly cover at least `min(min_group, uncovered)` users, which
/// lets a small candidate mop up the last few stragglers.
pub fn select_roles(
    pool: &[RefinedCandidate],
    universe: &[String],
    weights: &Weights,
    min_group: usize,
) -> Selection {
    let mut uncovered: HashSet<&str> = universe.iter().map(String::as_str).collect();
    let mut used = vec![false; pool.len()];
    let mut picked = Vec::new();
    let universe_size = universe.len().max(1) as f64;

    while !uncovered.is_empty() {
        let remaining = uncovered.len();
        let required = min_group.min(remaining);
        let mut best: Option<(usize, f64)> = None;

        for (idx, candidate) in pool.iter().enumerate() {
            if used[idx] {
                continue;
            }
            let newly_covered = candidate
                .members
                .iter()
                .filter(|m| uncovered.contains(m.as_str()))
                .count();
            if newly_covered < required || newly_covered == 0 {
                continue;
            }

            let score =
                selection_score(candidate, weights, newly_covered, remaining, universe_size);

            if best.map_or(true, |(_, top)| score > top) {
                best = Some((idx, score));
            }
        }

        let Some((idx, score)) = best else {
            break;
        };
        used[idx] = true;
        for member in &pool[idx].members {
            uncovered.remove(member.as_str());
        }
        debug!(
            role = %pool[idx].role_name,
            score,
            uncovered = uncovered.len(),
            "selected role"
        );
        picked.push(idx);
    }

    let ungrouped_users = universe
        .iter()
        .filter(|id| uncovered.contains(id.as_str()))
        .cloned()
        .collect();

    Selection {
        picked,
        ungrouped_users,
    }
}

/// Greedy score of one candidate given how many users it would newly cover.
pub fn selection_score(
    candidate: &RefinedCandidate,
    weights: &Weights,
    newly_covered: usize,
    remaining: usize,
    universe_size: f64,
) -> f64 {
    weights.coverage * (newly_covered as f64 / remaining.max(1) as f64)
        + weights.commonality * candidate.avg_commonality
        + weights.richness * (candidate.shared_entitlements.len() as f64 / RICHNESS_CAP).min(1.0)
        + weights.group_size * (candidate.member_count as f64 / universe_size).min(1.0)
        + weights.precision * candidate.precision
        + candidate.bonus
}

/// Aggregates over the selected roles. Means over zero roles are 0.
pub fn summarize(
    roles: &[RefinedCandidate],
    universe: &[String],
    ungrouped: &[String],
) -> SolutionStats {
    let total_roles = roles.len();
    let total_users = universe.len();
    let total_users_covered = total_users.saturating_sub(ungrouped.len());
    let mut strategies_used: Vec<String> = Vec::new();
    for role in roles {
        if !strategies_used.contains(&role.strategy) {
            strategies_used.push(role.strategy.clone());
        }
    }

    SolutionStats {
        total_roles,
        total_users,
        total_users_covered,
        coverage_percent: if total_users == 0 {
            0.0
        } else {
            total_users_covered as f64 / total_users as f64
        },
        avg_commonality: mean_over(roles, |r| r.avg_commonality),
        avg_precision: mean_over(roles, |r| r.precision),
        total_overspill: roles.iter().map(|r| r.overspill).sum(),
        total_shared_entitlements: roles.iter().map(|r| r.shared_entitlements.len()).sum(),
        strategies_used,
    }
}

fn mean_over(roles: &[RefinedCandidate], value: impl Fn(&RefinedCandidate) -> f64) -> f64 {
    if roles.is_empty() {
        return 0.0;
    }
    roles.iter().map(value).sum::<f64>() / roles.len() as f64
}

use crate::optimizer::{Solution, SolutionStats};

const COVERAGE_POINTS: f64 = 30.0;
const COMPACTNESS_POINTS: f64 = 25.0;
const COMMONALITY_POINTS: f64 = 15.0;
const PRECISION_POINTS: f64 = 20.0;
const RICHNESS_POINTS: f64 = 10.0;
/// Shared entitlements per role at which the richness points saturate.
const RICHNESS_PER_ROLE: f64 = 40.0;

/// Comparable 0..=100 score of a role set. Reporting only; selection never reads it.
pub fn composite_score(stats: &SolutionStats) -> f64 {
    let role_ratio = if stats.total_users == 0 {
        1.0
    } else {
        (stats.total_roles as f64 / stats.total_users as f64).min(1.0)
    };
    let richness = (stats.total_shared_entitlements as f64
        / (stats.total_roles.max(1) as f64 * RICHNESS_PER_ROLE))
        .min(1.0);

    stats.coverage_percent * COVERAGE_POINTS
        + (1.0 - role_ratio) * COMPACTNESS_POINTS
        + stats.avg_commonality * COMMONALITY_POINTS
        + stats.avg_precision * PRECISION_POINTS
        + richness * RICHNESS_POINTS
}

/// Index of the highest composite score; the first wins ties. Never reorders.
pub fn best_scoring(solutions: &[Solution]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, solution) in solutions.iter().enumerate() {
        if best.map_or(true, |(_, top)| solution.composite_score > top) {
            best = Some((idx, solution.composite_score));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(roles: usize, users: usize, coverage: f64, shared: usize) -> SolutionStats {
        SolutionStats {
            total_roles: roles,
            total_users: users,
            total_users_covered: (coverage * users as f64).round() as usize,
            coverage_percent: coverage,
            avg_commonality: 1.0,
            avg_precision: 1.0,
            total_overspill: 0,
            total_shared_entitlements: shared,
            strategies_used: Vec::new(),
        }
    }

    #[test]
    fn perfect_single_role_scores_near_hundred() {
        let score = composite_score(&stats(1, 100, 1.0, 40));
        assert!((score - (30.0 + 24.75 + 15.0 + 20.0 + 10.0)).abs() < 1e-9);
    }

    #[test]
    fn richness_is_capped_per_role() {
        let capped = composite_score(&stats(2, 10, 1.0, 500));
        let at_cap = composite_score(&stats(2, 10, 1.0, 80));
        assert!((capped - at_cap).abs() < 1e-9);
    }

    #[test]
    fn empty_solution_keeps_only_compactness_points() {
        let empty = SolutionStats {
            avg_commonality: 0.0,
            avg_precision: 0.0,
            ..stats(0, 5, 0.0, 0)
        };
        assert!((composite_score(&empty) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn more_roles_per_user_lowers_the_score() {
        let few = composite_score(&stats(2, 10, 1.0, 20));
        let many = composite_score(&stats(5, 10, 1.0, 50));
        assert!(few > many);
    }
}

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::candidates::{refine_candidates, RawCandidate, RefinedCandidate};
use crate::model::UserIndex;
use crate::ordered::OrderedMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BrowseStats {
    pub role_count: usize,
    /// Target users appearing in at least one of the strategy's roles.
    pub distinct_users: usize,
    pub avg_shared_entitlements: f64,
    pub avg_commonality: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedRole {
    /// `member_count * avg_commonality * shared entitlement count`.
    pub rank_score: f64,
    #[serde(flatten)]
    pub role: RefinedCandidate,
}

/// Every refined candidate of one strategy, best ranked first.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StrategyView {
    pub strategy: String,
    pub stats: BrowseStats,
    pub roles: Vec<RankedRole>,
}

pub fn rank_score(role: &RefinedCandidate) -> f64 {
    role.member_count as f64 * role.avg_commonality * role.shared_entitlements.len() as f64
}

/// Refines `raw` at one setting and groups the survivors by strategy.
///
/// Strategies keep generation order and are left out when nothing survives.
/// Within a strategy roles are sorted by descending [`rank_score`]; ties keep
/// generation order.
pub fn browse_by_strategy(
    raw: &[RawCandidate],
    index: &UserIndex,
    threshold: f64,
    min_group: usize,
) -> Vec<StrategyView> {
    let mut grouped: OrderedMap<String, Vec<RefinedCandidate>> = OrderedMap::new();
    for role in refine_candidates(raw, index, threshold, min_group) {
        grouped
            .get_or_insert_with(role.strategy.clone(), Vec::new)
            .push(role);
    }

    grouped
        .iter()
        .map(|(strategy, roles)| {
            let mut ranked: Vec<RankedRole> = roles
                .iter()
                .map(|role| RankedRole {
                    rank_score: rank_score(role),
                    role: role.clone(),
                })
                .collect();
            ranked.sort_by(|a, b| b.rank_score.total_cmp(&a.rank_score));

            let stats = browse_stats(roles);
            debug!(
                strategy = strategy.as_str(),
                roles = stats.role_count,
                users = stats.distinct_users,
                "strategy view"
            );
            StrategyView {
                strategy: strategy.clone(),
                stats,
                roles: ranked,
            }
        })
        .collect()
}

fn browse_stats(roles: &[RefinedCandidate]) -> BrowseStats {
    let role_count = roles.len();
    let distinct_users = roles
        .iter()
        .flat_map(|role| role.members.iter().map(String::as_str))
        .collect::<HashSet<_>>()
        .len();
    let (avg_shared_entitlements, avg_commonality) = if role_count == 0 {
        (0.0, 0.0)
    } else {
        let shared: usize = roles.iter().map(|r| r.shared_entitlements.len()).sum();
        let commonality: f64 = roles.iter().map(|r| r.avg_commonality).sum();
        (
            shared as f64 / role_count as f64,
            commonality / role_count as f64,
        )
    };
    BrowseStats {
        role_count,
        distinct_users,
        avg_shared_entitlements,
        avg_commonality,
    }
}

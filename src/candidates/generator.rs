use tracing::debug;

use crate::candidates::RawCandidate;
use crate::model::{UserIndex, UserRecord};
use crate::ordered::OrderedMap;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::strategy::{display_key, role_name, Strategy};

const MIN_RAW_GROUP: usize = 2;

/// Groups the target users under every strategy in `catalog`.
///
/// Returns candidates in strategy order, then first-seen group order. Population
/// counts come from every record in `index`, so overspill is measured against the
/// whole organization rather than the target list.
pub fn generate_candidates(
    index: &UserIndex,
    targets: &[&UserRecord],
    catalog: &[Strategy],
    progress: &mut dyn ProgressSink,
) -> Vec<RawCandidate> {
    progress.report(&ProgressEvent::GenerationStarted {
        strategies: catalog.len(),
    });
    let mut out = Vec::new();
    for (strategy_index, strategy) in catalog.iter().enumerate() {
        let produced = candidates_for_strategy(index, targets, strategy, out.len());
        debug!(
            strategy = strategy.name,
            candidates = produced.len(),
            "grouped target users"
        );
        progress.report(&ProgressEvent::StrategyGrouped {
            index: strategy_index,
            total: catalog.len(),
            strategy: strategy.name.to_string(),
            candidates: produced.len(),
        });
        out.extend(produced);
    }
    out
}

pub fn candidates_for_strategy(
    index: &UserIndex,
    targets: &[&UserRecord],
    strategy: &Strategy,
    first_id: usize,
) -> Vec<RawCandidate> {
    let mut groups: OrderedMap<Vec<String>, Vec<&UserRecord>> = OrderedMap::new();
    for user in targets {
        groups
            .get_or_insert_with(strategy.group_values(user), Vec::new)
            .push(*user);
    }

    let mut population: OrderedMap<Vec<String>, usize> = OrderedMap::new();
    for user in index.users() {
        *population.get_or_insert_with(strategy.group_values(user), || 0) += 1;
    }

    let labels = strategy.labels();
    let mut out = Vec::new();
    for (values, members) in groups {
        if members.len() < MIN_RAW_GROUP {
            continue;
        }

        let mut entitlement_counts = OrderedMap::new();
        for member in &members {
            for key in member.entitlements.iter() {
                *entitlement_counts.get_or_insert_with(key.clone(), || 0) += 1;
            }
        }

        let criteria = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                let value = values.get(idx).map(|v| v.trim()).unwrap_or("");
                (label.to_string(), value.to_string())
            })
            .collect();

        let member_count = members.len();
        // No population partition means no information: assume perfect precision.
        let org_total = population
            .get(&values)
            .copied()
            .unwrap_or(member_count)
            .max(member_count);

        out.push(RawCandidate {
            id: first_id + out.len(),
            strategy: strategy.name.to_string(),
            attr_count: strategy.attr_count(),
            group_key: display_key(&values),
            criteria,
            role_name: role_name(&values),
            members: members.iter().map(|m| m.id.clone()).collect(),
            member_count,
            entitlement_counts,
            org_total,
            overspill: org_total - member_count,
            precision: member_count as f64 / org_total as f64,
        });
    }
    out
}

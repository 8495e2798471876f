use crate::candidates::{EntitlementStat, RawCandidate, RefinedCandidate};
use crate::model::{EntitlementKey, UserIndex};
use crate::ordered::OrderedMap;

/// Entitlements held by fewer than this share of a group are reported as outliers.
pub const OUTLIER_CUTOFF: f64 = 0.20;

pub fn refine_candidates(
    raw: &[RawCandidate],
    index: &UserIndex,
    threshold: f64,
    min_group: usize,
) -> Vec<RefinedCandidate> {
    raw.iter()
        .filter_map(|candidate| refine_candidate(candidate, index, threshold, min_group))
        .collect()
}

/// Returns `None` when the group is smaller than `min_group` or no entitlement
/// reaches `threshold`.
///
/// Entitlements with commonality in `[OUTLIER_CUTOFF, threshold)` land in neither
/// list.
pub fn refine_candidate(
    raw: &RawCandidate,
    index: &UserIndex,
    threshold: f64,
    min_group: usize,
) -> Option<RefinedCandidate> {
    if raw.member_count < min_group || raw.member_count == 0 {
        return None;
    }

    let total = raw.member_count;
    let mut shared = Vec::new();
    let mut outliers = Vec::new();
    for (key, count) in raw.entitlement_counts.iter() {
        let commonality = *count as f64 / total as f64;
        let stat = EntitlementStat {
            key: key.clone(),
            commonality,
            user_count: *count,
            total_users: total,
        };
        if commonality >= threshold {
            shared.push(stat);
        } else if commonality < OUTLIER_CUTOFF {
            outliers.push(stat);
        }
    }
    if shared.is_empty() {
        return None;
    }

    // Stable sorts: ties keep first-seen order.
    shared.sort_by(|a, b| b.commonality.total_cmp(&a.commonality));
    outliers.sort_by(|a, b| a.commonality.total_cmp(&b.commonality));

    let avg_commonality =
        shared.iter().map(|s| s.commonality).sum::<f64>() / shared.len() as f64;

    Some(RefinedCandidate {
        id: raw.id,
        role_name: raw.role_name.clone(),
        strategy: raw.strategy.clone(),
        attr_count: raw.attr_count,
        criteria: raw.criteria.clone(),
        members: raw.members.clone(),
        member_count: raw.member_count,
        shared_entitlements: shared,
        outlier_entitlements: outliers,
        user_outliers: user_outliers(raw, index),
        avg_commonality,
        org_total: raw.org_total,
        overspill: raw.overspill,
        precision: raw.precision,
        bonus: 0.0,
    })
}

/// Entitlements that exactly one member of the group holds, keyed by that member.
fn user_outliers(raw: &RawCandidate, index: &UserIndex) -> OrderedMap<String, Vec<EntitlementKey>> {
    let mut out = OrderedMap::new();
    for member_id in &raw.members {
        let Some(member) = index.get(member_id) else {
            continue;
        };
        let unique: Vec<EntitlementKey> = member
            .entitlements
            .iter()
            .filter(|key| raw.entitlement_counts.get(*key) == Some(&1))
            .cloned()
            .collect();
        if !unique.is_empty() {
            out.insert(member_id.clone(), unique);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::generate_candidates;
    use crate::progress::NoopProgress;
    use crate::model::{UserRecord, FIELD_BUSINESS_LINE};
    use crate::strategy::DEFAULT_CATALOG;

    fn ent(id: &str) -> EntitlementKey {
        EntitlementKey::new(id, "CRM", "APP9", "Sales", id)
    }

    /// Five users in one business line: E1 held by all, E2 by four, E3 by two,
    /// E4 by the first user only.
    fn five_user_index() -> UserIndex {
        let holdings: [&[&str]; 5] = [
            &["E1", "E2", "E3", "E4"],
            &["E1", "E2", "E3"],
            &["E1", "E2"],
            &["E1", "E2"],
            &["E1"],
        ];
        holdings
            .iter()
            .enumerate()
            .map(|(i, ents)| {
                ents.iter().fold(
                    UserRecord::new(format!("U{i}")).with_attribute(FIELD_BUSINESS_LINE, "Ops"),
                    |user, e| user.with_entitlement(ent(e)),
                )
            })
            .collect()
    }

    fn raw_for(index: &UserIndex) -> Vec<RawCandidate> {
        let targets: Vec<_> = index.users().collect();
        generate_candidates(index, &targets, &DEFAULT_CATALOG[..1], &mut NoopProgress)
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let index = five_user_index();
        let raw = raw_for(&index);
        let refined = refine_candidate(&raw[0], &index, 0.8, 2).expect("candidate survives");
        let shared: Vec<_> = refined
            .shared_entitlements
            .iter()
            .map(|s| s.key.entitlement_id.as_str())
            .collect();
        assert_eq!(shared, vec!["E1", "E2"]);
        assert!((refined.shared_entitlements[1].commonality - 0.8).abs() < 1e-12);
        assert!((refined.avg_commonality - 0.9).abs() < 1e-12);
    }

    #[test]
    fn dead_zone_entitlements_are_in_neither_list() {
        let index = five_user_index();
        let raw = raw_for(&index);
        let refined = refine_candidate(&raw[0], &index, 0.8, 2).expect("candidate survives");
        let in_any = |id: &str| {
            refined
                .shared_entitlements
                .iter()
                .chain(refined.outlier_entitlements.iter())
                .any(|s| s.key.entitlement_id == id)
        };
        // E3 at 0.4 sits between the outlier cutoff and the threshold.
        assert!(!in_any("E3"));
        assert!(refined.outlier_entitlements.is_empty());
    }

    #[test]
    fn outliers_sit_below_cutoff_and_sort_ascending() {
        let mut index = five_user_index();
        for i in 5..10 {
            index.insert(
                UserRecord::new(format!("U{i}"))
                    .with_attribute(FIELD_BUSINESS_LINE, "Ops")
                    .with_entitlement(ent("E1")),
            );
        }
        index.add_entitlement("U5", ent("E5"));
        let raw = raw_for(&index);
        let refined = refine_candidate(&raw[0], &index, 0.9, 2).expect("candidate survives");
        let outliers: Vec<_> = refined
            .outlier_entitlements
            .iter()
            .map(|s| (s.key.entitlement_id.as_str(), s.user_count))
            .collect();
        // E3 at exactly 0.20 is not an outlier; E4 and E5 tie and keep first-seen order.
        assert_eq!(outliers, vec![("E4", 1), ("E5", 1)]);
        for stat in &refined.outlier_entitlements {
            assert!(stat.commonality < OUTLIER_CUTOFF);
        }
        for stat in &refined.shared_entitlements {
            assert!(stat.commonality >= 0.9);
        }
    }

    #[test]
    fn user_outliers_list_single_holder_entitlements() {
        let index = five_user_index();
        let raw = raw_for(&index);
        let refined = refine_candidate(&raw[0], &index, 1.0, 2).expect("candidate survives");
        assert_eq!(refined.user_outliers.len(), 1);
        assert_eq!(refined.user_outliers.get("U0"), Some(&vec![ent("E4")]));
    }

    #[test]
    fn drops_small_groups_and_groups_without_shared_entitlements() {
        let index = five_user_index();
        let raw = raw_for(&index);
        assert!(refine_candidate(&raw[0], &index, 0.8, 6).is_none());

        let sparse: UserIndex = ["A", "B"]
            .iter()
            .zip(["E1", "E2"])
            .map(|(id, e)| {
                UserRecord::new(*id)
                    .with_attribute(FIELD_BUSINESS_LINE, "Ops")
                    .with_entitlement(ent(e))
            })
            .collect();
        let raw = raw_for(&sparse);
        assert!(refine_candidates(&raw, &sparse, 0.6, 2).is_empty());
    }

    #[test]
    fn lowering_min_group_never_loses_candidates() {
        let index = five_user_index();
        let targets: Vec<_> = index.users().collect();
        let raw = generate_candidates(&index, &targets, &DEFAULT_CATALOG, &mut NoopProgress);
        let mut previous = 0;
        for min_group in (2..=6).rev() {
            let count = refine_candidates(&raw, &index, 0.75, min_group).len();
            assert!(count >= previous);
            previous = count;
        }
    }
}

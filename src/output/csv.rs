use anyhow::Result;

use crate::candidates::RefinedCandidate;
use crate::model::UserIndex;
use crate::optimizer::Solution;

fn percent(fraction: f64) -> String {
    format!("{:.1}", fraction * 100.0)
}

fn criteria_text(role: &RefinedCandidate) -> String {
    role.criteria
        .iter()
        .map(|(label, value)| format!("{label}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn solutions_to_csv(solutions: &[Solution]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "policy_index",
        "policy",
        "recommended",
        "roles",
        "users_covered",
        "coverage_pct",
        "avg_commonality_pct",
        "avg_precision_pct",
        "overspill",
        "composite_score",
    ])?;
    for solution in solutions {
        let stats = &solution.stats;
        writer.write_record([
            solution.policy_index.to_string(),
            solution.policy_name.clone(),
            solution.recommended.to_string(),
            stats.total_roles.to_string(),
            format!("{}/{}", stats.total_users_covered, stats.total_users),
            percent(stats.coverage_percent),
            percent(stats.avg_commonality),
            percent(stats.avg_precision),
            stats.total_overspill.to_string(),
            format!("{:.1}", solution.composite_score),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// One row per shared entitlement of every role in `solution`.
pub fn roles_to_csv(solution: &Solution) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "Role Name",
        "Strategy",
        "Criteria",
        "Member Count",
        "Avg Commonality %",
        "Org Total",
        "Overspill",
        "Precision %",
        "Entitlement Application",
        "Application ID",
        "Business Unit",
        "Entitlement Name",
        "Entitlement ID",
        "Entitlement Commonality %",
        "Members",
    ])?;
    for role in &solution.roles {
        let criteria = criteria_text(role);
        let members = role.members.join("; ");
        for stat in &role.shared_entitlements {
            writer.write_record([
                role.role_name.clone(),
                role.strategy.clone(),
                criteria.clone(),
                role.member_count.to_string(),
                percent(role.avg_commonality),
                role.org_total.to_string(),
                role.overspill.to_string(),
                percent(role.precision),
                stat.key.application.clone(),
                stat.key.application_id.clone(),
                stat.key.business_unit.clone(),
                stat.key.entitlement_name.clone(),
                stat.key.entitlement_id.clone(),
                percent(stat.commonality),
                members.clone(),
            ])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

/// Grants that stay outside each role: low-commonality entitlements of the
/// group, then the per-user exceptions.
pub fn outliers_to_csv(solution: &Solution, index: &UserIndex) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "Role Name",
        "Kind",
        "Employee",
        "Entitlement Application",
        "Application ID",
        "Business Unit",
        "Entitlement Name",
        "Entitlement ID",
        "Holders",
        "Entitlement Commonality %",
    ])?;
    for role in &solution.roles {
        for stat in &role.outlier_entitlements {
            writer.write_record([
                role.role_name.clone(),
                "group".to_string(),
                String::new(),
                stat.key.application.clone(),
                stat.key.application_id.clone(),
                stat.key.business_unit.clone(),
                stat.key.entitlement_name.clone(),
                stat.key.entitlement_id.clone(),
                format!("{}/{}", stat.user_count, stat.total_users),
                percent(stat.commonality),
            ])?;
        }
        for (user, grants) in role.user_outliers.iter() {
            let label = index.member_label(user);
            for key in grants {
                writer.write_record([
                    role.role_name.clone(),
                    "individual".to_string(),
                    label.clone(),
                    key.application.clone(),
                    key.application_id.clone(),
                    key.business_unit.clone(),
                    key.entitlement_name.clone(),
                    key.entitlement_id.clone(),
                    format!("1/{}", role.member_count),
                    percent(1.0 / role.member_count.max(1) as f64),
                ])?;
            }
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

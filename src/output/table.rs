use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::candidates::{EntitlementStat, RefinedCandidate, StrategyView};
use crate::model::UserIndex;
use crate::optimizer::{Policy, Solution};
use crate::strategy::Strategy;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn pct(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn render_solutions_table(solutions: &[Solution]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "#",
        "Policy",
        "Roles",
        "Covered",
        "Coverage",
        "Avg Commonality",
        "Avg Precision",
        "Overspill",
        "Score",
    ]);

    for s in solutions {
        let name = if s.recommended {
            Cell::new(format!("{} (recommended)", s.policy_name)).fg(Color::Green)
        } else {
            Cell::new(&s.policy_name)
        };
        table.add_row(Row::from(vec![
            Cell::new(s.policy_index),
            name,
            Cell::new(s.stats.total_roles),
            Cell::new(format!(
                "{}/{}",
                s.stats.total_users_covered, s.stats.total_users
            )),
            Cell::new(pct(s.stats.coverage_percent)),
            Cell::new(pct(s.stats.avg_commonality)),
            Cell::new(pct(s.stats.avg_precision)),
            Cell::new(s.stats.total_overspill),
            Cell::new(format!("{:.1}", s.composite_score)),
        ]));
    }
    table.to_string()
}

/// Roles of one solution, followed by the users no role covers.
pub fn render_roles_table(solution: &Solution) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Role",
        "Strategy",
        "Members",
        "Shared",
        "Avg Commonality",
        "Org Total",
        "Overspill",
        "Precision",
    ]);

    for role in &solution.roles {
        let precision = if role.precision >= 0.8 {
            Cell::new(pct(role.precision)).fg(Color::Green)
        } else if role.precision < 0.3 {
            Cell::new(pct(role.precision)).fg(Color::Red)
        } else {
            Cell::new(pct(role.precision))
        };
        table.add_row(Row::from(vec![
            Cell::new(&role.role_name),
            Cell::new(&role.strategy),
            Cell::new(role.member_count),
            Cell::new(role.shared_entitlements.len()),
            Cell::new(pct(role.avg_commonality)),
            Cell::new(role.org_total),
            Cell::new(role.overspill),
            precision,
        ]));
    }

    let mut out = table.to_string();
    if !solution.ungrouped_users.is_empty() {
        out.push_str(&format!(
            "\nUngrouped users ({}): {}",
            solution.ungrouped_users.len(),
            solution.ungrouped_users.join(", ")
        ));
    }
    out
}

fn entitlements_table(stats: &[EntitlementStat]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Application", "Entitlement", "ID", "Commonality"]);
    for stat in stats {
        table.add_row(vec![
            stat.key.application.clone(),
            stat.key.entitlement_name.clone(),
            stat.key.entitlement_id.clone(),
            format!(
                "{} ({}/{})",
                pct(stat.commonality),
                stat.user_count,
                stat.total_users
            ),
        ]);
    }
    table
}

/// Full breakdown of one role: criteria, shared entitlements, members and
/// the grants that fall outside the role.
pub fn render_role_detail(role: &RefinedCandidate, index: &UserIndex) -> String {
    let mut out = format!(
        "{} [{}]\nPrecision {} ({} of {} in org, overspill {})\n",
        role.role_name,
        role.strategy,
        pct(role.precision),
        role.member_count,
        role.org_total,
        role.overspill
    );

    out.push_str("\nGrouping criteria\n");
    for (label, value) in role.criteria.iter() {
        out.push_str(&format!("  {label}: {value}\n"));
    }

    out.push_str(&format!(
        "\nRecommended role entitlements ({})\n",
        role.shared_entitlements.len()
    ));
    out.push_str(&entitlements_table(&role.shared_entitlements).to_string());
    out.push('\n');

    out.push_str(&format!("\nGroup members ({})\n", role.member_count));
    for member in &role.members {
        out.push_str(&format!("  {}\n", index.member_label(member)));
    }

    if !role.outlier_entitlements.is_empty() {
        out.push_str(&format!(
            "\nLow-commonality entitlements ({})\n",
            role.outlier_entitlements.len()
        ));
        out.push_str(&entitlements_table(&role.outlier_entitlements).to_string());
        out.push('\n');
    }

    if !role.user_outliers.is_empty() {
        out.push_str("\nException / individual entitlements\n");
        for (user, grants) in role.user_outliers.iter() {
            let listed: Vec<String> = grants
                .iter()
                .map(|key| format!("{} / {}", key.application, key.entitlement_name))
                .collect();
            out.push_str(&format!(
                "  {}: {}\n",
                index.member_label(user),
                listed.join(", ")
            ));
        }
    }
    out
}

/// One strategy's candidate roles, ranked, under a line of summary stats.
pub fn render_strategy_view(view: &StrategyView) -> String {
    let mut out = format!(
        "{}: {} roles, {} users, {:.1} shared entitlements per role, {} avg commonality\n",
        view.strategy,
        view.stats.role_count,
        view.stats.distinct_users,
        view.stats.avg_shared_entitlements,
        pct(view.stats.avg_commonality)
    );

    let mut table = new_table();
    table.set_header(vec![
        "Rank",
        "Role",
        "Members",
        "Shared",
        "Avg Commonality",
        "Precision",
        "Score",
    ]);
    for (rank, ranked) in view.roles.iter().enumerate() {
        let role = &ranked.role;
        table.add_row(Row::from(vec![
            Cell::new(rank + 1),
            Cell::new(&role.role_name),
            Cell::new(role.member_count),
            Cell::new(role.shared_entitlements.len()),
            Cell::new(pct(role.avg_commonality)),
            Cell::new(pct(role.precision)),
            Cell::new(format!("{:.1}", ranked.rank_score)),
        ]));
    }
    out.push_str(&table.to_string());
    out
}

pub fn render_strategies_table(catalog: &[Strategy]) -> String {
    let mut table = new_table();
    table.set_header(vec!["#", "Strategy", "Attributes", "Attribute Count"]);
    for (idx, strategy) in catalog.iter().enumerate() {
        table.add_row(vec![
            idx.to_string(),
            strategy.name.to_string(),
            strategy.attributes.join(", "),
            strategy.attr_count().to_string(),
        ]);
    }
    table.to_string()
}

pub fn render_policies_table(policies: &[Policy]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "#",
        "Policy",
        "Coverage",
        "Commonality",
        "Richness",
        "Group Size",
        "Precision",
        "Threshold Δ",
        "Min Group Δ",
        "Bonus",
    ]);
    for (idx, p) in policies.iter().enumerate() {
        table.add_row(vec![
            idx.to_string(),
            p.name.to_string(),
            format!("{:.2}", p.weights.coverage),
            format!("{:.2}", p.weights.commonality),
            format!("{:.2}", p.weights.richness),
            format!("{:.2}", p.weights.group_size),
            format!("{:.2}", p.weights.precision),
            format!("{:+.2}", p.threshold_delta),
            format!("{:+}", p.min_group_delta),
            format!("{:?}", p.granularity),
        ]);
    }
    table.to_string()
}

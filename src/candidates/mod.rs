pub mod browse;
pub mod generator;
pub mod refiner;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::model::EntitlementKey;
use crate::ordered::OrderedMap;

pub use browse::{browse_by_strategy, BrowseStats, RankedRole, StrategyView};
pub use generator::generate_candidates;
pub use refiner::{refine_candidate, refine_candidates, OUTLIER_CUTOFF};

/// One attribute group of target users, before any threshold is applied.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RawCandidate {
    /// Position in generation order; stable across variants.
    pub id: usize,
    pub strategy: String,
    pub attr_count: usize,
    pub group_key: String,
    pub criteria: OrderedMap<String, String>,
    pub role_name: String,
    pub members: Vec<String>,
    pub member_count: usize,
    #[serde(serialize_with = "serialize_counts")]
    pub entitlement_counts: OrderedMap<EntitlementKey, usize>,
    pub org_total: usize,
    pub overspill: usize,
    pub precision: f64,
}

#[derive(Serialize)]
struct EntitlementCount<'a> {
    #[serde(flatten)]
    key: &'a EntitlementKey,
    count: usize,
}

/// Struct keys cannot be JSON object keys, so counts go out as a list.
fn serialize_counts<S: Serializer>(
    counts: &OrderedMap<EntitlementKey, usize>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(counts.len()))?;
    for (key, count) in counts.iter() {
        seq.serialize_element(&EntitlementCount { key, count: *count })?;
    }
    seq.end()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitlementStat {
    #[serde(flatten)]
    pub key: EntitlementKey,
    pub commonality: f64,
    pub user_count: usize,
    pub total_users: usize,
}

/// A raw candidate evaluated at one (threshold, min group) setting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefinedCandidate {
    pub id: usize,
    pub role_name: String,
    pub strategy: String,
    pub attr_count: usize,
    pub criteria: OrderedMap<String, String>,
    pub members: Vec<String>,
    pub member_count: usize,
    pub shared_entitlements: Vec<EntitlementStat>,
    pub outlier_entitlements: Vec<EntitlementStat>,
    pub user_outliers: OrderedMap<String, Vec<EntitlementKey>>,
    pub avg_commonality: f64,
    pub org_total: usize,
    pub overspill: usize,
    pub precision: f64,
    /// Additive selector bonus set by the active policy.
    pub bonus: f64,
}

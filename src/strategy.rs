use serde::Serialize;

use crate::model::{
    UserRecord, FIELD_BUSINESS_LINE, FIELD_COST_CENTER_NAME, FIELD_JOB_FAMILY, FIELD_JOB_GRADE,
    FIELD_REGION, FIELD_SNODE_L3, FIELD_SNODE_L4, FIELD_SNODE_L5,
};

pub const KEY_SEPARATOR: &str = " | ";
pub const ROLE_NAME_SEPARATOR: &str = " - ";
const LABEL_SEPARATOR: &str = " + ";

/// A fixed way of partitioning users by one or more HR attributes.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Strategy {
    pub name: &'static str,
    pub attributes: &'static [&'static str],
}

impl Strategy {
    pub const fn new(name: &'static str, attributes: &'static [&'static str]) -> Self {
        Self { name, attributes }
    }

    pub fn attr_count(&self) -> usize {
        self.attributes.len()
    }

    /// Criteria labels exported with each role: the strategy name split on
    /// `" + "`, so "SNODE L3 + L4" yields `["SNODE L3", "L4"]`.
    pub fn labels(&self) -> Vec<&'static str> {
        self.name.split(LABEL_SEPARATOR).map(str::trim).collect()
    }

    /// Attribute values in attribute order. This tuple is the group identity.
    pub fn group_values(&self, user: &UserRecord) -> Vec<String> {
        self.attributes
            .iter()
            .map(|field| user.attribute(field).to_string())
            .collect()
    }
}

pub fn display_key(values: &[String]) -> String {
    values.join(KEY_SEPARATOR)
}

pub fn role_name(values: &[String]) -> String {
    values
        .iter()
        .map(|v| v.trim())
        .collect::<Vec<_>>()
        .join(ROLE_NAME_SEPARATOR)
}

pub const DEFAULT_CATALOG: [Strategy; 9] = [
    Strategy::new("Business Line", &[FIELD_BUSINESS_LINE]),
    Strategy::new(
        "Business Line + Job Family",
        &[FIELD_BUSINESS_LINE, FIELD_JOB_FAMILY],
    ),
    Strategy::new(
        "Business Line + Job Grade",
        &[FIELD_BUSINESS_LINE, FIELD_JOB_GRADE],
    ),
    Strategy::new("Business Line + Region", &[FIELD_BUSINESS_LINE, FIELD_REGION]),
    Strategy::new("Job Family + Job Grade", &[FIELD_JOB_FAMILY, FIELD_JOB_GRADE]),
    Strategy::new("Cost Center", &[FIELD_COST_CENTER_NAME]),
    Strategy::new("SNODE L3 + L4", &[FIELD_SNODE_L3, FIELD_SNODE_L4]),
    Strategy::new(
        "SNODE L3 + L4 + L5",
        &[FIELD_SNODE_L3, FIELD_SNODE_L4, FIELD_SNODE_L5],
    ),
    Strategy::new(
        "Region + Job Family + Job Grade",
        &[FIELD_REGION, FIELD_JOB_FAMILY, FIELD_JOB_GRADE],
    ),
];

pub fn default_catalog() -> Vec<Strategy> {
    DEFAULT_CATALOG.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_strategy_name() {
        let snode = DEFAULT_CATALOG[6];
        assert_eq!(snode.labels(), vec!["SNODE L3", "L4"]);
        assert_eq!(snode.attr_count(), 2);
    }

    #[test]
    fn group_values_fill_missing_fields_with_empty() {
        let user = UserRecord::new("E1").with_attribute(FIELD_BUSINESS_LINE, "Markets");
        let values = DEFAULT_CATALOG[1].group_values(&user);
        assert_eq!(values, vec!["Markets".to_string(), String::new()]);
        assert_eq!(display_key(&values), "Markets | ");
        assert_eq!(role_name(&values), "Markets - ");
    }

    #[test]
    fn catalog_is_fixed_and_ordered() {
        let names: Vec<_> = default_catalog().iter().map(|s| s.name).collect();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], "Business Line");
        assert_eq!(names[8], "Region + Job Family + Job Grade");
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ordered::{OrderedMap, OrderedSet};

pub const FIELD_EMPLOYEE_ID: &str = "Employee ID";
pub const FIELD_FIRST_NAME: &str = "Employee First Name";
pub const FIELD_LAST_NAME: &str = "Employee Last Name";
pub const FIELD_BUSINESS_LINE: &str = "Business Line";
pub const FIELD_JOB_FAMILY: &str = "Job Family";
pub const FIELD_JOB_GRADE: &str = "Job Grade / Band";
pub const FIELD_REGION: &str = "Region";
pub const FIELD_COST_CENTER_NAME: &str = "Cost Center Name";
pub const FIELD_SNODE_L3: &str = "SNODE L3";
pub const FIELD_SNODE_L4: &str = "SNODE L4";
pub const FIELD_SNODE_L5: &str = "SNODE L5";

/// Composite entitlement identity. Two grants are the same entitlement only
/// when all five fields match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntitlementKey {
    pub entitlement_id: String,
    pub application: String,
    pub application_id: String,
    pub business_unit: String,
    pub entitlement_name: String,
}

impl EntitlementKey {
    pub fn new(
        entitlement_id: impl Into<String>,
        application: impl Into<String>,
        application_id: impl Into<String>,
        business_unit: impl Into<String>,
        entitlement_name: impl Into<String>,
    ) -> Self {
        Self {
            entitlement_id: entitlement_id.into(),
            application: application.into(),
            application_id: application_id.into(),
            business_unit: business_unit.into(),
            entitlement_name: entitlement_name.into(),
        }
    }
}

impl Display for EntitlementKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}",
            self.entitlement_id,
            self.application,
            self.application_id,
            self.business_unit,
            self.entitlement_name
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub attributes: OrderedMap<String, String>,
    #[serde(default)]
    pub entitlements: OrderedSet<EntitlementKey>,
}

impl UserRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: OrderedMap::new(),
            entitlements: OrderedSet::new(),
        }
    }

    pub fn with_attribute(mut self, field: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(field.to_string(), value.into());
        self
    }

    pub fn with_entitlement(mut self, key: EntitlementKey) -> Self {
        self.entitlements.insert(key);
        self
    }

    /// Missing HR fields read as an empty string rather than failing grouping.
    pub fn attribute(&self, field: &str) -> &str {
        self.attributes
            .get(field)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn display_name(&self) -> Option<String> {
        let first = self.attribute(FIELD_FIRST_NAME);
        let last = self.attribute(FIELD_LAST_NAME);
        let full = format!("{first} {last}").trim().to_string();
        if full.is_empty() {
            None
        } else {
            Some(full)
        }
    }
}

/// The whole organizational population, keyed by user id in load order.
///
/// Target users are looked up here, and every record doubles as the
/// population baseline for overspill.
#[derive(Debug, Clone, Default)]
pub struct UserIndex {
    users: OrderedMap<String, UserRecord>,
}

impl UserIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any earlier record with the same id.
    pub fn insert(&mut self, user: UserRecord) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn get(&self, id: &str) -> Option<&UserRecord> {
        self.users.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.users.contains_key(id)
    }

    /// Returns `false` when the user is unknown.
    pub fn add_entitlement(&mut self, user_id: &str, key: EntitlementKey) -> bool {
        match self.users.get_mut(user_id) {
            Some(user) => {
                user.entitlements.insert(key);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn users(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }

    /// `id (First Last)` when the HR record carries a name, otherwise the bare id.
    pub fn member_label(&self, id: &str) -> String {
        match self.get(id).and_then(UserRecord::display_name) {
            Some(name) => format!("{id} ({name})"),
            None => id.to_string(),
        }
    }
}

impl FromIterator<UserRecord> for UserIndex {
    fn from_iter<I: IntoIterator<Item = UserRecord>>(iter: I) -> Self {
        let mut index = Self::new();
        for user in iter {
            index.insert(user);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attribute_reads_as_empty() {
        let user = UserRecord::new("E1").with_attribute(FIELD_REGION, "EMEA");
        assert_eq!(user.attribute(FIELD_REGION), "EMEA");
        assert_eq!(user.attribute(FIELD_JOB_FAMILY), "");
    }

    #[test]
    fn entitlement_identity_uses_all_fields() {
        let a = EntitlementKey::new("ENT1", "Ledger", "APP1", "Finance", "Read");
        let b = EntitlementKey::new("ENT1", "Ledger", "APP1", "Markets", "Read");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "ENT1|Ledger|APP1|Finance|Read");
    }

    #[test]
    fn add_entitlement_ignores_unknown_users() {
        let mut index: UserIndex = [UserRecord::new("E1")].into_iter().collect();
        let key = EntitlementKey::new("ENT1", "Ledger", "APP1", "Finance", "Read");
        assert!(index.add_entitlement("E1", key.clone()));
        assert!(index.add_entitlement("E1", key.clone()));
        assert!(!index.add_entitlement("E404", key));
        assert_eq!(index.get("E1").map(|u| u.entitlements.len()), Some(1));
    }

    #[test]
    fn display_name_joins_first_and_last() {
        let user = UserRecord::new("E1")
            .with_attribute(FIELD_FIRST_NAME, "Ada")
            .with_attribute(FIELD_LAST_NAME, "Lovelace");
        assert_eq!(user.display_name().as_deref(), Some("Ada Lovelace"));
        assert!(UserRecord::new("E2").display_name().is_none());
    }

    #[test]
    fn member_label_falls_back_to_the_id() {
        let index: UserIndex = [
            UserRecord::new("E1")
                .with_attribute(FIELD_FIRST_NAME, "Ada")
                .with_attribute(FIELD_LAST_NAME, "Lovelace"),
            UserRecord::new("E2"),
        ]
        .into_iter()
        .collect();
        assert_eq!(index.member_label("E1"), "E1 (Ada Lovelace)");
        assert_eq!(index.member_label("E2"), "E2");
        assert_eq!(index.member_label("E404"), "E404");
    }
}

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{EntitlementKey, UserIndex, UserRecord};
use crate::ordered::OrderedSet;

const ID_COLUMN_NORMALIZED: &str = "employeeid";
const COL_ENTITLEMENT_ID: &str = "Entitlement ID";
const COL_APPLICATION: &str = "Application";
const COL_APPLICATION_ID: &str = "Application ID";
const COL_BUSINESS_UNIT: &str = "Application Business Unit";
const COL_ENTITLEMENT_NAME: &str = "Entitlement Name";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("{source_name} has no {column} column")]
    MissingColumn { source_name: String, column: String },
    #[error("at least 2 target users must exist in HR data, found {found}")]
    TooFewTargets { found: usize },
}

/// True for headers such as `Employee ID`, `employee_id` or `EMPLOYEE-ID`.
pub fn is_id_column(header: &str) -> bool {
    let normalized: String = header
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    normalized == ID_COLUMN_NORMALIZED
}

fn find_id_column(headers: &csv::StringRecord, source_name: &str) -> Result<usize, IngestError> {
    headers
        .iter()
        .position(is_id_column)
        .ok_or_else(|| IngestError::MissingColumn {
            source_name: source_name.to_string(),
            column: crate::model::FIELD_EMPLOYEE_ID.to_string(),
        })
}

fn optional_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn field<'r>(record: &'r csv::StringRecord, column: Option<usize>) -> &'r str {
    column.and_then(|idx| record.get(idx)).unwrap_or("").trim()
}

/// Reads the HR extract and the entitlement extract into one index.
///
/// Every HR column other than the id becomes an attribute. Entitlement rows for
/// employees missing from HR are skipped.
pub fn load_population<H: Read, E: Read>(hr: H, entitlements: E) -> Result<UserIndex, IngestError> {
    let mut index = read_hr(hr)?;
    let (attached, skipped) = attach_entitlements(&mut index, entitlements)?;
    if skipped > 0 {
        warn!("skipped {skipped} entitlement rows for employees missing from HR data");
    }
    info!(
        users = index.len(),
        entitlement_rows = attached,
        "population loaded"
    );
    Ok(index)
}

fn read_hr<R: Read>(reader: R) -> Result<UserIndex, IngestError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_col = find_id_column(&headers, "HR data")?;

    let mut index = UserIndex::new();
    for row in rdr.records() {
        let row = row?;
        let id = field(&row, Some(id_col));
        if id.is_empty() {
            continue;
        }
        let mut user = UserRecord::new(id);
        for (col, header) in headers.iter().enumerate() {
            if col == id_col {
                continue;
            }
            user = user.with_attribute(header.trim(), field(&row, Some(col)));
        }
        index.insert(user);
    }
    Ok(index)
}

fn attach_entitlements<R: Read>(
    index: &mut UserIndex,
    reader: R,
) -> Result<(usize, usize), IngestError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_col = find_id_column(&headers, "entitlement data")?;
    let entitlement_col = optional_column(&headers, COL_ENTITLEMENT_ID).ok_or_else(|| {
        IngestError::MissingColumn {
            source_name: "entitlement data".to_string(),
            column: COL_ENTITLEMENT_ID.to_string(),
        }
    })?;
    let application_col = optional_column(&headers, COL_APPLICATION);
    let application_id_col = optional_column(&headers, COL_APPLICATION_ID);
    let business_unit_col = optional_column(&headers, COL_BUSINESS_UNIT);
    let name_col = optional_column(&headers, COL_ENTITLEMENT_NAME);

    let (mut attached, mut skipped) = (0, 0);
    for row in rdr.records() {
        let row = row?;
        let key = EntitlementKey::new(
            field(&row, Some(entitlement_col)),
            field(&row, application_col),
            field(&row, application_id_col),
            field(&row, business_unit_col),
            field(&row, name_col),
        );
        if index.add_entitlement(field(&row, Some(id_col)), key) {
            attached += 1;
        } else {
            skipped += 1;
        }
    }
    Ok((attached, skipped))
}

/// Reads a one-column (or wider) user list; blanks are dropped, order kept.
pub fn load_target_ids<R: Read>(reader: R) -> Result<Vec<String>, IngestError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_col = find_id_column(&headers, "user list")?;

    let mut ids = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let id = field(&row, Some(id_col));
        if !id.is_empty() {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

/// Keeps the ids present in `index`, first occurrence order, without duplicates.
pub fn resolve_targets(index: &UserIndex, ids: &[String]) -> Result<Vec<String>, IngestError> {
    let mut known = OrderedSet::new();
    let mut unknown = Vec::new();
    for id in ids {
        if index.contains(id) {
            known.insert(id.clone());
        } else {
            unknown.push(id.as_str());
        }
    }
    if !unknown.is_empty() {
        warn!(
            "{} ids not found in HR data: {}",
            unknown.len(),
            unknown.join(", ")
        );
    }
    if known.len() < 2 {
        return Err(IngestError::TooFewTargets { found: known.len() });
    }
    Ok(known.iter().cloned().collect())
}

pub fn load_population_from_paths(hr_path: &Path, entitlements_path: &Path) -> Result<UserIndex> {
    let hr = File::open(hr_path)
        .with_context(|| format!("failed to open HR data {}", hr_path.display()))?;
    let entitlements = File::open(entitlements_path).with_context(|| {
        format!(
            "failed to open entitlement data {}",
            entitlements_path.display()
        )
    })?;
    load_population(hr, entitlements).with_context(|| {
        format!(
            "failed to load {} and {}",
            hr_path.display(),
            entitlements_path.display()
        )
    })
}

pub fn load_target_ids_from_path(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("failed to open user list {}", path.display()))?;
    load_target_ids(file).with_context(|| format!("failed to read user list {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FIELD_BUSINESS_LINE, FIELD_REGION};

    const HR: &str = "\
Employee ID,Employee First Name,Employee Last Name,Business Line,Region
E1,Ada,Lovelace,Markets,EMEA
E2,Alan,Turing,Markets,NA
E3,Grace,Hopper,Risk,NA
,Blank,Row,Risk,NA
";

    const ENTITLEMENTS: &str = "\
Employee ID,Entitlement ID,Application,Application ID,Application Business Unit,Entitlement Name
E1,ENT-1,Ledger,APP1,Finance,Read
E1,ENT-2,Ledger,APP1,Finance,Write
E2,ENT-1,Ledger,APP1,Finance,Read
E9,ENT-1,Ledger,APP1,Finance,Read
";

    #[test]
    fn id_column_names_are_flexible() {
        assert!(is_id_column("Employee ID"));
        assert!(is_id_column(" employee_id "));
        assert!(is_id_column("EMPLOYEE-ID"));
        assert!(is_id_column("EmployeeId"));
        assert!(!is_id_column("Employee"));
        assert!(!is_id_column("Manager Employee ID"));
    }

    #[test]
    fn loads_attributes_and_entitlements() {
        let index = load_population(HR.as_bytes(), ENTITLEMENTS.as_bytes()).expect("load");
        assert_eq!(index.len(), 3);

        let ada = index.get("E1").expect("E1 present");
        assert_eq!(ada.attribute(FIELD_BUSINESS_LINE), "Markets");
        assert_eq!(ada.attribute(FIELD_REGION), "EMEA");
        assert_eq!(ada.display_name().as_deref(), Some("Ada Lovelace"));
        assert_eq!(ada.entitlements.len(), 2);

        let grace = index.get("E3").expect("E3 present");
        assert!(grace.entitlements.is_empty());
        assert!(!index.contains("E9"));
    }

    #[test]
    fn missing_optional_entitlement_columns_read_as_empty() {
        let ents = "employee_id,Entitlement ID\nE1,ENT-7\n";
        let index = load_population(HR.as_bytes(), ents.as_bytes()).expect("load");
        let key = index
            .get("E1")
            .and_then(|u| u.entitlements.iter().next())
            .expect("one entitlement");
        assert_eq!(key.entitlement_id, "ENT-7");
        assert_eq!(key.application, "");
        assert_eq!(key.entitlement_name, "");
    }

    #[test]
    fn missing_id_column_is_reported() {
        let err = load_population("Name,Region\nA,NA\n".as_bytes(), ENTITLEMENTS.as_bytes())
            .expect_err("no id column");
        assert!(matches!(
            err,
            IngestError::MissingColumn { ref source_name, .. } if source_name == "HR data"
        ));
    }

    #[test]
    fn target_list_trims_and_drops_blanks() {
        let ids = load_target_ids("Employee Id\n E2 \n\n E1\n".as_bytes()).expect("ids");
        assert_eq!(ids, vec!["E2", "E1"]);
    }

    #[test]
    fn resolve_targets_drops_unknown_and_duplicates() {
        let index = load_population(HR.as_bytes(), ENTITLEMENTS.as_bytes()).expect("load");
        let ids: Vec<String> = ["E2", "X", "E1", "E2"].iter().map(|s| s.to_string()).collect();
        let resolved = resolve_targets(&index, &ids).expect("two known");
        assert_eq!(resolved, vec!["E2", "E1"]);

        let lonely: Vec<String> = vec!["E1".into(), "E1".into(), "nobody".into()];
        assert!(matches!(
            resolve_targets(&index, &lonely),
            Err(IngestError::TooFewTargets { found: 1 })
        ));
    }
}

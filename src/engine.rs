use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::candidates::{browse_by_strategy, generate_candidates, RawCandidate, StrategyView};
use crate::model::{UserIndex, UserRecord};
use crate::optimizer::policies::{MAX_THRESHOLD, MIN_GROUP_FLOOR, MIN_THRESHOLD};
use crate::optimizer::{run_variants, Solution, POLICIES};
use crate::ordered::OrderedSet;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::strategy::Strategy;

#[derive(Debug, Error, PartialEq)]
pub enum MiningError {
    #[error("commonality threshold {0} is outside [0.50, 1.00]")]
    InvalidThreshold(f64),
    #[error("minimum group size {0} is below 2")]
    InvalidMinGroup(usize),
    #[error("target user {0} has no HR record")]
    UnknownUser(String),
    #[error("at least 2 target users are required, found {0}")]
    TooFewTargets(usize),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AnalysisParams {
    pub threshold: f64,
    pub min_group: usize,
}

impl AnalysisParams {
    pub fn new(threshold: f64, min_group: usize) -> Result<Self, MiningError> {
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
            return Err(MiningError::InvalidThreshold(threshold));
        }
        if min_group < MIN_GROUP_FLOOR {
            return Err(MiningError::InvalidMinGroup(min_group));
        }
        Ok(Self {
            threshold,
            min_group,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub parameters: AnalysisParams,
    pub target_count: usize,
    pub population_size: usize,
    pub raw_candidate_count: usize,
    /// Policy-table order; index 0 is recommended regardless of score.
    pub solutions: Vec<Solution>,
    pub input_digest: String,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn recommended(&self) -> Option<&Solution> {
        self.solutions.first()
    }
}

/// One analysis over a fixed population and target list.
///
/// Raw candidates are grouped once at construction and reused by every
/// [`MiningEngine::analyze`] call, whatever the threshold.
pub struct MiningEngine<'a> {
    index: &'a UserIndex,
    targets: Vec<String>,
    catalog: Vec<Strategy>,
    raw: Vec<RawCandidate>,
}

impl<'a> MiningEngine<'a> {
    pub fn new(
        index: &'a UserIndex,
        target_ids: &[String],
        catalog: &[Strategy],
    ) -> Result<Self, MiningError> {
        Self::with_progress(index, target_ids, catalog, &mut crate::progress::NoopProgress)
    }

    pub fn with_progress(
        index: &'a UserIndex,
        target_ids: &[String],
        catalog: &[Strategy],
        progress: &mut dyn ProgressSink,
    ) -> Result<Self, MiningError> {
        let unique: OrderedSet<String> = target_ids.iter().cloned().collect();
        if unique.len() < target_ids.len() {
            warn!(
                "ignoring {} duplicate target ids",
                target_ids.len() - unique.len()
            );
        }

        let mut records: Vec<&UserRecord> = Vec::with_capacity(unique.len());
        for id in unique.iter() {
            let record = index
                .get(id)
                .ok_or_else(|| MiningError::UnknownUser(id.clone()))?;
            records.push(record);
        }
        if records.len() < 2 {
            return Err(MiningError::TooFewTargets(records.len()));
        }

        let raw = generate_candidates(index, &records, catalog, progress);
        info!(
            targets = records.len(),
            population = index.len(),
            raw_candidates = raw.len(),
            "candidate generation finished"
        );

        Ok(Self {
            index,
            targets: unique.iter().cloned().collect(),
            catalog: catalog.to_vec(),
            raw,
        })
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn raw_candidates(&self) -> &[RawCandidate] {
        &self.raw
    }

    pub fn analyze(&self, params: &AnalysisParams, progress: &mut dyn ProgressSink) -> AnalysisReport {
        let solutions = run_variants(
            &self.raw,
            self.index,
            &self.targets,
            params.threshold,
            params.min_group,
            &POLICIES,
            progress,
        );
        progress.report(&ProgressEvent::Completed {
            solutions: solutions.len(),
        });

        AnalysisReport {
            parameters: *params,
            target_count: self.targets.len(),
            population_size: self.index.len(),
            raw_candidate_count: self.raw.len(),
            solutions,
            input_digest: self.input_digest(params),
            generated_at: Utc::now(),
        }
    }

    /// Candidate roles at the base setting, per strategy, without running the
    /// optimizer.
    pub fn browse(&self, params: &AnalysisParams) -> Vec<StrategyView> {
        let views = browse_by_strategy(&self.raw, self.index, params.threshold, params.min_group);
        info!(
            strategies = views.len(),
            roles = views.iter().map(|v| v.stats.role_count).sum::<usize>(),
            "candidate roles grouped by strategy"
        );
        views
    }

    /// SHA-256 over everything that determines the solutions.
    pub fn input_digest(&self, params: &AnalysisParams) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("threshold={};min_group={}\n", params.threshold, params.min_group));
        for strategy in &self.catalog {
            hasher.update(format!("strategy={}\n", strategy.name));
        }
        for id in &self.targets {
            hasher.update(format!("target={id}\n"));
            if let Some(user) = self.index.get(id) {
                for (field, value) in user.attributes.iter() {
                    hasher.update(format!("  {field}={value}\n"));
                }
                for key in user.entitlements.iter() {
                    hasher.update(format!("  ent={key}\n"));
                }
            }
        }
        for candidate in &self.raw {
            hasher.update(format!(
                "raw={}:{}:{}\n",
                candidate.strategy, candidate.group_key, candidate.org_total
            ));
        }
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntitlementKey, FIELD_BUSINESS_LINE, FIELD_JOB_FAMILY, FIELD_REGION};
    use crate::progress::NoopProgress;
    use crate::strategy::{default_catalog, DEFAULT_CATALOG};

    fn ent(id: &str) -> EntitlementKey {
        EntitlementKey::new(id, "Ledger", "APP7", "Finance", id)
    }

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn params_reject_out_of_range_values() {
        assert_eq!(
            AnalysisParams::new(0.49, 2),
            Err(MiningError::InvalidThreshold(0.49))
        );
        assert_eq!(
            AnalysisParams::new(1.01, 2),
            Err(MiningError::InvalidThreshold(1.01))
        );
        assert_eq!(AnalysisParams::new(0.8, 1), Err(MiningError::InvalidMinGroup(1)));
        assert!(AnalysisParams::new(0.5, 2).is_ok());
        assert!(AnalysisParams::new(1.0, 7).is_ok());
    }

    #[test]
    fn rejects_unknown_and_too_few_targets() {
        let index: UserIndex = [UserRecord::new("A"), UserRecord::new("B")]
            .into_iter()
            .collect();
        let catalog = default_catalog();
        assert_eq!(
            MiningEngine::new(&index, &ids(&["A", "Z"]), &catalog).err(),
            Some(MiningError::UnknownUser("Z".to_string()))
        );
        assert_eq!(
            MiningEngine::new(&index, &ids(&["A", "A"]), &catalog).err(),
            Some(MiningError::TooFewTargets(1))
        );
    }

    #[test]
    fn shared_business_line_yields_one_perfect_role() {
        let mut index = UserIndex::new();
        for id in ["A", "B", "C"] {
            index.insert(
                UserRecord::new(id)
                    .with_attribute(FIELD_BUSINESS_LINE, "Treasury")
                    .with_entitlement(ent("E1"))
                    .with_entitlement(ent("E2"))
                    .with_entitlement(ent("E3")),
            );
        }
        for id in ["P", "Q", "R"] {
            index.insert(UserRecord::new(id).with_attribute(FIELD_BUSINESS_LINE, "Treasury"));
        }
        let engine = MiningEngine::new(&index, &ids(&["A", "B", "C"]), &DEFAULT_CATALOG[..1])
            .expect("engine builds");
        let params = AnalysisParams::new(0.8, 2).expect("valid params");
        let report = engine.analyze(&params, &mut NoopProgress);

        let recommended = report.recommended().expect("five solutions");
        assert_eq!(recommended.roles.len(), 1);
        let role = &recommended.roles[0];
        assert!((role.avg_commonality - 1.0).abs() < 1e-12);
        assert_eq!(role.org_total, 6);
        assert_eq!(role.overspill, 3);
        assert!((role.precision - 0.5).abs() < 1e-12);
        assert!(recommended.ungrouped_users.is_empty());
    }

    #[test]
    fn disjoint_attributes_leave_everyone_ungrouped() {
        let index: UserIndex = ["A", "B", "C"]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                UserRecord::new(*id)
                    .with_attribute(FIELD_BUSINESS_LINE, format!("Line {i}"))
                    .with_attribute(FIELD_JOB_FAMILY, format!("Family {i}"))
                    .with_attribute(FIELD_REGION, format!("Region {i}"))
                    .with_attribute("Cost Center Name", format!("CC {i}"))
                    .with_attribute("Job Grade / Band", format!("G{i}"))
                    .with_attribute("SNODE L3", format!("S{i}"))
                    .with_entitlement(ent("E1"))
            })
            .collect();
        let targets = ids(&["A", "B", "C"]);
        let engine = MiningEngine::new(&index, &targets, &default_catalog()).expect("engine builds");
        assert!(engine.raw_candidates().is_empty());

        let report = engine.analyze(&AnalysisParams::new(0.8, 2).expect("params"), &mut NoopProgress);
        assert_eq!(report.solutions.len(), 5);
        for solution in &report.solutions {
            assert!(solution.roles.is_empty());
            assert_eq!(solution.ungrouped_users, targets);
        }
    }

    #[test]
    fn identical_inputs_give_identical_solutions_and_digest() {
        let index: UserIndex = (0..8)
            .map(|i| {
                UserRecord::new(format!("U{i}"))
                    .with_attribute(FIELD_BUSINESS_LINE, if i < 4 { "Ops" } else { "Tech" })
                    .with_attribute(FIELD_REGION, if i % 2 == 0 { "NA" } else { "APAC" })
                    .with_entitlement(ent("BASE"))
                    .with_entitlement(ent(if i < 4 { "OPS" } else { "DEV" }))
            })
            .collect();
        let targets: Vec<String> = (0..8).map(|i| format!("U{i}")).collect();
        let params = AnalysisParams::new(0.75, 2).expect("params");

        let first = MiningEngine::new(&index, &targets, &default_catalog()).expect("engine");
        let second = MiningEngine::new(&index, &targets, &default_catalog()).expect("engine");
        let a = first.analyze(&params, &mut NoopProgress);
        let b = second.analyze(&params, &mut NoopProgress);
        assert_eq!(a.solutions, b.solutions);
        assert_eq!(a.input_digest, b.input_digest);

        let other = first.input_digest(&AnalysisParams::new(0.9, 2).expect("params"));
        assert_ne!(a.input_digest, other);
    }

    #[test]
    fn progress_sees_every_phase() {
        let index: UserIndex = (0..4)
            .map(|i| {
                UserRecord::new(format!("U{i}"))
                    .with_attribute(FIELD_BUSINESS_LINE, "Ops")
                    .with_entitlement(ent("BASE"))
            })
            .collect();
        let targets: Vec<String> = (0..4).map(|i| format!("U{i}")).collect();
        let mut events = Vec::new();
        let mut sink = |event: &ProgressEvent| events.push(event.clone());
        let engine = MiningEngine::with_progress(&index, &targets, &default_catalog(), &mut sink)
            .expect("engine");
        engine.analyze(&AnalysisParams::new(0.8, 2).expect("params"), &mut sink);

        assert_eq!(events.first(), Some(&ProgressEvent::GenerationStarted { strategies: 9 }));
        assert_eq!(events.last(), Some(&ProgressEvent::Completed { solutions: 5 }));
        let grouped = events
            .iter()
            .filter(|e| matches!(e, ProgressEvent::StrategyGrouped { .. }))
            .count();
        assert_eq!(grouped, 9);
    }

    #[test]
    fn browse_groups_target_roles_by_strategy() {
        let mut index = UserIndex::new();
        for (id, line) in [("A", "Ops"), ("B", "Ops"), ("C", "Tech"), ("D", "Tech"), ("P", "Ops")] {
            index.insert(
                UserRecord::new(id)
                    .with_attribute(FIELD_BUSINESS_LINE, line)
                    .with_attribute(FIELD_REGION, "NA")
                    .with_entitlement(ent("BASE")),
            );
        }
        let engine = MiningEngine::new(&index, &ids(&["A", "B", "C", "D"]), &DEFAULT_CATALOG[..4])
            .expect("engine");
        let views = engine.browse(&AnalysisParams::new(0.8, 2).expect("params"));

        let strategies: Vec<&str> = views.iter().map(|v| v.strategy.as_str()).collect();
        assert_eq!(
            strategies,
            vec![
                "Business Line",
                "Business Line + Job Family",
                "Business Line + Job Grade",
                "Business Line + Region"
            ]
        );
        let by_line = &views[0];
        assert_eq!(by_line.stats.role_count, 2);
        assert_eq!(by_line.stats.distinct_users, 4);
        assert!(by_line
            .roles
            .iter()
            .all(|r| !r.role.members.contains(&"P".to_string())));
    }
}

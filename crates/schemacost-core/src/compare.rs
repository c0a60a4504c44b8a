//! # Model Comparison
//!
//! Ranks candidate schema designs against one fixed workload. Every candidate is
//! evaluated on the same three sharded operations (a filter, a join and an
//! aggregate) and the candidate with the lowest summed `price_usd` wins. Ties go to
//! the candidate declared first.
//!
//! Storage is ranked separately: the comparator also records each candidate's
//! database size, but the two orderings are reported side by side and never merged
//! into a single score. A design can be the cheapest to query and the largest to
//! store.
//!
//! Candidates that fail to decode are collected in [`CandidateSet::rejected`] and
//! take no further part; they never abort the comparison.

use crate::catalog::SchemaCatalog;
use crate::cost::{CostEstimate, CostModel, CostTotals};
use crate::error::LoadError;
use crate::operation::{Operation, OperationKind};
use crate::size::{bytes_to_gib, SizeModel};
use crate::stats::StatisticsSnapshot;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// The fixed per-candidate workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub filter: Operation,
    pub join: Operation,
    pub aggregate: Operation,
}

impl Workload {
    pub fn operations(&self) -> [&Operation; 3] {
        [&self.filter, &self.join, &self.aggregate]
    }

    /// Each slot must hold an operation of its own kind, routed by a shard key.
    pub fn validate(&self) -> Result<(), LoadError> {
        let slots = [
            (OperationKind::Filter, &self.filter),
            (OperationKind::Join, &self.join),
            (OperationKind::Aggregate, &self.aggregate),
        ];
        for (slot, op) in slots {
            if op.kind() != slot {
                return Err(LoadError::InvalidWorkload {
                    slot,
                    reason: format!("holds a {} operation", op.kind()),
                });
            }
            if !op.is_sharded() {
                return Err(LoadError::InvalidWorkload {
                    slot,
                    reason: "has no shard key".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Workload {
    /// Stock lookup by product, order lines joined with products, and an order-line
    /// aggregate, all routed by the product id.
    fn default() -> Self {
        Self {
            filter: Operation::filter("Stock", Some("IDP")),
            join: Operation::join("OrderLine", "Product", Some("IDP")),
            aggregate: Operation::aggregate("OrderLine", Some("IDP")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub catalog: SchemaCatalog,
}

impl Candidate {
    pub fn new(name: impl Into<String>, catalog: SchemaCatalog) -> Self {
        Self {
            name: name.into(),
            catalog,
        }
    }
}

/// A candidate that could not be decoded.
#[derive(Debug)]
pub struct RejectedCandidate {
    pub name: String,
    pub error: LoadError,
}

/// Decoded candidates in declaration order, plus the ones that failed.
#[derive(Debug, Default)]
pub struct CandidateSet {
    pub candidates: Vec<Candidate>,
    pub rejected: Vec<RejectedCandidate>,
}

impl CandidateSet {
    pub fn decode<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = (S, serde_json::Value)>,
        S: Into<String>,
    {
        let mut set = CandidateSet::default();
        for (name, doc) in documents {
            set.push(name, SchemaCatalog::from_json(&doc));
        }
        set
    }

    /// Record the outcome of loading one candidate.
    pub fn push(&mut self, name: impl Into<String>, loaded: Result<SchemaCatalog, LoadError>) {
        let name = name.into();
        match loaded {
            Ok(catalog) => self.candidates.push(Candidate::new(name, catalog)),
            Err(error) => {
                warn!("candidate {} rejected: {}", name, error);
                self.rejected.push(RejectedCandidate { name, error });
            }
        }
    }
}

/// Workload result and storage footprint of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateCost {
    pub name: String,
    pub operations: Vec<CostEstimate>,
    pub totals: CostTotals,
    pub storage_bytes: u128,
    pub storage_gib: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Per-candidate results in declaration order.
    pub candidates: Vec<CandidateCost>,
    /// Candidate with the lowest workload price.
    pub best_by_cost: Option<String>,
    /// Candidate names ordered by storage size, smallest first.
    pub storage_ranking: Vec<String>,
}

impl Comparison {
    pub fn candidate(&self, name: &str) -> Option<&CandidateCost> {
        self.candidates.iter().find(|c| c.name == name)
    }
}

/// Name of the entry with the smallest total; the first one on ties.
pub fn pick_cheapest<'a, I>(totals: I) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut best: Option<(&'a str, OrderedFloat<f64>)> = None;
    for (name, total) in totals {
        let total = OrderedFloat(total);
        match best {
            Some((_, current)) if total >= current => {}
            _ => best = Some((name, total)),
        }
    }
    best.map(|(name, _)| name)
}

pub struct ModelComparator {
    cost_model: Arc<dyn CostModel>,
    workload: Workload,
}

impl ModelComparator {
    pub fn new(cost_model: Arc<dyn CostModel>, workload: Workload) -> Self {
        Self {
            cost_model,
            workload,
        }
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    pub fn evaluate(&self, candidate: &Candidate, stats: &StatisticsSnapshot) -> CandidateCost {
        let operations: Vec<CostEstimate> = self
            .workload
            .operations()
            .iter()
            .map(|op| self.cost_model.estimate(op, stats))
            .collect();
        let totals: CostTotals = operations.iter().sum();
        let storage_bytes = SizeModel::new(&candidate.catalog, stats).database_size_bytes();

        CandidateCost {
            name: candidate.name.clone(),
            operations,
            totals,
            storage_bytes,
            storage_gib: bytes_to_gib(storage_bytes),
        }
    }

    pub fn compare(&self, candidates: &[Candidate], stats: &StatisticsSnapshot) -> Comparison {
        let results: Vec<CandidateCost> = candidates
            .iter()
            .map(|c| self.evaluate(c, stats))
            .collect();

        let best_by_cost = pick_cheapest(
            results
                .iter()
                .map(|r| (r.name.as_str(), r.totals.price_usd)),
        )
        .map(str::to_string);

        // Stable sort keeps declaration order among equal sizes.
        let mut by_storage: Vec<&CandidateCost> = results.iter().collect();
        by_storage.sort_by_key(|r| r.storage_bytes);
        let storage_ranking = by_storage.into_iter().map(|r| r.name.clone()).collect();

        debug!(
            "compared {} candidates: best_by_cost={:?}",
            results.len(),
            best_by_cost
        );

        Comparison {
            candidates: results,
            best_by_cost,
            storage_ranking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::LinearCostModel;
    use serde_json::json;

    #[test]
    fn test_pick_cheapest_first_minimum_wins() {
        let totals = [("A", 0.05), ("B", 0.03), ("C", 0.03)];
        assert_eq!(pick_cheapest(totals), Some("B"));
    }

    #[test]
    fn test_default_workload_is_valid() {
        assert!(Workload::default().validate().is_ok());
    }

    #[test]
    fn test_workload_rejects_operation_in_wrong_slot() {
        let workload: Workload = serde_json::from_value(json!({
            "filter": { "kind": "join", "left": "OrderLine", "right": "Product", "shard_key": "IDP" },
            "join": { "kind": "aggregate", "collection": "OrderLine", "shard_key": "IDP" },
            "aggregate": { "kind": "filter", "collection": "Stock", "shard_key": "IDP" }
        }))
        .unwrap();

        let err = workload.validate().unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidWorkload { slot: OperationKind::Filter, .. }
        ));
        assert_eq!(err.to_string(), "workload `filter` holds a join operation");
    }

    #[test]
    fn test_workload_rejects_unsharded_operation() {
        let workload = Workload {
            aggregate: Operation::aggregate("OrderLine", None),
            ..Workload::default()
        };
        let err = workload.validate().unwrap_err();
        assert_eq!(err.to_string(), "workload `aggregate` has no shard key");
    }

    #[test]
    fn test_pick_cheapest_empty() {
        assert_eq!(pick_cheapest(std::iter::empty::<(&str, f64)>()), None);
    }

    #[test]
    fn test_decode_skips_bad_candidates() {
        let set = CandidateSet::decode(vec![
            ("DB1", json!([{ "collection": "Product", "properties": { "IDP": { "type": "integer" } } }])),
            ("DB2", json!({ "not": "a list" })),
            ("DB3", json!([])),
        ]);
        let names: Vec<&str> = set.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["DB1", "DB3"]);
        assert_eq!(set.rejected.len(), 1);
        assert_eq!(set.rejected[0].name, "DB2");
        assert!(matches!(set.rejected[0].error, LoadError::NotAList));
    }

    #[test]
    fn test_default_workload_is_sharded() {
        let workload = Workload::default();
        assert!(workload.operations().iter().all(|op| op.is_sharded()));
    }

    #[test]
    fn test_storage_ranking_is_independent_of_cost() {
        let stats = StatisticsSnapshot::new()
            .with_cardinality("Product", 100)
            .with_cardinality("Stock", 1_000)
            .with_cardinality("OrderLine", 10_000);
        let set = CandidateSet::decode(vec![
            ("BIG", json!([{ "collection": "Product", "properties": { "d": { "type": "longstring" } } }])),
            ("SMALL", json!([{ "collection": "Product", "properties": { "d": { "type": "integer" } } }])),
        ]);
        let comparator =
            ModelComparator::new(Arc::new(LinearCostModel::default()), Workload::default());
        let cmp = comparator.compare(&set.candidates, &stats);

        // Query costs only depend on the shared statistics: a tie, first wins.
        assert_eq!(cmp.best_by_cost.as_deref(), Some("BIG"));
        assert_eq!(cmp.storage_ranking, vec!["SMALL", "BIG"]);
        assert_eq!(cmp.candidate("SMALL").unwrap().storage_bytes, 100 * 20);
        assert_eq!(cmp.candidate("BIG").unwrap().storage_bytes, 100 * 212);
    }
}

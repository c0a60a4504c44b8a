//! # Multi-Step Query Plans
//!
//! A real query is often several operations chained together, e.g. filter products
//! by brand, join the survivors with order lines on the product id, then filter the
//! order lines by client. A [`QueryPlan`] lists those steps; its estimate is the sum
//! of the steps' raw costs.
//!
//! Steps may declare an [`OutputSpec`] (the fraction of scanned documents that match
//! and the size of one result row) so that the plan can report how large its result
//! is. The last step that declares one determines the plan's output.

use crate::cost::{CostEstimate, CostModel, CostTotals};
use crate::error::LoadError;
use crate::operation::Operation;
use crate::stats::StatisticsSnapshot;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many of a step's scanned documents make it into the result, and how big they are.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOutputSpec")]
pub struct OutputSpec {
    selectivity: f64,
    bytes_per_doc: u64,
}

#[derive(Deserialize)]
struct RawOutputSpec {
    selectivity: f64,
    bytes_per_doc: u64,
}

impl TryFrom<RawOutputSpec> for OutputSpec {
    type Error = LoadError;

    fn try_from(raw: RawOutputSpec) -> Result<Self, Self::Error> {
        OutputSpec::new(raw.selectivity, raw.bytes_per_doc)
    }
}

impl OutputSpec {
    /// `selectivity` must lie in `0.0..=1.0`.
    pub fn new(selectivity: f64, bytes_per_doc: u64) -> Result<Self, LoadError> {
        if !(0.0..=1.0).contains(&selectivity) {
            return Err(LoadError::InvalidField {
                path: "output.selectivity".to_string(),
                reason: format!("must be between 0 and 1, got {selectivity}"),
            });
        }
        Ok(Self {
            selectivity,
            bytes_per_doc,
        })
    }

    pub fn selectivity(&self) -> f64 {
        self.selectivity
    }

    pub fn bytes_per_doc(&self) -> u64 {
        self.bytes_per_doc
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputSpec>,
}

impl PlanStep {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            output: None,
        }
    }

    pub fn with_output(
        mut self,
        selectivity: f64,
        bytes_per_doc: u64,
    ) -> Result<Self, LoadError> {
        self.output = Some(OutputSpec::new(selectivity, bytes_per_doc)?);
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub name: String,
    pub steps: Vec<PlanStep>,
}

/// Result size of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanOutput {
    pub docs: u128,
    pub size_bytes: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEstimate {
    pub name: String,
    pub steps: Vec<CostEstimate>,
    pub totals: CostTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PlanOutput>,
}

impl QueryPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn estimate(&self, model: &dyn CostModel, stats: &StatisticsSnapshot) -> PlanEstimate {
        let mut output = None;
        let steps: Vec<CostEstimate> = self
            .steps
            .iter()
            .map(|step| {
                let est = model.estimate(&step.operation, stats);
                if let Some(spec) = step.output {
                    let docs = (est.docs_scanned as f64 * spec.selectivity).floor() as u128;
                    output = Some(PlanOutput {
                        docs,
                        size_bytes: docs.saturating_mul(spec.bytes_per_doc as u128),
                    });
                }
                est
            })
            .collect();

        let totals: CostTotals = steps.iter().sum();
        debug!(
            "plan {}: {} steps, docs_scanned={}, price_usd={}",
            self.name,
            steps.len(),
            totals.docs_scanned,
            totals.price_usd
        );

        PlanEstimate {
            name: self.name.clone(),
            steps,
            totals,
            output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::LinearCostModel;

    fn stats() -> StatisticsSnapshot {
        StatisticsSnapshot::new()
            .with_cardinality("OrderLine", 4_100_000_000)
            .with_cardinality("Product", 100_000)
    }

    #[test]
    fn test_totals_are_raw_sums() {
        let stats = stats();
        let model = LinearCostModel::default();
        let plan = QueryPlan::new("brand orders")
            .step(PlanStep::new(Operation::filter("Product", None)))
            .step(PlanStep::new(Operation::join("OrderLine", "Product", Some("IDP"))))
            .step(PlanStep::new(Operation::filter("OrderLine", Some("IDC"))));

        let est = plan.estimate(&model, &stats);
        assert_eq!(est.steps.len(), 3);
        assert_eq!(est.totals.docs_scanned, 100_000 + 4_100_000 + 4_100_000);

        let expected_price = est.steps.iter().fold(0.0, |acc, s| acc + s.price_usd);
        assert_eq!(est.totals.price_usd, expected_price);
        assert_eq!(est.output, None);
    }

    #[test]
    fn test_last_declared_output_wins() {
        let stats = stats();
        let model = LinearCostModel::default();
        let brands = PlanStep::new(Operation::filter("Product", None))
            .with_output(0.05, 200)
            .unwrap();
        let lines = PlanStep::new(Operation::filter("OrderLine", Some("IDC")))
            .with_output(0.01, 150)
            .unwrap();
        let plan = QueryPlan::new("smartphones")
            .step(brands)
            .step(lines)
            .step(PlanStep::new(Operation::aggregate("OrderLine", Some("IDP"))));

        let est = plan.estimate(&model, &stats);
        assert_eq!(
            est.output,
            Some(PlanOutput { docs: 41_000, size_bytes: 41_000 * 150 })
        );
    }

    #[test]
    fn test_decode_plan() {
        let plan: QueryPlan = serde_json::from_str(
            r#"{
                "name": "q1",
                "steps": [
                    { "operation": { "kind": "filter", "collection": "Product" },
                      "output": { "selectivity": 0.05, "bytes_per_doc": 200 } }
                ]
            }"#,
        )
        .unwrap();
        let est = plan.estimate(&LinearCostModel::default(), &stats());
        assert_eq!(est.output.map(|o| o.docs), Some(5_000));
        assert_eq!(est.output.map(|o| o.size_bytes), Some(1_000_000));
    }

    #[test]
    fn test_selectivity_outside_unit_range_is_rejected() {
        for selectivity in ["-0.1", "1.5"] {
            let text = format!(
                r#"{{
                    "name": "bad",
                    "steps": [
                        {{ "operation": {{ "kind": "filter", "collection": "Product" }},
                           "output": {{ "selectivity": {selectivity}, "bytes_per_doc": 200 }} }}
                    ]
                }}"#
            );
            let err = serde_json::from_str::<QueryPlan>(&text).unwrap_err();
            assert!(err.to_string().contains("output.selectivity"), "{err}");
        }

        assert!(OutputSpec::new(f64::NAN, 10).is_err());
        assert!(PlanStep::new(Operation::filter("Product", None))
            .with_output(2.0, 10)
            .is_err());
        assert!(OutputSpec::new(0.0, 10).is_ok());
        assert!(OutputSpec::new(1.0, 10).is_ok());
    }
}

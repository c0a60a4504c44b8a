//! # Cost Model
//!
//! This module turns an [`Operation`] into a [`CostEstimate`]: documents scanned,
//! wall time, carbon and monetary price.
//!
//! ## Linear Cost Model
//!
//! Every cost dimension is a linear function of the number of documents scanned:
//!
//! ```text
//! time   = docs_scanned * time_per_doc[kind][sharded]
//! carbon = docs_scanned * carbon_per_doc[kind][sharded]
//! price  = docs_scanned * price_per_doc[kind][sharded]
//! ```
//!
//! `docs_scanned` depends on whether the operation is routed by its shard key:
//!
//! | kind | sharded | unsharded |
//! |---|---|---|
//! | filter | `card(C) / servers` | `card(C)` |
//! | join | `max(card(L), card(R)) / servers` | `card(L) * card(R)` |
//! | aggregate | `card(C) / servers` | `card(C)` |
//!
//! The unsharded join models a nested-loop join without a usable index and is
//! quadratic; counts are `u128` so the product of two multi-billion collections is
//! exact.
//!
//! Aggregates additionally estimate their output: roughly 1% of the scanned
//! documents survive grouping (at least one), at 200 bytes each.
//!
//! ## Rounding
//!
//! Estimates carry unrounded values. Multi-operation totals are summed from the raw
//! values through [`CostTotals`]; rounding is left to whoever prints the result.
//!
//! ## Pluggable Design
//!
//! The [`CostModel`] trait allows replacing the linear model. The coefficients of the
//! default model live in a [`CoefficientTable`] that can be recalibrated without
//! touching control flow.

use crate::operation::{Operation, OperationKind};
use crate::sharding::ServerPool;
use crate::stats::StatisticsSnapshot;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;
use tracing::trace;

/// Fraction of scanned documents an aggregate emits, as a divisor.
pub const AGGREGATE_REDUCTION: u128 = 100;

/// Estimated size of one aggregate output row.
pub const AGGREGATE_OUTPUT_ROW_BYTES: u128 = 200;

/// Per-document cost of scanning during one kind of operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    pub time_seconds: f64,
    pub carbon_grams: f64,
    pub price_usd: f64,
}

impl Coefficients {
    pub const fn new(time_seconds: f64, carbon_grams: f64, price_usd: f64) -> Self {
        Self {
            time_seconds,
            carbon_grams,
            price_usd,
        }
    }
}

const FILTER: Coefficients = Coefficients::new(0.01, 0.0001, 0.000001);
const JOIN: Coefficients = Coefficients::new(0.05, 0.0005, 0.000005);
const AGGREGATE: Coefficients = Coefficients::new(0.03, 0.0003, 0.000003);

/// Default coefficients indexed by `[kind][sharded as usize]`.
pub static DEFAULT_COEFFICIENTS: [[Coefficients; 2]; 3] = [
    [FILTER, FILTER],
    [JOIN, JOIN],
    [AGGREGATE, AGGREGATE],
];

/// Coefficient lookup keyed by operation kind × sharded flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    entries: [[Coefficients; 2]; 3],
}

impl CoefficientTable {
    pub fn get(&self, kind: OperationKind, sharded: bool) -> Coefficients {
        self.entries[kind.index()][sharded as usize]
    }

    pub fn set(&mut self, kind: OperationKind, sharded: bool, coefficients: Coefficients) {
        self.entries[kind.index()][sharded as usize] = coefficients;
    }

    pub fn with(mut self, kind: OperationKind, sharded: bool, coefficients: Coefficients) -> Self {
        self.set(kind, sharded, coefficients);
        self
    }

    /// `(kind, sharded, coefficients)` rows, for listing.
    pub fn rows(&self) -> Vec<(OperationKind, bool, Coefficients)> {
        OperationKind::ALL
            .iter()
            .flat_map(|&kind| [true, false].map(|sharded| (kind, sharded, self.get(kind, sharded))))
            .collect()
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_COEFFICIENTS,
        }
    }
}

/// Output cardinality and size of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputEstimate {
    pub output_docs: u128,
    pub output_size_bytes: u128,
}

/// Estimated cost of a single operation. Values are unrounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostEstimate {
    pub operation: OperationKind,
    pub sharded: bool,
    pub collections: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard_key: Option<String>,
    pub docs_scanned: u128,
    pub time_seconds: f64,
    pub carbon_grams: f64,
    pub price_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputEstimate>,
}

impl CostEstimate {
    pub fn totals(&self) -> CostTotals {
        CostTotals {
            docs_scanned: self.docs_scanned,
            time_seconds: self.time_seconds,
            carbon_grams: self.carbon_grams,
            price_usd: self.price_usd,
        }
    }
}

/// Raw sum of several estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostTotals {
    pub docs_scanned: u128,
    pub time_seconds: f64,
    pub carbon_grams: f64,
    pub price_usd: f64,
}

impl Add for CostTotals {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            docs_scanned: self.docs_scanned + other.docs_scanned,
            time_seconds: self.time_seconds + other.time_seconds,
            carbon_grams: self.carbon_grams + other.carbon_grams,
            price_usd: self.price_usd + other.price_usd,
        }
    }
}

impl Sum for CostTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a CostEstimate> for CostTotals {
    fn sum<I: Iterator<Item = &'a CostEstimate>>(iter: I) -> Self {
        iter.map(CostEstimate::totals).sum()
    }
}

/// Trait for pluggable cost models.
pub trait CostModel: Send + Sync {
    fn estimate(&self, op: &Operation, stats: &StatisticsSnapshot) -> CostEstimate;
}

/// Default model: docs scanned times a per-kind coefficient.
#[derive(Debug, Clone, Default)]
pub struct LinearCostModel {
    pub pool: ServerPool,
    pub coefficients: CoefficientTable,
}

impl LinearCostModel {
    pub fn new(pool: ServerPool) -> Self {
        Self {
            pool,
            coefficients: CoefficientTable::default(),
        }
    }

    pub fn with_coefficients(mut self, coefficients: CoefficientTable) -> Self {
        self.coefficients = coefficients;
        self
    }

    /// Documents one operation has to read.
    pub fn docs_scanned(&self, op: &Operation, stats: &StatisticsSnapshot) -> u128 {
        let servers = self.pool.server_count() as u128;
        match op {
            Operation::Filter { collection, shard_key }
            | Operation::Aggregate { collection, shard_key } => {
                let docs = stats.cardinality(collection) as u128;
                if shard_key.is_some() {
                    docs / servers
                } else {
                    docs
                }
            }
            Operation::Join { left, right, shard_key } => {
                let left_docs = stats.cardinality(left) as u128;
                let right_docs = stats.cardinality(right) as u128;
                if shard_key.is_some() {
                    left_docs.max(right_docs) / servers
                } else {
                    left_docs * right_docs
                }
            }
        }
    }

    pub fn filter_with_sharding(
        &self,
        stats: &StatisticsSnapshot,
        collection: &str,
        shard_key: &str,
    ) -> CostEstimate {
        self.estimate(&Operation::filter(collection, Some(shard_key)), stats)
    }

    pub fn filter_without_sharding(&self, stats: &StatisticsSnapshot, collection: &str) -> CostEstimate {
        self.estimate(&Operation::filter(collection, None), stats)
    }

    pub fn join_with_sharding(
        &self,
        stats: &StatisticsSnapshot,
        left: &str,
        right: &str,
        shard_key: &str,
    ) -> CostEstimate {
        self.estimate(&Operation::join(left, right, Some(shard_key)), stats)
    }

    pub fn join_without_sharding(
        &self,
        stats: &StatisticsSnapshot,
        left: &str,
        right: &str,
    ) -> CostEstimate {
        self.estimate(&Operation::join(left, right, None), stats)
    }

    pub fn aggregate_with_sharding(
        &self,
        stats: &StatisticsSnapshot,
        collection: &str,
        shard_key: &str,
    ) -> CostEstimate {
        self.estimate(&Operation::aggregate(collection, Some(shard_key)), stats)
    }

    pub fn aggregate_without_sharding(
        &self,
        stats: &StatisticsSnapshot,
        collection: &str,
    ) -> CostEstimate {
        self.estimate(&Operation::aggregate(collection, None), stats)
    }
}

impl CostModel for LinearCostModel {
    fn estimate(&self, op: &Operation, stats: &StatisticsSnapshot) -> CostEstimate {
        let kind = op.kind();
        let sharded = op.is_sharded();
        let docs_scanned = self.docs_scanned(op, stats);
        let coefficients = self.coefficients.get(kind, sharded);
        let docs = docs_scanned as f64;

        let output = match kind {
            OperationKind::Aggregate => {
                let output_docs = (docs_scanned / AGGREGATE_REDUCTION).max(1);
                Some(OutputEstimate {
                    output_docs,
                    output_size_bytes: output_docs * AGGREGATE_OUTPUT_ROW_BYTES,
                })
            }
            OperationKind::Filter | OperationKind::Join => None,
        };

        trace!("estimate {}: docs_scanned={}", op, docs_scanned);

        CostEstimate {
            operation: kind,
            sharded,
            collections: op.collections().into_iter().map(str::to_string).collect(),
            shard_key: op.shard_key().map(str::to_string),
            docs_scanned,
            time_seconds: docs * coefficients.time_seconds,
            carbon_grams: docs * coefficients.carbon_grams,
            price_usd: docs * coefficients.price_usd,
            output,
        }
    }
}

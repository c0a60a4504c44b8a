//! # Statistics Snapshot
//!
//! The statistics snapshot is the estimator's only source of numbers. It is shared
//! by every candidate design under comparison: denormalizing a schema changes what a
//! document looks like, not how many products or order lines exist.
//!
//! ## Tables
//!
//! - **`cardinality`**: document count per collection.
//! - **`distinct`**: number of distinct values (NDV) per collection and field.
//! - **`avg`**: mean element count of array fields, per collection and field. Nested
//!   arrays are keyed by their dotted path inside the document (`stocks.batches`).
//!
//! ## Missing-Data Defaults
//!
//! Lookups never fail. Absent entries are replaced by fixed defaults:
//!
//! | lookup | default | assumption |
//! |---|---|---|
//! | `cardinality(C)` | 0 | unknown collection is empty |
//! | `distinct(C, F)` | `cardinality(C)` | un-profiled field is unique |
//! | `avg_len(C, F)` | 1.0 | un-profiled array holds one element |

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default average element count for array fields without statistics.
pub const DEFAULT_ARRAY_LENGTH: f64 = 1.0;

/// Read-only cardinality, NDV and array-length tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub cardinality: HashMap<String, u64>,
    #[serde(default)]
    pub distinct: HashMap<String, HashMap<String, u64>>,
    #[serde(default)]
    pub avg: HashMap<String, HashMap<String, f64>>,
}

impl StatisticsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a snapshot from JSON, rejecting negative or non-finite array lengths.
    pub fn from_json(value: serde_json::Value) -> Result<Self, LoadError> {
        let snapshot: StatisticsSnapshot = serde_json::from_value(value)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn from_json_str(s: &str) -> Result<Self, LoadError> {
        let snapshot: StatisticsSnapshot = serde_json::from_str(s)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), LoadError> {
        for (collection, fields) in &self.avg {
            for (field, len) in fields {
                if !len.is_finite() || *len < 0.0 {
                    return Err(LoadError::InvalidStatistics(format!(
                        "avg.{collection}.{field} must be a non-negative number, got {len}"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn with_cardinality(mut self, collection: impl Into<String>, count: u64) -> Self {
        self.cardinality.insert(collection.into(), count);
        self
    }

    pub fn with_distinct(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
        count: u64,
    ) -> Self {
        self.distinct
            .entry(collection.into())
            .or_default()
            .insert(field.into(), count);
        self
    }

    pub fn with_avg_len(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
        len: f64,
    ) -> Self {
        self.avg
            .entry(collection.into())
            .or_default()
            .insert(field.into(), len);
        self
    }

    /// Document count; 0 for unknown collections.
    pub fn cardinality(&self, collection: &str) -> u64 {
        self.cardinality.get(collection).copied().unwrap_or(0)
    }

    /// Distinct values of `field`; falls back to the collection's cardinality.
    pub fn distinct(&self, collection: &str, field: &str) -> u64 {
        self.distinct
            .get(collection)
            .and_then(|fields| fields.get(field))
            .copied()
            .unwrap_or_else(|| self.cardinality(collection))
    }

    /// Average element count of an array field; falls back to 1.
    pub fn avg_len(&self, collection: &str, field: &str) -> f64 {
        self.avg
            .get(collection)
            .and_then(|fields| fields.get(field))
            .copied()
            .unwrap_or(DEFAULT_ARRAY_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_missing_entries() {
        let stats = StatisticsSnapshot::new().with_cardinality("Product", 100_000);

        assert_eq!(stats.cardinality("Warehouse"), 0);
        assert_eq!(stats.distinct("Product", "brand"), 100_000);
        assert_eq!(stats.distinct("Warehouse", "IDW"), 0);
        assert_eq!(stats.avg_len("Product", "stocks"), 1.0);
    }

    #[test]
    fn test_explicit_entries_win() {
        let stats = StatisticsSnapshot::new()
            .with_cardinality("Product", 100_000)
            .with_distinct("Product", "brand", 5_000)
            .with_avg_len("Product", "stocks", 200.0);

        assert_eq!(stats.distinct("Product", "brand"), 5_000);
        assert_eq!(stats.avg_len("Product", "stocks"), 200.0);
    }

    #[test]
    fn test_decode_with_optional_tables() {
        let stats = StatisticsSnapshot::from_json(json!({
            "cardinality": { "Product": 100000, "OrderLine": 4100000000u64 }
        }))
        .unwrap();
        assert_eq!(stats.cardinality("OrderLine"), 4_100_000_000);
        assert!(stats.distinct.is_empty());
        assert!(stats.avg.is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        assert!(matches!(
            StatisticsSnapshot::from_json(json!({ "distinct": {} })),
            Err(LoadError::Json(_))
        ));
        assert!(matches!(
            StatisticsSnapshot::from_json(json!({ "cardinality": { "Product": -3 } })),
            Err(LoadError::Json(_))
        ));
        assert!(matches!(
            StatisticsSnapshot::from_json(json!({
                "cardinality": {},
                "avg": { "Product": { "stocks": -1.5 } }
            })),
            Err(LoadError::InvalidStatistics(_))
        ));
    }
}

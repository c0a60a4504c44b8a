//! # Sharding Model
//!
//! Models a cluster of `server_count` identical servers with uniform hash
//! partitioning on a shard key. Each server receives `1 / server_count` of the
//! documents and of the key's distinct values; remainders are not tracked, so both
//! counts are integer floor divisions.
//!
//! The server pool is an explicit value threaded through the models rather than a
//! process-wide setting, which makes the server count an experiment parameter.

use crate::catalog::SchemaCatalog;
use crate::error::EstimateError;
use crate::stats::StatisticsSnapshot;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

pub const DEFAULT_SERVER_COUNT: u64 = 1000;

/// A fixed pool of servers sharing sharded collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ServerPool {
    server_count: NonZeroU64,
}

impl ServerPool {
    pub fn new(server_count: u64) -> Result<Self, EstimateError> {
        NonZeroU64::new(server_count)
            .map(|server_count| Self { server_count })
            .ok_or(EstimateError::InvalidServerCount)
    }

    pub fn server_count(&self) -> u64 {
        self.server_count.get()
    }

    /// Share of `total` held by a single server.
    pub fn per_server(&self, total: u64) -> u64 {
        total / self.server_count.get()
    }
}

impl Default for ServerPool {
    fn default() -> Self {
        Self {
            server_count: NonZeroU64::new(DEFAULT_SERVER_COUNT).expect("default is non-zero"),
        }
    }
}

impl TryFrom<u64> for ServerPool {
    type Error = EstimateError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServerPool> for u64 {
    fn from(pool: ServerPool) -> Self {
        pool.server_count()
    }
}

/// How one collection spreads over the pool when sharded on a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardDistribution {
    pub docs_per_server: u64,
    pub distinct_keys_per_server: u64,
}

/// A (collection, shard key) pair to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardProbe {
    pub collection: String,
    pub key: String,
}

impl ShardProbe {
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }
}

/// Result of a [`ShardProbe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub collection: String,
    pub key: String,
    pub distribution: ShardDistribution,
}

pub struct ShardingModel<'a> {
    stats: &'a StatisticsSnapshot,
    pool: ServerPool,
}

impl<'a> ShardingModel<'a> {
    pub fn new(stats: &'a StatisticsSnapshot, pool: ServerPool) -> Self {
        Self { stats, pool }
    }

    pub fn shard_distribution(&self, collection: &str, shard_key: &str) -> ShardDistribution {
        ShardDistribution {
            docs_per_server: self.pool.per_server(self.stats.cardinality(collection)),
            distinct_keys_per_server: self
                .pool
                .per_server(self.stats.distinct(collection, shard_key)),
        }
    }

    /// Evaluate every probe whose collection `catalog` declares, in probe order.
    pub fn probe_all(&self, catalog: &SchemaCatalog, probes: &[ShardProbe]) -> Vec<ProbeResult> {
        probes
            .iter()
            .filter(|p| catalog.contains(&p.collection))
            .map(|p| ProbeResult {
                collection: p.collection.clone(),
                key: p.key.clone(),
                distribution: self.shard_distribution(&p.collection, &p.key),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CollectionSchema, FieldSpec};

    fn stats() -> StatisticsSnapshot {
        StatisticsSnapshot::new()
            .with_cardinality("Stock", 20_000_000)
            .with_cardinality("Product", 100_000)
            .with_distinct("Product", "brand", 5_000)
            .with_distinct("Stock", "IDW", 200)
    }

    #[test]
    fn test_zero_servers_rejected() {
        assert_eq!(ServerPool::new(0), Err(EstimateError::InvalidServerCount));
        assert!(serde_json::from_str::<ServerPool>("0").is_err());
        assert_eq!(serde_json::from_str::<ServerPool>("8").unwrap().server_count(), 8);
    }

    #[test]
    fn test_distribution_floors() {
        let stats = stats();
        let model = ShardingModel::new(&stats, ServerPool::default());

        let d = model.shard_distribution("Product", "brand");
        assert_eq!(d.docs_per_server, 100);
        assert_eq!(d.distinct_keys_per_server, 5);

        // Fewer distinct values than servers floors to zero.
        let d = model.shard_distribution("Stock", "IDW");
        assert_eq!(d.docs_per_server, 20_000);
        assert_eq!(d.distinct_keys_per_server, 0);
    }

    #[test]
    fn test_unprofiled_key_assumed_unique() {
        let stats = stats();
        let model = ShardingModel::new(&stats, ServerPool::default());
        let d = model.shard_distribution("Stock", "IDP");
        assert_eq!(d.distinct_keys_per_server, d.docs_per_server);
    }

    #[test]
    fn test_docs_per_server_matches_floor_division() {
        let stats = stats();
        for servers in [1, 3, 7, 1000, 1_000_000] {
            let pool = ServerPool::new(servers).unwrap();
            let model = ShardingModel::new(&stats, pool);
            for c in ["Stock", "Product", "Missing"] {
                assert_eq!(
                    model.shard_distribution(c, "any").docs_per_server,
                    stats.cardinality(c) / servers
                );
            }
        }
    }

    #[test]
    fn test_probe_all_skips_undeclared_collections() {
        let stats = stats();
        let catalog = SchemaCatalog::from_collections(vec![CollectionSchema::new(
            "Product",
            vec![("IDP".into(), FieldSpec::Integer)],
        )])
        .unwrap();
        let model = ShardingModel::new(&stats, ServerPool::default());

        let results = model.probe_all(
            &catalog,
            &[ShardProbe::new("Stock", "IDP"), ShardProbe::new("Product", "brand")],
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].collection, "Product");
        assert_eq!(results[0].distribution.distinct_keys_per_server, 5);
    }
}

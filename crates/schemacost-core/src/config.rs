//! # Estimator Configuration
//!
//! Experiment parameters shared by the drivers: the size of the server pool, the
//! workload used to compare candidates, and the sharding probes printed by the
//! analysis report. Every field has a default, so an empty JSON object is a valid
//! configuration.

use crate::compare::Workload;
use crate::cost::LinearCostModel;
use crate::error::LoadError;
use crate::sharding::{ServerPool, ShardProbe};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Servers in the uniform hash-sharded cluster. Zero is rejected on load.
    pub server_count: ServerPool,
    pub workload: Workload,
    pub sharding_probes: Vec<ShardProbe>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            server_count: ServerPool::default(),
            workload: Workload::default(),
            sharding_probes: vec![
                ShardProbe::new("Stock", "IDP"),
                ShardProbe::new("OrderLine", "IDC"),
                ShardProbe::new("Product", "brand"),
            ],
        }
    }
}

impl EstimatorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, LoadError> {
        let config: Self = serde_json::from_str(s)?;
        config.workload.validate()?;
        Ok(config)
    }

    pub fn pool(&self) -> ServerPool {
        self.server_count
    }

    pub fn cost_model(&self) -> LinearCostModel {
        LinearCostModel::new(self.server_count)
    }
}

//! # Application State
//!
//! Shared state available to every HTTP request handler. It is created once at
//! server startup and shared via `Arc` across all concurrent requests.
//!
//! ## Components
//!
//! - **Cost Model**: The linear cost model, built from the configured server pool.
//!   Stateless, so it is shared rather than rebuilt per request.
//! - **Estimator Config**: Server count, default comparison workload and the sharding
//!   probes reported with size estimates.
//! - **Server Config**: Listen address.
//!
//! Statistics and schemas are *not* part of the state: every request carries its
//! own, so the service never holds data between calls.

use schemacost_core::config::EstimatorConfig;
use schemacost_core::cost::{CostModel, LinearCostModel};
use std::sync::Arc;

/// Environment variable overriding the listen address.
pub const ADDR_ENV: &str = "SCHEMACOST_ADDR";

/// Environment variable pointing at an `EstimatorConfig` JSON file.
pub const CONFIG_ENV: &str = "SCHEMACOST_CONFIG";

pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        match std::env::var(ADDR_ENV) {
            Ok(bind_addr) if !bind_addr.is_empty() => Self { bind_addr },
            _ => Self::default(),
        }
    }
}

pub struct AppState {
    /// Default model used for single-operation and plan estimates.
    pub cost_model: Arc<LinearCostModel>,
    pub estimator: EstimatorConfig,
}

impl AppState {
    pub fn new(estimator: EstimatorConfig) -> Self {
        Self {
            cost_model: Arc::new(estimator.cost_model()),
            estimator,
        }
    }

    pub fn dyn_cost_model(&self) -> Arc<dyn CostModel> {
        self.cost_model.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

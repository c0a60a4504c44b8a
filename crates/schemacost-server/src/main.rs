//! # schemacost-server: HTTP Service for Schema Cost Estimation
//!
//! This binary exposes the estimators of `schemacost-core` as JSON endpoints, so
//! schema design tools can ask "how big is this design and what does the workload
//! cost" without linking the crate.
//!
//! ## Architecture
//!
//! ```text
//! Client (design tool, notebook, CI job)
//!   |
//!   | HTTP POST /compare (candidate schemas + statistics JSON)
//!   v
//! schemacost-server (this binary)
//!   |
//!   +-> decode schemas / statistics (bad candidates are reported, not fatal)
//!   +-> size model + linear cost model
//!   +-> model comparator (cost ranking and storage ranking)
//!   |
//!   | HTTP response (JSON report)
//!   v
//! Client
//! ```
//!
//! ## Endpoints
//!
//! - `GET  /health`          - Health check
//! - `GET  /coefficients`    - Server count and per-operation coefficients
//! - `POST /estimate/size`   - Document/collection/database sizes of one schema
//! - `POST /estimate/query`  - Cost of a single operation
//! - `POST /estimate/plan`   - Cost of a multi-step query plan
//! - `POST /compare`         - Rank candidate schemas on a workload
//!
//! ## Configuration
//!
//! The server listens on `0.0.0.0:3000` unless `SCHEMACOST_ADDR` is set. An
//! estimator configuration (server count, default workload, sharding probes) can be
//! supplied as a JSON file via `SCHEMACOST_CONFIG`. Logging is controlled by the
//! `RUST_LOG` environment variable (defaults to `schemacost=info`).

mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use schemacost_core::config::EstimatorConfig;
use std::error::Error;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

fn router(state: Arc<state::AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/coefficients", get(routes::coefficients))
        .route("/estimate/size", post(routes::estimate_size))
        .route("/estimate/query", post(routes::estimate_query))
        .route("/estimate/plan", post(routes::estimate_plan))
        .route("/compare", post(routes::compare))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn load_estimator_config() -> Result<EstimatorConfig, Box<dyn Error>> {
    match std::env::var(state::CONFIG_ENV) {
        Ok(path) if !path.is_empty() => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {path}: {e}"))?;
            let config = EstimatorConfig::from_json_str(&text)?;
            tracing::info!("loaded estimator config from {}", path);
            Ok(config)
        }
        _ => Ok(EstimatorConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("schemacost=info".parse()?))
        .init();

    let estimator = load_estimator_config()?;
    tracing::info!(
        "estimating with {} servers",
        estimator.pool().server_count()
    );

    let server_config = state::ServerConfig::from_env();
    let state = Arc::new(state::AppState::new(estimator));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    tracing::info!("schemacost-server listening on http://{}", server_config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

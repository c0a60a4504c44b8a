//! # HTTP Route Handlers
//!
//! This module defines the Axum route handlers for the estimation service.
//!
//! ## Request Pipeline
//!
//! Every estimation endpoint follows the same steps:
//!
//! 1. **Decode**: Turn the request's `statistics` (and `schema` / `candidates`) JSON
//!    into core types. Statistics are validated on load.
//! 2. **Estimate**: Run the size model, cost model, plan or comparator.
//! 3. **Respond**: Return the unrounded core results as JSON.
//!
//! ## Error Handling
//!
//! Errors are returned as HTTP status codes with descriptive messages:
//! - 400 Bad Request: malformed statistics or schema, unknown operation kind.
//! - For `/compare`, a malformed candidate is *not* an error: it is listed under
//!   `rejected` and the remaining candidates are still compared.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use schemacost_core::catalog::SchemaCatalog;
use schemacost_core::compare::{CandidateSet, Comparison, ModelComparator, Workload};
use schemacost_core::cost::{CostEstimate, CostModel};
use schemacost_core::operation::{Operation, OperationKind};
use schemacost_core::plan::{PlanEstimate, QueryPlan};
use schemacost_core::sharding::{ProbeResult, ShardingModel};
use schemacost_core::size::{DatabaseSizeReport, SizeModel};
use schemacost_core::stats::StatisticsSnapshot;

use crate::state::AppState;

type ApiError = (StatusCode, String);

fn decode_statistics(value: Value) -> Result<StatisticsSnapshot, ApiError> {
    StatisticsSnapshot::from_json(value)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid statistics: {}", e)))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /coefficients: server count and the coefficient table in use.
pub async fn coefficients(State(state): State<Arc<AppState>>) -> Json<CoefficientsResponse> {
    let coefficients = state
        .cost_model
        .coefficients
        .rows()
        .into_iter()
        .map(|(kind, sharded, c)| CoefficientRow {
            kind,
            sharded,
            time_seconds: c.time_seconds,
            carbon_grams: c.carbon_grams,
            price_usd: c.price_usd,
        })
        .collect();

    Json(CoefficientsResponse {
        server_count: state.cost_model.pool.server_count(),
        coefficients,
    })
}

#[derive(Debug, Serialize)]
pub struct CoefficientsResponse {
    pub server_count: u64,
    pub coefficients: Vec<CoefficientRow>,
}

#[derive(Debug, Serialize)]
pub struct CoefficientRow {
    pub kind: OperationKind,
    pub sharded: bool,
    pub time_seconds: f64,
    pub carbon_grams: f64,
    pub price_usd: f64,
}

/// Request body for `POST /estimate/size`.
#[derive(Debug, Deserialize)]
pub struct SizeRequest {
    /// Schema description: a list of `{collection, properties}` entries.
    pub schema: Value,
    pub statistics: Value,
}

#[derive(Debug, Serialize)]
pub struct SizeResponse {
    pub sizes: DatabaseSizeReport,
    pub sharding: Vec<ProbeResult>,
    /// Fields whose type was not recognized and was sized like a string.
    pub unknown_field_types: Vec<UnknownFieldType>,
}

#[derive(Debug, Serialize)]
pub struct UnknownFieldType {
    pub path: String,
    pub type_name: String,
}

/// POST /estimate/size: sizes of one schema plus the configured sharding probes.
pub async fn estimate_size(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SizeRequest>,
) -> Result<Json<SizeResponse>, ApiError> {
    let stats = decode_statistics(req.statistics)?;
    let catalog = SchemaCatalog::from_json(&req.schema)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid schema: {}", e)))?;

    let unknown_field_types: Vec<UnknownFieldType> = catalog
        .unknown_field_types()
        .into_iter()
        .map(|(path, type_name)| {
            tracing::warn!("unknown field type `{}` at {}, sized as string", type_name, path);
            UnknownFieldType { path, type_name }
        })
        .collect();

    let sizes = SizeModel::new(&catalog, &stats).report();
    let sharding = ShardingModel::new(&stats, state.estimator.pool())
        .probe_all(&catalog, &state.estimator.sharding_probes);

    Ok(Json(SizeResponse {
        sizes,
        sharding,
        unknown_field_types,
    }))
}

/// Request body for `POST /estimate/query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub statistics: Value,
    pub operation: Operation,
}

/// POST /estimate/query: cost of a single operation.
pub async fn estimate_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<CostEstimate>, ApiError> {
    let stats = decode_statistics(req.statistics)?;
    Ok(Json(state.cost_model.estimate(&req.operation, &stats)))
}

/// Request body for `POST /estimate/plan`.
#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub statistics: Value,
    pub plan: QueryPlan,
}

/// POST /estimate/plan: cost of a multi-step plan, totals summed from raw values.
pub async fn estimate_plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanEstimate>, ApiError> {
    let stats = decode_statistics(req.statistics)?;
    Ok(Json(req.plan.estimate(state.cost_model.as_ref(), &stats)))
}

/// Request body for `POST /compare`.
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub statistics: Value,
    /// Candidates in declaration order; order decides ties.
    pub candidates: Vec<CandidateInput>,
    /// Overrides the configured workload.
    #[serde(default)]
    pub workload: Option<Workload>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateInput {
    pub name: String,
    pub schema: Value,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub comparison: Comparison,
    pub rejected: Vec<RejectedInfo>,
}

#[derive(Debug, Serialize)]
pub struct RejectedInfo {
    pub name: String,
    pub error: String,
}

/// POST /compare: rank candidates by workload cost and by storage.
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, ApiError> {
    if req.candidates.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Request must contain at least one candidate".to_string(),
        ));
    }

    let stats = decode_statistics(req.statistics)?;
    let set = CandidateSet::decode(req.candidates.into_iter().map(|c| (c.name, c.schema)));
    let workload = match req.workload {
        Some(workload) => {
            workload
                .validate()
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid workload: {}", e)))?;
            workload
        }
        None => state.estimator.workload.clone(),
    };

    let comparator = ModelComparator::new(state.dyn_cost_model(), workload);
    let comparison = comparator.compare(&set.candidates, &stats);

    let rejected = set
        .rejected
        .into_iter()
        .map(|r| RejectedInfo {
            name: r.name,
            error: r.error.to_string(),
        })
        .collect();

    Ok(Json(CompareResponse {
        comparison,
        rejected,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> State<Arc<AppState>> {
        State(Arc::new(AppState::default()))
    }

    fn statistics() -> Value {
        json!({
            "cardinality": { "Product": 100000, "OrderLine": 4100000000u64, "Stock": 20000000 },
            "distinct": { "Product": { "brand": 5000 } }
        })
    }

    #[tokio::test]
    async fn test_estimate_query() {
        let req = QueryRequest {
            statistics: statistics(),
            operation: Operation::filter("Product", Some("IDP")),
        };
        let Json(est) = estimate_query(state(), Json(req)).await.unwrap();
        assert_eq!(est.docs_scanned, 100);
        assert!(est.sharded);
    }

    #[tokio::test]
    async fn test_estimate_query_rejects_bad_statistics() {
        let req = QueryRequest {
            statistics: json!({ "cardinality": "many" }),
            operation: Operation::filter("Product", None),
        };
        let err = estimate_query(state(), Json(req)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(err.1.starts_with("Invalid statistics"));
    }

    #[tokio::test]
    async fn test_estimate_size_reports_unknown_types() {
        let req = SizeRequest {
            schema: json!([{ "collection": "Product", "properties": {
                "IDP": { "type": "integer" },
                "brand": { "type": "string" },
                "barcode": { "type": "ean13" }
            }}]),
            statistics: statistics(),
        };
        let Json(resp) = estimate_size(state(), Json(req)).await.unwrap();

        assert_eq!(resp.sizes.collections[0].document_bytes, 36 + 8 + 80 + 80);
        assert_eq!(resp.sizes.total_bytes, 100_000 * 204);
        assert_eq!(resp.unknown_field_types.len(), 1);
        assert_eq!(resp.unknown_field_types[0].path, "Product.barcode");
        // Only the Product/brand probe applies to this schema.
        assert_eq!(resp.sharding.len(), 1);
        assert_eq!(resp.sharding[0].distribution.distinct_keys_per_server, 5);
    }

    #[tokio::test]
    async fn test_compare_lists_rejected_candidates() {
        let req = CompareRequest {
            statistics: statistics(),
            candidates: vec![
                CandidateInput {
                    name: "DB1".into(),
                    schema: json!([{ "collection": "Product", "properties": { "IDP": { "type": "integer" } } }]),
                },
                CandidateInput {
                    name: "DB2".into(),
                    schema: json!("not a schema"),
                },
            ],
            workload: None,
        };
        let Json(resp) = compare(state(), Json(req)).await.unwrap();

        assert_eq!(resp.comparison.candidates.len(), 1);
        assert_eq!(resp.comparison.best_by_cost.as_deref(), Some("DB1"));
        assert_eq!(resp.rejected.len(), 1);
        assert_eq!(resp.rejected[0].name, "DB2");
    }

    #[tokio::test]
    async fn test_compare_rejects_unsharded_workload() {
        let req = CompareRequest {
            statistics: statistics(),
            candidates: vec![CandidateInput {
                name: "DB1".into(),
                schema: json!([{ "collection": "Product", "properties": { "IDP": { "type": "integer" } } }]),
            }],
            workload: Some(Workload {
                filter: Operation::filter("Stock", None),
                ..Workload::default()
            }),
        };
        let err = compare(state(), Json(req)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1, "Invalid workload: workload `filter` has no shard key");
    }

    #[tokio::test]
    async fn test_compare_requires_candidates() {
        let req = CompareRequest {
            statistics: statistics(),
            candidates: vec![],
            workload: None,
        };
        let err = compare(state(), Json(req)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_coefficients_lists_six_rows() {
        let Json(resp) = coefficients(state()).await;
        assert_eq!(resp.server_count, 1000);
        assert_eq!(resp.coefficients.len(), 6);
    }
}

//! HTTP node service publishing a ledger endpoint
//!
//! Every [`LedgerEndpoint`] operation has a route. Endpoint errors travel as a
//! status code plus an [`ErrorBody`], which [`crate::ledger::RemoteLedger`]
//! turns back into the same [`EndpointError`].

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::ledger::{
    EndpointError, InitializationRequest, LedgerEndpoint, StorageReference, TransactionReference,
};
use crate::tx::{SignedRequest, TransactionRequest};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn LedgerEndpoint>,
    pub started: Instant,
}

/// Build the router of the node service
pub fn router(ledger: Arc<dyn LedgerEndpoint>) -> Router {
    let state = AppState {
        ledger,
        started: Instant::now(),
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/manifest", get(get_manifest))
        .route("/runtime_jar", get(get_runtime_jar))
        .route("/chain_id", get(get_chain_id))
        .route("/signature_algorithm", get(get_signature_algorithm))
        .route("/gas_price", get(get_gas_price))
        .route("/nonce/:reference", get(get_nonce))
        .route("/response/:reference", get(get_response))
        .route("/initialize", post(initialize))
        .route("/constructor_call", post(constructor_call))
        .route("/method_call", post(method_call))
        .route("/view_call", post(view_call))
        .route("/jar_store", post(jar_store))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP node service
pub async fn run_server(config: ApiConfig, ledger: Arc<dyn LedgerEndpoint>) -> ClientResult<()> {
    let app = router(ledger);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting node service on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ClientError::Internal(format!("cannot bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| ClientError::Internal(format!("node service failed: {}", e)))
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<TransactionReference>,
    /// `[expected, found]` for nonce mismatches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonces: Option<[u64; 2]>,
}

impl ErrorBody {
    /// Rebuild the endpoint error carried by a response with the given status code
    pub fn into_endpoint_error(self, status: u16) -> EndpointError {
        match (self.kind.as_str(), self.reference, self.nonces) {
            ("failed", Some(reference), _) => EndpointError::Failed {
                reference,
                message: self.message,
            },
            ("nonce", _, Some([expected, found])) => EndpointError::NonceMismatch { expected, found },
            ("already_initialized", _, _) => EndpointError::AlreadyInitialized,
            ("not_initialized", _, _) => EndpointError::NotInitialized,
            ("unavailable", _, _) => EndpointError::Unavailable(self.message),
            ("rejected", _, _) => EndpointError::Rejected(self.message),
            _ if status >= 500 => EndpointError::Unavailable(self.message),
            _ => EndpointError::Rejected(self.message),
        }
    }
}

/// Endpoint error rendered as an HTTP response
pub struct ApiError(pub EndpointError);

impl From<EndpointError> for ApiError {
    fn from(e: EndpointError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let mut nonces = None;
        let (status, kind, reference) = match self.0 {
            EndpointError::Rejected(_) => (StatusCode::BAD_REQUEST, "rejected", None),
            EndpointError::NonceMismatch { expected, found } => {
                nonces = Some([expected, found]);
                (StatusCode::BAD_REQUEST, "nonce", None)
            }
            EndpointError::Failed { reference, .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "failed", Some(reference))
            }
            EndpointError::AlreadyInitialized => (StatusCode::CONFLICT, "already_initialized", None),
            EndpointError::NotInitialized => {
                (StatusCode::PRECONDITION_FAILED, "not_initialized", None)
            }
            EndpointError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", None),
        };

        // Keep the bare message so the remote side rebuilds the same error
        let message = match self.0 {
            EndpointError::Rejected(m) | EndpointError::Unavailable(m) => m,
            EndpointError::Failed { message, .. } => message,
            _ => message,
        };

        debug!("Endpoint answered {} ({}): {}", status, kind, message);

        (
            status,
            Json(ErrorBody {
                kind: kind.to_string(),
                message,
                reference,
                nonces,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_reference<T: std::str::FromStr>(text: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e: T::Err| ApiError(EndpointError::Rejected(format!("bad reference {}: {}", text, e))))
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get node status
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let chain_id = state.ledger.chain_id().await.ok();
    let gas_price = state.ledger.gas_price().await.ok();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
        initialized: chain_id.is_some(),
        chain_id,
        gas_price,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn get_manifest(State(state): State<AppState>) -> ApiResult<StorageReference> {
    Ok(Json(state.ledger.manifest().await?))
}

async fn get_runtime_jar(State(state): State<AppState>) -> ApiResult<TransactionReference> {
    Ok(Json(state.ledger.runtime_jar().await?))
}

async fn get_chain_id(State(state): State<AppState>) -> ApiResult<String> {
    Ok(Json(state.ledger.chain_id().await?))
}

async fn get_signature_algorithm(
    State(state): State<AppState>,
) -> ApiResult<crate::crypto::SignatureAlgorithmId> {
    Ok(Json(state.ledger.signature_algorithm().await?))
}

async fn get_gas_price(State(state): State<AppState>) -> ApiResult<u64> {
    Ok(Json(state.ledger.gas_price().await?))
}

async fn get_nonce(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<u64> {
    let account: StorageReference = parse_reference(&reference)?;
    Ok(Json(state.ledger.nonce(&account).await?))
}

async fn get_response(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Option<crate::ledger::RecordedResponse>> {
    let transaction: TransactionReference = parse_reference(&reference)?;
    Ok(Json(state.ledger.response(&transaction).await?))
}

async fn initialize(
    State(state): State<AppState>,
    Json(request): Json<InitializationRequest>,
) -> ApiResult<StorageReference> {
    Ok(Json(state.ledger.initialize(request).await?))
}

async fn constructor_call(
    State(state): State<AppState>,
    Json(request): Json<SignedRequest>,
) -> ApiResult<StorageReference> {
    Ok(Json(state.ledger.add_constructor_call(request).await?))
}

async fn method_call(
    State(state): State<AppState>,
    Json(request): Json<SignedRequest>,
) -> ApiResult<Option<crate::ledger::StorageValue>> {
    Ok(Json(state.ledger.add_method_call(request).await?))
}

async fn view_call(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> ApiResult<Option<crate::ledger::StorageValue>> {
    Ok(Json(state.ledger.run_method_call(request).await?))
}

async fn jar_store(
    State(state): State<AppState>,
    Json(request): Json<SignedRequest>,
) -> ApiResult<TransactionReference> {
    Ok(Json(state.ledger.add_jar_store(request).await?))
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_seconds: u64,
    initialized: bool,
    chain_id: Option<String>,
    gas_price: Option<u64>,
    timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedgerEndpoint;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(Arc::new(MockLedgerEndpoint::new()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_gas_price() {
        let mut ledger = MockLedgerEndpoint::new();
        ledger.expect_gas_price().returning(|| Ok(137));

        let response = router(Arc::new(ledger))
            .oneshot(Request::builder().uri("/gas_price").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, serde_json::json!(137));
    }

    #[tokio::test]
    async fn test_error_classes_map_to_status_codes() {
        let cases = vec![
            (EndpointError::Rejected("nope".into()), StatusCode::BAD_REQUEST),
            (
                EndpointError::NonceMismatch {
                    expected: 5,
                    found: 2,
                },
                StatusCode::BAD_REQUEST,
            ),
            (EndpointError::AlreadyInitialized, StatusCode::CONFLICT),
            (EndpointError::NotInitialized, StatusCode::PRECONDITION_FAILED),
            (EndpointError::Unavailable("busy".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                EndpointError::Failed {
                    reference: TransactionReference::from_bytes([5; 32]),
                    message: "boom".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (error, status) in cases {
            let response = ApiError(error.clone()).into_response();
            assert_eq!(response.status(), status);

            let body: ErrorBody = serde_json::from_value(body_of(response).await).unwrap();
            assert_eq!(body.into_endpoint_error(status.as_u16()), error);
        }
    }

    #[tokio::test]
    async fn test_bad_nonce_reference() {
        let app = router(Arc::new(MockLedgerEndpoint::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nonce/not-a-reference")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(response).await["kind"], "rejected");
    }
}

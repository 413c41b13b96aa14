//! HTTP client for a ledger published by the node service

use super::{
    EndpointError, EndpointResult, InitializationRequest, LedgerEndpoint, RecordedResponse,
    StorageReference, StorageValue, TransactionReference,
};
use crate::api::ErrorBody;
use crate::crypto::SignatureAlgorithmId;
use crate::error::{ClientError, ClientResult};
use crate::tx::{SignedRequest, TransactionRequest};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Ledger reached over HTTP
#[derive(Debug, Clone)]
pub struct RemoteLedger {
    client: Client,
    base_url: String,
}

impl RemoteLedger {
    /// Connect to the node service at `base_url`, e.g. `http://127.0.0.1:8001`
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> EndpointResult<T> {
        debug!("GET {}", path);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> EndpointResult<T> {
        debug!("POST {}", path);
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}

fn transport_error(e: reqwest::Error) -> EndpointError {
    EndpointError::Unavailable(format!("transport error: {}", e))
}

/// `#` separates the progressive of a storage reference and must be escaped in paths
fn path_segment(reference: &impl std::fmt::Display) -> String {
    reference.to_string().replace('#', "%23")
}

async fn decode<T: DeserializeOwned>(response: Response) -> EndpointResult<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| EndpointError::Unavailable(format!("malformed answer: {}", e)));
    }

    let text = response.text().await.map_err(transport_error)?;
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => Err(body.into_endpoint_error(status.as_u16())),
        Err(_) => Err(status_error(status, text)),
    }
}

/// Fallback for error answers without a recognizable body
fn status_error(status: StatusCode, text: String) -> EndpointError {
    match status {
        StatusCode::CONFLICT => EndpointError::AlreadyInitialized,
        StatusCode::PRECONDITION_FAILED => EndpointError::NotInitialized,
        s if s.is_server_error() => EndpointError::Unavailable(format!("{}: {}", s, text)),
        s => EndpointError::Rejected(format!("{}: {}", s, text)),
    }
}

#[async_trait]
impl LedgerEndpoint for RemoteLedger {
    async fn initialize(&self, request: InitializationRequest) -> EndpointResult<StorageReference> {
        self.post("/initialize", &request).await
    }

    async fn signature_algorithm(&self) -> EndpointResult<SignatureAlgorithmId> {
        self.get("/signature_algorithm").await
    }

    async fn chain_id(&self) -> EndpointResult<String> {
        self.get("/chain_id").await
    }

    async fn gas_price(&self) -> EndpointResult<u64> {
        self.get("/gas_price").await
    }

    async fn nonce(&self, account: &StorageReference) -> EndpointResult<u64> {
        self.get(&format!("/nonce/{}", path_segment(account))).await
    }

    async fn runtime_jar(&self) -> EndpointResult<TransactionReference> {
        self.get("/runtime_jar").await
    }

    async fn manifest(&self) -> EndpointResult<StorageReference> {
        self.get("/manifest").await
    }

    async fn add_constructor_call(&self, request: SignedRequest) -> EndpointResult<StorageReference> {
        self.post("/constructor_call", &request).await
    }

    async fn add_method_call(&self, request: SignedRequest) -> EndpointResult<Option<StorageValue>> {
        self.post("/method_call", &request).await
    }

    async fn run_method_call(&self, request: TransactionRequest) -> EndpointResult<Option<StorageValue>> {
        self.post("/view_call", &request).await
    }

    async fn add_jar_store(&self, request: SignedRequest) -> EndpointResult<TransactionReference> {
        self.post("/jar_store", &request).await
    }

    async fn response(&self, reference: &TransactionReference) -> EndpointResult<Option<RecordedResponse>> {
        self.get(&format!("/response/{}", path_segment(reference))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_reference_is_escaped() {
        let reference = StorageReference::new(TransactionReference::from_bytes([0xab; 32]), 3);
        let segment = path_segment(&reference);
        assert!(!segment.contains('#'));
        assert!(segment.ends_with("%233"));
    }

    #[test]
    fn test_status_fallback() {
        assert_eq!(
            status_error(StatusCode::CONFLICT, String::new()),
            EndpointError::AlreadyInitialized
        );
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "proxy".into()),
            EndpointError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "nope".into()),
            EndpointError::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let ledger =
            RemoteLedger::with_timeout("http://127.0.0.1:1/", Duration::from_millis(500)).unwrap();
        assert_eq!(ledger.base_url(), "http://127.0.0.1:1");
        assert!(matches!(
            ledger.gas_price().await,
            Err(EndpointError::Unavailable(_))
        ));
    }
}

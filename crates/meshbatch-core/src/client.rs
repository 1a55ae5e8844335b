//! The narrow backend contract every pool client implements (spec §4.A).
//!
//! This trait is intentionally not a `tower::Service`: the operations here are named async
//! methods on a single authenticated session, not a generic `Request -> Response` middleware
//! chain, and none of the pool's checkout/release/cooldown logic wants to go through
//! `poll_ready`. Kept narrow and async-trait based instead, matching the shape of an SDK
//! client rather than an HTTP layer.

use crate::value::QueryRow;
use async_trait::async_trait;
use std::time::Duration;

/// An error a [`BackendClient`] operation may return.
///
/// The aggregate-limit detection (spec §9 "Exception-for-control-flow") is modeled as a
/// dedicated variant here rather than a substring scan further up the stack: a real client
/// implementation is responsible for recognizing the backend's fault text and producing
/// [`ClientError::AggregateLimitExceeded`] directly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("throttled, retry after {0:?}")]
    Throttled(Duration),

    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("authentication expired")]
    AuthExpired,

    #[error("fatal backend error: {0}")]
    Fatal(String),

    #[error("aggregate query exceeded the backend's record limit")]
    AggregateLimitExceeded { limit: Option<u64> },
}

impl ClientError {
    /// True for errors a caller should retry locally (spec §7 propagation policy).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Throttled(_) | ClientError::Transient(_))
    }

    /// Stable machine-readable code for reporting in a [`crate::value::QueryRow`]-free context,
    /// e.g. `BulkResult` record errors.
    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::Throttled(_) => "Connection.Throttled",
            ClientError::Transient(_) => "Connection.Transient",
            ClientError::AuthExpired => "Connection.AuthExpired",
            ClientError::Fatal(_) => "Connection.Fatal",
            ClientError::AggregateLimitExceeded { .. } => "Query.AggregateLimitExceeded",
        }
    }
}

/// One page of results from [`BackendClient::retrieve_multiple`].
#[derive(Debug, Clone)]
pub struct RetrieveMultipleResponse {
    pub records: Vec<QueryRow>,
    pub more_records: bool,
    pub paging_cookie: Option<String>,
    pub page_number: u32,
    pub total_count: Option<u64>,
}

/// Options controlling an [`BackendClient::execute_multiple`] batch.
#[derive(Debug, Clone, Default)]
pub struct ExecuteMultipleOptions {
    pub continue_on_error: bool,
}

/// The outcome of one request within an `execute_multiple` batch.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    Success(QueryRow),
    Failure(ClientError),
}

/// An opaque request understood by [`BackendClient::execute`] and `execute_multiple`. The
/// wire format is out of scope (spec §1); the core only needs to pass these through.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub operation: String,
    pub payload: Vec<u8>,
}

/// An authenticated, session-scoped handle against one endpoint (spec §3 `BackendClient`).
///
/// Owned exclusively by the pool that constructed it. Implementations are not required to be
/// safe for concurrent calls; the pool guarantees at most one in-flight call per client.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Single request/response against the backend.
    async fn execute(&self, request: BackendRequest) -> Result<QueryRow, ClientError>;

    /// One page of results for a native backend query.
    async fn retrieve_multiple(
        &self,
        query: &str,
        page_count: u32,
        paging_cookie: Option<&str>,
    ) -> Result<RetrieveMultipleResponse, ClientError>;

    /// Optimized count; `Ok(None)` signals "not supported here" rather than an error.
    async fn get_total_count(&self, entity: &str) -> Result<Option<u64>, ClientError>;

    /// Batched execution; each request's outcome is reported independently.
    async fn execute_multiple(
        &self,
        requests: Vec<BackendRequest>,
        options: ExecuteMultipleOptions,
    ) -> Result<Vec<RequestOutcome>, ClientError>;
}

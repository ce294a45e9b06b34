//! HTTP client abstraction over the remote analysis service.
//!
//! This module defines the `ServiceClient` trait to abstract request
//! execution against the service's fixed endpoint surface, enabling
//! testability with mock implementations.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::error::{PipetteError, Result};

/// Response from the analysis service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as a string
    pub body: String,
}

impl HttpResponse {
    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request against one of the service's endpoints.
///
/// The consumed surface is fixed (reset, upload, run, status, result files),
/// so requests are a closed enum rather than free-form method/path/body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceRequest {
    /// POST `/reset` — clear server-side data and results (best-effort on
    /// entry to the home view).
    Reset,
    /// POST `/upload` — multipart form with the two selected files.
    Upload {
        expression_matrix: PathBuf,
        covariate_table: PathBuf,
    },
    /// POST `/run` — trigger the analysis pipeline.
    Run,
    /// GET `/analysis` — current job status.
    Status,
    /// GET `/result-files` — list result artifacts with the given extension.
    ResultFiles { extension: String },
}

impl ServiceRequest {
    /// HTTP method for this endpoint.
    pub fn method(&self) -> &'static str {
        match self {
            ServiceRequest::Reset | ServiceRequest::Upload { .. } | ServiceRequest::Run => "POST",
            ServiceRequest::Status | ServiceRequest::ResultFiles { .. } => "GET",
        }
    }

    /// Path portion of the endpoint URL.
    pub fn path(&self) -> &'static str {
        match self {
            ServiceRequest::Reset => "/reset",
            ServiceRequest::Upload { .. } => "/upload",
            ServiceRequest::Run => "/run",
            ServiceRequest::Status => "/analysis",
            ServiceRequest::ResultFiles { .. } => "/result-files",
        }
    }
}

impl std::fmt::Display for ServiceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

/// Trait for executing requests against the analysis service.
///
/// This abstraction allows for different implementations (production vs.
/// testing) and makes the session and polling logic testable without making
/// real HTTP calls.
#[async_trait]
pub trait ServiceClient: Send + Sync + Clone {
    /// Execute a request against the service.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The request fails due to network issues
    /// - The request times out
    /// - A file selected for upload cannot be read
    async fn execute(&self, request: &ServiceRequest) -> Result<HttpResponse>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production client using reqwest.
#[derive(Clone)]
pub struct ReqwestServiceClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestServiceClient {
    /// Create a new reqwest-based client for the configured service.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }

    /// Build a multipart form for the two selected files.
    async fn upload_form(
        expression_matrix: &PathBuf,
        covariate_table: &PathBuf,
    ) -> Result<reqwest::multipart::Form> {
        let expr_part = Self::file_part(expression_matrix).await?;
        let cov_part = Self::file_part(covariate_table).await?;
        Ok(reqwest::multipart::Form::new()
            .part("expression_matrix", expr_part)
            .part("covariate_table", cov_part))
    }

    async fn file_part(path: &PathBuf) -> Result<reqwest::multipart::Part> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PipetteError::Validation(format!(
                    "selected path has no file name: {}",
                    path.display()
                ))
            })?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read selected file {}", path.display()))?;
        Ok(reqwest::multipart::Part::bytes(bytes).file_name(file_name))
    }
}

#[async_trait]
impl ServiceClient for ReqwestServiceClient {
    #[tracing::instrument(skip(self, request), fields(endpoint = %request))]
    async fn execute(&self, request: &ServiceRequest) -> Result<HttpResponse> {
        let url = format!("{}{}", self.base_url, request.path());

        tracing::debug!(url = %url, timeout_ms = self.timeout.as_millis() as u64, "Executing service request");

        let builder = match request {
            ServiceRequest::Reset | ServiceRequest::Run => self.client.post(&url),
            ServiceRequest::Upload {
                expression_matrix,
                covariate_table,
            } => {
                let form = Self::upload_form(expression_matrix, covariate_table).await?;
                self.client.post(&url).multipart(form)
            }
            ServiceRequest::Status => self.client.get(&url),
            ServiceRequest::ResultFiles { extension } => {
                self.client.get(&url).query(&[("extension", extension)])
            }
        };

        let response = builder.timeout(self.timeout).send().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Service request failed");
            e
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status = status, response_len = body.len(), "Service request completed");

        Ok(HttpResponse { status, body })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// Mock service client for testing.
///
/// Allows configuring predetermined responses per endpoint without making
/// actual HTTP calls.
///
/// # Example
/// ```ignore
/// let mock = MockServiceClient::new();
/// mock.add_response(
///     "GET /analysis",
///     Ok(HttpResponse { status: 200, body: r#"{"status":"done"}"#.to_string() }),
/// );
/// ```
#[derive(Clone)]
pub struct MockServiceClient {
    responses: Arc<Mutex<HashMap<String, Vec<MockResponse>>>>,
    calls: Arc<Mutex<Vec<ServiceRequest>>>,
    in_flight: Arc<AtomicUsize>,
}

/// A mock response that can optionally wait for a trigger before completing.
enum MockResponse {
    /// Immediate response
    Immediate(Result<HttpResponse>),
    /// Response that waits for a trigger signal before completing
    Triggered {
        response: Result<HttpResponse>,
        trigger: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
    },
}

impl MockServiceClient {
    /// Create a new mock client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a predetermined response for an endpoint.
    ///
    /// The key is formatted as "{method} {path}" (e.g., "GET /analysis").
    /// Multiple responses can be added for the same key - they will be
    /// returned in FIFO order.
    pub fn add_response(&self, key: &str, response: Result<HttpResponse>) {
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Immediate(response));
    }

    /// Add a response that will wait for a manual trigger before completing.
    ///
    /// Returns a sender that when triggered (by sending `()` or dropping)
    /// will cause the request to complete with the given response. Useful
    /// for holding a request in flight while the caller cancels.
    pub fn add_response_with_trigger(
        &self,
        key: &str,
        response: Result<HttpResponse>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses
            .lock()
            .entry(key.to_string())
            .or_default()
            .push(MockResponse::Triggered {
                response,
                trigger: Arc::new(Mutex::new(Some(rx))),
            });
        tx
    }

    /// Get all calls that have been made to this mock client.
    pub fn get_calls(&self) -> Vec<ServiceRequest> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Get the number of calls made to a specific endpoint key.
    pub fn call_count_for(&self, key: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.to_string() == key)
            .count()
    }

    /// Get the number of requests currently in-flight (executing).
    ///
    /// This is useful for testing cancellation - if a request is aborted,
    /// the in-flight count will decrease.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockServiceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceClient for MockServiceClient {
    async fn execute(&self, request: &ServiceRequest) -> Result<HttpResponse> {
        // Increment in-flight counter
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        // Guard to ensure we decrement even if cancelled/panicked
        let in_flight = self.in_flight.clone();
        let _guard = InFlightGuard { in_flight };

        // Record this call
        self.calls.lock().push(request.clone());

        // Look up the response
        let key = request.to_string();
        let mock_response = {
            let mut responses = self.responses.lock();
            responses
                .get_mut(&key)
                .filter(|queue| !queue.is_empty())
                .map(|queue| queue.remove(0))
        };

        match mock_response {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                // Wait for the trigger signal before returning the response
                let rx = trigger.lock().take();
                if let Some(rx) = rx {
                    // Wait for trigger (ignore the result - we proceed either way)
                    let _ = rx.await;
                }
                response
            }
            None => Err(PipetteError::Other(anyhow::anyhow!(
                "No mock response configured for {}",
                key
            ))),
        }
    }
}

/// Guard that decrements the in-flight counter when dropped.
/// This ensures the counter is decremented even if the task is cancelled.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

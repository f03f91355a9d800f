//! The seam between workflow steps and the HTTP layer.
//!
//! Steps talk to a [`Transport`]. Under load that is [`GooseTransport`],
//! which routes every request through the current [`GooseUser`] so goose
//! owns pacing, connection reuse and metrics. [`DirectTransport`] is a plain
//! reqwest client used by the smoke run and the integration tests.

use crate::error::TransportError;
use crate::record_latency;
use async_trait::async_trait;
use goose::metrics::GooseRequestMetric;
use goose::prelude::*;
use serde_json::Value;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
}

impl ApiMethod {
    fn goose(self) -> GooseMethod {
        match self {
            Self::Get => GooseMethod::Get,
            Self::Post => GooseMethod::Post,
            Self::Put => GooseMethod::Put,
        }
    }
}

/// A request as a step describes it: method, path relative to the host, the
/// metric name, and an optional JSON body.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub path: String,
    pub name: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            name: name.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, name: impl Into<String>, body: Value) -> Self {
        Self {
            method: ApiMethod::Post,
            path: path.into(),
            name: name.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, name: impl Into<String>, body: Value) -> Self {
        Self {
            method: ApiMethod::Put,
            path: path.into(),
            name: name.into(),
            body: Some(body),
        }
    }
}

/// Handle to a request already sent through a transport, used to mark that
/// exact request failed later on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(pub usize);

/// An HTTP response of any status.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub ticket: Ticket,
    pub status: u16,
    pub body: String,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send {
    /// Send one request. Only build and connection problems are errors.
    async fn send(&mut self, request: ApiRequest) -> Result<ApiReply, TransportError>;

    /// Report a previously sent request as failed with `reason`.
    fn fail(&mut self, ticket: Ticket, reason: &str);

    /// Attach `Authorization: Bearer {token}` to every later request.
    fn set_bearer(&mut self, token: &str);
}

// ============================================================================
// Goose
// ============================================================================

/// Transport over a [`GooseUser`], living for one transaction.
pub struct GooseTransport<'a> {
    user: &'a mut GooseUser,
    bearer: Option<String>,
    sent: Vec<(GooseRequestMetric, String)>,
    outcome: TransactionResult,
}

impl<'a> GooseTransport<'a> {
    pub fn new(user: &'a mut GooseUser, bearer: Option<String>) -> Self {
        Self {
            user,
            bearer,
            sent: Vec::new(),
            outcome: Ok(()),
        }
    }

    /// Release the user and hand back the transaction result: the first
    /// failure reported through [`Transport::fail`], if any.
    pub fn finish(self) -> TransactionResult {
        self.outcome
    }
}

#[async_trait]
impl<'a> Transport for GooseTransport<'a> {
    async fn send(&mut self, request: ApiRequest) -> Result<ApiReply, TransportError> {
        let mut request_builder = self
            .user
            .get_request_builder(&request.method.goose(), &request.path)
            .map_err(|e| TransportError::Build {
                name: request.name.clone(),
                detail: e.to_string(),
            })?;
        if let Some(token) = &self.bearer {
            request_builder = request_builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            request_builder = request_builder.json(body);
        }

        let goose_request = GooseRequest::builder()
            .method(request.method.goose())
            .path(request.path.as_str())
            .name(request.name.as_str())
            .set_request_builder(request_builder)
            .build();

        let start = Instant::now();
        let goose = self
            .user
            .request(goose_request)
            .await
            .map_err(|e| TransportError::Build {
                name: request.name.clone(),
                detail: e.to_string(),
            })?;
        record_latency(&request.name, start.elapsed().as_secs_f64() * 1000.0);

        // Goose has already recorded connection errors as failed requests.
        let response = goose.response.map_err(|e| TransportError::Network {
            name: request.name.clone(),
            detail: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Network {
            name: request.name.clone(),
            detail: e.to_string(),
        })?;

        let ticket = Ticket(self.sent.len());
        self.sent.push((goose.request, body.clone()));
        Ok(ApiReply {
            ticket,
            status,
            body,
        })
    }

    fn fail(&mut self, ticket: Ticket, reason: &str) {
        // Non-2xx responses are already counted as failed by goose.
        if let Some((metric, body)) = self.sent.get_mut(ticket.0) {
            if !metric.success {
                log::debug!("{}: {reason}", metric.name);
                return;
            }
            let result = self.user.set_failure(reason, metric, None, Some(body.as_str()));
            if self.outcome.is_ok() {
                self.outcome = result;
            }
        }
    }

    fn set_bearer(&mut self, token: &str) {
        self.bearer = Some(token.to_string());
    }
}

// ============================================================================
// Direct reqwest client
// ============================================================================

/// Request timeout for the direct client
pub const DIRECT_TIMEOUT_SECS: u64 = 30;

/// Connect timeout for the direct client
pub const DIRECT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// One request issued by a [`DirectTransport`]
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub name: String,
    pub method: ApiMethod,
    pub path: String,
    pub status: u16,
    /// Why the request counts as failed; non-2xx responses fail by default
    pub failure: Option<String>,
}

/// Standalone transport that keeps its own request log instead of goose
/// metrics.
pub struct DirectTransport {
    client: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
    records: Vec<RequestRecord>,
}

impl DirectTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_options(base_url, false)
    }

    pub fn with_options(base_url: &str, accept_invalid_certs: bool) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .timeout(Duration::from_secs(DIRECT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DIRECT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Build {
                name: "client".to_string(),
                detail: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer: None,
            records: Vec::new(),
        })
    }

    /// Every request sent so far, in order
    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }

    pub fn failures(&self) -> impl Iterator<Item = &RequestRecord> {
        self.records.iter().filter(|r| r.failure.is_some())
    }
}

#[async_trait]
impl Transport for DirectTransport {
    async fn send(&mut self, request: ApiRequest) -> Result<ApiReply, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            ApiMethod::Get => self.client.get(&url),
            ApiMethod::Post => self.client.post(&url),
            ApiMethod::Put => self.client.put(&url),
        };
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let network_error = |e: reqwest::Error| TransportError::Network {
            name: request.name.clone(),
            detail: e.to_string(),
        };
        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network_error)?;

        let ticket = Ticket(self.records.len());
        let reply = ApiReply {
            ticket,
            status,
            body,
        };
        self.records.push(RequestRecord {
            name: request.name,
            method: request.method,
            path: request.path,
            status,
            failure: (!reply.is_success()).then(|| format!("HTTP {status}")),
        });
        Ok(reply)
    }

    fn fail(&mut self, ticket: Ticket, reason: &str) {
        if let Some(record) = self.records.get_mut(ticket.0) {
            record.failure = Some(reason.to_string());
        }
    }

    fn set_bearer(&mut self, token: &str) {
        self.bearer = Some(token.to_string());
    }
}

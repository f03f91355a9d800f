//! Error types shared by the transports, configuration and reporting.

use thiserror::Error;

/// A request could not be built or never produced an HTTP response.
///
/// Non-2xx responses are not transport errors; they come back as
/// [`crate::transport::ApiReply`] values and are judged by each step.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build request `{name}`: {detail}")]
    Build { name: String, detail: String },

    #[error("request `{name}` failed: {detail}")]
    Network { name: String, detail: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown scenario selection `{0}` (expected customer, owner or all)")]
    UnknownScenario(String),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("results file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("result serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

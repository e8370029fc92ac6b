//! Error types for the workflow API client.
//!
//! # Design
//! Two kinds matter to callers. `Configuration` is raised once, at
//! construction, when the settings cannot produce a usable client. `Remote`
//! is the per-call rejection: it carries the service's error body verbatim
//! when there is one and nothing otherwise. Transport diagnostics ride along
//! in `RemoteError::cause` but never change the normalized payload.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by `Client` construction and operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The construction-time settings are unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A dispatched request was rejected.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The caller's request body could not be encoded as JSON.
    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ClientError {
    /// The normalized rejection value, if this is a remote error carrying one.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ClientError::Remote(remote) => remote.payload(),
            _ => None,
        }
    }
}

/// A rejected call, normalized to the service's error payload.
#[derive(Debug, Error)]
#[error("{}", describe(.status, .cause))]
pub struct RemoteError {
    status: Option<u16>,
    payload: Option<Value>,
    cause: Option<TransportError>,
}

impl RemoteError {
    /// The service answered with a non-2xx status.
    pub fn from_response(status: u16, payload: Option<Value>) -> Self {
        Self {
            status: Some(status),
            payload,
            cause: None,
        }
    }

    /// No response reached the protocol layer.
    pub fn from_transport(cause: TransportError) -> Self {
        Self {
            status: None,
            payload: None,
            cause: Some(cause),
        }
    }

    /// Error body sent by the service; absent for transport failures.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Transport diagnostic for failures below the protocol layer.
    pub fn cause(&self) -> Option<&TransportError> {
        self.cause.as_ref()
    }
}

fn describe(status: &Option<u16>, cause: &Option<TransportError>) -> String {
    match (status, cause) {
        (Some(status), _) => format!("remote operation failed with status {status}"),
        (None, Some(cause)) => format!("remote operation failed: {cause}"),
        (None, None) => "remote operation failed".to_string(),
    }
}

/// Failure raised by a `Transport` before a response was available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

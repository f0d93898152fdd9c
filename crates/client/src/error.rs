//! Error types for the KAS clients.
//!
//! Failures are split in two: [`ServiceError`] is a structured error the service reported on
//! purpose (e.g. "data doesn't exist"), [`ClientError`] is anything that went wrong getting there.

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Error code the service uses when the requested resource does not exist.
pub const DATA_NOT_FOUND: i64 = 1061010;

/// Transport level errors.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientError {
    /// Missing access key id or secret access key.
    #[error("Missing access key id or secret access key")]
    MissingCredentials,

    /// Error parsing the response.
    #[error("Error parsing response: {0}")]
    Parse(String),

    /// Error creating the request parameters.
    #[error("Could not create request param: {0}")]
    Param(String),

    /// Body error, unlikely to be recoverable by retrying
    #[error("{0}")]
    Body(String),

    /// HTTP status error without a structured service error in the body.
    #[error("Obtained failure status({0}): {1}")]
    Status(String, String),

    /// Error decoding the response
    #[error("Malformed Response: {0}")]
    MalformedResponse(String),

    /// Connection error
    #[error("Could not connect: {0}")]
    Connection(String),

    /// Timeout error
    #[error("Timeout")]
    Timeout,

    /// Redirect error
    #[error("HttpRedirect: {0}")]
    HttpRedirect(String),

    /// Error building the request
    #[error("Could not build request: {0}")]
    ReqBuilder(String),

    /// General request error
    #[error("Could not create request: {0}")]
    Request(String),

    /// JSON-RPC transport error from the node client.
    #[error("node rpc: {0}")]
    Rpc(String),

    /// Unknown error
    #[error("{0}")]
    Other(String),
}

impl From<SerdeJsonError> for ClientError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Parse(format!("Could not parse {}", value))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() {
            ClientError::Body(err.to_string())
        } else if err.is_status() {
            match err.status() {
                Some(code) => ClientError::Status(code.to_string(), err.to_string()),
                _ => ClientError::Other(err.to_string()),
            }
        } else if err.is_decode() {
            ClientError::MalformedResponse(err.to_string())
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_builder() {
            ClientError::ReqBuilder(err.to_string())
        } else if err.is_redirect() {
            ClientError::HttpRedirect(err.to_string())
        } else if err.is_request() {
            ClientError::Request(err.to_string())
        } else {
            ClientError::Other(err.to_string())
        }
    }
}

/// A structured error reported by the service.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("service error {code}: {message}")]
pub struct ServiceError {
    /// Service specific error code.
    pub code: i64,

    /// Human readable description.
    pub message: String,
}

/// Any error returned by a KAS client call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KasError {
    /// The service answered with a structured error.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The call did not complete.
    #[error(transparent)]
    Transport(#[from] ClientError),
}

impl KasError {
    /// Whether the service reported that the requested resource does not exist.
    ///
    /// Only [`DATA_NOT_FOUND`] counts; every other code is a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KasError::Service(ServiceError { code, .. }) if *code == DATA_NOT_FOUND)
    }
}

/// Result of a KAS client call.
pub type KasResult<T> = Result<T, KasError>;

/// Result of an operation that can only fail locally.
pub type ClientResult<T> = Result<T, ClientError>;

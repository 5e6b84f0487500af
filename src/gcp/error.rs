//! GCP API error classification
//!
//! Non-success responses are turned into a typed [`ApiError`] carrying the
//! HTTP status and whatever the GCP error envelope told us. Callers that need
//! to tell "missing" from "denied" from "broken" use [`classify_error`]
//! instead of matching on error strings.

use serde_json::Value;
use thiserror::Error;

/// A non-success response from a GCP REST API
#[derive(Debug, Clone, Error)]
#[error("API request failed: {status}{}", reason_suffix(.reason))]
pub struct ApiError {
    pub status: u16,
    /// First `errors[].reason` of the envelope, e.g. `notFound`
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: None,
            message: None,
        }
    }

    /// Build an error from a status code and the raw response body.
    ///
    /// GCP wraps failures as `{"error": {"code", "message", "errors": [{"reason"}]}}`.
    /// Bodies that are not JSON (or not that shape) leave `reason`/`message` empty.
    pub fn from_body(status: u16, body: &str) -> Self {
        let envelope = serde_json::from_str::<Value>(body).ok();
        let error = envelope.as_ref().and_then(|v| v.get("error"));

        let message = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(|s| s.to_string());
        let reason = error
            .and_then(|e| e.get("errors"))
            .and_then(|e| e.as_array())
            .and_then(|errors| errors.first())
            .and_then(|e| e.get("reason"))
            .and_then(|r| r.as_str())
            .map(|s| s.to_string());

        Self {
            status,
            reason,
            message,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        classify_status(self.status)
    }
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default()
}

/// How a failed call should be understood by the inventory pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The sub-resource does not exist (404)
    Absence,
    /// The caller lacks permission (403)
    Forbidden,
    /// The request was rejected as invalid (400), e.g. legacy ACLs on a
    /// bucket with uniform bucket-level access
    Malformed,
    /// Anything else: auth failures, 5xx, transport or decode errors
    Fatal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absence => "absence",
            Self::Forbidden => "forbidden",
            Self::Malformed => "malformed",
            Self::Fatal => "fatal",
        }
    }
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        404 => ErrorKind::Absence,
        403 => ErrorKind::Forbidden,
        400 => ErrorKind::Malformed,
        _ => ErrorKind::Fatal,
    }
}

/// Classify an error by walking its chain for an [`ApiError`].
///
/// Errors without an API status (token, network, JSON) are always fatal.
pub fn classify_error(error: &anyhow::Error) -> ErrorKind {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map(ApiError::kind)
        .unwrap_or(ErrorKind::Fatal)
}

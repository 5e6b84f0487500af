//! HTTP utilities for GCP REST API calls

use super::error::{ApiError, ErrorKind};
use anyhow::{Context, Result};
use reqwest::header::DATE;
use reqwest::Client;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and drops non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// A decoded response along with the headers the exporters care about
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub body: Value,
    /// Raw `Date` header of the response, if the server sent one
    pub date: Option<String>,
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gcpinv/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API and return the JSON body
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        Ok(self.get_response(url, token).await?.body)
    }

    /// Make a GET request to a GCP API, keeping the response `Date` header
    pub async fn get_response(&self, url: &str, token: &str) -> Result<ApiResponse> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let date = response
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            let error = ApiError::from_body(status.as_u16(), &body);
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            match error.kind() {
                ErrorKind::Fatal => {
                    tracing::error!("API error: {} - {}", status, sanitize_for_log(&body))
                },
                kind => tracing::debug!(
                    "API {} response: {} - {}",
                    kind.as_str(),
                    status,
                    sanitize_for_log(&body)
                ),
            }
            return Err(error.into());
        }

        // Handle empty response
        if body.is_empty() {
            return Ok(ApiResponse {
                body: Value::Null,
                date,
            });
        }

        let body = serde_json::from_str(&body).context("Failed to parse response JSON")?;
        Ok(ApiResponse { body, date })
    }
}

/// Format a GCP API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    let status = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map(|e| e.status);

    match status {
        Some(403) => return "Permission denied. Check your GCP IAM permissions.".to_string(),
        Some(401) => {
            return "Authentication failed. Run 'gcloud auth application-default login'."
                .to_string()
        },
        Some(404) => return "Resource not found.".to_string(),
        Some(429) => return "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => return "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(503) => {
            return "GCP service temporarily unavailable. Please try again.".to_string()
        },
        Some(_) => {
            return "Request failed. Check your network connection and try again.".to_string()
        },
        None => {},
    }

    // Truncate long error messages and remove potential sensitive data
    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

//! GCP Client
//!
//! Main client for interacting with GCP APIs, combining authentication
//! and HTTP functionality. The client is built once and passed explicitly to
//! every listing and enrichment call.

use super::auth::GcpCredentials;
use super::http::{ApiResponse, GcpHttpClient};
use anyhow::{Context, Result};
use serde_json::Value;

/// Base URLs of the APIs the exporters talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub storage: String,
    pub sqladmin: String,
    pub resourcemanager: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            storage: "https://storage.googleapis.com".to_string(),
            sqladmin: "https://sqladmin.googleapis.com".to_string(),
            resourcemanager: "https://cloudresourcemanager.googleapis.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every API at the same base URL (mock servers)
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            storage: base.clone(),
            sqladmin: base.clone(),
            resourcemanager: base,
        }
    }
}

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    pub project_id: String,
    pub endpoints: Endpoints,
}

impl GcpClient {
    /// Create a new GCP client using ambient credentials
    pub async fn new(project_id: &str) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(project_id, credentials, Endpoints::default())
    }

    /// Create a client from explicit credentials and endpoints
    pub fn with_credentials(
        project_id: &str,
        credentials: GcpCredentials,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            project_id: project_id.to_string(),
            endpoints,
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a GET request and keep the response headers of interest
    pub async fn get_response(&self, url: &str) -> Result<ApiResponse> {
        let token = self.get_token().await?;
        self.http.get_response(url, &token).await
    }

    // =========================================================================
    // Cloud Storage API helpers
    // =========================================================================

    /// Build Cloud Storage API URL
    pub fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{}", self.endpoints.storage, path)
    }

    /// Build Cloud Storage bucket URL
    pub fn storage_bucket_url(&self, bucket: &str) -> String {
        self.storage_url(&format!("b/{}", urlencoding::encode(bucket)))
    }

    // =========================================================================
    // Cloud SQL Admin API helpers
    // =========================================================================

    /// Build Cloud SQL Admin API URL scoped to the current project
    pub fn sqladmin_url(&self, path: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.endpoints.sqladmin, self.project_id, path
        )
    }

    /// Build Cloud SQL instance URL
    pub fn sql_instance_url(&self, instance: &str) -> String {
        self.sqladmin_url(&format!("instances/{}", urlencoding::encode(instance)))
    }

    // =========================================================================
    // Resource Manager API helpers
    // =========================================================================

    /// Build Resource Manager API URL
    pub fn resourcemanager_url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.endpoints.resourcemanager, path)
    }
}

/// Append query parameters to an API URL, percent-encoding values
pub fn with_query(url: &str, params: &[(&str, &str)]) -> Result<String> {
    let url = url::Url::parse_with_params(url, params)
        .with_context(|| format!("Invalid API URL: {}", url))?;
    Ok(url.to_string())
}

/// Format a GCP API error for display
pub fn format_gcp_error(error: &anyhow::Error) -> String {
    super::http::format_gcp_error(error)
}

//! Cloud Storage
//!
//! Bucket metadata, ACL and label lookups. Each lookup is a separate call so
//! that a failure in one of them does not take the others down.

use super::client::{with_query, GcpClient};
use super::Labels;
use anyhow::{Context, Result};
use serde_json::Value;

/// A bucket as returned by the bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSummary {
    pub name: String,
    /// RFC 3339 `timeCreated`, when the listing included it
    pub time_created: Option<String>,
}

impl From<&Value> for BucketSummary {
    fn from(value: &Value) -> Self {
        Self {
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
            time_created: value
                .get("timeCreated")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }
    }
}

/// URL of the project's bucket listing (first page)
pub fn buckets_list_url(client: &GcpClient) -> Result<String> {
    with_query(&client.storage_url("b"), &[("project", &client.project_id)])
}

/// Grantee entities of the bucket's legacy ACL, in API order.
///
/// Buckets with uniform bucket-level access reject this call with a 400.
pub async fn get_bucket_acl(client: &GcpClient, bucket: &str) -> Result<Vec<String>> {
    let url = format!("{}/acl", client.storage_bucket_url(bucket));
    let response = client
        .get(&url)
        .await
        .with_context(|| format!("Failed to fetch ACL of bucket '{}'", bucket))?;

    let grantees = response
        .get("items")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item.get("entity")
                        .and_then(|v| v.as_str())
                        .unwrap_or("N/A")
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(grantees)
}

/// Labels of a bucket. A bucket without labels yields an empty set.
pub async fn get_bucket_labels(client: &GcpClient, bucket: &str) -> Result<Labels> {
    let url = with_query(&client.storage_bucket_url(bucket), &[("fields", "labels")])?;
    let response = client
        .get(&url)
        .await
        .with_context(|| format!("Failed to fetch labels of bucket '{}'", bucket))?;

    Ok(super::labels_from(response.get("labels")))
}

/// `Date` header of a bucket metadata request.
///
/// This is the time the request was served, not when the bucket was created.
pub async fn get_bucket_response_date(client: &GcpClient, bucket: &str) -> Result<Option<String>> {
    let url = with_query(&client.storage_bucket_url(bucket), &[("fields", "name")])?;
    let response = client
        .get_response(&url)
        .await
        .with_context(|| format!("Failed to fetch metadata of bucket '{}'", bucket))?;

    Ok(response.date)
}

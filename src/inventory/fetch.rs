//! Resource listing
//!
//! Listing calls follow `nextPageToken` until the API stops returning one.
//! Errors here are not tolerated: a listing that fails ends the run.

use crate::gcp::client::{with_query, GcpClient};
use crate::gcp::sql::instances_list_url;
use crate::gcp::storage::{buckets_list_url, BucketSummary};
use anyhow::{Context, Result};
use serde_json::Value;

/// Result of one page fetch
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Fetch one page of a list endpoint
pub async fn fetch_page(
    client: &GcpClient,
    url: &str,
    items_key: &str,
    page_token: Option<&str>,
) -> Result<PaginatedResult> {
    let url = match page_token {
        Some(token) => with_query(url, &[("pageToken", token)])?,
        None => url.to_string(),
    };

    let response = client.get(&url).await?;

    let items = response
        .get(items_key)
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let next_token = response
        .get("nextPageToken")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(PaginatedResult { items, next_token })
}

/// Fetch every page of a list endpoint (auto-paginate)
pub async fn fetch_all_pages(client: &GcpClient, url: &str, items_key: &str) -> Result<Vec<Value>> {
    let mut all_items = Vec::new();
    let mut seen_tokens: Vec<String> = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let result = fetch_page(client, url, items_key, page_token.as_deref()).await?;
        all_items.extend(result.items);

        let Some(token) = result.next_token else {
            break;
        };
        if seen_tokens.contains(&token) {
            anyhow::bail!("Pagination did not advance: page token '{}' was returned twice", token);
        }
        tracing::debug!("Following page token ({} items so far)", all_items.len());
        seen_tokens.push(token.clone());
        page_token = Some(token);
    }

    Ok(all_items)
}

/// List every bucket of the client's project
pub async fn list_buckets(client: &GcpClient) -> Result<Vec<BucketSummary>> {
    let url = buckets_list_url(client)?;
    let items = fetch_all_pages(client, &url, "items")
        .await
        .with_context(|| format!("Failed to list buckets of project '{}'", client.project_id))?;

    Ok(items.iter().map(BucketSummary::from).collect())
}

/// List every Cloud SQL instance of the client's project in one region
pub async fn list_sql_instances(client: &GcpClient, region: &str) -> Result<Vec<Value>> {
    let url = instances_list_url(client, region)?;
    let items = fetch_all_pages(client, &url, "items")
        .await
        .with_context(|| format!("Failed to list Cloud SQL instances in {}", region))?;

    // The filter is applied server side; keep the region check local as well
    let (matching, other): (Vec<Value>, Vec<Value>) = items.into_iter().partition(|item| {
        item.get("region")
            .and_then(|v| v.as_str())
            .map_or(true, |r| r == region)
    });
    if !other.is_empty() {
        tracing::warn!(
            "Dropped {} instances outside region {} from listing",
            other.len(),
            region
        );
    }

    Ok(matching)
}

//! Cloud SQL
//!
//! Instance listing URLs and per-instance label lookups.

use super::client::{with_query, GcpClient};
use super::Labels;
use anyhow::{Context, Result};

/// URL of the instance listing for one region (first page)
pub fn instances_list_url(client: &GcpClient, region: &str) -> Result<String> {
    let filter = format!("region:{}", region);
    with_query(&client.sqladmin_url("instances"), &[("filter", &filter)])
}

/// User labels of a Cloud SQL instance. No labels yields an empty set.
pub async fn get_instance_labels(client: &GcpClient, instance: &str) -> Result<Labels> {
    let url = with_query(
        &client.sql_instance_url(instance),
        &[("fields", "settings/userLabels")],
    )?;
    let response = client
        .get(&url)
        .await
        .with_context(|| format!("Failed to fetch labels of instance '{}'", instance))?;

    Ok(super::labels_from(
        response.get("settings").and_then(|s| s.get("userLabels")),
    ))
}

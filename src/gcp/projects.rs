//! GCP Projects
//!
//! The project is the account identity recorded on every database row.

use super::client::GcpClient;
use anyhow::{Context, Result};
use serde_json::Value;

/// Project information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub project_number: String,
}

impl From<&Value> for Project {
    fn from(value: &Value) -> Self {
        Self {
            project_number: value
                .get("projectNumber")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string(),
        }
    }
}

/// Fetch the project the client is scoped to
pub async fn get_project(client: &GcpClient) -> Result<Project> {
    let url = client.resourcemanager_url(&format!(
        "projects/{}",
        urlencoding::encode(&client.project_id)
    ));
    let response = client
        .get(&url)
        .await
        .with_context(|| format!("Failed to fetch project '{}'", client.project_id))?;

    Ok(Project::from(&response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_from_value() {
        let project = Project::from(&json!({
            "projectId": "inventory-prod",
            "name": "Inventory",
            "projectNumber": "123456789012",
            "lifecycleState": "ACTIVE"
        }));
        assert_eq!(project.project_number, "123456789012");
    }

    #[test]
    fn test_project_defaults_missing_fields() {
        let project = Project::from(&json!({}));
        assert_eq!(project.project_number, "-");
    }
}

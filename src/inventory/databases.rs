//! Cloud SQL instance inventory
//!
//! Lists instances region by region, flattens each into a fixed set of
//! columns plus its labels, and writes one workbook sheet per region.

use super::console::Console;
use super::export::{validate_sheet_names, write_workbook};
use super::fetch::list_sql_instances;
use super::outcome::{Enrichment, RecoveryPolicy};
use super::record::{Cell, Record};
use super::table::Table;
use super::PLACEHOLDER;
use crate::gcp::client::{format_gcp_error, GcpClient};
use crate::gcp::{projects, sql};
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// US regions inventoried when none are configured
pub const DEFAULT_REGIONS: [&str; 5] = ["us-central1", "us-east1", "us-east4", "us-west1", "us-west2"];

/// Prefix of the per-label columns
pub const TAG_PREFIX: &str = "Tag_";

/// Columns every instance row carries, in output order
pub const DATABASE_COLUMNS: [&str; 28] = [
    "AccountID",
    "DBIdentifier",
    "Status",
    "MasterInstance",
    "Role",
    "Engine",
    "EngineVersion",
    "RegionZone",
    "SecondaryZone",
    "Tier",
    "Edition",
    "AllocatedStorage",
    "StorageType",
    "StorageAutoResize",
    "AvailabilityType",
    "VPC",
    "PublicIP",
    "IPAddresses",
    "AuthorizedNetworks",
    "CertificateExpiry",
    "Maintenance",
    "MaintenanceWindow",
    "Backups",
    "DeletionProtection",
    "CreatedTime",
    "Encryption",
    "Replicas",
    "ConnectionName",
];

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub regions: Vec<String>,
    /// Skip an instance on a fatal enrichment error instead of aborting the run
    pub skip_failed: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            regions: DEFAULT_REGIONS.iter().map(|r| r.to_string()).collect(),
            skip_failed: false,
        }
    }
}

/// Follow a dot-separated path into a JSON value
fn value_at<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(item, |current, part| current.get(part))
}

fn str_at<'a>(item: &'a Value, path: &str) -> Option<&'a str> {
    value_at(item, path).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

fn text_or_placeholder(item: &Value, path: &str) -> Cell {
    Cell::text(str_at(item, path).unwrap_or(PLACEHOLDER))
}

fn bool_or_placeholder(item: &Value, path: &str) -> Cell {
    match value_at(item, path).and_then(|v| v.as_bool()) {
        Some(b) => Cell::Bool(b),
        None => Cell::text(PLACEHOLDER),
    }
}

/// Join `field` of every object in the array at `path`
fn join_at(item: &Value, path: &str, field: impl Fn(&Value) -> Option<String>) -> String {
    value_at(item, path)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(field).collect::<Vec<_>>().join(", "))
        .unwrap_or_default()
}

/// Last path segment of a resource URL
fn short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// `POSTGRES_15` → (`POSTGRES`, `15`), `SQLSERVER_2019_STANDARD` → (`SQLSERVER`, `2019_STANDARD`)
fn split_database_version(version: &str) -> (String, String) {
    match version.split_once('_') {
        Some((engine, rest)) => (engine.to_string(), rest.to_string()),
        None => (version.to_string(), PLACEHOLDER.to_string()),
    }
}

fn format_created_time(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&chrono::Utc).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn maintenance_window(item: &Value) -> String {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    let Some(window) = value_at(item, "settings.maintenanceWindow") else {
        return PLACEHOLDER.to_string();
    };
    let day = window.get("day").and_then(|v| v.as_u64()).unwrap_or(0);
    let hour = window.get("hour").and_then(|v| v.as_u64()).unwrap_or(0);
    match day {
        1..=7 => format!("{} {:02}:00 UTC", DAYS[day as usize - 1], hour),
        _ => "any".to_string(),
    }
}

/// Flatten the base fields of a listed instance
pub fn instance_record(account_id: &str, instance: &Value) -> Record {
    let (engine, engine_version) = match str_at(instance, "databaseVersion") {
        Some(version) => split_database_version(version),
        None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
    };

    let storage = match value_at(instance, "settings.dataDiskSizeGb") {
        Some(Value::String(s)) => s.parse::<i64>().map(Cell::Int).unwrap_or_else(|_| Cell::text(s.as_str())),
        Some(Value::Number(n)) => n.as_i64().map(Cell::Int).unwrap_or(Cell::Empty),
        _ => Cell::text(PLACEHOLDER),
    };

    let vpc = str_at(instance, "settings.ipConfiguration.privateNetwork")
        .map(short_name)
        .unwrap_or(PLACEHOLDER);

    let ip_addresses = join_at(instance, "ipAddresses", |ip| {
        let address = ip.get("ipAddress")?.as_str()?;
        let kind = ip.get("type").and_then(|v| v.as_str()).unwrap_or("UNKNOWN");
        Some(format!("{}:{}", kind, address))
    });
    let authorized_networks = join_at(instance, "settings.ipConfiguration.authorizedNetworks", |n| {
        n.get("value").and_then(|v| v.as_str()).map(|s| s.to_string())
    });
    let replicas = join_at(instance, "replicaNames", |r| r.as_str().map(|s| s.to_string()));

    let created = str_at(instance, "createTime")
        .map(format_created_time)
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let encryption = if str_at(instance, "diskEncryptionConfiguration.kmsKeyName").is_some() {
        "CMEK"
    } else {
        "Google-managed"
    };

    let backups = value_at(instance, "settings.backupConfiguration.enabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let deletion_protection = value_at(instance, "settings.deletionProtectionEnabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let zone = str_at(instance, "gceZone")
        .or_else(|| str_at(instance, "region"))
        .unwrap_or(PLACEHOLDER);

    Record::new()
        .with("AccountID", account_id)
        .with("DBIdentifier", text_or_placeholder(instance, "name"))
        .with("Status", text_or_placeholder(instance, "state"))
        .with("MasterInstance", text_or_placeholder(instance, "masterInstanceName"))
        .with("Role", text_or_placeholder(instance, "instanceType"))
        .with("Engine", engine)
        .with("EngineVersion", engine_version)
        .with("RegionZone", zone)
        .with("SecondaryZone", text_or_placeholder(instance, "secondaryGceZone"))
        .with("Tier", text_or_placeholder(instance, "settings.tier"))
        .with("Edition", text_or_placeholder(instance, "settings.edition"))
        .with("AllocatedStorage", storage)
        .with("StorageType", text_or_placeholder(instance, "settings.dataDiskType"))
        .with(
            "StorageAutoResize",
            bool_or_placeholder(instance, "settings.storageAutoResize"),
        )
        .with(
            "AvailabilityType",
            text_or_placeholder(instance, "settings.availabilityType"),
        )
        .with("VPC", vpc)
        .with(
            "PublicIP",
            bool_or_placeholder(instance, "settings.ipConfiguration.ipv4Enabled"),
        )
        .with("IPAddresses", ip_addresses)
        .with("AuthorizedNetworks", authorized_networks)
        .with(
            "CertificateExpiry",
            text_or_placeholder(instance, "serverCaCert.expirationTime"),
        )
        .with(
            "Maintenance",
            text_or_placeholder(instance, "scheduledMaintenance.startTime"),
        )
        .with("MaintenanceWindow", maintenance_window(instance))
        .with("Backups", backups)
        .with("DeletionProtection", deletion_protection)
        .with("CreatedTime", created)
        .with("Encryption", encryption)
        .with("Replicas", replicas)
        .with("ConnectionName", text_or_placeholder(instance, "connectionName"))
}

/// Project number used as the `AccountID` column, fetched once per run
pub async fn fetch_account_id(client: &GcpClient, console: &mut dyn Console) -> Result<String> {
    let policy = RecoveryPolicy::DATABASES;
    let mut enrichment = Enrichment::new(&policy, "project", &client.project_id);

    let project = enrichment
        .fetch("identity", projects::get_project(client))
        .await?;
    for notice in enrichment.notices() {
        console.notice(&notice);
    }

    Ok(project
        .map(|p| p.project_number)
        .unwrap_or_else(|| PLACEHOLDER.to_string()))
}

/// Build the record for one instance, labels included
pub async fn enrich_instance(
    client: &GcpClient,
    account_id: &str,
    instance: &Value,
    console: &mut dyn Console,
) -> Result<Record> {
    let mut record = instance_record(account_id, instance);
    let Some(name) = str_at(instance, "name") else {
        return Ok(record);
    };

    let policy = RecoveryPolicy::DATABASES;
    let mut enrichment = Enrichment::new(&policy, "instance", name);

    let labels = enrichment
        .fetch("tags", sql::get_instance_labels(client, name))
        .await?
        .unwrap_or_default();
    for (key, value) in labels {
        record.set(format!("{}{}", TAG_PREFIX, key), value);
    }

    for notice in enrichment.notices() {
        console.notice(&notice);
    }

    Ok(record)
}

/// List and enrich instances for every region; one table per region, in region order
pub async fn collect_databases(
    client: &GcpClient,
    options: &DatabaseOptions,
    console: &mut dyn Console,
) -> Result<Vec<(String, Table)>> {
    // Each region becomes a sheet; bad names must fail before any API call
    validate_sheet_names(&options.regions).context("Invalid region list")?;

    let account_id = fetch_account_id(client, console).await?;
    let mut sheets = Vec::with_capacity(options.regions.len());

    for region in &options.regions {
        console.status(&format!("Fetching Cloud SQL instances in region: {}", region));
        let instances = list_sql_instances(client, region).await?;
        tracing::info!("Found {} instances in {}", instances.len(), region);

        let mut table = Table::new(&DATABASE_COLUMNS);
        let total = instances.len();

        for (index, instance) in instances.iter().enumerate() {
            let result = enrich_instance(client, &account_id, instance, console).await;
            console.progress(region, index + 1, total);

            match result {
                Ok(record) => table.push(record),
                Err(err) if options.skip_failed => {
                    let name = str_at(instance, "name").unwrap_or(PLACEHOLDER);
                    tracing::error!("Instance '{}' failed: {:?}", name, err);
                    console.notice(&format!(
                        "Skipped instance '{}': {}",
                        name,
                        format_gcp_error(&err)
                    ));
                },
                Err(err) => return Err(err),
            }
        }

        sheets.push((region.clone(), table));
    }

    Ok(sheets)
}

/// Run the database inventory and write the workbook to `path`. Returns the row count.
pub async fn export_databases(
    client: &GcpClient,
    options: &DatabaseOptions,
    path: &Path,
    console: &mut dyn Console,
) -> Result<usize> {
    let sheets = collect_databases(client, options, console).await?;
    write_workbook(&sheets, path)?;
    Ok(sheets.iter().map(|(_, table)| table.len()).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn postgres_instance() -> Value {
        json!({
            "name": "orders-db",
            "state": "RUNNABLE",
            "databaseVersion": "POSTGRES_15",
            "region": "us-east1",
            "gceZone": "us-east1-b",
            "instanceType": "CLOUD_SQL_INSTANCE",
            "connectionName": "inventory-prod:us-east1:orders-db",
            "createTime": "2024-03-05T08:09:10.123Z",
            "replicaNames": ["orders-db-replica"],
            "ipAddresses": [
                {"type": "PRIMARY", "ipAddress": "34.1.2.3"},
                {"type": "PRIVATE", "ipAddress": "10.0.0.5"}
            ],
            "serverCaCert": {"expirationTime": "2034-03-02T08:10:00Z"},
            "settings": {
                "tier": "db-custom-2-7680",
                "edition": "ENTERPRISE",
                "dataDiskSizeGb": "100",
                "dataDiskType": "PD_SSD",
                "storageAutoResize": true,
                "availabilityType": "REGIONAL",
                "ipConfiguration": {
                    "ipv4Enabled": true,
                    "privateNetwork": "projects/inventory-prod/global/networks/core-vpc",
                    "authorizedNetworks": [{"value": "203.0.113.0/24"}, {"value": "198.51.100.7/32"}]
                },
                "backupConfiguration": {"enabled": true},
                "maintenanceWindow": {"day": 7, "hour": 3},
                "userLabels": {"env": "prod"}
            }
        })
    }

    #[test]
    fn test_instance_record_flattens_fields() {
        let record = instance_record("123456789012", &postgres_instance());

        let columns: Vec<_> = record.columns().collect();
        assert_eq!(columns, DATABASE_COLUMNS.to_vec());

        assert_eq!(record.get("AccountID"), Some(&Cell::text("123456789012")));
        assert_eq!(record.get("Engine"), Some(&Cell::text("POSTGRES")));
        assert_eq!(record.get("EngineVersion"), Some(&Cell::text("15")));
        assert_eq!(record.get("RegionZone"), Some(&Cell::text("us-east1-b")));
        assert_eq!(record.get("AllocatedStorage"), Some(&Cell::Int(100)));
        assert_eq!(record.get("VPC"), Some(&Cell::text("core-vpc")));
        assert_eq!(record.get("PublicIP"), Some(&Cell::Bool(true)));
        assert_eq!(
            record.get("IPAddresses"),
            Some(&Cell::text("PRIMARY:34.1.2.3, PRIVATE:10.0.0.5"))
        );
        assert_eq!(
            record.get("AuthorizedNetworks"),
            Some(&Cell::text("203.0.113.0/24, 198.51.100.7/32"))
        );
        assert_eq!(record.get("MaintenanceWindow"), Some(&Cell::text("Sun 03:00 UTC")));
        assert_eq!(record.get("CreatedTime"), Some(&Cell::text("2024-03-05 08:09:10")));
        assert_eq!(record.get("Encryption"), Some(&Cell::text("Google-managed")));
        assert_eq!(record.get("Replicas"), Some(&Cell::text("orders-db-replica")));
        assert_eq!(record.get("MasterInstance"), Some(&Cell::text("-")));
    }

    #[test]
    fn test_instance_record_tolerates_sparse_instance() {
        let record = instance_record("-", &json!({"name": "bare", "state": "PENDING_CREATE"}));
        assert_eq!(record.len(), DATABASE_COLUMNS.len());
        assert_eq!(record.get("Engine"), Some(&Cell::text("-")));
        assert_eq!(record.get("AllocatedStorage"), Some(&Cell::text("-")));
        assert_eq!(record.get("StorageAutoResize"), Some(&Cell::text("-")));
        assert_eq!(record.get("Backups"), Some(&Cell::Bool(false)));
        assert_eq!(record.get("Replicas"), Some(&Cell::text("")));
        assert_eq!(record.get("MaintenanceWindow"), Some(&Cell::text("-")));
    }

    #[test]
    fn test_split_database_version() {
        assert_eq!(
            split_database_version("SQLSERVER_2019_STANDARD"),
            ("SQLSERVER".to_string(), "2019_STANDARD".to_string())
        );
        assert_eq!(
            split_database_version("MYSQL"),
            ("MYSQL".to_string(), "-".to_string())
        );
    }

    #[test]
    fn test_created_time_falls_back_to_raw() {
        assert_eq!(format_created_time("yesterday"), "yesterday");
        assert_eq!(
            format_created_time("2024-03-05T10:09:10+02:00"),
            "2024-03-05 08:09:10"
        );
    }

    #[test]
    fn test_maintenance_window_any_day() {
        let instance = json!({"settings": {"maintenanceWindow": {"day": 0, "hour": 0}}});
        assert_eq!(maintenance_window(&instance), "any");
    }
}

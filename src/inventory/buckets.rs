//! Cloud Storage bucket inventory
//!
//! Lists the project's buckets, enriches each with its ACL grantees and
//! labels, and writes one CSV row per bucket.

use super::console::Console;
use super::export::write_csv;
use super::fetch::list_buckets;
use super::outcome::{Enrichment, RecoveryPolicy};
use super::record::Record;
use super::table::Table;
use super::PLACEHOLDER;
use crate::gcp::client::{format_gcp_error, GcpClient};
use crate::gcp::storage::{self, BucketSummary};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Columns every bucket row carries, in output order
pub const BUCKET_COLUMNS: [&str; 3] = ["Name", "CreationDate", "Access"];

/// Prefix of the per-label columns
pub const TAG_PREFIX: &str = "Tag ";

/// Where the `CreationDate` column comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CreationDateSource {
    /// `timeCreated` from the bucket listing
    #[default]
    Metadata,
    /// `Date` header of a per-bucket metadata request (time of the query)
    ResponseDate,
}

#[derive(Debug, Clone, Default)]
pub struct BucketOptions {
    pub creation_date: CreationDateSource,
    /// Skip a bucket on a fatal enrichment error instead of aborting the run
    pub skip_failed: bool,
}

/// Build the record for one bucket
pub async fn enrich_bucket(
    client: &GcpClient,
    bucket: &BucketSummary,
    options: &BucketOptions,
    console: &mut dyn Console,
) -> Result<Record> {
    let policy = RecoveryPolicy::BUCKETS;
    let mut enrichment = Enrichment::new(&policy, "bucket", &bucket.name);

    let creation_date = match options.creation_date {
        CreationDateSource::Metadata => bucket.time_created.clone(),
        CreationDateSource::ResponseDate => enrichment
            .fetch(
                "creation date",
                storage::get_bucket_response_date(client, &bucket.name),
            )
            .await?
            .flatten(),
    };

    let access = enrichment
        .fetch("access", storage::get_bucket_acl(client, &bucket.name))
        .await?
        .map(|grantees| grantees.join(", "));

    let labels = enrichment
        .fetch("tags", storage::get_bucket_labels(client, &bucket.name))
        .await?
        .unwrap_or_default();

    let mut record = Record::new()
        .with("Name", bucket.name.as_str())
        .with(
            "CreationDate",
            creation_date.unwrap_or_else(|| PLACEHOLDER.to_string()),
        )
        .with("Access", access.unwrap_or_else(|| PLACEHOLDER.to_string()));
    for (key, value) in labels {
        record.set(format!("{}{}", TAG_PREFIX, key), value);
    }

    for notice in enrichment.notices() {
        console.notice(&notice);
    }

    Ok(record)
}

/// List and enrich every bucket of the project
pub async fn collect_buckets(
    client: &GcpClient,
    options: &BucketOptions,
    console: &mut dyn Console,
) -> Result<Table> {
    let buckets = list_buckets(client).await?;
    tracing::info!(
        "Found {} buckets in project {}",
        buckets.len(),
        client.project_id
    );

    let mut table = Table::new(&BUCKET_COLUMNS);
    let total = buckets.len();
    console.progress("Buckets", 0, total);

    for (index, bucket) in buckets.iter().enumerate() {
        let result = enrich_bucket(client, bucket, options, console).await;
        console.progress("Buckets", index + 1, total);

        match result {
            Ok(record) => table.push(record),
            Err(err) if options.skip_failed => {
                tracing::error!("Bucket '{}' failed: {:?}", bucket.name, err);
                console.notice(&format!(
                    "Skipped bucket '{}': {}",
                    bucket.name,
                    format_gcp_error(&err)
                ));
            },
            Err(err) => return Err(err),
        }
    }

    Ok(table)
}

/// Run the bucket inventory and write it to `path`. Returns the row count.
pub async fn export_buckets(
    client: &GcpClient,
    options: &BucketOptions,
    path: &Path,
    console: &mut dyn Console,
) -> Result<usize> {
    let table = collect_buckets(client, options, console).await?;
    write_csv(&table, path)?;
    Ok(table.len())
}

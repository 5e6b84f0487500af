//! gcpinv - inventory exporter for Google Cloud resources
//!
//! Two independent pipelines share the GCP client and the table/export code:
//!
//! - buckets: Cloud Storage buckets with creation date, ACL grantees and
//!   labels, written to a CSV file
//! - databases: Cloud SQL instances per region with their labels, written to
//!   an XLSX workbook with one sheet per region

pub mod config;
pub mod gcp;
pub mod inventory;

/// Version injected at compile time via GCPINV_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GCPINV_VERSION") {
    Some(v) => v,
    None => "dev",
};

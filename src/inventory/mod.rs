//! Resource inventory pipelines
//!
//! Each pipeline is a straight line: list, enrich every resource with
//! tolerant auxiliary calls, accumulate records, export once.
//!
//! # Architecture
//!
//! - [`fetch`] - Paginated listing of buckets and Cloud SQL instances
//! - [`outcome`] - Typed fetch outcomes and the per-pipeline recovery policy
//! - [`record`] / [`table`] - Sparse records reconciled into one table
//! - [`export`] - CSV and multi-sheet XLSX writers
//! - [`console`] - Progress and notices for the operator
//! - [`buckets`] / [`databases`] - The two pipelines

pub mod buckets;
pub mod console;
pub mod databases;
pub mod export;
pub mod fetch;
pub mod outcome;
pub mod record;
pub mod table;

/// Value written for a field that could not be determined
pub const PLACEHOLDER: &str = "-";

pub use buckets::{export_buckets, BucketOptions, CreationDateSource};
pub use console::{Console, RecordingConsole, TerminalConsole};
pub use databases::{export_databases, DatabaseOptions};
pub use record::{Cell, Record};
pub use table::Table;

//! GCP API interaction module
//!
//! This module provides the core functionality for interacting with Google Cloud Platform
//! APIs, including authentication, HTTP client, error classification and the
//! individual resource lookups used by the exporters.
//!
//! # Module Structure
//!
//! - [`auth`] - GCP authentication using Application Default Credentials
//! - [`client`] - Main GCP client for making API requests
//! - [`error`] - Typed API errors and their classification
//! - [`http`] - HTTP utilities for REST API calls
//! - [`projects`] - Project (account identity) lookup
//! - [`sql`] - Cloud SQL instance lookups
//! - [`storage`] - Cloud Storage bucket lookups

use serde_json::Value;
use std::collections::BTreeMap;

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod projects;
pub mod sql;
pub mod storage;

/// Labels (GCP's resource tags), ordered by key
pub type Labels = BTreeMap<String, String>;

/// Read a `{"key": "value"}` label object; anything else is an empty set
pub fn labels_from(value: Option<&Value>) -> Labels {
    value
        .and_then(|v| v.as_object())
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

//! Typed outcomes of enrichment calls and the policy that settles them
//!
//! Every auxiliary fetch is turned into a [`Fetched`] value. A
//! [`RecoveryPolicy`] then decides, per error kind, whether the field falls
//! back to its default silently, falls back with an operator notice, or
//! aborts the resource.

use crate::gcp::client::format_gcp_error;
use crate::gcp::error::{classify_error, ErrorKind};
use anyhow::Result;
use std::future::Future;

/// Result of one auxiliary fetch
#[derive(Debug)]
pub enum Fetched<T> {
    Found(T),
    Absent,
    Forbidden(anyhow::Error),
    Malformed(anyhow::Error),
    Fatal(anyhow::Error),
}

impl<T> Fetched<T> {
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Found(value),
            Err(error) => match classify_error(&error) {
                ErrorKind::Absence => Self::Absent,
                ErrorKind::Forbidden => Self::Forbidden(error),
                ErrorKind::Malformed => Self::Malformed(error),
                ErrorKind::Fatal => Self::Fatal(error),
            },
        }
    }
}

/// What to do with a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Use the default value, say nothing
    Silent,
    /// Use the default value and tell the operator
    Notify,
    /// Propagate the error
    Abort,
}

/// Recovery action per error kind. Fatal errors always abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub absence: Recovery,
    pub forbidden: Recovery,
    pub malformed: Recovery,
}

impl RecoveryPolicy {
    /// Bucket pipeline: uniform bucket-level access makes ACL reads fail with
    /// 400, which is reported but not fatal
    pub const BUCKETS: Self = Self {
        absence: Recovery::Silent,
        forbidden: Recovery::Notify,
        malformed: Recovery::Notify,
    };

    pub const DATABASES: Self = Self {
        absence: Recovery::Silent,
        forbidden: Recovery::Notify,
        malformed: Recovery::Abort,
    };

    pub fn action(&self, kind: ErrorKind) -> Recovery {
        match kind {
            ErrorKind::Absence => self.absence,
            ErrorKind::Forbidden => self.forbidden,
            ErrorKind::Malformed => self.malformed,
            ErrorKind::Fatal => Recovery::Abort,
        }
    }
}

/// Enrichment bookkeeping for one resource
///
/// Collects the fields that degraded to defaults so the operator gets one
/// notice per resource and error kind, however many fields were affected.
#[derive(Debug)]
pub struct Enrichment<'a> {
    policy: &'a RecoveryPolicy,
    noun: &'static str,
    resource: String,
    reported: Vec<(ErrorKind, &'static str)>,
}

impl<'a> Enrichment<'a> {
    pub fn new(policy: &'a RecoveryPolicy, noun: &'static str, resource: &str) -> Self {
        Self {
            policy,
            noun,
            resource: resource.to_string(),
            reported: Vec::new(),
        }
    }

    /// Run a fetch and settle its outcome
    pub async fn fetch<T, F>(&mut self, field: &'static str, fetch: F) -> Result<Option<T>>
    where
        F: Future<Output = Result<T>>,
    {
        self.settle(field, Fetched::from_result(fetch.await))
    }

    /// Apply the policy. `Ok(None)` means "use the default for this field".
    pub fn settle<T>(&mut self, field: &'static str, fetched: Fetched<T>) -> Result<Option<T>> {
        let (kind, error) = match fetched {
            Fetched::Found(value) => return Ok(Some(value)),
            Fetched::Absent => (ErrorKind::Absence, None),
            Fetched::Forbidden(e) => (ErrorKind::Forbidden, Some(e)),
            Fetched::Malformed(e) => (ErrorKind::Malformed, Some(e)),
            Fetched::Fatal(e) => (ErrorKind::Fatal, Some(e)),
        };

        match self.policy.action(kind) {
            Recovery::Silent => {
                tracing::debug!(
                    "{} of {} '{}' not present, using default",
                    field,
                    self.noun,
                    self.resource
                );
                Ok(None)
            },
            Recovery::Notify => {
                if let Some(error) = &error {
                    tracing::warn!(
                        "{} of {} '{}': {}",
                        field,
                        self.noun,
                        self.resource,
                        format_gcp_error(error)
                    );
                }
                self.reported.push((kind, field));
                Ok(None)
            },
            Recovery::Abort => Err(error.unwrap_or_else(|| {
                anyhow::anyhow!("{} of {} '{}' not found", field, self.noun, self.resource)
            })),
        }
    }

    /// Operator notices, at most one per error kind, in first-report order
    pub fn notices(&self) -> Vec<String> {
        let mut kinds: Vec<ErrorKind> = Vec::new();
        for (kind, _) in &self.reported {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }

        kinds
            .into_iter()
            .map(|kind| {
                let fields: Vec<&str> = self
                    .reported
                    .iter()
                    .filter(|(k, _)| *k == kind)
                    .map(|(_, field)| *field)
                    .collect();
                let cause = match kind {
                    ErrorKind::Forbidden => "insufficient permissions",
                    ErrorKind::Malformed => "a bad request",
                    ErrorKind::Absence => "missing data",
                    ErrorKind::Fatal => "an API error",
                };
                format!(
                    "Skipped {} for {} '{}' due to {}.",
                    fields.join(", "),
                    self.noun,
                    self.resource,
                    cause
                )
            })
            .collect()
    }
}

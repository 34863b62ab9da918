//! Core data models for the transit snapshot proxy
//!
//! This module holds the [`Snapshot`] value shared between the refresher and the
//! HTTP endpoint, and the [`SnapshotSource`] seam the refresher pulls from.

pub mod transit;

pub use transit::{FailureKind, FetchError, TransitClient, DEFAULT_FETCH_TIMEOUT, UPSTREAM_URL};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// The most recent successful upstream response and when it was captured
///
/// A snapshot is never mutated once built; the store swaps whole snapshots.
/// It serializes as `{"timestamp": ..., "data": ...}`, which is the body of the
/// timetables endpoint and of the on-disk mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the fetch that produced this payload completed
    #[serde(rename = "timestamp", serialize_with = "serialize_millis")]
    pub captured_at: DateTime<Utc>,
    /// The parsed upstream response body, passed through untouched
    #[serde(rename = "data")]
    pub payload: Value,
}

impl Snapshot {
    pub fn new(payload: Value, captured_at: DateTime<Utc>) -> Self {
        Self {
            captured_at,
            payload,
        }
    }
}

/// Formats timestamps as ISO 8601 UTC with millisecond precision, e.g.
/// `2024-07-15T05:30:00.123Z`
fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Anything the refresher can pull a fresh payload from
///
/// Implementations perform exactly one attempt per call. Retrying is left to
/// the next scheduled tick.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the latest payload, or the reason it could not be fetched
    async fn fetch_latest(&self) -> Result<Value, FetchError>;
}

#[async_trait]
impl<T: SnapshotSource + ?Sized> SnapshotSource for Arc<T> {
    async fn fetch_latest(&self) -> Result<Value, FetchError> {
        (**self).fetch_latest().await
    }
}

//! In-memory holder for the current snapshot
//!
//! Readers load an `Arc` to the current snapshot without locking; the refresher
//! publishes a new one with a single pointer swap.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::data::Snapshot;

/// Process-wide store for the latest good snapshot
///
/// Starts empty and only ever moves from empty to holding a snapshot, never
/// back. Payload and timestamp travel in one allocation, so a reader can never
/// pair the payload of one refresh with the timestamp of another.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a new snapshot, wholly replacing any previous one
    ///
    /// Returns the published snapshot so the caller can mirror it without
    /// re-reading the store.
    pub fn replace(&self, payload: Value, captured_at: DateTime<Utc>) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::new(payload, captured_at));
        self.current.store(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Returns the current snapshot, or `None` if no refresh has succeeded yet
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Whether at least one refresh has succeeded
    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }
}

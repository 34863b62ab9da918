//! Snapshot storage
//!
//! [`SnapshotStore`] is the in-memory, lock-free holder of the latest good
//! snapshot that request handlers read from. [`SnapshotMirror`] optionally
//! copies each new snapshot to a JSON file as a static fallback asset.

mod mirror;
mod store;

pub use mirror::{MirrorError, SnapshotMirror};
pub use store::SnapshotStore;

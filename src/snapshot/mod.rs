//! Tree snapshots: what a source directory looked like, how it is scanned,
//! and where the previous run's snapshot is kept.

mod relative_path;
mod scanner;
mod snapshot;
mod snapshot_store;

pub use relative_path::RelativePath;
pub use scanner::{ScanError, ScanOptions, TreeScanner};
pub use snapshot::Snapshot;
pub use snapshot_store::{SnapshotStore, SnapshotStoreError};

#[cfg(test)]
pub(crate) use snapshot::rel;

//! Durability: the write-ahead log and snapshots.
//!
//! Every committed transaction is appended to the WAL before its ops touch
//! the in-memory tables; a crash replays the log to restore a consistent
//! state. Snapshots dump the whole graph so the log can be truncated.

pub mod snapshot;
pub mod wal;

pub use snapshot::{SnapshotData, SnapshotManager, SnapshotMeta};
pub use wal::{DurabilityMode, WalConfig, WalManager, WalRecord};

/// Milliseconds since the Unix epoch, for record timestamps.
#[must_use]
pub fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

//! Atomic snapshots of the whole graph.
//!
//! Two files under `<data_dir>/snapshots/`: `snapshot.bin` holds every
//! live node and edge, `snapshot.meta` holds the last committed
//! transaction id at dump time. Both are written to temp names and renamed
//! as the last step. The two renames are not one atomic operation, so both
//! files carry the same `last_tx_id` stamp; `load` rejects a pair whose
//! stamps disagree (a crash landed between the renames) and reports "no
//! snapshot" instead of trusting torn state.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use quiver_common::types::TxId;
use quiver_common::{Error, Result};

use crate::graph::store::{Edge, GraphStore, Node};

const DATA_FILE: &str = "snapshot.bin";
const META_FILE: &str = "snapshot.meta";

/// Format version written into both files. Loading a file with a different
/// version reports an explicit mismatch instead of misreading it.
const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Serialized container of all live nodes and edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Format version, checked on load.
    pub version: u32,
    /// Generation stamp. Must equal the metadata file's `last_tx_id`;
    /// a mismatch means the pair is torn and must not be used.
    pub last_tx_id: TxId,
    /// Every live node, sorted by id for deterministic output.
    pub nodes: Vec<Node>,
    /// Every live edge, sorted by id for deterministic output.
    pub edges: Vec<Edge>,
}

/// Serialized snapshot metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Format version, checked on load.
    pub version: u32,
    /// Last committed transaction id at snapshot time.
    pub last_tx_id: TxId,
    /// Milliseconds since the Unix epoch at snapshot time.
    pub timestamp_ms: u64,
}

/// Creates and loads on-disk snapshots.
#[derive(Debug)]
pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    /// Creates a manager for the given snapshot directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the snapshot directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serializes the store's entire contents plus `last_tx_id`.
    ///
    /// Writes both files to temp names, fsyncs, then renames data before
    /// metadata - a crash at any point leaves either the previous snapshot
    /// pair or a complete new one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] on any serialization or file failure.
    pub fn create(&self, store: &GraphStore, last_tx_id: TxId) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::Snapshot(e.to_string()))?;

        let mut nodes = store.all_nodes();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges = store.all_edges();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        let data = SnapshotData {
            version: SNAPSHOT_FORMAT_VERSION,
            last_tx_id,
            nodes,
            edges,
        };
        let meta = SnapshotMeta {
            version: SNAPSHOT_FORMAT_VERSION,
            last_tx_id,
            timestamp_ms: super::timestamp_ms(),
        };

        let data_path = self.dir.join(DATA_FILE);
        let meta_path = self.dir.join(META_FILE);
        let data_tmp = data_path.with_extension("bin.tmp");
        let meta_tmp = meta_path.with_extension("meta.tmp");

        write_file(&data_tmp, &data)?;
        write_file(&meta_tmp, &meta)?;
        std::fs::rename(&data_tmp, &data_path).map_err(|e| Error::Snapshot(e.to_string()))?;
        std::fs::rename(&meta_tmp, &meta_path).map_err(|e| Error::Snapshot(e.to_string()))?;

        tracing::debug!(
            nodes = data.nodes.len(),
            edges = data.edges.len(),
            last_tx_id = last_tx_id.as_u64(),
            "snapshot created"
        );
        Ok(())
    }

    /// Loads the snapshot pair, or returns `None` when either file is
    /// absent or the pair is torn ("no snapshot").
    ///
    /// A pair whose generation stamps disagree was interrupted between
    /// the two renames; it is ignored rather than trusted, so recovery
    /// falls back to replaying whatever the WAL holds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Snapshot`] if a present file can't be read,
    /// decoded, or carries an unsupported format version.
    pub fn load(&self) -> Result<Option<(SnapshotData, SnapshotMeta)>> {
        let data_path = self.dir.join(DATA_FILE);
        let meta_path = self.dir.join(META_FILE);
        if !data_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let data: SnapshotData = read_file(&data_path)?;
        let meta: SnapshotMeta = read_file(&meta_path)?;

        if data.version != SNAPSHOT_FORMAT_VERSION || meta.version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (engine supports {})",
                data.version.max(meta.version),
                SNAPSHOT_FORMAT_VERSION
            )));
        }

        if data.last_tx_id != meta.last_tx_id {
            tracing::warn!(
                data_tx_id = data.last_tx_id.as_u64(),
                meta_tx_id = meta.last_tx_id.as_u64(),
                "ignoring torn snapshot pair"
            );
            return Ok(None);
        }

        Ok(Some((data, meta)))
    }
}

fn write_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| Error::Snapshot(format!("encode: {e}")))?;
    let io = |e: std::io::Error| Error::Snapshot(format!("{}: {e}", path.display()));
    let mut file = File::create(path).map_err(io)?;
    file.write_all(&bytes).map_err(io)?;
    file.sync_data().map_err(io)?;
    Ok(())
}

fn read_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let io = |e: std::io::Error| Error::Snapshot(format!("{}: {e}", path.display()));
    let mut bytes = Vec::new();
    File::open(path).map_err(io)?.read_to_end(&mut bytes).map_err(io)?;
    let (value, _) = bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
        .map_err(|e| Error::Snapshot(format!("decode {}: {e}", path.display())))?;
    Ok(value)
}

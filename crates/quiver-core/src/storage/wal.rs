//! The write-ahead log.
//!
//! An append-only file of length-prefixed records: a 4-byte big-endian
//! size, then that many bytes of a bincode-serialized [`WalRecord`]. The
//! commit coordinator is the sole writer and appends strictly in commit
//! order; replay reads from the beginning and stops cleanly at end of file
//! or at an incomplete trailing record, so partial writes never apply.
//!
//! | Durability mode | What it does | When to use |
//! | --------------- | ------------ | ----------- |
//! | [`Sync`](DurabilityMode::Sync) | fsync after every append | Can't lose any data |
//! | [`NoSync`](DurabilityMode::NoSync) | Let the OS decide | Testing, when speed matters most |

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use quiver_common::types::TxId;
use quiver_common::{Error, Result};

use crate::graph::Operation;

/// The WAL file name inside the wal directory.
const WAL_FILE: &str = "wal.log";

/// How aggressively appends are pushed to stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// fsync before `append` returns. An append that returned has been
    /// persisted.
    #[default]
    Sync,
    /// Skip the fsync; data reaches the OS page cache only.
    NoSync,
}

/// WAL configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalConfig {
    /// Durability mode for appends.
    pub durability: DurabilityMode,
}

/// One durable log record: a committed transaction's forward ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Commit-sequence id of the transaction.
    pub tx_id: TxId,
    /// Milliseconds since the Unix epoch at commit time.
    pub timestamp_ms: u64,
    /// Forward operations in build order.
    pub ops: Vec<Operation>,
}

/// Manages the append-only log file.
///
/// The file handle is process-lived: acquired when the manager opens and
/// released when it drops. Replay and truncation open their own scoped
/// handles.
#[derive(Debug)]
pub struct WalManager {
    path: PathBuf,
    file: Mutex<File>,
    config: WalConfig,
}

impl WalManager {
    /// Opens (or creates) the log at `<dir>/wal.log` with default config.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file can't be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(dir, WalConfig::default())
    }

    /// Opens (or creates) the log with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file can't be created.
    pub fn with_config(dir: impl AsRef<Path>, config: WalConfig) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(WAL_FILE);
        let file = Self::open_append(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
            config,
        })
    }

    fn open_append(path: &Path) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?)
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record and, in [`DurabilityMode::Sync`], flushes it to
    /// stable storage before returning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Durability`] if serialization, the write or the
    /// fsync fails; the commit must not be considered durable.
    pub fn append(&self, record: &WalRecord) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(record, bincode::config::standard())
            .map_err(|e| Error::Durability(format!("encode: {e}")))?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| Error::Durability(format!("record too large: {} bytes", bytes.len())))?;

        let mut file = self.file.lock();
        let io = |e: std::io::Error| Error::Durability(e.to_string());
        file.write_all(&len.to_be_bytes()).map_err(io)?;
        file.write_all(&bytes).map_err(io)?;
        file.flush().map_err(io)?;
        if self.config.durability == DurabilityMode::Sync {
            file.sync_data().map_err(io)?;
        }
        Ok(())
    }

    /// Flushes buffered data to stable storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Durability`] if the fsync fails.
    pub fn sync(&self) -> Result<()> {
        self.file
            .lock()
            .sync_data()
            .map_err(|e| Error::Durability(e.to_string()))
    }

    /// Reads the log from the beginning, invoking `callback` for each
    /// complete record. Returns the number of records seen.
    ///
    /// An incomplete trailing record (a short length prefix or a short
    /// body) terminates replay cleanly - partial writes never apply. A
    /// complete record that fails to decode is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptRecord`] for a malformed complete record,
    /// or propagates I/O and callback errors.
    pub fn replay(&self, mut callback: impl FnMut(WalRecord) -> Result<()>) -> Result<usize> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut offset: u64 = 0;
        let mut count = 0;

        loop {
            let mut len_buf = [0u8; 4];
            match read_exact_or_eof(&mut reader, &mut len_buf) {
                ReadOutcome::Full => {}
                ReadOutcome::Eof => break,
                ReadOutcome::Partial => {
                    tracing::debug!(offset, "ignoring truncated WAL length prefix");
                    break;
                }
                ReadOutcome::Err(e) => return Err(e.into()),
            }
            let len = u32::from_be_bytes(len_buf) as usize;

            let mut body = vec![0u8; len];
            match read_exact_or_eof(&mut reader, &mut body) {
                ReadOutcome::Full => {}
                ReadOutcome::Eof | ReadOutcome::Partial => {
                    tracing::debug!(offset, len, "ignoring truncated WAL record body");
                    break;
                }
                ReadOutcome::Err(e) => return Err(e.into()),
            }

            let (record, _): (WalRecord, usize) =
                bincode::serde::decode_from_slice(&body, bincode::config::standard()).map_err(
                    |e| Error::CorruptRecord {
                        offset,
                        reason: e.to_string(),
                    },
                )?;
            callback(record)?;
            count += 1;
            offset += 4 + len as u64;
        }

        Ok(count)
    }

    /// Reads every complete record into a vector, in log order.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`replay`](Self::replay).
    pub fn read_all(&self) -> Result<Vec<WalRecord>> {
        let mut records = Vec::new();
        self.replay(|record| {
            records.push(record);
            Ok(())
        })?;
        Ok(records)
    }

    /// Removes every record whose `tx_id` is less than or equal to
    /// `up_to`, preserving the rest in order. Called after a snapshot.
    ///
    /// The surviving records are written to a temp file which is renamed
    /// over the log, then the append handle is reopened.
    ///
    /// # Errors
    ///
    /// Returns an error on read, write or rename failure.
    pub fn truncate(&self, up_to: TxId) -> Result<()> {
        let keep: Vec<WalRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| r.tx_id > up_to)
            .collect();

        let tmp_path = self.path.with_extension("log.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for record in &keep {
                let bytes = bincode::serde::encode_to_vec(record, bincode::config::standard())
                    .map_err(|e| Error::Durability(format!("encode: {e}")))?;
                let len = u32::try_from(bytes.len())
                    .map_err(|_| Error::Durability("record too large".to_string()))?;
                tmp.write_all(&len.to_be_bytes())?;
                tmp.write_all(&bytes)?;
            }
            tmp.sync_data()?;
        }

        let mut file = self.file.lock();
        std::fs::rename(&tmp_path, &self.path)?;
        *file = Self::open_append(&self.path)?;
        tracing::debug!(up_to = up_to.as_u64(), kept = keep.len(), "truncated WAL");
        Ok(())
    }

    /// Empties the log. Test and administrative use.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be truncated.
    pub fn reset(&self) -> Result<()> {
        let file = self.file.lock();
        file.set_len(0)?;
        file.sync_data()?;
        Ok(())
    }

    /// Returns the log file's current length in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata can't be read.
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.lock().metadata()?.len())
    }

    /// Returns `true` if the log holds no bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata can't be read.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

enum ReadOutcome {
    Full,
    Eof,
    Partial,
    Err(std::io::Error),
}

/// Fills `buf` completely, distinguishing a clean EOF (zero bytes read)
/// from a partial tail (some bytes read, then EOF).
fn read_exact_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> ReadOutcome {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return if filled == 0 {
                    ReadOutcome::Eof
                } else {
                    ReadOutcome::Partial
                };
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return ReadOutcome::Err(e),
        }
    }
    ReadOutcome::Full
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Operation};
    use quiver_common::types::NodeId;
    use std::collections::{BTreeMap, BTreeSet};
    use tempfile::tempdir;

    fn record(tx: u64) -> WalRecord {
        WalRecord {
            tx_id: TxId::new(tx),
            timestamp_ms: 1_700_000_000_000 + tx,
            ops: vec![Operation::PutNode(Node {
                id: NodeId::new(format!("node-{tx}")),
                labels: BTreeSet::new(),
                properties: BTreeMap::new(),
            })],
        }
    }

    #[test]
    fn test_append_then_read_all_roundtrip() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();

        for tx in 1..=3 {
            wal.append(&record(tx)).unwrap();
        }

        let records = wal.read_all().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], record(1));
        assert_eq!(records[1], record(2));
        assert_eq!(records[2], record(3));
    }

    #[test]
    fn test_replay_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let wal = WalManager::open(dir.path()).unwrap();
            wal.append(&record(1)).unwrap();
            wal.append(&record(2)).unwrap();
        }
        let wal = WalManager::open(dir.path()).unwrap();
        let records = wal.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tx_id, TxId::new(1));
        assert_eq!(records[1].tx_id, TxId::new(2));
    }

    #[test]
    fn test_replay_ignores_truncated_tail() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();
        wal.append(&record(1)).unwrap();
        wal.append(&record(2)).unwrap();
        wal.append(&record(3)).unwrap();

        // Chop the last 3 bytes off the file.
        let len = wal.len().unwrap();
        let file = OpenOptions::new()
            .write(true)
            .open(wal.path())
            .unwrap();
        file.set_len(len - 3).unwrap();

        let records = wal.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tx_id, TxId::new(1));
        assert_eq!(records[1].tx_id, TxId::new(2));
    }

    #[test]
    fn test_replay_rejects_corrupt_complete_record() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();

        // A complete frame whose body is garbage.
        let garbage = [0xFFu8; 16];
        {
            let mut file = OpenOptions::new().append(true).open(wal.path()).unwrap();
            file.write_all(&(garbage.len() as u32).to_be_bytes()).unwrap();
            file.write_all(&garbage).unwrap();
        }

        let err = wal.read_all().unwrap_err();
        assert!(matches!(err, Error::CorruptRecord { offset: 0, .. }));
    }

    #[test]
    fn test_truncate_drops_up_to_and_preserves_rest() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();
        for tx in 1..=5 {
            wal.append(&record(tx)).unwrap();
        }

        wal.truncate(TxId::new(3)).unwrap();

        let records = wal.read_all().unwrap();
        let ids: Vec<u64> = records.iter().map(|r| r.tx_id.as_u64()).collect();
        assert_eq!(ids, vec![4, 5]);

        // The handle still appends after truncation.
        wal.append(&record(6)).unwrap();
        assert_eq!(wal.read_all().unwrap().len(), 3);
    }

    #[test]
    fn test_truncate_everything_leaves_empty_file() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();
        wal.append(&record(1)).unwrap();
        wal.truncate(TxId::new(1)).unwrap();
        assert!(wal.is_empty().unwrap());
    }

    #[test]
    fn test_reset() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();
        wal.append(&record(1)).unwrap();
        assert!(!wal.is_empty().unwrap());
        wal.reset().unwrap();
        assert!(wal.is_empty().unwrap());
        assert!(wal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_empty_log_replays_cleanly() {
        let dir = tempdir().unwrap();
        let wal = WalManager::open(dir.path()).unwrap();
        assert_eq!(wal.replay(|_| Ok(())).unwrap(), 0);
    }

    #[test]
    fn test_nosync_mode_appends() {
        let dir = tempdir().unwrap();
        let wal = WalManager::with_config(
            dir.path(),
            WalConfig {
                durability: DurabilityMode::NoSync,
            },
        )
        .unwrap();
        wal.append(&record(1)).unwrap();
        assert_eq!(wal.read_all().unwrap().len(), 1);
    }
}

//! Write-ahead log records for the journaled counter store.
//!
//! Each record is one line: the CRC32 of the JSON body in hex, a tab, and the
//! JSON body itself.
//!
//! ```text
//! 9a3c01f2\t{"seq":7,"op":{"IncrementBy":{"namespace":"default",...}}}
//! ```
//!
//! A line whose checksum does not match, or which is missing its newline, is
//! treated as a torn write.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::StorageError;

pub const WAL_FILE: &str = "counters.wal";
pub const SNAPSHOT_FILE: &str = "counters.snapshot.json";

pub type SeqNumber = u64;

/// A single counter mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CounterOp {
    EnsureDefault {
        namespace: String,
        key: String,
        field: String,
        default: u64,
    },
    IncrementBy {
        namespace: String,
        key: String,
        field: String,
        delta: u64,
    },
    SetParam {
        namespace: String,
        key: String,
        field: String,
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    pub seq: SeqNumber,
    pub op: CounterOp,
}

impl WalRecord {
    pub fn new(seq: SeqNumber, op: CounterOp) -> Self {
        WalRecord { seq, op }
    }

    /// Encode the record as a checksummed line, newline included.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(self)?;
        let crc = crc32fast::hash(&body);

        let mut line = format!("{crc:08x}\t").into_bytes();
        line.extend_from_slice(&body);
        line.push(b'\n');
        Ok(line)
    }

    /// Decode one line without its trailing newline.
    pub fn decode(line: &[u8]) -> std::result::Result<Self, StorageError> {
        let tab = line
            .iter()
            .position(|&b| b == b'\t')
            .ok_or_else(|| StorageError::Corrupted("missing checksum separator".to_string()))?;
        let (crc_hex, body) = (&line[..tab], &line[tab + 1..]);

        let expected = std::str::from_utf8(crc_hex)
            .ok()
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .ok_or_else(|| StorageError::Corrupted("unreadable checksum".to_string()))?;
        let actual = crc32fast::hash(body);
        if actual != expected {
            return Err(StorageError::Corrupted(format!(
                "checksum mismatch: expected {expected:08x}, found {actual:08x}"
            )));
        }

        serde_json::from_slice(body).map_err(|e| StorageError::Corrupted(e.to_string()))
    }
}

/// The records that could be read back from a WAL buffer.
#[derive(Debug, Default)]
pub struct WalReadout {
    pub records: Vec<WalRecord>,
    /// Bytes after the last intact record, if any were discarded.
    pub discarded_bytes: usize,
    /// Why reading stopped early.
    pub error: Option<StorageError>,
}

/// Parse every intact record from the start of `buffer`, stopping at the
/// first torn or corrupt line.
pub fn read_records(buffer: &[u8]) -> WalReadout {
    let mut readout = WalReadout::default();
    let mut offset = 0;

    while offset < buffer.len() {
        let rest = &buffer[offset..];
        let Some(end) = rest.iter().position(|&b| b == b'\n') else {
            readout.error = Some(StorageError::Corrupted(
                "record is missing its terminator".to_string(),
            ));
            break;
        };

        let line = &rest[..end];
        if !line.is_empty() {
            match WalRecord::decode(line) {
                Ok(record) => readout.records.push(record),
                Err(e) => {
                    readout.error = Some(e);
                    break;
                }
            }
        }
        offset += end + 1;
    }

    readout.discarded_bytes = buffer.len() - offset;
    readout
}

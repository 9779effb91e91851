//! A persistent counter store: in-memory tables plus a write-ahead log and
//! periodic snapshots kept in a [`Storage`] backend.
//!
//! Every effective mutation is appended to [`WAL_FILE`] before it is applied
//! in memory. The tables write lock is held across both steps, so the log
//! order is the apply order. When more than `compaction_threshold` records
//! have accumulated, the tables are written to [`SNAPSHOT_FILE`] and the log
//! is truncated.
//!
//! On open the snapshot is loaded and log records newer than the snapshot are
//! replayed. A torn tail record (a crash in the middle of an append) ends
//! replay; the store then compacts immediately so new records are never
//! appended behind garbage. A training call interrupted this way may be
//! retried by the caller, which can count it twice.
//!
//! A failed append while running is handled the same way: the writer may
//! have left part of a line in the log, so the next mutation compacts
//! before it appends anything.
//!
//! Every failure of the underlying [`Storage`] is reported as
//! [`FalxError::Storage`].

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::counter_store::CounterStore;
use crate::counter_store::memory::{CounterTables, NamespaceSnapshot};
use crate::counter_store::wal::{
    CounterOp, SNAPSHOT_FILE, SeqNumber, WAL_FILE, WalRecord, read_records,
};
use crate::error::{FalxError, Result};
use crate::storage::{Storage, StorageError, StorageOutput, read_all, write_atomic};

/// Journal tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Compact once more than this many records are in the log.
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: usize,

    /// Fsync the log after every record instead of only flushing it.
    #[serde(default)]
    pub sync_writes: bool,
}

fn default_compaction_threshold() -> usize {
    1024
}

impl Default for JournalConfig {
    fn default() -> Self {
        JournalConfig {
            compaction_threshold: default_compaction_threshold(),
            sync_writes: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CountersSnapshot {
    #[serde(default)]
    last_wal_seq: SeqNumber,
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceSnapshot>,
}

#[derive(Debug)]
struct Journal {
    writer: Option<Box<dyn StorageOutput>>,
    last_seq: SeqNumber,
    records: usize,
    /// The log may end in a partial line and must be rewritten.
    needs_repair: bool,
}

/// A [`CounterStore`] that survives restarts.
#[derive(Debug)]
pub struct JournaledCounterStore {
    storage: Arc<dyn Storage>,
    config: JournalConfig,
    tables: RwLock<CounterTables>,
    journal: Mutex<Journal>,
}

impl JournaledCounterStore {
    /// Open the store, recovering any state already in `storage`.
    pub fn open(storage: Arc<dyn Storage>, config: JournalConfig) -> Result<Self> {
        Self::recover(storage, config).map_err(unavailable)
    }

    fn recover(storage: Arc<dyn Storage>, config: JournalConfig) -> Result<Self> {
        let mut snapshot = CountersSnapshot::default();
        if storage.file_exists(SNAPSHOT_FILE) {
            let buffer = read_all(storage.as_ref(), SNAPSHOT_FILE)?;
            if !buffer.is_empty() {
                snapshot = serde_json::from_slice(&buffer).map_err(|e| {
                    StorageError::Corrupted(format!("{SNAPSHOT_FILE}: {e}"))
                })?;
            }
        }

        let snapshot_seq = snapshot.last_wal_seq;
        let mut tables = CounterTables::from_snapshot(snapshot.namespaces);
        let mut last_seq = snapshot_seq;
        let mut records = 0;
        let mut torn = false;

        if storage.file_exists(WAL_FILE) {
            let buffer = read_all(storage.as_ref(), WAL_FILE)?;
            let readout = read_records(&buffer);

            for record in readout.records {
                if record.seq <= last_seq {
                    continue;
                }
                tables.apply(&record.op);
                last_seq = record.seq;
                records += 1;
            }

            if let Some(error) = readout.error {
                warn!(
                    "Discarding {} bytes after record {last_seq} in {WAL_FILE}: {error}",
                    readout.discarded_bytes
                );
                torn = true;
            }
        }

        let store = JournaledCounterStore {
            storage,
            config,
            tables: RwLock::new(tables),
            journal: Mutex::new(Journal {
                writer: None,
                last_seq,
                records,
                needs_repair: false,
            }),
        };

        {
            let tables = store.tables.read();
            let mut journal = store.journal.lock();
            if torn {
                store.compact_locked(&tables, &mut journal)?;
            } else {
                journal.writer = Some(store.storage.create_output_append(WAL_FILE)?);
            }
        }

        info!(
            "Opened counter store: snapshot seq {snapshot_seq}, {records} records replayed, last seq {last_seq}"
        );
        Ok(store)
    }

    /// Open a store in `storage` with the default journal configuration.
    pub fn open_default(storage: Arc<dyn Storage>) -> Result<Self> {
        Self::open(storage, JournalConfig::default())
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Sequence number of the last journaled mutation.
    pub fn last_seq(&self) -> SeqNumber {
        self.journal.lock().last_seq
    }

    /// Number of records in the log since the last snapshot.
    pub fn wal_records(&self) -> usize {
        self.journal.lock().records
    }

    /// Write a snapshot and truncate the log.
    pub fn compact(&self) -> Result<()> {
        let tables = self.tables.read();
        let mut journal = self.journal.lock();
        self.compact_locked(&tables, &mut journal).map_err(unavailable)
    }

    /// Whether the log must be rewritten before the next append.
    pub fn needs_repair(&self) -> bool {
        self.journal.lock().needs_repair
    }

    fn compact_locked(&self, tables: &CounterTables, journal: &mut Journal) -> Result<()> {
        // Cleared only once the log is truncated and reopened.
        journal.needs_repair = true;

        let snapshot = CountersSnapshot {
            last_wal_seq: journal.last_seq,
            namespaces: tables.snapshot(),
        };
        let serialized = serde_json::to_vec(&snapshot)?;
        write_atomic(self.storage.as_ref(), SNAPSHOT_FILE, &serialized)?;

        if let Some(mut writer) = journal.writer.take() {
            writer.close()?;
        }
        let mut truncated = self.storage.create_output(WAL_FILE)?;
        truncated.flush_and_sync()?;
        truncated.close()?;
        self.storage.sync()?;

        journal.writer = Some(self.storage.create_output_append(WAL_FILE)?);
        journal.records = 0;
        journal.needs_repair = false;

        info!(
            "Compacted counter store at seq {} ({} hashes, {} bytes)",
            journal.last_seq,
            tables.hash_count(),
            serialized.len()
        );
        Ok(())
    }

    fn append(&self, journal: &mut Journal, op: &CounterOp) -> Result<()> {
        let record = WalRecord::new(journal.last_seq + 1, op.clone());
        let line = record.encode()?;

        if journal.writer.is_none() {
            let writer = self
                .storage
                .create_output_append(WAL_FILE)
                .map_err(unavailable)?;
            journal.writer = Some(writer);
        }
        let written = match journal.writer.as_mut() {
            Some(writer) => write_line(writer.as_mut(), &line, self.config.sync_writes),
            None => Err(FalxError::storage("WAL writer is not open")),
        };

        if let Err(e) = written {
            if let Some(mut writer) = journal.writer.take() {
                let _ = writer.close();
            }
            journal.needs_repair = true;
            warn!("WAL append of seq {} failed: {e}", record.seq);
            return Err(FalxError::storage(format!("WAL append failed: {e}")));
        }

        journal.last_seq = record.seq;
        journal.records += 1;
        Ok(())
    }

    /// Journal and apply `op` if it changes anything.
    fn mutate(&self, op: CounterOp) -> Result<Option<u64>> {
        let mut tables = self.tables.write();
        if !tables.is_effective(&op) {
            return Ok(match &op {
                CounterOp::EnsureDefault { .. } | CounterOp::SetParam { .. } => None,
                CounterOp::IncrementBy {
                    namespace,
                    key,
                    field,
                    ..
                } => tables.get(namespace, key, field),
            });
        }

        let mut journal = self.journal.lock();
        if journal.needs_repair {
            info!("Rewriting {WAL_FILE} after a failed append");
            self.compact_locked(&tables, &mut journal).map_err(unavailable)?;
        }
        self.append(&mut journal, &op)?;
        let value = tables.apply(&op);

        if journal.records > self.config.compaction_threshold {
            if let Err(e) = self.compact_locked(&tables, &mut journal) {
                warn!("Compaction failed, the log keeps growing: {e}");
            }
        } else {
            debug!("Journaled seq {}", journal.last_seq);
        }

        Ok(value)
    }
}

/// Report any failure of the underlying storage as a storage error.
fn unavailable(error: FalxError) -> FalxError {
    match error {
        FalxError::Io(e) => StorageError::IoError(e.to_string()).into(),
        FalxError::Json(e) => StorageError::Corrupted(e.to_string()).into(),
        other => other,
    }
}

fn write_line(writer: &mut dyn StorageOutput, line: &[u8], sync: bool) -> Result<()> {
    writer.write_all(line)?;
    if sync {
        writer.flush_and_sync()
    } else {
        writer.flush().map_err(FalxError::from)
    }
}

impl CounterStore for JournaledCounterStore {
    fn ensure_default(&self, namespace: &str, key: &str, field: &str, default: u64) -> Result<()> {
        self.mutate(CounterOp::EnsureDefault {
            namespace: namespace.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            default,
        })?;
        Ok(())
    }

    fn increment_by(
        &self,
        namespace: &str,
        key: &str,
        field: &str,
        delta: u64,
    ) -> Result<Option<u64>> {
        self.mutate(CounterOp::IncrementBy {
            namespace: namespace.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            delta,
        })
    }

    fn get(&self, namespace: &str, key: &str, field: &str) -> Result<Option<u64>> {
        Ok(self.tables.read().get(namespace, key, field))
    }

    fn keys(&self, namespace: &str, key: &str) -> Result<Vec<String>> {
        Ok(self.tables.read().keys(namespace, key))
    }

    fn exists(&self, namespace: &str, key: &str) -> Result<bool> {
        Ok(self.tables.read().exists(namespace, key))
    }

    fn entries(&self, namespace: &str, key: &str) -> Result<Vec<(String, u64)>> {
        Ok(self.tables.read().entries(namespace, key))
    }

    fn set_param(&self, namespace: &str, key: &str, field: &str, value: f64) -> Result<()> {
        self.mutate(CounterOp::SetParam {
            namespace: namespace.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            value,
        })?;
        Ok(())
    }

    fn get_param(&self, namespace: &str, key: &str, field: &str) -> Result<Option<f64>> {
        Ok(self.tables.read().get_param(namespace, key, field))
    }

    fn sync(&self) -> Result<()> {
        let mut journal = self.journal.lock();
        if let Some(writer) = journal.writer.as_mut() {
            writer.flush_and_sync().map_err(unavailable)?;
        }
        self.storage.sync().map_err(unavailable)
    }
}

impl Drop for JournaledCounterStore {
    fn drop(&mut self) {
        if let Some(mut writer) = self.journal.get_mut().writer.take() {
            let _ = writer.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::storage::StorageInput;
    use crate::storage::memory::MemoryStorage;

    /// Memory storage whose log writer can be told to fail its next write
    /// halfway through, or its next sync.
    #[derive(Debug, Clone, Default)]
    struct FailingStorage {
        inner: MemoryStorage,
        fail_write: Arc<AtomicBool>,
        fail_sync: Arc<AtomicBool>,
    }

    #[derive(Debug)]
    struct FailingOutput {
        inner: Box<dyn StorageOutput>,
        fail_write: Arc<AtomicBool>,
        fail_sync: Arc<AtomicBool>,
    }

    impl Write for FailingOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.fail_write.swap(false, Ordering::SeqCst) {
                self.inner.write_all(&buf[..buf.len() / 2])?;
                self.inner.flush()?;
                return Err(std::io::Error::other("disk full"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.inner.flush()
        }
    }

    impl StorageOutput for FailingOutput {
        fn flush_and_sync(&mut self) -> Result<()> {
            if self.fail_sync.swap(false, Ordering::SeqCst) {
                return Err(std::io::Error::other("device removed").into());
            }
            self.inner.flush_and_sync()
        }

        fn close(&mut self) -> Result<()> {
            self.inner.close()
        }
    }

    impl Storage for FailingStorage {
        fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
            self.inner.open_input(name)
        }

        fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
            self.inner.create_output(name)
        }

        fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
            Ok(Box::new(FailingOutput {
                inner: self.inner.create_output_append(name)?,
                fail_write: Arc::clone(&self.fail_write),
                fail_sync: Arc::clone(&self.fail_sync),
            }))
        }

        fn file_exists(&self, name: &str) -> bool {
            self.inner.file_exists(name)
        }

        fn delete_file(&self, name: &str) -> Result<()> {
            self.inner.delete_file(name)
        }

        fn list_files(&self) -> Result<Vec<String>> {
            self.inner.list_files()
        }

        fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
            self.inner.rename_file(old_name, new_name)
        }

        fn sync(&self) -> Result<()> {
            self.inner.sync()
        }
    }

    fn storage() -> (MemoryStorage, Arc<dyn Storage>) {
        let memory = MemoryStorage::default();
        let shared: Arc<dyn Storage> = Arc::new(memory.clone());
        (memory, shared)
    }

    fn small_config() -> JournalConfig {
        JournalConfig {
            compaction_threshold: 4,
            sync_writes: false,
        }
    }

    #[test]
    fn test_counts_survive_reopen() {
        let (_memory, storage) = storage();
        {
            let store = JournaledCounterStore::open_default(Arc::clone(&storage)).unwrap();
            store.ensure_default("ns", "category", "good", 0).unwrap();
            store.increment_by("ns", "category", "good", 1).unwrap();
            store.increment_by("ns", "category", "good", 1).unwrap();
            store.set_param("ns", "thresholds", "bad", 3.0).unwrap();
            assert_eq!(store.last_seq(), 4);
        }

        let store = JournaledCounterStore::open_default(storage).unwrap();
        assert_eq!(store.get("ns", "category", "good").unwrap(), Some(2));
        assert_eq!(store.get_param("ns", "thresholds", "bad").unwrap(), Some(3.0));
        assert_eq!(store.last_seq(), 4);
    }

    #[test]
    fn test_noop_mutations_are_not_journaled() {
        let (_memory, storage) = storage();
        let store = JournaledCounterStore::open_default(storage).unwrap();

        assert_eq!(store.increment_by("ns", "category", "good", 1).unwrap(), None);
        store.ensure_default("ns", "category", "good", 0).unwrap();
        store.ensure_default("ns", "category", "good", 0).unwrap();
        store.set_param("ns", "minimums", "good", 0.5).unwrap();
        store.set_param("ns", "minimums", "good", 0.5).unwrap();

        assert_eq!(store.wal_records(), 2);
    }

    #[test]
    fn test_compaction_truncates_log() {
        let (memory, storage) = storage();
        {
            let store = JournaledCounterStore::open(Arc::clone(&storage), small_config()).unwrap();
            store.ensure_default("ns", "category", "good", 0).unwrap();
            for _ in 0..10 {
                store.increment_by("ns", "category", "good", 1).unwrap();
            }
            assert!(store.wal_records() <= 4);
            assert!(memory.file_exists(SNAPSHOT_FILE));
        }

        let store = JournaledCounterStore::open(storage, small_config()).unwrap();
        assert_eq!(store.get("ns", "category", "good").unwrap(), Some(10));
        assert_eq!(store.last_seq(), 11);
    }

    #[test]
    fn test_explicit_compact_empties_log() {
        let (memory, storage) = storage();
        let store = JournaledCounterStore::open_default(storage).unwrap();
        store.ensure_default("ns", "category", "good", 0).unwrap();

        store.compact().unwrap();
        assert_eq!(store.wal_records(), 0);
        assert_eq!(read_all(&memory, WAL_FILE).unwrap(), b"");

        store.increment_by("ns", "category", "good", 1).unwrap();
        assert_eq!(store.wal_records(), 1);
    }

    #[test]
    fn test_records_older_than_snapshot_are_skipped() {
        let (memory, storage) = storage();
        let wal_before_compaction;
        {
            let store = JournaledCounterStore::open_default(Arc::clone(&storage)).unwrap();
            store.ensure_default("ns", "category", "good", 0).unwrap();
            store.increment_by("ns", "category", "good", 1).unwrap();
            wal_before_compaction = read_all(&memory, WAL_FILE).unwrap();
            store.compact().unwrap();
        }

        // Crash between snapshot write and log truncation.
        memory.put_raw(WAL_FILE, wal_before_compaction);

        let store = JournaledCounterStore::open_default(storage).unwrap();
        assert_eq!(store.get("ns", "category", "good").unwrap(), Some(1));
    }

    #[test]
    fn test_torn_tail_is_discarded_and_log_repaired() {
        let (memory, storage) = storage();
        {
            let store = JournaledCounterStore::open_default(Arc::clone(&storage)).unwrap();
            store.ensure_default("ns", "category", "good", 0).unwrap();
            store.increment_by("ns", "category", "good", 1).unwrap();
        }

        let mut wal = read_all(&memory, WAL_FILE).unwrap();
        let torn = WalRecord::new(
            3,
            CounterOp::IncrementBy {
                namespace: "ns".to_string(),
                key: "category".to_string(),
                field: "good".to_string(),
                delta: 1,
            },
        )
        .encode()
        .unwrap();
        wal.extend_from_slice(&torn[..torn.len() - 7]);
        memory.put_raw(WAL_FILE, wal);

        {
            let store = JournaledCounterStore::open_default(Arc::clone(&storage)).unwrap();
            assert_eq!(store.get("ns", "category", "good").unwrap(), Some(1));
            assert_eq!(store.wal_records(), 0);

            store.increment_by("ns", "category", "good", 1).unwrap();
        }

        let store = JournaledCounterStore::open_default(storage).unwrap();
        assert_eq!(store.get("ns", "category", "good").unwrap(), Some(2));
    }

    #[test]
    fn test_failed_append_does_not_hide_later_records() {
        let failing = FailingStorage::default();
        let storage: Arc<dyn Storage> = Arc::new(failing.clone());
        {
            let store = JournaledCounterStore::open_default(Arc::clone(&storage)).unwrap();
            store.ensure_default("ns", "category", "good", 0).unwrap();
            store.increment_by("ns", "category", "good", 1).unwrap();

            failing.fail_write.store(true, Ordering::SeqCst);
            let err = store.increment_by("ns", "category", "good", 1).unwrap_err();
            assert!(matches!(err, FalxError::Storage(_)));
            assert!(store.needs_repair());
            assert_eq!(store.get("ns", "category", "good").unwrap(), Some(1));

            store.increment_by("ns", "category", "good", 1).unwrap();
            store.increment_by("ns", "category", "good", 1).unwrap();
            assert!(!store.needs_repair());
            assert_eq!(store.get("ns", "category", "good").unwrap(), Some(3));
        }

        let store = JournaledCounterStore::open_default(storage).unwrap();
        assert_eq!(store.get("ns", "category", "good").unwrap(), Some(3));
        assert_eq!(store.last_seq(), 4);
    }

    #[test]
    fn test_failed_sync_is_a_storage_error() {
        let failing = FailingStorage::default();
        let store = JournaledCounterStore::open_default(Arc::new(failing.clone())).unwrap();
        store.ensure_default("ns", "category", "good", 0).unwrap();

        failing.fail_sync.store(true, Ordering::SeqCst);
        let err = store.sync().unwrap_err();
        assert!(matches!(err, FalxError::Storage(_)));
        assert!(err.is_recoverable());

        store.sync().unwrap();
    }

    #[test]
    fn test_failed_synced_append_is_a_storage_error() {
        let failing = FailingStorage::default();
        let config = JournalConfig {
            compaction_threshold: 1024,
            sync_writes: true,
        };
        let store = JournaledCounterStore::open(Arc::new(failing.clone()), config).unwrap();

        failing.fail_sync.store(true, Ordering::SeqCst);
        let err = store.ensure_default("ns", "category", "good", 0).unwrap_err();
        assert!(matches!(err, FalxError::Storage(_)));

        store.ensure_default("ns", "category", "good", 0).unwrap();
        assert_eq!(store.get("ns", "category", "good").unwrap(), Some(0));
    }

    #[test]
    fn test_corrupt_snapshot_fails_open() {
        let (memory, storage) = storage();
        memory.put_raw(SNAPSHOT_FILE, b"{not json".to_vec());

        let err = JournaledCounterStore::open_default(storage).unwrap_err();
        assert!(matches!(err, FalxError::Storage(_)));
    }
}

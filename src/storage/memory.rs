//! In-memory storage implementation for testing and caching.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::{Storage, StorageError, StorageInput, StorageOutput};

type FileMap = Arc<Mutex<AHashMap<String, Vec<u8>>>>;

/// Configuration for [`MemoryStorage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageConfig {
    /// Initial capacity of the file table.
    pub initial_capacity: usize,
}

/// An in-memory storage implementation.
///
/// Outputs append their pending bytes to the stored file on every flush, so
/// data written through a long-lived appending output is visible to readers
/// as soon as it is flushed, as it would be on disk.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    files: FileMap,
}

impl MemoryStorage {
    /// Create a new memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            files: Arc::new(Mutex::new(AHashMap::with_capacity(
                config.initial_capacity,
            ))),
        }
    }

    /// Get the number of files stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Get the total size of all files.
    pub fn total_size(&self) -> u64 {
        self.files
            .lock()
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Overwrite a file's raw bytes, bypassing outputs. Used to simulate
    /// torn writes and corruption.
    pub fn put_raw(&self, name: &str, data: Vec<u8>) {
        self.files.lock().insert(name.to_string(), data);
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(MemoryStorageConfig::default())
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;

        Ok(Box::new(MemoryInput::new(data.clone())))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.files.lock().insert(name.to_string(), Vec::new());
        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            Arc::clone(&self.files),
        )))
    }

    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.files.lock().entry(name.to_string()).or_default();
        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            Arc::clone(&self.files),
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut file_names: Vec<String> = self.files.lock().keys().cloned().collect();
        file_names.sort();
        Ok(file_names)
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;

        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

/// A memory-based input implementation.
#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Vec<u8>>,
    size: u64,
}

impl MemoryInput {
    fn new(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        MemoryInput {
            cursor: Cursor::new(data),
            size,
        }
    }
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A memory-based output implementation.
///
/// Only bytes written since the last flush are buffered.
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    pending: Vec<u8>,
    files: FileMap,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: String, files: FileMap) -> Self {
        MemoryOutput {
            name,
            pending: Vec::new(),
            files,
            closed: false,
        }
    }

    fn publish(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.files
            .lock()
            .entry(self.name.clone())
            .or_default()
            .append(&mut self.pending);
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }

        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.closed {
            self.publish();
        }
        Ok(())
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.publish();
            self.closed = true;
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::read_all;

    #[test]
    fn test_create_and_read_file() {
        let storage = MemoryStorage::default();

        let mut output = storage.create_output("test.txt").unwrap();
        output.write_all(b"Hello, Memory!").unwrap();
        output.close().unwrap();

        let mut input = storage.open_input("test.txt").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();

        assert_eq!(buffer, b"Hello, Memory!");
        assert_eq!(input.size().unwrap(), 14);
        assert_eq!(storage.file_count(), 1);
        assert_eq!(storage.total_size(), 14);
    }

    #[test]
    fn test_flush_publishes_appended_data() {
        let storage = MemoryStorage::default();

        let mut output = storage.create_output_append("log").unwrap();
        output.write_all(b"one\n").unwrap();
        output.flush().unwrap();

        let mut input = storage.open_input("log").unwrap();
        let mut buffer = String::new();
        input.read_to_string(&mut buffer).unwrap();
        assert_eq!(buffer, "one\n");

        output.write_all(b"two\n").unwrap();
        output.close().unwrap();

        let mut appender = storage.create_output_append("log").unwrap();
        appender.write_all(b"three\n").unwrap();
        appender.close().unwrap();

        let mut input = storage.open_input("log").unwrap();
        let mut buffer = String::new();
        input.read_to_string(&mut buffer).unwrap();
        assert_eq!(buffer, "one\ntwo\nthree\n");
    }

    #[test]
    fn test_flush_appends_only_pending_bytes() {
        let storage = MemoryStorage::default();

        let mut output = storage.create_output_append("log").unwrap();
        output.write_all(b"one\n").unwrap();
        output.flush().unwrap();
        output.flush().unwrap();

        // Bytes placed behind the writer's back stay where they are.
        let mut raw = read_all(&storage, "log").unwrap();
        raw.extend_from_slice(b"raw\n");
        storage.put_raw("log", raw);

        output.write_all(b"two\n").unwrap();
        output.close().unwrap();
        output.close().unwrap();

        assert_eq!(read_all(&storage, "log").unwrap(), b"one\nraw\ntwo\n");
    }

    #[test]
    fn test_file_operations() {
        let storage = MemoryStorage::default();

        assert!(!storage.file_exists("nonexistent.txt"));

        let mut output = storage.create_output("test.txt").unwrap();
        output.write_all(b"Test content").unwrap();
        output.close().unwrap();

        assert!(storage.file_exists("test.txt"));
        assert_eq!(storage.list_files().unwrap(), vec!["test.txt"]);

        storage.rename_file("test.txt", "renamed.txt").unwrap();
        assert!(!storage.file_exists("test.txt"));
        assert!(storage.file_exists("renamed.txt"));

        storage.delete_file("renamed.txt").unwrap();
        assert!(!storage.file_exists("renamed.txt"));
        assert_eq!(storage.file_count(), 0);
    }

    #[test]
    fn test_file_not_found() {
        let storage = MemoryStorage::default();

        assert!(storage.open_input("nonexistent.txt").is_err());
        assert!(storage.rename_file("nonexistent.txt", "other").is_err());
    }

    #[test]
    fn test_clones_share_files() {
        let storage = MemoryStorage::default();
        let shared = storage.clone();

        storage.put_raw("raw", b"bytes".to_vec());
        assert!(shared.file_exists("raw"));
    }
}

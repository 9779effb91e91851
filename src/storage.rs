//! Storage abstraction layer for Falx.
//!
//! The persistent counter store keeps its write-ahead log and snapshots as
//! named byte files behind the [`Storage`] trait, so the same journal code
//! runs against a directory on disk or against memory in tests.
//!
//! # Storage Types
//!
//! ## FileStorage
//! - Directory-backed persistent storage
//! - Buffered writes, fsync through `flush_and_sync`
//!
//! ## MemoryStorage
//! - In-memory storage for testing and temporary data
//! - Survives dropping the objects built on top of it, so restarts can be
//!   simulated by reopening a store over the same `Arc<dyn Storage>`
//!
//! # Example
//!
//! ```
//! use falx::storage::{StorageConfig, StorageFactory};
//! use falx::storage::memory::MemoryStorageConfig;
//! use std::io::{Read, Write};
//!
//! # fn main() -> falx::error::Result<()> {
//! let storage = StorageFactory::create(StorageConfig::Memory(MemoryStorageConfig::default()))?;
//!
//! let mut output = storage.create_output("counters.wal")?;
//! output.write_all(b"first\n")?;
//! output.close()?;
//!
//! let mut input = storage.open_input("counters.wal")?;
//! let mut buffer = String::new();
//! input.read_to_string(&mut buffer)?;
//! assert_eq!(buffer, "first\n");
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{FalxError, Result};

pub mod file;
pub mod memory;

/// A trait for storage backends that can store and retrieve named byte files.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create a file for writing, truncating any existing content.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Open a file for appending, creating it if it does not exist.
    fn create_output_append(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files in the storage, sorted by name.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Rename a file, replacing `new_name` if it exists.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Sync all pending writes to storage.
    fn sync(&self) -> Result<()>;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;

    /// Close the input stream.
    fn close(&mut self) -> Result<()>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Send + std::fmt::Debug {
    /// Flush buffered data and make it durable.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Close the output stream.
    fn close(&mut self) -> Result<()>;
}

/// Read a whole file into memory.
pub fn read_all(storage: &dyn Storage, name: &str) -> Result<Vec<u8>> {
    let mut input = storage.open_input(name)?;
    let mut buffer = Vec::new();
    input
        .read_to_end(&mut buffer)
        .map_err(|e| StorageError::IoError(format!("{name}: {e}")))?;
    input.close()?;
    Ok(buffer)
}

/// Write `bytes` to `name` through a temporary file and a rename, so readers
/// observe either the old or the new content, never a partial file.
pub fn write_atomic(storage: &dyn Storage, name: &str, bytes: &[u8]) -> Result<()> {
    let tmp_name = format!("{name}.tmp");
    let mut output = storage.create_output(&tmp_name)?;
    output
        .write_all(bytes)
        .map_err(|e| StorageError::IoError(format!("{tmp_name}: {e}")))?;
    output.flush_and_sync()?;
    output.close()?;
    storage.rename_file(&tmp_name, name)
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// File-based storage configuration (includes path)
    File(file::FileStorageConfig),

    /// Memory-based storage configuration
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

/// A factory for creating storage instances.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new storage instance with the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(mem_config) => {
                Ok(Arc::new(memory::MemoryStorage::new(mem_config)))
            }
            StorageConfig::File(file_config) => {
                Ok(Arc::new(file::FileStorage::new(file_config)?))
            }
        }
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// I/O error.
    IoError(String),

    /// Stored bytes could not be decoded.
    Corrupted(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::IoError(msg) => write!(f, "I/O error: {msg}"),
            StorageError::Corrupted(msg) => write!(f, "Corrupted data: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for FalxError {
    fn from(err: StorageError) -> Self {
        FalxError::storage(err.to_string())
    }
}

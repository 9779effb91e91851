//! Counter storage for the classifiers.
//!
//! A [`CounterStore`] holds named hashes of counters addressed by
//! `(namespace, key, field)`. The classifier keeps one namespace per model
//! and uses these keys inside it:
//!
//! | key | field | value |
//! |---|---|---|
//! | `category` | category | documents trained under the category |
//! | `feature:<feature>` | category | occurrences of the feature in the category |
//! | `thresholds` | category | Bayes threshold (parameter) |
//! | `minimums` | category | Fisher minimum (parameter) |
//!
//! Counters only ever grow. Parameters are real numbers kept beside the
//! counters and never mixed with them.
//!
//! Two implementations are provided:
//!
//! - [`MemoryCounterStore`] keeps everything in process memory.
//! - [`JournaledCounterStore`] adds a write-ahead log and snapshots over a
//!   [`Storage`](crate::storage::Storage) backend so counts survive restarts.

use std::fmt;

use crate::error::Result;

pub mod journaled;
pub mod memory;
pub mod wal;

pub use journaled::{JournalConfig, JournaledCounterStore};
pub use memory::MemoryCounterStore;

/// A keyed store of non-negative integer counters and real-valued parameters.
///
/// All operations are atomic per field: concurrent `increment_by` calls on the
/// same field never lose an update. Reads spanning several fields are not a
/// consistent snapshot.
pub trait CounterStore: Send + Sync + fmt::Debug {
    /// Create `field` with `default` if it does not exist yet.
    fn ensure_default(&self, namespace: &str, key: &str, field: &str, default: u64) -> Result<()>;

    /// Add `delta` to an existing field and return the new value.
    ///
    /// Returns `None` and changes nothing when the field does not exist.
    fn increment_by(
        &self,
        namespace: &str,
        key: &str,
        field: &str,
        delta: u64,
    ) -> Result<Option<u64>>;

    /// Read a counter.
    fn get(&self, namespace: &str, key: &str, field: &str) -> Result<Option<u64>>;

    /// List the fields of a hash in ascending order.
    fn keys(&self, namespace: &str, key: &str) -> Result<Vec<String>>;

    /// Whether the hash has at least one field.
    fn exists(&self, namespace: &str, key: &str) -> Result<bool>;

    /// List `(field, value)` pairs of a hash in ascending field order.
    fn entries(&self, namespace: &str, key: &str) -> Result<Vec<(String, u64)>>;

    /// Set a real-valued parameter, replacing any previous value.
    fn set_param(&self, namespace: &str, key: &str, field: &str, value: f64) -> Result<()>;

    /// Read a real-valued parameter.
    fn get_param(&self, namespace: &str, key: &str, field: &str) -> Result<Option<f64>>;

    /// Make every completed mutation durable.
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

//! In-memory counter tables.

use std::collections::BTreeMap;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::counter_store::CounterStore;
use crate::counter_store::wal::CounterOp;
use crate::error::Result;

#[derive(Debug, Default, Clone)]
struct Namespace {
    counters: AHashMap<String, BTreeMap<String, u64>>,
    params: AHashMap<String, BTreeMap<String, f64>>,
}

/// Serialized form of one namespace, with deterministic ordering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    #[serde(default)]
    pub counters: BTreeMap<String, BTreeMap<String, u64>>,
    #[serde(default)]
    pub params: BTreeMap<String, BTreeMap<String, f64>>,
}

/// The raw counter and parameter tables shared by every store implementation.
///
/// `CounterTables` is not synchronized; callers wrap it in a lock.
#[derive(Debug, Default, Clone)]
pub struct CounterTables {
    namespaces: AHashMap<String, Namespace>,
}

impl CounterTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether applying `op` would change the tables.
    pub fn is_effective(&self, op: &CounterOp) -> bool {
        match op {
            CounterOp::EnsureDefault {
                namespace,
                key,
                field,
                ..
            } => self.get(namespace, key, field).is_none(),
            CounterOp::IncrementBy {
                namespace,
                key,
                field,
                delta,
            } => *delta > 0 && self.get(namespace, key, field).is_some(),
            CounterOp::SetParam {
                namespace,
                key,
                field,
                value,
            } => self.get_param(namespace, key, field) != Some(*value),
        }
    }

    /// Apply a mutation and return the resulting counter value, if any.
    pub fn apply(&mut self, op: &CounterOp) -> Option<u64> {
        match op {
            CounterOp::EnsureDefault {
                namespace,
                key,
                field,
                default,
            } => Some(*self.hash_mut(namespace, key).entry(field.clone()).or_insert(*default)),
            CounterOp::IncrementBy {
                namespace,
                key,
                field,
                delta,
            } => {
                let value = self
                    .namespaces
                    .get_mut(namespace)?
                    .counters
                    .get_mut(key)?
                    .get_mut(field)?;
                *value = value.saturating_add(*delta);
                Some(*value)
            }
            CounterOp::SetParam {
                namespace,
                key,
                field,
                value,
            } => {
                self.namespaces
                    .entry(namespace.clone())
                    .or_default()
                    .params
                    .entry(key.clone())
                    .or_default()
                    .insert(field.clone(), *value);
                None
            }
        }
    }

    fn hash_mut(&mut self, namespace: &str, key: &str) -> &mut BTreeMap<String, u64> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .counters
            .entry(key.to_string())
            .or_default()
    }

    fn hash(&self, namespace: &str, key: &str) -> Option<&BTreeMap<String, u64>> {
        self.namespaces.get(namespace)?.counters.get(key)
    }

    pub fn get(&self, namespace: &str, key: &str, field: &str) -> Option<u64> {
        self.hash(namespace, key)?.get(field).copied()
    }

    pub fn keys(&self, namespace: &str, key: &str) -> Vec<String> {
        self.hash(namespace, key)
            .map(|hash| hash.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn exists(&self, namespace: &str, key: &str) -> bool {
        self.hash(namespace, key).is_some_and(|hash| !hash.is_empty())
    }

    pub fn entries(&self, namespace: &str, key: &str) -> Vec<(String, u64)> {
        self.hash(namespace, key)
            .map(|hash| hash.iter().map(|(f, v)| (f.clone(), *v)).collect())
            .unwrap_or_default()
    }

    pub fn get_param(&self, namespace: &str, key: &str, field: &str) -> Option<f64> {
        self.namespaces
            .get(namespace)?
            .params
            .get(key)?
            .get(field)
            .copied()
    }

    /// Number of counter hashes across all namespaces.
    pub fn hash_count(&self) -> usize {
        self.namespaces.values().map(|ns| ns.counters.len()).sum()
    }

    pub fn snapshot(&self) -> BTreeMap<String, NamespaceSnapshot> {
        self.namespaces
            .iter()
            .map(|(name, ns)| {
                let snapshot = NamespaceSnapshot {
                    counters: ns
                        .counters
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                    params: ns
                        .params
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                };
                (name.clone(), snapshot)
            })
            .collect()
    }

    pub fn from_snapshot(snapshot: BTreeMap<String, NamespaceSnapshot>) -> Self {
        let namespaces = snapshot
            .into_iter()
            .map(|(name, ns)| {
                let namespace = Namespace {
                    counters: ns.counters.into_iter().collect(),
                    params: ns.params.into_iter().collect(),
                };
                (name, namespace)
            })
            .collect();
        CounterTables { namespaces }
    }
}

/// A counter store that lives only in process memory.
///
/// Every mutation runs under a single write lock, so increments are atomic.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    tables: RwLock<CounterTables>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current tables.
    pub fn tables(&self) -> CounterTables {
        self.tables.read().clone()
    }
}

impl CounterStore for MemoryCounterStore {
    fn ensure_default(&self, namespace: &str, key: &str, field: &str, default: u64) -> Result<()> {
        self.tables.write().apply(&CounterOp::EnsureDefault {
            namespace: namespace.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            default,
        });
        Ok(())
    }

    fn increment_by(
        &self,
        namespace: &str,
        key: &str,
        field: &str,
        delta: u64,
    ) -> Result<Option<u64>> {
        Ok(self.tables.write().apply(&CounterOp::IncrementBy {
            namespace: namespace.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            delta,
        }))
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
        self.tables.write().apply(&CounterOp::SetParam {
            namespace: namespace.to_string(),
            key: key.to_string(),
            field: field.to_string(),
            value,
        });
        Ok(())
    }

    fn get_param(&self, namespace: &str, key: &str, field: &str) -> Result<Option<f64>> {
        Ok(self.tables.read().get_param(namespace, key, field))
    }
}

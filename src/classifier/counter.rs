//! Frequency counting over a [`CounterStore`].

use std::sync::Arc;

use crate::counter_store::CounterStore;
use crate::error::{FalxError, Result};

/// Hash holding the per-category document totals.
pub const CATEGORY_KEY: &str = "category";
/// Prefix of the per-feature hashes.
pub const FEATURE_KEY_PREFIX: &str = "feature:";
/// Hash holding Bayes thresholds.
pub const THRESHOLDS_KEY: &str = "thresholds";
/// Hash holding Fisher minimums.
pub const MINIMUMS_KEY: &str = "minimums";

/// Owns the counting state of one model: per-category document totals and
/// per-feature per-category occurrence counts.
///
/// Nothing is cached; every call reads or writes the store, so concurrent
/// trainers are visible immediately.
#[derive(Debug, Clone)]
pub struct FeatureCounter {
    store: Arc<dyn CounterStore>,
    namespace: String,
}

impl FeatureCounter {
    pub fn new<S: Into<String>>(store: Arc<dyn CounterStore>, namespace: S) -> Self {
        FeatureCounter {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    fn feature_key(feature: &str) -> String {
        format!("{FEATURE_KEY_PREFIX}{feature}")
    }

    /// Add one occurrence of `feature` under `category`.
    pub fn increment_feature(&self, feature: &str, category: &str) -> Result<()> {
        validate_feature(feature)?;
        validate_category(category)?;
        self.increment(&Self::feature_key(feature), category)
    }

    /// Add one trained document to `category`.
    pub fn increment_category(&self, category: &str) -> Result<()> {
        validate_category(category)?;
        self.increment(CATEGORY_KEY, category)
    }

    fn increment(&self, key: &str, field: &str) -> Result<()> {
        self.store.ensure_default(&self.namespace, key, field, 0)?;
        if self.store.increment_by(&self.namespace, key, field, 1)?.is_none() {
            return Err(FalxError::storage(format!(
                "counter {key}/{field} vanished between create and increment"
            )));
        }
        Ok(())
    }

    /// Record one document: every feature, then the category total.
    ///
    /// All features are validated before anything is written.
    pub fn train<S: AsRef<str>>(&self, features: &[S], category: &str) -> Result<()> {
        validate_category(category)?;
        for feature in features {
            validate_feature(feature.as_ref())?;
        }

        for feature in features {
            self.increment(&Self::feature_key(feature.as_ref()), category)?;
        }
        self.increment(CATEGORY_KEY, category)
    }

    /// Occurrences of `feature` under `category`, 0 if never seen.
    pub fn feature_count(&self, feature: &str, category: &str) -> Result<u64> {
        Ok(self
            .store
            .get(&self.namespace, &Self::feature_key(feature), category)?
            .unwrap_or(0))
    }

    /// Documents trained under `category`, 0 if never seen.
    pub fn category_count(&self, category: &str) -> Result<u64> {
        Ok(self
            .store
            .get(&self.namespace, CATEGORY_KEY, category)?
            .unwrap_or(0))
    }

    /// Sum of all category counts.
    pub fn total_documents(&self) -> Result<u64> {
        Ok(self
            .store
            .entries(&self.namespace, CATEGORY_KEY)?
            .into_iter()
            .map(|(_, count)| count)
            .sum())
    }

    /// Every category with a recorded count, in ascending order.
    pub fn known_categories(&self) -> Result<Vec<String>> {
        self.store.keys(&self.namespace, CATEGORY_KEY)
    }

    /// Category totals in ascending category order.
    pub fn category_counts(&self) -> Result<Vec<(String, u64)>> {
        self.store.entries(&self.namespace, CATEGORY_KEY)
    }

    /// Whether `feature` has been seen under any category.
    pub fn has_feature(&self, feature: &str) -> Result<bool> {
        self.store.exists(&self.namespace, &Self::feature_key(feature))
    }

    pub(crate) fn parameter(&self, key: &str, category: &str) -> Result<Option<f64>> {
        self.store.get_param(&self.namespace, key, category)
    }

    pub(crate) fn set_parameter(&self, key: &str, category: &str, value: f64) -> Result<()> {
        validate_category(category)?;
        if !value.is_finite() || value < 0.0 {
            return Err(FalxError::invalid_argument(format!(
                "{key} for {category:?} must be a non-negative finite number, got {value}"
            )));
        }
        self.store
            .set_param(&self.namespace, key, category, value)
    }
}

pub(crate) fn validate_feature(feature: &str) -> Result<()> {
    if feature.is_empty() {
        return Err(FalxError::invalid_feature("empty feature token"));
    }
    Ok(())
}

pub(crate) fn validate_category(category: &str) -> Result<()> {
    if category.is_empty() {
        return Err(FalxError::invalid_argument("category must not be empty"));
    }
    Ok(())
}

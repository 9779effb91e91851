//! # Falx
//!
//! Incrementally trained text classifiers over persistent counters.
//!
//! ## Features
//!
//! - Naive Bayes posterior and Fisher combined-probability classifiers
//! - One-document-at-a-time training against a shared counter store
//! - Optional per-category threshold and minimum suppression
//! - Write-ahead logged counter store with snapshots and crash recovery
//! - Configurable text analysis pipeline for feature extraction

pub mod analysis;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod counter_store;
pub mod error;
pub mod feature;
pub mod storage;

pub mod prelude {
    pub use crate::classifier::{
        BayesClassifier, Classifier, ClassifierConfig, Decision, FisherClassifier,
    };
    pub use crate::config::{AnalysisConfig, FalxConfig};
    pub use crate::counter_store::{CounterStore, JournaledCounterStore, MemoryCounterStore};
    pub use crate::error::{FalxError, Result};
    pub use crate::feature::FeatureExtractor;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! The classifier engine.
//!
//! Training and classification both start from a [`FeatureExtractor`]:
//!
//! ```text
//! train:    text -> features -> increment_feature(f, c)... -> increment_category(c)
//! classify: text -> features -> score per known category -> decision
//! ```
//!
//! [`BayesClassifier`] scores categories by naive Bayes posterior,
//! [`FisherClassifier`] by Fisher's combined probability test. Both read and
//! write their counts through a [`FeatureCounter`] bound to one namespace of
//! a [`CounterStore`](crate::counter_store::CounterStore), and keep no other
//! state, so any number of instances can share a store.
//!
//! Threshold (Bayes) and minimum (Fisher) suppression is an optional overlay.
//! Its defaults never change a verdict; once set, a suppressed decision
//! returns the caller's default.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use falx::classifier::{BayesClassifier, Classifier};
//! use falx::config::AnalysisConfig;
//! use falx::counter_store::MemoryCounterStore;
//!
//! # fn main() -> falx::error::Result<()> {
//! let extractor = AnalysisConfig::default().build_extractor()?;
//! let classifier = BayesClassifier::new(Arc::new(MemoryCounterStore::new()), extractor);
//!
//! for _ in 0..5 {
//!     classifier.train("quick rabbit", "good")?;
//!     classifier.train("buy pharmaceuticals", "bad")?;
//! }
//! assert_eq!(classifier.classify("quick rabbit", "unknown")?, "good");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::error::Result;
use crate::feature::{FeatureExtractor, Features};

pub mod bayes;
pub mod config;
pub mod counter;
pub mod decision;
pub mod fisher;
pub mod probability;

pub use bayes::BayesClassifier;
pub use config::ClassifierConfig;
pub use counter::FeatureCounter;
pub use decision::{CategoryScore, Decision, Fallback};
pub use fisher::{FisherClassifier, inverse_chi_square};
pub use probability::ProbabilityModel;

/// Common interface of the Bayes and Fisher classifiers.
pub trait Classifier: Send + Sync {
    /// Short method name, e.g. `"bayes"`.
    fn name(&self) -> &'static str;

    /// The counter holding this classifier's model.
    fn counter(&self) -> &FeatureCounter;

    /// The extractor applied to raw text.
    fn extractor(&self) -> &Arc<dyn FeatureExtractor>;

    /// Score every known category, in ascending category order.
    fn scores_features(&self, features: &[String]) -> Result<Vec<CategoryScore>>;

    /// Decide on pre-extracted features.
    fn decide_features(&self, features: &[String], default: &str) -> Result<Decision>;

    /// Extract the features of `item`, rejecting empty tokens.
    fn features(&self, item: &str) -> Result<Features> {
        let features = self.extractor().extract(item)?;
        for feature in &features {
            counter::validate_feature(feature)?;
        }
        Ok(features)
    }

    /// Train on one document.
    fn train(&self, item: &str, category: &str) -> Result<()> {
        let features = self.features(item)?;
        self.train_features(&features, category)
    }

    /// Train on pre-extracted features.
    fn train_features(&self, features: &[String], category: &str) -> Result<()> {
        self.counter().train(features, category)
    }

    /// Score every known category for `item`.
    fn scores(&self, item: &str) -> Result<Vec<CategoryScore>> {
        let features = self.features(item)?;
        self.scores_features(&features)
    }

    /// Classify `item`, with the scores and the reason for any fallback.
    fn decide(&self, item: &str, default: &str) -> Result<Decision> {
        let features = self.features(item)?;
        self.decide_features(&features, default)
    }

    /// Classify `item`, returning the best category or `default`.
    fn classify(&self, item: &str, default: &str) -> Result<String> {
        Ok(self.decide(item, default)?.verdict)
    }

    /// Classify pre-extracted features.
    fn classify_features(&self, features: &[String], default: &str) -> Result<String> {
        Ok(self.decide_features(features, default)?.verdict)
    }
}

/// Train the five-document demonstration corpus.
pub fn sample_train(classifier: &dyn Classifier) -> Result<()> {
    classifier.train("Nobody owns the water.", "good")?;
    classifier.train("the quick rabbit jumps fences", "good")?;
    classifier.train("buy pharmaceuticals now", "bad")?;
    classifier.train("make quick money at the online casino", "bad")?;
    classifier.train("the quick brown fox jumps", "good")?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::config::AnalysisConfig;
    use crate::counter_store::{CounterStore, MemoryCounterStore};
    use crate::feature::FeatureExtractor;

    pub fn memory_store() -> Arc<dyn CounterStore> {
        Arc::new(MemoryCounterStore::new())
    }

    pub fn word_extractor() -> Arc<dyn FeatureExtractor> {
        AnalysisConfig::default().build_extractor().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::test_support::{memory_store, word_extractor};
    use crate::counter_store::CounterStore;
    use crate::error::FalxError;

    #[test]
    fn test_training_twice_counts_twice() {
        let store = memory_store();
        let classifier = BayesClassifier::new(Arc::clone(&store), word_extractor());
        classifier.train("quick rabbit", "good").unwrap();

        let counter = classifier.counter();
        let before = (
            counter.feature_count("quick", "good").unwrap(),
            counter.feature_count("rabbit", "good").unwrap(),
            counter.category_count("good").unwrap(),
        );

        classifier.train("quick brown rabbit", "good").unwrap();
        classifier.train("quick brown rabbit", "good").unwrap();

        assert_eq!(counter.feature_count("quick", "good").unwrap(), before.0 + 2);
        assert_eq!(counter.feature_count("rabbit", "good").unwrap(), before.1 + 2);
        assert_eq!(counter.feature_count("brown", "good").unwrap(), 2);
        assert_eq!(counter.category_count("good").unwrap(), before.2 + 2);
    }

    #[test]
    fn test_total_documents_matches_category_sum() {
        let classifier = FisherClassifier::new(memory_store(), word_extractor());
        let counter = classifier.counter();

        for (text, category) in [
            ("quick rabbit", "good"),
            ("cheap pills", "bad"),
            ("", "neutral"),
            ("quick pills", "bad"),
        ] {
            classifier.train(text, category).unwrap();
            let sum: u64 = counter
                .known_categories()
                .unwrap()
                .iter()
                .map(|c| counter.category_count(c).unwrap())
                .sum();
            assert_eq!(counter.total_documents().unwrap(), sum);
        }
        assert_eq!(counter.total_documents().unwrap(), 4);
    }

    #[test]
    fn test_pre_extracted_features() {
        let classifier = BayesClassifier::new(memory_store(), word_extractor());
        let spam = vec!["viagra".to_string(), "cheap".to_string()];
        let ham = vec!["meeting".to_string(), "agenda".to_string()];

        for _ in 0..3 {
            classifier.train_features(&spam, "spam").unwrap();
            classifier.train_features(&ham, "ham").unwrap();
        }

        assert_eq!(classifier.classify_features(&spam, "unknown").unwrap(), "spam");
        let err = classifier
            .train_features(&["".to_string()], "spam")
            .unwrap_err();
        assert!(matches!(err, FalxError::InvalidFeature(_)));
    }

    #[test]
    fn test_classifiers_share_a_store_by_namespace() {
        let store: Arc<dyn CounterStore> = memory_store();
        let english = BayesClassifier::with_config(
            Arc::clone(&store),
            word_extractor(),
            &ClassifierConfig::with_namespace("english"),
        )
        .unwrap();
        let other = BayesClassifier::with_config(
            store,
            word_extractor(),
            &ClassifierConfig::with_namespace("other"),
        )
        .unwrap();

        sample_train(&english).unwrap();
        assert_eq!(english.counter().total_documents().unwrap(), 5);
        assert!(matches!(
            other.classify("quick rabbit", "unknown"),
            Err(FalxError::NoTrainingData)
        ));
    }

    #[test]
    fn test_scores_are_in_category_order() {
        let classifier = FisherClassifier::new(memory_store(), word_extractor());
        sample_train(&classifier).unwrap();

        let scores = classifier.scores("quick rabbit").unwrap();
        let categories: Vec<&str> = scores.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(categories, vec!["bad", "good"]);
        assert_eq!(classifier.name(), "fisher");
    }
}

//! Naive Bayes classification.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::classifier::Classifier;
use crate::classifier::config::ClassifierConfig;
use crate::classifier::counter::{FeatureCounter, THRESHOLDS_KEY};
use crate::classifier::decision::{
    CategoryScore, Decision, Fallback, find_competitor, select_best,
};
use crate::classifier::probability::ProbabilityModel;
use crate::counter_store::CounterStore;
use crate::error::{FalxError, Result};
use crate::feature::FeatureExtractor;

/// Threshold applied to categories without an explicit one. With 1.0 a
/// competitor can only suppress the best category by beating it, which never
/// happens, so the overlay is inert.
pub const DEFAULT_THRESHOLD: f64 = 1.0;

/// Scores each category by `P(document | category) * P(category)`.
///
/// An optional per-category threshold adds an ambiguity margin: if the best
/// category is `b` and any other category `c` satisfies
/// `score(c) * threshold(b) > score(b)`, the caller's default is returned.
pub struct BayesClassifier {
    extractor: Arc<dyn FeatureExtractor>,
    model: ProbabilityModel,
}

impl BayesClassifier {
    /// Create a classifier over `store` with the default configuration.
    pub fn new(store: Arc<dyn CounterStore>, extractor: Arc<dyn FeatureExtractor>) -> Self {
        let config = ClassifierConfig::default();
        let counter = FeatureCounter::new(store, config.namespace);
        BayesClassifier {
            extractor,
            model: ProbabilityModel::new(counter),
        }
    }

    pub fn with_config(
        store: Arc<dyn CounterStore>,
        extractor: Arc<dyn FeatureExtractor>,
        config: &ClassifierConfig,
    ) -> Result<Self> {
        let counter = FeatureCounter::new(store, config.namespace.clone());
        Ok(BayesClassifier {
            extractor,
            model: ProbabilityModel::with_config(counter, config)?,
        })
    }

    pub fn model(&self) -> &ProbabilityModel {
        &self.model
    }

    /// `Π weighted_probability(f, category)` over the features.
    pub fn document_probability<S: AsRef<str>>(&self, features: &[S], category: &str) -> Result<f64> {
        let categories = self.model.counter().known_categories()?;
        self.document_probability_in(features, category, &categories)
    }

    fn document_probability_in<S: AsRef<str>>(
        &self,
        features: &[S],
        category: &str,
        categories: &[String],
    ) -> Result<f64> {
        let mut probability = 1.0;
        for feature in features {
            probability *= self.model.weighted_probability_in(
                feature.as_ref(),
                category,
                categories,
                |f, c| self.model.conditional_probability(f, c),
            )?;
        }
        Ok(probability)
    }

    /// Posterior score of `category`: document probability times the
    /// category prior.
    pub fn category_probability<S: AsRef<str>>(&self, features: &[S], category: &str) -> Result<f64> {
        let total = self.model.counter().total_documents()?;
        if total == 0 {
            return Err(FalxError::NoTrainingData);
        }
        let categories = self.model.counter().known_categories()?;
        self.category_probability_in(features, category, &categories, total)
    }

    fn category_probability_in<S: AsRef<str>>(
        &self,
        features: &[S],
        category: &str,
        categories: &[String],
        total: u64,
    ) -> Result<f64> {
        let prior = self.model.counter().category_count(category)? as f64 / total as f64;
        Ok(self.document_probability_in(features, category, categories)? * prior)
    }

    /// Set the ambiguity threshold of `category`.
    pub fn set_threshold(&self, category: &str, threshold: f64) -> Result<()> {
        self.model
            .counter()
            .set_parameter(THRESHOLDS_KEY, category, threshold)
    }

    /// Threshold of `category`, [`DEFAULT_THRESHOLD`] when unset.
    pub fn threshold(&self, category: &str) -> Result<f64> {
        Ok(self
            .model
            .counter()
            .parameter(THRESHOLDS_KEY, category)?
            .unwrap_or(DEFAULT_THRESHOLD))
    }

    fn score_all<S: AsRef<str>>(&self, features: &[S]) -> Result<Vec<CategoryScore>> {
        let counter = self.model.counter();
        let total = counter.total_documents()?;
        if total == 0 {
            return Err(FalxError::NoTrainingData);
        }

        let categories = counter.known_categories()?;
        categories
            .iter()
            .map(|category| {
                let score = self.category_probability_in(features, category, &categories, total)?;
                Ok(CategoryScore::new(category.as_str(), score))
            })
            .collect()
    }
}

impl Classifier for BayesClassifier {
    fn name(&self) -> &'static str {
        "bayes"
    }

    fn counter(&self) -> &FeatureCounter {
        self.model.counter()
    }

    fn extractor(&self) -> &Arc<dyn FeatureExtractor> {
        &self.extractor
    }

    fn scores_features(&self, features: &[String]) -> Result<Vec<CategoryScore>> {
        self.score_all(features)
    }

    fn decide_features(&self, features: &[String], default: &str) -> Result<Decision> {
        let scores = self.score_all(features)?;

        let Some(best) = select_best(&scores, |_| true) else {
            debug!("bayes: no category scored above zero, using {default:?}");
            return Ok(Decision::fallback(default, Fallback::NoCandidate, scores));
        };

        let threshold = self.threshold(&best.category)?;
        if let Some(competitor) = find_competitor(&scores, best, threshold) {
            debug!(
                "bayes: {} ({}) is within threshold {threshold} of {} ({})",
                competitor.category, competitor.score, best.category, best.score
            );
            let fallback = Fallback::Ambiguous {
                best: best.category.clone(),
                competitor: competitor.category.clone(),
            };
            return Ok(Decision::fallback(default, fallback, scores));
        }

        debug!("bayes: {} wins with {}", best.category, best.score);
        let verdict = best.category.clone();
        Ok(Decision::chosen(verdict, scores))
    }
}

impl fmt::Debug for BayesClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BayesClassifier")
            .field("extractor", &self.extractor.name())
            .field("model", &self.model)
            .finish()
    }
}

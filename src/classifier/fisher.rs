//! Fisher's method classification.
//!
//! For each category the per-feature probabilities are combined into the
//! statistic `-2 ln Π p`, which under the null hypothesis follows a
//! chi-square distribution with `2n` degrees of freedom. The score is the
//! survival function of that statistic: high values mean the features
//! favour the category more strongly than chance would.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;

use crate::classifier::Classifier;
use crate::classifier::config::ClassifierConfig;
use crate::classifier::counter::{FeatureCounter, MINIMUMS_KEY};
use crate::classifier::decision::{CategoryScore, Decision, Fallback, select_best};
use crate::classifier::probability::ProbabilityModel;
use crate::counter_store::CounterStore;
use crate::error::Result;
use crate::feature::FeatureExtractor;

/// Minimum applied to categories without an explicit one.
pub const DEFAULT_MINIMUM: f64 = 0.0;

/// Survival function of the chi-square distribution for even `df`:
///
/// ```text
/// m = chi / 2
/// Σ_{i=0}^{df/2 - 1} e^-m m^i / i!
/// ```
///
/// Terms are accumulated in log space so large statistics underflow to 0.0
/// instead of producing NaN. `df == 0` yields 1.0 and the result is capped
/// at 1.0. A non-finite statistic yields 0.0.
pub fn inverse_chi_square(chi: f64, df: usize) -> f64 {
    if !chi.is_finite() {
        return 0.0;
    }

    let m = (chi / 2.0).max(0.0);
    let mut log_term = -m;
    let mut sum = log_term.exp();
    if m > 0.0 {
        let ln_m = m.ln();
        for i in 1..df / 2 {
            log_term += ln_m - (i as f64).ln();
            sum += log_term.exp();
        }
    }
    sum.min(1.0)
}

/// Scores each category with Fisher's combined probability test.
///
/// A per-category minimum can be set: a category only wins when its score
/// also exceeds its minimum.
pub struct FisherClassifier {
    extractor: Arc<dyn FeatureExtractor>,
    model: ProbabilityModel,
}

impl FisherClassifier {
    /// Create a classifier over `store` with the default configuration.
    pub fn new(store: Arc<dyn CounterStore>, extractor: Arc<dyn FeatureExtractor>) -> Self {
        let config = ClassifierConfig::default();
        let counter = FeatureCounter::new(store, config.namespace);
        FisherClassifier {
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
        Ok(FisherClassifier {
            extractor,
            model: ProbabilityModel::with_config(counter, config)?,
        })
    }

    pub fn model(&self) -> &ProbabilityModel {
        &self.model
    }

    /// `P(feature | category)` normalized over every known category, so it
    /// reads as "how strongly the feature points at this category".
    pub fn category_feature_probability(&self, feature: &str, category: &str) -> Result<f64> {
        let categories = self.model.counter().known_categories()?;
        self.category_feature_probability_in(feature, category, &categories)
    }

    fn category_feature_probability_in(
        &self,
        feature: &str,
        category: &str,
        categories: &[String],
    ) -> Result<f64> {
        let probability = self.model.conditional_probability(feature, category)?;
        if probability == 0.0 {
            return Ok(0.0);
        }

        let mut sum = 0.0;
        for known in categories {
            sum += self.model.conditional_probability(feature, known)?;
        }
        if sum == 0.0 {
            return Ok(0.0);
        }
        Ok(probability / sum)
    }

    /// Fisher score of `category` for a feature list. Duplicates count once
    /// per occurrence. An empty list scores 1.0.
    pub fn fisher_score<S: AsRef<str>>(&self, features: &[S], category: &str) -> Result<f64> {
        let categories = self.model.counter().known_categories()?;
        self.fisher_score_in(features, category, &categories)
    }

    fn fisher_score_in<S: AsRef<str>>(
        &self,
        features: &[S],
        category: &str,
        categories: &[String],
    ) -> Result<f64> {
        let mut log_probability = 0.0;
        for feature in features {
            let probability = self.model.weighted_probability_in(
                feature.as_ref(),
                category,
                categories,
                |f, c| self.category_feature_probability_in(f, c, categories),
            )?;
            log_probability += probability.ln();
        }

        let chi = -2.0 * log_probability;
        Ok(inverse_chi_square(chi, features.len() * 2))
    }

    /// Set the minimum score `category` needs to win.
    pub fn set_minimum(&self, category: &str, minimum: f64) -> Result<()> {
        self.model
            .counter()
            .set_parameter(MINIMUMS_KEY, category, minimum)
    }

    /// Minimum of `category`, [`DEFAULT_MINIMUM`] when unset.
    pub fn minimum(&self, category: &str) -> Result<f64> {
        Ok(self
            .model
            .counter()
            .parameter(MINIMUMS_KEY, category)?
            .unwrap_or(DEFAULT_MINIMUM))
    }

    fn score_all<S: AsRef<str>>(&self, features: &[S]) -> Result<Vec<CategoryScore>> {
        let categories = self.model.counter().known_categories()?;
        categories
            .iter()
            .map(|category| {
                let score = self.fisher_score_in(features, category, &categories)?;
                Ok(CategoryScore::new(category.as_str(), score))
            })
            .collect()
    }
}

impl Classifier for FisherClassifier {
    fn name(&self) -> &'static str {
        "fisher"
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

        let mut minimums = AHashMap::with_capacity(scores.len());
        for score in &scores {
            minimums.insert(score.category.as_str(), self.minimum(&score.category)?);
        }

        let best = select_best(&scores, |candidate| {
            let minimum = minimums
                .get(candidate.category.as_str())
                .copied()
                .unwrap_or(DEFAULT_MINIMUM);
            candidate.score > minimum
        });

        match best {
            Some(best) => {
                debug!("fisher: {} wins with {}", best.category, best.score);
                let verdict = best.category.clone();
                Ok(Decision::chosen(verdict, scores))
            }
            None => {
                debug!("fisher: no category cleared its minimum, using {default:?}");
                Ok(Decision::fallback(default, Fallback::NoCandidate, scores))
            }
        }
    }
}

impl fmt::Debug for FisherClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FisherClassifier")
            .field("extractor", &self.extractor.name())
            .field("model", &self.model)
            .finish()
    }
}

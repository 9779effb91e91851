//! Conditional and smoothed probabilities over a [`FeatureCounter`].

use crate::classifier::config::ClassifierConfig;
use crate::classifier::counter::FeatureCounter;
use crate::error::Result;

/// Probability estimates shared by both classifiers.
///
/// `weight` and `assumed_probability` parameterize the shrinkage applied by
/// [`weighted_probability`](Self::weighted_probability).
#[derive(Debug, Clone)]
pub struct ProbabilityModel {
    counter: FeatureCounter,
    weight: f64,
    assumed_probability: f64,
}

impl ProbabilityModel {
    pub fn new(counter: FeatureCounter) -> Self {
        let defaults = ClassifierConfig::default();
        ProbabilityModel {
            counter,
            weight: defaults.weight,
            assumed_probability: defaults.assumed_probability,
        }
    }

    /// Build a model with the weight and prior of `config`.
    pub fn with_config(counter: FeatureCounter, config: &ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(ProbabilityModel {
            counter,
            weight: config.weight,
            assumed_probability: config.assumed_probability,
        })
    }

    pub fn counter(&self) -> &FeatureCounter {
        &self.counter
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn assumed_probability(&self) -> f64 {
        self.assumed_probability
    }

    /// `P(feature | category)`: the share of `category` documents containing
    /// `feature`. Zero when nothing was trained under `category`.
    pub fn conditional_probability(&self, feature: &str, category: &str) -> Result<f64> {
        let category_count = self.counter.category_count(category)?;
        if category_count == 0 {
            return Ok(0.0);
        }
        Ok(self.counter.feature_count(feature, category)? as f64 / category_count as f64)
    }

    /// Shrink `base(feature, category)` towards the assumed probability using
    /// the configured weight.
    pub fn weighted_probability<F>(&self, feature: &str, category: &str, base: F) -> Result<f64>
    where
        F: Fn(&str, &str) -> Result<f64>,
    {
        self.weighted_probability_with(
            feature,
            category,
            base,
            self.weight,
            self.assumed_probability,
        )
    }

    /// Laplace-style shrinkage:
    ///
    /// ```text
    /// (weight * assumed + totals * base(f, c)) / (weight + totals)
    /// ```
    ///
    /// where `totals` is the number of times `feature` was seen across all
    /// known categories. Exactly `assumed` when the feature is unseen.
    pub fn weighted_probability_with<F>(
        &self,
        feature: &str,
        category: &str,
        base: F,
        weight: f64,
        assumed: f64,
    ) -> Result<f64>
    where
        F: Fn(&str, &str) -> Result<f64>,
    {
        let categories = self.counter.known_categories()?;
        self.weighted_in(feature, category, &categories, base, weight, assumed)
    }

    /// [`weighted_probability`](Self::weighted_probability) against an
    /// already fetched category list.
    pub(crate) fn weighted_probability_in<F>(
        &self,
        feature: &str,
        category: &str,
        categories: &[String],
        base: F,
    ) -> Result<f64>
    where
        F: Fn(&str, &str) -> Result<f64>,
    {
        self.weighted_in(
            feature,
            category,
            categories,
            base,
            self.weight,
            self.assumed_probability,
        )
    }

    fn weighted_in<F>(
        &self,
        feature: &str,
        category: &str,
        categories: &[String],
        base: F,
        weight: f64,
        assumed: f64,
    ) -> Result<f64>
    where
        F: Fn(&str, &str) -> Result<f64>,
    {
        let mut totals = 0u64;
        for known in categories {
            totals += self.counter.feature_count(feature, known)?;
        }
        if totals == 0 {
            return Ok(assumed);
        }

        let totals = totals as f64;
        let basic = base(feature, category)?;
        Ok((weight * assumed + totals * basic) / (weight + totals))
    }
}

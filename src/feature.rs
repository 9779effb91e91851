//! Feature extraction: turning a document into the tokens the classifiers count.
//!
//! A [`FeatureExtractor`] maps raw text to a [`Features`] list. The list is
//! finite and can be iterated any number of times. Duplicates are allowed and
//! meaningful: the Fisher score multiplies one probability per entry, so a
//! token that appears twice contributes twice.
//!
//! [`AnalyzerFeatureExtractor`] adapts any [`Analyzer`] into an extractor and
//! can optionally collapse duplicates, which reproduces a "set of words"
//! document model.

use std::sync::Arc;

use ahash::AHashSet;

use crate::analysis::analyzer::Analyzer;
use crate::error::Result;

/// The features of one document, in extraction order.
pub type Features = Vec<String>;

/// Maps raw document text to a collection of feature tokens.
pub trait FeatureExtractor: Send + Sync {
    /// Extract the features of `text`.
    fn extract(&self, text: &str) -> Result<Features>;

    /// Get the name of this extractor (for debugging and logging).
    fn name(&self) -> &str;
}

/// A feature extractor backed by an analysis pipeline.
///
/// Stopped tokens are skipped. With `unique` set, only the first occurrence
/// of each token is kept.
#[derive(Clone)]
pub struct AnalyzerFeatureExtractor {
    analyzer: Arc<dyn Analyzer>,
    unique: bool,
}

impl AnalyzerFeatureExtractor {
    /// Create an extractor that keeps every token, duplicates included.
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        AnalyzerFeatureExtractor {
            analyzer,
            unique: false,
        }
    }

    /// Collapse repeated tokens to their first occurrence.
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Whether duplicates are collapsed.
    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

impl FeatureExtractor for AnalyzerFeatureExtractor {
    fn extract(&self, text: &str) -> Result<Features> {
        let tokens = self
            .analyzer
            .analyze(text)?
            .filter(|token| !token.is_stopped())
            .map(|token| token.text);

        if !self.unique {
            return Ok(tokens.collect());
        }

        let mut seen = AHashSet::new();
        Ok(tokens.filter(|text| seen.insert(text.clone())).collect())
    }

    fn name(&self) -> &str {
        self.analyzer.name()
    }
}

impl std::fmt::Debug for AnalyzerFeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerFeatureExtractor")
            .field("analyzer", &self.analyzer.name())
            .field("unique", &self.unique)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::PipelineAnalyzer;
    use crate::analysis::token_filter::{LowercaseFilter, StopFilter};
    use crate::analysis::tokenizer::WhitespaceTokenizer;

    fn analyzer() -> Arc<dyn Analyzer> {
        Arc::new(
            PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
                .add_filter(Arc::new(LowercaseFilter::new()))
                .add_filter(Arc::new(
                    StopFilter::from_words(vec!["the"]).remove_stopped(false),
                )),
        )
    }

    #[test]
    fn test_duplicates_are_kept_by_default() {
        let extractor = AnalyzerFeatureExtractor::new(analyzer());
        let features = extractor.extract("Quick quick rabbit").unwrap();

        assert_eq!(features, vec!["quick", "quick", "rabbit"]);
    }

    #[test]
    fn test_unique_keeps_first_occurrence() {
        let extractor = AnalyzerFeatureExtractor::new(analyzer()).unique(true);
        let features = extractor.extract("rabbit Quick quick rabbit fox").unwrap();

        assert_eq!(features, vec!["rabbit", "quick", "fox"]);
        assert!(extractor.is_unique());
    }

    #[test]
    fn test_stopped_tokens_are_skipped() {
        let extractor = AnalyzerFeatureExtractor::new(analyzer());
        let features = extractor.extract("The quick fox").unwrap();

        assert_eq!(features, vec!["quick", "fox"]);
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let extractor = AnalyzerFeatureExtractor::new(analyzer());
        let features = extractor.extract("buy pharmaceuticals now").unwrap();

        let first: Vec<&String> = features.iter().collect();
        let second: Vec<&String> = features.iter().collect();
        assert_eq!(first, second);
        assert_eq!(extractor.name(), "pipeline_whitespace");
    }
}

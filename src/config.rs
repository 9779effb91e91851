//! Application configuration.
//!
//! A [`FalxConfig`] groups the classifier, analysis and journal settings and
//! is read from a JSON file. Every field has a default, so `{}` is a valid
//! configuration:
//!
//! ```json
//! {
//!   "classifier": { "namespace": "mail", "weight": 1.0, "assumed_probability": 0.5 },
//!   "analysis": { "tokenizer": "unicode", "min_length": 2, "stop_words": ["the"] },
//!   "journal": { "compaction_threshold": 4096, "sync_writes": true }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::PipelineAnalyzer;
use crate::analysis::token_filter::{LengthFilter, LimitFilter, LowercaseFilter, StopFilter};
use crate::analysis::tokenizer::{
    RegexTokenizer, Tokenizer, UnicodeWordTokenizer, WhitespaceTokenizer,
};
use crate::classifier::ClassifierConfig;
use crate::counter_store::JournalConfig;
use crate::error::{FalxError, Result};
use crate::feature::{AnalyzerFeatureExtractor, FeatureExtractor};

/// Tokenizer used by the feature extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Regular expression matches (`pattern`, `\w+` by default).
    #[default]
    Regex,
    /// Unicode word boundaries.
    Unicode,
    /// Whitespace separated runs.
    Whitespace,
}

/// How documents are turned into features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tokenizer: TokenizerKind,

    /// Token pattern for the regex tokenizer.
    pub pattern: Option<String>,

    pub lowercase: bool,

    /// Shortest token kept, in characters.
    pub min_length: usize,

    /// Longest token kept, in characters.
    pub max_length: usize,

    /// Tokens dropped before counting.
    pub stop_words: Vec<String>,

    /// Use the built-in English stop word list instead of `stop_words`.
    pub english_stop_words: bool,

    /// Read at most this many tokens per document, counted after stop word
    /// and length filtering but before de-duplication.
    pub limit: Option<usize>,

    /// Count each distinct token once per document.
    pub unique: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            tokenizer: TokenizerKind::Regex,
            pattern: None,
            lowercase: true,
            min_length: 3,
            max_length: 19,
            stop_words: Vec::new(),
            english_stop_words: false,
            limit: None,
            unique: true,
        }
    }
}

impl AnalysisConfig {
    /// Build the feature extractor described by this configuration.
    pub fn build_extractor(&self) -> Result<Arc<dyn FeatureExtractor>> {
        let tokenizer: Arc<dyn Tokenizer> = match self.tokenizer {
            TokenizerKind::Regex => match &self.pattern {
                Some(pattern) => Arc::new(RegexTokenizer::with_pattern(pattern)?),
                None => Arc::new(RegexTokenizer::new()?),
            },
            TokenizerKind::Unicode => Arc::new(UnicodeWordTokenizer::new()),
            TokenizerKind::Whitespace => Arc::new(WhitespaceTokenizer::new()),
        };

        let mut analyzer = PipelineAnalyzer::new(tokenizer);
        if self.lowercase {
            analyzer = analyzer.add_filter(Arc::new(LowercaseFilter::new()));
        }
        analyzer = analyzer.add_filter(Arc::new(LengthFilter::new(
            self.min_length,
            self.max_length,
        )?));
        if self.english_stop_words {
            analyzer = analyzer.add_filter(Arc::new(StopFilter::new()));
        } else if !self.stop_words.is_empty() {
            analyzer = analyzer.add_filter(Arc::new(StopFilter::from_words(
                self.stop_words.iter().cloned(),
            )));
        }

        match self.limit {
            Some(0) => {
                return Err(FalxError::invalid_config("analysis limit must be positive"));
            }
            Some(limit) => analyzer = analyzer.add_filter(Arc::new(LimitFilter::new(limit))),
            None => {}
        }

        Ok(Arc::new(
            AnalyzerFeatureExtractor::new(Arc::new(analyzer)).unique(self.unique),
        ))
    }
}

/// Whole-application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FalxConfig {
    pub classifier: ClassifierConfig,
    pub analysis: AnalysisConfig,
    pub journal: JournalConfig,
}

impl FalxConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: FalxConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        if self.analysis.min_length > self.analysis.max_length {
            return Err(FalxError::invalid_config(format!(
                "min_length {} exceeds max_length {}",
                self.analysis.min_length, self.analysis.max_length
            )));
        }
        if self.journal.compaction_threshold == 0 {
            return Err(FalxError::invalid_config(
                "compaction_threshold must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_extractor_matches_word_rules() {
        let extractor = AnalysisConfig::default().build_extractor().unwrap();
        let features = extractor
            .extract("The QUICK brown fox, the quick rabbit! a ok supercalifragilisticexpialidocious")
            .unwrap();

        assert_eq!(features, vec!["the", "quick", "brown", "fox", "rabbit"]);
    }

    #[test]
    fn test_stop_words_and_duplicates() {
        let config = AnalysisConfig {
            stop_words: vec!["the".to_string()],
            unique: false,
            ..Default::default()
        };
        let extractor = config.build_extractor().unwrap();

        assert_eq!(
            extractor.extract("the spam the spam").unwrap(),
            vec!["spam", "spam"]
        );
    }

    #[test]
    fn test_limit_caps_tokens_read() {
        let config = AnalysisConfig {
            limit: Some(3),
            ..Default::default()
        };
        let extractor = config.build_extractor().unwrap();

        assert_eq!(
            extractor.extract("buy buy cheap pills now").unwrap(),
            vec!["buy", "cheap"]
        );
    }

    #[test]
    fn test_unicode_tokenizer() {
        let config = AnalysisConfig {
            tokenizer: TokenizerKind::Unicode,
            min_length: 1,
            ..Default::default()
        };
        let extractor = config.build_extractor().unwrap();

        assert_eq!(
            extractor.extract("Café déjà-vu").unwrap(),
            vec!["café", "déjà", "vu"]
        );
    }

    #[test]
    fn test_invalid_analysis_settings() {
        let config = AnalysisConfig {
            pattern: Some("(".to_string()),
            ..Default::default()
        };
        assert!(config.build_extractor().is_err());

        let config = AnalysisConfig {
            min_length: 5,
            max_length: 2,
            ..Default::default()
        };
        assert!(config.build_extractor().is_err());

        let config = AnalysisConfig {
            limit: Some(0),
            ..Default::default()
        };
        assert!(config.build_extractor().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"classifier": {{"namespace": "mail"}}, "analysis": {{"tokenizer": "whitespace"}}, "journal": {{"compaction_threshold": 8}}}}"#
        )
        .unwrap();

        let config = FalxConfig::from_file(file.path()).unwrap();
        assert_eq!(config.classifier.namespace, "mail");
        assert_eq!(config.classifier.weight, 1.0);
        assert_eq!(config.analysis.tokenizer, TokenizerKind::Whitespace);
        assert!(config.analysis.unique);
        assert_eq!(config.journal.compaction_threshold, 8);
        assert!(!config.journal.sync_writes);
    }

    #[test]
    fn test_from_file_errors() {
        assert!(FalxConfig::from_file("/nonexistent/falx.json").is_err());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"classifier": {{"weight": -1}}}}"#).unwrap();
        assert!(FalxConfig::from_file(file.path()).is_err());
    }
}

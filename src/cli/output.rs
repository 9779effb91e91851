//! Output formatting for CLI commands.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::classifier::{CategoryScore, Fallback};
use crate::cli::args::{ClassifierKind, FalxArgs, OutputFormat};
use crate::error::Result;

/// Result of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainResult {
    pub category: String,
    pub documents: usize,
    pub features: usize,
    pub duration_ms: u64,
}

/// Verdict tally of a test run.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub classifier: ClassifierKind,
    pub documents: usize,
    pub verdicts: BTreeMap<String, usize>,
    /// Documents that fell back to the default because of a recoverable
    /// error (no training data, storage failure).
    pub errors: usize,
    pub duration_ms: u64,
}

/// Verdict for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResult {
    pub classifier: ClassifierKind,
    pub verdict: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<CategoryScore>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A per-category parameter that was set.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterResult {
    pub parameter: String,
    pub category: String,
    pub value: f64,
}

/// Per-category statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub documents: u64,
    pub threshold: f64,
    pub minimum: f64,
}

/// Model statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ModelStats {
    pub namespace: String,
    pub total_documents: u64,
    pub categories: Vec<CategoryStats>,
    pub wal_records: usize,
    pub last_seq: u64,
}

/// Result of a compaction.
#[derive(Debug, Clone, Serialize)]
pub struct CompactResult {
    pub last_seq: u64,
    pub wal_records: usize,
}

/// Result of training the demonstration corpus.
#[derive(Debug, Clone, Serialize)]
pub struct SampleResult {
    pub documents: u64,
    pub categories: Vec<String>,
}

/// Human-readable rendering of a command result.
pub trait HumanReadable {
    fn render_human(&self) -> String;
}

impl HumanReadable for TrainResult {
    fn render_human(&self) -> String {
        format!(
            "Trained {} documents ({} features) as {:?} in {}ms",
            self.documents, self.features, self.category, self.duration_ms
        )
    }
}

impl HumanReadable for SampleResult {
    fn render_human(&self) -> String {
        format!(
            "Trained {} sample documents (categories: {})",
            self.documents,
            self.categories.join(", ")
        )
    }
}

impl HumanReadable for TestResult {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Test Results ({}):", self.classifier);
        let _ = writeln!(out, "═════════════════════");
        for (verdict, count) in &self.verdicts {
            let _ = writeln!(out, "{verdict}: {count}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Documents: {}", self.documents);
        if self.errors > 0 {
            let _ = writeln!(out, "Fallbacks after errors: {}", self.errors);
        }
        let _ = write!(out, "Time: {}ms", self.duration_ms);
        out
    }
}

impl HumanReadable for ClassifyResult {
    fn render_human(&self) -> String {
        let mut out = self.verdict.clone();
        match &self.fallback {
            Some(Fallback::NoCandidate) => out.push_str(" (no category qualified)"),
            Some(Fallback::Ambiguous { best, competitor }) => {
                let _ = write!(out, " ({best} too close to {competitor})");
            }
            None => {}
        }
        if let Some(error) = &self.error {
            let _ = write!(out, " ({error})");
        }
        if let Some(scores) = &self.scores {
            for score in scores {
                let _ = write!(out, "\n  {}: {:.6}", score.category, score.score);
            }
        }
        out
    }
}

impl HumanReadable for ParameterResult {
    fn render_human(&self) -> String {
        format!("{} of {:?} set to {}", self.parameter, self.category, self.value)
    }
}

impl HumanReadable for ModelStats {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model Statistics ({}):", self.namespace);
        let _ = writeln!(out, "═════════════════════");
        let _ = writeln!(out, "Total documents: {}", self.total_documents);
        for stats in &self.categories {
            let _ = writeln!(
                out,
                "  {}: {} documents (threshold {}, minimum {})",
                stats.category, stats.documents, stats.threshold, stats.minimum
            );
        }
        let _ = write!(
            out,
            "WAL records: {} (last seq {})",
            self.wal_records, self.last_seq
        );
        out
    }
}

impl HumanReadable for CompactResult {
    fn render_human(&self) -> String {
        format!("Compacted at seq {}", self.last_seq)
    }
}

/// Output a result in the format selected on the command line.
pub fn output_result<T>(message: &str, result: &T, args: &FalxArgs) -> Result<()>
where
    T: Serialize + HumanReadable,
{
    println!("{}", render_result(message, result, args)?);
    Ok(())
}

/// Render a result as it would be printed.
pub fn render_result<T>(message: &str, result: &T, args: &FalxArgs) -> Result<String>
where
    T: Serialize + HumanReadable,
{
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                Ok(format!("{message}\n\n{}", result.render_human()))
            } else {
                Ok(result.render_human())
            }
        }
        OutputFormat::Json if args.pretty => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Json => Ok(serde_json::to_string(result)?),
    }
}

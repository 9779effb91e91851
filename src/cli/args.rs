//! Command line argument parsing for the falx CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Falx - incrementally trained Bayes and Fisher text classifiers
#[derive(Parser, Debug, Clone)]
#[command(name = "falx")]
#[command(about = "Train and query naive-Bayes and Fisher text classifiers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct FalxArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Directory holding the counter store
    #[arg(long, env = "FALX_STORE", default_value = ".falx", global = true)]
    pub store: PathBuf,

    /// Configuration file (JSON)
    #[arg(long, env = "FALX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Model namespace inside the store (overrides the configuration)
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl FalxArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a category from the documents in a directory
    Train(TrainArgs),

    /// Classify a window of documents in a directory and tally the verdicts
    Test(TestArgs),

    /// Classify a single text or file
    Classify(ClassifyArgs),

    /// Set the Bayes ambiguity threshold of a category
    #[command(name = "set-threshold")]
    SetThreshold(ParameterArgs),

    /// Set the minimum Fisher score of a category
    #[command(name = "set-minimum")]
    SetMinimum(ParameterArgs),

    /// Show model statistics
    Stats,

    /// Write a snapshot and truncate the write-ahead log
    Compact,

    /// Train the built-in five-document demonstration corpus
    Sample,
}

/// Classification method.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Naive Bayes posterior
    #[default]
    Bayes,
    /// Fisher combined probability test
    Fisher,
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierKind::Bayes => write!(f, "bayes"),
            ClassifierKind::Fisher => write!(f, "fisher"),
        }
    }
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Directory of documents
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Category the documents belong to
    #[arg(short, long)]
    pub category: String,

    /// Maximum number of documents to train, in file name order
    #[arg(long, default_value = "100")]
    pub count: usize,

    /// Only read files with this extension
    #[arg(short, long, default_value = "txt")]
    pub extension: String,
}

/// Arguments for testing
#[derive(Parser, Debug, Clone)]
pub struct TestArgs {
    /// Directory of documents
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Classification method
    #[arg(short = 'm', long, default_value = "bayes")]
    pub classifier: ClassifierKind,

    /// Index of the first document, in file name order
    #[arg(short, long, default_value = "0")]
    pub start: usize,

    /// Number of documents to classify
    #[arg(long, default_value = "100")]
    pub count: usize,

    /// Verdict used when no category qualifies
    #[arg(long, default_value = "unknown")]
    pub default: String,

    /// Only read files with this extension
    #[arg(short, long, default_value = "txt")]
    pub extension: String,
}

/// Arguments for classifying one document
#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// Text to classify
    #[arg(value_name = "TEXT", required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the document from a file instead
    #[arg(long, value_name = "FILE", conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Classification method
    #[arg(short = 'm', long, default_value = "bayes")]
    pub classifier: ClassifierKind,

    /// Verdict used when no category qualifies
    #[arg(long, default_value = "unknown")]
    pub default: String,

    /// Include every category's score in the output
    #[arg(long)]
    pub explain: bool,
}

/// Arguments for setting a per-category parameter
#[derive(Parser, Debug, Clone)]
pub struct ParameterArgs {
    /// Category to configure
    #[arg(value_name = "CATEGORY")]
    pub category: String,

    /// New value
    #[arg(value_name = "VALUE", allow_negative_numbers = true)]
    pub value: f64,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}

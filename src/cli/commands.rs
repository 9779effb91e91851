//! Command implementations for the falx CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::{info, warn};
use rayon::prelude::*;

use crate::classifier::{BayesClassifier, Classifier, FisherClassifier, sample_train};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::FalxConfig;
use crate::counter_store::{CounterStore, JournaledCounterStore};
use crate::error::{FalxError, Result};
use crate::feature::FeatureExtractor;
use crate::storage::file::FileStorageConfig;
use crate::storage::{StorageConfig, StorageFactory};

/// Everything a command needs: the resolved configuration, the opened
/// counter store and the feature extractor.
pub struct Session {
    config: FalxConfig,
    store: Arc<JournaledCounterStore>,
    extractor: Arc<dyn FeatureExtractor>,
}

impl Session {
    /// Load the configuration and open the store named on the command line.
    pub fn open(args: &FalxArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => FalxConfig::from_file(path)?,
            None => FalxConfig::default(),
        };
        if let Some(namespace) = &args.namespace {
            config.classifier.namespace = namespace.clone();
        }
        config.validate()?;

        let storage = StorageFactory::create(StorageConfig::File(FileStorageConfig::new(
            &args.store,
        )))?;
        Self::with_store(
            config.clone(),
            Arc::new(JournaledCounterStore::open(storage, config.journal.clone())?),
        )
    }

    /// Build a session over an already opened store.
    pub fn with_store(config: FalxConfig, store: Arc<JournaledCounterStore>) -> Result<Self> {
        let extractor = config.analysis.build_extractor()?;
        Ok(Session {
            config,
            store,
            extractor,
        })
    }

    pub fn config(&self) -> &FalxConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<JournaledCounterStore> {
        &self.store
    }

    fn shared_store(&self) -> Arc<dyn CounterStore> {
        Arc::clone(&self.store) as Arc<dyn CounterStore>
    }

    pub fn bayes(&self) -> Result<BayesClassifier> {
        BayesClassifier::with_config(
            self.shared_store(),
            Arc::clone(&self.extractor),
            &self.config.classifier,
        )
    }

    pub fn fisher(&self) -> Result<FisherClassifier> {
        FisherClassifier::with_config(
            self.shared_store(),
            Arc::clone(&self.extractor),
            &self.config.classifier,
        )
    }

    pub fn classifier(&self, kind: ClassifierKind) -> Result<Box<dyn Classifier>> {
        Ok(match kind {
            ClassifierKind::Bayes => Box::new(self.bayes()?),
            ClassifierKind::Fisher => Box::new(self.fisher()?),
        })
    }
}

/// Execute a CLI command.
pub fn execute_command(args: FalxArgs) -> Result<()> {
    let session = Session::open(&args)?;

    match &args.command {
        Command::Train(train_args) => {
            let result = train_directory(train_args, &session)?;
            output_result("Training finished", &result, &args)
        }
        Command::Test(test_args) => {
            let result = test_directory(test_args, &session)?;
            output_result("Test finished", &result, &args)
        }
        Command::Classify(classify_args) => {
            let result = classify_document(classify_args, &session)?;
            output_result("Classification", &result, &args)
        }
        Command::SetThreshold(param_args) => {
            let result = set_threshold(param_args, &session)?;
            output_result("Threshold updated", &result, &args)
        }
        Command::SetMinimum(param_args) => {
            let result = set_minimum(param_args, &session)?;
            output_result("Minimum updated", &result, &args)
        }
        Command::Stats => {
            let result = model_stats(&session)?;
            output_result("Statistics", &result, &args)
        }
        Command::Compact => {
            let result = compact_store(&session)?;
            output_result("Compaction finished", &result, &args)
        }
        Command::Sample => {
            let result = train_sample(&session)?;
            output_result("Sample corpus trained", &result, &args)
        }
    }
}

/// List the files of `dir` ending in `.extension`, sorted by file name.
pub fn collect_documents(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_document(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read document: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Train up to `count` documents of a directory under one category.
pub fn train_directory(args: &TrainArgs, session: &Session) -> Result<TrainResult> {
    let start = Instant::now();
    let classifier = session.bayes()?;

    let files: Vec<PathBuf> = collect_documents(&args.dir, &args.extension)?
        .into_iter()
        .take(args.count)
        .collect();
    info!(
        "Training {} documents from {} as {:?}",
        files.len(),
        args.dir.display(),
        args.category
    );

    let features = files
        .par_iter()
        .map(|path| -> Result<usize> {
            let features = classifier.features(&read_document(path)?)?;
            classifier.train_features(&features, &args.category)?;
            Ok(features.len())
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    session.store().sync()?;

    Ok(TrainResult {
        category: args.category.clone(),
        documents: files.len(),
        features,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Classify a window of a directory and tally the verdicts.
///
/// Recoverable errors (no training data, storage failures) count as the
/// default verdict.
pub fn test_directory(args: &TestArgs, session: &Session) -> Result<TestResult> {
    let start = Instant::now();
    let classifier = session.classifier(args.classifier)?;

    let files: Vec<PathBuf> = collect_documents(&args.dir, &args.extension)?
        .into_iter()
        .skip(args.start)
        .take(args.count)
        .collect();

    let verdicts = files
        .par_iter()
        .map(|path| -> Result<(String, bool)> {
            let text = read_document(path)?;
            match classifier.classify(&text, &args.default) {
                Ok(verdict) => Ok((verdict, false)),
                Err(e) if e.is_recoverable() => {
                    warn!("{}: {e}, counting as {:?}", path.display(), args.default);
                    Ok((args.default.clone(), true))
                }
                Err(e) => Err(e),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tally = BTreeMap::new();
    let mut errors = 0;
    for (verdict, failed) in verdicts {
        *tally.entry(verdict).or_insert(0) += 1;
        if failed {
            errors += 1;
        }
    }

    Ok(TestResult {
        classifier: args.classifier,
        documents: files.len(),
        verdicts: tally,
        errors,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Classify one text or file.
pub fn classify_document(args: &ClassifyArgs, session: &Session) -> Result<ClassifyResult> {
    let text = match (&args.text, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_document(path)?,
        (None, None) => {
            return Err(FalxError::invalid_argument("either TEXT or --file is required"));
        }
    };

    let classifier = session.classifier(args.classifier)?;
    match classifier.decide(&text, &args.default) {
        Ok(decision) => Ok(ClassifyResult {
            classifier: args.classifier,
            verdict: decision.verdict,
            fallback: decision.fallback,
            scores: args.explain.then_some(decision.scores),
            error: None,
        }),
        Err(e) if e.is_recoverable() => {
            warn!("Classification failed, using {:?}: {e}", args.default);
            Ok(ClassifyResult {
                classifier: args.classifier,
                verdict: args.default.clone(),
                fallback: None,
                scores: None,
                error: Some(e.to_string()),
            })
        }
        Err(e) => Err(e),
    }
}

pub fn set_threshold(args: &ParameterArgs, session: &Session) -> Result<ParameterResult> {
    session.bayes()?.set_threshold(&args.category, args.value)?;
    session.store().sync()?;
    Ok(ParameterResult {
        parameter: "threshold".to_string(),
        category: args.category.clone(),
        value: args.value,
    })
}

pub fn set_minimum(args: &ParameterArgs, session: &Session) -> Result<ParameterResult> {
    session.fisher()?.set_minimum(&args.category, args.value)?;
    session.store().sync()?;
    Ok(ParameterResult {
        parameter: "minimum".to_string(),
        category: args.category.clone(),
        value: args.value,
    })
}

pub fn model_stats(session: &Session) -> Result<ModelStats> {
    let bayes = session.bayes()?;
    let fisher = session.fisher()?;
    let counter = bayes.counter();

    let mut categories = Vec::new();
    for (category, documents) in counter.category_counts()? {
        let threshold = bayes.threshold(&category)?;
        let minimum = fisher.minimum(&category)?;
        categories.push(CategoryStats {
            category,
            documents,
            threshold,
            minimum,
        });
    }
    Ok(ModelStats {
        namespace: counter.namespace().to_string(),
        total_documents: counter.total_documents()?,
        categories,
        wal_records: session.store().wal_records(),
        last_seq: session.store().last_seq(),
    })
}

pub fn compact_store(session: &Session) -> Result<CompactResult> {
    session.store().compact()?;
    Ok(CompactResult {
        last_seq: session.store().last_seq(),
        wal_records: session.store().wal_records(),
    })
}

pub fn train_sample(session: &Session) -> Result<SampleResult> {
    let classifier = session.bayes()?;
    let before = classifier.counter().total_documents()?;
    sample_train(&classifier)?;
    session.store().sync()?;

    Ok(SampleResult {
        documents: classifier.counter().total_documents()? - before,
        categories: classifier.counter().known_categories()?,
    })
}

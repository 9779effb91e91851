//! Classifier configuration.

use serde::{Deserialize, Serialize};

use crate::error::{FalxError, Result};

/// Settings shared by the Bayes and Fisher classifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Counter store namespace holding this model. Independent models can
    /// share one store under different namespaces.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Weight of the assumed probability, in pseudo-observations.
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Prior a feature is pulled towards before it has been observed.
    #[serde(default = "default_assumed_probability")]
    pub assumed_probability: f64,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_weight() -> f64 {
    1.0
}

fn default_assumed_probability() -> f64 {
    0.5
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            namespace: default_namespace(),
            weight: default_weight(),
            assumed_probability: default_assumed_probability(),
        }
    }
}

impl ClassifierConfig {
    /// Create a default configuration for `namespace`.
    pub fn with_namespace<S: Into<String>>(namespace: S) -> Self {
        ClassifierConfig {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(FalxError::invalid_config("namespace must not be empty"));
        }
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(FalxError::invalid_config(format!(
                "weight must be a positive finite number, got {}",
                self.weight
            )));
        }
        if !(0.0..=1.0).contains(&self.assumed_probability) {
            return Err(FalxError::invalid_config(format!(
                "assumed_probability must be within [0, 1], got {}",
                self.assumed_probability
            )));
        }
        Ok(())
    }
}

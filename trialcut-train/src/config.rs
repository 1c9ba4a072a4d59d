//! Configuration for the training loop.

use serde::{Deserialize, Serialize};
use trialcut_core::StudyConfig;
use trialcut_core::logging::LoggingConfig;

/// Hyperparameters of the classifier's training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetConfig {
    #[serde(default = "default_max_epochs")]
    pub max_epochs: usize,
    #[serde(default = "default_lr")]
    pub lr: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Folds for the validation split; `None` trains on everything and
    /// records no `valid_*` metrics.
    #[serde(default = "default_cv")]
    pub cv: Option<usize>,
    /// Seed for weight initialisation.
    #[serde(default)]
    pub seed: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            max_epochs: default_max_epochs(),
            lr: default_lr(),
            batch_size: default_batch_size(),
            cv: default_cv(),
            seed: 0,
        }
    }
}

fn default_max_epochs() -> usize {
    10
}

fn default_lr() -> f64 {
    0.01
}

fn default_batch_size() -> usize {
    128
}

fn default_cv() -> Option<usize> {
    Some(5)
}

/// Everything a tuning run needs, loadable with
/// [`trialcut_core::config::load_config`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub net: NetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainConfig::default();
        assert_eq!(config.net.max_epochs, 10);
        assert_eq!(config.net.lr, 0.01);
        assert_eq!(config.net.batch_size, 128);
        assert_eq!(config.net.cv, Some(5));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_json() {
        let config: NetConfig = serde_json::from_str(r#"{"max_epochs": 3, "lr": 0.02}"#).unwrap();
        assert_eq!(config.max_epochs, 3);
        assert_eq!(config.lr, 0.02);
        assert_eq!(config.cv, Some(5));
    }
}

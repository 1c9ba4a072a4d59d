//! Configuration for studies and pruners.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{Result, StudyError};
use crate::pruners::{
    DeterministicPruner, MedianPruner, NopPruner, PercentilePruner, Pruner, ThresholdPruner,
};
use crate::study::Direction;

/// Environment variable prefix, e.g. `TRIALCUT_STUDY__DIRECTION=maximize`.
pub const ENV_PREFIX: &str = "TRIALCUT_";

/// How a study is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    /// Study name (generated when unset).
    #[serde(default)]
    pub study_name: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    /// Record failing trials and continue instead of aborting `optimize`.
    #[serde(default)]
    pub catch_failures: bool,
    #[serde(default)]
    pub pruner: PrunerConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
}

/// Sampler settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Seed for reproducible suggestions.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Pruner selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrunerConfig {
    Nop,
    Deterministic {
        prune: bool,
    },
    Median {
        #[serde(default = "default_startup_trials")]
        n_startup_trials: usize,
        #[serde(default)]
        n_warmup_steps: u64,
        #[serde(default = "default_one")]
        interval_steps: u64,
        #[serde(default = "default_min_trials")]
        n_min_trials: usize,
    },
    Percentile {
        percentile: f64,
        #[serde(default = "default_startup_trials")]
        n_startup_trials: usize,
        #[serde(default)]
        n_warmup_steps: u64,
        #[serde(default = "default_one")]
        interval_steps: u64,
        #[serde(default = "default_min_trials")]
        n_min_trials: usize,
    },
    Threshold {
        #[serde(default)]
        lower: Option<f64>,
        #[serde(default)]
        upper: Option<f64>,
        #[serde(default)]
        n_warmup_steps: u64,
        #[serde(default = "default_one")]
        interval_steps: u64,
    },
}

impl Default for PrunerConfig {
    fn default() -> Self {
        Self::Median {
            n_startup_trials: default_startup_trials(),
            n_warmup_steps: 0,
            interval_steps: default_one(),
            n_min_trials: default_min_trials(),
        }
    }
}

fn default_startup_trials() -> usize {
    5
}

fn default_one() -> u64 {
    1
}

fn default_min_trials() -> usize {
    1
}

impl PrunerConfig {
    /// Instantiate the configured pruner, validating its settings.
    pub fn build(&self) -> Result<Box<dyn Pruner>> {
        let pruner: Box<dyn Pruner> = match self {
            Self::Nop => Box::new(NopPruner),
            Self::Deterministic { prune } => Box::new(DeterministicPruner::new(*prune)),
            Self::Median {
                n_startup_trials,
                n_warmup_steps,
                interval_steps,
                n_min_trials,
            } => Box::new(
                MedianPruner::new()
                    .n_startup_trials(*n_startup_trials)
                    .n_warmup_steps(*n_warmup_steps)
                    .interval_steps(*interval_steps)?
                    .n_min_trials(*n_min_trials)?,
            ),
            Self::Percentile {
                percentile,
                n_startup_trials,
                n_warmup_steps,
                interval_steps,
                n_min_trials,
            } => Box::new(
                PercentilePruner::new(*percentile)?
                    .n_startup_trials(*n_startup_trials)
                    .n_warmup_steps(*n_warmup_steps)
                    .interval_steps(*interval_steps)?
                    .n_min_trials(*n_min_trials)?,
            ),
            Self::Threshold {
                lower,
                upper,
                n_warmup_steps,
                interval_steps,
            } => Box::new(
                ThresholdPruner::new(*lower, *upper)?
                    .n_warmup_steps(*n_warmup_steps)
                    .interval_steps(*interval_steps)?,
            ),
        };
        Ok(pruner)
    }
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "trialcut", "trialcut")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".trialcut").join("config.toml")
}

/// Load a configuration of type `T` from all layers.
///
/// Precedence (lowest to highest): `T::default()`, the user config file,
/// `<workspace>/.trialcut/config.toml`, `TRIALCUT_*` environment variables
/// (nested keys separated by `__`), then `overrides`.
pub fn load_config<T>(
    workspace: Option<&Path>,
    overrides: Option<&T>,
) -> std::result::Result<T, Box<figment::Error>>
where
    T: Serialize + DeserializeOwned + Default,
{
    let mut figment = Figment::from(Serialized::defaults(T::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Write `config` as TOML to `<workspace>/.trialcut/config.toml`.
pub fn write_config<T: Serialize>(workspace: &Path, config: &T) -> Result<PathBuf> {
    let path = workspace_config_path(workspace);
    let body = toml::to_string_pretty(config).map_err(|e| StudyError::config(e.to_string()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StudyError::config(e.to_string()))?;
    }
    std::fs::write(&path, body).map_err(|e| StudyError::config(e.to_string()))?;
    Ok(path)
}

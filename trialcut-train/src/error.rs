//! Error types for the trialcut-train crate.

use thiserror::Error;
use trialcut_core::TrialPruned;

/// Errors raised while training.
#[derive(Debug, Error)]
pub enum TrainError {
    /// A callback or the net was set up wrongly, e.g. a monitored metric
    /// that the training loop never records.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The study asked to stop this trial. Not a failure.
    #[error("{0}")]
    Pruned(#[from] TrialPruned),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: usize, actual: usize },
}

impl TrainError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn is_pruned(&self) -> bool {
        matches!(self, Self::Pruned(_))
    }
}

pub type Result<T> = std::result::Result<T, TrainError>;

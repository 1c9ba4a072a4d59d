//! Error types for the trialcut-core crate.

use std::fmt;

use thiserror::Error;

/// Top-level error type for study operations.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Trial not found: {0}")]
    TrialNotFound(usize),

    #[error("Trial {0} has already finished")]
    TrialFinished(usize),

    #[error("No trials completed")]
    NoCompletedTrials,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Trial {number} failed: {source}")]
    Objective {
        number: usize,
        #[source]
        source: anyhow::Error,
    },
}

impl StudyError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type for study operations.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Signal that a trial should stop early.
///
/// This is not a failure. Training code returns it when
/// [`Trial::should_prune`](crate::Trial::should_prune) says so, and the
/// study's execution wrapper records the trial as pruned when it finds the
/// signal anywhere in the objective error's source chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialPruned {
    pub step: Option<u64>,
}

impl fmt::Display for TrialPruned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(step) => write!(f, "Trial was pruned at epoch {step}."),
            None => f.write_str("Trial was pruned."),
        }
    }
}

impl std::error::Error for TrialPruned {}

impl TrialPruned {
    pub fn new() -> Self {
        Self { step: None }
    }

    pub fn at_step(step: u64) -> Self {
        Self { step: Some(step) }
    }

    /// Whether `err` carries the pruning signal at any level of its chain.
    pub fn is_in(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| cause.is::<TrialPruned>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("training aborted")]
    struct Wrapper(#[source] TrialPruned);

    #[test]
    fn test_pruned_message() {
        assert_eq!(
            TrialPruned::at_step(3).to_string(),
            "Trial was pruned at epoch 3."
        );
        assert_eq!(TrialPruned::new().to_string(), "Trial was pruned.");
    }

    #[test]
    fn test_pruned_detected_through_source_chain() {
        let direct = anyhow::Error::from(TrialPruned::at_step(0));
        assert!(TrialPruned::is_in(&direct));

        let wrapped = anyhow::Error::from(Wrapper(TrialPruned::new()));
        assert!(TrialPruned::is_in(&wrapped));

        let context = anyhow::Error::from(TrialPruned::new()).context("epoch loop");
        assert!(TrialPruned::is_in(&context));

        let other = anyhow::anyhow!("diverged");
        assert!(!TrialPruned::is_in(&other));
    }

    #[test]
    fn test_study_error_display() {
        let err = StudyError::invalid_input("low > high");
        assert!(err.to_string().contains("Invalid input"));

        let err = StudyError::TrialFinished(2);
        assert_eq!(err.to_string(), "Trial 2 has already finished");

        let err = StudyError::Objective {
            number: 0,
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.to_string(), "Trial 0 failed: boom");
    }
}

//! Callback that lets a study prune the trial being trained.

use trialcut_core::{Trial, TrialPruned};

use crate::callbacks::{Callback, CallbackAction, monitored_value};
use crate::error::Result;
use crate::history::History;

/// Reports a monitored metric to a trial after every epoch and stops
/// training when the trial's study decides to prune it.
///
/// The step reported is the zero-based epoch index. A missing metric is a
/// [`TrainError::Configuration`](crate::TrainError::Configuration); a prune
/// decision surfaces as [`TrainError::Pruned`](crate::TrainError::Pruned),
/// which the study records as a pruned trial once the error reaches it.
///
/// ```
/// # #[cfg(feature = "nn")] {
/// use trialcut_core::pruners::DeterministicPruner;
/// use trialcut_core::{TrialState, create_study};
/// use trialcut_train::{Dataset, NeuralNetClassifier, PruningCallback};
///
/// let data = Dataset::zeros(5, 4).unwrap();
/// let study = create_study(DeterministicPruner::new(true));
/// study
///     .optimize(1, |trial| {
///         let mut net = NeuralNetClassifier::new(4, 8)
///             .callback(PruningCallback::new(trial, "valid_acc"));
///         net.fit(&data)?;
///         Ok(1.0)
///     })
///     .unwrap();
/// assert_eq!(study.trials()[0].state, TrialState::Pruned);
/// # }
/// ```
#[derive(Debug)]
pub struct PruningCallback<'t> {
    trial: &'t Trial,
    monitor: String,
}

impl<'t> PruningCallback<'t> {
    pub fn new(trial: &'t Trial, monitor: impl Into<String>) -> Self {
        Self {
            trial,
            monitor: monitor.into(),
        }
    }

    pub fn monitor(&self) -> &str {
        &self.monitor
    }
}

impl Callback for PruningCallback<'_> {
    fn name(&self) -> &str {
        "pruning"
    }

    fn on_epoch_end(&mut self, history: &History) -> Result<CallbackAction> {
        let value = monitored_value(history, &self.monitor)?;
        let step = history.len().saturating_sub(1) as u64;
        self.trial.report(value, step);
        if self.trial.should_prune() {
            tracing::info!(
                trial = self.trial.number(),
                monitor = %self.monitor,
                value,
                step,
                "Pruning trial"
            );
            return Err(TrialPruned::at_step(step).into());
        }
        Ok(CallbackAction::Continue)
    }
}

//! Pruners decide whether a running trial should stop early.
//!
//! A pruner sees the study direction, every trial recorded so far and the
//! current trial's snapshot, and answers yes or no. Decisions are pure
//! functions of that input, so the same report sequence always produces
//! the same outcome.

mod deterministic;
mod nop;
mod percentile;
mod threshold;

pub use deterministic::DeterministicPruner;
pub use nop::NopPruner;
pub use percentile::{MedianPruner, PercentilePruner};
pub use threshold::ThresholdPruner;

use crate::study::Direction;
use crate::trial::{FrozenTrial, TrialState};

/// Study state visible to a pruner.
#[derive(Debug, Clone, Copy)]
pub struct PruneContext<'a> {
    pub direction: Direction,
    pub trials: &'a [FrozenTrial],
}

impl<'a> PruneContext<'a> {
    pub fn new(direction: Direction, trials: &'a [FrozenTrial]) -> Self {
        Self { direction, trials }
    }

    pub fn completed(&self) -> impl Iterator<Item = &'a FrozenTrial> + 'a {
        self.trials
            .iter()
            .filter(|t| t.state == TrialState::Complete)
    }
}

/// Decision policy for early stopping of trials.
pub trait Pruner: Send + Sync {
    fn prune(&self, ctx: &PruneContext<'_>, trial: &FrozenTrial) -> bool;

    fn name(&self) -> &'static str;
}

impl<P: Pruner + ?Sized> Pruner for Box<P> {
    fn prune(&self, ctx: &PruneContext<'_>, trial: &FrozenTrial) -> bool {
        (**self).prune(ctx, trial)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Whether `step` is the first report at or after the latest interval
/// boundary, so checks run once per `interval_steps` window.
pub(crate) fn is_first_in_interval_step(
    step: u64,
    reported_steps: impl Iterator<Item = u64>,
    n_warmup_steps: u64,
    interval_steps: u64,
) -> bool {
    let interval = interval_steps.max(1);
    let nearest_lower = (step - n_warmup_steps) / interval * interval + n_warmup_steps;
    let second_last = reported_steps
        .filter(|&s| s != step)
        .max()
        .map(|s| s as i128)
        .unwrap_or(-1);
    second_last < nearest_lower as i128
}

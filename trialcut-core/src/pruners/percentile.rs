use super::{PruneContext, Pruner, is_first_in_interval_step};
use crate::error::{Result, StudyError};
use crate::study::Direction;
use crate::trial::FrozenTrial;

/// Prunes a trial whose best intermediate value falls outside the given
/// percentile of completed trials' values at the same step.
#[derive(Debug, Clone)]
pub struct PercentilePruner {
    percentile: f64,
    n_startup_trials: usize,
    n_warmup_steps: u64,
    interval_steps: u64,
    n_min_trials: usize,
}

impl PercentilePruner {
    pub fn new(percentile: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&percentile) {
            return Err(StudyError::invalid_input(format!(
                "percentile must be within [0, 100], got {percentile}"
            )));
        }
        Ok(Self {
            percentile,
            n_startup_trials: 5,
            n_warmup_steps: 0,
            interval_steps: 1,
            n_min_trials: 1,
        })
    }

    /// Completed trials required before any pruning happens.
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Steps at the start of each trial that are never pruned.
    pub fn n_warmup_steps(mut self, n: u64) -> Self {
        self.n_warmup_steps = n;
        self
    }

    pub fn interval_steps(mut self, n: u64) -> Result<Self> {
        if n == 0 {
            return Err(StudyError::invalid_input("interval_steps must be at least 1"));
        }
        self.interval_steps = n;
        Ok(self)
    }

    /// Completed trials that must have reported at a step before it is compared.
    pub fn n_min_trials(mut self, n: usize) -> Result<Self> {
        if n == 0 {
            return Err(StudyError::invalid_input("n_min_trials must be at least 1"));
        }
        self.n_min_trials = n;
        Ok(self)
    }

    fn percentile_at_step(&self, ctx: &PruneContext<'_>, step: u64) -> Option<f64> {
        let values: Vec<f64> = ctx
            .completed()
            .filter_map(|t| t.intermediate_values.get(&step).copied())
            .collect();
        if values.len() < self.n_min_trials {
            return None;
        }
        let q = match ctx.direction {
            Direction::Maximize => 100.0 - self.percentile,
            Direction::Minimize => self.percentile,
        };
        nan_percentile(&values, q)
    }
}

impl Pruner for PercentilePruner {
    fn prune(&self, ctx: &PruneContext<'_>, trial: &FrozenTrial) -> bool {
        let n_completed = ctx.completed().count();
        if n_completed == 0 || n_completed < self.n_startup_trials {
            return false;
        }
        let Some(step) = trial.last_step() else {
            return false;
        };
        if step < self.n_warmup_steps {
            return false;
        }
        if !is_first_in_interval_step(
            step,
            trial.intermediate_values.keys().copied(),
            self.n_warmup_steps,
            self.interval_steps,
        ) {
            return false;
        }

        let Some(best) = best_intermediate_value(trial, ctx.direction) else {
            // nothing but NaN reported
            return true;
        };
        let Some(threshold) = self.percentile_at_step(ctx, step) else {
            return false;
        };
        match ctx.direction {
            Direction::Maximize => best < threshold,
            Direction::Minimize => best > threshold,
        }
    }

    fn name(&self) -> &'static str {
        "percentile"
    }
}

/// [`PercentilePruner`] at the 50th percentile.
#[derive(Debug, Clone)]
pub struct MedianPruner(PercentilePruner);

impl MedianPruner {
    pub fn new() -> Self {
        Self(PercentilePruner {
            percentile: 50.0,
            n_startup_trials: 5,
            n_warmup_steps: 0,
            interval_steps: 1,
            n_min_trials: 1,
        })
    }

    pub fn n_startup_trials(self, n: usize) -> Self {
        Self(self.0.n_startup_trials(n))
    }

    pub fn n_warmup_steps(self, n: u64) -> Self {
        Self(self.0.n_warmup_steps(n))
    }

    pub fn interval_steps(self, n: u64) -> Result<Self> {
        Ok(Self(self.0.interval_steps(n)?))
    }

    pub fn n_min_trials(self, n: usize) -> Result<Self> {
        Ok(Self(self.0.n_min_trials(n)?))
    }
}

impl Default for MedianPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl Pruner for MedianPruner {
    fn prune(&self, ctx: &PruneContext<'_>, trial: &FrozenTrial) -> bool {
        self.0.prune(ctx, trial)
    }

    fn name(&self) -> &'static str {
        "median"
    }
}

fn best_intermediate_value(trial: &FrozenTrial, direction: Direction) -> Option<f64> {
    let finite = trial
        .intermediate_values
        .values()
        .copied()
        .filter(|v| !v.is_nan());
    match direction {
        Direction::Minimize => finite.reduce(f64::min),
        Direction::Maximize => finite.reduce(f64::max),
    }
}

/// Linear-interpolated percentile ignoring NaN; `None` when nothing is left.
pub(crate) fn nan_percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

use super::{PruneContext, Pruner, is_first_in_interval_step};
use crate::error::{Result, StudyError};
use crate::trial::FrozenTrial;

/// Prunes when the latest intermediate value leaves `[lower, upper]` or is NaN.
#[derive(Debug, Clone)]
pub struct ThresholdPruner {
    lower: f64,
    upper: f64,
    n_warmup_steps: u64,
    interval_steps: u64,
}

impl ThresholdPruner {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Result<Self> {
        if lower.is_none() && upper.is_none() {
            return Err(StudyError::invalid_input(
                "either lower or upper must be specified",
            ));
        }
        let lower = lower.unwrap_or(f64::NEG_INFINITY);
        let upper = upper.unwrap_or(f64::INFINITY);
        if lower > upper {
            return Err(StudyError::invalid_input(format!(
                "lower ({lower}) must not exceed upper ({upper})"
            )));
        }
        Ok(Self {
            lower,
            upper,
            n_warmup_steps: 0,
            interval_steps: 1,
        })
    }

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
}

impl Pruner for ThresholdPruner {
    fn prune(&self, _ctx: &PruneContext<'_>, trial: &FrozenTrial) -> bool {
        let Some(step) = trial.last_step() else {
            return false;
        };
        if step < self.n_warmup_steps
            || !is_first_in_interval_step(
                step,
                trial.intermediate_values.keys().copied(),
                self.n_warmup_steps,
                self.interval_steps,
            )
        {
            return false;
        }
        let latest = trial.intermediate_values[&step];
        latest.is_nan() || latest < self.lower || latest > self.upper
    }

    fn name(&self) -> &'static str {
        "threshold"
    }
}

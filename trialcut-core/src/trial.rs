//! Trials: the live handle given to objectives and its frozen record.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::distributions::{Distribution, ParamValue};
use crate::error::{Result, StudyError};
use crate::pruners::PruneContext;
use crate::study::StudyContext;

/// Lifecycle state of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    Running,
    Complete,
    Pruned,
    Fail,
}

impl TrialState {
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Immutable snapshot of a trial as recorded in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTrial {
    pub number: usize,
    pub state: TrialState,
    pub value: Option<f64>,
    pub params: BTreeMap<String, ParamValue>,
    pub distributions: BTreeMap<String, Distribution>,
    pub intermediate_values: BTreeMap<u64, f64>,
    pub user_attrs: BTreeMap<String, serde_json::Value>,
    pub datetime_start: DateTime<Utc>,
    pub datetime_complete: Option<DateTime<Utc>>,
}

impl FrozenTrial {
    pub fn new(number: usize) -> Self {
        Self {
            number,
            state: TrialState::Running,
            value: None,
            params: BTreeMap::new(),
            distributions: BTreeMap::new(),
            intermediate_values: BTreeMap::new(),
            user_attrs: BTreeMap::new(),
            datetime_start: Utc::now(),
            datetime_complete: None,
        }
    }

    /// Highest step with a reported intermediate value.
    pub fn last_step(&self) -> Option<u64> {
        self.intermediate_values.keys().next_back().copied()
    }

    pub fn last_intermediate_value(&self) -> Option<f64> {
        self.intermediate_values.values().next_back().copied()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.datetime_complete.map(|end| end - self.datetime_start)
    }
}

/// Live handle to a running trial.
///
/// Objectives receive `&Trial`; every method takes `&self` and writes
/// through to the study's storage, so training code can hold a shared
/// borrow for the whole run (see `PruningCallback` in trialcut-train).
#[derive(Clone)]
pub struct Trial {
    number: usize,
    ctx: Arc<StudyContext>,
}

impl std::fmt::Debug for Trial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trial").field("number", &self.number).finish()
    }
}

impl Trial {
    pub(crate) fn new(number: usize, ctx: Arc<StudyContext>) -> Self {
        Self { number, ctx }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Record an intermediate objective value at `step`.
    ///
    /// Only the first report for a step is kept; later ones are ignored.
    pub fn report(&self, value: f64, step: u64) {
        match self
            .ctx
            .storage
            .set_intermediate_value(self.number, step, value)
        {
            Ok(true) => {
                tracing::debug!(trial = self.number, step, value, "Reported intermediate value");
            }
            Ok(false) => {
                tracing::warn!(
                    trial = self.number,
                    step,
                    value,
                    "Step already reported; ignoring later value"
                );
            }
            Err(e) => {
                tracing::warn!(trial = self.number, step, error = %e, "Report rejected");
            }
        }
    }

    /// Ask the study's pruner whether this trial should stop now.
    pub fn should_prune(&self) -> bool {
        let trials = self.ctx.storage.all_trials();
        let Some(current) = trials.iter().find(|t| t.number == self.number) else {
            return false;
        };
        let ctx = PruneContext::new(self.ctx.direction, &trials);
        let decision = self.ctx.pruner.prune(&ctx, current);
        tracing::debug!(
            trial = self.number,
            pruner = self.ctx.pruner.name(),
            step = ?current.last_step(),
            decision,
            "Pruning decision"
        );
        decision
    }

    pub fn suggest_float(&self, name: &str, low: f64, high: f64) -> Result<f64> {
        let value = self.suggest(name, Distribution::float(low, high, false)?)?;
        value
            .as_float()
            .ok_or_else(|| StudyError::invalid_input(format!("{name} is not a float parameter")))
    }

    pub fn suggest_float_log(&self, name: &str, low: f64, high: f64) -> Result<f64> {
        let value = self.suggest(name, Distribution::float(low, high, true)?)?;
        value
            .as_float()
            .ok_or_else(|| StudyError::invalid_input(format!("{name} is not a float parameter")))
    }

    pub fn suggest_int(&self, name: &str, low: i64, high: i64) -> Result<i64> {
        let value = self.suggest(name, Distribution::int(low, high)?)?;
        value
            .as_int()
            .ok_or_else(|| StudyError::invalid_input(format!("{name} is not an int parameter")))
    }

    pub fn suggest_categorical<S: AsRef<str>>(&self, name: &str, choices: &[S]) -> Result<String> {
        let value = self.suggest(name, Distribution::categorical(choices)?)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                StudyError::invalid_input(format!("{name} is not a categorical parameter"))
            })
    }

    fn suggest(&self, name: &str, distribution: Distribution) -> Result<ParamValue> {
        let frozen = self.ctx.storage.trial(self.number)?;
        if let Some(existing) = frozen.params.get(name) {
            if frozen.distributions.get(name) != Some(&distribution) {
                return Err(StudyError::invalid_input(format!(
                    "{name} was already suggested from a different distribution"
                )));
            }
            return Ok(existing.clone());
        }
        let value = self.ctx.sampler.sample(&distribution);
        self.ctx
            .storage
            .set_param(self.number, name, value.clone(), distribution)?;
        tracing::debug!(trial = self.number, param = name, value = ?value, "Suggested parameter");
        Ok(value)
    }

    pub fn set_user_attr(&self, key: &str, value: impl Into<serde_json::Value>) -> Result<()> {
        self.ctx.storage.set_user_attr(self.number, key, value.into())
    }

    pub fn params(&self) -> Result<BTreeMap<String, ParamValue>> {
        Ok(self.ctx.storage.trial(self.number)?.params)
    }

    /// Current snapshot of this trial.
    pub fn frozen(&self) -> Result<FrozenTrial> {
        self.ctx.storage.trial(self.number)
    }
}

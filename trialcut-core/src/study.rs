//! Studies: run an objective over many trials and record the outcomes.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StudyConfig;
use crate::distributions::ParamValue;
use crate::error::{Result, StudyError, TrialPruned};
use crate::pruners::{MedianPruner, Pruner};
use crate::sampler::{RandomSampler, Sampler};
use crate::storage::InMemoryStorage;
use crate::trial::{FrozenTrial, Trial, TrialState};

/// Whether lower or higher objective values are better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl Direction {
    /// Whether `candidate` is strictly better than `incumbent`.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Minimize => candidate < incumbent,
            Self::Maximize => candidate > incumbent,
        }
    }
}

/// State shared between a study and the trial handles it hands out.
pub(crate) struct StudyContext {
    pub(crate) storage: InMemoryStorage,
    pub(crate) pruner: Box<dyn Pruner>,
    pub(crate) sampler: Box<dyn Sampler>,
    pub(crate) direction: Direction,
}

/// A collection of trials optimizing one objective.
pub struct Study {
    id: Uuid,
    name: String,
    catch_failures: bool,
    ctx: Arc<StudyContext>,
}

impl std::fmt::Debug for Study {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Study")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("direction", &self.ctx.direction)
            .field("pruner", &self.ctx.pruner.name())
            .field("n_trials", &self.ctx.storage.len())
            .finish()
    }
}

/// Minimizing study with the given pruner and default sampler.
pub fn create_study(pruner: impl Pruner + 'static) -> Study {
    Study::builder().pruner(pruner).build()
}

impl Study {
    pub fn builder() -> StudyBuilder {
        StudyBuilder::default()
    }

    pub fn from_config(config: &StudyConfig) -> Result<Self> {
        let mut builder = Study::builder()
            .direction(config.direction)
            .catch_failures(config.catch_failures)
            .boxed_pruner(config.pruner.build()?)
            .sampler(RandomSampler::new(config.sampler.seed));
        if let Some(name) = &config.study_name {
            builder = builder.name(name);
        }
        Ok(builder.build())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.ctx.direction
    }

    /// Start a new trial without running an objective.
    pub fn ask(&self) -> Trial {
        let number = self.ctx.storage.create_trial();
        tracing::debug!(study = %self.name, trial = number, "Trial started");
        Trial::new(number, Arc::clone(&self.ctx))
    }

    /// Finish a trial started with [`ask`](Self::ask) from the objective's outcome.
    ///
    /// The trial is recorded either way. A non-pruning error is then returned
    /// as [`StudyError::Objective`] unless the study catches failures.
    pub fn tell(&self, trial: &Trial, outcome: anyhow::Result<f64>) -> Result<FrozenTrial> {
        let (frozen, error) = self.record(trial.number(), outcome)?;
        self.surface(&frozen, error)?;
        Ok(frozen)
    }

    /// Run `objective` for `n_trials` trials.
    ///
    /// A non-pruning objective error stops the loop and is returned, unless
    /// the study catches failures.
    pub fn optimize<F>(&self, n_trials: usize, objective: F) -> Result<()>
    where
        F: FnMut(&Trial) -> anyhow::Result<f64>,
    {
        self.optimize_with(n_trials, objective, |_, _| ControlFlow::Continue(()))
    }

    /// Like [`optimize`](Self::optimize), calling `after_trial` once every
    /// trial finishes. Returning `ControlFlow::Break(())` ends the loop.
    pub fn optimize_with<F, A>(&self, n_trials: usize, mut objective: F, mut after_trial: A) -> Result<()>
    where
        F: FnMut(&Trial) -> anyhow::Result<f64>,
        A: FnMut(&Study, &FrozenTrial) -> ControlFlow<()>,
    {
        for _ in 0..n_trials {
            let trial = self.ask();
            let outcome = objective(&trial);
            let (frozen, error) = self.record(trial.number(), outcome)?;
            self.surface(&frozen, error)?;
            if after_trial(self, &frozen).is_break() {
                tracing::info!(study = %self.name, trial = frozen.number, "Optimization stopped by callback");
                break;
            }
        }
        Ok(())
    }

    fn surface(&self, frozen: &FrozenTrial, error: Option<anyhow::Error>) -> Result<()> {
        match error {
            Some(source) if !self.catch_failures => Err(StudyError::Objective {
                number: frozen.number,
                source,
            }),
            _ => Ok(()),
        }
    }

    fn record(
        &self,
        number: usize,
        outcome: anyhow::Result<f64>,
    ) -> Result<(FrozenTrial, Option<anyhow::Error>)> {
        let storage = &self.ctx.storage;
        match outcome {
            Ok(value) if value.is_nan() => {
                tracing::warn!(trial = number, "Trial failed: objective returned NaN");
                Ok((storage.finish_trial(number, TrialState::Fail, None)?, None))
            }
            Ok(value) => {
                let frozen = storage.finish_trial(number, TrialState::Complete, Some(value))?;
                tracing::info!(study = %self.name, trial = number, value, "Trial finished");
                Ok((frozen, None))
            }
            Err(e) if TrialPruned::is_in(&e) => {
                let last = storage
                    .trial(number)?
                    .intermediate_values
                    .values()
                    .rev()
                    .copied()
                    .find(|v| !v.is_nan());
                let frozen = storage.finish_trial(number, TrialState::Pruned, last)?;
                tracing::info!(
                    study = %self.name,
                    trial = number,
                    step = ?frozen.last_step(),
                    "Trial pruned"
                );
                Ok((frozen, None))
            }
            Err(e) => {
                tracing::warn!(trial = number, error = %format!("{e:#}"), "Trial failed");
                Ok((storage.finish_trial(number, TrialState::Fail, None)?, Some(e)))
            }
        }
    }

    pub fn trials(&self) -> Vec<FrozenTrial> {
        self.ctx.storage.all_trials()
    }

    pub fn trials_with_states(&self, states: &[TrialState]) -> Vec<FrozenTrial> {
        self.ctx.storage.trials_with_states(states)
    }

    pub fn n_trials(&self) -> usize {
        self.ctx.storage.len()
    }

    pub fn best_trial(&self) -> Result<FrozenTrial> {
        let direction = self.ctx.direction;
        self.trials_with_states(&[TrialState::Complete])
            .into_iter()
            .filter(|t| t.value.is_some())
            .reduce(|best, t| match (t.value, best.value) {
                (Some(v), Some(b)) if direction.is_better(v, b) => t,
                _ => best,
            })
            .ok_or(StudyError::NoCompletedTrials)
    }

    pub fn best_value(&self) -> Result<f64> {
        self.best_trial()?
            .value
            .ok_or(StudyError::NoCompletedTrials)
    }

    pub fn best_params(&self) -> Result<BTreeMap<String, ParamValue>> {
        Ok(self.best_trial()?.params)
    }
}

/// Builder for [`Study`].
pub struct StudyBuilder {
    name: Option<String>,
    direction: Direction,
    catch_failures: bool,
    pruner: Box<dyn Pruner>,
    sampler: Box<dyn Sampler>,
}

impl Default for StudyBuilder {
    fn default() -> Self {
        Self {
            name: None,
            direction: Direction::Minimize,
            catch_failures: false,
            pruner: Box::new(MedianPruner::new()),
            sampler: Box::new(RandomSampler::default()),
        }
    }
}

impl StudyBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn minimize(self) -> Self {
        self.direction(Direction::Minimize)
    }

    pub fn maximize(self) -> Self {
        self.direction(Direction::Maximize)
    }

    /// Record failing trials and keep going instead of returning the error.
    pub fn catch_failures(mut self, catch: bool) -> Self {
        self.catch_failures = catch;
        self
    }

    pub fn pruner(self, pruner: impl Pruner + 'static) -> Self {
        self.boxed_pruner(Box::new(pruner))
    }

    pub fn boxed_pruner(mut self, pruner: Box<dyn Pruner>) -> Self {
        self.pruner = pruner;
        self
    }

    pub fn sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    /// Seed the default random sampler.
    pub fn seed(self, seed: u64) -> Self {
        self.sampler(RandomSampler::new(Some(seed)))
    }

    pub fn build(self) -> Study {
        let id = Uuid::new_v4();
        let name = self.name.unwrap_or_else(|| format!("no-name-{id}"));
        tracing::debug!(study = %name, direction = ?self.direction, pruner = self.pruner.name(), "Study created");
        Study {
            id,
            name,
            catch_failures: self.catch_failures,
            ctx: Arc::new(StudyContext {
                storage: InMemoryStorage::new(),
                pruner: self.pruner,
                sampler: self.sampler,
                direction: self.direction,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pruners::{DeterministicPruner, NopPruner};

    #[test]
    fn test_complete_trial_records_value() {
        let study = create_study(NopPruner);
        study.optimize(3, |trial| Ok(trial.number() as f64)).unwrap();
        let trials = study.trials();
        assert_eq!(trials.len(), 3);
        assert!(trials.iter().all(|t| t.state == TrialState::Complete));
        assert_eq!(study.best_value().unwrap(), 0.0);
    }

    #[test]
    fn test_maximize_best_trial() {
        let study = Study::builder().maximize().pruner(NopPruner).build();
        study.optimize(4, |trial| Ok(trial.number() as f64)).unwrap();
        assert_eq!(study.best_trial().unwrap().number, 3);
    }

    #[test]
    fn test_pruned_trial_takes_last_report() {
        let study = create_study(DeterministicPruner::new(true));
        study
            .optimize(1, |trial| {
                trial.report(0.7, 0);
                if trial.should_prune() {
                    return Err(TrialPruned::at_step(0).into());
                }
                Ok(0.0)
            })
            .unwrap();
        let trial = &study.trials()[0];
        assert_eq!(trial.state, TrialState::Pruned);
        assert_eq!(trial.value, Some(0.7));
        assert!(matches!(study.best_trial(), Err(StudyError::NoCompletedTrials)));
    }

    #[test]
    fn test_failure_propagates_by_default() {
        let study = create_study(NopPruner);
        let err = study
            .optimize(3, |_| Err(anyhow::anyhow!("diverged")))
            .unwrap_err();
        assert!(matches!(err, StudyError::Objective { number: 0, .. }));
        assert_eq!(study.n_trials(), 1);
        assert_eq!(study.trials()[0].state, TrialState::Fail);
    }

    #[test]
    fn test_catch_failures_keeps_going() {
        let study = Study::builder().pruner(NopPruner).catch_failures(true).build();
        study
            .optimize(3, |trial| match trial.number() {
                1 => Err(anyhow::anyhow!("diverged")),
                n => Ok(n as f64),
            })
            .unwrap();
        let states: Vec<_> = study.trials().iter().map(|t| t.state).collect();
        assert_eq!(
            states,
            vec![TrialState::Complete, TrialState::Fail, TrialState::Complete]
        );
    }

    #[test]
    fn test_nan_objective_fails_without_error() {
        let study = create_study(NopPruner);
        study.optimize(1, |_| Ok(f64::NAN)).unwrap();
        assert_eq!(study.trials()[0].state, TrialState::Fail);
    }

    #[test]
    fn test_after_trial_can_stop() {
        let study = create_study(NopPruner);
        study
            .optimize_with(
                10,
                |trial| Ok(trial.number() as f64),
                |_, frozen| {
                    if frozen.number == 2 {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
            .unwrap();
        assert_eq!(study.n_trials(), 3);
    }

    #[test]
    fn test_ask_tell() {
        let study = Study::builder().name("manual").pruner(NopPruner).build();
        assert_eq!(study.name(), "manual");
        let trial = study.ask();
        let x = trial.suggest_float("x", -1.0, 1.0).unwrap();
        let frozen = study.tell(&trial, Ok(x * x)).unwrap();
        assert_eq!(frozen.state, TrialState::Complete);
        assert!(study.tell(&trial, Ok(0.0)).is_err());
    }

    #[test]
    fn test_tell_returns_objective_error() {
        let study = create_study(NopPruner);
        let trial = study.ask();
        let err = study
            .tell(&trial, Err(anyhow::anyhow!("diverged")))
            .unwrap_err();
        let StudyError::Objective { number, source } = err else {
            panic!("expected an objective failure");
        };
        assert_eq!(number, 0);
        assert_eq!(source.to_string(), "diverged");
        assert_eq!(study.trials()[0].state, TrialState::Fail);

        let trial = study.ask();
        let frozen = study
            .tell(&trial, Err(TrialPruned::new().into()))
            .unwrap();
        assert_eq!(frozen.state, TrialState::Pruned);
    }

    #[test]
    fn test_tell_with_catch_failures_records_only() {
        let study = Study::builder().pruner(NopPruner).catch_failures(true).build();
        let trial = study.ask();
        let frozen = study
            .tell(&trial, Err(anyhow::anyhow!("diverged")))
            .unwrap();
        assert_eq!(frozen.state, TrialState::Fail);
    }

    #[test]
    fn test_direction_is_better() {
        assert!(Direction::Minimize.is_better(1.0, 2.0));
        assert!(Direction::Maximize.is_better(2.0, 1.0));
        assert!(!Direction::Maximize.is_better(1.0, 1.0));
    }
}

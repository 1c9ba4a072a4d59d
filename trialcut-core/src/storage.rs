//! In-memory trial storage shared between a study and its live trials.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::distributions::{Distribution, ParamValue};
use crate::error::{Result, StudyError};
use crate::trial::{FrozenTrial, TrialState};

/// Trial records for one study, indexed by trial number.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    trials: RwLock<Vec<FrozenTrial>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<FrozenTrial>> {
        self.trials.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<FrozenTrial>> {
        self.trials.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a new running trial and return its number.
    pub fn create_trial(&self) -> usize {
        let mut trials = self.write();
        let number = trials.len();
        trials.push(FrozenTrial::new(number));
        number
    }

    fn with_running<T>(
        &self,
        number: usize,
        f: impl FnOnce(&mut FrozenTrial) -> T,
    ) -> Result<T> {
        let mut trials = self.write();
        let trial = trials
            .get_mut(number)
            .ok_or(StudyError::TrialNotFound(number))?;
        if trial.state.is_finished() {
            return Err(StudyError::TrialFinished(number));
        }
        Ok(f(trial))
    }

    /// Record an intermediate value. Returns `false` when `step` was
    /// already reported, in which case the stored value is left untouched.
    pub fn set_intermediate_value(&self, number: usize, step: u64, value: f64) -> Result<bool> {
        self.with_running(number, |trial| {
            if trial.intermediate_values.contains_key(&step) {
                false
            } else {
                trial.intermediate_values.insert(step, value);
                true
            }
        })
    }

    pub fn set_param(
        &self,
        number: usize,
        name: &str,
        value: ParamValue,
        distribution: Distribution,
    ) -> Result<()> {
        self.with_running(number, |trial| {
            trial.params.insert(name.to_string(), value);
            trial.distributions.insert(name.to_string(), distribution);
        })
    }

    pub fn set_user_attr(&self, number: usize, key: &str, value: serde_json::Value) -> Result<()> {
        self.with_running(number, |trial| {
            trial.user_attrs.insert(key.to_string(), value);
        })
    }

    /// Move a running trial into a terminal state.
    pub fn finish_trial(
        &self,
        number: usize,
        state: TrialState,
        value: Option<f64>,
    ) -> Result<FrozenTrial> {
        if !state.is_finished() {
            return Err(StudyError::invalid_input(
                "a trial can only be finished with a terminal state",
            ));
        }
        self.with_running(number, |trial| {
            trial.state = state;
            trial.value = value;
            trial.datetime_complete = Some(Utc::now());
            trial.clone()
        })
    }

    pub fn trial(&self, number: usize) -> Result<FrozenTrial> {
        self.read()
            .get(number)
            .cloned()
            .ok_or(StudyError::TrialNotFound(number))
    }

    pub fn all_trials(&self) -> Vec<FrozenTrial> {
        self.read().clone()
    }

    pub fn trials_with_states(&self, states: &[TrialState]) -> Vec<FrozenTrial> {
        self.read()
            .iter()
            .filter(|t| states.contains(&t.state))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_finish() {
        let storage = InMemoryStorage::new();
        assert!(storage.is_empty());
        let n0 = storage.create_trial();
        let n1 = storage.create_trial();
        assert_eq!((n0, n1), (0, 1));

        let done = storage
            .finish_trial(n0, TrialState::Complete, Some(1.5))
            .unwrap();
        assert_eq!(done.state, TrialState::Complete);
        assert!(done.datetime_complete.is_some());

        let running = storage.trials_with_states(&[TrialState::Running]);
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].number, 1);
    }

    #[test]
    fn test_finished_trial_is_read_only() {
        let storage = InMemoryStorage::new();
        let n = storage.create_trial();
        storage.finish_trial(n, TrialState::Pruned, None).unwrap();
        assert!(matches!(
            storage.set_intermediate_value(n, 0, 1.0),
            Err(StudyError::TrialFinished(0))
        ));
        assert!(storage.finish_trial(n, TrialState::Complete, None).is_err());
    }

    #[test]
    fn test_running_is_not_terminal() {
        let storage = InMemoryStorage::new();
        let n = storage.create_trial();
        assert!(storage.finish_trial(n, TrialState::Running, None).is_err());
    }

    #[test]
    fn test_unknown_trial() {
        let storage = InMemoryStorage::new();
        assert!(matches!(storage.trial(4), Err(StudyError::TrialNotFound(4))));
    }
}

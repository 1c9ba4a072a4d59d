//! Property-based tests for pruning decisions using proptest.

use proptest::prelude::*;

use trialcut_core::pruners::{DeterministicPruner, MedianPruner, PruneContext, Pruner};
use trialcut_core::{Direction, FrozenTrial, Study, TrialState};

fn frozen(number: usize, state: TrialState, values: &[f64]) -> FrozenTrial {
    let mut t = FrozenTrial::new(number);
    t.state = state;
    t.intermediate_values = values
        .iter()
        .enumerate()
        .map(|(step, v)| (step as u64, *v))
        .collect();
    t
}

fn curve() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-100.0f64..100.0, 1..12)
}

// --- Deterministic pruner ---

proptest! {
    #[test]
    fn deterministic_pruner_ignores_values(values in curve(), decision in any::<bool>()) {
        let trials = vec![frozen(0, TrialState::Running, &values)];
        let ctx = PruneContext::new(Direction::Minimize, &trials);
        prop_assert_eq!(DeterministicPruner::new(decision).prune(&ctx, &trials[0]), decision);
    }

    #[test]
    fn deterministic_pruner_decides_at_first_check(decision in any::<bool>(), values in curve()) {
        let study = Study::builder().pruner(DeterministicPruner::new(decision)).build();
        let trial = study.ask();
        let mut checks = 0;
        for (step, v) in values.iter().enumerate() {
            trial.report(*v, step as u64);
            checks += 1;
            if trial.should_prune() {
                break;
            }
        }
        prop_assert_eq!(checks == 1, decision || values.len() == 1);
    }
}

// --- Median pruner ---

proptest! {
    #[test]
    fn median_decision_is_deterministic(
        completed in prop::collection::vec(curve(), 1..6),
        current in curve(),
    ) {
        let mut trials: Vec<_> = completed
            .iter()
            .enumerate()
            .map(|(i, c)| frozen(i, TrialState::Complete, c))
            .collect();
        trials.push(frozen(trials.len(), TrialState::Running, &current));
        let ctx = PruneContext::new(Direction::Minimize, &trials);
        let pruner = MedianPruner::new().n_startup_trials(0);
        let last = trials.last().unwrap();
        prop_assert_eq!(pruner.prune(&ctx, last), pruner.prune(&ctx, last));
    }

    #[test]
    fn median_never_prunes_the_leader(
        completed in prop::collection::vec(prop::collection::vec(0.0f64..100.0, 4), 1..6),
        offset in 0.0f64..10.0,
    ) {
        // current trial is below every completed value at every step
        let current: Vec<f64> = (0..4).map(|_| -offset - 1.0).collect();
        let mut trials: Vec<_> = completed
            .iter()
            .enumerate()
            .map(|(i, c)| frozen(i, TrialState::Complete, c))
            .collect();
        trials.push(frozen(trials.len(), TrialState::Running, &current));
        let ctx = PruneContext::new(Direction::Minimize, &trials);
        let pruner = MedianPruner::new().n_startup_trials(0);
        prop_assert!(!pruner.prune(&ctx, trials.last().unwrap()));
    }

    #[test]
    fn duplicate_reports_do_not_change_decision(values in curve(), repeat in 1usize..4) {
        let decide = |repeats: usize| {
            let study = Study::builder()
                .pruner(MedianPruner::new().n_startup_trials(0))
                .build();
            let baseline = study.ask();
            baseline.report(0.0, 0);
            study.tell(&baseline, Ok(0.0)).unwrap();

            let trial = study.ask();
            let mut decisions = Vec::new();
            for (step, v) in values.iter().enumerate() {
                for _ in 0..repeats {
                    trial.report(*v, step as u64);
                }
                decisions.push(trial.should_prune());
            }
            decisions
        };
        prop_assert_eq!(decide(1), decide(repeat));
    }
}

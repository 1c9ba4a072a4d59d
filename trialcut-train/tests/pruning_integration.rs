//! End-to-end tests: a study drives real training runs through the pruning callback.

#![cfg(feature = "nn")]

use pretty_assertions::assert_eq;
use trialcut_core::config::PrunerConfig;
use trialcut_core::logging::{LoggingConfig, init_logging};
use trialcut_core::pruners::{DeterministicPruner, MedianPruner};
use trialcut_core::{Study, StudyError, Trial, TrialState, create_study};
use trialcut_train::{Dataset, NeuralNetClassifier, PruningCallback, TrainConfig, TrainError};

fn setup() -> Dataset {
    init_logging(&LoggingConfig {
        level: "debug".into(),
        ..LoggingConfig::default()
    });
    // 5 samples, 4 features, every label 0
    Dataset::zeros(5, 4).unwrap()
}

fn objective<'d>(
    data: &'d Dataset,
    monitor: &'d str,
) -> impl FnMut(&Trial) -> anyhow::Result<f64> + 'd {
    move |trial: &Trial| {
        let mut net = NeuralNetClassifier::new(4, 8)
            .max_epochs(10)
            .lr(0.02)
            .callback(PruningCallback::new(trial, monitor));
        net.fit(data)?;
        Ok(1.0)
    }
}

#[test]
fn always_prune_stops_after_first_epoch() {
    let data = setup();
    let study = create_study(DeterministicPruner::new(true));
    study.optimize(1, objective(&data, "valid_acc")).unwrap();

    let trials = study.trials();
    assert_eq!(trials.len(), 1);
    assert_eq!(trials[0].state, TrialState::Pruned);
    assert_eq!(trials[0].intermediate_values.len(), 1);
    assert_eq!(trials[0].last_step(), Some(0));
}

#[test]
fn never_prune_completes_with_objective_value() {
    let data = setup();
    let study = create_study(DeterministicPruner::new(false));
    study.optimize(1, objective(&data, "valid_acc")).unwrap();

    let trial = &study.trials()[0];
    assert_eq!(trial.state, TrialState::Complete);
    assert_eq!(trial.value, Some(1.0));
    assert_eq!(trial.intermediate_values.len(), 10);
    assert_eq!(study.best_value().unwrap(), 1.0);
}

#[test]
fn misnamed_monitor_fails_the_trial() {
    let data = setup();
    let study = create_study(DeterministicPruner::new(true));
    let err = study
        .optimize(1, objective(&data, "valid_accuracy"))
        .unwrap_err();

    let StudyError::Objective { number, source } = err else {
        panic!("expected an objective failure");
    };
    assert_eq!(number, 0);
    assert!(matches!(
        source.downcast_ref::<TrainError>(),
        Some(TrainError::Configuration(_))
    ));
    let trial = &study.trials()[0];
    assert_eq!(trial.state, TrialState::Fail);
    assert!(trial.intermediate_values.is_empty());
}

#[test]
fn same_inputs_same_outcome() {
    let data = setup();
    let run = |prune: bool| {
        let study = create_study(DeterministicPruner::new(prune));
        study.optimize(2, objective(&data, "valid_acc")).unwrap();
        study
            .trials()
            .into_iter()
            .map(|t| (t.state, t.intermediate_values))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(true), run(true));
    assert_eq!(run(false), run(false));
}

#[test]
fn median_pruner_over_a_small_sweep() {
    let data = setup();
    let study = Study::builder()
        .maximize()
        .seed(13)
        .pruner(MedianPruner::new().n_startup_trials(2))
        .build();
    study
        .optimize(6, |trial| {
            let lr = trial.suggest_float_log("lr", 1e-3, 1.0)?;
            let mut net = NeuralNetClassifier::new(4, 8)
                .max_epochs(5)
                .lr(lr)
                .callback(PruningCallback::new(trial, "valid_acc"));
            let history = net.fit(&data)?;
            Ok(history.last_value("valid_acc").unwrap_or(0.0))
        })
        .unwrap();

    let trials = study.trials();
    assert_eq!(trials.len(), 6);
    assert!(trials.iter().all(|t| t.state.is_finished()));
    assert!(trials[..2].iter().all(|t| t.state == TrialState::Complete));
    assert!(study.best_params().unwrap().contains_key("lr"));
}

#[test]
fn config_driven_run() {
    let data = setup();
    let mut config = TrainConfig::default();
    config.study.pruner = PrunerConfig::Deterministic { prune: true };
    config.net.lr = 0.02;

    let study = Study::from_config(&config.study).unwrap();
    study
        .optimize(1, |trial| {
            let mut net = NeuralNetClassifier::from_config(4, 8, &config.net)?
                .callback(PruningCallback::new(trial, "valid_acc"));
            net.fit(&data)?;
            Ok(1.0)
        })
        .unwrap();
    assert_eq!(study.trials()[0].state, TrialState::Pruned);
}

//! Epoch-based training loop for a linear classifier.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::callbacks::{Callback, CallbackAction};
use crate::config::NetConfig;
use crate::data::{Dataset, ValidSplit};
use crate::error::{Result, TrainError};
use crate::history::History;
use crate::model::Linear;

/// Linear softmax classifier with mini-batch SGD and epoch callbacks.
///
/// Each epoch records `epoch` (1-based), `train_loss`, `dur` and, when a
/// validation split is configured, `valid_loss` and `valid_acc`. Callbacks
/// run in registration order after the row is appended.
pub struct NeuralNetClassifier<'a> {
    module: Linear,
    max_epochs: usize,
    lr: f64,
    batch_size: usize,
    train_split: Option<ValidSplit>,
    seed: u64,
    callbacks: Vec<Box<dyn Callback + 'a>>,
    history: History,
}

impl std::fmt::Debug for NeuralNetClassifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let callbacks: Vec<&str> = self.callbacks.iter().map(|cb| cb.name()).collect();
        f.debug_struct("NeuralNetClassifier")
            .field("in_features", &self.module.in_features())
            .field("n_classes", &self.module.out_features())
            .field("max_epochs", &self.max_epochs)
            .field("lr", &self.lr)
            .field("batch_size", &self.batch_size)
            .field("train_split", &self.train_split)
            .field("callbacks", &callbacks)
            .finish()
    }
}

impl<'a> NeuralNetClassifier<'a> {
    pub fn new(n_features: usize, n_classes: usize) -> Self {
        Self {
            module: Linear::new(n_features, n_classes, 0),
            max_epochs: 10,
            lr: 0.01,
            batch_size: 128,
            train_split: Some(ValidSplit::default()),
            seed: 0,
            callbacks: Vec::new(),
            history: History::new(),
        }
    }

    pub fn from_config(n_features: usize, n_classes: usize, config: &NetConfig) -> Result<Self> {
        let train_split = config.cv.map(ValidSplit::new).transpose()?;
        Ok(Self::new(n_features, n_classes)
            .max_epochs(config.max_epochs)
            .lr(config.lr)
            .batch_size(config.batch_size)
            .train_split(train_split)
            .seed(config.seed))
    }

    pub fn max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn train_split(mut self, split: Option<ValidSplit>) -> Self {
        self.train_split = split;
        self
    }

    /// Re-initialise the weights from `seed`.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.module = Linear::new(self.module.in_features(), self.module.out_features(), seed);
        self
    }

    pub fn callback(mut self, callback: impl Callback + 'a) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn module(&self) -> &Linear {
        &self.module
    }

    fn validate(&self, data: &Dataset) -> Result<()> {
        if data.n_features() != self.module.in_features() {
            return Err(TrainError::Shape {
                expected: self.module.in_features(),
                actual: data.n_features(),
            });
        }
        let n_classes = self.module.out_features();
        if let Some(label) = data.labels().iter().find(|&&l| l >= n_classes) {
            return Err(TrainError::invalid_input(format!(
                "label {label} out of range for {n_classes} classes"
            )));
        }
        Ok(())
    }

    /// Train from freshly initialised weights; history is reset.
    ///
    /// Returns early with the callback's error if any callback fails,
    /// including when a pruning callback stops the trial.
    pub fn fit(&mut self, data: &Dataset) -> Result<&History> {
        self.validate(data)?;
        self.module = Linear::new(self.module.in_features(), self.module.out_features(), self.seed);
        self.history.clear();

        let (train, valid) = match &self.train_split {
            Some(split) => {
                let (train, valid) = split.split(data)?;
                (train, Some(valid))
            }
            None => (data.clone(), None),
        };

        for cb in &mut self.callbacks {
            cb.on_train_begin()?;
        }

        for epoch in 1..=self.max_epochs {
            let started = Instant::now();
            let train_loss = self.train_epoch(&train)?;

            let mut row = BTreeMap::from([
                ("epoch".to_string(), epoch as f64),
                ("train_loss".to_string(), train_loss),
            ]);
            if let Some(valid) = &valid {
                let (valid_loss, valid_acc) = self.evaluate(valid)?;
                row.insert("valid_loss".to_string(), valid_loss);
                row.insert("valid_acc".to_string(), valid_acc);
            }
            row.insert("dur".to_string(), started.elapsed().as_secs_f64());
            tracing::debug!(epoch, ?row, "Epoch finished");
            self.history.push(row);

            let mut stop = false;
            for cb in &mut self.callbacks {
                if cb.on_epoch_end(&self.history)? == CallbackAction::Stop {
                    tracing::info!(epoch, callback = cb.name(), "Training stopped by callback");
                    stop = true;
                    break;
                }
            }
            if stop {
                break;
            }
        }

        for cb in &mut self.callbacks {
            cb.on_train_end(&self.history)?;
        }
        tracing::info!(epochs = self.history.len(), "Training finished");
        Ok(&self.history)
    }

    /// One pass of mini-batch SGD in dataset order; returns mean sample loss.
    fn train_epoch(&mut self, train: &Dataset) -> Result<f64> {
        let mut total = 0.0;
        let rows = train.features().chunks(self.batch_size);
        let labels = train.labels().chunks(self.batch_size);
        for (xs, ys) in rows.zip(labels) {
            let mut grads = self.module.zero_grad();
            for (x, &y) in xs.iter().zip(ys) {
                total += self.module.loss_and_grad(x, y, &mut grads)?;
            }
            self.module.sgd_step(&grads, self.lr);
        }
        Ok(total / train.len() as f64)
    }

    /// Mean loss and accuracy on `valid`.
    fn evaluate(&self, valid: &Dataset) -> Result<(f64, f64)> {
        let mut loss = 0.0;
        let mut correct = 0usize;
        for (x, &y) in valid.features().iter().zip(valid.labels()) {
            loss += self.module.loss(x, y)?;
            if self.module.predict(x)? == y {
                correct += 1;
            }
        }
        let n = valid.len() as f64;
        Ok((loss / n, correct as f64 / n))
    }

    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<usize>> {
        features.iter().map(|x| self.module.predict(x)).collect()
    }
}

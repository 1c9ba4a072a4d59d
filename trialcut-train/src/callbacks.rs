//! Training callbacks: early stopping, anomaly detection.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};
use crate::history::History;

/// Action a callback can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Continue,
    Stop,
}

/// Hooks invoked by the training loop.
///
/// An `Err` from any hook aborts training and is returned from `fit`.
/// Returning [`CallbackAction::Stop`] ends training normally.
pub trait Callback: Send {
    fn name(&self) -> &str;

    fn on_train_begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called after each epoch's metrics are appended to `history`.
    fn on_epoch_end(&mut self, history: &History) -> Result<CallbackAction>;

    fn on_train_end(&mut self, _history: &History) -> Result<()> {
        Ok(())
    }
}

/// Read `monitor` from the latest epoch, failing loudly when it is absent.
pub(crate) fn monitored_value(history: &History, monitor: &str) -> Result<f64> {
    history.last_value(monitor).ok_or_else(|| {
        let recorded: Vec<&str> = history
            .last()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default();
        TrainError::configuration(format!(
            "monitored metric {monitor:?} is not recorded (available: {recorded:?})"
        ))
    })
}

/// Stops training when `monitor` has not improved for `patience` epochs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyStopping {
    pub monitor: String,
    pub patience: usize,
    pub threshold: f64,
    pub lower_is_better: bool,
    #[serde(skip)]
    counter: usize,
    #[serde(skip)]
    best: Option<f64>,
}

impl EarlyStopping {
    pub fn new(monitor: impl Into<String>, patience: usize) -> Self {
        Self {
            monitor: monitor.into(),
            patience,
            threshold: 1e-4,
            lower_is_better: true,
            counter: 0,
            best: None,
        }
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn higher_is_better(mut self) -> Self {
        self.lower_is_better = false;
        self
    }

    fn observe(&mut self, value: f64) -> CallbackAction {
        let improved = match self.best {
            None => true,
            Some(best) if self.lower_is_better => value < best - self.threshold,
            Some(best) => value > best + self.threshold,
        };
        if improved {
            self.best = Some(value);
            self.counter = 0;
            return CallbackAction::Continue;
        }
        self.counter += 1;
        if self.counter >= self.patience {
            tracing::info!(
                monitor = %self.monitor,
                patience = self.patience,
                best = ?self.best,
                "Stopping early: no improvement"
            );
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self::new("valid_loss", 5)
    }
}

impl Callback for EarlyStopping {
    fn name(&self) -> &str {
        "early_stopping"
    }

    fn on_train_begin(&mut self) -> Result<()> {
        self.counter = 0;
        self.best = None;
        Ok(())
    }

    fn on_epoch_end(&mut self, history: &History) -> Result<CallbackAction> {
        let value = monitored_value(history, &self.monitor)?;
        Ok(self.observe(value))
    }
}

/// Stops training on a non-finite metric or a spike above
/// `threshold` times the recent mean.
#[derive(Debug, Clone)]
pub struct AnomalyDetection {
    pub monitor: String,
    pub threshold: f64,
    window: Vec<f64>,
    window_size: usize,
}

impl AnomalyDetection {
    pub fn new(monitor: impl Into<String>, threshold: f64, window_size: usize) -> Self {
        Self {
            monitor: monitor.into(),
            threshold,
            window: Vec::new(),
            window_size,
        }
    }

    fn observe(&mut self, value: f64) -> CallbackAction {
        if !value.is_finite() {
            tracing::warn!(monitor = %self.monitor, value, "Non-finite metric");
            return CallbackAction::Stop;
        }

        self.window.push(value);
        if self.window.len() > self.window_size {
            self.window.remove(0);
        }

        // spike: > threshold * mean
        if self.window.len() >= 3 {
            let mean = self.window.iter().sum::<f64>() / self.window.len() as f64;
            if value > mean * self.threshold {
                tracing::warn!(monitor = %self.monitor, value, mean, "Metric spike");
                return CallbackAction::Stop;
            }
        }

        CallbackAction::Continue
    }
}

impl Default for AnomalyDetection {
    fn default() -> Self {
        Self::new("train_loss", 3.0, 5)
    }
}

impl Callback for AnomalyDetection {
    fn name(&self) -> &str {
        "anomaly_detection"
    }

    fn on_train_begin(&mut self) -> Result<()> {
        self.window.clear();
        Ok(())
    }

    fn on_epoch_end(&mut self, history: &History) -> Result<CallbackAction> {
        let value = monitored_value(history, &self.monitor)?;
        Ok(self.observe(value))
    }
}

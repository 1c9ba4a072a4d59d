//! # trialcut-train: training loop with study-driven pruning
//!
//! A small epoch-based training framework: datasets with a stratified
//! validation split, a linear softmax classifier, a per-epoch metric
//! [`History`], and [`Callback`]s invoked at every epoch boundary.
//!
//! [`PruningCallback`] bridges the training loop to a `trialcut-core`
//! study: it reports the monitored metric to the running trial and aborts
//! training with the `TrialPruned` signal when the study's pruner says so.

pub mod callbacks;
pub mod config;
pub mod data;
pub mod error;
pub mod history;
#[cfg(feature = "nn")]
pub mod model;
#[cfg(feature = "nn")]
pub mod net;
pub mod pruning;

pub use callbacks::{AnomalyDetection, Callback, CallbackAction, EarlyStopping};
pub use config::{NetConfig, TrainConfig};
pub use data::{Dataset, ValidSplit};
pub use error::{Result, TrainError};
pub use history::History;
#[cfg(feature = "nn")]
pub use net::NeuralNetClassifier;
pub use pruning::PruningCallback;

//! # trialcut-core: studies, trials and pruners
//!
//! A [`Study`] runs an objective function once per trial. Inside the
//! objective, the live [`Trial`] handle suggests hyperparameters, reports
//! intermediate values and asks the study's [`Pruner`] whether the run
//! should stop early. Returning the [`TrialPruned`] signal from the
//! objective (directly or anywhere in an error's source chain) records the
//! trial as [`TrialState::Pruned`] instead of failed.
//!
//! ```
//! use trialcut_core::pruners::DeterministicPruner;
//! use trialcut_core::{Study, TrialPruned, TrialState};
//!
//! let study = Study::builder().pruner(DeterministicPruner::new(true)).build();
//! study
//!     .optimize(1, |trial| {
//!         for step in 0..10 {
//!             trial.report(1.0 / (step + 1) as f64, step);
//!             if trial.should_prune() {
//!                 return Err(TrialPruned::at_step(step).into());
//!             }
//!         }
//!         Ok(0.0)
//!     })
//!     .unwrap();
//! assert_eq!(study.trials()[0].state, TrialState::Pruned);
//! ```

pub mod config;
pub mod distributions;
pub mod error;
pub mod logging;
pub mod pruners;
pub mod sampler;
pub mod storage;
pub mod study;
pub mod trial;

pub use config::StudyConfig;
pub use distributions::{Distribution, ParamValue};
pub use error::{Result, StudyError, TrialPruned};
pub use pruners::Pruner;
pub use sampler::{RandomSampler, Sampler};
pub use study::{Direction, Study, StudyBuilder, create_study};
pub use trial::{FrozenTrial, Trial, TrialState};

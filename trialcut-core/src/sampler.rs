//! Parameter samplers.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::distributions::{Distribution, ParamValue};

/// Draws parameter values for new suggestions.
pub trait Sampler: Send + Sync {
    fn sample(&self, distribution: &Distribution) -> ParamValue;
}

/// Independent uniform sampling, optionally seeded.
#[derive(Debug)]
pub struct RandomSampler {
    rng: Mutex<StdRng>,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Sampler for RandomSampler {
    fn sample(&self, distribution: &Distribution) -> ParamValue {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        match distribution {
            Distribution::Float { low, high, .. } if low == high => ParamValue::Float(*low),
            Distribution::Float { low, high, log: true } => {
                let v = rng.gen_range(low.ln()..high.ln()).exp();
                ParamValue::Float(v.clamp(*low, *high))
            }
            Distribution::Float { low, high, log: false } => {
                ParamValue::Float(rng.gen_range(*low..*high))
            }
            Distribution::Int { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
            Distribution::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParamValue::Categorical(choices[idx].clone())
            }
        }
    }
}

//! A single linear layer trained with softmax cross-entropy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, TrainError};

/// Fully connected layer `y = W x + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    in_features: usize,
    out_features: usize,
    /// Row-major `out_features x in_features`.
    weights: Vec<f64>,
    bias: Vec<f64>,
}

/// Accumulated gradients for one batch.
#[derive(Debug, Clone)]
pub struct Gradients {
    weights: Vec<f64>,
    bias: Vec<f64>,
    n: usize,
}

impl Linear {
    /// Weights and bias drawn uniformly from `±1/sqrt(in_features)`.
    pub fn new(in_features: usize, out_features: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 1.0 / (in_features.max(1) as f64).sqrt();
        let weights = (0..in_features * out_features)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let bias = (0..out_features)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        Self {
            in_features,
            out_features,
            weights,
            bias,
        }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn forward(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.in_features {
            return Err(TrainError::Shape {
                expected: self.in_features,
                actual: x.len(),
            });
        }
        Ok(self
            .weights
            .chunks(self.in_features)
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + b)
            .collect())
    }

    /// Cross-entropy loss for one sample; accumulates its gradient into `grads`.
    pub fn loss_and_grad(&self, x: &[f64], label: usize, grads: &mut Gradients) -> Result<f64> {
        let probs = self.predict_proba(x)?;
        let p = probs
            .get(label)
            .copied()
            .ok_or_else(|| {
                TrainError::invalid_input(format!(
                    "label {label} out of range for {} classes",
                    self.out_features
                ))
            })?;
        for (k, pk) in probs.iter().enumerate() {
            let g = pk - if k == label { 1.0 } else { 0.0 };
            grads.bias[k] += g;
            let row = &mut grads.weights[k * self.in_features..(k + 1) * self.in_features];
            for (gw, xi) in row.iter_mut().zip(x) {
                *gw += g * xi;
            }
        }
        grads.n += 1;
        Ok(-p.max(f64::MIN_POSITIVE).ln())
    }

    /// Cross-entropy loss for one sample without touching gradients.
    pub fn loss(&self, x: &[f64], label: usize) -> Result<f64> {
        let probs = self.predict_proba(x)?;
        let p = probs.get(label).copied().ok_or_else(|| {
            TrainError::invalid_input(format!(
                "label {label} out of range for {} classes",
                self.out_features
            ))
        })?;
        Ok(-p.max(f64::MIN_POSITIVE).ln())
    }

    pub fn zero_grad(&self) -> Gradients {
        Gradients {
            weights: vec![0.0; self.weights.len()],
            bias: vec![0.0; self.bias.len()],
            n: 0,
        }
    }

    /// Plain SGD on the batch-mean gradient.
    pub fn sgd_step(&mut self, grads: &Gradients, lr: f64) {
        if grads.n == 0 {
            return;
        }
        let scale = lr / grads.n as f64;
        for (w, g) in self.weights.iter_mut().zip(&grads.weights) {
            *w -= scale * g;
        }
        for (b, g) in self.bias.iter_mut().zip(&grads.bias) {
            *b -= scale * g;
        }
    }

    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>> {
        Ok(softmax(&self.forward(x)?))
    }

    pub fn predict(&self, x: &[f64]) -> Result<usize> {
        let logits = self.forward(x)?;
        Ok(logits
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap_or(0))
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_seeded_and_bounded() {
        let a = Linear::new(4, 8, 0);
        let b = Linear::new(4, 8, 0);
        assert_eq!(a, b);
        assert!(a.weights.iter().all(|w| w.abs() <= 0.5));
        assert_ne!(a, Linear::new(4, 8, 1));
    }

    #[test]
    fn test_forward_shape() {
        let layer = Linear::new(4, 8, 0);
        assert_eq!(layer.forward(&[0.0; 4]).unwrap().len(), 8);
        assert!(matches!(
            layer.forward(&[0.0; 3]),
            Err(TrainError::Shape {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_sgd_reduces_loss() {
        let mut layer = Linear::new(2, 3, 7);
        let x = [1.0, -1.0];
        let before = layer.loss(&x, 2).unwrap();
        for _ in 0..50 {
            let mut grads = layer.zero_grad();
            layer.loss_and_grad(&x, 2, &mut grads).unwrap();
            layer.sgd_step(&grads, 0.5);
        }
        assert!(layer.loss(&x, 2).unwrap() < before);
        assert_eq!(layer.predict(&x).unwrap(), 2);
    }

    #[test]
    fn test_label_out_of_range() {
        let layer = Linear::new(2, 2, 0);
        let mut grads = layer.zero_grad();
        assert!(layer.loss_and_grad(&[0.0, 0.0], 5, &mut grads).is_err());
    }
}

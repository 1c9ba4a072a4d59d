//! Datasets and the train/validation split.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};

/// Dense feature rows with integer class labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self> {
        if features.is_empty() {
            return Err(TrainError::invalid_input("dataset is empty"));
        }
        if features.len() != labels.len() {
            return Err(TrainError::Shape {
                expected: features.len(),
                actual: labels.len(),
            });
        }
        let width = features[0].len();
        if width == 0 {
            return Err(TrainError::invalid_input("samples have no features"));
        }
        if let Some(row) = features.iter().find(|row| row.len() != width) {
            return Err(TrainError::Shape {
                expected: width,
                actual: row.len(),
            });
        }
        Ok(Self { features, labels })
    }

    /// `n_samples` all-zero rows labelled class 0.
    pub fn zeros(n_samples: usize, n_features: usize) -> Result<Self> {
        Self::new(vec![vec![0.0; n_features]; n_samples], vec![0; n_samples])
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if indices.is_empty() {
            return Err(TrainError::invalid_input("subset has no rows"));
        }
        if let Some(&i) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(TrainError::invalid_input(format!(
                "row {i} out of range for {} samples",
                self.len()
            )));
        }
        Ok(Self {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        })
    }
}

/// Stratified hold-out split: `1/cv` of every class goes to validation.
///
/// The first samples of each class (in dataset order) form the validation
/// fold, so the split is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValidSplit")]
pub struct ValidSplit {
    cv: usize,
}

#[derive(Deserialize)]
struct RawValidSplit {
    cv: usize,
}

impl TryFrom<RawValidSplit> for ValidSplit {
    type Error = TrainError;

    fn try_from(raw: RawValidSplit) -> Result<Self> {
        Self::new(raw.cv)
    }
}

impl ValidSplit {
    pub fn new(cv: usize) -> Result<Self> {
        if cv < 2 {
            return Err(TrainError::invalid_input(format!(
                "cv must be at least 2, got {cv}"
            )));
        }
        Ok(Self { cv })
    }

    pub fn cv(&self) -> usize {
        self.cv
    }

    /// Split into `(train, valid)`.
    pub fn split(&self, data: &Dataset) -> Result<(Dataset, Dataset)> {
        let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in data.labels.iter().enumerate() {
            by_class.entry(label).or_default().push(i);
        }

        let mut train = Vec::new();
        let mut valid = Vec::new();
        for indices in by_class.values() {
            let n_valid = indices.len() / self.cv;
            valid.extend_from_slice(&indices[..n_valid]);
            train.extend_from_slice(&indices[n_valid..]);
        }
        if valid.is_empty() || train.is_empty() {
            return Err(TrainError::invalid_input(format!(
                "cannot make a {}-fold split of {} samples",
                self.cv,
                data.len()
            )));
        }
        train.sort_unstable();
        valid.sort_unstable();
        Ok((data.subset(&train)?, data.subset(&valid)?))
    }
}

impl Default for ValidSplit {
    fn default() -> Self {
        Self { cv: 5 }
    }
}

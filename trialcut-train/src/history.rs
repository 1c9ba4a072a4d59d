//! Per-epoch metric history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of metrics per finished epoch, e.g. `epoch`, `train_loss`,
/// `valid_loss`, `valid_acc`, `dur`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    rows: Vec<BTreeMap<String, f64>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: BTreeMap<String, f64>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[BTreeMap<String, f64>] {
        &self.rows
    }

    /// Metrics of the most recent epoch.
    pub fn last(&self) -> Option<&BTreeMap<String, f64>> {
        self.rows.last()
    }

    pub fn last_value(&self, key: &str) -> Option<f64> {
        self.last().and_then(|row| row.get(key).copied())
    }

    /// All recorded values of `key`, skipping epochs that lack it.
    pub fn values(&self, key: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.get(key).copied())
            .collect()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

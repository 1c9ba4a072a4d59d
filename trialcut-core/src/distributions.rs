//! Parameter distributions and suggested values.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudyError};

/// Search range for a single hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    Float { low: f64, high: f64, log: bool },
    Int { low: i64, high: i64 },
    Categorical { choices: Vec<String> },
}

impl Distribution {
    pub fn float(low: f64, high: f64, log: bool) -> Result<Self> {
        if !(low.is_finite() && high.is_finite()) {
            return Err(StudyError::invalid_input(format!(
                "float range must be finite, got [{low}, {high}]"
            )));
        }
        if low > high {
            return Err(StudyError::invalid_input(format!(
                "low ({low}) must not exceed high ({high})"
            )));
        }
        if !(high - low).is_finite() {
            return Err(StudyError::invalid_input(format!(
                "float range [{low}, {high}] is too wide to sample"
            )));
        }
        if log && low <= 0.0 {
            return Err(StudyError::invalid_input(format!(
                "log-scale low must be positive, got {low}"
            )));
        }
        Ok(Self::Float { low, high, log })
    }

    pub fn int(low: i64, high: i64) -> Result<Self> {
        if low > high {
            return Err(StudyError::invalid_input(format!(
                "low ({low}) must not exceed high ({high})"
            )));
        }
        Ok(Self::Int { low, high })
    }

    pub fn categorical<S: AsRef<str>>(choices: &[S]) -> Result<Self> {
        if choices.is_empty() {
            return Err(StudyError::invalid_input("categorical choices are empty"));
        }
        Ok(Self::Categorical {
            choices: choices.iter().map(|c| c.as_ref().to_string()).collect(),
        })
    }

    /// Whether `value` could have been drawn from this distribution.
    pub fn contains(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (Self::Float { low, high, .. }, ParamValue::Float(v)) => *low <= *v && *v <= *high,
            (Self::Int { low, high }, ParamValue::Int(v)) => *low <= *v && *v <= *high,
            (Self::Categorical { choices }, ParamValue::Categorical(v)) => choices.contains(v),
            _ => false,
        }
    }
}

/// A concrete hyperparameter value recorded on a trial.
///
/// Serialized untagged; `Int` is tried before `Float` so integers survive a
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Categorical(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Categorical(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Categorical(v) => Some(v),
            _ => None,
        }
    }
}

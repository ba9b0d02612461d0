//! LoggingData - per-generation values handed to external reporters
//!
//! Producers (the reproducer, evaluators) record values during a generation;
//! reporters read them once the generation is complete. Entries are cleared
//! when the population advances to the next generation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single reported value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    /// One number, reported as-is
    Scalar(f64),
    /// A series, reported as summary statistics
    Vector(Vec<f64>),
}

impl LogValue {
    /// Scalar payload, if this is a scalar
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            LogValue::Scalar(v) => Some(*v),
            LogValue::Vector(_) => None,
        }
    }

    /// Vector payload, if this is a vector
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            LogValue::Scalar(_) => None,
            LogValue::Vector(v) => Some(v),
        }
    }
}

impl From<f64> for LogValue {
    fn from(value: f64) -> Self {
        LogValue::Scalar(value)
    }
}

impl From<usize> for LogValue {
    fn from(value: usize) -> Self {
        LogValue::Scalar(value as f64)
    }
}

impl From<Vec<f64>> for LogValue {
    fn from(values: Vec<f64>) -> Self {
        LogValue::Vector(values)
    }
}

/// Named values recorded during the current generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggingData {
    values: BTreeMap<String, LogValue>,
}

impl LoggingData {
    /// Create an empty set of values
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) a value
    pub fn record(&mut self, name: impl Into<String>, value: impl Into<LogValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a value by name
    pub fn get(&self, name: &str) -> Option<&LogValue> {
        self.values.get(name)
    }

    /// Look up a scalar value by name
    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(LogValue::as_scalar)
    }

    /// Iterate over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LogValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drop every recorded value
    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

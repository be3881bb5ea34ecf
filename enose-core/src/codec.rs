//! Class index ↔ category name mapping shared by every stage

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EnoseError, EnoseResult};

/// Persisted label set, in class-index order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelParams {
    pub classes: Vec<String>,
}

/// Total bijection between `0..K` and the training-time category names
#[derive(Debug, Clone)]
pub struct LabelCodec {
    labels: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl LabelCodec {
    pub fn new(labels: Vec<String>) -> EnoseResult<Self> {
        if labels.is_empty() {
            return Err(EnoseError::Inconsistent("label set is empty".into()));
        }

        let mut by_name = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() {
                return Err(EnoseError::Inconsistent(format!(
                    "label {} is empty",
                    i
                )));
            }
            if by_name.insert(label.clone(), i).is_some() {
                return Err(EnoseError::Inconsistent(format!(
                    "duplicate label '{}'",
                    label
                )));
            }
        }

        Ok(Self { labels, by_name })
    }

    pub fn from_params(params: LabelParams) -> EnoseResult<Self> {
        Self::new(params.classes)
    }

    pub fn params(&self) -> LabelParams {
        LabelParams {
            classes: self.labels.clone(),
        }
    }

    /// Number of classes K
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Category names in index order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn decode(&self, index: usize) -> EnoseResult<&str> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(EnoseError::UnknownLabel {
                index,
                classes: self.labels.len(),
            })
    }

    pub fn encode(&self, label: &str) -> EnoseResult<usize> {
        self.by_name
            .get(label)
            .copied()
            .ok_or_else(|| EnoseError::UnknownCategory(label.to_string()))
    }
}

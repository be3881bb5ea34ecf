//! Meta-feature assembly
//!
//! The meta model was trained on base outputs concatenated in one specific
//! order. [`MetaLayout`] records that order with each model's width and the
//! assembler refuses anything that deviates from it.

use serde::{Deserialize, Serialize};

use crate::error::{EnoseError, EnoseResult, ScoreError};
use crate::pool::BaseOutput;
use crate::types::ModelId;

/// One block of the meta-feature vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub name: String,
    pub width: usize,
}

impl LayoutEntry {
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            width,
        }
    }
}

/// Ordered `(model name, width)` blocks the meta model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaLayout(Vec<LayoutEntry>);

impl MetaLayout {
    pub fn new(entries: Vec<LayoutEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.0
    }

    /// Length of the meta-feature vector
    pub fn total_width(&self) -> usize {
        self.0.iter().map(|e| e.width).sum()
    }

    /// Whether two layouts describe the same blocks; names compare through
    /// [`ModelId`] so `rf` and `random_forest` are the same model
    pub fn same_as(&self, other: &MetaLayout) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| {
                let Ok(a_id) = a.name.parse::<ModelId>();
                let Ok(b_id) = b.name.parse::<ModelId>();
                a_id == b_id && a.width == b.width
            })
    }

    pub fn describe(&self) -> String {
        self.0
            .iter()
            .map(|e| format!("{}:{}", e.name, e.width))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Concatenates base outputs into the meta model's input
#[derive(Debug, Clone)]
pub struct MetaFeatureAssembler {
    layout: MetaLayout,
    model: String,
}

impl MetaFeatureAssembler {
    /// `model` names the consumer in errors
    pub fn new(layout: MetaLayout, model: impl Into<String>) -> Self {
        Self {
            layout,
            model: model.into(),
        }
    }

    pub fn layout(&self) -> &MetaLayout {
        &self.layout
    }

    pub fn width(&self) -> usize {
        self.layout.total_width()
    }

    /// Concatenates score vectors in the given order after checking each block
    /// against the recorded layout
    pub fn assemble(&self, outputs: &[BaseOutput]) -> EnoseResult<Vec<f64>> {
        let entries = self.layout.entries();
        if outputs.len() != entries.len() {
            return Err(self.corrupt(format!(
                "{} base outputs for {} layout blocks",
                outputs.len(),
                entries.len()
            )));
        }

        let mut features = Vec::with_capacity(self.width());
        for (output, entry) in outputs.iter().zip(entries) {
            let Ok(got) = output.name.parse::<ModelId>();
            let Ok(want) = entry.name.parse::<ModelId>();
            if got != want {
                return Err(self.corrupt(format!(
                    "expected block '{}', got '{}'",
                    entry.name, output.name
                )));
            }
            if output.scores.len() != entry.width {
                return Err(EnoseError::inference(
                    &self.model,
                    ScoreError::DimensionMismatch {
                        expected: entry.width,
                        received: output.scores.len(),
                    },
                ));
            }
            features.extend_from_slice(&output.scores);
        }

        Ok(features)
    }

    fn corrupt(&self, reason: String) -> EnoseError {
        EnoseError::inference(&self.model, ScoreError::Corrupt(reason))
    }
}

//! Multi-layer perceptron (ANN base model)

use serde::{Deserialize, Serialize};

use super::{ProbabilisticClassifier, check_input, validate_classes, validate_matrix};
use crate::error::ScoreError;
use crate::math::{dot, relu, sigmoid, softmax};

/// Hidden-layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Logistic,
    Identity,
}

impl Activation {
    #[inline]
    fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => relu(x),
            Activation::Tanh => x.tanh(),
            Activation::Logistic => sigmoid(x),
            Activation::Identity => x,
        }
    }
}

/// Fully connected layer: `weights[out][in]`, `bias[out]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| dot(row, input) + b)
            .collect()
    }

    fn inputs(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn outputs(&self) -> usize {
        self.bias.len()
    }
}

/// Feed-forward classifier with a softmax output layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    pub classes: Vec<usize>,
    pub layers: Vec<DenseLayer>,
    #[serde(default)]
    pub activation: Activation,
}

impl Mlp {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;

        if self.layers.is_empty() {
            return Err("mlp has no layers".into());
        }

        let mut width = self.layers[0].inputs();
        if width == 0 {
            return Err("mlp input layer is empty".into());
        }

        for (i, layer) in self.layers.iter().enumerate() {
            validate_matrix(
                &format!("layer {} weights", i),
                &layer.weights,
                layer.outputs(),
                width,
            )?;
            if layer.bias.iter().any(|b| !b.is_finite()) {
                return Err(format!("layer {} bias is not finite", i));
            }
            width = layer.outputs();
        }

        if width != self.classes.len() {
            return Err(format!(
                "mlp output width {} does not match {} classes",
                width,
                self.classes.len()
            ));
        }

        Ok(())
    }
}

impl ProbabilisticClassifier for Mlp {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.layers.first().map(DenseLayer::inputs).unwrap_or(0)
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        check_input(self.n_features(), x)?;
        if self.layers.is_empty() {
            return Err(ScoreError::Corrupt("mlp has no layers".into()));
        }

        let last = self.layers.len() - 1;
        let mut activations = x.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&activations);
            activations = if i == last {
                z
            } else {
                z.into_iter().map(|v| self.activation.apply(v)).collect()
            };
        }

        Ok(softmax(&activations))
    }
}

//! # Classifiers
//!
//! Trained models evaluated natively from their persisted parameters.
//!
//! Two capabilities exist:
//!
//! - [`ProbabilisticClassifier`]: per-class probabilities (sum to 1)
//! - [`ScoringClassifier`]: per-class decision scores (unbounded, no normalization)
//!
//! [`ClassifierHandle`] wraps either one behind a uniform `score_vector`; the
//! capability is consulted only to decide whether a probability is reported.
//!
//! ## Artifact kinds
//!
//! | `kind` | Model | Capability |
//! |--------|-------|------------|
//! | `mlp` | Multi-layer perceptron | probabilistic |
//! | `random_forest` | Averaged decision trees | probabilistic |
//! | `gradient_boosting` | Softmax over boosted tree margins | probabilistic |
//! | `knn` | k-nearest neighbours vote | probabilistic |
//! | `logistic_regression` | One-vs-rest or multinomial | probabilistic |
//! | `linear_svc` | Linear decision function | scoring |

mod knn;
mod linear;
mod mlp;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;
use crate::math::argmax;

pub use knn::{KNearestNeighbors, KnnWeights};
pub use linear::{LinearSvc, LogisticRegression, MultiClass};
pub use mlp::{Activation, DenseLayer, Mlp};
pub use tree::{GradientBoosting, RandomForest, Tree, TreeNode};

/// Classifier exposing a per-class probability vector
pub trait ProbabilisticClassifier: Send + Sync + fmt::Debug {
    /// Class indices in output order
    fn classes(&self) -> &[usize];

    /// Expected input width
    fn n_features(&self) -> usize;

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError>;
}

/// Classifier exposing only a per-class decision function
pub trait ScoringClassifier: Send + Sync + fmt::Debug {
    /// Class indices in output order
    fn classes(&self) -> &[usize];

    /// Expected input width
    fn n_features(&self) -> usize;

    fn decision_function(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError>;
}

/// What a handle's score vector means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Probabilistic,
    Scoring,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Probabilistic => "probabilistic",
            Capability::Scoring => "scoring",
        }
    }
}

/// One scored input: the raw vector and the winning class
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub scores: Vec<f64>,
    /// Position of the maximum within `scores`
    pub position: usize,
    /// Class index at that position
    pub class_index: usize,
}

/// Trained, read-only model of either capability
#[derive(Debug)]
pub enum ClassifierHandle {
    Probabilistic(Box<dyn ProbabilisticClassifier>),
    Scoring(Box<dyn ScoringClassifier>),
}

impl ClassifierHandle {
    pub fn probabilistic(model: impl ProbabilisticClassifier + 'static) -> Self {
        ClassifierHandle::Probabilistic(Box::new(model))
    }

    pub fn scoring(model: impl ScoringClassifier + 'static) -> Self {
        ClassifierHandle::Scoring(Box::new(model))
    }

    pub fn capability(&self) -> Capability {
        match self {
            ClassifierHandle::Probabilistic(_) => Capability::Probabilistic,
            ClassifierHandle::Scoring(_) => Capability::Scoring,
        }
    }

    pub fn classes(&self) -> &[usize] {
        match self {
            ClassifierHandle::Probabilistic(m) => m.classes(),
            ClassifierHandle::Scoring(m) => m.classes(),
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            ClassifierHandle::Probabilistic(m) => m.n_features(),
            ClassifierHandle::Scoring(m) => m.n_features(),
        }
    }

    /// Width of the score vector (one entry per class)
    pub fn width(&self) -> usize {
        self.classes().len()
    }

    /// Probabilities or decision scores, whichever the model natively produces.
    ///
    /// The output is checked for width and finiteness before it is returned.
    pub fn score_vector(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        check_input(self.n_features(), x)?;

        let scores = match self {
            ClassifierHandle::Probabilistic(m) => m.predict_proba(x)?,
            ClassifierHandle::Scoring(m) => m.decision_function(x)?,
        };

        if scores.len() != self.width() {
            return Err(ScoreError::Corrupt(format!(
                "model produced {} scores for {} classes",
                scores.len(),
                self.width()
            )));
        }
        if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
            return Err(ScoreError::NonFinite(pos));
        }

        Ok(scores)
    }

    /// Scores `x` and picks the winning class (lowest position on ties)
    pub fn score(&self, x: &[f64]) -> Result<Scored, ScoreError> {
        let scores = self.score_vector(x)?;
        let position = argmax(&scores)
            .ok_or_else(|| ScoreError::Corrupt("model has no classes".into()))?;
        let class_index = self.classes()[position];

        Ok(Scored {
            scores,
            position,
            class_index,
        })
    }
}

/// Persisted model, self-describing its kind and therefore its capability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Mlp(Mlp),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    Knn(KNearestNeighbors),
    LogisticRegression(LogisticRegression),
    LinearSvc(LinearSvc),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Mlp(_) => "mlp",
            ModelArtifact::RandomForest(_) => "random_forest",
            ModelArtifact::GradientBoosting(_) => "gradient_boosting",
            ModelArtifact::Knn(_) => "knn",
            ModelArtifact::LogisticRegression(_) => "logistic_regression",
            ModelArtifact::LinearSvc(_) => "linear_svc",
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            ModelArtifact::LinearSvc(_) => Capability::Scoring,
            _ => Capability::Probabilistic,
        }
    }

    /// Structural checks on the persisted parameters
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ModelArtifact::Mlp(m) => m.validate(),
            ModelArtifact::RandomForest(m) => m.validate(),
            ModelArtifact::GradientBoosting(m) => m.validate(),
            ModelArtifact::Knn(m) => m.validate(),
            ModelArtifact::LogisticRegression(m) => m.validate(),
            ModelArtifact::LinearSvc(m) => m.validate(),
        }
    }

    /// Validates and wraps the model in a handle
    pub fn into_handle(self) -> Result<ClassifierHandle, String> {
        self.validate()?;
        let handle = match self {
            ModelArtifact::Mlp(m) => ClassifierHandle::probabilistic(m),
            ModelArtifact::RandomForest(m) => ClassifierHandle::probabilistic(m),
            ModelArtifact::GradientBoosting(m) => ClassifierHandle::probabilistic(m),
            ModelArtifact::Knn(m) => ClassifierHandle::probabilistic(m),
            ModelArtifact::LogisticRegression(m) => ClassifierHandle::probabilistic(m),
            ModelArtifact::LinearSvc(m) => ClassifierHandle::scoring(m),
        };
        Ok(handle)
    }
}

pub(crate) fn check_input(expected: usize, x: &[f64]) -> Result<(), ScoreError> {
    if x.len() != expected {
        return Err(ScoreError::DimensionMismatch {
            expected,
            received: x.len(),
        });
    }
    Ok(())
}

pub(crate) fn validate_classes(classes: &[usize]) -> Result<(), String> {
    if classes.is_empty() {
        return Err("model has no classes".into());
    }
    let mut seen = std::collections::HashSet::new();
    for c in classes {
        if !seen.insert(c) {
            return Err(format!("class {} listed twice", c));
        }
    }
    Ok(())
}

pub(crate) fn validate_matrix(
    what: &str,
    rows: &[Vec<f64>],
    n_rows: usize,
    n_cols: usize,
) -> Result<(), String> {
    if rows.len() != n_rows {
        return Err(format!("{} has {} rows, expected {}", what, rows.len(), n_rows));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n_cols {
            return Err(format!(
                "{} row {} has {} columns, expected {}",
                what,
                i,
                row.len(),
                n_cols
            ));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(format!("{} row {} is not finite", what, i));
        }
    }
    Ok(())
}

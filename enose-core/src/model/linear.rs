//! Linear models: logistic regression and linear SVC

use serde::{Deserialize, Serialize};

use super::{
    ProbabilisticClassifier, ScoringClassifier, check_input, validate_classes, validate_matrix,
};
use crate::error::ScoreError;
use crate::math::{dot, normalize, sigmoid, softmax};

/// How per-class logits become probabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MultiClass {
    /// Independent sigmoids, renormalized
    Ovr,
    #[default]
    Multinomial,
}

fn logits(coef: &[Vec<f64>], intercept: &[f64], x: &[f64]) -> Vec<f64> {
    coef.iter()
        .zip(intercept)
        .map(|(w, b)| dot(w, x) + b)
        .collect()
}

fn validate_linear(classes: &[usize], coef: &[Vec<f64>], intercept: &[f64]) -> Result<(), String> {
    validate_classes(classes)?;
    let n_features = coef.first().map(Vec::len).unwrap_or(0);
    if n_features == 0 {
        return Err("coefficient matrix is empty".into());
    }
    validate_matrix("coef", coef, classes.len(), n_features)?;
    if intercept.len() != classes.len() {
        return Err(format!(
            "{} intercepts for {} classes",
            intercept.len(),
            classes.len()
        ));
    }
    if intercept.iter().any(|b| !b.is_finite()) {
        return Err("intercept is not finite".into());
    }
    Ok(())
}

/// Logistic regression with one coefficient row per class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub classes: Vec<usize>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
    #[serde(default)]
    pub multi_class: MultiClass,
}

impl LogisticRegression {
    pub fn validate(&self) -> Result<(), String> {
        validate_linear(&self.classes, &self.coef, &self.intercept)
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        check_input(self.n_features(), x)?;
        let z = logits(&self.coef, &self.intercept, x);

        let proba = match self.multi_class {
            MultiClass::Multinomial => softmax(&z),
            MultiClass::Ovr => {
                let mut p: Vec<f64> = z.into_iter().map(sigmoid).collect();
                normalize(&mut p);
                p
            }
        };
        Ok(proba)
    }
}

/// Linear support vector classifier: `w·x + b` per class, no probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSvc {
    pub classes: Vec<usize>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearSvc {
    pub fn validate(&self) -> Result<(), String> {
        validate_linear(&self.classes, &self.coef, &self.intercept)
    }
}

impl ScoringClassifier for LinearSvc {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.coef.first().map(Vec::len).unwrap_or(0)
    }

    fn decision_function(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        check_input(self.n_features(), x)?;
        Ok(logits(&self.coef, &self.intercept, x))
    }
}

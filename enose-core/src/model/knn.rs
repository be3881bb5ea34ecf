//! k-nearest-neighbours vote over the stored training set

use serde::{Deserialize, Serialize};

use super::{ProbabilisticClassifier, check_input, validate_classes, validate_matrix};
use crate::error::ScoreError;
use crate::math::{normalize, squared_distance};

/// Neighbour vote weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnnWeights {
    #[default]
    Uniform,
    /// Inverse Euclidean distance; exact matches take the whole vote
    Distance,
}

/// Stored (scaled) training points and their class positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    pub classes: Vec<usize>,
    pub points: Vec<Vec<f64>>,
    /// Position into `classes` for each point
    pub labels: Vec<usize>,
    pub k: usize,
    #[serde(default)]
    pub weights: KnnWeights,
}

impl KNearestNeighbors {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;

        let n_features = self.points.first().map(Vec::len).unwrap_or(0);
        if n_features == 0 {
            return Err("knn has no training points".into());
        }
        validate_matrix("knn points", &self.points, self.points.len(), n_features)?;

        if self.labels.len() != self.points.len() {
            return Err(format!(
                "knn has {} labels for {} points",
                self.labels.len(),
                self.points.len()
            ));
        }
        if let Some(bad) = self.labels.iter().find(|&&l| l >= self.classes.len()) {
            return Err(format!("knn label {} outside {} classes", bad, self.classes.len()));
        }
        if self.k == 0 || self.k > self.points.len() {
            return Err(format!(
                "k = {} is invalid for {} points",
                self.k,
                self.points.len()
            ));
        }

        Ok(())
    }

    /// Indices of the k closest points, nearest first (stable on ties)
    fn neighbours(&self, x: &[f64]) -> Vec<(usize, f64)> {
        let mut dist: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, squared_distance(p, x).sqrt()))
            .collect();
        dist.sort_by(|a, b| a.1.total_cmp(&b.1));
        dist.truncate(self.k);
        dist
    }
}

impl ProbabilisticClassifier for KNearestNeighbors {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.points.first().map(Vec::len).unwrap_or(0)
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        check_input(self.n_features(), x)?;
        if self.k == 0 {
            return Err(ScoreError::Corrupt("k is zero".into()));
        }

        let neighbours = self.neighbours(x);
        let exact = neighbours.iter().any(|(_, d)| *d == 0.0);

        let mut votes = vec![0.0; self.classes.len()];
        for (i, d) in neighbours {
            let label = *self
                .labels
                .get(i)
                .ok_or_else(|| ScoreError::Corrupt(format!("point {} has no label", i)))?;
            let weight = match self.weights {
                KnnWeights::Uniform => 1.0,
                KnnWeights::Distance if exact => {
                    if d == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                }
                KnnWeights::Distance => 1.0 / d,
            };
            let slot = votes
                .get_mut(label)
                .ok_or_else(|| ScoreError::Corrupt(format!("label {} out of range", label)))?;
            *slot += weight;
        }

        normalize(&mut votes);
        Ok(votes)
    }
}

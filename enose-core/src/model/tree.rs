//! Decision-tree ensembles: random forest and gradient-boosted trees

use serde::{Deserialize, Serialize};

use super::{ProbabilisticClassifier, check_input, validate_classes};
use crate::error::ScoreError;
use crate::math::{normalize, softmax};

/// Tree node, addressed by position in [`Tree::nodes`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// How a split compares a feature against its threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitRule {
    /// `x <= t` goes left (CART trees)
    LessOrEqual,
    /// `x < t` goes left (boosted trees)
    LessThan,
}

/// Binary decision tree, root at position 0.
///
/// Children always sit after their parent, which makes every walk finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn validate(&self, n_features: usize, leaf_width: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} of {}",
                            i, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} threshold is not finite", i));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "leaf {} has {} values, expected {}",
                            i,
                            value.len(),
                            leaf_width
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite()) {
                        return Err(format!("leaf {} is not finite", i));
                    }
                }
            }
        }

        Ok(())
    }

    fn leaf(&self, x: &[f64], rule: SplitRule) -> Result<&[f64], ScoreError> {
        let mut idx = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = *x.get(*feature).ok_or_else(|| {
                        ScoreError::Corrupt(format!("split on missing feature {}", feature))
                    })?;
                    let go_left = match rule {
                        SplitRule::LessOrEqual => v <= *threshold,
                        SplitRule::LessThan => v < *threshold,
                    };
                    idx = if go_left { *left } else { *right };
                }
                None => {
                    return Err(ScoreError::Corrupt(format!("dangling node {}", idx)));
                }
            }
        }
        Err(ScoreError::Corrupt("tree walk did not reach a leaf".into()))
    }
}

/// Averaged class distributions of independently grown trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<usize>,
    pub n_features: usize,
    pub trees: Vec<Tree>,
}

impl RandomForest {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        if self.n_features == 0 {
            return Err("random forest has no features".into());
        }
        if self.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        check_input(self.n_features, x)?;
        if self.trees.is_empty() {
            return Err(ScoreError::Corrupt("random forest has no trees".into()));
        }

        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            // leaves may hold raw counts; each tree votes with a distribution
            let mut dist = tree.leaf(x, SplitRule::LessOrEqual)?.to_vec();
            normalize(&mut dist);
            for (p, d) in proba.iter_mut().zip(&dist) {
                *p += d;
            }
        }

        let n = self.trees.len() as f64;
        Ok(proba.into_iter().map(|p| p / n).collect())
    }
}

/// Softmax over per-class sums of boosted tree margins.
///
/// Tree `t` contributes to class `t % K`; every leaf holds one margin value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub classes: Vec<usize>,
    pub n_features: usize,
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

fn default_base_score() -> f64 {
    0.5
}

impl GradientBoosting {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        if self.n_features == 0 {
            return Err("boosted model has no features".into());
        }
        if !self.base_score.is_finite() {
            return Err("base_score is not finite".into());
        }
        let k = self.classes.len();
        if self.trees.is_empty() || self.trees.len() % k != 0 {
            return Err(format!(
                "{} trees cannot be split evenly across {} classes",
                self.trees.len(),
                k
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, 1)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Raw per-class margins before the softmax
    pub fn margins(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        check_input(self.n_features, x)?;

        let k = self.classes.len();
        let mut margins = vec![self.base_score; k];
        for (t, tree) in self.trees.iter().enumerate() {
            let leaf = tree.leaf(x, SplitRule::LessThan)?;
            let value = leaf
                .first()
                .ok_or_else(|| ScoreError::Corrupt(format!("tree {} has an empty leaf", t)))?;
            margins[t % k] += value;
        }
        Ok(margins)
    }
}

impl ProbabilisticClassifier for GradientBoosting {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ScoreError> {
        Ok(softmax(&self.margins(x)?))
    }
}

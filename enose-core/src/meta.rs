//! Second-stage classifier over assembled meta-features

use serde::{Deserialize, Serialize};

use crate::assembler::MetaLayout;
use crate::error::{EnoseError, EnoseResult};
use crate::math::round_to;
use crate::model::{Capability, ClassifierHandle, ModelArtifact};
use crate::types::ModelId;

/// Decimal places kept on reported probabilities
pub const PROBABILITY_PLACES: u32 = 4;

/// Persisted meta model: the layout it was trained on plus its parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaArtifact {
    pub layout: MetaLayout,
    pub model: ModelArtifact,
}

/// Final decision of the ensemble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaPrediction {
    pub class_index: usize,
    /// Probability of `class_index`, rounded to [`PROBABILITY_PLACES`]
    pub probability: f64,
}

#[derive(Debug)]
pub struct MetaClassifier {
    handle: ClassifierHandle,
}

impl MetaClassifier {
    /// Wraps a handle; the meta model must report probabilities
    pub fn new(handle: ClassifierHandle) -> EnoseResult<Self> {
        if handle.capability() != Capability::Probabilistic {
            return Err(EnoseError::Inconsistent(format!(
                "meta model must be probabilistic, got a {} model",
                handle.capability().name()
            )));
        }
        Ok(Self { handle })
    }

    pub fn classes(&self) -> &[usize] {
        self.handle.classes()
    }

    /// Expected meta-feature width
    pub fn n_features(&self) -> usize {
        self.handle.n_features()
    }

    pub fn predict(&self, features: &[f64]) -> EnoseResult<MetaPrediction> {
        let scored = self
            .handle
            .score(features)
            .map_err(|e| EnoseError::inference(ModelId::Meta.name(), e))?;

        Ok(MetaPrediction {
            class_index: scored.class_index,
            probability: round_to(scored.scores[scored.position], PROBABILITY_PLACES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoreError;
    use crate::model::{LinearSvc, LogisticRegression, MultiClass};

    fn meta() -> MetaClassifier {
        MetaClassifier::new(ClassifierHandle::probabilistic(LogisticRegression {
            classes: vec![0, 1, 2],
            coef: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.0, 0.0]],
            intercept: vec![0.0, 0.0, 0.0],
            multi_class: MultiClass::Multinomial,
        }))
        .unwrap()
    }

    #[test]
    fn test_predict_rounds_probability() {
        let p = meta().predict(&[1.0, 0.0]).unwrap();
        assert_eq!(p.class_index, 0);
        // e / (e + 2)
        assert_eq!(p.probability, 0.5761);
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let p = meta().predict(&[0.0, 0.0]).unwrap();
        assert_eq!(p.class_index, 0);
        assert_eq!(p.probability, 0.3333);
    }

    #[test]
    fn test_scoring_meta_rejected() {
        let handle = ClassifierHandle::scoring(LinearSvc {
            classes: vec![0, 1],
            coef: vec![vec![1.0], vec![1.0]],
            intercept: vec![0.0, 0.0],
        });
        assert!(matches!(
            MetaClassifier::new(handle),
            Err(EnoseError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_wrong_width_is_meta_inference_error() {
        let err = meta().predict(&[1.0]).unwrap_err();
        assert_eq!(err.model(), Some("meta"));
        assert!(matches!(
            err,
            EnoseError::Inference {
                source: ScoreError::DimensionMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_artifact_json_shape() {
        let json = r#"{
            "layout": [{"name": "knn", "width": 2}],
            "model": {
                "kind": "logistic_regression",
                "classes": [0, 1],
                "coef": [[1.0, 0.0], [0.0, 1.0]],
                "intercept": [0.0, 0.0]
            }
        }"#;
        let artifact: MetaArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.layout.total_width(), 2);
        assert_eq!(artifact.model.kind(), "logistic_regression");
    }
}

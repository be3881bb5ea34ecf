//! Fitted affine normalization of raw readings

use serde::{Deserialize, Serialize};

use crate::error::{EnoseError, EnoseResult};
use crate::types::{ScaledReading, SensorReading};

/// Persisted scaler parameters (`mean_` / `scale_` of a standard scaler)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Applies `(x - mean) / scale` elementwise with parameters fixed at training
/// time. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl FeatureScaler {
    /// Builds a scaler, rejecting mismatched or non-finite parameters.
    ///
    /// A zero scale component (constant feature at fit time) becomes `1.0`.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> EnoseResult<Self> {
        if mean.len() != scale.len() {
            return Err(EnoseError::Shape {
                expected: mean.len(),
                received: scale.len(),
            });
        }
        if mean.is_empty() {
            return Err(EnoseError::Config("scaler has no features".into()));
        }
        if mean.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(EnoseError::Config(
                "scaler parameters must be finite".into(),
            ));
        }

        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Pass-through scaler over `n` features
    pub fn identity(n: usize) -> Self {
        Self {
            mean: vec![0.0; n],
            scale: vec![1.0; n],
        }
    }

    pub fn from_params(params: ScalerParams) -> EnoseResult<Self> {
        Self::new(params.mean, params.scale)
    }

    pub fn params(&self) -> ScalerParams {
        ScalerParams {
            mean: self.mean.clone(),
            scale: self.scale.clone(),
        }
    }

    /// Number of features N the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Normalizes one reading
    pub fn scale(&self, reading: &SensorReading) -> EnoseResult<ScaledReading> {
        if reading.len() != self.n_features() {
            return Err(EnoseError::Shape {
                expected: self.n_features(),
                received: reading.len(),
            });
        }

        let values = reading
            .values()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();

        Ok(ScaledReading::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_affine() {
        let scaler = FeatureScaler::new(vec![10.0, 0.0], vec![2.0, 4.0]).unwrap();
        let scaled = scaler.scale(&SensorReading::new(vec![14.0, -8.0])).unwrap();
        assert_eq!(scaled.values(), &[2.0, -2.0]);
    }

    #[test]
    fn test_scale_is_deterministic() {
        let scaler = FeatureScaler::new(vec![1.5, 2.5, 3.5], vec![0.5, 1.5, 2.5]).unwrap();
        let reading = SensorReading::new(vec![815.0, 2530.0, 1075.0]);
        assert_eq!(scaler.scale(&reading).unwrap(), scaler.scale(&reading).unwrap());
    }

    #[test]
    fn test_shape_error() {
        let scaler = FeatureScaler::identity(4);
        let err = scaler.scale(&SensorReading::new(vec![1.0; 3])).unwrap_err();
        assert!(matches!(err, EnoseError::Shape { expected: 4, received: 3 }));
    }

    #[test]
    fn test_zero_scale_becomes_unit() {
        let scaler = FeatureScaler::new(vec![5.0], vec![0.0]).unwrap();
        let scaled = scaler.scale(&SensorReading::new(vec![7.0])).unwrap();
        assert_eq!(scaled.values(), &[2.0]);
    }

    #[test]
    fn test_invalid_params() {
        assert!(FeatureScaler::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(FeatureScaler::new(vec![f64::NAN], vec![1.0]).is_err());
        assert!(FeatureScaler::new(vec![], vec![]).is_err());
    }
}

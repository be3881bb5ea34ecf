//! Sensor channel, model identifier and reading types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sensor channel of the e-nose array
///
/// Known channels form a closed set; anything else is carried verbatim in
/// [`SensorChannel::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorChannel {
    /// LPG, propane, smoke
    Mq2,
    /// Alcohol vapour
    Mq3,
    /// Methane / natural gas
    Mq4,
    /// LPG, butane
    Mq6,
    /// Carbon monoxide
    Mq7,
    /// Air quality (NH3, NOx, benzene)
    Mq135,
    /// Hydrogen sulfide
    Mq136,
    /// Ammonia
    Mq137,
    /// Ambient temperature (°C)
    Temp,
    /// Relative humidity (%)
    Humi,
    /// Channel not known to this build
    Other(String),
}

impl SensorChannel {
    /// Canonical channel name as used in datasets and configuration
    pub fn name(&self) -> &str {
        match self {
            SensorChannel::Mq2 => "MQ2",
            SensorChannel::Mq3 => "MQ3",
            SensorChannel::Mq4 => "MQ4",
            SensorChannel::Mq6 => "MQ6",
            SensorChannel::Mq7 => "MQ7",
            SensorChannel::Mq135 => "MQ135",
            SensorChannel::Mq136 => "MQ136",
            SensorChannel::Mq137 => "MQ137",
            SensorChannel::Temp => "TEMP",
            SensorChannel::Humi => "HUMI",
            SensorChannel::Other(name) => name,
        }
    }

    /// What the channel measures
    pub fn description(&self) -> &str {
        match self {
            SensorChannel::Mq2 => "LPG, propane and smoke",
            SensorChannel::Mq3 => "Alcohol vapour",
            SensorChannel::Mq4 => "Methane",
            SensorChannel::Mq6 => "LPG and butane",
            SensorChannel::Mq7 => "Carbon monoxide",
            SensorChannel::Mq135 => "Air quality (NH3, NOx, benzene)",
            SensorChannel::Mq136 => "Hydrogen sulfide",
            SensorChannel::Mq137 => "Ammonia",
            SensorChannel::Temp => "Temperature",
            SensorChannel::Humi => "Relative humidity",
            SensorChannel::Other(_) => "Unknown channel",
        }
    }

    /// All known channels
    pub fn known() -> Vec<SensorChannel> {
        vec![
            SensorChannel::Mq2,
            SensorChannel::Mq3,
            SensorChannel::Mq4,
            SensorChannel::Mq6,
            SensorChannel::Mq7,
            SensorChannel::Mq135,
            SensorChannel::Mq136,
            SensorChannel::Mq137,
            SensorChannel::Temp,
            SensorChannel::Humi,
        ]
    }

    /// Eight-channel layout of the bench prototype
    pub fn bench_layout() -> Vec<SensorChannel> {
        vec![
            SensorChannel::Mq2,
            SensorChannel::Mq3,
            SensorChannel::Mq4,
            SensorChannel::Mq6,
            SensorChannel::Mq7,
            SensorChannel::Mq135,
            SensorChannel::Temp,
            SensorChannel::Humi,
        ]
    }
}

impl FromStr for SensorChannel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channel = match s.trim().to_ascii_uppercase().as_str() {
            "MQ2" => SensorChannel::Mq2,
            "MQ3" => SensorChannel::Mq3,
            "MQ4" => SensorChannel::Mq4,
            "MQ6" => SensorChannel::Mq6,
            "MQ7" => SensorChannel::Mq7,
            "MQ135" => SensorChannel::Mq135,
            "MQ136" => SensorChannel::Mq136,
            "MQ137" => SensorChannel::Mq137,
            "TEMP" => SensorChannel::Temp,
            "HUMI" => SensorChannel::Humi,
            _ => SensorChannel::Other(s.to_string()),
        };
        Ok(channel)
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SensorChannel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SensorChannel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let Ok(channel) = raw.parse::<SensorChannel>();
        Ok(channel)
    }
}

/// Identifier of a model in the ensemble
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelId {
    /// Multi-layer perceptron
    Ann,
    /// Random forest
    RandomForest,
    /// Gradient-boosted trees
    XgBoost,
    /// k-nearest neighbours
    Knn,
    /// Second-stage (stacking) model
    Meta,
    /// Model not known to this build
    Other(String),
}

impl ModelId {
    /// Canonical model name
    pub fn name(&self) -> &str {
        match self {
            ModelId::Ann => "ann",
            ModelId::RandomForest => "random_forest",
            ModelId::XgBoost => "xgboost",
            ModelId::Knn => "knn",
            ModelId::Meta => "meta",
            ModelId::Other(name) => name,
        }
    }

    /// All known models
    pub fn known() -> Vec<ModelId> {
        vec![
            ModelId::Ann,
            ModelId::RandomForest,
            ModelId::XgBoost,
            ModelId::Knn,
            ModelId::Meta,
        ]
    }
}

impl FromStr for ModelId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = match s.trim().to_ascii_lowercase().as_str() {
            "ann" | "mlp" => ModelId::Ann,
            "random_forest" | "rf" => ModelId::RandomForest,
            "xgboost" | "xgb" => ModelId::XgBoost,
            "knn" => ModelId::Knn,
            "meta" => ModelId::Meta,
            _ => ModelId::Other(s.to_string()),
        };
        Ok(id)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw reading, one value per configured channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorReading(Vec<f64>);

impl SensorReading {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of the first NaN or infinite value
    pub fn first_non_finite(&self) -> Option<usize> {
        self.0.iter().position(|v| !v.is_finite())
    }
}

impl From<Vec<f64>> for SensorReading {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl From<&[f64]> for SensorReading {
    fn from(values: &[f64]) -> Self {
        Self(values.to_vec())
    }
}

/// Reading after the fitted affine normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledReading(Vec<f64>);

impl ScaledReading {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

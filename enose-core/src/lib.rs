//! # enose-core: stacked-ensemble odor classification
//!
//! Classifies one fixed-length gas/environment sensor reading into a discrete
//! odor category. The reading is scaled, scored by every base model, the
//! per-class scores are concatenated in registration order and a meta model
//! makes the final call.
//!
//! ## Pipeline
//!
//! ```text
//! SensorReading → FeatureScaler → BaseModelPool → MetaFeatureAssembler
//!               → MetaClassifier → LabelCodec → IdentityMasker → EnsembleResult
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use enose_core::prelude::*;
//!
//! let config = EnsembleConfig::from_file(Path::new("artifacts/enose.toml"))?;
//! let cell = PipelineCell::new(ArtifactStore::new(config));
//! let result = cell.get()?.run(&SensorReading::new(values))?;
//! ```

pub mod artifacts;
pub mod assembler;
pub mod codec;
pub mod config;
pub mod demo;
pub mod error;
pub mod masker;
pub mod math;
pub mod meta;
pub mod model;
pub mod orchestrator;
pub mod pool;
pub mod scaler;
pub mod types;

pub use artifacts::{ArtifactStore, PipelineCell};
pub use assembler::{LayoutEntry, MetaFeatureAssembler, MetaLayout};
pub use codec::{LabelCodec, LabelParams};
pub use config::{BaseModelEntry, EnsembleConfig, MaskingConfig};
pub use error::{EnoseError, EnoseResult, ErrorKind, ScoreError};
pub use masker::IdentityMasker;
pub use meta::{MetaArtifact, MetaClassifier, MetaPrediction};
pub use model::{Capability, ClassifierHandle, ModelArtifact};
pub use orchestrator::{
    EnsembleResult, ModelPrediction, ModelSummary, PipelineParts, PredictionOrchestrator,
};
pub use pool::{BaseModelPool, BaseOutput};
pub use scaler::{FeatureScaler, ScalerParams};
pub use types::{ModelId, ScaledReading, SensorChannel, SensorReading};

/// Prelude for common imports
pub mod prelude {
    pub use crate::artifacts::{ArtifactStore, PipelineCell};
    pub use crate::config::EnsembleConfig;
    pub use crate::error::{EnoseError, EnoseResult, ErrorKind};
    pub use crate::orchestrator::{EnsembleResult, PredictionOrchestrator};
    pub use crate::types::{ModelId, SensorChannel, SensorReading};
    pub use std::path::Path;
}

#[cfg(test)]
mod tests;

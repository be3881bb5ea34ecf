//! Per-request sequencing of the stacked ensemble
//!
//! validate → scale → base pool → assemble → meta → decode → mask
//!
//! Everything held here is read-only after construction, so one orchestrator
//! serves any number of concurrent requests behind an `Arc`.

use std::collections::HashSet;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::assembler::MetaFeatureAssembler;
use crate::codec::LabelCodec;
use crate::error::{EnoseError, EnoseResult};
use crate::masker::IdentityMasker;
use crate::math::round_to;
use crate::meta::{MetaClassifier, PROBABILITY_PLACES};
use crate::model::Capability;
use crate::pool::BaseModelPool;
use crate::scaler::FeatureScaler;
use crate::types::{ModelId, SensorChannel, SensorReading};

/// Labelled outcome of one model, keyed by its public alias
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPrediction {
    #[serde(skip)]
    pub model: String,
    pub class_label: String,
    /// Absent for scoring-only models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Full response for one reading: base entries in registration order, meta last
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleResult {
    input_data: Vec<f64>,
    predictions: Vec<ModelPrediction>,
}

impl EnsembleResult {
    pub fn input_data(&self) -> &[f64] {
        &self.input_data
    }

    pub fn predictions(&self) -> &[ModelPrediction] {
        &self.predictions
    }

    /// Base model entries, without the meta entry
    pub fn base(&self) -> &[ModelPrediction] {
        &self.predictions[..self.predictions.len().saturating_sub(1)]
    }

    pub fn meta(&self) -> Option<&ModelPrediction> {
        self.predictions.last()
    }

    pub fn get(&self, model: &str) -> Option<&ModelPrediction> {
        self.predictions.iter().find(|p| p.model == model)
    }
}

struct PredictionMap<'a>(&'a [ModelPrediction]);

impl Serialize for PredictionMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for p in self.0 {
            map.serialize_entry(&p.model, p)?;
        }
        map.end()
    }
}

impl Serialize for EnsembleResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("EnsembleResult", 2)?;
        state.serialize_field("input_data", &self.input_data)?;
        state.serialize_field("predictions", &PredictionMap(&self.predictions))?;
        state.end()
    }
}

/// Public description of one loaded model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub role: &'static str,
    pub capability: Capability,
    pub classes: usize,
}

/// Loaded components, checked for consistency by [`PredictionOrchestrator::new`]
#[derive(Debug)]
pub struct PipelineParts {
    pub channels: Vec<SensorChannel>,
    pub scaler: FeatureScaler,
    pub pool: BaseModelPool,
    pub assembler: MetaFeatureAssembler,
    pub meta: MetaClassifier,
    pub codec: LabelCodec,
    pub masker: IdentityMasker,
}

#[derive(Debug)]
pub struct PredictionOrchestrator {
    channels: Vec<SensorChannel>,
    scaler: FeatureScaler,
    pool: BaseModelPool,
    assembler: MetaFeatureAssembler,
    meta: MetaClassifier,
    codec: LabelCodec,
    masker: IdentityMasker,
}

impl PredictionOrchestrator {
    /// Assembles a pipeline, rejecting components that cannot work together
    pub fn new(parts: PipelineParts) -> EnoseResult<Self> {
        let PipelineParts {
            channels,
            scaler,
            pool,
            assembler,
            meta,
            codec,
            masker,
        } = parts;

        let n = scaler.n_features();
        if channels.len() != n {
            return Err(EnoseError::Inconsistent(format!(
                "{} channels configured but the scaler was fitted on {}",
                channels.len(),
                n
            )));
        }

        for member in pool.members() {
            if member.handle.n_features() != n {
                return Err(EnoseError::Inconsistent(format!(
                    "base model '{}' expects {} features, readings have {}",
                    member.name,
                    member.handle.n_features(),
                    n
                )));
            }
            if member.handle.classes() != meta.classes() {
                return Err(EnoseError::Inconsistent(format!(
                    "base model '{}' classes {:?} disagree with meta classes {:?}",
                    member.name,
                    member.handle.classes(),
                    meta.classes()
                )));
            }
        }

        let layout = pool.layout();
        if !assembler.layout().same_as(&layout) {
            return Err(EnoseError::Inconsistent(format!(
                "meta model was trained on [{}], pool provides [{}]",
                assembler.layout().describe(),
                layout.describe()
            )));
        }
        if meta.n_features() != assembler.width() {
            return Err(EnoseError::Inconsistent(format!(
                "meta model expects {} features, layout provides {}",
                meta.n_features(),
                assembler.width()
            )));
        }

        let mut aliases = HashSet::new();
        let names = pool
            .names()
            .into_iter()
            .map(str::to_string)
            .chain(std::iter::once(ModelId::Meta.name().to_string()));
        for name in names {
            let Ok(id) = name.parse::<ModelId>();
            let alias = masker.mask_model(&id);
            if !aliases.insert(alias.clone()) {
                return Err(EnoseError::Inconsistent(format!(
                    "model '{}' would be reported as '{}', which is already taken",
                    name, alias
                )));
            }
        }

        let mut channel_aliases = HashSet::new();
        for channel in &channels {
            let alias = masker.mask_channel(channel);
            if !channel_aliases.insert(alias.clone()) {
                return Err(EnoseError::Inconsistent(format!(
                    "channel '{}' would be reported as '{}', which is already taken",
                    channel, alias
                )));
            }
        }

        Ok(Self {
            channels,
            scaler,
            pool,
            assembler,
            meta,
            codec,
            masker,
        })
    }

    /// Classifies one raw reading
    pub fn run(&self, reading: &SensorReading) -> EnoseResult<EnsembleResult> {
        let expected = self.n_features();
        if reading.len() != expected {
            return Err(EnoseError::Validation {
                expected,
                received: reading.len(),
            });
        }
        if let Some(position) = reading.first_non_finite() {
            return Err(EnoseError::NonFiniteInput { position });
        }

        let scaled = self.scaler.scale(reading)?;
        let outputs = self.pool.infer(&scaled)?;
        let features = self.assembler.assemble(&outputs)?;
        let decision = self.meta.predict(&features)?;

        let mut labelled = Vec::with_capacity(outputs.len() + 1);
        for output in &outputs {
            let label = self.codec.decode(output.class_index)?;
            labelled.push((
                output.name.clone(),
                ModelPrediction {
                    model: String::new(),
                    class_label: label.to_string(),
                    probability: output
                        .probability()
                        .map(|p| round_to(p, PROBABILITY_PLACES)),
                },
            ));
        }
        labelled.push((
            ModelId::Meta.name().to_string(),
            ModelPrediction {
                model: String::new(),
                class_label: self.codec.decode(decision.class_index)?.to_string(),
                probability: Some(decision.probability),
            },
        ));

        let predictions = self
            .masker
            .mask_models(labelled)
            .into_iter()
            .map(|(alias, prediction)| ModelPrediction {
                model: alias,
                ..prediction
            })
            .collect();

        Ok(EnsembleResult {
            input_data: reading.values().to_vec(),
            predictions,
        })
    }

    /// Reading width N
    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    /// Channel aliases in reading order
    pub fn masked_channels(&self) -> Vec<String> {
        self.masker.mask_channels(&self.channels)
    }

    pub fn codec(&self) -> &LabelCodec {
        &self.codec
    }

    pub fn pool(&self) -> &BaseModelPool {
        &self.pool
    }

    /// Class indices the codec cannot name
    pub fn uncovered_classes(&self) -> Vec<usize> {
        self.meta
            .classes()
            .iter()
            .copied()
            .filter(|&c| c >= self.codec.len())
            .collect()
    }

    /// Masked model list, base models in order then the meta model
    pub fn models(&self) -> Vec<ModelSummary> {
        let mut models: Vec<ModelSummary> = self
            .pool
            .members()
            .iter()
            .map(|m| {
                let Ok(id) = m.name.parse::<ModelId>();
                ModelSummary {
                    name: self.masker.mask_model(&id),
                    role: "base",
                    capability: m.handle.capability(),
                    classes: m.handle.width(),
                }
            })
            .collect();

        models.push(ModelSummary {
            name: self.masker.mask_model(&ModelId::Meta),
            role: "meta",
            capability: Capability::Probabilistic,
            classes: self.meta.classes().len(),
        });
        models
    }
}

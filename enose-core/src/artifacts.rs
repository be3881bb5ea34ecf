//! Artifact loading
//!
//! [`ArtifactStore`] reads every artifact named by an [`EnsembleConfig`] in
//! one step and hands back a checked [`PredictionOrchestrator`].
//! [`PipelineCell`] memoizes that step: the first caller loads, concurrent
//! callers wait for it, and a failed load leaves the cell empty so the next
//! call tries again.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::assembler::MetaFeatureAssembler;
use crate::codec::{LabelCodec, LabelParams};
use crate::config::EnsembleConfig;
use crate::error::{EnoseError, EnoseResult};
use crate::meta::{MetaArtifact, MetaClassifier};
use crate::model::{ClassifierHandle, ModelArtifact};
use crate::orchestrator::{PipelineParts, PredictionOrchestrator};
use crate::pool::BaseModelPool;
use crate::scaler::{FeatureScaler, ScalerParams};
use crate::types::ModelId;

/// Reads and deserializes one JSON artifact
pub fn read_json<T: DeserializeOwned>(path: &Path) -> EnoseResult<T> {
    let bytes = fs::read(path).map_err(|e| EnoseError::artifact(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| EnoseError::artifact(path, e))
}

/// Writes one artifact as pretty JSON
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> EnoseResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| EnoseError::artifact(path, e))?;
    fs::write(path, json).map_err(|e| EnoseError::artifact(path, e))
}

/// Directory of persisted artifacts described by a config
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    config: EnsembleConfig,
}

impl ArtifactStore {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn load_scaler(&self) -> EnoseResult<FeatureScaler> {
        let path = self.config.artifact_path(&self.config.scaler);
        let params: ScalerParams = read_json(&path)?;
        FeatureScaler::from_params(params).map_err(|e| EnoseError::artifact(&path, e))
    }

    pub fn load_codec(&self) -> EnoseResult<LabelCodec> {
        let path = self.config.artifact_path(&self.config.labels);
        let params: LabelParams = read_json(&path)?;
        LabelCodec::from_params(params).map_err(|e| EnoseError::artifact(&path, e))
    }

    /// Loads one model artifact into a handle
    pub fn load_model(&self, file: &str) -> EnoseResult<ClassifierHandle> {
        let path = self.config.artifact_path(file);
        let artifact: ModelArtifact = read_json(&path)?;
        let kind = artifact.kind();
        let capability = artifact.capability();
        let handle = artifact
            .into_handle()
            .map_err(|reason| EnoseError::artifact(&path, reason))?;

        debug!(
            path = %path.display(),
            kind,
            capability = capability.name(),
            classes = handle.width(),
            "model artifact loaded"
        );
        Ok(handle)
    }

    pub fn load_pool(&self) -> EnoseResult<BaseModelPool> {
        let mut members = Vec::with_capacity(self.config.base_models.len());
        for entry in &self.config.base_models {
            members.push((entry.name.clone(), self.load_model(&entry.artifact)?));
        }

        Ok(BaseModelPool::new(members)?.with_parallel(self.config.parallel))
    }

    pub fn load_meta(&self) -> EnoseResult<(MetaFeatureAssembler, MetaClassifier)> {
        let path = self.config.artifact_path(&self.config.meta);
        let artifact: MetaArtifact = read_json(&path)?;
        let handle = artifact
            .model
            .into_handle()
            .map_err(|reason| EnoseError::artifact(&path, reason))?;
        let meta = MetaClassifier::new(handle)?;

        Ok((
            MetaFeatureAssembler::new(artifact.layout, ModelId::Meta.name()),
            meta,
        ))
    }

    /// Loads and cross-checks every artifact
    pub fn load(&self) -> EnoseResult<PredictionOrchestrator> {
        let started = Instant::now();
        info!(dir = %self.config.artifact_dir.display(), "loading artifacts");

        let scaler = self.load_scaler()?;
        let codec = self.load_codec()?;
        let pool = self.load_pool()?;
        let (assembler, meta) = self.load_meta()?;

        let orchestrator = PredictionOrchestrator::new(PipelineParts {
            channels: self.config.channels.clone(),
            scaler,
            pool,
            assembler,
            meta,
            codec,
            masker: self.config.masker()?,
        })?;

        let uncovered = orchestrator.uncovered_classes();
        if !uncovered.is_empty() {
            warn!(
                classes = ?uncovered,
                labels = orchestrator.codec().len(),
                "label set does not name every class; predictions of these classes will fail"
            );
        }

        info!(
            features = orchestrator.n_features(),
            base_models = orchestrator.pool().len(),
            classes = orchestrator.codec().len(),
            parallel = orchestrator.pool().is_parallel(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline ready"
        );
        Ok(orchestrator)
    }
}

/// Lazily loaded, shared pipeline
#[derive(Debug)]
pub struct PipelineCell {
    store: ArtifactStore,
    cell: OnceCell<Arc<PredictionOrchestrator>>,
    attempts: AtomicUsize,
}

impl PipelineCell {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            store,
            cell: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Returns the pipeline, loading it on first use
    pub fn get(&self) -> EnoseResult<Arc<PredictionOrchestrator>> {
        self.cell
            .get_or_try_init(|| {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                match self.store.load() {
                    Ok(orchestrator) => Ok(Arc::new(orchestrator)),
                    Err(err) => {
                        warn!(error = %err, "artifact load failed");
                        Err(err)
                    }
                }
            })
            .cloned()
    }

    /// The pipeline if it is already loaded; never triggers a load
    pub fn loaded(&self) -> Option<Arc<PredictionOrchestrator>> {
        self.cell.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Number of load attempts so far
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }
}

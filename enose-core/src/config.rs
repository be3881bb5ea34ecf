//! Ensemble configuration (enose.toml)
//!
//! ```toml
//! artifact_dir = "artifacts"
//! channels = ["MQ2", "MQ3", "MQ4", "MQ6", "MQ7", "MQ135", "TEMP", "HUMI"]
//! scaler = "scaler.json"
//! labels = "labels.json"
//! meta = "meta.json"
//! parallel = false
//!
//! [[base_models]]
//! name = "random_forest"
//! artifact = "random_forest.json"
//!
//! [masking.models]
//! knn = "base_4"
//! ```
//!
//! Base models are listed in the order the meta model was trained against.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EnoseError, EnoseResult};
use crate::masker::IdentityMasker;
use crate::types::{ModelId, SensorChannel};

/// Immutable pipeline configuration, injected into the loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Directory holding every artifact; relative paths resolve against the
    /// config file's directory
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Channel names in reading order
    #[serde(default = "SensorChannel::bench_layout")]
    pub channels: Vec<SensorChannel>,

    #[serde(default = "default_scaler")]
    pub scaler: String,

    #[serde(default = "default_labels")]
    pub labels: String,

    #[serde(default = "default_meta")]
    pub meta: String,

    /// Fan base models out across scoped threads
    #[serde(default)]
    pub parallel: bool,

    /// Base models in registration order
    #[serde(default = "default_base_models")]
    pub base_models: Vec<BaseModelEntry>,

    #[serde(default)]
    pub masking: MaskingConfig,
}

/// One `[[base_models]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseModelEntry {
    pub name: String,
    pub artifact: String,
}

impl BaseModelEntry {
    pub fn new(name: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artifact: artifact.into(),
        }
    }
}

/// `[masking]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// When false, internal names are reported as-is
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Channel name → alias overrides
    #[serde(default)]
    pub channels: BTreeMap<String, String>,

    /// Model name → alias overrides
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: BTreeMap::new(),
            models: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_scaler() -> String {
    "scaler.json".to_string()
}

fn default_labels() -> String {
    "labels.json".to_string()
}

fn default_meta() -> String {
    "meta.json".to_string()
}

fn default_base_models() -> Vec<BaseModelEntry> {
    [
        ModelId::RandomForest,
        ModelId::XgBoost,
        ModelId::Knn,
        ModelId::Ann,
    ]
    .iter()
    .map(|id| BaseModelEntry::new(id.name(), format!("{}.json", id.name())))
    .collect()
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            channels: SensorChannel::bench_layout(),
            scaler: default_scaler(),
            labels: default_labels(),
            meta: default_meta(),
            parallel: false,
            base_models: default_base_models(),
            masking: MaskingConfig::default(),
        }
    }
}

/// Parses and validates a TOML document
impl FromStr for EnsembleConfig {
    type Err = EnoseError;

    fn from_str(content: &str) -> EnoseResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

impl EnsembleConfig {

    /// Loads a config file; a relative `artifact_dir` is anchored at the
    /// file's directory
    pub fn from_file(path: &Path) -> EnoseResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EnoseError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut config: Self = content.parse()?;

        if config.artifact_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.artifact_dir = parent.join(&config.artifact_dir);
            }
        }

        Ok(config)
    }

    /// Default layout with every artifact under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn to_toml(&self) -> EnoseResult<String> {
        toml::to_string_pretty(self).map_err(|e| EnoseError::Config(e.to_string()))
    }

    pub fn validate(&self) -> EnoseResult<()> {
        if self.channels.is_empty() {
            return Err(EnoseError::Config("no channels configured".into()));
        }
        let channels: HashSet<_> = self.channels.iter().collect();
        if channels.len() != self.channels.len() {
            return Err(EnoseError::Config("channel listed twice".into()));
        }

        if self.base_models.is_empty() {
            return Err(EnoseError::Config("no base models configured".into()));
        }
        let mut names = HashSet::new();
        for entry in &self.base_models {
            if entry.name.trim().is_empty() || entry.artifact.trim().is_empty() {
                return Err(EnoseError::Config(
                    "base model entries need a name and an artifact".into(),
                ));
            }
            let Ok(id) = entry.name.parse::<ModelId>();
            if id == ModelId::Meta {
                return Err(EnoseError::Config(format!(
                    "'{}' is reserved for the meta model",
                    entry.name
                )));
            }
            if !names.insert(id) {
                return Err(EnoseError::Config(format!(
                    "base model '{}' listed twice",
                    entry.name
                )));
            }
        }

        for (what, file) in [
            ("scaler", &self.scaler),
            ("labels", &self.labels),
            ("meta", &self.meta),
        ] {
            if file.trim().is_empty() {
                return Err(EnoseError::Config(format!("{} artifact is empty", what)));
            }
        }

        Ok(())
    }

    /// Number of raw features N
    pub fn n_features(&self) -> usize {
        self.channels.len()
    }

    pub fn artifact_path(&self, file: &str) -> PathBuf {
        self.artifact_dir.join(file)
    }

    /// Builds the masker from the built-in tables plus overrides
    pub fn masker(&self) -> EnoseResult<IdentityMasker> {
        if !self.masking.enabled {
            return Ok(IdentityMasker::passthrough());
        }

        let channels: HashMap<SensorChannel, String> = self
            .masking
            .channels
            .iter()
            .map(|(name, alias)| {
                let Ok(channel) = name.parse::<SensorChannel>();
                (channel, alias.clone())
            })
            .collect();
        let models: HashMap<ModelId, String> = self
            .masking
            .models
            .iter()
            .map(|(name, alias)| {
                let Ok(model) = name.parse::<ModelId>();
                (model, alias.clone())
            })
            .collect();

        IdentityMasker::with_overrides(channels, models)
    }
}

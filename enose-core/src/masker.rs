//! Public aliases for internal channel and model names
//!
//! Responses never expose which sensor part or which model family produced a
//! value. Lookups fail open: a name without an alias passes through unchanged so
//! new channels or models keep working before the tables learn about them.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::error::{EnoseError, EnoseResult};
use crate::types::{ModelId, SensorChannel};

/// Built-in alias of a known channel
pub fn default_channel_alias(channel: &SensorChannel) -> Option<&'static str> {
    match channel {
        SensorChannel::Mq136 => Some("sensor_1"),
        SensorChannel::Mq137 => Some("sensor_2"),
        SensorChannel::Temp => Some("sensor_3"),
        SensorChannel::Humi => Some("sensor_4"),
        SensorChannel::Mq2 => Some("sensor_5"),
        SensorChannel::Mq3 => Some("sensor_6"),
        SensorChannel::Mq4 => Some("sensor_7"),
        SensorChannel::Mq6 => Some("sensor_8"),
        SensorChannel::Mq7 => Some("sensor_9"),
        SensorChannel::Mq135 => Some("sensor_10"),
        SensorChannel::Other(_) => None,
    }
}

/// Built-in alias of a known model
pub fn default_model_alias(model: &ModelId) -> Option<&'static str> {
    match model {
        ModelId::Ann => Some("base_1"),
        ModelId::RandomForest => Some("base_2"),
        ModelId::XgBoost => Some("base_3"),
        ModelId::Knn => Some("base_4"),
        ModelId::Meta => Some("meta"),
        ModelId::Other(_) => None,
    }
}

/// Injective name → alias translation, fixed after construction
#[derive(Debug, Clone)]
pub struct IdentityMasker {
    channels: HashMap<SensorChannel, String>,
    models: HashMap<ModelId, String>,
}

impl IdentityMasker {
    /// Builds a masker from explicit tables; duplicate aliases are rejected.
    pub fn new(
        channels: HashMap<SensorChannel, String>,
        models: HashMap<ModelId, String>,
    ) -> EnoseResult<Self> {
        ensure_injective("channel", &channels)?;
        ensure_injective("model", &models)?;
        Ok(Self { channels, models })
    }

    /// Masker with no aliases at all
    pub fn passthrough() -> Self {
        Self {
            channels: HashMap::new(),
            models: HashMap::new(),
        }
    }

    /// Built-in tables with the given overrides applied on top
    pub fn with_overrides(
        channel_overrides: HashMap<SensorChannel, String>,
        model_overrides: HashMap<ModelId, String>,
    ) -> EnoseResult<Self> {
        let Self {
            mut channels,
            mut models,
        } = Self::default();

        channels.extend(channel_overrides);
        models.extend(model_overrides);

        Self::new(channels, models)
    }

    pub fn mask_channel(&self, channel: &SensorChannel) -> String {
        self.channels
            .get(channel)
            .cloned()
            .unwrap_or_else(|| channel.name().to_string())
    }

    pub fn mask_channels(&self, channels: &[SensorChannel]) -> Vec<String> {
        channels.iter().map(|c| self.mask_channel(c)).collect()
    }

    pub fn mask_model(&self, model: &ModelId) -> String {
        self.models
            .get(model)
            .cloned()
            .unwrap_or_else(|| model.name().to_string())
    }

    /// Re-keys `(model name, value)` pairs by alias, keeping their order
    pub fn mask_models<T>(&self, predictions: Vec<(String, T)>) -> Vec<(String, T)> {
        predictions
            .into_iter()
            .map(|(name, value)| {
                let Ok(id) = name.parse::<ModelId>();
                let alias = match self.models.get(&id) {
                    Some(alias) => alias.clone(),
                    None => name,
                };
                (alias, value)
            })
            .collect()
    }
}

/// Built-in tables only
impl Default for IdentityMasker {
    fn default() -> Self {
        let channels = SensorChannel::known()
            .into_iter()
            .filter_map(|c| default_channel_alias(&c).map(|a| (c, a.to_string())))
            .collect();
        let models = ModelId::known()
            .into_iter()
            .filter_map(|m| default_model_alias(&m).map(|a| (m, a.to_string())))
            .collect();

        Self { channels, models }
    }
}

fn ensure_injective<K: Eq + Hash + std::fmt::Debug>(
    what: &str,
    table: &HashMap<K, String>,
) -> EnoseResult<()> {
    let mut seen = HashSet::with_capacity(table.len());
    for alias in table.values() {
        if !seen.insert(alias.as_str()) {
            return Err(EnoseError::Config(format!(
                "{} alias '{}' is assigned more than once",
                what, alias
            )));
        }
    }
    Ok(())
}

//! Stage registry: name to factory.
//!
//! Config files name stages by id (`"processor": "governor"`). The registry
//! maps each id to a descriptor and a factory that builds the stage from its
//! JSON config. New stage types are added by implementing
//! [`ProcessingStage`] and registering a factory; nothing branches on a stage
//! kind.

use mixtree_core::ProcessingStage;

use crate::StageError;
use crate::delay::{DELAY_ID, Delay};
use crate::gain::{GAIN_ID, Gain};
use crate::governor::{GOVERNOR_ID, Governor};

/// Describes a stage in the registry.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    /// Id used in config files (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the stage.
    pub description: &'static str,
    /// Config keys the stage reads.
    pub config_keys: &'static [&'static str],
}

/// Factory function type for creating stages.
///
/// Arguments are the stage's JSON config and the channel count of the owning
/// pipeline.
pub type StageFactory =
    fn(&serde_json::Value, usize) -> Result<Box<dyn ProcessingStage + Send>, StageError>;

struct RegistryEntry {
    descriptor: StageDescriptor,
    factory: StageFactory,
}

/// Registry of available processing stages.
pub struct StageRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StageRegistry {
    /// Create a new registry with all built-in stages registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(3),
        };
        registry.register_builtin_stages();
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn register_builtin_stages(&mut self) {
        self.register(
            StageDescriptor {
                id: GOVERNOR_ID,
                name: "Governor",
                description: "Clamps output gain once stream volume reaches an onset",
                config_keys: &["onset_volume", "clamp_multiplier"],
            },
            |config, channels| Ok(Box::new(Governor::from_config(config, channels)?)),
        );

        self.register(
            StageDescriptor {
                id: GAIN_ID,
                name: "Gain",
                description: "Constant linear gain",
                config_keys: &["gain", "gain_db"],
            },
            |config, _| Ok(Box::new(Gain::from_config(config)?)),
        );

        self.register(
            StageDescriptor {
                id: DELAY_ID,
                name: "Delay",
                description: "Fixed latency line that reports its rendering delay",
                config_keys: &["delay_ms"],
            },
            |config, channels| Ok(Box::new(Delay::from_config(config, channels)?)),
        );
    }

    /// Register a stage. Lookups return the first entry with a matching id.
    pub fn register(&mut self, descriptor: StageDescriptor, factory: StageFactory) {
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Returns descriptors for all registered stages.
    pub fn all_stages(&self) -> Vec<&StageDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Get a descriptor by stage id.
    pub fn get(&self, id: &str) -> Option<&StageDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Build a stage by id from its config.
    ///
    /// # Errors
    ///
    /// [`StageError::UnknownStage`] if `id` is not registered, otherwise
    /// whatever the stage's factory reports for `config`.
    pub fn create(
        &self,
        id: &str,
        config: &serde_json::Value,
        num_channels: usize,
    ) -> Result<Box<dyn ProcessingStage + Send>, StageError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .ok_or_else(|| StageError::UnknownStage(id.to_string()))?;
        tracing::debug!(stage = id, channels = num_channels, "creating stage");
        (entry.factory)(config, num_channels)
    }

    /// Returns the number of registered stages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no stages are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtree_core::ChannelBuffer;
    use serde_json::json;

    #[test]
    fn registry_creation() {
        let registry = StageRegistry::new();
        assert_eq!(registry.len(), 3);
        assert!(StageRegistry::empty().is_empty());
    }

    #[test]
    fn get_stage() {
        let registry = StageRegistry::new();
        assert_eq!(registry.get("governor").unwrap().name, "Governor");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn create_stage() {
        let registry = StageRegistry::new();
        let mut stage = registry
            .create("governor", &json!({"onset_volume": 0.5, "clamp_multiplier": 0.5}), 2)
            .unwrap();
        assert_eq!(stage.name(), "governor");
        stage.set_sample_rate(48000);
        let mut data = ChannelBuffer::new(2, 16);
        assert_eq!(stage.process_frames(&mut data, 16, 1.0), 0);
    }

    #[test]
    fn unknown_stage_is_an_error() {
        let registry = StageRegistry::new();
        let err = registry.create("reverb", &json!({}), 2).err().unwrap();
        assert!(matches!(err, StageError::UnknownStage(ref id) if id == "reverb"));
    }

    #[test]
    fn factory_errors_propagate() {
        let registry = StageRegistry::new();
        let err = registry.create("delay", &json!({"delay_ms": "long"}), 2).err().unwrap();
        assert!(matches!(err, StageError::Json(_)));
    }

    #[test]
    fn custom_stage_can_be_registered() {
        let mut registry = StageRegistry::empty();
        registry.register(
            StageDescriptor {
                id: "unity",
                name: "Unity",
                description: "Gain of one",
                config_keys: &[],
            },
            |_, _| Ok(Box::new(Gain::new(1.0)?)),
        );
        assert!(registry.create("unity", &json!(null), 1).is_ok());
        assert_eq!(registry.all_stages().len(), 1);
    }
}

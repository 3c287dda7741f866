//! Pipeline description types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One entry of a `processors` list.
///
/// ```json
/// {"processor": "governor", "config": {"onset_volume": 0.9, "clamp_multiplier": 0.6}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Registry id of the stage.
    pub processor: String,

    /// Stage-specific config; `null` when omitted.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl ProcessorConfig {
    /// Create a processor entry.
    pub fn new(processor: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            processor: processor.into(),
            config,
        }
    }
}

/// A stage chain plus the stream types routed through it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPipelineDescriptor {
    /// Stages in application order.
    pub processors: Vec<ProcessorConfig>,
    /// Device ids accepted by the group, without duplicates.
    pub stream_types: BTreeSet<String>,
}

impl StreamPipelineDescriptor {
    /// Name of the group built from this descriptor: its alphabetically first
    /// stream type, or `fallback` if it lists none.
    pub fn group_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.stream_types.first().map_or(fallback, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_defaults_to_null() {
        let p: ProcessorConfig = serde_json::from_value(json!({"processor": "gain"})).unwrap();
        assert_eq!(p, ProcessorConfig::new("gain", serde_json::Value::Null));
    }

    #[test]
    fn group_name_is_first_stream_type() {
        let d = StreamPipelineDescriptor {
            processors: Vec::new(),
            stream_types: ["tts", "alarm", "communications"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        assert_eq!(d.group_name("x"), "alarm");

        let empty = StreamPipelineDescriptor {
            processors: Vec::new(),
            stream_types: BTreeSet::new(),
        };
        assert_eq!(empty.group_name("x"), "x");
    }
}

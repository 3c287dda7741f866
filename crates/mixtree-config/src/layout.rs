//! Building a [`MixerLayout`] from a parsed config.

use mixtree_core::{LINEARIZE_GROUP, MIX_GROUP, MixerLayout, ProcessingPipeline, StreamGroupSpec};
use mixtree_stages::StageRegistry;

use crate::ConfigError;
use crate::descriptor::ProcessorConfig;
use crate::parser::PipelineParser;

/// Builds a pipeline named `name` from a `processors` list.
///
/// # Errors
///
/// [`ConfigError::Stage`] if a processor is unknown or its config is invalid.
pub fn build_pipeline(
    name: &str,
    processors: &[ProcessorConfig],
    registry: &StageRegistry,
    num_channels: usize,
) -> Result<ProcessingPipeline, ConfigError> {
    let mut pipeline = ProcessingPipeline::new(name, num_channels);
    for p in processors {
        pipeline.push(registry.create(&p.processor, &p.config, num_channels)?);
    }
    tracing::debug!(pipeline = name, stages = ?pipeline.stage_names(), "built pipeline");
    Ok(pipeline)
}

/// Builds every stage the config names and returns the mixer layout.
///
/// Each stream group is named after its alphabetically first stream type;
/// a descriptor with no stream types is named `output_stream_<index>`.
///
/// # Errors
///
/// [`ConfigError::Stage`] if any processor is unknown or misconfigured.
pub fn build_layout(
    parser: &PipelineParser,
    registry: &StageRegistry,
    num_channels: usize,
) -> Result<MixerLayout, ConfigError> {
    let mut streams = Vec::new();
    for (i, descriptor) in parser.stream_pipelines().iter().enumerate() {
        let fallback = format!("output_stream_{i}");
        let name = descriptor.group_name(&fallback).to_string();
        let pipeline = build_pipeline(&name, &descriptor.processors, registry, num_channels)?;
        streams.push(StreamGroupSpec {
            name,
            device_ids: descriptor.stream_types.iter().cloned().collect(),
            pipeline,
        });
    }

    Ok(MixerLayout {
        streams,
        mix: build_pipeline(MIX_GROUP, parser.mix_pipeline(), registry, num_channels)?,
        linearize: build_pipeline(
            LINEARIZE_GROUP,
            parser.linearize_pipeline(),
            registry,
            num_channels,
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtree_stages::StageError;
    use serde_json::json;

    #[test]
    fn builds_named_groups_and_shared_pipelines() {
        let parser = PipelineParser::from_json(
            r#"{
                "output_streams": [
                    {"processors": [{"processor": "governor", "config": {"onset_volume": 0.9, "clamp_multiplier": 0.6}}],
                     "streams": ["tts", "alarm"]},
                    {"processors": [], "streams": []}
                ],
                "mix": {"processors": [{"processor": "delay", "config": {"delay_ms": 5}}]},
                "linearize": {"processors": [{"processor": "gain", "config": {"gain": 0.5}}]}
            }"#,
        )
        .unwrap();
        let layout = build_layout(&parser, &StageRegistry::new(), 2).unwrap();

        assert_eq!(layout.streams.len(), 2);
        assert_eq!(layout.streams[0].name, "alarm");
        assert_eq!(layout.streams[0].device_ids, vec!["alarm", "tts"]);
        assert_eq!(layout.streams[0].pipeline.stage_names(), vec!["governor"]);
        assert_eq!(layout.streams[1].name, "output_stream_1");
        assert_eq!(layout.mix.stage_names(), vec!["delay"]);
        assert_eq!(layout.linearize.stage_names(), vec!["gain"]);
        assert_eq!(layout.mix.num_channels(), 2);
    }

    #[test]
    fn unknown_processor_is_fatal() {
        let processors = vec![ProcessorConfig::new("reverb", json!({}))];
        let err = build_pipeline("g", &processors, &StageRegistry::new(), 2).unwrap_err();
        assert!(matches!(err, ConfigError::Stage(StageError::UnknownStage(_))));
    }

    #[test]
    fn invalid_stage_config_is_fatal() {
        let processors = vec![ProcessorConfig::new(
            "governor",
            json!({"onset_volume": 0.5, "clamp_multiplier": 2.0}),
        )];
        let err = build_pipeline("g", &processors, &StageRegistry::new(), 2).unwrap_err();
        assert!(matches!(err, ConfigError::Stage(StageError::InvalidConfig { .. })));
    }

    #[test]
    fn empty_config_is_passthrough() {
        let layout = build_layout(&PipelineParser::empty("x"), &StageRegistry::new(), 2).unwrap();
        assert!(layout.streams.is_empty());
        assert!(layout.mix.is_empty());
        assert!(layout.linearize.is_empty());
    }
}

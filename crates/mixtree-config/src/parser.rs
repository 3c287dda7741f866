//! Post-processing pipeline config parser.
//!
//! The config is one JSON object:
//!
//! ```json
//! {
//!   "output_streams": [
//!     { "processors": [ {"processor": "governor", "config": {...}} ],
//!       "streams": ["tts", "communications"] }
//!   ],
//!   "mix":       { "processors": [ ... ] },
//!   "linearize": { "processors": [ ... ] }
//! }
//! ```
//!
//! Every top-level key is optional. A missing key, or a missing file, means
//! pass-through: a warning is logged and the accessor returns an empty list.
//! Anything present but malformed is a [`ConfigError`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ConfigError;
use crate::descriptor::{ProcessorConfig, StreamPipelineDescriptor};

/// Where the config is read from when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mixtree/cast_audio.json";

const OUTPUT_STREAMS_KEY: &str = "output_streams";
const MIX_PIPELINE_KEY: &str = "mix";
const LINEARIZE_PIPELINE_KEY: &str = "linearize";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    output_streams: Option<Vec<RawStreamPipeline>>,
    mix: Option<RawPipeline>,
    linearize: Option<RawPipeline>,
}

#[derive(Debug, Deserialize)]
struct RawStreamPipeline {
    processors: Vec<ProcessorConfig>,
    streams: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPipeline {
    processors: Vec<ProcessorConfig>,
}

/// Parsed pipeline config.
#[derive(Debug, Clone)]
pub struct PipelineParser {
    file_path: PathBuf,
    stream_pipelines: Option<Vec<StreamPipelineDescriptor>>,
    mix: Option<Vec<ProcessorConfig>>,
    linearize: Option<Vec<ProcessorConfig>>,
}

impl PipelineParser {
    /// Parses config text. [`file_path`](Self::file_path) reports the default
    /// path.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Json`] for malformed JSON or a schema mismatch, and
    /// [`ConfigError::DuplicateStreamType`] if one `streams` list repeats a type.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::parse(json, PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Reads the config at `path`, or at [`DEFAULT_CONFIG_PATH`] if `None`.
    ///
    /// A file that does not exist is not an error: a warning is logged and the
    /// result is an empty, pass-through config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ReadFile`] if the file exists but cannot be read,
    /// otherwise as [`from_json`](Self::from_json).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), Path::to_path_buf);

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %path.display(),
                    "could not open post-processing config, using pass-through"
                );
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(ConfigError::read_file(path, e)),
        };

        let parser = Self::parse(&text, path)?;
        tracing::info!(
            path = %parser.file_path.display(),
            stream_pipelines = parser.stream_pipelines.as_ref().map_or(0, Vec::len),
            "loaded post-processing config"
        );
        Ok(parser)
    }

    /// A config with no keys: every accessor returns an empty list.
    pub fn empty(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            stream_pipelines: None,
            mix: None,
            linearize: None,
        }
    }

    fn parse(json: &str, file_path: PathBuf) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let stream_pipelines = raw
            .output_streams
            .map(|list| {
                list.into_iter()
                    .map(|raw| {
                        let mut stream_types = BTreeSet::new();
                        for stream in raw.streams {
                            if stream_types.contains(&stream) {
                                return Err(ConfigError::DuplicateStreamType(stream));
                            }
                            stream_types.insert(stream);
                        }
                        Ok(StreamPipelineDescriptor {
                            processors: raw.processors,
                            stream_types,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(Self {
            file_path,
            stream_pipelines,
            mix: raw.mix.map(|p| p.processors),
            linearize: raw.linearize.map(|p| p.processors),
        })
    }

    /// Stream-specific pipelines, in config order.
    pub fn stream_pipelines(&self) -> &[StreamPipelineDescriptor] {
        match &self.stream_pipelines {
            Some(pipelines) => pipelines,
            None => {
                tracing::warn!(
                    key = OUTPUT_STREAMS_KEY,
                    "no post-processors found for streams, no stream-specific processing will occur"
                );
                &[]
            }
        }
    }

    /// Processors of the `mix` pipeline.
    pub fn mix_pipeline(&self) -> &[ProcessorConfig] {
        self.pipeline_by_key(MIX_PIPELINE_KEY, self.mix.as_deref())
    }

    /// Processors of the `linearize` pipeline.
    pub fn linearize_pipeline(&self) -> &[ProcessorConfig] {
        self.pipeline_by_key(LINEARIZE_PIPELINE_KEY, self.linearize.as_deref())
    }

    fn pipeline_by_key<'a>(
        &self,
        key: &str,
        pipeline: Option<&'a [ProcessorConfig]>,
    ) -> &'a [ProcessorConfig] {
        pipeline.unwrap_or_else(|| {
            tracing::warn!(
                key,
                path = %self.file_path.display(),
                "no post-processor description found, using pass-through"
            );
            &[]
        })
    }

    /// Path the config was (or would have been) read from.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FULL: &str = r#"{
        "output_streams": [
            {
                "processors": [
                    {"processor": "governor", "config": {"onset_volume": 0.9, "clamp_multiplier": 0.6}}
                ],
                "streams": ["tts", "communications"]
            },
            { "processors": [], "streams": ["default"] }
        ],
        "mix": { "processors": [ {"processor": "gain", "config": {"gain": 0.8}} ] },
        "linearize": { "processors": [] }
    }"#;

    #[test]
    fn parses_all_sections() {
        let parser = PipelineParser::from_json(FULL).unwrap();
        let streams = parser.stream_pipelines();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].processors[0].processor, "governor");
        assert_eq!(
            streams[0].processors[0].config,
            json!({"onset_volume": 0.9, "clamp_multiplier": 0.6})
        );
        assert!(streams[0].stream_types.contains("communications"));
        assert_eq!(parser.mix_pipeline().len(), 1);
        assert!(parser.linearize_pipeline().is_empty());
        assert_eq!(parser.file_path(), Path::new(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn missing_keys_are_pass_through() {
        let parser = PipelineParser::from_json("{}").unwrap();
        assert!(parser.stream_pipelines().is_empty());
        assert!(parser.mix_pipeline().is_empty());
        assert!(parser.linearize_pipeline().is_empty());
    }

    #[test]
    fn duplicate_stream_type_is_fatal() {
        let json = r#"{"output_streams": [{"processors": [], "streams": ["tts", "alarm", "tts"]}]}"#;
        let err = PipelineParser::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateStreamType(ref s) if s == "tts"));
    }

    #[test]
    fn same_type_in_two_pipelines_is_allowed() {
        let json = r#"{"output_streams": [
            {"processors": [], "streams": ["tts"]},
            {"processors": [], "streams": ["tts"]}
        ]}"#;
        assert_eq!(PipelineParser::from_json(json).unwrap().stream_pipelines().len(), 2);
    }

    #[test]
    fn malformed_json_is_fatal() {
        assert!(matches!(
            PipelineParser::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            PipelineParser::from_json("[]"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn processors_key_is_required() {
        assert!(matches!(
            PipelineParser::from_json(r#"{"mix": {}}"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            PipelineParser::from_json(r#"{"output_streams": [{"processors": []}]}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn empty_config_has_path() {
        let parser = PipelineParser::empty("/tmp/none.json");
        assert_eq!(parser.file_path(), Path::new("/tmp/none.json"));
        assert!(parser.stream_pipelines().is_empty());
    }
}

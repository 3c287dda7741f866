//! Error types for configuration loading.

use std::path::PathBuf;
use thiserror::Error;

use mixtree_stages::StageError;

/// Errors that can occur while loading a config or building a layout from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read an existing file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid JSON or does not match the schema
    #[error("invalid pipeline config: {0}")]
    Json(#[from] serde_json::Error),

    /// A stream type is listed twice in one `streams` list
    #[error("duplicate stream type: {0}")]
    DuplicateStreamType(String),

    /// A processor could not be built
    #[error("failed to build processor: {0}")]
    Stage(#[from] StageError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock")
    }

    #[test]
    fn read_file_factory_produces_correct_variant() {
        let err = ConfigError::read_file("/some/path", mock_io_err());
        assert!(matches!(
            err,
            ConfigError::ReadFile { ref path, .. } if path == std::path::Path::new("/some/path")
        ));
    }

    #[test]
    fn read_file_display() {
        let err = ConfigError::read_file("/etc/cast_audio.json", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("failed to read file"), "got: {msg}");
        assert!(msg.contains("/etc/cast_audio.json"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn duplicate_stream_type_display() {
        let err = ConfigError::DuplicateStreamType("tts".to_string());
        assert_eq!(err.to_string(), "duplicate stream type: tts");
        assert!(err.source().is_none());
    }

    #[test]
    fn stage_error_converts() {
        let err: ConfigError = StageError::UnknownStage("reverb".to_string()).into();
        assert_eq!(
            err.to_string(),
            "failed to build processor: unknown processor: reverb"
        );
    }
}

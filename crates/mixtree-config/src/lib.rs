//! Pipeline configuration for mixtree.
//!
//! This crate reads the JSON file that describes which stages run on which
//! streams and assembles the [`MixerLayout`](mixtree_core::MixerLayout) a
//! [`Mixer`](mixtree_core::Mixer) is built from.
//!
//! # Features
//!
//! - **Parser**: [`PipelineParser`] loads per-stream, `mix` and `linearize`
//!   processor lists; missing pieces fall back to pass-through
//! - **Layout**: [`build_layout`] instantiates every stage through a
//!   [`StageRegistry`]
//!
//! # Example
//!
//! ```rust
//! use mixtree_config::{PipelineParser, StageRegistry, build_layout};
//! use mixtree_core::Mixer;
//!
//! let parser = PipelineParser::from_json(r#"{
//!     "output_streams": [{
//!         "processors": [{"processor": "governor",
//!                         "config": {"onset_volume": 0.9, "clamp_multiplier": 0.6}}],
//!         "streams": ["tts"]
//!     }]
//! }"#).unwrap();
//!
//! let layout = build_layout(&parser, &StageRegistry::new(), 2).unwrap();
//! let mixer = Mixer::new(layout, 2, 48000).unwrap();
//! assert_eq!(mixer.stream_groups().len(), 2); // tts + default
//! ```

mod descriptor;
mod error;
mod layout;
mod parser;

pub use descriptor::{ProcessorConfig, StreamPipelineDescriptor};
pub use error::ConfigError;
pub use layout::{build_layout, build_pipeline};
pub use parser::{DEFAULT_CONFIG_PATH, PipelineParser};

/// Re-export commonly used types from mixtree-stages
pub use mixtree_stages::{StageDescriptor, StageError, StageRegistry};

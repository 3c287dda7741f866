//! mixtree Core - real-time mixing tree and processing pipelines
//!
//! This crate provides the audio-thread half of mixtree: a tree of mixing
//! groups that combines live input streams, runs a chain of DSP stages on each
//! group, and hands one buffer per callback to an output sink.
//!
//! # Core Abstractions
//!
//! ## Buffers and Math
//!
//! - [`ChannelBuffer`] - Planar `f32` storage that only ever grows
//! - [`fmac`], [`fmul`] - Scaled accumulate / scaled copy
//! - [`frames_to_us`], [`ms_to_frames`], [`db_to_linear`] - Unit conversions
//!
//! ## Stages
//!
//! - [`ProcessingStage`] - Object-safe trait for every DSP stage
//! - [`ProcessingPipeline`] - Ordered stage chain owned by one group
//! - [`SlewedGain`] - Linear gain ramp for click-free gain changes
//!
//! ## Mixing
//!
//! - [`InputStream`] - Live, already-resampled input; [`PcmInput`] is in-memory
//! - [`MixingGroup`] - One node: inputs + children -> pipeline -> output
//! - [`MixingTree`] - Owning registry of groups and inputs, addressed by
//!   [`GroupId`] / [`InputId`]
//! - [`Mixer`] - Fixed `stream groups -> mix -> linearize` topology
//! - [`OutputSink`] - Destination for rendered, interleaved frames
//!
//! # Example
//!
//! ```rust
//! use mixtree_core::{Mixer, MixerLayout, PcmInput, VecSink};
//!
//! let mut mixer = Mixer::new(MixerLayout::passthrough(2), 2, 48000).unwrap();
//! let id = mixer.add_input(Box::new(PcmInput::from_interleaved("default", &[0.5; 512], 2)));
//! mixer.set_input_active(id, true).unwrap();
//!
//! let mut sink = VecSink::new();
//! let volume = mixer.render_to(&mut sink, 128).unwrap();
//! assert_eq!(volume, 1.0);
//! assert_eq!(sink.frames(), 128);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: buffer growth is the only allocation in the mix path
//! - **Single-threaded callback**: no locks; a built [`Mixer`] is `Send`
//! - **Handles, not pointers**: the tree owns every group and input

pub mod buffer;
pub mod group;
pub mod input;
pub mod math;
pub mod mixer;
pub mod param;
pub mod pipeline;
pub mod sink;
pub mod stage;
pub mod tree;

// Re-export main types at crate root
pub use buffer::ChannelBuffer;
pub use group::MixingGroup;
pub use input::{InputStream, PcmInput};
pub use math::{db_to_linear, fmac, fmul, frames_to_us, linear_to_db, ms_to_frames};
pub use mixer::{
    DEFAULT_DEVICE_ID, LINEARIZE_GROUP, MIX_GROUP, Mixer, MixerLayout, StreamGroupSpec,
};
pub use param::SlewedGain;
pub use pipeline::ProcessingPipeline;
pub use sink::{OutputSink, SinkError, VecSink, check_frames};
pub use stage::ProcessingStage;
pub use tree::{GroupId, InputId, MixingTree, TreeError};

//! Fixed gain stage.
//!
//! Multiplies every sample by a constant. Memoryless, no delay. Useful as a
//! trim in the `mix` or `linearize` chain.
//!
//! Config: `{"gain": 0.5}` (linear, finite, `>= 0`) or `{"gain_db": -6.0}`.
//! Exactly one of the two keys must be given.

use mixtree_core::{ChannelBuffer, ProcessingStage, db_to_linear};
use serde::Deserialize;

use crate::StageError;

/// Registry id.
pub const GAIN_ID: &str = "gain";

#[derive(Debug, Deserialize)]
struct GainConfig {
    gain: Option<f32>,
    gain_db: Option<f32>,
}

/// Constant linear gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    gain: f32,
}

impl Gain {
    /// Creates a gain stage.
    ///
    /// # Errors
    ///
    /// [`StageError::InvalidConfig`] if `gain` is negative or not finite.
    pub fn new(gain: f32) -> Result<Self, StageError> {
        if !gain.is_finite() || gain < 0.0 {
            return Err(StageError::invalid(
                GAIN_ID,
                format!("gain must be finite and >= 0, got {gain}"),
            ));
        }
        Ok(Self { gain })
    }

    /// Builds a gain stage from `{"gain": f32}` or `{"gain_db": f32}`.
    ///
    /// # Errors
    ///
    /// - [`StageError::Json`] if a key has the wrong type.
    /// - [`StageError::InvalidConfig`] if both keys or neither are given,
    ///   otherwise as [`new`](Self::new).
    pub fn from_config(config: &serde_json::Value) -> Result<Self, StageError> {
        match GainConfig::deserialize(config)? {
            GainConfig {
                gain: Some(gain),
                gain_db: None,
            } => Self::new(gain),
            GainConfig {
                gain: None,
                gain_db: Some(db),
            } => Self::new(db_to_linear(db)),
            _ => Err(StageError::invalid(
                GAIN_ID,
                "exactly one of 'gain' or 'gain_db' is required",
            )),
        }
    }

    /// Linear gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl ProcessingStage for Gain {
    fn name(&self) -> &str {
        GAIN_ID
    }

    fn set_sample_rate(&mut self, _sample_rate: u32) {}

    fn process_frames(&mut self, data: &mut ChannelBuffer, frames: usize, _volume: f32) -> usize {
        for ch in data.channels_mut() {
            for s in &mut ch[..frames] {
                *s *= self.gain;
            }
        }
        0
    }
}

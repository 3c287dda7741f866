//! Fixed latency line.
//!
//! Delays every channel by `delay_ms`, rounded to whole frames at the bound
//! sample rate. It reports that latency as its rendering delay and keeps
//! ringing until the last non-silent input frame has been played out.
//!
//! Config: `{"delay_ms": 20.0}` (finite, `0..=1000`).

use mixtree_core::{ChannelBuffer, ProcessingStage, ms_to_frames};
use serde::Deserialize;

use crate::StageError;

/// Registry id.
pub const DELAY_ID: &str = "delay";

/// Longest accepted delay.
pub const MAX_DELAY_MS: f32 = 1000.0;

#[derive(Debug, Deserialize)]
struct DelayConfig {
    delay_ms: f32,
}

/// Multi-channel fixed delay.
///
/// The ring buffers are sized in [`set_sample_rate`](ProcessingStage::set_sample_rate);
/// before a rate is bound the stage passes audio through.
#[derive(Debug, Clone)]
pub struct Delay {
    delay_ms: f32,
    num_channels: usize,
    lines: Vec<Vec<f32>>,
    write_pos: usize,
    delay_frames: usize,
    /// Frames since the last non-silent input frame, saturating at `delay_frames`.
    frames_since_audio: usize,
}

impl Delay {
    /// Creates a delay for `num_channels` channels.
    ///
    /// # Errors
    ///
    /// [`StageError::InvalidConfig`] if `delay_ms` is outside `0..=MAX_DELAY_MS`.
    pub fn new(delay_ms: f32, num_channels: usize) -> Result<Self, StageError> {
        if !(0.0..=MAX_DELAY_MS).contains(&delay_ms) {
            return Err(StageError::invalid(
                DELAY_ID,
                format!("delay_ms must be in 0..={MAX_DELAY_MS}, got {delay_ms}"),
            ));
        }
        Ok(Self {
            delay_ms,
            num_channels,
            lines: Vec::new(),
            write_pos: 0,
            delay_frames: 0,
            frames_since_audio: 0,
        })
    }

    /// Builds a delay from `{"delay_ms": f32}`.
    ///
    /// # Errors
    ///
    /// [`StageError::Json`] for a missing key, otherwise as [`new`](Self::new).
    pub fn from_config(
        config: &serde_json::Value,
        num_channels: usize,
    ) -> Result<Self, StageError> {
        let config = DelayConfig::deserialize(config)?;
        Self::new(config.delay_ms, num_channels)
    }

    /// Delay in frames at the bound sample rate.
    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    /// Configured delay in milliseconds.
    pub fn delay_ms(&self) -> f32 {
        self.delay_ms
    }
}

impl ProcessingStage for Delay {
    fn name(&self) -> &str {
        DELAY_ID
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.delay_frames = ms_to_frames(self.delay_ms, sample_rate);
        self.lines = vec![vec![0.0; self.delay_frames]; self.num_channels];
        self.write_pos = 0;
        self.frames_since_audio = self.delay_frames;
    }

    fn process_frames(&mut self, data: &mut ChannelBuffer, frames: usize, _volume: f32) -> usize {
        let len = self.delay_frames;
        if len == 0 {
            return 0;
        }

        for i in 0..frames {
            let mut audible = false;
            for (c, line) in self.lines.iter_mut().enumerate() {
                let s = &mut data.channel_mut(c)[i];
                audible |= *s != 0.0;
                let out = line[self.write_pos];
                line[self.write_pos] = *s;
                *s = out;
            }
            self.write_pos = (self.write_pos + 1) % len;
            self.frames_since_audio = if audible {
                0
            } else {
                (self.frames_since_audio + 1).min(len)
            };
        }
        len
    }

    fn is_ringing(&self) -> bool {
        self.frames_since_audio < self.delay_frames
    }
}

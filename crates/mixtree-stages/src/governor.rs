//! Volume-dependent output clamp.
//!
//! The governor protects small speakers at high volume. While the logical
//! stream volume is at or above `onset_volume`, every sample is scaled by
//! `clamp_multiplier`; below it the signal passes unchanged. Switching between
//! the two gains is slewed so the change does not click.
//!
//! # Algorithm
//!
//! 1. Target gain: `clamp_multiplier` if `volume >= onset_volume`, else `1.0`.
//! 2. The gain ramps linearly toward the target. A full-scale change takes
//!    `slew_time_ms` (default 50 ms).
//! 3. Frame `i` of a block is multiplied by the gain after `i` ramp steps, on
//!    every channel alike. A ramp split across blocks is identical to the same
//!    ramp in one block.
//!
//! The governor has no memory of past samples: it never rings and adds no
//! delay.
//!
//! # Config
//!
//! ```json
//! {"onset_volume": 0.9, "clamp_multiplier": 0.6}
//! ```
//!
//! | Key | Range | Description |
//! |-----|-------|-------------|
//! | `onset_volume` | any finite | Volume at which clamping starts (values above 1 never trigger) |
//! | `clamp_multiplier` | (0, 1] | Gain applied at or above onset |

use mixtree_core::{ChannelBuffer, ProcessingStage, SlewedGain};
use serde::Deserialize;

use crate::StageError;

/// Registry id.
pub const GOVERNOR_ID: &str = "governor";

#[derive(Debug, Deserialize)]
struct GovernorConfig {
    onset_volume: f32,
    clamp_multiplier: f32,
}

/// Volume-triggered gain clamp with a slewed transition.
///
/// # Example
///
/// ```rust
/// use mixtree_core::{ChannelBuffer, ProcessingStage};
/// use mixtree_stages::Governor;
///
/// let mut governor = Governor::new(0.9, 0.5, 1).unwrap();
/// governor.set_slew_time_ms(0.0);
/// governor.set_sample_rate(48000);
///
/// let mut data = ChannelBuffer::from_channels(vec![vec![0.8; 4]]);
/// governor.process_frames(&mut data, 4, 1.0);
/// assert_eq!(data.channel(0), &[0.4; 4]);
/// ```
#[derive(Debug, Clone)]
pub struct Governor {
    onset_volume: f32,
    clamp_multiplier: f32,
    num_channels: usize,
    gain: SlewedGain,
}

impl Governor {
    /// Full-scale slew time used unless overridden.
    pub const DEFAULT_SLEW_TIME_MS: f32 = 50.0;

    /// Creates a governor for `num_channels` channels.
    ///
    /// # Errors
    ///
    /// [`StageError::InvalidConfig`] if `onset_volume` is not finite or
    /// `clamp_multiplier` is outside `(0, 1]`.
    pub fn new(
        onset_volume: f32,
        clamp_multiplier: f32,
        num_channels: usize,
    ) -> Result<Self, StageError> {
        if !onset_volume.is_finite() {
            return Err(StageError::invalid(GOVERNOR_ID, "onset_volume must be finite"));
        }
        if !(clamp_multiplier > 0.0 && clamp_multiplier <= 1.0) {
            return Err(StageError::invalid(
                GOVERNOR_ID,
                format!("clamp_multiplier must be in (0, 1], got {clamp_multiplier}"),
            ));
        }
        Ok(Self {
            onset_volume,
            clamp_multiplier,
            num_channels,
            gain: SlewedGain::with_config(1.0, 0, Self::DEFAULT_SLEW_TIME_MS),
        })
    }

    /// Builds a governor from its JSON config. Both keys are required.
    ///
    /// # Errors
    ///
    /// [`StageError::Json`] for a missing or mistyped key, otherwise as
    /// [`new`](Self::new).
    pub fn from_config(
        config: &serde_json::Value,
        num_channels: usize,
    ) -> Result<Self, StageError> {
        let config = GovernorConfig::deserialize(config)?;
        Self::new(config.onset_volume, config.clamp_multiplier, num_channels)
    }

    /// Sets the full-scale slew time. `0.0` makes gain changes instant.
    pub fn set_slew_time_ms(&mut self, slew_time_ms: f32) {
        self.gain.set_slew_time_ms(slew_time_ms);
    }

    /// Volume at which clamping starts.
    pub fn onset_volume(&self) -> f32 {
        self.onset_volume
    }

    /// Gain applied at or above the onset volume.
    pub fn clamp_multiplier(&self) -> f32 {
        self.clamp_multiplier
    }

    /// Gain the next frame will use.
    pub fn current_gain(&self) -> f32 {
        self.gain.get()
    }

    fn target_gain(&self, volume: f32) -> f32 {
        if volume >= self.onset_volume {
            self.clamp_multiplier
        } else {
            1.0
        }
    }
}

impl ProcessingStage for Governor {
    fn name(&self) -> &str {
        GOVERNOR_ID
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        self.gain.set_sample_rate(sample_rate);
    }

    fn process_frames(&mut self, data: &mut ChannelBuffer, frames: usize, volume: f32) -> usize {
        debug_assert_eq!(
            data.num_channels(),
            self.num_channels,
            "governor fed the wrong channel count"
        );
        self.gain.set_target(self.target_gain(volume));

        if self.gain.is_settled() {
            let gain = self.gain.get();
            if gain != 1.0 {
                for ch in data.channels_mut() {
                    for s in &mut ch[..frames] {
                        *s *= gain;
                    }
                }
            }
            return 0;
        }

        for i in 0..frames {
            let gain = self.gain.next_gain();
            for ch in data.channels_mut() {
                ch[i] *= gain;
            }
        }
        0
    }
}

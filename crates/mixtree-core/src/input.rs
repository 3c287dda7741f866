//! Live input streams consumed by mixing groups.
//!
//! The mixer does not decode or resample. An [`InputStream`] hands over PCM
//! that is already at the output rate, together with a scalar effective
//! volume. [`PcmInput`] is a vector-backed implementation used by the CLI
//! renderer and by tests.

use crate::buffer::ChannelBuffer;
use crate::math::{fmac, fmul};

/// A live, already-resampled audio stream.
pub trait InputStream {
    /// Identifier matched against a group's accepted device ids.
    fn device_id(&self) -> &str;

    /// Current logical volume in `[0, 1]`.
    fn effective_volume(&self) -> f32;

    /// Fill the first `frames` frames of every channel of `dest` with the next
    /// block of this stream. Streams that run dry fill the rest with silence.
    fn get_resampled_data(&mut self, dest: &mut ChannelBuffer, frames: usize);

    /// Scale `src` by this stream's volume into `dest`.
    ///
    /// With `add_to_existing` the scaled samples are added to `dest`,
    /// otherwise they overwrite it.
    fn volume_scale_accumulate(
        &self,
        add_to_existing: bool,
        src: &[f32],
        frames: usize,
        dest: &mut [f32],
    ) {
        let volume = self.effective_volume();
        if add_to_existing {
            fmac(src, volume, frames, dest);
        } else {
            fmul(src, volume, frames, dest);
        }
    }
}

/// In-memory input stream over planar samples.
///
/// A mono source feeding a multi-channel group is copied to every channel;
/// extra source channels beyond the group's count are ignored.
#[derive(Debug, Clone)]
pub struct PcmInput {
    device_id: String,
    volume: f32,
    samples: ChannelBuffer,
    position: usize,
    looping: bool,
}

impl PcmInput {
    /// Creates a stream that plays `samples` once at full volume.
    pub fn new(device_id: impl Into<String>, samples: ChannelBuffer) -> Self {
        Self {
            device_id: device_id.into(),
            volume: 1.0,
            samples,
            position: 0,
            looping: false,
        }
    }

    /// Creates a stream from interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` is zero.
    pub fn from_interleaved(
        device_id: impl Into<String>,
        interleaved: &[f32],
        num_channels: usize,
    ) -> Self {
        assert!(num_channels > 0, "PcmInput needs at least one channel");
        let channels = (0..num_channels)
            .map(|c| interleaved.iter().skip(c).step_by(num_channels).copied().collect())
            .collect();
        Self::new(device_id, ChannelBuffer::from_channels(channels))
    }

    /// Sets the effective volume, clamped to `[0, 1]`.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.set_volume(volume);
        self
    }

    /// Restart from the beginning when the samples run out.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Sets the effective volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Frames not yet delivered (always non-zero while looping a non-empty source).
    pub fn remaining_frames(&self) -> usize {
        self.samples.frames() - self.position
    }

    /// `true` once a non-looping stream has delivered every frame.
    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.remaining_frames() == 0
    }
}

impl InputStream for PcmInput {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn effective_volume(&self) -> f32 {
        self.volume
    }

    fn get_resampled_data(&mut self, dest: &mut ChannelBuffer, frames: usize) {
        let total = self.samples.frames();
        let src_channels = self.samples.num_channels();
        let mut written = 0;

        while written < frames {
            if self.position == total {
                if self.looping && total > 0 {
                    self.position = 0;
                } else {
                    break;
                }
            }
            let n = (frames - written).min(total - self.position);
            for c in 0..dest.num_channels() {
                let src = &self.samples.channel(c.min(src_channels - 1))
                    [self.position..self.position + n];
                dest.channel_mut(c)[written..written + n].copy_from_slice(src);
            }
            self.position += n;
            written += n;
        }

        for ch in dest.channels_mut() {
            ch[written..frames].fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_blocks_then_pads_with_silence() {
        let samples = ChannelBuffer::from_channels(vec![vec![1.0, 2.0, 3.0]]);
        let mut input = PcmInput::new("tts", samples);
        let mut dest = ChannelBuffer::new(1, 2);

        input.get_resampled_data(&mut dest, 2);
        assert_eq!(dest.channel(0), &[1.0, 2.0]);
        input.get_resampled_data(&mut dest, 2);
        assert_eq!(dest.channel(0), &[3.0, 0.0]);
        assert!(input.is_exhausted());
    }

    #[test]
    fn looping_wraps_around() {
        let samples = ChannelBuffer::from_channels(vec![vec![1.0, 2.0]]);
        let mut input = PcmInput::new("music", samples).looping(true);
        let mut dest = ChannelBuffer::new(1, 5);
        input.get_resampled_data(&mut dest, 5);
        assert_eq!(dest.channel(0), &[1.0, 2.0, 1.0, 2.0, 1.0]);
        assert!(!input.is_exhausted());
    }

    #[test]
    fn mono_source_upmixes() {
        let mut input = PcmInput::new("x", ChannelBuffer::from_channels(vec![vec![0.5, 0.25]]));
        let mut dest = ChannelBuffer::new(2, 2);
        input.get_resampled_data(&mut dest, 2);
        assert_eq!(dest.channel(0), dest.channel(1));
    }

    #[test]
    fn from_interleaved_deinterleaves() {
        let mut input = PcmInput::from_interleaved("x", &[1.0, -1.0, 2.0, -2.0], 2);
        let mut dest = ChannelBuffer::new(2, 2);
        input.get_resampled_data(&mut dest, 2);
        assert_eq!(dest.channel(0), &[1.0, 2.0]);
        assert_eq!(dest.channel(1), &[-1.0, -2.0]);
    }

    #[test]
    fn volume_scale_accumulate_overwrites_then_adds() {
        let input = PcmInput::new("x", ChannelBuffer::new(1, 0)).with_volume(0.5);
        let src = [1.0, 1.0];
        let mut dest = [9.0, 9.0];
        input.volume_scale_accumulate(false, &src, 2, &mut dest);
        assert_eq!(dest, [0.5, 0.5]);
        input.volume_scale_accumulate(true, &src, 2, &mut dest);
        assert_eq!(dest, [1.0, 1.0]);
    }

    #[test]
    fn volume_is_clamped() {
        let input = PcmInput::new("x", ChannelBuffer::new(1, 0)).with_volume(3.0);
        assert_eq!(input.effective_volume(), 1.0);
    }
}

//! Planar multi-channel audio buffers.
//!
//! A [`ChannelBuffer`] holds one `Vec<f32>` per channel. The channel count is
//! fixed for the buffer's lifetime; the frame capacity only ever grows via
//! [`ensure_frames`](ChannelBuffer::ensure_frames), so that once the largest
//! callback size has been seen the audio path never allocates again.
//!
//! Buffers are zeroed lazily: [`zero_frames`](ChannelBuffer::zero_frames)
//! touches only the prefix that the current callback will read.

/// Planar (non-interleaved) `f32` audio buffer with a fixed channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBuffer {
    channels: Vec<Vec<f32>>,
    frames: usize,
}

impl ChannelBuffer {
    /// Creates a zeroed buffer with `num_channels` channels of `frames` samples.
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` is zero.
    pub fn new(num_channels: usize, frames: usize) -> Self {
        assert!(num_channels > 0, "ChannelBuffer needs at least one channel");
        Self {
            channels: (0..num_channels).map(|_| vec![0.0; frames]).collect(),
            frames,
        }
    }

    /// Builds a buffer from per-channel sample vectors.
    ///
    /// All channels are truncated to the shortest one.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is empty.
    pub fn from_channels(mut channels: Vec<Vec<f32>>) -> Self {
        assert!(!channels.is_empty(), "ChannelBuffer needs at least one channel");
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for ch in &mut channels {
            ch.truncate(frames);
        }
        Self { channels, frames }
    }

    /// Number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Capacity in frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Grows every channel to hold at least `frames` samples.
    ///
    /// Returns `true` if the buffer was reallocated. New samples are zero;
    /// existing samples are preserved. The buffer never shrinks.
    pub fn ensure_frames(&mut self, frames: usize) -> bool {
        if frames <= self.frames {
            return false;
        }
        for ch in &mut self.channels {
            ch.resize(frames, 0.0);
        }
        self.frames = frames;
        true
    }

    /// Zeroes the first `frames` samples of every channel.
    ///
    /// # Panics
    ///
    /// Panics if `frames` exceeds the buffer capacity.
    pub fn zero_frames(&mut self, frames: usize) {
        for ch in &mut self.channels {
            ch[..frames].fill(0.0);
        }
    }

    /// Read access to one channel (full capacity).
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Write access to one channel (full capacity).
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Iterates over all channels mutably.
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.channels.iter_mut().map(Vec::as_mut_slice)
    }

    /// Iterates over all channels.
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Returns `true` if every sample in the first `frames` frames is exactly zero.
    pub fn is_silent(&self, frames: usize) -> bool {
        self.channels
            .iter()
            .all(|ch| ch[..frames].iter().all(|&s| s == 0.0))
    }

    /// Writes the first `frames` frames into `dest` as interleaved samples.
    ///
    /// # Panics
    ///
    /// Panics if `dest` is shorter than `frames * num_channels()`.
    pub fn interleave_into(&self, frames: usize, dest: &mut [f32]) {
        let n = self.channels.len();
        assert!(
            dest.len() >= frames * n,
            "interleave destination too short: {} < {}",
            dest.len(),
            frames * n
        );
        for (c, ch) in self.channels.iter().enumerate() {
            for (f, &sample) in ch[..frames].iter().enumerate() {
                dest[f * n + c] = sample;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_but_never_shrinks() {
        let mut buf = ChannelBuffer::new(2, 4);
        assert!(buf.ensure_frames(8));
        assert_eq!(buf.frames(), 8);
        assert!(!buf.ensure_frames(2));
        assert_eq!(buf.frames(), 8);
        assert_eq!(buf.channel(1).len(), 8);
    }

    #[test]
    fn growth_preserves_existing_samples() {
        let mut buf = ChannelBuffer::new(1, 2);
        buf.channel_mut(0).copy_from_slice(&[0.5, -0.5]);
        buf.ensure_frames(4);
        assert_eq!(buf.channel(0), &[0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn zero_frames_is_partial() {
        let mut buf = ChannelBuffer::from_channels(vec![vec![1.0; 4], vec![2.0; 4]]);
        buf.zero_frames(2);
        assert_eq!(buf.channel(0), &[0.0, 0.0, 1.0, 1.0]);
        assert_eq!(buf.channel(1), &[0.0, 0.0, 2.0, 2.0]);
        assert!(buf.is_silent(2));
        assert!(!buf.is_silent(3));
    }

    #[test]
    fn from_channels_truncates_to_shortest() {
        let buf = ChannelBuffer::from_channels(vec![vec![1.0; 5], vec![1.0; 3]]);
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.channel(0).len(), 3);
    }

    #[test]
    fn interleave_layout() {
        let buf = ChannelBuffer::from_channels(vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]]);
        let mut out = [0.0; 4];
        buf.interleave_into(2, &mut out);
        assert_eq!(out, [1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    #[should_panic]
    fn zero_channels_rejected() {
        let _ = ChannelBuffer::new(0, 16);
    }
}

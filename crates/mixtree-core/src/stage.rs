//! The processing stage contract.
//!
//! A [`ProcessingStage`] is one DSP transform in a group's chain. Stages are
//! stateful across calls (filter memory, envelopes, gain ramps) and process a
//! whole multi-channel block in place.
//!
//! ## Design Decisions
//!
//! - **Block processing only**: the mixer always works in callback-sized
//!   chunks, so there is no per-sample entry point.
//! - **Object-safe**: pipelines hold `Box<dyn ProcessingStage + Send>`. New
//!   effect types are added by implementing the trait, never by extending an
//!   enum of stage kinds.
//! - **No allocations**: `process_frames` runs on the audio thread. Anything a
//!   stage needs must be allocated in its constructor or `set_sample_rate`.
//! - **Deterministic**: output depends only on internal state, inputs, sample
//!   rate and frame count. Stages must not read wall-clock time.

use crate::buffer::ChannelBuffer;

/// One DSP transform in a [`ProcessingPipeline`](crate::ProcessingPipeline).
///
/// # Example
///
/// ```rust
/// use mixtree_core::{ChannelBuffer, ProcessingStage};
///
/// struct Invert;
///
/// impl ProcessingStage for Invert {
///     fn name(&self) -> &str {
///         "invert"
///     }
///
///     fn set_sample_rate(&mut self, _sample_rate: u32) {}
///
///     fn process_frames(&mut self, data: &mut ChannelBuffer, frames: usize, _: f32) -> usize {
///         for ch in data.channels_mut() {
///             for s in &mut ch[..frames] {
///                 *s = -*s;
///             }
///         }
///         0
///     }
/// }
/// ```
pub trait ProcessingStage {
    /// Short identifier used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Bind or rebind the output sample rate.
    ///
    /// May be called more than once (device rate change). Never called while a
    /// mix pass is in flight.
    fn set_sample_rate(&mut self, sample_rate: u32);

    /// Process the first `frames` frames of `data` in place.
    ///
    /// `volume` is the logical stream volume of the group feeding this stage
    /// (the persisted last non-zero volume during ring-out), not a sample
    /// amplitude.
    ///
    /// Returns the rendering delay this stage introduces, in frames.
    fn process_frames(&mut self, data: &mut ChannelBuffer, frames: usize, volume: f32) -> usize;

    /// `true` if the stage would still produce non-silent output for silent
    /// input (reverb tails, delay lines holding audio).
    ///
    /// Default returns `false` (memoryless stage).
    fn is_ringing(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scale(f32);

    impl ProcessingStage for Scale {
        fn name(&self) -> &str {
            "scale"
        }
        fn set_sample_rate(&mut self, _: u32) {}
        fn process_frames(&mut self, data: &mut ChannelBuffer, frames: usize, _: f32) -> usize {
            for ch in data.channels_mut() {
                for s in &mut ch[..frames] {
                    *s *= self.0;
                }
            }
            0
        }
    }

    #[test]
    fn default_is_not_ringing() {
        assert!(!Scale(1.0).is_ringing());
    }

    #[test]
    fn processes_only_requested_frames() {
        let mut data = ChannelBuffer::from_channels(vec![vec![1.0; 4]]);
        let mut stage = Scale(2.0);
        assert_eq!(stage.process_frames(&mut data, 2, 1.0), 0);
        assert_eq!(data.channel(0), &[2.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn usable_as_trait_object() {
        let mut stages: Vec<Box<dyn ProcessingStage + Send>> = vec![Box::new(Scale(0.5))];
        let mut data = ChannelBuffer::from_channels(vec![vec![1.0; 2]]);
        for stage in &mut stages {
            stage.process_frames(&mut data, 2, 1.0);
        }
        assert_eq!(data.channel(0), &[0.5, 0.5]);
    }
}

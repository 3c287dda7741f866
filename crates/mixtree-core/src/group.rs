//! Mixing groups: one node of the mixing tree.
//!
//! A [`MixingGroup`] combines the live inputs routed to it with the already
//! mixed buffers of its child groups, runs its [`ProcessingPipeline`] over the
//! sum, and publishes one output buffer plus a scalar output volume per
//! callback.
//!
//! # Callback algorithm
//!
//! For a chunk of `N` frames (children are mixed first by
//! [`MixingTree::mix_and_filter`](crate::MixingTree::mix_and_filter)):
//!
//! 1. Grow the output and scratch buffers to `N` frames if needed.
//! 2. Silence short-circuit: no active inputs, every child reported volume 0,
//!    and the pipeline is not ringing. The output is zeroed once per chunk
//!    size (tracked by `frames_zeroed`) and the group returns 0 without
//!    running its pipeline.
//! 3. Otherwise zero the output, then volume-scale every active input into it
//!    (the first input overwrites, later ones add).
//! 4. Add every child whose last volume is non-zero, at unity gain.
//! 5. If anything was audible, remember the volume as `last_volume`. A tail
//!    keeps ringing out at that level after its inputs stop.
//! 6. Run the pipeline and keep the delay it reports.
//! 7. Return `last_volume`.

use std::collections::HashSet;

use crate::buffer::ChannelBuffer;
use crate::input::InputStream;
use crate::math::{fmac, frames_to_us};
use crate::pipeline::ProcessingPipeline;
use crate::tree::{GroupId, InputId, InputSlot};

/// A node of the mixing tree. Owns its pipeline and buffers.
///
/// Groups are created once when the audio graph is built and then handed to a
/// [`MixingTree`](crate::MixingTree), which owns them and wires up children by
/// [`GroupId`]. Groups are deliberately not `Clone`: parents refer to specific
/// instances.
pub struct MixingGroup {
    name: String,
    num_channels: usize,
    device_ids: HashSet<String>,
    /// Child groups in mixing order. Assigned by the tree.
    children: Vec<GroupId>,
    /// Inputs contributing to the current callback.
    active_inputs: Vec<InputId>,
    /// Last non-zero output volume, used while the pipeline rings out.
    last_volume: f32,
    /// Accumulated and processed output.
    mixed: ChannelBuffer,
    /// Scratch buffer for pulling input PCM.
    temp: ChannelBuffer,
    /// Leading frames of `mixed` already known to be zero.
    frames_zeroed: usize,
    /// Rendering delay reported by the pipeline, in frames.
    delay_frames: usize,
    /// Bound output rate; 0 until [`initialize`](Self::initialize).
    sample_rate: u32,
    pipeline: ProcessingPipeline,
}

impl MixingGroup {
    /// Creates a group.
    ///
    /// `device_ids` may be empty for groups that only mix children.
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` is zero or the pipeline was built for a
    /// different channel count.
    pub fn new<I, S>(
        name: impl Into<String>,
        num_channels: usize,
        device_ids: I,
        pipeline: ProcessingPipeline,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        assert!(num_channels > 0, "mixing group '{name}' needs at least one channel");
        assert_eq!(
            pipeline.num_channels(),
            num_channels,
            "pipeline channel count does not match group '{name}'"
        );
        Self {
            name,
            num_channels,
            device_ids: device_ids.into_iter().map(Into::into).collect(),
            children: Vec::new(),
            active_inputs: Vec::new(),
            last_volume: 0.0,
            mixed: ChannelBuffer::new(num_channels, 0),
            temp: ChannelBuffer::new(num_channels, 0),
            frames_zeroed: 0,
            delay_frames: 0,
            sample_rate: 0,
            pipeline,
        }
    }

    /// Binds the output sample rate and forwards it to the pipeline.
    ///
    /// Call before the first mix pass, and again if the device rate changes
    /// (never while a pass is in flight).
    pub fn initialize(&mut self, output_sample_rate: u32) {
        assert!(output_sample_rate > 0, "sample rate must be positive");
        self.sample_rate = output_sample_rate;
        self.pipeline.set_sample_rate(output_sample_rate);
        #[cfg(feature = "tracing")]
        tracing::debug!(group = %self.name, sample_rate = output_sample_rate, "group initialized");
    }

    /// `true` iff `input`'s device id is one this group accepts.
    pub fn can_accept_input(&self, input: &dyn InputStream) -> bool {
        self.device_ids.contains(input.device_id())
    }

    /// Adds an input to this callback's active list.
    pub fn add_active_input(&mut self, input: InputId) {
        self.active_inputs.push(input);
    }

    /// Drops this callback's active inputs. Capacity is kept.
    pub fn clear_active_inputs(&mut self) {
        self.active_inputs.clear();
    }

    /// Inputs currently active for this callback.
    pub fn active_inputs(&self) -> &[InputId] {
        &self.active_inputs
    }

    /// Rendering delay introduced by this group's pipeline, in microseconds.
    ///
    /// # Panics
    ///
    /// Panics if called before [`initialize`](Self::initialize).
    pub fn rendering_delay_us(&self) -> u64 {
        assert!(
            self.sample_rate > 0,
            "rendering delay of group '{}' queried before initialize()",
            self.name
        );
        frames_to_us(self.delay_frames, self.sample_rate)
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed channel count.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Accepted device ids.
    pub fn device_ids(&self) -> &HashSet<String> {
        &self.device_ids
    }

    /// Child groups in mixing order.
    pub fn children(&self) -> &[GroupId] {
        &self.children
    }

    /// Last non-zero volume this group reported.
    pub fn last_volume(&self) -> f32 {
        self.last_volume
    }

    /// Output of the most recent pass. Only the first `chunk_size` frames of
    /// that pass are meaningful.
    pub fn output(&self) -> &ChannelBuffer {
        &self.mixed
    }

    /// Leading frames of the output known to be zero from the silence path.
    pub fn frames_zeroed(&self) -> usize {
        self.frames_zeroed
    }

    /// Pipeline delay reported by the most recent pass, in frames.
    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    /// Bound sample rate, or 0 before initialization.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The group's pipeline.
    pub fn pipeline(&self) -> &ProcessingPipeline {
        &self.pipeline
    }

    /// Mutable access to the pipeline (e.g. to install stages built off-thread).
    pub fn pipeline_mut(&mut self) -> &mut ProcessingPipeline {
        &mut self.pipeline
    }

    pub(crate) fn set_children(&mut self, children: Vec<GroupId>) {
        self.children = children;
    }

    pub(crate) fn remove_active_input(&mut self, input: InputId) {
        self.active_inputs.retain(|&id| id != input);
    }

    #[cfg(test)]
    pub(crate) fn output_mut(&mut self) -> &mut ChannelBuffer {
        &mut self.mixed
    }

    /// Checks initialization and grows buffers for a pass of `chunk_size` frames.
    pub(crate) fn prepare(&mut self, chunk_size: usize) {
        assert!(
            self.sample_rate > 0,
            "mixing group '{}' mixed before initialize()",
            self.name
        );
        let grew = self.mixed.ensure_frames(chunk_size) | self.temp.ensure_frames(chunk_size);
        #[cfg(feature = "tracing")]
        if grew {
            tracing::debug!(group = %self.name, frames = chunk_size, "grew mix buffers");
        }
        #[cfg(not(feature = "tracing"))]
        let _ = grew;
    }

    /// Combines inputs and child outputs and runs the pipeline.
    ///
    /// `child_volume` is the largest volume any child returned this pass.
    /// `groups` is the tree's group storage; this group's own slot is empty
    /// while it mixes.
    pub(crate) fn mix(
        &mut self,
        chunk_size: usize,
        child_volume: f32,
        inputs: &mut [InputSlot],
        groups: &[Option<MixingGroup>],
    ) -> f32 {
        let mut volume = child_volume;

        // Children only return 0 if they have no data and are not ringing, or
        // if they have never been audible; either way there is nothing to mix.
        if self.active_inputs.is_empty() && volume == 0.0 && !self.pipeline.is_ringing() {
            if self.frames_zeroed < chunk_size {
                self.mixed.zero_frames(chunk_size);
                self.frames_zeroed = chunk_size;
            }
            return 0.0;
        }

        self.frames_zeroed = 0;
        self.mixed.zero_frames(chunk_size);

        let mut first = true;
        for &id in &self.active_inputs {
            // Removed inputs are purged from active lists by the tree.
            let Some(input) = inputs.get_mut(id.index()).and_then(|slot| slot.get_mut(id)) else {
                continue;
            };
            input.get_resampled_data(&mut self.temp, chunk_size);
            for c in 0..self.num_channels {
                input.volume_scale_accumulate(
                    !first,
                    self.temp.channel(c),
                    chunk_size,
                    self.mixed.channel_mut(c),
                );
            }
            first = false;
            volume = volume.max(input.effective_volume());
        }

        for &id in &self.children {
            let Some(Some(child)) = groups.get(id.index()) else {
                continue;
            };
            if child.last_volume > 0.0 {
                for c in 0..self.num_channels {
                    fmac(child.mixed.channel(c), 1.0, chunk_size, self.mixed.channel_mut(c));
                }
            }
        }

        let is_silence = volume == 0.0;

        // Stopped streams ring out at their last audible volume. If the real
        // volume is 0 this changes nothing: the data is already zeros.
        if !is_silence {
            self.last_volume = volume;
        }

        self.delay_frames = self.pipeline.process_frames(
            &mut self.mixed,
            chunk_size,
            self.last_volume,
            is_silence,
        );
        self.last_volume
    }
}

impl core::fmt::Debug for MixingGroup {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MixingGroup")
            .field("name", &self.name)
            .field("num_channels", &self.num_channels)
            .field("device_ids", &self.device_ids)
            .field("children", &self.children)
            .field("last_volume", &self.last_volume)
            .field("sample_rate", &self.sample_rate)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

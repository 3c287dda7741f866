//! Ordered stage chains.
//!
//! A [`ProcessingPipeline`] owns the stages of one mixing group and applies
//! them in order, in place, to the group's combined buffer. It forwards sample
//! rate changes, sums the rendering delay each stage reports, and aggregates
//! the ring-out state the group uses for its silence short-circuit.
//!
//! An empty pipeline is a valid pass-through; it is what a group gets when
//! the configuration names no stages for it.

use crate::buffer::ChannelBuffer;
use crate::stage::ProcessingStage;

/// An ordered chain of [`ProcessingStage`]s applied to one group's buffer.
pub struct ProcessingPipeline {
    name: String,
    num_channels: usize,
    sample_rate: u32,
    stages: Vec<Box<dyn ProcessingStage + Send>>,
    /// Delay reported by the last full pass, returned again on skipped passes.
    delay_frames: usize,
}

impl ProcessingPipeline {
    /// Creates an empty (pass-through) pipeline.
    pub fn new(name: impl Into<String>, num_channels: usize) -> Self {
        Self {
            name: name.into(),
            num_channels,
            sample_rate: 0,
            stages: Vec::new(),
            delay_frames: 0,
        }
    }

    /// Creates a pipeline from stages in application order.
    pub fn with_stages(
        name: impl Into<String>,
        num_channels: usize,
        stages: Vec<Box<dyn ProcessingStage + Send>>,
    ) -> Self {
        let mut pipeline = Self::new(name, num_channels);
        pipeline.stages = stages;
        pipeline
    }

    /// Appends a stage to the end of the chain.
    ///
    /// If a sample rate is already bound it is forwarded to the new stage.
    pub fn push(&mut self, mut stage: Box<dyn ProcessingStage + Send>) {
        if self.sample_rate > 0 {
            stage.set_sample_rate(self.sample_rate);
        }
        self.stages.push(stage);
    }

    /// Pipeline name (usually the owning group's name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel count the stages are fed.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Bound sample rate, or 0 before the first [`set_sample_rate`](Self::set_sample_rate).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Forwards `sample_rate` to every stage, in chain order.
    ///
    /// Safe to call repeatedly.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        for stage in &mut self.stages {
            stage.set_sample_rate(sample_rate);
        }
    }

    /// Runs every stage over the first `frames` frames of `data`.
    ///
    /// When `is_silence` is set and no stage is ringing, the buffer is known to
    /// be silence and the stages are skipped; the previous delay is returned.
    /// Otherwise the returned delay is the sum of the delays of all stages.
    pub fn process_frames(
        &mut self,
        data: &mut ChannelBuffer,
        frames: usize,
        volume: f32,
        is_silence: bool,
    ) -> usize {
        debug_assert_eq!(
            data.num_channels(),
            self.num_channels,
            "pipeline '{}' fed the wrong channel count",
            self.name
        );
        if is_silence && !self.is_ringing() {
            return self.delay_frames;
        }

        let mut total = 0;
        for stage in &mut self.stages {
            total += stage.process_frames(data, frames, volume);
        }
        self.delay_frames = total;
        total
    }

    /// `true` if any stage would still produce output from silent input.
    pub fn is_ringing(&self) -> bool {
        self.stages.iter().any(|s| s.is_ringing())
    }

    /// Delay reported by the most recent pass, in frames.
    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// `true` for a pass-through pipeline.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in application order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl core::fmt::Debug for ProcessingPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessingPipeline")
            .field("name", &self.name)
            .field("num_channels", &self.num_channels)
            .field("sample_rate", &self.sample_rate)
            .field("stages", &self.stage_names())
            .finish()
    }
}

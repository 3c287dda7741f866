//! Integration tests for mixtree-core.
//!
//! Drives full trees and the fixed mixer topology through the public API:
//! silence handling across callbacks, ring-out through a parent, additive
//! combination of inputs and children, and rendering delay accounting.

use mixtree_core::{
    ChannelBuffer, InputStream, Mixer, MixerLayout, MixingGroup, MixingTree, PcmInput,
    ProcessingPipeline, ProcessingStage, StreamGroupSpec, VecSink,
};

const SAMPLE_RATE: u32 = 48000;

/// Fixed-latency line: output is input delayed by `len` frames.
struct Latency {
    line: Vec<Vec<f32>>,
    pos: usize,
}

impl Latency {
    fn new(channels: usize, len: usize) -> Self {
        Self {
            line: vec![vec![0.0; len]; channels],
            pos: 0,
        }
    }
}

impl ProcessingStage for Latency {
    fn name(&self) -> &str {
        "latency"
    }

    fn set_sample_rate(&mut self, _: u32) {}

    fn process_frames(&mut self, data: &mut ChannelBuffer, frames: usize, _: f32) -> usize {
        let len = self.line[0].len();
        for (c, line) in self.line.iter_mut().enumerate() {
            let mut pos = self.pos;
            for s in &mut data.channel_mut(c)[..frames] {
                let out = line[pos];
                line[pos] = *s;
                *s = out;
                pos = (pos + 1) % len;
            }
        }
        self.pos = (self.pos + frames) % len;
        len
    }

    fn is_ringing(&self) -> bool {
        self.line.iter().flatten().any(|&s| s != 0.0)
    }
}

fn mono_group(name: &str, ids: &[&str]) -> MixingGroup {
    MixingGroup::new(name, 1, ids.iter().copied(), ProcessingPipeline::new(name, 1))
}

fn burst(device: &str, frames: usize, volume: f32) -> Box<dyn InputStream + Send> {
    let samples = ChannelBuffer::from_channels(vec![vec![1.0; frames]]);
    Box::new(PcmInput::new(device, samples).with_volume(volume))
}

// ============================================================================
// Tree scenarios
// ============================================================================

#[test]
fn first_mix_then_silence() {
    let mut tree = MixingTree::new();
    let g = tree.add_group(mono_group("g", &["tts"]), &[]).unwrap();
    let input = tree.add_input(burst("tts", 1024, 0.5));
    tree.initialize(SAMPLE_RATE);

    tree.add_active_input(g, input).unwrap();
    assert!(tree.mix_and_filter(g, 128) > 0.0);
    assert!(!tree[g].output().is_silent(128));
    tree.clear_active_inputs();

    assert_eq!(tree.mix_and_filter(g, 128), 0.0);
    assert!(tree[g].output().is_silent(128));
    assert_eq!(tree[g].frames_zeroed(), 128);

    assert_eq!(tree.mix_and_filter(g, 128), 0.0);
    assert_eq!(tree[g].frames_zeroed(), 128);
}

#[test]
fn ring_out_propagates_through_parent() {
    let mut tree = MixingTree::new();
    let pipeline = ProcessingPipeline::with_stages("echo", 1, vec![Box::new(Latency::new(1, 32))]);
    let child = tree
        .add_group(MixingGroup::new("echo", 1, ["tts"], pipeline), &[])
        .unwrap();
    let parent = tree.add_group(mono_group("mix", &[]), &[child]).unwrap();
    let input = tree.add_input(burst("tts", 16, 0.8));
    tree.initialize(SAMPLE_RATE);

    tree.add_active_input(child, input).unwrap();
    assert_eq!(tree.mix_and_filter(parent, 16), 0.8);
    // Everything is still inside the delay line.
    assert!(tree[parent].output().is_silent(16));
    tree.clear_active_inputs();

    // The input is gone but the child rings: the burst comes out 32 frames late.
    assert_eq!(tree.mix_and_filter(parent, 16), 0.8);
    assert!(tree[parent].output().is_silent(16));
    assert_eq!(tree.mix_and_filter(parent, 16), 0.8);
    // The burst keeps its 0.8 input volume through the delay line.
    assert_eq!(&tree[parent].output().channel(0)[..16], &[0.8; 16]);
}

#[test]
fn inputs_and_ringing_children_add() {
    let mut tree = MixingTree::new();
    let pipeline = ProcessingPipeline::with_stages("echo", 1, vec![Box::new(Latency::new(1, 8))]);
    let child = tree
        .add_group(MixingGroup::new("echo", 1, ["a"], pipeline), &[])
        .unwrap();
    let parent = tree.add_group(mono_group("mix", &["b"]), &[child]).unwrap();
    let a = tree.add_input(burst("a", 8, 1.0));
    let b = tree.add_input(Box::new(
        PcmInput::new("b", ChannelBuffer::from_channels(vec![vec![0.25; 64]])).with_volume(1.0),
    ));
    tree.initialize(SAMPLE_RATE);

    tree.add_active_input(child, a).unwrap();
    tree.mix_and_filter(parent, 8);
    tree.clear_active_inputs();

    tree.add_active_input(parent, b).unwrap();
    tree.mix_and_filter(parent, 8);
    for &s in &tree[parent].output().channel(0)[..8] {
        assert!((s - 1.25).abs() < 1e-6);
    }
}

#[test]
fn rendering_delay_at_two_rates() {
    for (rate, expected_us) in [(48000, 2000), (32000, 3000)] {
        let mut tree = MixingTree::new();
        let pipeline =
            ProcessingPipeline::with_stages("g", 1, vec![Box::new(Latency::new(1, 96))]);
        let g = tree
            .add_group(MixingGroup::new("g", 1, ["x"], pipeline), &[])
            .unwrap();
        let x = tree.add_input(burst("x", 64, 1.0));
        tree.initialize(rate);
        tree.add_active_input(g, x).unwrap();
        tree.mix_and_filter(g, 64);
        assert_eq!(tree[g].delay_frames(), 96);
        assert_eq!(tree.rendering_delay_us(g), Some(expected_us));
    }
}

// ============================================================================
// Mixer topology
// ============================================================================

fn layout(channels: usize) -> MixerLayout {
    let mut layout = MixerLayout::passthrough(channels);
    layout.streams.push(StreamGroupSpec {
        name: "tts".to_string(),
        device_ids: vec!["tts".to_string()],
        pipeline: ProcessingPipeline::with_stages(
            "tts",
            channels,
            vec![Box::new(Latency::new(channels, 48))],
        ),
    });
    layout.mix = ProcessingPipeline::with_stages(
        "mix",
        channels,
        vec![Box::new(Latency::new(channels, 24))],
    );
    layout
}

#[test]
fn mixer_delay_sums_group_mix_and_linearize() {
    let mut mixer = Mixer::new(layout(1), 1, SAMPLE_RATE).unwrap();
    let tts = mixer.add_input(burst("tts", 256, 1.0));
    let music = mixer.add_input(burst("music", 256, 1.0));
    mixer.set_input_active(tts, true).unwrap();
    mixer.set_input_active(music, true).unwrap();

    let mut sink = VecSink::new();
    mixer.render_to(&mut sink, 64).unwrap();

    // 48 + 24 frames at 48 kHz, 24 frames for the default route.
    assert_eq!(mixer.rendering_delay_us(tts), Some(1500));
    assert_eq!(mixer.rendering_delay_us(music), Some(500));
}

#[test]
fn mixer_renders_until_tail_ends() {
    let mut mixer = Mixer::new(layout(2), 2, SAMPLE_RATE).unwrap();
    let id = mixer.add_input(Box::new(PcmInput::from_interleaved(
        "tts",
        &[0.5; 64 * 2],
        2,
    )));
    mixer.set_input_active(id, true).unwrap();

    let mut sink = VecSink::new();
    for _ in 0..4 {
        mixer.render_to(&mut sink, 32).unwrap();
    }
    let samples = sink.into_samples();
    assert_eq!(samples.len(), 4 * 32 * 2);

    // 64 frames of 0.5 delayed by 48 + 24 frames.
    let frames: Vec<f32> = samples.iter().step_by(2).copied().collect();
    assert!(frames[..72].iter().all(|&s| s == 0.0));
    assert!(frames[72..128].iter().all(|&s| s == 0.5));
}

#[test]
fn mixer_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Mixer>();
}

//! Output-side mixer topology.
//!
//! A [`Mixer`] owns a [`MixingTree`] with a fixed shape:
//!
//! ```text
//! linearize            (root; speaker-response correction)
//!   └── mix            (applied to the sum of all streams)
//!         ├── <stream group>...
//!         └── default  (pass-through, only if no stream group takes "default")
//! ```
//!
//! Inputs are routed once, when they are added, to the first stream group that
//! accepts their device id. Inputs nobody accepts fall back to the group that
//! accepts [`DEFAULT_DEVICE_ID`].

use crate::group::MixingGroup;
use crate::input::InputStream;
use crate::math::frames_to_us;
use crate::pipeline::ProcessingPipeline;
use crate::sink::{OutputSink, SinkError};
use crate::tree::{GroupId, InputId, MixingTree, TreeError};

/// Device id of the fallback route.
pub const DEFAULT_DEVICE_ID: &str = "default";

/// Name of the group that mixes every stream group.
pub const MIX_GROUP: &str = "mix";

/// Name of the root group.
pub const LINEARIZE_GROUP: &str = "linearize";

/// One stream group of a [`MixerLayout`].
#[derive(Debug)]
pub struct StreamGroupSpec {
    /// Group name.
    pub name: String,
    /// Device ids routed to this group.
    pub device_ids: Vec<String>,
    /// Stage chain applied to the group.
    pub pipeline: ProcessingPipeline,
}

/// Everything needed to build a [`Mixer`]: stream groups and the two shared
/// pipelines.
#[derive(Debug)]
pub struct MixerLayout {
    /// Stream groups, in routing priority order.
    pub streams: Vec<StreamGroupSpec>,
    /// Pipeline of the `mix` group.
    pub mix: ProcessingPipeline,
    /// Pipeline of the root `linearize` group.
    pub linearize: ProcessingPipeline,
}

impl MixerLayout {
    /// Layout with no stream groups and empty pipelines. Every input lands in
    /// the `default` group and passes through untouched.
    pub fn passthrough(num_channels: usize) -> Self {
        Self {
            streams: Vec::new(),
            mix: ProcessingPipeline::new(MIX_GROUP, num_channels),
            linearize: ProcessingPipeline::new(LINEARIZE_GROUP, num_channels),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Route {
    input: InputId,
    group: GroupId,
    active: bool,
}

/// Fixed-topology mixer over a [`MixingTree`].
pub struct Mixer {
    tree: MixingTree,
    root: GroupId,
    mix: GroupId,
    default_group: GroupId,
    stream_groups: Vec<GroupId>,
    num_channels: usize,
    sample_rate: u32,
    /// Indexed by `InputId::index()`; `None` once an input is removed. A
    /// reused slot is overwritten with the new occupant's route.
    routes: Vec<Option<Route>>,
    scratch: Vec<f32>,
}

fn build_group(
    name: &str,
    device_ids: Vec<String>,
    pipeline: ProcessingPipeline,
    num_channels: usize,
) -> Result<MixingGroup, TreeError> {
    if pipeline.num_channels() != num_channels {
        return Err(TreeError::ChannelMismatch {
            group: name.to_string(),
            expected: num_channels,
            found: pipeline.num_channels(),
        });
    }
    Ok(MixingGroup::new(name, num_channels, device_ids, pipeline))
}

impl Mixer {
    /// Builds the tree for `layout` and initializes it at `sample_rate`.
    ///
    /// # Errors
    ///
    /// [`TreeError::ChannelMismatch`] if a pipeline was built for a different
    /// channel count.
    ///
    /// # Panics
    ///
    /// Panics if `num_channels` or `sample_rate` is zero.
    pub fn new(
        layout: MixerLayout,
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, TreeError> {
        let mut tree = MixingTree::new();
        let mut stream_groups = Vec::with_capacity(layout.streams.len() + 1);
        let mut default_group = None;

        for spec in layout.streams {
            let takes_default = spec.device_ids.iter().any(|id| id == DEFAULT_DEVICE_ID);
            let group = build_group(&spec.name, spec.device_ids, spec.pipeline, num_channels)?;
            let id = tree.add_group(group, &[])?;
            if takes_default && default_group.is_none() {
                default_group = Some(id);
            }
            stream_groups.push(id);
        }

        let default_group = match default_group {
            Some(id) => id,
            None => {
                let group = build_group(
                    DEFAULT_DEVICE_ID,
                    vec![DEFAULT_DEVICE_ID.to_string()],
                    ProcessingPipeline::new(DEFAULT_DEVICE_ID, num_channels),
                    num_channels,
                )?;
                let id = tree.add_group(group, &[])?;
                stream_groups.push(id);
                id
            }
        };

        let mix = build_group(MIX_GROUP, Vec::new(), layout.mix, num_channels)?;
        let mix = tree.add_group(mix, &stream_groups)?;
        let root = build_group(LINEARIZE_GROUP, Vec::new(), layout.linearize, num_channels)?;
        let root = tree.add_group(root, &[mix])?;

        tree.initialize(sample_rate);

        Ok(Self {
            tree,
            root,
            mix,
            default_group,
            stream_groups,
            num_channels,
            sample_rate,
            routes: Vec::new(),
            scratch: Vec::new(),
        })
    }

    /// Registers an input and routes it. The input starts inactive.
    pub fn add_input(&mut self, input: Box<dyn InputStream + Send>) -> InputId {
        let id = self.tree.add_input(input);
        let group = match self.tree.route_input(id) {
            Some(group) => group,
            None => {
                #[cfg(feature = "tracing")]
                if let Some(input) = self.tree.input(id) {
                    tracing::warn!(
                        device_id = input.device_id(),
                        "no group accepts device id, routing to default"
                    );
                }
                self.default_group
            }
        };
        #[cfg(feature = "tracing")]
        tracing::debug!(%id, group = %self.tree[group].name(), "input routed");

        if self.routes.len() <= id.index() {
            self.routes.resize(id.index() + 1, None);
        }
        self.routes[id.index()] = Some(Route {
            input: id,
            group,
            active: false,
        });
        id
    }

    /// Unregisters an input.
    pub fn remove_input(&mut self, id: InputId) -> Option<Box<dyn InputStream + Send>> {
        let input = self.tree.remove_input(id)?;
        if let Some(route) = self.routes.get_mut(id.index()) {
            *route = None;
        }
        Some(input)
    }

    /// Marks whether `id` contributes to subsequent callbacks.
    ///
    /// # Errors
    ///
    /// [`TreeError::InputNotFound`] if `id` is not registered.
    pub fn set_input_active(&mut self, id: InputId, active: bool) -> Result<(), TreeError> {
        let route = self
            .routes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .filter(|route| route.input == id)
            .ok_or(TreeError::InputNotFound(id))?;
        route.active = active;
        Ok(())
    }

    /// Group an input was routed to.
    pub fn route(&self, id: InputId) -> Option<GroupId> {
        self.routes
            .get(id.index())
            .copied()
            .flatten()
            .filter(|r| r.input == id)
            .map(|r| r.group)
    }

    /// Runs one callback of `frames` frames into `dest` (interleaved, clamped
    /// to `[-1, 1]`) and returns the root volume.
    ///
    /// # Panics
    ///
    /// Panics if `dest` holds fewer than `frames * num_channels` samples.
    pub fn write_output(&mut self, frames: usize, dest: &mut [f32]) -> f32 {
        let len = frames * self.num_channels;
        assert!(
            dest.len() >= len,
            "output slice holds {} samples, need {len}",
            dest.len()
        );

        for route in self.routes.iter().flatten().filter(|r| r.active) {
            if let Some(group) = self.tree.group_mut(route.group) {
                group.add_active_input(route.input);
            }
        }

        let volume = self.tree.mix_and_filter(self.root, frames);
        self.tree.clear_active_inputs();

        self.tree[self.root].output().interleave_into(frames, dest);
        for s in &mut dest[..len] {
            *s = s.clamp(-1.0, 1.0);
        }
        volume
    }

    /// Renders `frames` frames and pushes them to `sink`. Returns the root volume.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports.
    pub fn render_to<S: OutputSink + ?Sized>(
        &mut self,
        sink: &mut S,
        frames: usize,
    ) -> Result<f32, SinkError> {
        let mut scratch = core::mem::take(&mut self.scratch);
        scratch.resize(frames * self.num_channels, 0.0);
        let volume = self.write_output(frames, &mut scratch);
        let result = sink.write_frames(&scratch, self.num_channels);
        self.scratch = scratch;
        result.map(|()| volume)
    }

    /// Delay between an input's samples entering the mixer and reaching the
    /// sink, in microseconds: its group plus `mix` plus `linearize`.
    pub fn rendering_delay_us(&self, id: InputId) -> Option<u64> {
        let group = self.route(id)?;
        let delay = self.tree[group].rendering_delay_us()
            + self.tree[self.mix].rendering_delay_us()
            + self.tree[self.root].rendering_delay_us();
        Some(delay)
    }

    /// [`rendering_delay_us`](Self::rendering_delay_us) plus the latency
    /// `sink` reports, i.e. the delay until the input is actually heard.
    pub fn output_delay_us<S: OutputSink + ?Sized>(&self, id: InputId, sink: &S) -> Option<u64> {
        let delay = self.rendering_delay_us(id)?;
        Some(delay + frames_to_us(sink.delay_frames(), self.sample_rate))
    }

    /// Rebinds the output rate on every group.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.tree.initialize(sample_rate);
    }

    /// Mutable access to an input, e.g. to change its volume.
    pub fn input_mut(&mut self, id: InputId) -> Option<&mut (dyn InputStream + Send + 'static)> {
        self.tree.input_mut(id)
    }

    /// The underlying tree.
    pub fn tree(&self) -> &MixingTree {
        &self.tree
    }

    /// The root (`linearize`) group.
    pub fn root(&self) -> GroupId {
        self.root
    }

    /// The `mix` group.
    pub fn mix_group(&self) -> GroupId {
        self.mix
    }

    /// The fallback group.
    pub fn default_group(&self) -> GroupId {
        self.default_group
    }

    /// Stream groups in routing order, including the fallback group.
    pub fn stream_groups(&self) -> &[GroupId] {
        &self.stream_groups
    }

    /// Output channel count.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Bound output rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl core::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mixer")
            .field("tree", &self.tree)
            .field("num_channels", &self.num_channels)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

//! The mixing tree: an owning registry of groups and inputs.
//!
//! Parents refer to their children by [`GroupId`] handle rather than by
//! pointer. The tree owns every [`MixingGroup`] and every registered
//! [`InputStream`]; dropping the tree tears the whole graph down at once, with
//! no lifetime questions between parents and children.
//!
//! # Topology rules
//!
//! A group's children must already be in the tree when the group is added,
//! and a group can have at most one parent. Together these make the graph a
//! forest: no cycles, and every group is mixed exactly once per callback.
//!
//! # Evaluation
//!
//! [`mix_and_filter`](MixingTree::mix_and_filter) evaluates a root in strict
//! post-order. While a group combines its children it is moved out of its
//! slot, which lets it read the children's buffers from the shared storage
//! while mutating itself, without locks or allocation.

use crate::group::MixingGroup;
use crate::input::InputStream;

/// Storage slot for a registered input.
///
/// The generation is bumped each time the slot is vacated, so ids handed out
/// for an earlier occupant stop resolving once the slot is reused.
#[derive(Default)]
pub(crate) struct InputSlot {
    generation: u32,
    stream: Option<Box<dyn InputStream + Send>>,
}

impl InputSlot {
    pub(crate) fn get(&self, id: InputId) -> Option<&(dyn InputStream + Send + 'static)> {
        if self.generation != id.generation {
            return None;
        }
        self.stream.as_deref()
    }

    pub(crate) fn get_mut(
        &mut self,
        id: InputId,
    ) -> Option<&mut (dyn InputStream + Send + 'static)> {
        if self.generation != id.generation {
            return None;
        }
        self.stream.as_deref_mut()
    }
}

/// Handle to a group in a [`MixingTree`].
///
/// Ids are assigned sequentially and never reused within a tree instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u32);

impl GroupId {
    /// Returns the raw slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to an input stream registered with a [`MixingTree`].
///
/// Slots of removed inputs are reused; the generation tells a stale id apart
/// from the id of the slot's current occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputId {
    index: u32,
    generation: u32,
}

impl InputId {
    /// Returns the raw slot index.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self {
            index: raw,
            generation: 0,
        }
    }
}

impl core::fmt::Display for GroupId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

impl core::fmt::Display for InputId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "InputId({}v{})", self.index, self.generation)
    }
}

/// Errors from building or addressing a [`MixingTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The group id does not name a group in this tree.
    GroupNotFound(GroupId),
    /// The input id does not name a registered input.
    InputNotFound(InputId),
    /// The group already has a parent (or was listed twice).
    AlreadyParented(GroupId),
    /// A group or pipeline does not have the expected channel count.
    ChannelMismatch {
        /// Name of the offending group.
        group: String,
        /// Channel count required.
        expected: usize,
        /// Channel count found.
        found: usize,
    },
}

impl core::fmt::Display for TreeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GroupNotFound(id) => write!(f, "group {id} not found"),
            Self::InputNotFound(id) => write!(f, "input {id} not found"),
            Self::AlreadyParented(id) => write!(f, "group {id} already has a parent"),
            Self::ChannelMismatch {
                group,
                expected,
                found,
            } => write!(
                f,
                "group '{group}' has {found} channels, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for TreeError {}

/// Owning registry of mixing groups and inputs.
#[derive(Default)]
pub struct MixingTree {
    groups: Vec<Option<MixingGroup>>,
    parents: Vec<Option<GroupId>>,
    inputs: Vec<InputSlot>,
    free_inputs: Vec<u32>,
}

impl MixingTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `group` with the given children, in mixing order.
    ///
    /// # Errors
    ///
    /// - [`TreeError::GroupNotFound`] if a child is not in the tree.
    /// - [`TreeError::AlreadyParented`] if a child already has a parent or is
    ///   listed twice.
    /// - [`TreeError::ChannelMismatch`] if a child's channel count differs.
    pub fn add_group(
        &mut self,
        mut group: MixingGroup,
        children: &[GroupId],
    ) -> Result<GroupId, TreeError> {
        for (i, &child) in children.iter().enumerate() {
            let existing = self
                .groups
                .get(child.index())
                .and_then(Option::as_ref)
                .ok_or(TreeError::GroupNotFound(child))?;
            if self.parents[child.index()].is_some() || children[..i].contains(&child) {
                return Err(TreeError::AlreadyParented(child));
            }
            if existing.num_channels() != group.num_channels() {
                return Err(TreeError::ChannelMismatch {
                    group: existing.name().to_string(),
                    expected: group.num_channels(),
                    found: existing.num_channels(),
                });
            }
        }

        let id = GroupId(self.groups.len() as u32);
        for &child in children {
            self.parents[child.index()] = Some(id);
        }
        group.set_children(children.to_vec());
        #[cfg(feature = "tracing")]
        tracing::debug!(group = %group.name(), %id, children = children.len(), "tree_add");
        self.groups.push(Some(group));
        self.parents.push(None);
        Ok(id)
    }

    /// Registers an input stream. It contributes nothing until it is made
    /// active on a group.
    ///
    /// Reuses the slot of a removed input when one is free.
    pub fn add_input(&mut self, input: Box<dyn InputStream + Send>) -> InputId {
        let index = match self.free_inputs.pop() {
            Some(index) => index,
            None => {
                self.inputs.push(InputSlot::default());
                (self.inputs.len() - 1) as u32
            }
        };
        let slot = &mut self.inputs[index as usize];
        slot.stream = Some(input);
        InputId {
            index,
            generation: slot.generation,
        }
    }

    /// Unregisters an input and removes it from every active list.
    ///
    /// `id` is invalid afterwards, even once its slot is reused.
    pub fn remove_input(&mut self, id: InputId) -> Option<Box<dyn InputStream + Send>> {
        let slot = self.inputs.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let input = slot.stream.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_inputs.push(id.index);
        for group in self.groups.iter_mut().flatten() {
            group.remove_active_input(id);
        }
        Some(input)
    }

    /// Binds `sample_rate` on every group.
    pub fn initialize(&mut self, sample_rate: u32) {
        for group in self.groups.iter_mut().flatten() {
            group.initialize(sample_rate);
        }
    }

    /// First group, in insertion order, that accepts `input`'s device id.
    pub fn route_input(&self, input: InputId) -> Option<GroupId> {
        let stream = self.input(input)?;
        self.iter()
            .find(|(_, group)| group.can_accept_input(stream))
            .map(|(id, _)| id)
    }

    /// Marks `input` as contributing to `group` for the current callback.
    pub fn add_active_input(&mut self, group: GroupId, input: InputId) -> Result<(), TreeError> {
        if self.input(input).is_none() {
            return Err(TreeError::InputNotFound(input));
        }
        self.group_mut(group)
            .ok_or(TreeError::GroupNotFound(group))?
            .add_active_input(input);
        Ok(())
    }

    /// Clears the active inputs of every group.
    pub fn clear_active_inputs(&mut self) {
        for group in self.groups.iter_mut().flatten() {
            group.clear_active_inputs();
        }
    }

    /// Mixes the subtree rooted at `root` for `chunk_size` frames and returns
    /// the root's output volume. The result is in `self[root].output()`.
    ///
    /// # Panics
    ///
    /// Panics if `root` is not in this tree or a group in the subtree has not
    /// been initialized.
    pub fn mix_and_filter(&mut self, root: GroupId, chunk_size: usize) -> f32 {
        let idx = root.index();
        let Some(mut group) = self.groups.get_mut(idx).and_then(Option::take) else {
            panic!("mix_and_filter: {root} is not in this tree");
        };

        group.prepare(chunk_size);

        let mut child_volume = 0.0_f32;
        for &child in group.children() {
            child_volume = child_volume.max(self.mix_and_filter(child, chunk_size));
        }

        let volume = group.mix(chunk_size, child_volume, &mut self.inputs, &self.groups);
        self.groups[idx] = Some(group);
        volume
    }

    /// Rendering delay of one group's pipeline, in microseconds.
    pub fn rendering_delay_us(&self, id: GroupId) -> Option<u64> {
        self.group(id).map(MixingGroup::rendering_delay_us)
    }

    /// Looks up a group.
    pub fn group(&self, id: GroupId) -> Option<&MixingGroup> {
        self.groups.get(id.index()).and_then(Option::as_ref)
    }

    /// Looks up a group mutably.
    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut MixingGroup> {
        self.groups.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Looks up a registered input.
    pub fn input(&self, id: InputId) -> Option<&(dyn InputStream + Send)> {
        self.inputs.get(id.index()).and_then(|slot| slot.get(id))
    }

    /// Looks up a registered input mutably.
    pub fn input_mut(&mut self, id: InputId) -> Option<&mut (dyn InputStream + Send + 'static)> {
        self.inputs.get_mut(id.index()).and_then(|slot| slot.get_mut(id))
    }

    /// Parent of `id`, if it has one.
    pub fn parent(&self, id: GroupId) -> Option<GroupId> {
        self.parents.get(id.index()).copied().flatten()
    }

    /// Groups without a parent, in insertion order.
    pub fn roots(&self) -> Vec<GroupId> {
        self.iter()
            .map(|(id, _)| id)
            .filter(|&id| self.parent(id).is_none())
            .collect()
    }

    /// Iterates groups in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &MixingGroup)> {
        self.groups
            .iter()
            .enumerate()
            .filter_map(|(i, g)| g.as_ref().map(|g| (GroupId(i as u32), g)))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// `true` if the tree has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl core::ops::Index<GroupId> for MixingTree {
    type Output = MixingGroup;

    /// # Panics
    ///
    /// Panics if `id` is not in this tree.
    fn index(&self, id: GroupId) -> &MixingGroup {
        self.group(id)
            .unwrap_or_else(|| panic!("{id} is not in this tree"))
    }
}

impl core::fmt::Debug for MixingTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MixingTree")
            .field("groups", &self.groups)
            .field("parents", &self.parents)
            .field("inputs", &(self.inputs.len() - self.free_inputs.len()))
            .finish()
    }
}

//! The transition table: deduplicated states and snapshots, the graph of op lists between states,
//! and the runtime that walks it.

use tracing::{debug, trace, warn};

use crate::apply::Applicator;
use crate::config::TableConfig;
use crate::device::{DeviceCaps, StateDevice};
use crate::dict::ChecksumDict;
use crate::error::{Result, TransitionTableError};
use crate::graph::{self, TransitionGraph};
use crate::live::{LiveState, Overrides, PendingRestore};
use crate::ops::{OpRange, StateOp, MAX_STAGES};
use crate::state::{ColorWriteMask, CompareFunc, PipelineState, ShaderBinding, SnapshotId, StateId, StateShadow};
use crate::stats::{TransitionStats, TransitionStatsSnapshot};

/// Op count past which every new state logs a capacity warning.
const OP_CAPACITY_WARN: usize = OpRange::OP_LIMIT / 4 * 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Snapshot {
    state: StateId,
    binding: ShaderBinding,
}

/// Result of [`TransitionTable::take_validated_snapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatedSnapshot {
    pub snapshot: SnapshotId,
    /// `false` if the device rejected a newly created state. The snapshot stays registered.
    pub accepted: bool,
}

/// Caches every pipeline configuration a renderer has asked for and the minimal device calls
/// needed to move between any two of them.
///
/// State 0 and snapshot 0 are always the startup configuration with no shaders bound.
#[derive(Debug)]
pub struct TransitionTable {
    caps: DeviceCaps,
    config: TableConfig,

    states: Vec<PipelineState>,
    state_dict: ChecksumDict<StateId>,
    snapshots: Vec<Snapshot>,
    snapshot_dict: ChecksumDict<SnapshotId>,
    graph: TransitionGraph,
    default_snapshot: SnapshotId,

    live: LiveState,
    current_state: Option<StateId>,
    current_snapshot: Option<SnapshotId>,

    stats: TransitionStats,
}

impl TransitionTable {
    pub fn new(caps: DeviceCaps, config: TableConfig) -> Result<Self> {
        if caps.texture_stage_count > MAX_STAGES {
            return Err(TransitionTableError::TooManyStages {
                count: caps.texture_stage_count,
            });
        }
        if caps.sampler_count > MAX_STAGES {
            return Err(TransitionTableError::TooManySamplers {
                count: caps.sampler_count,
            });
        }

        let mut table = Self {
            caps,
            config,
            states: Vec::new(),
            state_dict: ChecksumDict::new(),
            snapshots: Vec::new(),
            snapshot_dict: ChecksumDict::new(),
            graph: TransitionGraph::default(),
            default_snapshot: SnapshotId::new(0),
            live: LiveState::startup(caps.texture_stage_count),
            current_state: None,
            current_snapshot: None,
            stats: TransitionStats::default(),
        };
        table.register_default_state()?;

        debug!(
            stages = caps.texture_stage_count,
            samplers = caps.sampler_count,
            default_ops = table.default_edge().count(),
            "transition table created"
        );
        Ok(table)
    }

    fn register_default_state(&mut self) -> Result<()> {
        let state = PipelineState::new_default(self.caps.texture_stage_count, self.caps.sampler_count);
        let id = self.find_or_create_state(state)?;
        self.graph
            .build_edge(&self.states, &self.caps, id, None, &mut self.stats)?;
        self.default_snapshot = self.find_or_create_snapshot(id, ShaderBinding::default());
        Ok(())
    }

    /// Drops every state, snapshot and op and starts over from the default state.
    ///
    /// The device is not touched; the next [`Self::use_snapshot`] re-establishes it from scratch.
    pub fn reset(&mut self) {
        self.states.clear();
        self.state_dict.clear();
        self.snapshots.clear();
        self.snapshot_dict.clear();
        self.graph.clear();
        self.live = LiveState::startup(self.caps.texture_stage_count);
        self.current_state = None;
        self.current_snapshot = None;
        self.stats.clear();

        self.register_default_state()
            .expect("default state always fits in an empty table");
        debug!("transition table reset");
    }

    fn check_shape(&self, state: &PipelineState) -> Result<()> {
        if state.stage_count() != self.caps.texture_stage_count
            || state.sampler_count() != self.caps.sampler_count
        {
            return Err(TransitionTableError::StateShape {
                stages: state.stage_count(),
                samplers: state.sampler_count(),
                expected_stages: self.caps.texture_stage_count,
                expected_samplers: self.caps.sampler_count,
            });
        }
        Ok(())
    }

    /// Looks `state` up without registering it.
    pub fn find_state(&self, state: &PipelineState) -> Option<StateId> {
        self.state_dict
            .find(state.checksum(), |id| self.states[id.index()] == *state)
            .found
    }

    /// Returns the id of `state`, registering it and building every edge to and from it on first
    /// sight.
    ///
    /// On error nothing is registered.
    pub fn find_or_create_state(&mut self, state: PipelineState) -> Result<StateId> {
        self.check_shape(&state)?;

        let checksum = state.checksum();
        let lookup = self
            .state_dict
            .find(checksum, |id| self.states[id.index()] == state);
        self.stats.checksum_collisions += lookup.collisions as u64;
        if let Some(id) = lookup.found {
            self.stats.state_lookup_hits += 1;
            return Ok(id);
        }

        let id = StateId::new(self.states.len());
        let checkpoint = self.graph.checkpoint();
        let ops_before = self.graph.op_count();
        self.states.push(state);
        self.state_dict.insert(checksum, id);
        self.graph.add_state();

        if let Err(err) = self.build_edges(id) {
            self.graph.rollback(checkpoint);
            self.states.pop();
            self.state_dict.remove(id);
            return Err(err);
        }

        debug_assert_eq!(self.graph.state_count(), self.states.len());
        debug_assert_eq!(self.state_dict.len(), self.states.len());

        self.stats.states_created += 1;
        let ops = self.graph.op_count();
        debug!(
            state = id.index(),
            checksum,
            new_ops = ops - ops_before,
            ops,
            unique_transitions = self.graph.unique_transition_count(),
            "created transition state"
        );
        if ops >= OP_CAPACITY_WARN {
            warn!(
                ops,
                limit = OpRange::OP_LIMIT,
                "transition op table is nearing capacity"
            );
        }
        Ok(id)
    }

    fn build_edges(&mut self, new: StateId) -> Result<()> {
        for to in 0..new.index() {
            self.graph
                .build_edge(&self.states, &self.caps, StateId::new(to), Some(new), &mut self.stats)?;
        }
        for from in 0..new.index() {
            self.graph
                .build_edge(&self.states, &self.caps, new, Some(StateId::new(from)), &mut self.stats)?;
        }
        Ok(())
    }

    /// Returns the id of the `(state, binding)` pair, registering it on first sight.
    pub fn find_or_create_snapshot(&mut self, state: StateId, binding: ShaderBinding) -> SnapshotId {
        assert!(
            state.index() < self.states.len(),
            "unknown transition state {}",
            state.index()
        );

        let key = Snapshot { state, binding };
        let checksum = binding.snapshot_checksum(state);
        let lookup = self
            .snapshot_dict
            .find(checksum, |id| self.snapshots[id.index()] == key);
        self.stats.checksum_collisions += lookup.collisions as u64;
        if let Some(id) = lookup.found {
            self.stats.snapshot_lookup_hits += 1;
            return id;
        }

        let id = SnapshotId::new(self.snapshots.len());
        self.snapshots.push(key);
        self.snapshot_dict.insert(checksum, id);
        self.stats.snapshots_created += 1;
        debug!(
            snapshot = id.index(),
            state = state.index(),
            vertex_shader = binding.vertex_shader.0,
            pixel_shader = binding.pixel_shader.0,
            "created snapshot"
        );
        id
    }

    /// Registers the aggregate of `shadow`. Never touches the device.
    pub fn take_snapshot(&mut self, shadow: &StateShadow) -> Result<SnapshotId> {
        self.take_snapshot_inner(shadow).map(|(snapshot, _)| snapshot)
    }

    /// Like [`Self::take_snapshot`], and probes the device with the state if it is new and
    /// [`TableConfig::validate_new_states`] is set.
    pub fn take_validated_snapshot<D: StateDevice + ?Sized>(
        &mut self,
        device: &mut D,
        shadow: &StateShadow,
    ) -> Result<ValidatedSnapshot> {
        let (snapshot, created) = self.take_snapshot_inner(shadow)?;
        let accepted = if created && self.config.validate_new_states {
            self.test_snapshot(device, snapshot)
        } else {
            true
        };
        Ok(ValidatedSnapshot { snapshot, accepted })
    }

    fn take_snapshot_inner(&mut self, shadow: &StateShadow) -> Result<(SnapshotId, bool)> {
        let states_before = self.states.len();
        let state = self.find_or_create_state(shadow.compute_aggregate())?;
        let created = self.states.len() > states_before;
        Ok((self.find_or_create_snapshot(state, *shadow.binding()), created))
    }

    fn applicator<'s, D: StateDevice + ?Sized>(&'s mut self, device: &'s mut D) -> Applicator<'s, D> {
        Applicator::new(
            device,
            &mut self.live,
            &self.caps,
            &mut self.stats,
            self.config.trace_transitions,
        )
    }

    /// Puts the device in the configuration of `id`.
    ///
    /// Only the ops on the graph edge from the active state run, and only shader slots that
    /// change are rebound, so repeating a call issues nothing.
    pub fn use_snapshot<D: StateDevice + ?Sized>(&mut self, device: &mut D, id: SnapshotId) {
        if !device.is_usable() {
            trace!(snapshot = id.index(), "device unusable; skipping snapshot");
            return;
        }

        let snapshot = self.snapshots[id.index()];
        if self.current_snapshot != Some(id) {
            if self.current_state.is_none() {
                self.apply_default_state(device, self.live.overrides);
            }
            if self.current_state != Some(snapshot.state) {
                self.apply_transition(device, snapshot.state);
            }
            self.current_snapshot = Some(id);
        }

        let state = &self.states[snapshot.state.index()];
        Applicator::new(
            device,
            &mut self.live,
            &self.caps,
            &mut self.stats,
            self.config.trace_transitions,
        )
        .bind_shaders(state, &snapshot.binding);
    }

    fn apply_transition<D: StateDevice + ?Sized>(&mut self, device: &mut D, to: StateId) {
        let from = self
            .current_state
            .expect("a transition always starts from an applied state");
        let range = self.graph.edge(to, from);
        self.stats.transitions_applied += 1;
        if self.config.trace_transitions {
            trace!(
                from = from.index(),
                to = to.index(),
                ops = ?self.graph.ops(range),
                "apply transition"
            );
        }

        let mut applicator = Applicator::new(
            device,
            &mut self.live,
            &self.caps,
            &mut self.stats,
            self.config.trace_transitions,
        );
        let state = &self.states[to.index()];
        applicator.run(state, self.graph.ops(range));
        applicator.perform_overrides(state);
        self.current_state = Some(to);
    }

    /// Pushes the startup configuration to the device without diffing against what it holds.
    ///
    /// Clears every override and the linear framebuffer flag, and leaves no snapshot current.
    pub fn use_default_state<D: StateDevice + ?Sized>(&mut self, device: &mut D) {
        self.apply_default_state(device, Overrides::default());
    }

    /// [`Self::use_default_state`], with `overrides` active afterwards.
    fn apply_default_state<D: StateDevice + ?Sized>(&mut self, device: &mut D, overrides: Overrides) {
        if !device.is_usable() {
            trace!("device unusable; skipping default state");
            return;
        }
        self.stats.default_state_applications += 1;

        let default = self.default_state_id();
        let range = self.default_edge();
        let state = &self.states[default.index()];
        let mut applicator = Applicator::new(
            device,
            &mut self.live,
            &self.caps,
            &mut self.stats,
            self.config.trace_transitions,
        );
        applicator.reset_to_startup(overrides);
        applicator.run(state, self.graph.ops(range));
        applicator.perform_overrides(state);
        applicator.bind_shaders(state, &ShaderBinding::default());

        self.current_state = Some(default);
        self.current_snapshot = None;
    }

    /// Applies every field of `id` to the device and asks the device whether it can render it.
    ///
    /// The device is left in the default state afterwards, with no snapshot current. Returns
    /// `true` without probing if the device is unusable.
    pub fn test_snapshot<D: StateDevice + ?Sized>(&mut self, device: &mut D, id: SnapshotId) -> bool {
        if !device.is_usable() {
            trace!(snapshot = id.index(), "device unusable; skipping validation");
            return true;
        }
        if self.current_state.is_none() {
            self.apply_default_state(device, self.live.overrides);
        }
        self.stats.validation_probes += 1;

        let snapshot = self.snapshots[id.index()];
        let state = &self.states[snapshot.state.index()];
        let ops = graph::forced_ops(state, &self.caps);
        {
            let mut applicator = Applicator::new(
                device,
                &mut self.live,
                &self.caps,
                &mut self.stats,
                self.config.trace_transitions,
            );
            applicator.run(state, &ops);
            applicator.bind_shaders(state, &snapshot.binding);
        }
        let accepted = device.validate();

        let default = self.default_state_id();
        let range = self.default_edge();
        let default_state = &self.states[default.index()];
        let mut applicator = Applicator::new(
            device,
            &mut self.live,
            &self.caps,
            &mut self.stats,
            self.config.trace_transitions,
        );
        applicator.run(default_state, self.graph.ops(range));
        applicator.perform_overrides(default_state);
        applicator.bind_shaders(default_state, &ShaderBinding::default());
        self.current_state = Some(default);
        self.current_snapshot = None;

        if !accepted {
            self.stats.validation_rejections += 1;
            warn!(
                snapshot = id.index(),
                state = snapshot.state.index(),
                "device rejected state combination"
            );
        }
        accepted
    }

    /// Forgets which shaders are bound, so the next [`Self::use_snapshot`] rebinds both slots.
    pub fn invalidate_shader_binding(&mut self) {
        self.live.vertex_shader = None;
        self.live.pixel_shader = None;
    }

    // Overrides. Each one is a no-op unless its enable flag changes. While the device is
    // unusable only the flag changes; switching one off then leaves a restore for the next
    // transition.

    fn current_pipeline(&self) -> Option<&PipelineState> {
        self.current_state.map(|id| &self.states[id.index()])
    }

    fn defer_restore(&mut self, enable: bool, fields: PendingRestore) {
        if !enable {
            self.live.overrides.pending_restore.insert(fields);
        }
    }

    /// Forces the depth compare to `EQUAL` while enabled.
    pub fn force_depth_func_equals<D: StateDevice + ?Sized>(&mut self, device: &mut D, enable: bool) {
        if self.live.overrides.force_depth_func_equals == enable {
            return;
        }
        self.live.overrides.force_depth_func_equals = enable;
        if !device.is_usable() {
            self.defer_restore(enable, PendingRestore::DEPTH_FUNC);
            return;
        }
        device.flush_buffered_primitives();

        let func = if enable {
            Some(CompareFunc::Equal)
        } else {
            self.current_pipeline().map(|state| state.z_func)
        };
        if let Some(func) = func {
            self.applicator(device).set_z_func(func);
        }
    }

    /// Forces depth testing on, with depth writes as given, while enabled.
    pub fn override_depth_enable<D: StateDevice + ?Sized>(
        &mut self,
        device: &mut D,
        enable: bool,
        depth_write: bool,
    ) {
        if self.live.overrides.depth_enable == enable {
            return;
        }
        self.live.overrides.depth_enable = enable;
        self.live.overrides.depth_write_value = depth_write;
        if !device.is_usable() {
            self.defer_restore(enable, PendingRestore::DEPTH_ENABLE);
            return;
        }
        device.flush_buffered_primitives();

        let values = if enable {
            Some((true, depth_write))
        } else {
            self.current_pipeline()
                .map(|state| (state.z_enable, state.z_write_enable))
        };
        if let Some((z_enable, z_write)) = values {
            let mut applicator = self.applicator(device);
            applicator.set_z_enable(z_enable);
            applicator.set_z_write(z_write);
        }
    }

    /// Forces the alpha channel write mask while enabled.
    pub fn override_alpha_write_enable<D: StateDevice + ?Sized>(
        &mut self,
        device: &mut D,
        enable: bool,
        alpha_write: bool,
    ) {
        if self.live.overrides.alpha_write == enable {
            return;
        }
        self.live.overrides.alpha_write = enable;
        self.live.overrides.alpha_write_value = alpha_write;
        self.update_color_write(device, enable, ColorWriteMask::ALPHA);
    }

    /// Forces the RGB channel write mask while enabled.
    pub fn override_color_write_enable<D: StateDevice + ?Sized>(
        &mut self,
        device: &mut D,
        enable: bool,
        color_write: bool,
    ) {
        if self.live.overrides.color_write == enable {
            return;
        }
        self.live.overrides.color_write = enable;
        self.live.overrides.color_write_value = color_write;
        self.update_color_write(device, enable, ColorWriteMask::RGB);
    }

    /// Re-derives the write mask after an override over `bits` changed.
    fn update_color_write<D: StateDevice + ?Sized>(
        &mut self,
        device: &mut D,
        enable: bool,
        bits: ColorWriteMask,
    ) {
        if !device.is_usable() {
            self.defer_restore(enable, PendingRestore::COLOR_WRITE);
            return;
        }
        device.flush_buffered_primitives();

        let mut mask = self.live.color_write;
        if let Some(state) = self.current_pipeline() {
            mask.remove(bits);
            mask.insert(state.color_write & bits);
        }
        self.applicator(device).set_color_write(mask);
    }

    /// Marks the framebuffer as linear, which keeps hardware sRGB writes off whatever the active
    /// state asks for. Ignored until a state has been applied.
    pub fn enable_linear_color_space_frame_buffer<D: StateDevice + ?Sized>(
        &mut self,
        device: &mut D,
        enable: bool,
    ) {
        let Some(current) = self.current_state else {
            return;
        };
        if self.live.linear_frame_buffer == enable {
            return;
        }
        self.live.linear_frame_buffer = enable;
        if !device.is_usable() {
            return;
        }
        device.flush_buffered_primitives();

        let state = &self.states[current.index()];
        Applicator::new(
            device,
            &mut self.live,
            &self.caps,
            &mut self.stats,
            self.config.trace_transitions,
        )
        .apply_srgb_write(state);
    }

    // Accessors. Unknown ids panic.

    pub fn state(&self, id: StateId) -> &PipelineState {
        &self.states[id.index()]
    }

    pub fn shader_binding(&self, id: SnapshotId) -> &ShaderBinding {
        &self.snapshots[id.index()].binding
    }

    pub fn snapshot_state_id(&self, id: SnapshotId) -> StateId {
        self.snapshots[id.index()].state
    }

    pub fn default_snapshot(&self) -> SnapshotId {
        self.default_snapshot
    }

    pub fn default_state_id(&self) -> StateId {
        self.snapshot_state_id(self.default_snapshot)
    }

    pub fn current_snapshot(&self) -> Option<SnapshotId> {
        self.current_snapshot
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.current_state
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Every registered state, in creation order.
    pub fn state_ids(&self) -> impl Iterator<Item = StateId> {
        (0..self.states.len()).map(StateId::new)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn op_count(&self) -> usize {
        self.graph.op_count()
    }

    pub fn unique_transition_count(&self) -> usize {
        self.graph.unique_transition_count()
    }

    /// Ops that move the device from `from` to `to`.
    pub fn edge(&self, to: StateId, from: StateId) -> OpRange {
        self.graph.edge(to, from)
    }

    pub fn edge_ops(&self, range: OpRange) -> &[StateOp] {
        self.graph.ops(range)
    }

    /// Ops that set every field of the default state.
    pub fn default_edge(&self) -> OpRange {
        self.graph
            .default_edge()
            .expect("default edge is built with the default state")
    }

    pub fn stats(&self) -> TransitionStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }
}

use crate::ops::{DecodedOp, RenderFunc, StageFunc};

/// Snapshot of transition table counters, suitable for profiling/telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransitionStatsSnapshot {
    pub states_created: u64,
    pub snapshots_created: u64,
    pub state_lookup_hits: u64,
    pub snapshot_lookup_hits: u64,
    pub checksum_collisions: u64,

    pub edges_built: u64,
    pub edges_interned: u64,
    pub reverse_edge_hits: u64,

    pub transitions_applied: u64,
    pub ops_executed: u64,
    pub default_state_applications: u64,
    pub shader_binds: u64,

    pub validation_probes: u64,
    pub validation_rejections: u64,

    /// Indexed by [`RenderFunc`] code.
    pub render_ops: [u64; RenderFunc::COUNT],
    /// Indexed by [`StageFunc`] code, summed over stages.
    pub stage_ops: [u64; StageFunc::COUNT],
}

impl TransitionStatsSnapshot {
    pub fn render_op_count(&self, func: RenderFunc) -> u64 {
        self.render_ops[func as usize]
    }

    pub fn stage_op_count(&self, func: StageFunc) -> u64 {
        self.stage_ops[func as usize]
    }
}

/// Counters owned by a single [`crate::TransitionTable`]. The table is driven through `&mut`, so
/// these are plain integers.
#[derive(Debug, Default)]
pub struct TransitionStats {
    pub(crate) states_created: u64,
    pub(crate) snapshots_created: u64,
    pub(crate) state_lookup_hits: u64,
    pub(crate) snapshot_lookup_hits: u64,
    pub(crate) checksum_collisions: u64,

    pub(crate) edges_built: u64,
    pub(crate) edges_interned: u64,
    pub(crate) reverse_edge_hits: u64,

    pub(crate) transitions_applied: u64,
    pub(crate) ops_executed: u64,
    pub(crate) default_state_applications: u64,
    pub(crate) shader_binds: u64,

    pub(crate) validation_probes: u64,
    pub(crate) validation_rejections: u64,

    render_ops: [u64; RenderFunc::COUNT],
    stage_ops: [u64; StageFunc::COUNT],
}

impl TransitionStats {
    pub(crate) fn record_op(&mut self, op: DecodedOp) {
        self.ops_executed += 1;
        match op {
            DecodedOp::Render(func) => self.render_ops[func as usize] += 1,
            DecodedOp::Stage(func, _) => self.stage_ops[func as usize] += 1,
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> TransitionStatsSnapshot {
        TransitionStatsSnapshot {
            states_created: self.states_created,
            snapshots_created: self.snapshots_created,
            state_lookup_hits: self.state_lookup_hits,
            snapshot_lookup_hits: self.snapshot_lookup_hits,
            checksum_collisions: self.checksum_collisions,
            edges_built: self.edges_built,
            edges_interned: self.edges_interned,
            reverse_edge_hits: self.reverse_edge_hits,
            transitions_applied: self.transitions_applied,
            ops_executed: self.ops_executed,
            default_state_applications: self.default_state_applications,
            shader_binds: self.shader_binds,
            validation_probes: self.validation_probes,
            validation_rejections: self.validation_rejections,
            render_ops: self.render_ops,
            stage_ops: self.stage_ops,
        }
    }
}

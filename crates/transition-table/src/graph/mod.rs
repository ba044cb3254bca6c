//! The dense transition graph and the flat op array backing it.

mod diff;
mod intern;

use tracing::{debug, error};

use crate::device::DeviceCaps;
use crate::error::{Result, TransitionTableError};
use crate::ops::{OpRange, StateOp};
use crate::state::{PipelineState, StateId};
use crate::stats::TransitionStats;

use intern::UniqueTransitions;

/// Every op needed to put `state` on a device whose configuration is unknown.
pub(crate) fn forced_ops(state: &PipelineState, caps: &DeviceCaps) -> Vec<StateOp> {
    let mut ops = Vec::new();
    diff::push_transition_ops(state, state, true, caps, &mut ops);
    ops
}

/// Rollback point taken before a new state's edges are built.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GraphCheckpoint {
    ops_len: usize,
    state_count: usize,
}

#[derive(Debug)]
pub(crate) struct TransitionGraph {
    ops: Vec<StateOp>,
    /// `edges[to][from]`.
    edges: Vec<Vec<OpRange>>,
    default_edge: Option<OpRange>,
    unique: UniqueTransitions,
    /// Exclusive bound on the end of a stored op list.
    op_limit: usize,
}

impl Default for TransitionGraph {
    fn default() -> Self {
        Self {
            ops: Vec::new(),
            edges: Vec::new(),
            default_edge: None,
            unique: UniqueTransitions::default(),
            op_limit: OpRange::OP_LIMIT,
        }
    }
}

impl TransitionGraph {
    #[cfg(test)]
    pub fn set_op_limit(&mut self, limit: usize) {
        self.op_limit = limit.min(OpRange::OP_LIMIT);
    }

    pub fn state_count(&self) -> usize {
        self.edges.len()
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn unique_transition_count(&self) -> usize {
        self.unique.len()
    }

    pub fn edge(&self, to: StateId, from: StateId) -> OpRange {
        self.edges[to.index()][from.index()]
    }

    pub fn default_edge(&self) -> Option<OpRange> {
        self.default_edge
    }

    pub fn ops(&self, range: OpRange) -> &[StateOp] {
        &self.ops[range.as_range()]
    }

    pub fn checkpoint(&self) -> GraphCheckpoint {
        GraphCheckpoint {
            ops_len: self.ops.len(),
            state_count: self.edges.len(),
        }
    }

    /// Undoes everything recorded since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: GraphCheckpoint) {
        self.ops.truncate(checkpoint.ops_len);
        self.unique.truncate_ops(checkpoint.ops_len);
        self.edges.truncate(checkpoint.state_count);
        for row in &mut self.edges {
            row.truncate(checkpoint.state_count);
        }
    }

    pub fn clear(&mut self) {
        self.ops.clear();
        self.edges.clear();
        self.default_edge = None;
        self.unique.clear();
    }

    /// Grows the table by one row and one column of empty edges.
    pub fn add_state(&mut self) {
        let n = self.edges.len() + 1;
        for row in &mut self.edges {
            row.push(OpRange::EMPTY);
        }
        self.edges.push(vec![OpRange::EMPTY; n]);
    }

    /// Builds `edges[to][from]`, or the forced default edge into `to` when `from` is `None`.
    pub fn build_edge(
        &mut self,
        states: &[PipelineState],
        caps: &DeviceCaps,
        to: StateId,
        from: Option<StateId>,
        stats: &mut TransitionStats,
    ) -> Result<OpRange> {
        let to_state = &states[to.index()];
        let from_state = from.map_or(to_state, |from| &states[from.index()]);

        let first = self.ops.len();
        diff::push_transition_ops(from_state, to_state, from.is_none(), caps, &mut self.ops);
        let count = self.ops.len() - first;
        stats.edges_built += 1;

        let range = if count == 0 {
            OpRange::EMPTY
        } else {
            self.intern_tail(first, count, to, from, stats)?
        };

        match from {
            Some(from) => self.edges[to.index()][from.index()] = range,
            None => self.default_edge = Some(range),
        }
        Ok(range)
    }

    fn new_range(&self, first: usize, count: usize) -> Result<OpRange> {
        if first + count >= self.op_limit {
            return Err(TransitionTableError::OpTableOverflow { first, count });
        }
        OpRange::new(first, count)
    }

    /// Resolves the `count` ops just appended at `first` to a stored range, reusing an identical
    /// run when one exists.
    fn intern_tail(
        &mut self,
        first: usize,
        count: usize,
        to: StateId,
        from: Option<StateId>,
        stats: &mut TransitionStats,
    ) -> Result<OpRange> {
        // Transitions are often mirror images; try the reverse edge before scanning.
        let reverse = from
            .map(|from| self.edges[from.index()][to.index()])
            .filter(|reverse| reverse.count() == count);
        if let Some(reverse) = reverse {
            if self.ops[reverse.as_range()] == self.ops[first..first + count] {
                self.ops.truncate(first);
                stats.reverse_edge_hits += 1;
                stats.edges_interned += 1;
                return Ok(reverse);
            }
        }

        if let Some(existing) = self.unique.find(&self.ops, &self.ops[first..first + count]) {
            self.ops.truncate(first);
            stats.edges_interned += 1;
            return OpRange::new(existing, count);
        }

        let range = match self.new_range(first, count) {
            Ok(range) => range,
            Err(err) => {
                self.ops.truncate(first);
                error!(
                    first,
                    count,
                    limit = self.op_limit,
                    "transition op table overflow"
                );
                return Err(err);
            }
        };
        self.unique.insert(range);
        debug!(
            to = to.index(),
            from = from.map(StateId::index),
            first,
            count,
            "stored new transition op list"
        );
        Ok(range)
    }
}

use crate::ops::{OpRange, StateOp};

/// Every distinct op sequence stored so far, longest first.
///
/// A new sequence can only be found inside one at least as long, so a scan stops at the first
/// shorter entry.
#[derive(Debug, Default)]
pub(crate) struct UniqueTransitions {
    lists: Vec<OpRange>,
}

impl UniqueTransitions {
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Looks for `candidate` as a contiguous run inside any stored sequence and returns the index
    /// of its first op in `ops`.
    ///
    /// The lowest matching index wins. Sequences are only ever appended past the end of existing
    /// ones, so the answer for a given candidate never changes as the table grows.
    pub fn find(&self, ops: &[StateOp], candidate: &[StateOp]) -> Option<usize> {
        let (&head, tail) = candidate.split_first()?;
        let len = candidate.len();
        let mut best: Option<usize> = None;

        for list in &self.lists {
            if list.count() < len {
                break;
            }

            // Only the first position whose head op matches is tried.
            let last_start = list.first() + list.count() - len;
            let Some(start) = (list.first()..=last_start).find(|&i| ops[i] == head) else {
                continue;
            };

            if ops[start + 1..start + len] == *tail {
                best = Some(best.map_or(start, |b| b.min(start)));
            }
        }
        best
    }

    pub fn insert(&mut self, range: OpRange) {
        let at = self
            .lists
            .partition_point(|list| list.count() >= range.count());
        self.lists.insert(at, range);
    }

    /// Drops sequences stored at or after `ops_len`.
    pub fn truncate_ops(&mut self, ops_len: usize) {
        self.lists.retain(|list| list.first() < ops_len);
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }
}

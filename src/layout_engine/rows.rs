//! Keeps every row between two and `max_row_children` components.
//!
//! Rows are flagged whenever a child joins or leaves them. At the end of each
//! mutation the flagged rows are settled: an empty row disappears and a row
//! left with one child releases it in its own place.

use slotmap::SecondaryMap;
use tracing::debug;

use super::canvas::CanvasTree;
use crate::model::tree::NodeId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowState {
    #[default]
    Stable,
    NeedsCleanup,
}

#[derive(Clone, Debug, Default)]
pub(super) struct RowMaintainer {
    states: SecondaryMap<NodeId, RowState>,
}

impl RowMaintainer {
    pub(super) fn mark(&mut self, row: NodeId) { self.states.insert(row, RowState::NeedsCleanup); }

    pub(super) fn settle(&mut self, row: NodeId) { self.states.insert(row, RowState::Stable); }

    pub(super) fn forget(&mut self, row: NodeId) { self.states.remove(row); }

    pub(super) fn state(&self, row: NodeId) -> RowState {
        self.states.get(row).copied().unwrap_or_default()
    }

    fn pending(&self) -> Vec<NodeId> {
        self.states
            .iter()
            .filter(|(_, state)| **state == RowState::NeedsCleanup)
            .map(|(row, _)| row)
            .collect()
    }
}

impl CanvasTree {
    /// Returns a copy of this canvas with every degenerate row dissolved.
    /// Applying it to its own result changes nothing.
    pub fn cleanup_rows(&self) -> CanvasTree {
        let mut next = self.clone();
        let rows: Vec<_> = next.rows().collect();
        for row in rows {
            next.tree.data.rows.mark(row);
        }
        next.settle_rows();
        next
    }

    /// Settles every row flagged since the last call.
    pub(super) fn settle_rows(&mut self) {
        loop {
            let pending = self.tree.data.rows.pending();
            if pending.is_empty() {
                break;
            }
            for row in pending {
                self.settle_row(row);
            }
        }
    }

    fn settle_row(&mut self, row: NodeId) {
        if !self.tree.map.contains(row) {
            self.tree.data.rows.forget(row);
            return;
        }
        let children: Vec<_> = row.children(&self.tree.map).take(2).collect();
        match children.as_slice() {
            [] => {
                debug!(?row, "removing empty row");
                row.detach(&mut self.tree).remove();
            }
            &[only] => {
                debug!(?row, ?only, "dissolving single-child row");
                if row.parent(&self.tree.map).is_some() {
                    only.detach(&mut self.tree).insert_before(row);
                } else {
                    only.detach(&mut self.tree).unlink();
                }
                row.detach(&mut self.tree).remove();
            }
            _ => self.tree.data.rows.settle(row),
        }
    }
}

//! Decides what a drop means before anything is mutated.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::canvas::CanvasTree;
use super::error::PlacementError;
use super::position::{HorizontalSide, Intent, VerticalSide};
use crate::model::node::{ComponentKind, InitialProperties};
use crate::model::tree::NodeId;

/// What is being dragged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum DragPayload {
    Palette {
        kind: ComponentKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initial_properties: Option<InitialProperties>,
    },
    Canvas {
        node: NodeId,
    },
}

impl DragPayload {
    pub fn palette(kind: ComponentKind) -> Self {
        DragPayload::Palette { kind, initial_properties: None }
    }

    /// The canvas node being moved, if any.
    pub fn source(&self) -> Option<NodeId> {
        match self {
            DragPayload::Canvas { node } => Some(*node),
            DragPayload::Palette { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MutationCommand {
    InsertAdjacent { target: NodeId, side: VerticalSide },
    InsertIntoRow {
        row: NodeId,
        reference: Option<NodeId>,
        side: HorizontalSide,
    },
    CreateRow { target: NodeId, side: HorizontalSide },
    AppendToRow { row: NodeId },
    AppendToCanvas,
    Reject(PlacementError),
}

/// Maps a drop of `payload` on `target` with `intent` to a single command.
///
/// Vertical intents act on whole rows: dropping above or below a field that
/// sits in a row places the node above or below that row. A centre drop on a
/// field behaves like dropping below it.
pub fn resolve_drop(
    canvas: &CanvasTree,
    payload: &DragPayload,
    target: NodeId,
    intent: Intent,
) -> MutationCommand {
    if let DragPayload::Palette { kind, .. } = payload
        && kind.is_meta_layout()
    {
        return MutationCommand::Reject(PlacementError::ImplicitLayoutRejected { kind: *kind });
    }

    let source = payload.source();
    if let Some(node) = source
        && !movable_onto(canvas, node, target)
    {
        return MutationCommand::Reject(PlacementError::InvalidSource { node });
    }
    let source_is_row = source.is_some_and(|node| canvas.is_row(node));

    if target == canvas.root() {
        return MutationCommand::AppendToCanvas;
    }
    if !canvas.contains(target) {
        warn!(?target, "drop target is gone, falling back to an append");
        return MutationCommand::InsertAdjacent { target, side: VerticalSide::After };
    }

    let parent_row = canvas.parent_row(target);
    let vertical = |side| MutationCommand::InsertAdjacent {
        target: parent_row.unwrap_or(target),
        side,
    };

    if canvas.is_row(target) {
        return match intent {
            Intent::Before => vertical(VerticalSide::Before),
            Intent::After => vertical(VerticalSide::After),
            _ if source_is_row => reject_nesting(source),
            _ => with_room(canvas, target, source, MutationCommand::AppendToRow { row: target }),
        };
    }

    match intent {
        Intent::Before => vertical(VerticalSide::Before),
        Intent::After | Intent::Center | Intent::Append => vertical(VerticalSide::After),
        Intent::Left | Intent::Right if source_is_row => reject_nesting(source),
        Intent::Left | Intent::Right => {
            let side = match intent {
                Intent::Left => HorizontalSide::Left,
                _ => HorizontalSide::Right,
            };
            match parent_row {
                Some(row) => with_room(
                    canvas,
                    row,
                    source,
                    MutationCommand::InsertIntoRow { row, reference: Some(target), side },
                ),
                None => MutationCommand::CreateRow { target, side },
            }
        }
    }
}

/// A canvas node can be dropped anywhere except on itself or inside itself.
fn movable_onto(canvas: &CanvasTree, node: NodeId, target: NodeId) -> bool {
    canvas.contains(node) && node != target && canvas.parent_row(target) != Some(node)
}

fn reject_nesting(source: Option<NodeId>) -> MutationCommand {
    let node = source.unwrap_or_default();
    MutationCommand::Reject(PlacementError::RowNestingRejected { node })
}

/// `command` when `row` can take one more component, counting a source that
/// is already inside it as leaving first.
fn with_room(
    canvas: &CanvasTree,
    row: NodeId,
    source: Option<NodeId>,
    command: MutationCommand,
) -> MutationCommand {
    let mut len = canvas.row_len(row);
    if source.is_some_and(|node| canvas.parent_row(node) == Some(row)) {
        len -= 1;
    }
    if len >= canvas.max_row_children() {
        return MutationCommand::Reject(PlacementError::RowCapacityExceeded {
            row,
            capacity: canvas.max_row_children(),
        });
    }
    command
}

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::model::node::ComponentKind;
use crate::model::tree::NodeId;

/// Why a drop was refused. Stable, message-free form of [`PlacementError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    RowCapacityExceeded,
    ImplicitLayoutRejected,
    RowNestingRejected,
    InvalidSource,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlacementError {
    #[error("This row already holds {capacity} fields. Drop above or below it instead.")]
    RowCapacityExceeded { row: NodeId, capacity: usize },
    #[error(
        "{kind} cannot be placed on the canvas. Drop a field beside another field to create a row."
    )]
    ImplicitLayoutRejected { kind: ComponentKind },
    #[error("A row cannot be placed inside another row.")]
    RowNestingRejected { node: NodeId },
    #[error("Node {node:?} cannot be dropped there.")]
    InvalidSource { node: NodeId },
}

impl PlacementError {
    pub fn reason(&self) -> RejectReason {
        match self {
            PlacementError::RowCapacityExceeded { .. } => RejectReason::RowCapacityExceeded,
            PlacementError::ImplicitLayoutRejected { .. } => RejectReason::ImplicitLayoutRejected,
            PlacementError::RowNestingRejected { .. } => RejectReason::RowNestingRejected,
            PlacementError::InvalidSource { .. } => RejectReason::InvalidSource,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("template node #{index} is a row of {len} fields, more than the {max} a row holds")]
    RowTooWide { index: usize, len: usize, max: usize },
    #[error("template node #{index} uses {kind}, which cannot be placed on the canvas")]
    MetaLayout { index: usize, kind: ComponentKind },
}

/// A structural rule a committed canvas must never break.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("row {row:?} has {len} children, rows hold 2 to {max}")]
    RowOutOfBounds { row: NodeId, len: usize, max: usize },
    #[error("row {row:?} is nested inside {parent:?}")]
    NestedRow { row: NodeId, parent: NodeId },
    #[error("component {node:?} has children")]
    ComponentWithChildren { node: NodeId },
    #[error("node {node:?} carries no payload")]
    MissingPayload { node: NodeId },
    #[error("node {node:?} is not reachable from the canvas")]
    Unreachable { node: NodeId },
}

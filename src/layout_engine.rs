mod canvas;
mod drag;
pub mod engine;
mod error;
mod mutator;
mod position;
mod resolver;
mod rows;

pub use canvas::CanvasTree;
pub use drag::{DragSession, HoverIndicator};
pub use engine::{EventResponse, LayoutCommand, LayoutEngine, LayoutEvent, Rejection};
pub use error::{InvariantViolation, PlacementError, RejectReason, TemplateError};
pub use mutator::Mutation;
pub use position::{HorizontalSide, Intent, TargetKind, VerticalSide, detect_intent};
pub use resolver::{DragPayload, MutationCommand, resolve_drop};
pub use rows::RowState;

pub use crate::common::config::DEFAULT_MAX_ROW_CHILDREN as MAX_ROW_CHILDREN;

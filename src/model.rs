pub mod geometry;
pub mod node;
pub mod tree;

pub use geometry::{Point, Rect};
pub use node::{
    CanvasNode, Component, ComponentKind, ComponentNode, InitialProperties, NodeSpec, RowNode,
    ValidationRule,
};
pub use tree::NodeId;

//! Layout engine for a drag-and-drop form builder canvas.
//!
//! The canvas is a vertical sequence of form fields, some of them grouped
//! side by side in rows. [`layout_engine::LayoutEngine`] turns drag events
//! and direct edits into new canvases while keeping every row between two
//! and [`layout_engine::MAX_ROW_CHILDREN`] fields.

pub mod common;
pub mod layout_engine;
pub mod model;
pub mod replay;

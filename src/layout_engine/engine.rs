use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::canvas::CanvasTree;
use super::drag::{DragSession, HoverIndicator};
use super::error::{PlacementError, RejectReason, TemplateError};
use super::mutator::Mutation;
use super::position::Intent;
use super::resolver::{DragPayload, MutationCommand, resolve_drop};
use crate::common::config::{Config, PlacementSettings};
use crate::model::geometry::{Point, Rect};
use crate::model::node::{CanvasNode, Component, ComponentKind, InitialProperties, NodeSpec};
use crate::model::tree::NodeId;

/// Drag lifecycle as reported by the renderer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutEvent {
    DragStarted(DragPayload),
    DragOver {
        pointer: Point,
        candidates: Vec<(NodeId, Rect)>,
    },
    DragLeft,
    Dropped,
    DragCancelled,
}

/// Direct edits that do not go through pointer tracking.
#[non_exhaustive]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    AddComponent {
        kind: ComponentKind,
        #[serde(default)]
        initial_properties: Option<InitialProperties>,
    },
    Drop {
        payload: DragPayload,
        target: NodeId,
        intent: Intent,
    },
    DeleteNode(NodeId),
    DuplicateNode(NodeId),
    ReplaceNode {
        target: NodeId,
        replacement: NodeSpec,
    },
    Clear,
}

/// A refused drop, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub reason: RejectReason,
    pub message: String,
}

impl From<&PlacementError> for Rejection {
    fn from(err: &PlacementError) -> Self {
        Rejection { reason: err.reason(), message: err.to_string() }
    }
}

#[must_use]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    /// A new canvas was committed.
    pub committed: bool,
    pub inserted: Option<NodeId>,
    pub removed: Option<CanvasNode>,
    pub rejection: Option<Rejection>,
    pub hover: Option<HoverIndicator>,
}

/// Owns the committed canvas and the drag in progress. Every edit replaces
/// the committed canvas wholesale, or leaves it alone.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    canvas: CanvasTree,
    drag: DragSession,
}

impl Default for LayoutEngine {
    fn default() -> Self { Self::new(&Config::default()) }
}

impl LayoutEngine {
    pub fn new(config: &Config) -> Self {
        LayoutEngine {
            canvas: CanvasTree::new(config.rows.max_children),
            drag: DragSession::new(usable_placement(config.placement)),
        }
    }

    pub fn canvas(&self) -> &CanvasTree { &self.canvas }

    pub fn snapshot(&self) -> Vec<CanvasNode> { self.canvas.snapshot() }

    pub fn draw_tree(&self) -> String { self.canvas.draw_tree() }

    pub fn hover(&self) -> Option<HoverIndicator> { self.drag.hover() }

    pub fn is_dragging(&self) -> bool { self.drag.is_active() }

    pub fn update_placement_settings(&mut self, settings: PlacementSettings) {
        self.drag.update_config(usable_placement(settings));
    }

    pub fn handle_event(&mut self, event: LayoutEvent) -> EventResponse {
        debug!(?event);
        match event {
            LayoutEvent::DragStarted(payload) => {
                self.begin_drag(payload);
                EventResponse::default()
            }
            LayoutEvent::DragOver { pointer, candidates } => EventResponse {
                hover: self.drag_over(pointer, &candidates),
                ..Default::default()
            },
            LayoutEvent::DragLeft => {
                self.drag_leave();
                EventResponse::default()
            }
            LayoutEvent::Dropped => self.drop_hovered(),
            LayoutEvent::DragCancelled => {
                self.cancel_drag();
                EventResponse::default()
            }
        }
    }

    pub fn handle_command(&mut self, command: LayoutCommand) -> EventResponse {
        debug!(?command);
        match command {
            LayoutCommand::AddComponent { kind, initial_properties } => {
                self.add_component(kind, initial_properties)
            }
            LayoutCommand::Drop { payload, target, intent } => self.drop_at(payload, target, intent),
            LayoutCommand::DeleteNode(id) => self.delete_node(id),
            LayoutCommand::DuplicateNode(id) => self.duplicate_node(id),
            LayoutCommand::ReplaceNode { target, replacement } => self.replace_node(target, replacement),
            LayoutCommand::Clear => self.clear(),
        }
    }

    #[instrument(skip(self))]
    pub fn begin_drag(&mut self, payload: DragPayload) {
        if self.drag.is_active() {
            debug!("replacing unfinished drag");
        }
        self.drag.begin(payload);
    }

    /// Updates the hover indicator. Never changes the canvas.
    pub fn drag_over(&mut self, pointer: Point, candidates: &[(NodeId, Rect)]) -> Option<HoverIndicator> {
        let before = self.drag.hover();
        let hover = self.drag.on_pointer_move(&self.canvas, pointer, candidates);
        if hover != before {
            debug!(?hover, "hover changed");
        }
        hover
    }

    pub fn drag_leave(&mut self) { self.drag.leave(); }

    #[instrument(skip(self))]
    pub fn cancel_drag(&mut self) {
        if self.drag.is_active() {
            debug!("drag cancelled");
        }
        self.drag.reset();
    }

    /// Drops the dragged payload on the hovered target. Releasing the
    /// pointer away from every target ends the drag without a change.
    #[instrument(skip(self))]
    pub fn drop_hovered(&mut self) -> EventResponse {
        let Some((payload, hover)) = self.drag.finish() else {
            debug!("drop without a drag");
            return EventResponse::default();
        };
        match hover {
            Some(HoverIndicator { target, intent }) => self.drop_at(payload, target, intent),
            None => {
                debug!("released outside every target");
                EventResponse::default()
            }
        }
    }

    #[instrument(skip(self, payload))]
    pub fn drop_at(&mut self, payload: DragPayload, target: NodeId, intent: Intent) -> EventResponse {
        let command = resolve_drop(&self.canvas, &payload, target, intent);
        debug!(?command, "resolved drop");
        let result = self.canvas.apply_drop(&payload, &command);
        self.settle(result)
    }

    /// Palette click: the new field goes to the bottom of the canvas.
    #[instrument(skip(self, initial_properties))]
    pub fn add_component(
        &mut self,
        kind: ComponentKind,
        initial_properties: Option<InitialProperties>,
    ) -> EventResponse {
        let payload = DragPayload::Palette { kind, initial_properties };
        let result = self.canvas.apply_drop(&payload, &MutationCommand::AppendToCanvas);
        self.settle(result)
    }

    #[instrument(skip(self))]
    pub fn delete_node(&mut self, id: NodeId) -> EventResponse {
        let mutation = self.canvas.remove_node_by_id(id);
        if mutation.removed.is_none() {
            warn!("nothing to delete");
            return EventResponse::default();
        }
        self.commit(mutation)
    }

    #[instrument(skip(self))]
    pub fn duplicate_node(&mut self, id: NodeId) -> EventResponse {
        match self.canvas.duplicate_node(id) {
            Some(mutation) => self.commit(mutation),
            None => {
                warn!("nothing to duplicate");
                EventResponse::default()
            }
        }
    }

    #[instrument(skip(self, replacement))]
    pub fn replace_node(&mut self, target: NodeId, replacement: NodeSpec) -> EventResponse {
        match self.canvas.replace_node(target, replacement) {
            Some(result) => self.settle(result),
            None => {
                warn!("nothing to replace");
                EventResponse::default()
            }
        }
    }

    /// Applies a property-panel edit to one component.
    #[instrument(skip(self, edit))]
    pub fn update_component(&mut self, id: NodeId, edit: impl FnOnce(&mut Component)) -> EventResponse {
        match self.canvas.update_component(id, edit) {
            Some(mutation) => self.commit(mutation),
            None => EventResponse::default(),
        }
    }

    /// Swaps the whole canvas for a template, keeping the row capacity.
    #[instrument(skip(self, nodes))]
    pub fn load_template(&mut self, nodes: Vec<NodeSpec>) -> Result<(), TemplateError> {
        let canvas = CanvasTree::from_nodes(nodes, self.canvas.max_row_children())?;
        self.drag.reset();
        self.canvas = canvas;
        info!(nodes = self.canvas.len(), "template loaded");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn clear(&mut self) -> EventResponse {
        self.drag.reset();
        self.canvas = CanvasTree::new(self.canvas.max_row_children());
        info!("canvas cleared");
        EventResponse { committed: true, ..Default::default() }
    }

    fn settle(&mut self, result: Result<Mutation, PlacementError>) -> EventResponse {
        match result {
            Ok(mutation) => self.commit(mutation),
            Err(err) => {
                warn!(reason = %err.reason(), "{err}");
                EventResponse {
                    rejection: Some(Rejection::from(&err)),
                    ..Default::default()
                }
            }
        }
    }

    fn commit(&mut self, mutation: Mutation) -> EventResponse {
        let Mutation { tree, inserted, removed } = mutation;
        debug_assert!(
            tree.invariant_violations().is_empty(),
            "committing a broken canvas: {:?}",
            tree.invariant_violations()
        );
        self.canvas = tree;
        info!(?inserted, removed = ?removed.as_ref().map(CanvasNode::id), "canvas committed");
        debug!("Tree:\n{}", self.canvas.draw_tree().trim());
        EventResponse {
            committed: true,
            inserted,
            removed,
            ..Default::default()
        }
    }
}

fn usable_placement(settings: PlacementSettings) -> PlacementSettings {
    for issue in settings.validate() {
        warn!("{issue}, using the default band");
    }
    settings.sanitized()
}

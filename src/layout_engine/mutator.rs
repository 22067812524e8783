//! Structural edits. Each public operation leaves `self` untouched and
//! returns a new canvas with every row settled.

use tracing::{debug, warn};

use super::canvas::CanvasTree;
use super::error::PlacementError;
use super::position::{HorizontalSide, VerticalSide};
use super::resolver::{DragPayload, MutationCommand};
use crate::model::node::{CanvasNode, Component, NodeData, NodeSpec};
use crate::model::tree::NodeId;

/// A canvas derived from another one, and what changed on the way.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Mutation {
    pub tree: CanvasTree,
    /// The node that was placed, if any.
    pub inserted: Option<NodeId>,
    /// Projection of the node that left the canvas, if any.
    pub removed: Option<CanvasNode>,
}

#[derive(Default)]
struct Outcome {
    inserted: Option<NodeId>,
    removed: Option<CanvasNode>,
}

impl CanvasTree {
    /// Runs `edit` on a working copy. On error the copy is dropped.
    fn transact(
        &self,
        edit: impl FnOnce(&mut CanvasTree) -> Result<Outcome, PlacementError>,
    ) -> Result<Mutation, PlacementError> {
        let mut working = self.clone();
        let Outcome { inserted, removed } = edit(&mut working)?;
        working.settle_rows();
        let inserted = inserted.filter(|&id| working.contains(id));
        Ok(Mutation { tree: working, inserted, removed })
    }

    /// Removes `id` and its subtree. An unknown id leaves the canvas as is.
    pub fn remove_node_by_id(&self, id: NodeId) -> Mutation {
        let mut next = self.clone();
        let removed = next.remove_in_place(id);
        next.settle_rows();
        Mutation { tree: next, inserted: None, removed }
    }

    /// Places `component` above or below `target`. A missing target appends
    /// at the bottom of the canvas.
    pub fn insert_adjacent(&self, target: NodeId, component: Component, side: VerticalSide) -> Mutation {
        let mut next = self.clone();
        let node = next.spawn_component(component);
        next.place_adjacent(node, target, side);
        next.settle_rows();
        Mutation { tree: next, inserted: Some(node), removed: None }
    }

    /// Places `component` in `row`, beside `reference` when it is one of the
    /// row's children, at the end otherwise.
    pub fn insert_into_row(
        &self,
        row: NodeId,
        reference: Option<NodeId>,
        component: Component,
        side: HorizontalSide,
    ) -> Result<Mutation, PlacementError> {
        self.transact(|t| {
            let node = t.spawn_component(component);
            t.place_in_row(node, row, reference, side)?;
            Ok(Outcome { inserted: Some(node), ..Default::default() })
        })
    }

    pub fn append_to_row(&self, row: NodeId, component: Component) -> Result<Mutation, PlacementError> {
        self.insert_into_row(row, None, component, HorizontalSide::Right)
    }

    /// Puts `target` and `component` side by side in a new row that takes
    /// `target`'s place. If `target` already sits in a row the component
    /// joins that row instead.
    pub fn create_row(
        &self,
        target: NodeId,
        component: Component,
        side: HorizontalSide,
    ) -> Result<Mutation, PlacementError> {
        self.transact(|t| {
            let node = t.spawn_component(component);
            t.wrap_in_row(node, target, side)?;
            Ok(Outcome { inserted: Some(node), ..Default::default() })
        })
    }

    /// Swaps `target` for a freshly built `replacement`. A row of one field
    /// is placed as that field and an empty row deletes `target`. `None` if
    /// `target` is not placed.
    pub fn replace_node(
        &self,
        target: NodeId,
        replacement: NodeSpec,
    ) -> Option<Result<Mutation, PlacementError>> {
        if !self.contains(target) {
            return None;
        }
        let replacement = match replacement {
            NodeSpec::Row(mut children) if children.len() < 2 => match children.pop() {
                Some(only) => NodeSpec::Component(only),
                None => return Some(Ok(self.remove_node_by_id(target))),
            },
            other => other,
        };
        Some(self.transact(|t| {
            if let NodeSpec::Row(children) = &replacement {
                if t.parent_row(target).is_some() {
                    return Err(PlacementError::RowNestingRejected { node: target });
                }
                if children.len() > t.max_row_children {
                    return Err(PlacementError::RowCapacityExceeded {
                        row: target,
                        capacity: t.max_row_children,
                    });
                }
            }
            let kinds = match &replacement {
                NodeSpec::Component(c) => vec![c.kind],
                NodeSpec::Row(children) => children.iter().map(|c| c.kind).collect(),
            };
            if let Some(kind) = kinds.into_iter().find(|k| k.is_meta_layout()) {
                return Err(PlacementError::ImplicitLayoutRejected { kind });
            }
            let node = t.spawn_spec(replacement);
            let removed = t.substitute(target, node);
            Ok(Outcome { inserted: Some(node), removed })
        }))
    }

    /// Copies a component, or a row with all of its fields, right after the
    /// original. Copies get new ids and new field ids. A component copied
    /// out of a full row lands after the row. `None` if `id` is not placed.
    pub fn duplicate_node(&self, id: NodeId) -> Option<Mutation> {
        if !self.contains(id) {
            return None;
        }
        let mut next = self.clone();
        let copy = next.deep_copy(id)?;
        let anchor = match next.parent_row(id) {
            Some(row) if next.row_len(row) >= next.max_row_children => row,
            _ => id,
        };
        copy.detach(&mut next.tree).insert_after(anchor);
        next.settle_rows();
        Some(Mutation { tree: next, inserted: Some(copy), removed: None })
    }

    /// Edits a component's payload in place, keeping its id. `None` when
    /// `id` is not a placed component or the edit turns it into a
    /// meta-layout.
    pub fn update_component(&self, id: NodeId, edit: impl FnOnce(&mut Component)) -> Option<Mutation> {
        if !self.contains(id) {
            return None;
        }
        let mut next = self.clone();
        let Some(NodeData::Component(component)) = next.tree.data.payload.get_mut(id) else {
            return None;
        };
        edit(component);
        if component.kind.is_meta_layout() {
            warn!(?id, kind = %component.kind, "refusing to turn a field into a layout");
            return None;
        }
        Some(Mutation { tree: next, inserted: None, removed: None })
    }

    /// Executes a resolved drop as one transaction: the dragged canvas node
    /// is lifted, or the palette component built, then placed. If placing
    /// fails the committed canvas, this one, still holds the dragged node.
    pub fn apply_drop(
        &self,
        payload: &DragPayload,
        command: &MutationCommand,
    ) -> Result<Mutation, PlacementError> {
        if let MutationCommand::Reject(err) = command {
            return Err(err.clone());
        }
        self.transact(|t| {
            let node = match payload {
                DragPayload::Palette { kind, initial_properties } => {
                    if kind.is_meta_layout() {
                        return Err(PlacementError::ImplicitLayoutRejected { kind: *kind });
                    }
                    let component = t.build_component(*kind, initial_properties.as_ref());
                    t.spawn_component(component)
                }
                DragPayload::Canvas { node } => {
                    if !t.contains(*node) {
                        return Err(PlacementError::InvalidSource { node: *node });
                    }
                    node.detach(&mut t.tree).unlink()
                }
            };
            t.execute(node, command)?;
            Ok(Outcome { inserted: Some(node), ..Default::default() })
        })
    }

    fn execute(&mut self, node: NodeId, command: &MutationCommand) -> Result<(), PlacementError> {
        debug!(?node, ?command, "placing");
        match *command {
            MutationCommand::InsertAdjacent { target, side } => {
                self.place_adjacent(node, target, side);
                Ok(())
            }
            MutationCommand::InsertIntoRow { row, reference, side } => {
                self.place_in_row(node, row, reference, side)
            }
            MutationCommand::CreateRow { target, side } => self.wrap_in_row(node, target, side),
            MutationCommand::AppendToRow { row } => {
                self.place_in_row(node, row, None, HorizontalSide::Right)
            }
            MutationCommand::AppendToCanvas => {
                self.push_top_level(node);
                Ok(())
            }
            MutationCommand::Reject(ref err) => Err(err.clone()),
        }
    }

    fn push_top_level(&mut self, node: NodeId) {
        node.detach(&mut self.tree).push_back(self.root);
    }

    fn place_adjacent(&mut self, node: NodeId, target: NodeId, side: VerticalSide) {
        if target == node || !self.contains(target) {
            warn!(?target, "drop target not found, appending to the canvas");
            self.push_top_level(node);
            return;
        }
        let anchor = match self.parent_row(target) {
            Some(row) if self.is_row(node) || self.row_len(row) >= self.max_row_children => row,
            _ => target,
        };
        match side {
            VerticalSide::Before => node.detach(&mut self.tree).insert_before(anchor),
            VerticalSide::After => node.detach(&mut self.tree).insert_after(anchor),
        };
    }

    fn place_in_row(
        &mut self,
        node: NodeId,
        row: NodeId,
        reference: Option<NodeId>,
        side: HorizontalSide,
    ) -> Result<(), PlacementError> {
        if !self.is_row(row) || !self.contains(row) {
            warn!(?row, "row not found, appending to the canvas");
            self.push_top_level(node);
            return Ok(());
        }
        if self.is_row(node) {
            return Err(PlacementError::RowNestingRejected { node });
        }
        if self.row_len(row) >= self.max_row_children {
            return Err(PlacementError::RowCapacityExceeded {
                row,
                capacity: self.max_row_children,
            });
        }
        match reference.filter(|&r| self.parent_row(r) == Some(row)) {
            Some(r) => match side {
                HorizontalSide::Left => node.detach(&mut self.tree).insert_before(r),
                HorizontalSide::Right => node.detach(&mut self.tree).insert_after(r),
            },
            None => node.detach(&mut self.tree).push_back(row),
        };
        Ok(())
    }

    fn wrap_in_row(&mut self, node: NodeId, target: NodeId, side: HorizontalSide) -> Result<(), PlacementError> {
        if !self.contains(target) {
            warn!(?target, "row target not found, appending to the canvas");
            self.push_top_level(node);
            return Ok(());
        }
        if self.is_row(target) {
            return self.place_in_row(node, target, None, side);
        }
        if let Some(row) = self.parent_row(target) {
            return self.place_in_row(node, row, Some(target), side);
        }
        if self.is_row(node) {
            return Err(PlacementError::RowNestingRejected { node });
        }
        let row = self.spawn_row();
        row.detach(&mut self.tree).insert_before(target);
        target.detach(&mut self.tree).push_back(row);
        match side {
            HorizontalSide::Left => node.detach(&mut self.tree).insert_before(target),
            HorizontalSide::Right => node.detach(&mut self.tree).insert_after(target),
        };
        Ok(())
    }

    /// Puts `node` where `target` is and deletes `target`.
    fn substitute(&mut self, target: NodeId, node: NodeId) -> Option<CanvasNode> {
        node.detach(&mut self.tree).insert_before(target);
        self.remove_in_place(target)
    }

    fn remove_in_place(&mut self, id: NodeId) -> Option<CanvasNode> {
        if !self.contains(id) {
            return None;
        }
        let removed = self.get(id);
        id.detach(&mut self.tree).remove();
        removed
    }

    /// Floating copy of `id`'s subtree with fresh field ids.
    fn deep_copy(&mut self, id: NodeId) -> Option<NodeId> {
        match self.tree.data.payload.get(id)?.clone() {
            NodeData::Component(component) => Some(self.copy_component(component)),
            NodeData::Row => {
                let children: Vec<_> = self
                    .children(id)
                    .filter_map(|child| self.component(child).cloned())
                    .collect();
                let row = self.spawn_row();
                for component in children {
                    let child = self.copy_component(component);
                    child.detach(&mut self.tree).push_back(row);
                }
                Some(row)
            }
        }
    }

    fn copy_component(&mut self, mut component: Component) -> NodeId {
        component.field_id = self.next_field_id(component.kind);
        self.spawn_component(component)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::model::node::ComponentKind;

    fn field(id: &str) -> Component { Component::new(ComponentKind::TextInput, id) }

    fn id(canvas: &CanvasTree, field_id: &str) -> NodeId { canvas.find_by_field_id(field_id).unwrap() }

    /// Top-level sequence with rows written as `[x y]`.
    fn layout(canvas: &CanvasTree) -> String {
        canvas
            .snapshot()
            .iter()
            .map(|node| match node {
                CanvasNode::Component(c) => c.component.field_id.clone(),
                CanvasNode::Row(r) => {
                    let ids: Vec<_> = r.children.iter().map(|c| c.component.field_id.as_str()).collect();
                    format!("[{}]", ids.join(" "))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn canvas(nodes: Vec<NodeSpec>) -> CanvasTree { CanvasTree::from_nodes(nodes, 4).unwrap() }

    fn abc() -> CanvasTree {
        canvas(vec![field("a").into(), field("b").into(), field("c").into()])
    }

    #[test]
    fn insert_adjacent_splices_in_order() {
        let t = abc();
        let m = t.insert_adjacent(id(&t, "b"), field("n"), VerticalSide::Before);
        assert_eq!("a n b c", layout(&m.tree));
        let m = m.tree.insert_adjacent(id(&t, "c"), field("z"), VerticalSide::After);
        assert_eq!("a n b c z", layout(&m.tree));
        assert_eq!("a b c", layout(&t));
    }

    #[test]
    fn insert_adjacent_to_missing_target_appends() {
        let t = abc();
        let m = t.insert_adjacent(NodeId::default(), field("n"), VerticalSide::Before);
        assert_eq!("a b c n", layout(&m.tree));
        assert_eq!(Some(id(&m.tree, "n")), m.inserted);
    }

    #[test]
    fn insert_adjacent_beside_full_row_member_goes_around_the_row() {
        let t = canvas(vec![NodeSpec::Row(vec![field("a"), field("b"), field("c"), field("d")])]);
        let m = t.insert_adjacent(id(&t, "b"), field("n"), VerticalSide::Before);
        assert_eq!("n [a b c d]", layout(&m.tree));
        let t = canvas(vec![NodeSpec::Row(vec![field("a"), field("b")])]);
        let m = t.insert_adjacent(id(&t, "a"), field("n"), VerticalSide::After);
        assert_eq!("[a n b]", layout(&m.tree));
    }

    #[test]
    fn remove_then_insert_restores_the_canvas() {
        let t = canvas(vec![field("a").into(), NodeSpec::Row(vec![field("b"), field("c")])]);
        let inserted = t.insert_adjacent(id(&t, "a"), field("n"), VerticalSide::After);
        let node = inserted.inserted.unwrap();
        let restored = inserted.tree.remove_node_by_id(node);
        assert_eq!(t, restored.tree);
        match restored.removed {
            Some(CanvasNode::Component(c)) => assert_eq!("n", c.component.field_id),
            other => panic!("unexpected removal {other:?}"),
        }
    }

    #[test]
    fn remove_unknown_is_a_no_op() {
        let t = abc();
        let m = t.remove_node_by_id(NodeId::default());
        assert_eq!(None, m.removed);
        assert_eq!(t, m.tree);
    }

    #[test]
    fn removing_from_pair_collapses_row() {
        let t = canvas(vec![field("a").into(), NodeSpec::Row(vec![field("b"), field("c")]), field("d").into()]);
        let m = t.remove_node_by_id(id(&t, "b"));
        assert_eq!("a c d", layout(&m.tree));
        assert!(m.tree.invariant_violations().is_empty());
    }

    #[test]
    fn removing_a_row_removes_its_fields() {
        let t = canvas(vec![NodeSpec::Row(vec![field("a"), field("b")]), field("c").into()]);
        let row = t.parent_row(id(&t, "a")).unwrap();
        let m = t.remove_node_by_id(row);
        assert_eq!("c", layout(&m.tree));
        assert_eq!(1, m.tree.len());
        assert_eq!(Some(vec![row, id(&t, "a"), id(&t, "b")]), m.removed.map(|n| n.ids()));
    }

    #[test]
    fn insert_into_row_respects_reference_and_capacity() {
        let t = canvas(vec![NodeSpec::Row(vec![field("a"), field("b"), field("c")])]);
        let row = t.parent_row(id(&t, "a")).unwrap();
        let m = t.insert_into_row(row, Some(id(&t, "b")), field("n"), HorizontalSide::Left).unwrap();
        assert_eq!("[a n b c]", layout(&m.tree));
        assert_eq!(
            Err(PlacementError::RowCapacityExceeded { row, capacity: 4 }),
            m.tree.insert_into_row(row, None, field("z"), HorizontalSide::Right)
        );
        let m = t.insert_into_row(row, Some(NodeId::default()), field("n"), HorizontalSide::Left).unwrap();
        assert_eq!("[a b c n]", layout(&m.tree));
    }

    #[test]
    fn insert_into_missing_row_appends() {
        let t = abc();
        let m = t.append_to_row(id(&t, "a"), field("n")).unwrap();
        assert_eq!("a b c n", layout(&m.tree));
    }

    #[test]
    fn create_row_orders_by_side() {
        let t = abc();
        let b = id(&t, "b");
        let m = t.create_row(b, field("n"), HorizontalSide::Left).unwrap();
        assert_eq!("a [n b] c", layout(&m.tree));
        let m = t.create_row(b, field("n"), HorizontalSide::Right).unwrap();
        assert_eq!("a [b n] c", layout(&m.tree));
        assert_eq!(Some(b), m.tree.children(m.tree.parent_row(b).unwrap()).next());
    }

    #[test]
    fn create_row_on_row_member_joins_that_row() {
        let t = canvas(vec![NodeSpec::Row(vec![field("a"), field("b")])]);
        let m = t.create_row(id(&t, "b"), field("n"), HorizontalSide::Left).unwrap();
        assert_eq!("[a n b]", layout(&m.tree));
    }

    #[test]
    fn replace_node_keeps_position() {
        let t = abc();
        let b = id(&t, "b");
        let m = t.replace_node(b, NodeSpec::Row(vec![field("x"), field("y")])).unwrap().unwrap();
        assert_eq!("a [x y] c", layout(&m.tree));
        assert!(!m.tree.contains(b));
        assert!(m.tree.is_row(m.inserted.unwrap()));

        let nested = canvas(vec![NodeSpec::Row(vec![field("a"), field("b")])]);
        let a = id(&nested, "a");
        assert_eq!(
            Some(Err(PlacementError::RowNestingRejected { node: a })),
            nested.replace_node(a, NodeSpec::Row(vec![field("x"), field("y")]))
        );
        let m = nested.replace_node(a, field("z").into()).unwrap().unwrap();
        assert_eq!("[z b]", layout(&m.tree));
    }

    #[test]
    fn replace_node_with_short_rows() {
        let t = abc();
        let b = id(&t, "b");
        let m = t.replace_node(b, NodeSpec::Row(vec![field("x")])).unwrap().unwrap();
        assert_eq!("a x c", layout(&m.tree));
        let x = m.inserted.unwrap();
        assert!(m.tree.contains(x));
        assert_eq!(Some(x), m.tree.find_by_field_id("x"));

        let m = t.replace_node(b, NodeSpec::Row(vec![])).unwrap().unwrap();
        assert_eq!("a c", layout(&m.tree));
        assert_eq!(None, m.inserted);
        assert!(m.removed.is_some());

        let nested = canvas(vec![NodeSpec::Row(vec![field("a"), field("b")])]);
        let m = nested.replace_node(id(&nested, "a"), NodeSpec::Row(vec![field("z")])).unwrap().unwrap();
        assert_eq!("[z b]", layout(&m.tree));
    }

    #[test]
    fn replace_missing_node() {
        let t = abc();
        let gone = t.remove_node_by_id(id(&t, "b")).tree;
        assert_eq!(None, gone.replace_node(id(&t, "b"), field("x").into()));
        assert_eq!(None, t.replace_node(t.root(), field("x").into()));
    }

    #[test]
    fn update_component_keeps_id() {
        let t = abc();
        let b = id(&t, "b");
        let m = t.update_component(b, |c| c.label = "Renamed".into()).unwrap();
        assert_eq!("Renamed", m.tree.component(b).unwrap().label);
        assert_eq!("Text Input", t.component(b).unwrap().label);
        assert!(t.update_component(b, |c| c.kind = ComponentKind::RowLayout).is_none());
    }

    #[test]
    fn duplicate_component_and_row() {
        let t = canvas(vec![field("a").into(), NodeSpec::Row(vec![field("b"), field("c")])]);
        let m = t.duplicate_node(id(&t, "a")).unwrap();
        assert_eq!("a text_input_1 [b c]", layout(&m.tree));

        let row = t.parent_row(id(&t, "b")).unwrap();
        let m = t.duplicate_node(row).unwrap();
        assert_eq!("a [b c] [text_input_1 text_input_2]", layout(&m.tree));
        assert!(m.tree.invariant_violations().is_empty());

        let m = t.duplicate_node(id(&t, "b")).unwrap();
        assert_eq!("a [b text_input_1 c]", layout(&m.tree));
    }

    #[test]
    fn duplicate_in_full_row_lands_after_row() {
        let t = canvas(vec![NodeSpec::Row(vec![field("a"), field("b"), field("c"), field("d")])]);
        let m = t.duplicate_node(id(&t, "b")).unwrap();
        assert_eq!("[a b c d] text_input_1", layout(&m.tree));
        assert!(t.duplicate_node(NodeId::default()).is_none());
    }

    #[test]
    fn failed_move_keeps_the_dragged_node() {
        let t = canvas(vec![
            field("a").into(),
            NodeSpec::Row(vec![field("b"), field("c"), field("d"), field("e")]),
        ]);
        let a = id(&t, "a");
        let row = t.parent_row(id(&t, "b")).unwrap();
        let forced = MutationCommand::AppendToRow { row };
        let err = t.apply_drop(&DragPayload::Canvas { node: a }, &forced).unwrap_err();
        assert_eq!(PlacementError::RowCapacityExceeded { row, capacity: 4 }, err);
        assert!(t.contains(a));
        assert_eq!("a [b c d e]", layout(&t));
    }

    #[test]
    fn move_out_of_pair_then_collapse() {
        let t = canvas(vec![NodeSpec::Row(vec![field("a"), field("b")]), field("c").into()]);
        let a = id(&t, "a");
        let m = t
            .apply_drop(
                &DragPayload::Canvas { node: a },
                &MutationCommand::InsertAdjacent { target: id(&t, "c"), side: VerticalSide::After },
            )
            .unwrap();
        assert_eq!("b c a", layout(&m.tree));
        assert_eq!(Some(a), m.inserted);
        assert!(m.tree.invariant_violations().is_empty());
    }

    #[test]
    fn palette_drop_builds_component() {
        let t = CanvasTree::default();
        let m = t
            .apply_drop(&DragPayload::palette(ComponentKind::Email), &MutationCommand::AppendToCanvas)
            .unwrap();
        let node = m.inserted.unwrap();
        let component = m.tree.component(node).unwrap();
        assert_eq!("email_1", component.field_id);
        assert_eq!("Email", component.label);
        assert!(t.is_empty());
    }
}

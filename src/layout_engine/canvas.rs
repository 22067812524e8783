//! The form layout as an ordered forest of components and rows.

use std::fmt;

use slotmap::SecondaryMap;

use super::error::{InvariantViolation, TemplateError};
use super::rows::{RowMaintainer, RowState};
use crate::common::collections::HashSet;
use crate::common::config::DEFAULT_MAX_ROW_CHILDREN;
use crate::model::node::{
    CanvasNode, Component, ComponentKind, ComponentNode, InitialProperties, NodeData, NodeSpec,
    RowNode,
};
use crate::model::tree::{NodeId, NodeMap, Observer, Tree};

/// Payloads and row bookkeeping kept beside the tree structure.
#[derive(Clone, Default)]
pub(super) struct Components {
    pub(super) payload: SecondaryMap<NodeId, NodeData>,
    pub(super) rows: RowMaintainer,
}

impl Components {
    fn note_membership_change(&mut self, map: &NodeMap, node: NodeId) {
        if let Some(parent) = node.parent(map)
            && self.payload.get(parent).is_some_and(NodeData::is_row)
        {
            self.rows.mark(parent);
        }
    }
}

impl Observer for Components {
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.note_membership_change(map, node)
    }

    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.note_membership_change(map, node)
    }

    fn removed_from_forest(&mut self, node: NodeId) {
        self.payload.remove(node);
        self.rows.forget(node);
    }
}

/// An immutable-by-convention form layout.
///
/// Every operation that changes the layout works on a clone and hands back
/// the new tree, so a `CanvasTree` a caller holds never changes under it.
/// Node ids survive into every tree derived from this one.
///
/// Top-level nodes hang off a hidden root whose id doubles as the drop
/// target for the empty canvas area.
#[derive(Clone)]
pub struct CanvasTree {
    pub(super) tree: Tree<Components>,
    pub(super) root: NodeId,
    pub(super) max_row_children: usize,
    pub(super) next_field_serial: u32,
}

impl Default for CanvasTree {
    fn default() -> Self { CanvasTree::new(DEFAULT_MAX_ROW_CHILDREN) }
}

impl CanvasTree {
    /// An empty canvas. Rows never hold fewer than two children, so a
    /// smaller capacity is raised to two.
    pub fn new(max_row_children: usize) -> Self {
        let mut tree = Tree::with_observer(Components::default());
        let root = tree.mk_node().into_id();
        CanvasTree {
            tree,
            root,
            max_row_children: max_row_children.max(2),
            next_field_serial: 0,
        }
    }

    /// Builds a canvas from a template. Rows with fewer than two fields are
    /// flattened the same way a mutation would leave them.
    pub fn from_nodes(
        nodes: impl IntoIterator<Item = NodeSpec>,
        max_row_children: usize,
    ) -> Result<Self, TemplateError> {
        let mut canvas = CanvasTree::new(max_row_children);
        for (index, spec) in nodes.into_iter().enumerate() {
            canvas.check_template_node(index, &spec)?;
            let node = canvas.spawn_spec(spec);
            node.detach(&mut canvas.tree).push_back(canvas.root);
        }
        canvas.settle_rows();
        Ok(canvas)
    }

    fn check_template_node(&self, index: usize, spec: &NodeSpec) -> Result<(), TemplateError> {
        let components = match spec {
            NodeSpec::Component(c) => std::slice::from_ref(c),
            NodeSpec::Row(children) => {
                if children.len() > self.max_row_children {
                    return Err(TemplateError::RowTooWide {
                        index,
                        len: children.len(),
                        max: self.max_row_children,
                    });
                }
                children.as_slice()
            }
        };
        match components.iter().find(|c| c.kind.is_meta_layout()) {
            Some(c) => Err(TemplateError::MetaLayout { index, kind: c.kind }),
            None => Ok(()),
        }
    }

    pub fn max_row_children(&self) -> usize { self.max_row_children }

    /// Id of the canvas body. Dropping onto it appends at the bottom.
    pub fn root(&self) -> NodeId { self.root }

    /// Number of components and rows on the canvas.
    pub fn len(&self) -> usize { self.tree.data.payload.len() }

    pub fn is_empty(&self) -> bool { self.root.is_empty(&self.tree.map) }

    /// Whether `id` is a component or row currently placed on the canvas.
    pub fn contains(&self, id: NodeId) -> bool {
        id != self.root
            && self.tree.data.payload.contains_key(id)
            && id.ancestors(&self.tree.map).any(|a| a == self.root)
    }

    pub fn is_row(&self, id: NodeId) -> bool {
        self.tree.data.payload.get(id).is_some_and(NodeData::is_row)
    }

    pub fn component(&self, id: NodeId) -> Option<&Component> {
        self.tree.data.payload.get(id).and_then(NodeData::as_component)
    }

    /// The row `id` sits in, if any.
    pub fn parent_row(&self, id: NodeId) -> Option<NodeId> {
        id.parent(&self.tree.map).filter(|&parent| self.is_row(parent))
    }

    pub fn row_len(&self, row: NodeId) -> usize { row.child_count(&self.tree.map) }

    pub fn row_state(&self, row: NodeId) -> Option<RowState> {
        self.is_row(row).then(|| self.tree.data.rows.state(row))
    }

    pub fn top_level(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.children(&self.tree.map)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.tree.map)
    }

    /// Index of `id` within its parent, top level or row.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        id.index_in_parent(&self.tree.map)
    }

    pub fn rows(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tree.data.payload.iter().filter(|(_, data)| data.is_row()).map(|(id, _)| id)
    }

    /// Every placed node, rows before their children, in document order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.traverse_preorder(&self.tree.map).skip(1)
    }

    pub fn find_by_field_id(&self, field_id: &str) -> Option<NodeId> {
        self.nodes()
            .find(|&id| self.component(id).is_some_and(|c| c.field_id == field_id))
    }

    /// Owned copy of the top-level sequence, as handed to the renderer.
    pub fn snapshot(&self) -> Vec<CanvasNode> {
        self.top_level().filter_map(|id| self.get(id)).collect()
    }

    pub fn get(&self, id: NodeId) -> Option<CanvasNode> {
        match self.tree.data.payload.get(id)? {
            NodeData::Component(_) => self.component_node(id).map(CanvasNode::Component),
            NodeData::Row => Some(CanvasNode::Row(RowNode {
                id,
                children: self.children(id).filter_map(|c| self.component_node(c)).collect(),
            })),
        }
    }

    fn component_node(&self, id: NodeId) -> Option<ComponentNode> {
        let component = self.component(id)?.clone();
        Some(ComponentNode { id, component })
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.ascii_tree(self.root);
        let mut out = String::new();
        match ascii_tree::write_tree(&mut out, &tree) {
            Ok(()) => out,
            Err(_) => String::new(),
        }
    }

    fn ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let desc = match self.tree.data.payload.get(node) {
            None => "canvas".to_owned(),
            Some(NodeData::Row) => "row".to_owned(),
            Some(NodeData::Component(c)) => {
                return ascii_tree::Tree::Leaf(vec![format!(
                    "{} [{}] {:?}",
                    c.field_id, c.kind, c.label
                )]);
            }
        };
        let children = self.children(node).map(|c| self.ascii_tree(c)).collect();
        ascii_tree::Tree::Node(desc, children)
    }

    /// Checks every structural rule a committed canvas keeps. Empty when the
    /// tree is sound.
    pub fn invariant_violations(&self) -> Vec<InvariantViolation> {
        let map = &self.tree.map;
        let payload = &self.tree.data.payload;
        let mut issues = Vec::new();
        let mut reachable = HashSet::default();

        for node in self.nodes() {
            reachable.insert(node);
            match payload.get(node) {
                None => issues.push(InvariantViolation::MissingPayload { node }),
                Some(NodeData::Component(_)) => {
                    if !node.is_empty(map) {
                        issues.push(InvariantViolation::ComponentWithChildren { node });
                    }
                }
                Some(NodeData::Row) => {
                    let len = node.child_count(map);
                    if !(2..=self.max_row_children).contains(&len) {
                        issues.push(InvariantViolation::RowOutOfBounds {
                            row: node,
                            len,
                            max: self.max_row_children,
                        });
                    }
                    if let Some(parent) = node.parent(map)
                        && parent != self.root
                    {
                        issues.push(InvariantViolation::NestedRow { row: node, parent });
                    }
                }
            }
        }

        issues.extend(
            payload
                .keys()
                .filter(|node| !reachable.contains(node))
                .map(|node| InvariantViolation::Unreachable { node }),
        );
        issues
    }

    pub(super) fn spawn_component(&mut self, component: Component) -> NodeId {
        let id = self.tree.mk_node().into_id();
        self.tree.data.payload.insert(id, NodeData::Component(component));
        id
    }

    pub(super) fn spawn_row(&mut self) -> NodeId {
        let id = self.tree.mk_node().into_id();
        self.tree.data.payload.insert(id, NodeData::Row);
        self.tree.data.rows.mark(id);
        id
    }

    /// Builds `spec` as a floating subtree and returns its top node.
    pub(super) fn spawn_spec(&mut self, spec: NodeSpec) -> NodeId {
        match spec {
            NodeSpec::Component(component) => self.spawn_component(component),
            NodeSpec::Row(children) => {
                let row = self.spawn_row();
                for component in children {
                    let child = self.spawn_component(component);
                    child.detach(&mut self.tree).push_back(row);
                }
                row
            }
        }
    }

    /// A fresh component of `kind` with a field id unused on this canvas.
    pub(super) fn build_component(
        &mut self,
        kind: ComponentKind,
        initial: Option<&InitialProperties>,
    ) -> Component {
        let field_id = self.next_field_id(kind);
        let mut component = Component::new(kind, field_id);
        if let Some(initial) = initial {
            component.apply(initial);
        }
        component
    }

    pub(super) fn next_field_id(&mut self, kind: ComponentKind) -> String {
        let prefix = kind.field_prefix();
        loop {
            self.next_field_serial += 1;
            let candidate = format!("{prefix}_{}", self.next_field_serial);
            if self.find_by_field_id(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl PartialEq for CanvasTree {
    fn eq(&self, other: &Self) -> bool {
        self.max_row_children == other.max_row_children && self.snapshot() == other.snapshot()
    }
}

impl fmt::Debug for CanvasTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasTree")
            .field("max_row_children", &self.max_row_children)
            .field("nodes", &self.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn field(kind: ComponentKind, id: &str) -> Component { Component::new(kind, id) }

    fn sample() -> CanvasTree {
        CanvasTree::from_nodes(
            [
                NodeSpec::Component(field(ComponentKind::Heading, "title")),
                NodeSpec::Row(vec![
                    field(ComponentKind::TextInput, "first"),
                    field(ComponentKind::TextInput, "last"),
                ]),
                NodeSpec::Component(field(ComponentKind::Email, "email")),
            ],
            4,
        )
        .unwrap()
    }

    #[test]
    fn template_builds_top_level_sequence() {
        let canvas = sample();
        let snapshot = canvas.snapshot();
        assert_eq!(3, snapshot.len());
        assert!(snapshot[1].is_row());
        assert_eq!(5, canvas.len());
        assert!(canvas.invariant_violations().is_empty());

        let first = canvas.find_by_field_id("first").unwrap();
        let row = canvas.parent_row(first).unwrap();
        assert_eq!(snapshot[1].id(), row);
        assert_eq!(Some(0), canvas.index_of(first));
        assert_eq!(Some(1), canvas.index_of(row));
        assert_eq!(Some(RowState::Stable), canvas.row_state(row));
        assert_eq!(None, canvas.row_state(first));
    }

    #[test]
    fn template_flattens_short_rows() {
        let canvas = CanvasTree::from_nodes(
            [
                NodeSpec::Row(vec![]),
                NodeSpec::Row(vec![field(ComponentKind::Date, "only")]),
            ],
            4,
        )
        .unwrap();
        let snapshot = canvas.snapshot();
        assert_eq!(1, snapshot.len());
        assert!(!snapshot[0].is_row());
        assert_eq!(0, canvas.rows().count());
        assert!(canvas.invariant_violations().is_empty());
    }

    #[test]
    fn template_rejects_wide_rows_and_meta_layouts() {
        let wide = NodeSpec::Row(
            (0..3).map(|i| field(ComponentKind::Checkbox, &format!("c{i}"))).collect(),
        );
        assert_eq!(
            Err(TemplateError::RowTooWide { index: 0, len: 3, max: 2 }),
            CanvasTree::from_nodes([wide], 2).map(|_| ())
        );
        let meta = NodeSpec::Component(field(ComponentKind::ColumnLayout, "col"));
        assert_eq!(
            Err(TemplateError::MetaLayout { index: 1, kind: ComponentKind::ColumnLayout }),
            CanvasTree::from_nodes([field(ComponentKind::Url, "u").into(), meta], 4).map(|_| ())
        );
    }

    #[test]
    fn capacity_below_two_is_raised() {
        assert_eq!(2, CanvasTree::new(0).max_row_children());
    }

    #[test]
    fn contains_ignores_root_and_unknown_ids() {
        let canvas = sample();
        assert!(!canvas.contains(canvas.root()));
        assert!(!canvas.contains(NodeId::default()));
        assert!(canvas.contains(canvas.find_by_field_id("email").unwrap()));
    }

    #[test]
    fn generated_field_ids_skip_taken_ones() {
        let mut canvas = CanvasTree::from_nodes(
            [NodeSpec::Component(field(ComponentKind::Email, "email_1"))],
            4,
        )
        .unwrap();
        assert_eq!("email_2", canvas.next_field_id(ComponentKind::Email));
        assert_eq!("text_area_3", canvas.next_field_id(ComponentKind::TextArea));
    }

    #[test]
    fn draw_tree_lists_fields() {
        let drawn = sample().draw_tree();
        assert!(drawn.contains("canvas"), "{drawn}");
        assert!(drawn.contains("row"), "{drawn}");
        assert!(drawn.contains("first [text-input]"), "{drawn}");
    }

    #[test]
    fn detects_broken_structure() {
        let mut canvas = sample();
        let email = canvas.find_by_field_id("email").unwrap();
        let title = canvas.find_by_field_id("title").unwrap();
        email.detach(&mut canvas.tree).push_back(title);
        let lonely = canvas.spawn_component(field(ComponentKind::Hidden, "lost"));

        let issues = canvas.invariant_violations();
        assert!(issues.contains(&InvariantViolation::ComponentWithChildren { node: title }));
        assert!(issues.contains(&InvariantViolation::Unreachable { node: lonely }));
    }

    #[test]
    fn equality_compares_content() {
        let a = sample();
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, CanvasTree::default());
    }
}

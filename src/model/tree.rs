//! Arena-backed ordered forest.
//!
//! Structure lives in [`NodeMap`] as parent/sibling links. Whatever a node
//! carries is stored beside it by the tree's [`Observer`], which hears about
//! every structural change. Cloning a [`Tree`] produces an independent
//! snapshot in which every node keeps its [`NodeId`].

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Identifies a node somewhere in the forest.
    pub struct NodeId;
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Tree<O> {
    pub map: NodeMap,
    pub data: O,
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self { Tree { map: NodeMap::default(), data } }

    /// Allocates a node with no parent. It stays a floating root until it is
    /// attached somewhere or removed.
    pub fn mk_node(&mut self) -> UnattachedNode<'_, O> {
        let id = self.map.map.insert(Links::default());
        UnattachedNode { id, tree: self }
    }
}

/// Parent/sibling structure of the forest.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NodeMap {
    map: SlotMap<NodeId, Links>,
}

impl NodeMap {
    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }
}

#[derive(Clone, Copy, Default, PartialEq, Debug, Serialize, Deserialize)]
struct Links {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

pub trait Observer
where Self: Sized {
    /// Called after `node` has been linked under a new parent.
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId);
    /// Called while `node` is still linked under the parent it is leaving.
    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId);
    /// Called once for every node of a subtree that is being deleted.
    fn removed_from_forest(&mut self, node: NodeId);
}

impl NodeId {
    pub fn detach<O: Observer>(self, tree: &mut Tree<O>) -> DetachedNode<'_, O> {
        DetachedNode { id: self, tree }
    }

    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.parent)
    }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.first_child)
    }

    pub fn last_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.last_child)
    }

    pub fn next_sibling(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.next_sibling)
    }

    pub fn children(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.first_child(map);
        std::iter::from_fn(move || {
            let id = cur?;
            cur = id.next_sibling(map);
            Some(id)
        })
    }

    pub fn child_count(self, map: &NodeMap) -> usize { self.children(map).count() }

    pub fn is_empty(self, map: &NodeMap) -> bool { self.first_child(map).is_none() }

    /// Position of this node among its siblings, or `None` for a root.
    pub fn index_in_parent(self, map: &NodeMap) -> Option<usize> {
        let parent = self.parent(map)?;
        parent.children(map).position(|c| c == self)
    }

    /// Iterates over this node and all of its ancestors, nearest first.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = map.contains(self).then_some(self);
        std::iter::from_fn(move || {
            let node = next?;
            next = node.parent(map);
            Some(node)
        })
    }

    /// Depth-first, parents before children, siblings in order.
    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = if map.contains(self) { vec![self] } else { vec![] };
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            let len = stack.len();
            stack.extend(node.children(map));
            stack[len..].reverse();
            Some(node)
        })
    }

    fn is_ancestor_of(self, other: NodeId, map: &NodeMap) -> bool {
        other.ancestors(map).any(|a| a == self)
    }
}

#[must_use = "unattached nodes should be attached or kept as a floating root with into_id"]
pub struct UnattachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> UnattachedNode<'a, O> {
    /// Leaves the node floating and returns its id.
    pub fn into_id(self) -> NodeId { self.id }

    pub fn push_back(self, parent: NodeId) -> NodeId { self.id.detach(self.tree).push_back(parent) }

    pub fn insert_before(self, sibling: NodeId) -> NodeId {
        self.id.detach(self.tree).insert_before(sibling)
    }

    pub fn insert_after(self, sibling: NodeId) -> NodeId {
        self.id.detach(self.tree).insert_after(sibling)
    }
}

/// A node that is about to be moved or deleted.
///
/// Reattaching a node to a different parent reports `removing_from_parent`
/// for the old parent and `added_to_parent` for the new one. Moving a node
/// within the same parent reports nothing.
#[must_use = "detached nodes should be reattached, unlinked or removed"]
pub struct DetachedNode<'a, O> {
    id: NodeId,
    tree: &'a mut Tree<O>,
}

impl<'a, O: Observer> DetachedNode<'a, O> {
    pub fn push_back(self, parent: NodeId) -> NodeId {
        if self.id.is_ancestor_of(parent, &self.tree.map) {
            return self.id;
        }
        self.attach_with(parent, |map, id| map.link_under_back(id, parent))
    }

    /// Links the node just before `sibling`. `sibling` must have a parent.
    #[track_caller]
    pub fn insert_before(self, sibling: NodeId) -> NodeId {
        let parent = sibling
            .parent(&self.tree.map)
            .expect("cannot make a sibling of a root node or invalid sibling");
        if self.id == sibling || self.id.is_ancestor_of(parent, &self.tree.map) {
            return self.id;
        }
        self.attach_with(parent, |map, id| map.link_before(id, sibling))
    }

    /// Links the node just after `sibling`. `sibling` must have a parent.
    #[track_caller]
    pub fn insert_after(self, sibling: NodeId) -> NodeId {
        let parent = sibling
            .parent(&self.tree.map)
            .expect("cannot make a sibling of a root node or invalid sibling");
        if self.id == sibling || self.id.is_ancestor_of(parent, &self.tree.map) {
            return self.id;
        }
        self.attach_with(parent, |map, id| map.link_after(id, sibling))
    }

    /// Unlinks the node from its parent but keeps it, and its subtree, in the
    /// forest as a floating root.
    pub fn unlink(self) -> NodeId {
        if self.id.parent(&self.tree.map).is_some() {
            self.tree.data.removing_from_parent(&self.tree.map, self.id);
            self.tree.map.unlink(self.id);
        }
        self.id
    }

    /// Unlinks the node and deletes its whole subtree.
    pub fn remove(self) {
        let DetachedNode { id, tree } = self;
        let id = id.detach(tree).unlink();
        let doomed: Vec<_> = id.traverse_preorder(&tree.map).collect();
        for node in doomed {
            tree.data.removed_from_forest(node);
            tree.map.map.remove(node);
        }
    }

    fn attach_with(self, new_parent: NodeId, link: impl FnOnce(&mut NodeMap, NodeId)) -> NodeId {
        let old_parent = self.id.parent(&self.tree.map);
        let moving = old_parent != Some(new_parent);
        if moving && old_parent.is_some() {
            self.tree.data.removing_from_parent(&self.tree.map, self.id);
        }
        self.tree.map.unlink(self.id);
        link(&mut self.tree.map, self.id);
        if moving {
            self.tree.data.added_to_parent(&self.tree.map, self.id);
        }
        self.id
    }
}

impl NodeMap {
    fn link_under_back(&mut self, node: NodeId, parent: NodeId) {
        debug_assert_eq!(self.map[node].parent, None);
        let prev = self.map[parent].last_child;
        self.map[node] = Links {
            parent: Some(parent),
            prev_sibling: prev,
            next_sibling: None,
            ..self.map[node]
        };
        match prev {
            Some(prev) => self.map[prev].next_sibling = Some(node),
            None => self.map[parent].first_child = Some(node),
        }
        self.map[parent].last_child = Some(node);
    }

    fn link_before(&mut self, node: NodeId, next: NodeId) {
        debug_assert_eq!(self.map[node].parent, None);
        let Some(parent) = self.map[next].parent else { return };
        let prev = self.map[next].prev_sibling;
        self.map[node] = Links {
            parent: Some(parent),
            prev_sibling: prev,
            next_sibling: Some(next),
            ..self.map[node]
        };
        self.map[next].prev_sibling = Some(node);
        match prev {
            Some(prev) => self.map[prev].next_sibling = Some(node),
            None => self.map[parent].first_child = Some(node),
        }
    }

    fn link_after(&mut self, node: NodeId, prev: NodeId) {
        debug_assert_eq!(self.map[node].parent, None);
        let Some(parent) = self.map[prev].parent else { return };
        let next = self.map[prev].next_sibling;
        self.map[node] = Links {
            parent: Some(parent),
            prev_sibling: Some(prev),
            next_sibling: next,
            ..self.map[node]
        };
        self.map[prev].next_sibling = Some(node);
        match next {
            Some(next) => self.map[next].prev_sibling = Some(node),
            None => self.map[parent].last_child = Some(node),
        }
    }

    fn unlink(&mut self, node: NodeId) {
        let Links { parent, prev_sibling, next_sibling, .. } = self.map[node];
        let Some(parent) = parent else { return };
        match prev_sibling {
            Some(prev) => self.map[prev].next_sibling = next_sibling,
            None => self.map[parent].first_child = next_sibling,
        }
        match next_sibling {
            Some(next) => self.map[next].prev_sibling = prev_sibling,
            None => self.map[parent].last_child = prev_sibling,
        }
        let links = &mut self.map[node];
        links.parent = None;
        links.prev_sibling = None;
        links.next_sibling = None;
    }
}

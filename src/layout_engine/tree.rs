use slotmap::SlotMap;

use crate::layout_engine::graph::{DirLink, Orientation, Side};
use crate::layout_engine::group::{Group, LeafGroup};
use crate::model::panel::PanelRef;
use crate::model::tab_group::TabGroup;
use crate::sys::geometry::{Rect, Size};
use crate::ui::drag_feedback::{Overlay, OverlayKind};
use crate::ui::surface::Renderable;

slotmap::new_key_type! {
    pub struct NodeId;
}

pub(crate) const SEPARATOR_Z: i32 = 2;

/// One element of the box layout.
///
/// `bounds` is the computed placement in controller-local coordinates;
/// `explicit` is the size the user or a restore asked for, consulted when the
/// node is the locked side of a split.
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) bounds: Rect,
    pub(crate) explicit: Size,
    pub(crate) kind: NodeKind,
}

pub enum NodeKind {
    Container(Container),
    Leaf(Group),
}

/// Binary split. Always has exactly two children.
pub struct Container {
    pub first: NodeId,
    pub second: NodeId,
    pub orientation: Orientation,
    pub gap: f64,
    pub separator_size: f64,
    pub separator: Overlay,
}

impl Container {
    pub fn other(&self, child: NodeId) -> NodeId {
        if self.first == child { self.second } else { self.first }
    }
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> { self.parent }

    pub fn bounds(&self) -> Rect { self.bounds }

    pub fn explicit_size(&self) -> Size { self.explicit }

    pub fn kind(&self) -> &NodeKind { &self.kind }

    pub fn container(&self) -> Option<&Container> {
        match &self.kind {
            NodeKind::Container(c) => Some(c),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn group(&self) -> Option<&Group> {
        match &self.kind {
            NodeKind::Leaf(g) => Some(g),
            NodeKind::Container(_) => None,
        }
    }

    pub(crate) fn group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            NodeKind::Leaf(g) => Some(g),
            NodeKind::Container(_) => None,
        }
    }
}

/// Slotmap arena holding every node a controller has created, attached or not.
/// Only nodes reachable from `root` are part of the layout.
#[derive(Default)]
pub struct LayoutTree {
    nodes: SlotMap<NodeId, Node>,
    root: Option<NodeId>,
}

impl LayoutTree {
    pub fn root(&self) -> Option<NodeId> { self.root }

    pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
        if let Some(node) = root.and_then(|r| self.nodes.get_mut(r)) {
            node.parent = None;
        }
    }

    pub fn contains(&self, id: NodeId) -> bool { self.nodes.contains_key(id) }

    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> { self.nodes.get_mut(id) }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub(crate) fn insert_leaf_with(&mut self, f: impl FnOnce(NodeId) -> Group) -> NodeId {
        self.nodes.insert_with_key(|id| Node {
            parent: None,
            bounds: Rect::ZERO,
            explicit: Size::ZERO,
            kind: NodeKind::Leaf(f(id)),
        })
    }

    pub(crate) fn insert_container(
        &mut self,
        first: NodeId,
        second: NodeId,
        orientation: Orientation,
        gap: f64,
        separator_size: f64,
    ) -> NodeId {
        let mut separator = Overlay::new(OverlayKind::Separator(orientation));
        separator.set_z_index(SEPARATOR_Z);
        let id = self.nodes.insert(Node {
            parent: None,
            bounds: Rect::ZERO,
            explicit: Size::ZERO,
            kind: NodeKind::Container(Container {
                first,
                second,
                orientation,
                gap,
                separator_size,
                separator,
            }),
        });
        for child in [first, second] {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = Some(id);
            }
        }
        id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> { self.nodes.get(id)?.parent }

    pub fn children(&self, id: NodeId) -> Option<(NodeId, NodeId)> {
        let c = self.nodes.get(id)?.container()?;
        Some((c.first, c.second))
    }

    pub fn container(&self, id: NodeId) -> Option<&Container> { self.nodes.get(id)?.container() }

    pub(crate) fn container_mut(&mut self, id: NodeId) -> Option<&mut Container> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Container(c) => Some(c),
            NodeKind::Leaf(_) => None,
        }
    }

    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        Some(self.container(parent)?.other(id))
    }

    pub fn bounds(&self, id: NodeId) -> Option<Rect> { self.nodes.get(id).map(|n| n.bounds) }

    pub fn group(&self, id: NodeId) -> Option<&Group> { self.nodes.get(id)?.group() }

    pub(crate) fn group_mut(&mut self, id: NodeId) -> Option<&mut Group> {
        self.nodes.get_mut(id)?.group_mut()
    }

    pub fn tab_group(&self, id: NodeId) -> Option<&TabGroup> { self.group(id)?.as_tabs() }

    pub(crate) fn tab_group_mut(&mut self, id: NodeId) -> Option<&mut TabGroup> {
        self.group_mut(id)?.as_tabs_mut()
    }

    /// Whether `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            match self.nodes.get(cur) {
                None => return false,
                Some(node) => match node.parent {
                    Some(p) => cur = p,
                    None => return Some(cur) == self.root,
                },
            }
        }
    }

    pub fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.parent(node) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            out.push(id);
            if let Some(c) = node.container() {
                stack.push(c.second);
                stack.push(c.first);
            }
        }
        out
    }

    /// Leaves under `from`, first child before second.
    pub fn leaves(&self, from: NodeId) -> Vec<NodeId> {
        self.preorder(from)
            .into_iter()
            .filter(|&id| self.group(id).is_some())
            .collect()
    }

    pub fn first_leaf(&self, mut from: NodeId) -> Option<NodeId> {
        loop {
            match self.nodes.get(from)?.container() {
                Some(c) => from = c.first,
                None => return Some(from),
            }
        }
    }

    /// Panels of every tab group under `from`. Document leaves are skipped; their
    /// nested layout owns those panels.
    pub fn tab_panels_under(&self, from: NodeId) -> Vec<PanelRef> {
        self.leaves(from)
            .into_iter()
            .filter_map(|id| self.tab_group(id))
            .flat_map(|g| g.panels().iter().cloned())
            .collect()
    }

    pub fn min_size(&self, id: NodeId) -> Size {
        let Some(node) = self.nodes.get(id) else {
            return Size::ZERO;
        };
        match &node.kind {
            NodeKind::Leaf(group) => group.min_size(),
            NodeKind::Container(c) => {
                let (a, b) = (self.min_size(c.first), self.min_size(c.second));
                match c.orientation {
                    Orientation::Horizontal => {
                        Size::new(a.width + b.width + c.gap, a.height.max(b.height))
                    }
                    Orientation::Vertical => {
                        Size::new(a.width.max(b.width), a.height + b.height + c.gap)
                    }
                }
            }
        }
    }

    pub fn priority(&self, id: NodeId) -> f64 {
        let Some(node) = self.nodes.get(id) else {
            return 0.0;
        };
        match &node.kind {
            NodeKind::Leaf(group) => group.priority(),
            NodeKind::Container(c) => self.priority(c.first).max(self.priority(c.second)),
        }
    }

    /// Splits a container's children into the side that keeps its explicit size
    /// and the side that absorbs the rest. The lower priority side is locked;
    /// on a tie the first child is.
    pub fn lock_and_stretch(&self, container: NodeId) -> Option<(NodeId, NodeId)> {
        let c = self.container(container)?;
        if self.priority(c.first) > self.priority(c.second) {
            Some((c.second, c.first))
        } else {
            Some((c.first, c.second))
        }
    }

    pub fn dir_link(&self, id: NodeId) -> DirLink {
        let mut link = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            let Some(c) = self.container(parent) else { break };
            link.push(Side::of_child(c.orientation, c.first == cur));
            cur = parent;
        }
        link.reverse();
        link
    }

    /// Follows a direction link from the root. An empty link, or one whose steps
    /// do not match the containers on the way, resolves to nothing.
    pub fn element_by_link(&self, link: &[Side]) -> Option<NodeId> {
        if link.is_empty() {
            return None;
        }
        let mut cur = self.root?;
        for &side in link {
            let c = self.container(cur)?;
            if c.orientation != side.orientation() {
                return None;
            }
            cur = if side.is_leading() { c.first } else { c.second };
        }
        Some(cur)
    }

    pub(crate) fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if let Some(c) = self.container_mut(parent) {
            if c.first == old {
                c.first = new;
            } else if c.second == old {
                c.second = new;
            }
        }
        if let Some(node) = self.nodes.get_mut(new) {
            node.parent = Some(parent);
        }
    }

    /// Sets computed and explicit size together.
    pub(crate) fn set_size(&mut self, id: NodeId, size: Size) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.bounds = node.bounds.with_size(size);
            node.explicit = size;
        }
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<Node> { self.nodes.remove(id) }

    /// Deletes `id` and everything under it from the arena. Panels still
    /// pointing at a removed tab group lose their owner.
    pub(crate) fn discard(&mut self, id: NodeId) {
        for node_id in self.preorder(id) {
            let Some(node) = self.nodes.remove(node_id) else { continue };
            if let NodeKind::Leaf(Group::Tabs(group)) = &node.kind {
                for panel in group.panels() {
                    if panel.owner().is_some_and(|o| o.node == node_id) {
                        panel.set_owner(None);
                    }
                }
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }
}

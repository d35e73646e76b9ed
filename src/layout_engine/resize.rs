//! Lock/stretch layout of the tree and interactive separator resizing.

use tracing::trace;

use crate::layout_engine::graph::Orientation;
use crate::layout_engine::group::LeafGroup;
use crate::layout_engine::tree::{LayoutTree, NodeId, NodeKind};
use crate::sys::geometry::{Matrix, Point, Rect};
use crate::ui::surface::Renderable;

/// Recomputes the placement of everything under `id` from `id`'s current
/// bounds, then pushes the result into the leaf groups.
///
/// Within a split, the locked child keeps its explicit size clamped to
/// `[its minimum, container - stretch minimum]`; the stretch child takes what
/// remains after the gap.
pub fn layout_subtree(tree: &mut LayoutTree, id: NodeId, frame: &Matrix) {
    let Some(node) = tree.node(id) else { return };
    let bounds = node.bounds();
    let (first, second, orientation, gap, separator_size) = match node.kind() {
        NodeKind::Leaf(_) => {
            if let Some(group) = tree.group_mut(id) {
                group.arrange(bounds, frame);
            }
            return;
        }
        NodeKind::Container(c) => (c.first, c.second, c.orientation, c.gap, c.separator_size),
    };
    let Some((lock, stretch)) = tree.lock_and_stretch(id) else { return };

    let extent = orientation.along_rect(bounds);
    let lock_min = orientation.along_size(tree.min_size(lock));
    let stretch_min = orientation.along_size(tree.min_size(stretch));
    let lock_explicit = tree.node(lock).map_or(0.0, |n| orientation.along_size(n.explicit_size()));

    let lock_size = lock_min.max((extent - stretch_min).min(lock_explicit));
    let stretch_size = (stretch_min - gap).max(extent - lock_size - gap);

    for (child, along) in [(lock, lock_size), (stretch, stretch_size)] {
        if let Some(node) = tree.node_mut(child) {
            node.bounds = node.bounds.with_size(orientation.with_along(bounds.size(), along));
        }
    }

    let first_along = tree.bounds(first).map_or(0.0, |r| orientation.along_rect(r));
    let second_offset = first_along + gap;
    let split = orientation.start(bounds) + first_along;
    let (second_origin, separator) = match orientation {
        Orientation::Horizontal => (
            Point::new(bounds.x + second_offset, bounds.y),
            Rect::new(split - separator_size / 2.0, bounds.y, separator_size, bounds.h),
        ),
        Orientation::Vertical => (
            Point::new(bounds.x, bounds.y + second_offset),
            Rect::new(bounds.x, split - separator_size / 2.0, bounds.w, separator_size),
        ),
    };
    if let Some(node) = tree.node_mut(first) {
        node.bounds = Rect::from_parts(bounds.origin(), node.bounds.size());
    }
    if let Some(node) = tree.node_mut(second) {
        node.bounds = Rect::from_parts(second_origin, node.bounds.size());
    }
    if let Some(c) = tree.container_mut(id) {
        c.separator.set_bounds(separator);
    }

    layout_subtree(tree, first, frame);
    layout_subtree(tree, second, frame);
}

/// An in-progress drag of a container's separator. The locked child is the one
/// being sized; its explicit size follows whatever the layout settles on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparatorDrag {
    container: NodeId,
    lock: NodeId,
    orientation: Orientation,
    lock_is_first: bool,
    start_pointer: Point,
    start_size: f64,
}

impl SeparatorDrag {
    pub fn begin(tree: &LayoutTree, container: NodeId, pointer: Point) -> Option<Self> {
        let c = tree.container(container)?;
        let (lock, _) = tree.lock_and_stretch(container)?;
        let start_size = c.orientation.along_rect(tree.bounds(lock)?);
        Some(Self {
            container,
            lock,
            orientation: c.orientation,
            lock_is_first: lock == c.first,
            start_pointer: pointer,
            start_size,
        })
    }

    pub fn container(&self) -> NodeId { self.container }

    pub fn orientation(&self) -> Orientation { self.orientation }

    pub fn update(&self, tree: &mut LayoutTree, pointer: Point, frame: &Matrix) {
        let delta = match self.orientation {
            Orientation::Horizontal => pointer.x - self.start_pointer.x,
            Orientation::Vertical => pointer.y - self.start_pointer.y,
        };
        let size = if self.lock_is_first {
            self.start_size + delta
        } else {
            self.start_size - delta
        };
        let Some(node) = tree.node(self.lock) else { return };
        let requested = self.orientation.with_along(node.bounds().size(), size);
        tree.set_size(self.lock, requested);
        layout_subtree(tree, self.container, frame);
        if let Some(node) = tree.node_mut(self.lock) {
            node.explicit = node.bounds.size();
            trace!(size = ?node.explicit, "separator resize");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::common::config::LayoutSettings;
    use crate::layout_engine::group::Group;
    use crate::model::panel::Panel;
    use crate::model::tab_group::TabGroup;
    use crate::sys::geometry::Size;
    use crate::ui::tab_bar::DefaultTitleRenderFactory;

    fn leaf(tree: &mut LayoutTree, id: &str, priority: f64) -> NodeId {
        let mut group =
            TabGroup::new(&LayoutSettings::default(), Rc::new(DefaultTitleRenderFactory));
        let panel = Panel::new(id, id);
        panel.set_priority(priority);
        group.add_panel(panel);
        tree.insert_leaf_with(|_| Group::Tabs(group))
    }

    fn split(first_priority: f64, second_priority: f64) -> (LayoutTree, NodeId, NodeId, NodeId) {
        let mut tree = LayoutTree::default();
        let a = leaf(&mut tree, "a", first_priority);
        let b = leaf(&mut tree, "b", second_priority);
        let root = tree.insert_container(a, b, Orientation::Horizontal, 1.0, 6.0);
        tree.set_root(Some(root));
        tree.set_size(root, Size::new(401.0, 300.0));
        tree.set_size(a, Size::new(100.0, 300.0));
        tree.set_size(b, Size::new(100.0, 300.0));
        (tree, root, a, b)
    }

    #[test]
    fn first_child_locks_on_a_tie() {
        let (mut tree, root, a, b) = split(0.0, 0.0);
        layout_subtree(&mut tree, root, &Matrix::IDENTITY);

        assert_eq!(tree.bounds(a), Some(Rect::new(0.0, 0.0, 100.0, 300.0)));
        assert_eq!(tree.bounds(b), Some(Rect::new(101.0, 0.0, 300.0, 300.0)));
        let separator = tree.container(root).unwrap().separator.frame();
        assert_eq!(separator, Rect::new(97.0, 0.0, 6.0, 300.0));
    }

    #[test]
    fn lower_priority_side_keeps_its_size() {
        let (mut tree, root, a, b) = split(1.0, 0.0);
        layout_subtree(&mut tree, root, &Matrix::IDENTITY);

        assert_eq!(tree.bounds(b).unwrap().w, 100.0);
        assert_eq!(tree.bounds(a).unwrap().w, 300.0);
        assert_eq!(tree.bounds(b).unwrap().x, 301.0);
    }

    #[test]
    fn locked_size_is_clamped_to_minimums() {
        let (mut tree, root, a, b) = split(0.0, 0.0);
        tree.set_size(a, Size::new(10.0, 300.0));
        layout_subtree(&mut tree, root, &Matrix::IDENTITY);
        assert_eq!(tree.bounds(a).unwrap().w, 50.0);

        tree.set_size(a, Size::new(390.0, 300.0));
        layout_subtree(&mut tree, root, &Matrix::IDENTITY);
        assert_eq!(tree.bounds(a).unwrap().w, 351.0);
        assert_eq!(tree.bounds(b).unwrap().w, 49.0);
    }

    #[test]
    fn separator_drag_moves_the_split_and_records_explicit_size() {
        let (mut tree, root, a, b) = split(0.0, 0.0);
        layout_subtree(&mut tree, root, &Matrix::IDENTITY);

        let drag = SeparatorDrag::begin(&tree, root, Point::new(100.0, 50.0)).unwrap();
        drag.update(&mut tree, Point::new(160.0, 80.0), &Matrix::IDENTITY);
        assert_eq!(tree.bounds(a).unwrap().w, 160.0);
        assert_eq!(tree.bounds(b).unwrap().w, 240.0);

        drag.update(&mut tree, Point::new(-500.0, 80.0), &Matrix::IDENTITY);
        assert_eq!(tree.bounds(a).unwrap().w, 50.0);
        assert_eq!(tree.node(a).unwrap().explicit_size().width, 50.0);
    }

    #[test]
    fn separator_drag_on_a_locked_second_child_inverts_the_delta() {
        let (mut tree, root, _a, b) = split(1.0, 0.0);
        layout_subtree(&mut tree, root, &Matrix::IDENTITY);

        let drag = SeparatorDrag::begin(&tree, root, Point::new(300.0, 50.0)).unwrap();
        drag.update(&mut tree, Point::new(250.0, 50.0), &Matrix::IDENTITY);
        assert_eq!(tree.bounds(b).unwrap().w, 150.0);
    }
}

//! Drag and dock: turning a pointer position over a leaf into a drop proposal.

use std::rc::Rc;

use bitflags::bitflags;

use crate::layout_engine::document::DocumentGroup;
use crate::layout_engine::graph::{Side, TabPlacement};
use crate::layout_engine::group::DropTarget;
use crate::layout_engine::tree::NodeId;
use crate::model::panel::PanelRef;
use crate::model::tab_group::TabGroup;
use crate::sys::geometry::{Point, Rect};
use crate::ui::drag_feedback::FeedbackKind;

/// The panel being dragged and the element it came from.
#[derive(Debug, Clone)]
pub struct DragSource {
    pub element: NodeId,
    pub panel: PanelRef,
}

#[derive(Debug, Clone)]
pub enum DropProposal {
    /// Move the panel into the target's tab group.
    Merge { target: NodeId },
    /// Dock a new element holding the panel on one side of the target.
    Split { target: NodeId, side: Side },
    /// Place the panel next to an existing tab.
    InsertTab {
        target: NodeId,
        anchor: PanelRef,
        placement: TabPlacement,
    },
}

impl DropProposal {
    pub fn target(&self) -> NodeId {
        match self {
            DropProposal::Merge { target }
            | DropProposal::Split { target, .. }
            | DropProposal::InsertTab { target, .. } => *target,
        }
    }

    pub fn feedback(&self) -> FeedbackKind {
        match self {
            DropProposal::Merge { .. } => FeedbackKind::Outline { fill: true },
            DropProposal::Split { side, .. } => FeedbackKind::Edge(*side),
            DropProposal::InsertTab { .. } => FeedbackKind::Outline { fill: false },
        }
    }
}

/// Carries a drag from start to drop. `range` is the ghost rectangle for the
/// current proposal.
#[derive(Debug, Clone)]
pub struct DragInfo {
    pub source: DragSource,
    pub range: Rect,
    pub proposal: Option<DropProposal>,
}

impl DragInfo {
    pub fn new(source: DragSource) -> Self { Self { source, range: Rect::ZERO, proposal: None } }
}

/// How a finished drag ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    Resolved { panel: String },
    Cancelled { panel: String },
}

bitflags! {
    /// Margin bands of a drop target the pointer is inside.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Edges: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const TOP = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Center,
    Edge(Side),
}

impl DropZone {
    pub fn ghost(self, bounds: Rect) -> Rect {
        match self {
            DropZone::Center => bounds,
            DropZone::Edge(side) => side.half_of(bounds),
        }
    }
}

/// Classifies `pointer` against the one-third margins of `bounds`.
///
/// In a corner where two bands overlap, the nearer edge wins and an exact tie
/// goes to top or bottom. Outside every band the pointer is in the center;
/// when the target cannot take a merge the nearest edge is used instead.
pub fn resolve_drop_zone(bounds: Rect, pointer: Point, allow_center: bool) -> DropZone {
    let (w, h) = (bounds.w, bounds.h);
    let px = pointer.x - bounds.x;
    let py = pointer.y - bounds.y;
    let (mx, my) = (w / 3.0, h / 3.0);

    let mut edges = Edges::empty();
    edges.set(Edges::LEFT, px < mx);
    edges.set(Edges::RIGHT, px > w - mx);
    edges.set(Edges::TOP, py < my);
    edges.set(Edges::BOTTOM, py > h - my);

    let pick = |horizontal: Side, dx: f64, vertical: Side, dy: f64| {
        if dx < dy { DropZone::Edge(horizontal) } else { DropZone::Edge(vertical) }
    };

    if edges.contains(Edges::LEFT | Edges::TOP) {
        pick(Side::Left, px, Side::Top, py)
    } else if edges.contains(Edges::LEFT | Edges::BOTTOM) {
        pick(Side::Left, px, Side::Bottom, h - py)
    } else if edges.contains(Edges::RIGHT | Edges::TOP) {
        pick(Side::Right, w - px, Side::Top, py)
    } else if edges.contains(Edges::RIGHT | Edges::BOTTOM) {
        pick(Side::Right, w - px, Side::Bottom, h - py)
    } else if edges.contains(Edges::LEFT) {
        DropZone::Edge(Side::Left)
    } else if edges.contains(Edges::RIGHT) {
        DropZone::Edge(Side::Right)
    } else if edges.contains(Edges::TOP) {
        DropZone::Edge(Side::Top)
    } else if edges.contains(Edges::BOTTOM) {
        DropZone::Edge(Side::Bottom)
    } else if allow_center {
        DropZone::Center
    } else {
        let candidates = [
            (px, Side::Left),
            (w - px, Side::Right),
            (py, Side::Top),
            (h - py, Side::Bottom),
        ];
        let nearest = candidates
            .into_iter()
            .fold((f64::INFINITY, Side::Left), |best, c| if c.0 < best.0 { c } else { best });
        DropZone::Edge(nearest.1)
    }
}

impl TabGroup {
    /// Drops over the tab strip insert next to a tab rather than docking.
    fn adjust_tab_strip(&self, target: NodeId, pointer: Point, info: &mut DragInfo) -> bool {
        let bar = self.tab_bar();
        if bar.is_empty() || !bar.bounds().contains(pointer) {
            return false;
        }
        let hit = bar.item_at(pointer);
        let last = bar.len() - 1;

        let (index, placement, range) = if info.source.element == target {
            let index = hit.unwrap_or(last);
            let source_index = self.index_of(&info.source.panel).unwrap_or(0);
            let placement =
                if index <= source_index { TabPlacement::Before } else { TabPlacement::After };
            (index, placement, bar.item_bounds(index))
        } else if let Some(index) = hit {
            (index, TabPlacement::Before, bar.item_bounds(index))
        } else {
            let range = bar
                .item_bounds(last)
                .map(|r| Rect::new(r.max_x(), r.y, r.h, r.h));
            (last, TabPlacement::After, range)
        };

        let (Some(anchor), Some(range)) = (self.panels().get(index), range) else {
            return false;
        };
        info.range = range;
        info.proposal = Some(DropProposal::InsertTab {
            target,
            anchor: Rc::clone(anchor),
            placement,
        });
        true
    }
}

impl DropTarget for TabGroup {
    fn adjust_drag_info(&self, pointer: Point, info: &mut DragInfo) -> bool {
        let Some(target) = self.location().map(|l| l.node) else {
            return false;
        };
        if self.adjust_tab_strip(target, pointer, info) {
            return true;
        }
        let bounds = self.bounds();
        let zone = resolve_drop_zone(bounds, pointer, true);
        info.range = zone.ghost(bounds);
        info.proposal = Some(match zone {
            DropZone::Center => DropProposal::Merge { target },
            DropZone::Edge(side) => DropProposal::Split { target, side },
        });
        true
    }
}

impl DropTarget for DocumentGroup {
    fn adjust_drag_info(&self, pointer: Point, info: &mut DragInfo) -> bool {
        let Some(target) = self.location().map(|l| l.node) else {
            return false;
        };
        let bounds = self.bounds();
        let zone = resolve_drop_zone(bounds, pointer, false);
        info.range = zone.ghost(bounds);
        if let DropZone::Edge(side) = zone {
            info.proposal = Some(DropProposal::Split { target, side });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    const BOX: Rect = Rect { x: 100.0, y: 100.0, w: 300.0, h: 300.0 };

    fn zone(x: f64, y: f64) -> DropZone { resolve_drop_zone(BOX, Point::new(100.0 + x, 100.0 + y), true) }

    #[test]
    fn single_bands() {
        assert_eq!(zone(10.0, 150.0), DropZone::Edge(Side::Left));
        assert_eq!(zone(290.0, 150.0), DropZone::Edge(Side::Right));
        assert_eq!(zone(150.0, 10.0), DropZone::Edge(Side::Top));
        assert_eq!(zone(150.0, 290.0), DropZone::Edge(Side::Bottom));
        assert_eq!(zone(150.0, 150.0), DropZone::Center);
    }

    #[test]
    fn corners_pick_the_nearer_edge() {
        assert_eq!(zone(10.0, 50.0), DropZone::Edge(Side::Left));
        assert_eq!(zone(50.0, 10.0), DropZone::Edge(Side::Top));
        assert_eq!(zone(10.0, 250.0), DropZone::Edge(Side::Left));
        assert_eq!(zone(50.0, 290.0), DropZone::Edge(Side::Bottom));
        assert_eq!(zone(290.0, 50.0), DropZone::Edge(Side::Right));
        assert_eq!(zone(250.0, 10.0), DropZone::Edge(Side::Top));
        assert_eq!(zone(290.0, 250.0), DropZone::Edge(Side::Right));
        assert_eq!(zone(250.0, 290.0), DropZone::Edge(Side::Bottom));
    }

    #[test]
    fn exact_diagonal_goes_vertical() {
        assert_eq!(zone(20.0, 20.0), DropZone::Edge(Side::Top));
        assert_eq!(zone(20.0, 280.0), DropZone::Edge(Side::Bottom));
        assert_eq!(zone(280.0, 20.0), DropZone::Edge(Side::Top));
        assert_eq!(zone(280.0, 280.0), DropZone::Edge(Side::Bottom));
    }

    #[test]
    fn center_falls_back_to_nearest_edge_without_merge() {
        let at = |x: f64, y: f64| resolve_drop_zone(BOX, Point::new(100.0 + x, 100.0 + y), false);
        assert_eq!(at(110.0, 150.0), DropZone::Edge(Side::Left));
        assert_eq!(at(150.0, 190.0), DropZone::Edge(Side::Bottom));
        assert_eq!(at(150.0, 110.0), DropZone::Edge(Side::Top));
    }

    #[test]
    fn ghosts() {
        assert_eq!(DropZone::Center.ghost(BOX), BOX);
        assert_eq!(DropZone::Edge(Side::Right).ghost(BOX), Rect::new(250.0, 100.0, 150.0, 300.0));
        assert_eq!(DropZone::Edge(Side::Top).ghost(BOX), Rect::new(100.0, 100.0, 300.0, 150.0));
    }
}

use enum_dispatch::enum_dispatch;

use crate::layout_engine::document::DocumentGroup;
use crate::layout_engine::drag::DragInfo;
use crate::model::panel::{GroupLocation, PanelRef};
use crate::model::tab_group::TabGroup;
use crate::sys::geometry::{Matrix, Point, Rect, Size};
use crate::ui::surface::HostSurface;

/// What the tree needs from the content of a leaf.
#[enum_dispatch]
pub trait LeafGroup {
    fn min_size(&self) -> Size;
    fn priority(&self) -> f64;
    /// Every panel the leaf shows, including those of nested layouts.
    fn open_panels(&self) -> Vec<PanelRef>;
    /// Returns true if the selection was recommitted and should be focused.
    fn attach(&mut self, host: &HostSurface) -> bool;
    fn detach(&mut self);
    /// `frame` maps this controller's local space to the host's global space.
    fn arrange(&mut self, bounds: Rect, frame: &Matrix);
    fn set_maximized(&mut self, maximized: bool);
    fn set_hold(&self, hold: bool);
}

/// A leaf that can take part in drag and dock.
#[enum_dispatch]
pub trait DropTarget {
    /// Fills in the drop proposal and ghost for a pointer over this leaf.
    /// Returns whether the leaf accepts the drag at all.
    fn adjust_drag_info(&self, pointer: Point, info: &mut DragInfo) -> bool;
}

#[enum_dispatch(LeafGroup, DropTarget)]
pub enum Group {
    Tabs(TabGroup),
    Document(DocumentGroup),
}

impl Group {
    pub fn as_tabs(&self) -> Option<&TabGroup> {
        match self {
            Group::Tabs(g) => Some(g),
            Group::Document(_) => None,
        }
    }

    pub fn as_tabs_mut(&mut self) -> Option<&mut TabGroup> {
        match self {
            Group::Tabs(g) => Some(g),
            Group::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentGroup> {
        match self {
            Group::Document(d) => Some(d),
            Group::Tabs(_) => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut DocumentGroup> {
        match self {
            Group::Document(d) => Some(d),
            Group::Tabs(_) => None,
        }
    }

    pub fn is_document(&self) -> bool { matches!(self, Group::Document(_)) }

    pub(crate) fn bind(&mut self, location: GroupLocation) {
        match self {
            Group::Tabs(g) => g.bind(location),
            Group::Document(d) => d.bind(location),
        }
    }
}

impl LeafGroup for TabGroup {
    fn min_size(&self) -> Size { TabGroup::min_size(self) }

    fn priority(&self) -> f64 { TabGroup::priority(self) }

    fn open_panels(&self) -> Vec<PanelRef> { self.panels().to_vec() }

    fn attach(&mut self, host: &HostSurface) -> bool { TabGroup::attach(self, host) }

    fn detach(&mut self) { TabGroup::detach(self) }

    fn arrange(&mut self, bounds: Rect, _frame: &Matrix) { self.set_bounds(bounds) }

    fn set_maximized(&mut self, maximized: bool) { TabGroup::set_maximized(self, maximized) }

    fn set_hold(&self, hold: bool) { TabGroup::set_hold(self, hold) }
}

use crate::layout_engine::engine::BoxLayout;
use crate::layout_engine::group::LeafGroup;
use crate::model::panel::{GroupLocation, PanelRef};
use crate::sys::geometry::{Matrix, Rect, Size};
use crate::ui::surface::HostSurface;

const DOCUMENT_Z: (i32, i32) = (0, 3);

/// Leaf content that hosts a whole nested box layout. It never merges with a
/// dragged panel and always stretches against its siblings.
pub struct DocumentGroup {
    layout: Box<BoxLayout>,
    bounds: Rect,
    host: Option<HostSurface>,
    z_index: i32,
    location: Option<GroupLocation>,
}

impl DocumentGroup {
    pub fn new(layout: BoxLayout) -> Self {
        Self {
            layout: Box::new(layout),
            bounds: Rect::ZERO,
            host: None,
            z_index: DOCUMENT_Z.0,
            location: None,
        }
    }

    pub fn layout(&self) -> &BoxLayout { &self.layout }

    pub fn layout_mut(&mut self) -> &mut BoxLayout { &mut self.layout }

    pub fn bounds(&self) -> Rect { self.bounds }

    pub fn z_index(&self) -> i32 { self.z_index }

    pub fn is_attached(&self) -> bool { self.host.is_some() }

    pub fn location(&self) -> Option<GroupLocation> { self.location }

    pub(crate) fn bind(&mut self, location: GroupLocation) { self.location = Some(location); }
}

impl LeafGroup for DocumentGroup {
    fn min_size(&self) -> Size {
        self.layout
            .every_open_panel()
            .iter()
            .fold(Size::ZERO, |acc, p| acc.max(p.min_size()))
    }

    fn priority(&self) -> f64 { f64::INFINITY }

    fn open_panels(&self) -> Vec<PanelRef> { self.layout.every_open_panel() }

    fn attach(&mut self, host: &HostSurface) -> bool {
        self.host = Some(*host);
        self.layout.attach_all();
        false
    }

    /// Takes the nested tree off screen too, even if this document was never
    /// attached itself.
    fn detach(&mut self) {
        self.host = None;
        self.layout.detach_all();
    }

    fn arrange(&mut self, bounds: Rect, frame: &Matrix) {
        self.bounds = bounds;
        let nested = Matrix::translation(bounds.x, bounds.y).concat(frame);
        self.layout.set_area(bounds.size(), nested);
    }

    fn set_maximized(&mut self, maximized: bool) {
        self.z_index = if maximized { DOCUMENT_Z.1 } else { DOCUMENT_Z.0 };
    }

    fn set_hold(&self, hold: bool) {
        for panel in self.layout.every_open_panel() {
            panel.set_hold(hold);
        }
    }
}

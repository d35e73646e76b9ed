use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::common::config::PanelDefaults;
use crate::layout_engine::NodeId;
use crate::model::focus::LayoutKey;
use crate::sys::geometry::{Rect, Size};
use crate::ui::surface::{HostSurface, NullSurface, PanelSurface};

pub type PanelRef = Rc<Panel>;

pub const PLACEHOLDER_ID: &str = "PlaceholderPanel";

/// Where a panel currently lives: the controller and the tab group leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupLocation {
    pub layout: LayoutKey,
    pub node: NodeId,
}

/// A unit of content. Panels are shared between the registry and at most one
/// tab group, so state lives behind `Cell`s and the handle is an `Rc`.
pub struct Panel {
    id: String,
    title: RefCell<String>,
    icon: RefCell<String>,
    min_size: Cell<Size>,
    priority: Cell<f64>,
    hold: Cell<bool>,
    visible: Cell<bool>,
    focused: Cell<bool>,
    attached: Cell<bool>,
    content_rendered: Cell<bool>,
    placeholder: bool,
    bounds: Cell<Option<Rect>>,
    z_index: Cell<i32>,
    owner: Cell<Option<GroupLocation>>,
    surface: RefCell<Box<dyn PanelSurface>>,
}

impl Panel {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> PanelRef {
        Self::with_surface(id, title, Box::new(NullSurface))
    }

    pub fn with_surface(
        id: impl Into<String>,
        title: impl Into<String>,
        surface: Box<dyn PanelSurface>,
    ) -> PanelRef {
        Self::build(id.into(), title.into(), surface, &PanelDefaults::default(), false)
    }

    pub fn from_defaults(
        id: impl Into<String>,
        title: impl Into<String>,
        defaults: &PanelDefaults,
    ) -> PanelRef {
        Self::build(id.into(), title.into(), Box::new(NullSurface), defaults, false)
    }

    /// Stand-in for an id that could not be resolved while restoring a layout.
    pub fn placeholder() -> PanelRef {
        Self::build(
            PLACEHOLDER_ID.to_string(),
            PLACEHOLDER_ID.to_string(),
            Box::new(NullSurface),
            &PanelDefaults::default(),
            true,
        )
    }

    fn build(
        id: String,
        title: String,
        surface: Box<dyn PanelSurface>,
        defaults: &PanelDefaults,
        placeholder: bool,
    ) -> PanelRef {
        Rc::new(Panel {
            id,
            title: RefCell::new(title),
            icon: RefCell::new(String::new()),
            min_size: Cell::new(Size::new(defaults.min_width, defaults.min_height)),
            priority: Cell::new(0.0),
            hold: Cell::new(false),
            visible: Cell::new(false),
            focused: Cell::new(false),
            attached: Cell::new(false),
            content_rendered: Cell::new(false),
            placeholder,
            bounds: Cell::new(None),
            z_index: Cell::new(0),
            owner: Cell::new(None),
            surface: RefCell::new(surface),
        })
    }

    pub fn id(&self) -> &str { &self.id }

    pub fn title(&self) -> String { self.title.borrow().clone() }

    pub fn set_title(&self, title: impl Into<String>) { *self.title.borrow_mut() = title.into(); }

    pub fn icon(&self) -> String { self.icon.borrow().clone() }

    pub fn set_icon(&self, icon: impl Into<String>) { *self.icon.borrow_mut() = icon.into(); }

    pub fn min_size(&self) -> Size { self.min_size.get() }

    pub fn set_min_size(&self, size: Size) { self.min_size.set(size); }

    /// When a split is resized the lower priority side keeps its explicit size
    /// and the higher priority side absorbs the rest.
    pub fn priority(&self) -> f64 { self.priority.get() }

    pub fn set_priority(&self, priority: f64) { self.priority.set(priority); }

    pub fn is_placeholder(&self) -> bool { self.placeholder }

    /// While held, attach and detach calls are swallowed so a panel can move
    /// between groups without its surface being torn down.
    pub fn hold(&self) -> bool { self.hold.get() }

    pub fn set_hold(&self, hold: bool) { self.hold.set(hold); }

    pub fn is_visible(&self) -> bool { self.visible.get() }

    pub fn is_focused(&self) -> bool { self.focused.get() }

    pub fn is_attached(&self) -> bool { self.attached.get() }

    pub fn bounds(&self) -> Option<Rect> { self.bounds.get() }

    pub fn z_index(&self) -> i32 { self.z_index.get() }

    pub fn owner(&self) -> Option<GroupLocation> { self.owner.get() }

    pub fn owner_layout(&self) -> Option<LayoutKey> { self.owner.get().map(|o| o.layout) }

    pub(crate) fn set_owner(&self, owner: Option<GroupLocation>) { self.owner.set(owner); }

    pub(crate) fn render(&self, host: &HostSurface) {
        if self.hold.get() {
            return;
        }
        self.attached.set(true);
        let mut surface = self.surface.borrow_mut();
        surface.render(host);
        if !self.content_rendered.replace(true) {
            surface.render_content();
        }
    }

    pub(crate) fn remove_from_parent(&self) {
        if self.hold.get() {
            return;
        }
        self.attached.set(false);
        self.surface.borrow_mut().remove_from_parent();
    }

    pub(crate) fn set_bounds(&self, bounds: Rect) {
        let previous = self.bounds.replace(Some(bounds));
        let mut surface = self.surface.borrow_mut();
        surface.set_bounds(bounds);
        if previous.map(|r| r.size()) != Some(bounds.size()) {
            surface.resize(bounds.size());
        }
    }

    pub(crate) fn set_visible(&self, visible: bool) {
        if self.visible.replace(visible) != visible {
            self.surface.borrow_mut().set_visible(visible);
        }
    }

    pub(crate) fn set_z_index(&self, z: i32) {
        if self.z_index.replace(z) != z {
            self.surface.borrow_mut().set_z_index(z);
        }
    }

    pub(crate) fn focus_in(&self) {
        self.focused.set(true);
        self.surface.borrow_mut().focus_in();
    }

    pub(crate) fn focus_out(&self) {
        self.focused.set(false);
        self.surface.borrow_mut().focus_out();
    }

    pub(crate) fn clear_focus(&self) { self.focused.set(false); }
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("id", &self.id)
            .field("owner", &self.owner.get())
            .field("hold", &self.hold.get())
            .finish()
    }
}

//! The narrow surface contract the engine needs from anything it places on
//! screen. Hosts implement these for their own widgets; the engine only ever
//! attaches, detaches, positions and restacks.

use crate::model::focus::LayoutKey;
use crate::sys::geometry::{Rect, Size};

/// The drawing area a controller owns. Nested document layouts get their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostSurface {
    pub layout: LayoutKey,
}

impl HostSurface {
    pub fn new(layout: LayoutKey) -> Self { Self { layout } }
}

pub trait Renderable {
    fn render(&mut self, host: &HostSurface);
    fn remove_from_parent(&mut self);
    fn set_bounds(&mut self, bounds: Rect);
    fn set_z_index(&mut self, _z: i32) {}
}

/// Content side of a panel.
pub trait PanelSurface: Renderable {
    /// Called once, the first time the panel is attached.
    fn render_content(&mut self) {}
    /// Called only when the panel's size actually changes.
    fn resize(&mut self, _size: Size) {}
    fn set_visible(&mut self, _visible: bool) {}
    fn focus_in(&mut self) {}
    fn focus_out(&mut self) {}
}

/// Surface for panels that have nothing to draw (placeholders, headless use).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Renderable for NullSurface {
    fn render(&mut self, _host: &HostSurface) {}

    fn remove_from_parent(&mut self) {}

    fn set_bounds(&mut self, _bounds: Rect) {}
}

impl PanelSurface for NullSurface {}

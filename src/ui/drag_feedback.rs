use crate::layout_engine::{Orientation, Side};
use crate::sys::geometry::Rect;
use crate::ui::surface::{HostSurface, Renderable};

/// How a drop ghost should be painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Whole target, or a single tab slot.
    Outline { fill: bool },
    /// Half of the target on the given side.
    Edge(Side),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Resize handle centred on a split line.
    Separator(Orientation),
    /// Preview of where a dragged panel will land.
    DragGhost,
    /// Input shield covering the whole layout while a drag is in progress.
    Mask,
}

/// A chrome rectangle the engine owns: separators, the drop ghost and the drag
/// mask. Hosts read these back through the controller and paint them.
#[derive(Debug, Clone)]
pub struct Overlay {
    kind: OverlayKind,
    frame: Rect,
    host: Option<HostSurface>,
    z_index: i32,
    feedback: Option<FeedbackKind>,
}

impl Overlay {
    pub fn new(kind: OverlayKind) -> Self {
        Self {
            kind,
            frame: Rect::ZERO,
            host: None,
            z_index: 0,
            feedback: None,
        }
    }

    pub fn kind(&self) -> OverlayKind { self.kind }

    pub fn frame(&self) -> Rect { self.frame }

    pub fn z_index(&self) -> i32 { self.z_index }

    pub fn feedback(&self) -> Option<FeedbackKind> { self.feedback }

    pub fn is_visible(&self) -> bool { self.host.is_some() }

    pub fn show(&mut self, host: &HostSurface, frame: Rect, feedback: Option<FeedbackKind>) {
        self.frame = frame;
        self.feedback = feedback;
        if self.host.is_none() {
            self.render(host);
        }
    }

    pub fn hide(&mut self) {
        if self.host.is_some() {
            self.remove_from_parent();
        }
    }
}

impl Renderable for Overlay {
    fn render(&mut self, host: &HostSurface) { self.host = Some(*host); }

    fn remove_from_parent(&mut self) { self.host = None; }

    fn set_bounds(&mut self, bounds: Rect) { self.frame = bounds; }

    fn set_z_index(&mut self, z: i32) { self.z_index = z; }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::SlotMap;
    use test_log::test;

    use super::*;
    use crate::model::focus::LayoutKey;

    #[test]
    fn show_and_hide_toggle_visibility() {
        let mut keys: SlotMap<LayoutKey, ()> = SlotMap::with_key();
        let host = HostSurface::new(keys.insert(()));

        let mut ghost = Overlay::new(OverlayKind::DragGhost);
        assert!(!ghost.is_visible());

        let frame = Rect::new(10.0, 10.0, 50.0, 100.0);
        ghost.show(&host, frame, Some(FeedbackKind::Edge(Side::Left)));
        assert!(ghost.is_visible());
        assert_eq!(ghost.frame(), frame);
        assert_eq!(ghost.feedback(), Some(FeedbackKind::Edge(Side::Left)));

        ghost.show(&host, Rect::new(0.0, 0.0, 1.0, 1.0), None);
        assert_eq!(ghost.frame(), Rect::new(0.0, 0.0, 1.0, 1.0));

        ghost.hide();
        assert!(!ghost.is_visible());
    }
}

use std::rc::Rc;

use crate::model::panel::PanelRef;
use crate::sys::geometry::{Point, Rect};
use crate::ui::surface::{HostSurface, Renderable};

/// Draws one tab of a tab bar.
pub trait TitleRender: Renderable {
    fn set_panel(&mut self, panel: PanelRef);
    fn set_selected(&mut self, selected: bool);
    /// Repaint after the panel's title or icon changed.
    fn refresh(&mut self) {}
}

pub trait TitleRenderFactory {
    fn create_title_render(&self) -> Box<dyn TitleRender>;
}

/// Plain text tab. Reads the title lazily so renames show up on the next paint.
#[derive(Default)]
pub struct DefaultTitleRender {
    panel: Option<PanelRef>,
    selected: bool,
    bounds: Rect,
    host: Option<HostSurface>,
}

impl DefaultTitleRender {
    pub fn label(&self) -> String {
        self.panel.as_ref().map(|p| p.title()).unwrap_or_default()
    }

    pub fn is_selected(&self) -> bool { self.selected }

    pub fn bounds(&self) -> Rect { self.bounds }

    pub fn is_attached(&self) -> bool { self.host.is_some() }
}

impl Renderable for DefaultTitleRender {
    fn render(&mut self, host: &HostSurface) { self.host = Some(*host); }

    fn remove_from_parent(&mut self) { self.host = None; }

    fn set_bounds(&mut self, bounds: Rect) { self.bounds = bounds; }
}

impl TitleRender for DefaultTitleRender {
    fn set_panel(&mut self, panel: PanelRef) { self.panel = Some(panel); }

    fn set_selected(&mut self, selected: bool) { self.selected = selected; }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTitleRenderFactory;

impl TitleRenderFactory for DefaultTitleRenderFactory {
    fn create_title_render(&self) -> Box<dyn TitleRender> { Box::new(DefaultTitleRender::default()) }
}

/// Strip of tab items above a tab group, with an optional menu button at the
/// right end. Items are laid out left to right at
/// `min(bar_width / count, item_max_width)` each.
pub struct TabBar {
    factory: Rc<dyn TitleRenderFactory>,
    items: Vec<Box<dyn TitleRender>>,
    panels: Vec<PanelRef>,
    selected: Option<usize>,
    bounds: Rect,
    item_max_width: f64,
    show_menu: bool,
    host: Option<HostSurface>,
    z_index: i32,
}

impl TabBar {
    pub fn new(factory: Rc<dyn TitleRenderFactory>, item_max_width: f64, show_menu: bool) -> Self {
        Self {
            factory,
            items: Vec::new(),
            panels: Vec::new(),
            selected: None,
            bounds: Rect::ZERO,
            item_max_width,
            show_menu,
            host: None,
            z_index: 0,
        }
    }

    pub fn bounds(&self) -> Rect { self.bounds }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn show_menu(&self) -> bool { self.show_menu }

    pub fn set_show_menu(&mut self, show: bool) { self.show_menu = show; }

    pub fn z_index(&self) -> i32 { self.z_index }

    pub fn set_factory(&mut self, factory: Rc<dyn TitleRenderFactory>) {
        self.factory = factory;
        let panels = std::mem::take(&mut self.panels);
        self.set_panels(&panels);
    }

    /// Rebuilds every item for the given panels.
    pub fn set_panels(&mut self, panels: &[PanelRef]) {
        for item in &mut self.items {
            item.remove_from_parent();
        }
        self.items = panels
            .iter()
            .map(|panel| {
                let mut item = self.factory.create_title_render();
                item.set_panel(panel.clone());
                item
            })
            .collect();
        self.panels = panels.to_vec();
        if let Some(host) = self.host {
            for item in &mut self.items {
                item.render(&host);
            }
        }
        self.update_items();
    }

    pub fn refresh(&mut self) {
        for item in &mut self.items {
            item.refresh();
        }
    }

    pub fn set_selected(&mut self, selected: Option<usize>) {
        self.selected = selected;
        for (i, item) in self.items.iter_mut().enumerate() {
            item.set_selected(Some(i) == selected);
        }
    }

    pub fn item_width(&self) -> f64 {
        if self.items.is_empty() {
            return 0.0;
        }
        (self.bounds.w / self.items.len() as f64).min(self.item_max_width)
    }

    pub fn item_bounds(&self, index: usize) -> Option<Rect> {
        if index >= self.items.len() {
            return None;
        }
        let w = self.item_width();
        Some(Rect::new(self.bounds.x + index as f64 * w, self.bounds.y, w, self.bounds.h))
    }

    pub fn item_at(&self, point: Point) -> Option<usize> {
        (0..self.items.len()).find(|&i| self.item_bounds(i).is_some_and(|r| r.contains(point)))
    }

    /// Square button at the right end of the bar, present only when the menu is on.
    pub fn menu_button_bounds(&self) -> Option<Rect> {
        if !self.show_menu {
            return None;
        }
        let side = self.bounds.h;
        Some(Rect::new(self.bounds.max_x() - side, self.bounds.y, side, side))
    }

    fn update_items(&mut self) {
        let w = self.item_width();
        let Rect { x, y, h, .. } = self.bounds;
        for (i, item) in self.items.iter_mut().enumerate() {
            item.set_bounds(Rect::new(x + i as f64 * w, y, w, h));
            item.set_selected(Some(i) == self.selected);
        }
    }
}

impl Renderable for TabBar {
    fn render(&mut self, host: &HostSurface) {
        self.host = Some(*host);
        for item in &mut self.items {
            item.render(host);
        }
    }

    fn remove_from_parent(&mut self) {
        self.host = None;
        for item in &mut self.items {
            item.remove_from_parent();
        }
    }

    fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.update_items();
    }

    fn set_z_index(&mut self, z: i32) { self.z_index = z; }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::model::panel::Panel;

    fn bar_with(n: usize, width: f64) -> TabBar {
        let mut bar = TabBar::new(Rc::new(DefaultTitleRenderFactory), 100.0, true);
        let panels: Vec<_> = (0..n).map(|i| Panel::new(format!("p{i}"), format!("P{i}"))).collect();
        bar.set_panels(&panels);
        bar.set_bounds(Rect::new(0.0, 0.0, width, 25.0));
        bar
    }

    #[test]
    fn item_width_is_capped() {
        assert_eq!(bar_with(2, 400.0).item_width(), 100.0);
        assert_eq!(bar_with(4, 200.0).item_width(), 50.0);
        assert_eq!(bar_with(0, 200.0).item_width(), 0.0);
    }

    #[test]
    fn item_hit_testing() {
        let bar = bar_with(3, 600.0);
        assert_eq!(bar.item_at(Point::new(10.0, 5.0)), Some(0));
        assert_eq!(bar.item_at(Point::new(150.0, 5.0)), Some(1));
        assert_eq!(bar.item_at(Point::new(250.0, 5.0)), Some(2));
        assert_eq!(bar.item_at(Point::new(350.0, 5.0)), None);
        assert_eq!(bar.item_at(Point::new(10.0, 30.0)), None);
        assert_eq!(bar.item_bounds(2), Some(Rect::new(200.0, 0.0, 100.0, 25.0)));
        assert_eq!(bar.item_bounds(3), None);
    }

    #[test]
    fn menu_button_sits_at_the_right_end() {
        let mut bar = bar_with(1, 300.0);
        assert_eq!(bar.menu_button_bounds(), Some(Rect::new(275.0, 0.0, 25.0, 25.0)));
        bar.set_show_menu(false);
        assert_eq!(bar.menu_button_bounds(), None);
    }
}

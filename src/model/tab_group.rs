use std::rc::Rc;

use tracing::trace;

use crate::common::config::LayoutSettings;
use crate::layout_engine::TabPlacement;
use crate::model::panel::{GroupLocation, PanelRef};
use crate::sys::geometry::{Rect, Size};
use crate::ui::surface::{HostSurface, Renderable};
use crate::ui::tab_bar::{TabBar, TitleRenderFactory};

const TAB_BAR_Z: (i32, i32) = (1, 4);
const PANEL_Z: (i32, i32) = (0, 3);

/// An ordered set of panels showing one at a time under a tab bar.
///
/// Mutations here never emit events or move focus. The controller wraps them,
/// fires whatever the operation calls for and then focuses
/// [`TabGroup::selected_panel`].
pub struct TabGroup {
    panels: Vec<PanelRef>,
    selected: Option<usize>,
    /// Panels in the order they were selected, most recent last.
    history: Vec<PanelRef>,
    /// Panels whose surfaces are currently attached under this group.
    deployed: Vec<PanelRef>,
    host: Option<HostSurface>,
    redeploy_pending: bool,
    tab_bar: TabBar,
    tab_bar_height: f64,
    bounds: Rect,
    maximized: bool,
    location: Option<GroupLocation>,
}

impl TabGroup {
    pub fn new(settings: &LayoutSettings, factory: Rc<dyn TitleRenderFactory>) -> Self {
        Self {
            panels: Vec::new(),
            selected: None,
            history: Vec::new(),
            deployed: Vec::new(),
            host: None,
            redeploy_pending: false,
            tab_bar: TabBar::new(factory, settings.tab_bar.item_max_width, settings.use_tab_menu),
            tab_bar_height: settings.tab_bar.height,
            bounds: Rect::ZERO,
            maximized: false,
            location: None,
        }
    }

    pub(crate) fn bind(&mut self, location: GroupLocation) {
        self.location = Some(location);
        for panel in &self.panels {
            panel.set_owner(Some(location));
        }
    }

    pub fn location(&self) -> Option<GroupLocation> { self.location }

    pub fn panels(&self) -> &[PanelRef] { &self.panels }

    pub fn len(&self) -> usize { self.panels.len() }

    pub fn is_empty(&self) -> bool { self.panels.is_empty() }

    pub fn index_of(&self, panel: &PanelRef) -> Option<usize> {
        self.panels.iter().position(|p| Rc::ptr_eq(p, panel))
    }

    pub fn position_by_id(&self, id: &str) -> Option<usize> {
        self.panels.iter().position(|p| p.id() == id)
    }

    pub fn contains(&self, panel: &PanelRef) -> bool { self.index_of(panel).is_some() }

    pub fn selected_index(&self) -> Option<usize> { self.selected }

    pub fn selected_panel(&self) -> Option<PanelRef> {
        self.selected.and_then(|i| self.panels.get(i)).cloned()
    }

    pub fn tab_bar(&self) -> &TabBar { &self.tab_bar }

    pub fn tab_bar_mut(&mut self) -> &mut TabBar { &mut self.tab_bar }

    pub fn bounds(&self) -> Rect { self.bounds }

    pub fn is_attached(&self) -> bool { self.host.is_some() }

    pub fn is_maximized(&self) -> bool { self.maximized }

    pub fn min_size(&self) -> Size {
        self.panels.iter().fold(Size::ZERO, |acc, p| acc.max(p.min_size()))
    }

    pub fn priority(&self) -> f64 { self.panels.iter().map(|p| p.priority()).fold(0.0, f64::max) }

    pub fn set_hold(&self, hold: bool) {
        for panel in &self.panels {
            panel.set_hold(hold);
        }
    }

    /// Adds `panel` at the end and selects it. A panel already present is only
    /// selected. Returns whether the panel was newly added.
    pub fn add_panel(&mut self, panel: PanelRef) -> bool {
        if let Some(index) = self.index_of(&panel) {
            self.select(Some(index));
            return false;
        }
        panel.set_owner(self.location);
        self.panels.push(panel);
        self.panels_changed();
        self.select(Some(self.panels.len() - 1));
        true
    }

    /// Places `panel` before or after `anchor`, moving it if it is already
    /// here, and selects it. Dropping a panel onto itself does nothing.
    pub fn add_panel_to(
        &mut self,
        anchor: &PanelRef,
        panel: PanelRef,
        placement: TabPlacement,
    ) -> bool {
        if let Some(index) = self.index_of(&panel) {
            if Rc::ptr_eq(anchor, &panel) {
                return false;
            }
            self.panels.remove(index);
        }
        let at = match (self.index_of(anchor), placement) {
            (Some(i), TabPlacement::Before) => i,
            (Some(i), TabPlacement::After) => i + 1,
            (None, _) => self.panels.len(),
        };
        panel.set_owner(self.location);
        self.panels.insert(at, panel.clone());
        self.panels_changed();
        self.select(self.index_of(&panel));
        true
    }

    /// Removes `panel` and reselects from the selection history, falling back to
    /// the last panel. Returns false if the panel was not here.
    pub fn remove_panel(&mut self, panel: &PanelRef) -> bool {
        let Some(index) = self.index_of(panel) else {
            return false;
        };
        let removed = self.panels.remove(index);
        if removed.owner() == self.location {
            removed.set_owner(None);
        }
        self.history.retain(|p| !Rc::ptr_eq(p, &removed));
        self.panels_changed();
        self.reselect();
        true
    }

    /// Replaces the whole panel list, as when restoring a saved layout.
    pub fn set_panels(&mut self, panels: Vec<PanelRef>, selected: Option<usize>) {
        for panel in &panels {
            panel.set_owner(self.location);
        }
        self.panels = panels;
        self.panels_changed();
        self.select(selected);
    }

    /// Selects by index. `None` or an out of range index clears the selection.
    pub fn select(&mut self, index: Option<usize>) {
        self.selected = index.filter(|&i| i < self.panels.len());
        self.tab_bar.set_selected(self.selected);
        self.commit_selected();
    }

    fn reselect(&mut self) {
        while let Some(candidate) = self.history.pop() {
            if let Some(index) = self.index_of(&candidate) {
                self.select(Some(index));
                return;
            }
        }
        self.select(self.panels.len().checked_sub(1));
    }

    /// The history holds each panel once, most recently selected last.
    fn commit_selected(&mut self) {
        for (i, panel) in self.panels.iter().enumerate() {
            let selected = Some(i) == self.selected;
            panel.set_visible(selected);
            if selected {
                self.history.retain(|p| !Rc::ptr_eq(p, panel));
                self.history.push(panel.clone());
            }
        }
        self.update_panel_display();
    }

    fn panels_changed(&mut self) {
        self.tab_bar.set_panels(&self.panels);
        self.redeploy();
        self.update_z_index();
    }

    fn redeploy(&mut self) {
        let Some(host) = self.host else {
            self.redeploy_pending = true;
            return;
        };
        for panel in self.deployed.drain(..) {
            panel.remove_from_parent();
        }
        self.deployed = self.panels.clone();
        for panel in &self.deployed {
            panel.render(&host);
            panel.set_visible(false);
        }
    }

    fn update_panel_display(&self) {
        let Some(panel) = self.selected_panel() else {
            return;
        };
        let Rect { x, y, w, h } = self.bounds;
        let bar = self.tab_bar_height;
        panel.set_bounds(Rect::new(x, y + bar, w, (h - bar).max(0.0)));
    }

    fn update_z_index(&mut self) {
        let pick = |(normal, max): (i32, i32)| if self.maximized { max } else { normal };
        let (bar_z, panel_z) = (pick(TAB_BAR_Z), pick(PANEL_Z));
        self.tab_bar.set_z_index(bar_z);
        for panel in &self.panels {
            panel.set_z_index(panel_z);
        }
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.tab_bar
            .set_bounds(Rect::new(bounds.x, bounds.y, bounds.w, self.tab_bar_height));
        self.update_panel_display();
    }

    pub fn set_maximized(&mut self, maximized: bool) {
        self.maximized = maximized;
        self.update_z_index();
    }

    /// Attaches the tab bar and panels. Returns true when a deferred redeploy
    /// ran, in which case the selection was recommitted and should be focused.
    pub fn attach(&mut self, host: &HostSurface) -> bool {
        if self.host == Some(*host) {
            return false;
        }
        self.host = Some(*host);
        self.tab_bar.render(host);
        if std::mem::take(&mut self.redeploy_pending) {
            trace!(panels = self.panels.len(), "deferred redeploy");
            self.redeploy();
            self.commit_selected();
            return true;
        }
        for panel in &self.deployed {
            panel.render(host);
        }
        false
    }

    pub fn detach(&mut self) {
        if self.host.take().is_none() {
            return;
        }
        self.tab_bar.remove_from_parent();
        for panel in &self.deployed {
            panel.remove_from_parent();
        }
    }
}

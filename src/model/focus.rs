use std::cell::RefCell;
use std::rc::Rc;

use slotmap::SlotMap;
use tracing::trace;

use crate::layout_engine::NodeId;
use crate::model::panel::PanelRef;

slotmap::new_key_type! {
    /// Identifies one controller, nested document layouts included.
    pub struct LayoutKey;
}

/// Shared between a controller and every layout nested inside it.
pub type FocusContext = Rc<RefCell<FocusManager>>;

#[derive(Default, Debug)]
struct LayoutFocus {
    active_group: Option<NodeId>,
}

/// Tracks the single focused panel across all controllers sharing a context,
/// plus the last active tab group of each controller.
#[derive(Default, Debug)]
pub struct FocusManager {
    layouts: SlotMap<LayoutKey, LayoutFocus>,
    current: Option<PanelRef>,
}

#[derive(Debug, Clone)]
pub struct FocusTransition {
    pub previous: Option<PanelRef>,
    pub current: Option<PanelRef>,
}

impl FocusManager {
    pub fn new_context() -> FocusContext { Rc::new(RefCell::new(FocusManager::default())) }

    pub fn register_layout(&mut self) -> LayoutKey { self.layouts.insert(LayoutFocus::default()) }

    pub fn unregister_layout(&mut self, layout: LayoutKey) {
        self.layouts.remove(layout);
        if self.current.as_ref().and_then(|p| p.owner()).is_some_and(|o| o.layout == layout) {
            if let Some(panel) = self.current.take() {
                panel.clear_focus();
            }
        }
    }

    pub fn current_focus(&self) -> Option<PanelRef> { self.current.clone() }

    pub fn active_group(&self, layout: LayoutKey) -> Option<NodeId> {
        self.layouts.get(layout).and_then(|l| l.active_group)
    }

    /// Updates bookkeeping only. Use [`focus_panel`] to also run the panel hooks.
    pub fn focus(&mut self, panel: Option<PanelRef>) -> Option<FocusTransition> {
        let same = match (&self.current, &panel) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return None;
        }
        if let Some(owner) = panel.as_ref().and_then(|p| p.owner()) {
            if let Some(layout) = self.layouts.get_mut(owner.layout) {
                layout.active_group = Some(owner.node);
            }
        }
        trace!(
            from = ?self.current.as_ref().map(|p| p.id().to_string()),
            to = ?panel.as_ref().map(|p| p.id().to_string()),
            "focus"
        );
        let previous = std::mem::replace(&mut self.current, panel.clone());
        Some(FocusTransition { previous, current: panel })
    }

    /// Forgets the focused panel and every active group without running hooks.
    pub fn reset(&mut self) {
        if let Some(panel) = self.current.take() {
            panel.clear_focus();
        }
        for (_, layout) in self.layouts.iter_mut() {
            layout.active_group = None;
        }
    }
}

/// Moves focus and fires `focus_out`/`focus_in` once the manager is released,
/// so panel surfaces may consult the context from their hooks.
pub fn focus_panel(ctx: &FocusContext, panel: Option<&PanelRef>) -> Option<FocusTransition> {
    let transition = ctx.borrow_mut().focus(panel.cloned())?;
    if let Some(previous) = &transition.previous {
        previous.focus_out();
    }
    if let Some(current) = &transition.current {
        current.focus_in();
    }
    Some(transition)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::SlotMap;
    use test_log::test;

    use super::*;
    use crate::model::panel::{GroupLocation, Panel};
    use crate::ui::surface::testing::{RecordingSurface, SurfaceCall, count};

    fn node_ids(n: usize) -> Vec<NodeId> {
        let mut map: SlotMap<NodeId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn focus_runs_hooks_and_records_active_group() {
        let ctx = FocusManager::new_context();
        let layout = ctx.borrow_mut().register_layout();
        let nodes = node_ids(2);

        let (sa, log_a) = RecordingSurface::new();
        let a = Panel::with_surface("a", "A", Box::new(sa));
        a.set_owner(Some(GroupLocation { layout, node: nodes[0] }));
        let (sb, log_b) = RecordingSurface::new();
        let b = Panel::with_surface("b", "B", Box::new(sb));
        b.set_owner(Some(GroupLocation { layout, node: nodes[1] }));

        assert!(focus_panel(&ctx, Some(&a)).is_some());
        assert!(a.is_focused());
        assert_eq!(ctx.borrow().active_group(layout), Some(nodes[0]));

        assert!(focus_panel(&ctx, Some(&a)).is_none());
        assert_eq!(count(&log_a, &SurfaceCall::FocusIn), 1);

        focus_panel(&ctx, Some(&b));
        assert!(!a.is_focused());
        assert!(b.is_focused());
        assert_eq!(count(&log_a, &SurfaceCall::FocusOut), 1);
        assert_eq!(count(&log_b, &SurfaceCall::FocusIn), 1);
        assert_eq!(ctx.borrow().active_group(layout), Some(nodes[1]));
    }

    #[test]
    fn reset_clears_without_hooks() {
        let ctx = FocusManager::new_context();
        let layout = ctx.borrow_mut().register_layout();
        let nodes = node_ids(1);
        let (s, log) = RecordingSurface::new();
        let a = Panel::with_surface("a", "A", Box::new(s));
        a.set_owner(Some(GroupLocation { layout, node: nodes[0] }));
        focus_panel(&ctx, Some(&a));

        ctx.borrow_mut().reset();

        assert!(ctx.borrow().current_focus().is_none());
        assert_eq!(ctx.borrow().active_group(layout), None);
        assert!(!a.is_focused());
        assert_eq!(count(&log, &SurfaceCall::FocusOut), 0);
    }

    #[test]
    fn clearing_focus_reports_previous() {
        let ctx = FocusManager::new_context();
        let a = Panel::new("a", "A");
        focus_panel(&ctx, Some(&a));
        let transition = focus_panel(&ctx, None).unwrap();
        assert_eq!(transition.previous.unwrap().id(), "a");
        assert!(transition.current.is_none());
        assert!(focus_panel(&ctx, None).is_none());
    }
}

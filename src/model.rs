pub mod focus;
pub mod panel;
pub mod tab_group;

pub use focus::{FocusContext, FocusManager, FocusTransition, LayoutKey, focus_panel};
pub use panel::{GroupLocation, PLACEHOLDER_ID, Panel, PanelRef};
pub use tab_group::TabGroup;

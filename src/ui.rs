//! Render capabilities. The engine never draws; it hands rectangles, stacking
//! order and attach/detach calls to host-provided surfaces.

pub mod drag_feedback;
pub mod surface;
pub mod tab_bar;

pub use drag_feedback::{FeedbackKind, Overlay, OverlayKind};
pub use surface::{HostSurface, NullSurface, PanelSurface, Renderable};
pub use tab_bar::{
    DefaultTitleRender, DefaultTitleRenderFactory, TabBar, TitleRender, TitleRenderFactory,
};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::layout_engine::drag::DragOutcome;
use crate::layout_engine::tree::NodeId;
use crate::model::panel::PanelRef;
use crate::sys::geometry::Point;

/// Notifications a controller queues for its host. Drained with
/// [`BoxLayout::take_events`](crate::layout_engine::BoxLayout::take_events).
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutEvent {
    PanelAdded { panel: String, element: NodeId },
    PanelRemoved { panel: String, element: NodeId },
    /// A drag and dock finished and moved `panel`.
    PanelDrag { panel: String },
    FocusChanged { panel: Option<String> },
    ConfigChanged,
}

/// Synchronous hooks into a controller. Every method has a default so
/// observers implement only what they care about.
pub trait LayoutObserver {
    /// Asked before a non-silent removal. Returning false keeps the panel.
    fn panel_removing(&mut self, _panel: &PanelRef, _element: NodeId) -> bool { true }

    fn on_event(&mut self, _event: &LayoutEvent) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    DoubleClick,
}

/// Pointer input in host (global) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f64, y: f64) -> Self {
        Self { kind, position: Point::new(x, y) }
    }

    pub fn down(x: f64, y: f64) -> Self { Self::new(PointerKind::Down, x, y) }

    pub fn moved(x: f64, y: f64) -> Self { Self::new(PointerKind::Move, x, y) }

    pub fn up(x: f64, y: f64) -> Self { Self::new(PointerKind::Up, x, y) }

    pub fn double_click(x: f64, y: f64) -> Self { Self::new(PointerKind::DoubleClick, x, y) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStyle {
    #[default]
    Default,
    /// Dragging a separator between stacked children.
    RowResize,
    /// Dragging a separator between side by side children.
    ColResize,
}

/// What the host should do after feeding a pointer event in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResponse {
    pub handled: bool,
    /// The controller owns the pointer until the next `Up`.
    pub capture_pointer: bool,
    pub cursor: Option<CursorStyle>,
    /// The tab menu button of this element was pressed.
    pub open_menu: Option<NodeId>,
    pub drag: Option<DragOutcome>,
}

impl EventResponse {
    pub fn ignored() -> Self { Self::default() }

    pub fn handled() -> Self { Self { handled: true, ..Self::default() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TabMenuAction {
    /// Close the selected panel.
    Close,
    /// Close every panel and the element with them.
    #[strum(to_string = "close_all", serialize = "closeall")]
    CloseAll,
}

pub mod config;
pub mod document;
pub mod drag;
pub mod engine;
pub mod error;
pub mod events;
pub(crate) mod graph;
pub mod group;
pub mod resize;
pub mod serialize;
pub mod tree;

pub use config::LayoutConfig;
pub use document::DocumentGroup;
pub use drag::{DragInfo, DragOutcome, DragSource, DropProposal, DropZone, resolve_drop_zone};
pub use engine::{BoxLayout, PanelRegistry};
pub use error::LayoutError;
pub use events::{
    CursorStyle, EventResponse, LayoutEvent, LayoutObserver, PointerEvent, PointerKind,
    TabMenuAction,
};
pub use graph::{DirLink, Orientation, Side, TabPlacement};
pub use group::{DropTarget, Group, LeafGroup};
pub use serialize::{DefaultPanelSerializer, GroupConfig, LayoutNodeConfig, PanelSerializer};
pub use tree::{Container, LayoutTree, Node, NodeId, NodeKind};

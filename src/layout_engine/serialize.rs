//! Persisted shape of a layout tree. Panels are stored by the string their
//! [`PanelSerializer`] produces; restoring resolves them back to live panels.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::layout_engine::engine::BoxLayout;
use crate::layout_engine::error::LayoutError;
use crate::model::panel::PanelRef;
use crate::sys::geometry::Rect;

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum LayoutNodeConfig {
    #[serde(alias = "BoxLayoutContainer")]
    Container {
        bounds: Rect,
        is_vertical: bool,
        first_element: Box<LayoutNodeConfig>,
        second_element: Box<LayoutNodeConfig>,
    },
    #[serde(alias = "BoxLayoutElement")]
    Element {
        bounds: Rect,
        render: GroupConfig,
    },
    DocumentElement {
        bounds: Rect,
        layout_info: Option<Box<LayoutNodeConfig>>,
    },
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    pub selected_index: Option<usize>,
    #[serde(default)]
    pub panels: Vec<String>,
}

impl LayoutNodeConfig {
    pub fn bounds(&self) -> Rect {
        match self {
            LayoutNodeConfig::Container { bounds, .. }
            | LayoutNodeConfig::Element { bounds, .. }
            | LayoutNodeConfig::DocumentElement { bounds, .. } => *bounds,
        }
    }

    pub fn to_json_string(&self) -> Result<String, LayoutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(buf: &str) -> Result<Self, LayoutError> { Ok(serde_json::from_str(buf)?) }

    /// Every serialized panel string in pre-order, nested documents included.
    pub fn panel_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_panel_ids(&mut out);
        out
    }

    fn collect_panel_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            LayoutNodeConfig::Container { first_element, second_element, .. } => {
                first_element.collect_panel_ids(out);
                second_element.collect_panel_ids(out);
            }
            LayoutNodeConfig::Element { render, .. } => {
                out.extend(render.panels.iter().map(String::as_str));
            }
            LayoutNodeConfig::DocumentElement { layout_info, .. } => {
                if let Some(info) = layout_info {
                    info.collect_panel_ids(out);
                }
            }
        }
    }
}

/// Converts panels to and from the strings stored in a layout description.
pub trait PanelSerializer {
    fn serialize(&self, layout: &BoxLayout, panel: &PanelRef) -> String;
    /// `None` makes the restore insert a placeholder for this entry.
    fn unserialize(&self, layout: &BoxLayout, id: &str) -> Option<PanelRef>;
}

/// Stores panel ids and resolves them through the controller's registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPanelSerializer;

impl PanelSerializer for DefaultPanelSerializer {
    fn serialize(&self, _layout: &BoxLayout, panel: &PanelRef) -> String { panel.id().to_string() }

    fn unserialize(&self, layout: &BoxLayout, id: &str) -> Option<PanelRef> {
        layout.registered_panel(id)
    }
}

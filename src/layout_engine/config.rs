use std::fmt;
use std::rc::Rc;

use crate::common::config::LayoutSettings;
use crate::layout_engine::serialize::{DefaultPanelSerializer, PanelSerializer};
use crate::ui::tab_bar::{DefaultTitleRenderFactory, TitleRenderFactory};

/// Per-controller configuration: the static settings plus the pluggable
/// factories and serializers. The `document_*` entries are handed to layouts
/// nested inside document elements.
#[derive(Clone)]
pub struct LayoutConfig {
    pub settings: LayoutSettings,
    pub title_render_factory: Rc<dyn TitleRenderFactory>,
    pub document_title_render_factory: Rc<dyn TitleRenderFactory>,
    pub panel_serializer: Rc<dyn PanelSerializer>,
    pub document_panel_serializer: Rc<dyn PanelSerializer>,
}

impl LayoutConfig {
    pub fn with_settings(settings: LayoutSettings) -> Self { Self { settings, ..Self::default() } }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            settings: LayoutSettings::default(),
            title_render_factory: Rc::new(DefaultTitleRenderFactory),
            document_title_render_factory: Rc::new(DefaultTitleRenderFactory),
            panel_serializer: Rc::new(DefaultPanelSerializer),
            document_panel_serializer: Rc::new(DefaultPanelSerializer),
        }
    }
}

impl fmt::Debug for LayoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutConfig").field("settings", &self.settings).finish_non_exhaustive()
    }
}

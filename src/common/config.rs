use std::path::{Path, PathBuf};

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub fn config_file() -> Option<PathBuf> { dirs::home_dir().map(|home| home.join(".dock-layout.toml")) }

/// Engine-wide knobs for the box layout. Every controller, nested document
/// layouts included, reads its geometry constants from here.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Space reserved between the two children of a split.
    #[serde(default = "default_gap")]
    pub gap: f64,
    /// Thickness of the interactive resize handle centred on a split line.
    #[serde(default = "default_separator_size")]
    pub separator_size: f64,
    /// Pointer travel (in either axis) before a tab press turns into a drag.
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold: f64,
    #[serde(default = "yes")]
    pub use_tab_menu: bool,
    #[serde(default)]
    pub tab_bar: TabBarSettings,
    #[serde(default)]
    pub panel: PanelDefaults,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TabBarSettings {
    #[serde(default = "default_tab_bar_height")]
    pub height: f64,
    /// Upper bound on a single tab item's width.
    #[serde(default = "default_tab_item_max_width")]
    pub item_max_width: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct PanelDefaults {
    #[serde(default = "default_panel_min_size")]
    pub min_width: f64,
    #[serde(default = "default_panel_min_size")]
    pub min_height: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            separator_size: default_separator_size(),
            drag_threshold: default_drag_threshold(),
            use_tab_menu: true,
            tab_bar: TabBarSettings::default(),
            panel: PanelDefaults::default(),
        }
    }
}

impl Default for TabBarSettings {
    fn default() -> Self {
        Self {
            height: default_tab_bar_height(),
            item_max_width: default_tab_item_max_width(),
        }
    }
}

impl Default for PanelDefaults {
    fn default() -> Self {
        Self {
            min_width: default_panel_min_size(),
            min_height: default_panel_min_size(),
        }
    }
}

impl LayoutSettings {
    pub fn read(path: &Path) -> anyhow::Result<LayoutSettings> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<LayoutSettings> {
        let settings: LayoutSettings = toml::from_str(buf)?;
        if !settings.gap.is_finite() || !settings.separator_size.is_finite() {
            bail!("gap and separator_size must be finite numbers");
        }
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the settings and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.gap < 0.0 {
            issues.push(format!("gap must be non-negative, got {}", self.gap));
        }

        if self.separator_size <= 0.0 {
            issues.push(format!(
                "separator_size must be positive, got {}",
                self.separator_size
            ));
        }

        if self.drag_threshold < 0.0 {
            issues.push(format!(
                "drag_threshold must be non-negative, got {}",
                self.drag_threshold
            ));
        }

        issues.extend(self.tab_bar.validate());
        issues.extend(self.panel.validate());

        issues
    }

    /// Resets invalid values to their defaults. Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.gap < 0.0 {
            self.gap = default_gap();
            fixes += 1;
        }

        if self.separator_size <= 0.0 {
            self.separator_size = default_separator_size();
            fixes += 1;
        }

        if self.drag_threshold < 0.0 {
            self.drag_threshold = default_drag_threshold();
            fixes += 1;
        }

        fixes += self.tab_bar.auto_fix_values();
        fixes += self.panel.auto_fix_values();

        fixes
    }
}

impl TabBarSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.height <= 0.0 {
            issues.push(format!("tab_bar.height must be positive, got {}", self.height));
        }

        if self.item_max_width <= 0.0 {
            issues.push(format!(
                "tab_bar.item_max_width must be positive, got {}",
                self.item_max_width
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.height <= 0.0 {
            self.height = default_tab_bar_height();
            fixes += 1;
        }

        if self.item_max_width <= 0.0 {
            self.item_max_width = default_tab_item_max_width();
            fixes += 1;
        }

        fixes
    }
}

impl PanelDefaults {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.min_width < 0.0 {
            issues.push(format!(
                "panel.min_width must be non-negative, got {}",
                self.min_width
            ));
        }

        if self.min_height < 0.0 {
            issues.push(format!(
                "panel.min_height must be non-negative, got {}",
                self.min_height
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.min_width < 0.0 {
            self.min_width = default_panel_min_size();
            fixes += 1;
        }

        if self.min_height < 0.0 {
            self.min_height = default_panel_min_size();
            fixes += 1;
        }

        fixes
    }
}

fn yes() -> bool { true }

fn default_gap() -> f64 { 1.0 }

fn default_separator_size() -> f64 { 6.0 }

fn default_drag_threshold() -> f64 { 3.0 }

fn default_tab_bar_height() -> f64 { 25.0 }

fn default_tab_item_max_width() -> f64 { 100.0 }

fn default_panel_min_size() -> f64 { 50.0 }

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dock_layout::common::config::{LayoutSettings, config_file};
use dock_layout::common::log::init_logging;
use dock_layout::layout_engine::{BoxLayout, LayoutConfig, LayoutNodeConfig};
use dock_layout::model::{FocusManager, Panel};
use dock_layout::sys::geometry::{Matrix, Size};

#[derive(Parser)]
#[command(name = "dock-cli")]
#[command(about = "Inspect persisted dock layouts and layout settings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a saved layout and print its tree with bounds
    Tree {
        layout: PathBuf,
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        #[arg(long, default_value_t = 800.0)]
        height: f64,
        /// Settings file (defaults to ~/.dock-layout.toml when present)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
    /// Validate a settings file
    Config {
        path: PathBuf,
        /// Reset invalid values to their defaults and save the file
        #[arg(long)]
        fix: bool,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tree { layout, width, height, settings } => {
            print_tree(&layout, Size::new(width, height), settings.as_deref())
        }
        Commands::Config { path, fix } => check_config(&path, fix),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<LayoutSettings> {
    match path {
        Some(path) => LayoutSettings::read(path)
            .with_context(|| format!("reading settings from {}", path.display())),
        None => match config_file().filter(|p| p.exists()) {
            Some(default) => LayoutSettings::read(&default),
            None => Ok(LayoutSettings::default()),
        },
    }
}

fn print_tree(path: &Path, area: Size, settings: Option<&Path>) -> anyhow::Result<()> {
    let buf = std::fs::read_to_string(path)
        .with_context(|| format!("reading layout from {}", path.display()))?;
    let config = LayoutNodeConfig::from_json_str(&buf)?;
    let settings = load_settings(settings)?;

    let mut layout =
        BoxLayout::with_config(FocusManager::new_context(), LayoutConfig::with_settings(settings));
    for id in config.panel_ids() {
        if layout.registered_panel(id).is_none() {
            let panel = Panel::from_defaults(id, id, &layout.settings().panel);
            layout.register_panel(panel);
        }
    }
    layout.set_area(area, Matrix::IDENTITY);
    layout.apply_layout_config(&config);

    print!("{}", layout.draw_tree());
    Ok(())
}

fn check_config(path: &Path, fix: bool) -> anyhow::Result<()> {
    let mut settings = LayoutSettings::read(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let issues = settings.validate();
    if issues.is_empty() {
        println!("{}: ok", path.display());
        return Ok(());
    }
    for issue in &issues {
        println!("{issue}");
    }
    if !fix {
        anyhow::bail!("{} issue(s) found", issues.len());
    }
    let fixes = settings.auto_fix_values();
    settings.save(path)?;
    println!("fixed {fixes} value(s)");
    Ok(())
}

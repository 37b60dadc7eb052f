mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use app::GmidViewerApp;
use clap::Parser;
use eframe::egui;
use gmid_viewer::config::ViewerConfig;
use state::AppState;

/// gm/Id sweep viewer
#[derive(Parser)]
#[command(name = "gmid-viewer", version)]
struct Cli {
    /// Sweep export to open (.csv, .parquet or .json)
    file: Option<PathBuf>,

    /// Drain-source voltage to extract
    #[arg(long)]
    vds: Option<f64>,

    /// Absolute tolerance when matching vds
    #[arg(long)]
    vds_tol: Option<f64>,

    /// Lower VGS bound (needs --vgs-max)
    #[arg(long, requires = "vgs_max")]
    vgs_min: Option<f64>,

    /// Upper VGS bound (needs --vgs-min)
    #[arg(long, requires = "vgs_min")]
    vgs_max: Option<f64>,

    /// Viewer config file (defaults to ./gmid-viewer.json when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = ViewerConfig::discover(cli.config.as_deref())?;
    if cli.vds.is_some() {
        config.vds = cli.vds;
    }
    if let Some(tol) = cli.vds_tol {
        config.vds_tolerance = tol;
    }
    if let (Some(low), Some(high)) = (cli.vgs_min, cli.vgs_max) {
        config.vgs_interval = Some((low, high));
    }

    let window_size = config.window_size;
    let mut state = AppState::new(config);
    if let Some(path) = &cli.file {
        state.load_path(path);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(window_size)
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "gm/Id Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(GmidViewerApp::new(state)))),
    )
    .map_err(|e| anyhow!("viewer exited with an error: {e}"))
}

use std::path::{Path, PathBuf};

use gmid_viewer::config::ViewerConfig;
use gmid_viewer::cursor::{ControlAxis, CursorPlot, LengthSelection, PlotRequest, Selection};
use gmid_viewer::data::extract::VGS_KEY;
use gmid_viewer::data::grid::flatten;
use gmid_viewer::data::{available_vds, extract, loader, ExtractOptions, Extraction, SweepTable};
use gmid_viewer::units::{determine_inversion_region, DeviceType};

use crate::color::LengthColors;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded sweep table (None until user loads a file).
    pub table: Option<SweepTable>,
    pub source: Option<PathBuf>,

    /// Distinct vds values of the table.
    pub vds_options: Vec<f64>,
    pub vds: Option<f64>,
    pub vds_tolerance: f64,

    pub vgs_interval_enabled: bool,
    pub vgs_interval: (f64, f64),

    /// Result for the current vds / interval.
    pub extraction: Option<Extraction>,

    pub x_series: String,
    pub y_series: String,
    pub y_multiplier: f64,
    pub log_y: bool,

    pub plot: Option<CursorPlot>,
    pub selection: Option<Selection>,

    /// Device type for the inversion-region readout.
    pub device_type: DeviceType,

    pub length_colors: Option<LengthColors>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        let options = config.extract_options();
        let (vgs_interval_enabled, vgs_interval) = match options.vgs_interval {
            Some(interval) => (true, interval),
            None => (false, (0.0, 1.0)),
        };
        Self {
            vds: config.vds,
            vds_tolerance: options.vds_tolerance,
            vgs_interval_enabled,
            vgs_interval,
            x_series: config.x_series.unwrap_or_else(|| VGS_KEY.to_string()),
            y_series: config.y_series.unwrap_or_default(),
            table: None,
            source: None,
            vds_options: Vec::new(),
            extraction: None,
            y_multiplier: 1.0,
            log_y: false,
            plot: None,
            selection: None,
            device_type: DeviceType::default(),
            length_colors: None,
            status_message: None,
        }
    }

    /// Load a file and extract at the configured (or first available) vds.
    pub fn load_path(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(table) => {
                self.set_table(table);
                self.source = Some(path.to_path_buf());
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded table.
    pub fn set_table(&mut self, table: SweepTable) {
        self.vds_options = available_vds(&table);
        let keep_vds = self.vds.is_some_and(|v| {
            self.vds_options
                .iter()
                .any(|o| (o - v).abs() < self.vds_tolerance)
        });
        if !keep_vds {
            self.vds = self.vds_options.first().copied();
        }
        self.table = Some(table);
        self.status_message = None;
        self.reextract();
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            vgs_interval: self.vgs_interval_enabled.then_some(self.vgs_interval),
            vds_tolerance: self.vds_tolerance,
        }
    }

    /// Recompute the extraction after a vds / interval / tolerance change.
    pub fn reextract(&mut self) {
        self.extraction = None;
        self.plot = None;
        self.selection = None;
        self.length_colors = None;

        let (Some(table), Some(vds)) = (&self.table, self.vds) else {
            return;
        };

        match extract(table, vds, &self.extract_options()) {
            Ok(extraction) => {
                let names = extraction.series_names();
                if !names.contains(&self.x_series) {
                    self.x_series = VGS_KEY.to_string();
                }
                if !names.contains(&self.y_series) {
                    self.y_series = extraction
                        .variable_names()
                        .next()
                        .unwrap_or(VGS_KEY)
                        .to_string();
                }
                self.length_colors = Some(LengthColors::new(
                    extraction.length_values.as_slice().unwrap_or(&[]),
                ));
                self.extraction = Some(extraction);
                self.status_message = None;
                self.rebuild_plot();
            }
            Err(e) => {
                log::error!("Extraction failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Rebuild the cursor plot after an axis, multiplier or log change,
    /// keeping the length and control selections.
    pub fn rebuild_plot(&mut self) {
        let Some(extraction) = &self.extraction else {
            return;
        };
        let previous = self.plot.take();

        let request = match PlotRequest::from_extraction(extraction, &self.x_series, &self.y_series)
        {
            Ok(r) => r.with_y_multiplier(self.y_multiplier).with_log_y(self.log_y),
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                return;
            }
        };

        match CursorPlot::new(request) {
            Ok(mut plot) => {
                if let Some(prev) = previous {
                    if let LengthSelection::Single(i) = prev.length_selection {
                        if i < plot.unique_lengths().len() {
                            plot.length_selection = prev.length_selection;
                        }
                    }
                    plot.control = prev.control;
                }
                self.plot = Some(plot);
                self.refresh_selection();
            }
            Err(e) => {
                log::error!("Cannot build plot: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Re-run the nearest-point lookup after a target or filter change.
    pub fn refresh_selection(&mut self) {
        self.selection = self.plot.as_mut().and_then(|p| p.select());
    }

    /// Move the control target from a click on the plot.
    pub fn click_at(&mut self, x: f64, y: f64) {
        let Some(plot) = self.plot.as_mut() else {
            return;
        };
        match plot.control {
            ControlAxis::X => plot.set_target(ControlAxis::X, x),
            ControlAxis::Y => {
                let y = if plot.log_y { 10f64.powf(y) } else { y };
                plot.set_target(ControlAxis::Y, y)
            }
            ControlAxis::Z => return,
        }
        self.refresh_selection();
    }

    /// File name and vds of the current view, or the app name before a load.
    pub fn window_title(&self) -> String {
        let Some(file) = self.source.as_ref().and_then(|p| p.file_name()) else {
            return "gm/Id Viewer".to_string();
        };
        match self.vds {
            Some(vds) => format!("{} - vds={vds} V", file.to_string_lossy()),
            None => file.to_string_lossy().into_owned(),
        }
    }

    /// Name of a gm/Id variable in the extraction, if any.
    pub fn gmid_series(&self) -> Option<&str> {
        self.extraction
            .as_ref()?
            .variable_names()
            .find(|name| is_gmid_name(name))
    }

    /// Inversion region of the selected point, from the gm/Id variable.
    pub fn inversion_readout(&self) -> Option<String> {
        let name = self.gmid_series()?;
        let selection = self.selection?;
        let values = flatten(self.extraction.as_ref()?.variables.get(name)?);
        let gm_id = *values.get(selection.index)?;
        let region = determine_inversion_region(gm_id, &self.device_type.to_string()).ok()?;
        Some(format!("{name} = {gm_id:.2} V⁻¹ ({}): {region}", self.device_type))
    }
}

fn is_gmid_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["gmid", "gm/id", "gm_id", "gmoverid"]
        .iter()
        .any(|pat| lower.contains(pat))
}

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use gmid_viewer::cursor::{ControlAxis, LengthSelection};
use gmid_viewer::units::{format_exp, format_general, DeviceType};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – extraction and cursor controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Sweep");
    ui.separator();

    if state.table.is_none() {
        ui.label("No sweep export loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            extraction_controls(ui, state);
            ui.separator();
            axis_controls(ui, state);
            ui.separator();
            cursor_controls(ui, state);
            ui.separator();
            series_table(ui, state);
        });
}

fn extraction_controls(ui: &mut Ui, state: &mut AppState) {
    let mut changed = false;

    ui.strong("VDS");
    let current = state
        .vds
        .map(|v| format_general(v, 4))
        .unwrap_or_default();
    egui::ComboBox::from_id_salt("vds")
        .selected_text(format!("{current} V"))
        .show_ui(ui, |ui: &mut Ui| {
            for &vds in &state.vds_options {
                let selected = state.vds == Some(vds);
                if ui
                    .selectable_label(selected, format!("{} V", format_general(vds, 4)))
                    .clicked()
                    && !selected
                {
                    state.vds = Some(vds);
                    changed = true;
                }
            }
        });

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Tolerance");
        changed |= ui
            .add(
                egui::DragValue::new(&mut state.vds_tolerance)
                    .range(0.0..=1.0)
                    .speed(1e-4)
                    .custom_formatter(|v, _| format_exp(v, 1)),
            )
            .changed();
    });

    changed |= ui
        .checkbox(&mut state.vgs_interval_enabled, "Limit VGS range")
        .changed();
    ui.add_enabled_ui(state.vgs_interval_enabled, |ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            let (low, high) = &mut state.vgs_interval;
            changed |= ui
                .add(egui::DragValue::new(low).speed(0.01).prefix("min "))
                .changed();
            changed |= ui
                .add(egui::DragValue::new(high).speed(0.01).prefix("max "))
                .changed();
        });
    });

    if changed {
        state.reextract();
    }
}

fn axis_controls(ui: &mut Ui, state: &mut AppState) {
    let Some(extraction) = &state.extraction else {
        return;
    };
    let names = extraction.series_names();
    let mut changed = false;

    for (label, id, target) in [
        ("X axis", "x_series", &mut state.x_series),
        ("Y axis", "y_series", &mut state.y_series),
    ] {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(label);
            egui::ComboBox::from_id_salt(id)
                .selected_text(target.as_str())
                .show_ui(ui, |ui: &mut Ui| {
                    for name in &names {
                        let selected = target.as_str() == name.as_str();
                        if ui.selectable_label(selected, name).clicked() && !selected {
                            *target = name.clone();
                            changed = true;
                        }
                    }
                });
        });
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Y ×");
        changed |= ui
            .add(
                egui::DragValue::new(&mut state.y_multiplier)
                    .speed(0.1)
                    .custom_formatter(|v, _| format_general(v, 4))
                    .custom_parser(|s| s.trim().parse().ok()),
            )
            .changed();
    });
    changed |= ui.checkbox(&mut state.log_y, "Log Y axis").changed();

    if changed {
        state.rebuild_plot();
    }
}

fn cursor_controls(ui: &mut Ui, state: &mut AppState) {
    let Some(plot) = state.plot.as_mut() else {
        return;
    };
    let mut changed = false;

    ui.strong("Length");
    let options = plot.length_options();
    egui::ComboBox::from_id_salt("length")
        .selected_text(plot.selected_length_label())
        .show_ui(ui, |ui: &mut Ui| {
            for (i, label) in options.iter().enumerate() {
                let choice = if i == 0 {
                    LengthSelection::All
                } else {
                    LengthSelection::Single(i - 1)
                };
                changed |= ui
                    .selectable_value(&mut plot.length_selection, choice, label)
                    .changed();
            }
        });

    ui.strong("Control");
    ui.horizontal(|ui: &mut Ui| {
        for axis in ControlAxis::ALL {
            changed |= ui.radio_value(&mut plot.control, axis, axis.to_string()).changed();
        }
    });

    let names = [plot.x_name.clone(), plot.y_name.clone(), "Vgs".to_string()];
    for (axis, name) in ControlAxis::ALL.into_iter().zip(names) {
        let mut value = plot.target(axis);
        let speed = value.abs().max(1e-12) * 0.01;
        ui.horizontal(|ui: &mut Ui| {
            ui.label(format!("{name}:"));
            let response = ui.add_enabled(
                plot.control == axis,
                egui::DragValue::new(&mut value)
                    .speed(speed)
                    .custom_formatter(|v, _| format_general(v, 3))
                    .custom_parser(|s| s.trim().parse().ok()),
            );
            if response.changed() {
                changed = true;
            }
        });
        plot.set_target(axis, value);
    }

    if changed {
        state.refresh_selection();
    }

    if let (Some(plot), Some(sel)) = (&state.plot, state.selection) {
        ui.add_space(4.0);
        for line in plot.readout(&sel) {
            ui.monospace(line);
        }
    }

    if state.gmid_series().is_some() {
        ui.add_space(4.0);
        ui.horizontal(|ui: &mut Ui| {
            ui.label("Device");
            for device in DeviceType::ALL {
                ui.radio_value(&mut state.device_type, device, device.to_string());
            }
        });
        if let Some(text) = state.inversion_readout() {
            ui.label(RichText::new(text).strong());
        }
    }
}

fn series_table(ui: &mut Ui, state: &AppState) {
    let Some(extraction) = &state.extraction else {
        return;
    };
    ui.strong(format!("Extracted at VDS = {} V", format_general(extraction.vds, 4)));
    ui.label(format!("Sweep axis: {}", extraction.sweep_column));

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(80.0))
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Series");
            });
            header.col(|ui| {
                ui.strong("Shape");
            });
        })
        .body(|mut body| {
            for name in extraction.series_names() {
                let Some(array) = extraction.get(&name) else {
                    continue;
                };
                let (rows, cols) = array.dim();
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(&name);
                    });
                    row.col(|ui| {
                        ui.label(format!("{rows} × {cols}"));
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(table), Some(path)) = (&state.table, &state.source) {
            ui.label(format!(
                "{}: {} columns, {} sweep points",
                path.display(),
                table.num_columns(),
                table.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open sweep export")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}

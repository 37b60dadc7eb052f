use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints, Points};

use gmid_viewer::units::format_with_si;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Sweep plot (central panel)
// ---------------------------------------------------------------------------

/// Render the cross-hair plot in the central panel.
pub fn sweep_plot(ui: &mut Ui, state: &mut AppState) {
    let Some(plot) = &state.plot else {
        ui.centered_and_justified(|ui: &mut Ui| {
            if state.table.is_none() {
                ui.heading("Open a sweep export to start  (File → Open…)");
            } else {
                ui.heading("No data for the selected VDS");
            }
        });
        return;
    };

    ui.vertical_centered(|ui: &mut Ui| {
        ui.strong(plot.title());
    });

    let log_y = plot.log_y;
    // Log axis plots log10(y); non-positive samples are dropped.
    let transform = |y: f64| if log_y { y.log10() } else { y };

    let x_label = plot.x_name.clone();
    let y_label = plot.y_name.clone();
    let curves = plot.curves();
    let selection = state.selection;
    let readout = selection.map(|sel| plot.readout(&sel));
    let colors = state.length_colors.as_ref();

    let mut chart = Plot::new("sweep_plot")
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .x_axis_formatter(|mark, _range| format_with_si(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true);

    if log_y {
        chart = chart.y_axis_formatter(|mark, _range| {
            if (mark.value - mark.value.round()).abs() < 1e-9 {
                format!("10^{}", mark.value.round() as i64)
            } else {
                String::new()
            }
        });
    } else {
        chart = chart.y_axis_formatter(|mark, _range| format_with_si(mark.value));
    }

    let response = chart.show(ui, |plot_ui| {
        for curve in &curves {
            let color = colors
                .map(|c| c.color_for(curve.length))
                .unwrap_or(Color32::LIGHT_BLUE);

            let points: PlotPoints = curve
                .points
                .iter()
                .map(|&[x, y]| [x, transform(y)])
                .filter(|[x, y]| x.is_finite() && y.is_finite())
                .collect();

            let line = Line::new(points)
                .name(format!("{:.2} μm", curve.length * 1e6))
                .color(color)
                .width(1.5);

            plot_ui.line(line);
        }

        if let (Some(sel), Some(lines)) = (selection, &readout) {
            let marker = Points::new(vec![[sel.x, transform(sel.y)]])
                .name(lines.join("\n"))
                .color(Color32::RED)
                .radius(5.0);
            plot_ui.points(marker);
        }

        if plot_ui.response().clicked() {
            plot_ui.pointer_coordinate().map(|p| (p.x, p.y))
        } else {
            None
        }
    });

    if let Some((x, y)) = response.inner {
        state.click_at(x, y);
    }
}

//! Cross-hair state for the plot panel.
//!
//! The plot is fed flat `x`, `y`, `z` and `length` series of equal size.
//! One of the three value axes is the *control* axis: its target value
//! picks the nearest visible point, and the targets of all three axes then
//! snap to that point.

use std::fmt;

use thiserror::Error;

use crate::data::grid::flatten;
use crate::data::Extraction;
use crate::units::{format_for_box, format_with_si};

/// Significant digits kept in the target fields.
const BOX_DIGITS: usize = 3;
/// Length match tolerance in micrometres.
const LENGTH_MATCH_UM: f64 = 0.01;

#[derive(Debug, Error, PartialEq)]
pub enum CursorError {
    #[error("Plot series are empty")]
    Empty,

    #[error("Plot series sizes differ: x={x}, y={y}, z={z}, length={length}")]
    LengthMismatch {
        x: usize,
        y: usize,
        z: usize,
        length: usize,
    },

    #[error("Unknown series '{0}'")]
    UnknownSeries(String),
}

// ---------------------------------------------------------------------------
// PlotRequest – input of the plot entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Third readout quantity, usually the gate voltage.
    pub z: Vec<f64>,
    pub length: Vec<f64>,
    pub x_name: String,
    pub y_name: String,
    pub y_multiplier: f64,
    pub log_y: bool,
}

impl PlotRequest {
    /// Plot `y_name` against `x_name` from an extraction, with the gate
    /// voltage as the third readout. Helper names (`vgs`, `lengths`) are
    /// accepted on either axis.
    pub fn from_extraction(
        extraction: &Extraction,
        x_name: &str,
        y_name: &str,
    ) -> Result<Self, CursorError> {
        let series = |name: &str| {
            extraction
                .get(name)
                .map(|a| flatten(a).to_vec())
                .ok_or_else(|| CursorError::UnknownSeries(name.to_string()))
        };

        Ok(PlotRequest {
            x: series(x_name)?,
            y: series(y_name)?,
            z: flatten(&extraction.vgs).to_vec(),
            length: flatten(&extraction.lengths).to_vec(),
            x_name: x_name.to_string(),
            y_name: y_name.to_string(),
            y_multiplier: 1.0,
            log_y: false,
        })
    }

    pub fn with_y_multiplier(mut self, multiplier: f64) -> Self {
        self.y_multiplier = multiplier;
        self
    }

    pub fn with_log_y(mut self, log_y: bool) -> Self {
        self.log_y = log_y;
        self
    }
}

// ---------------------------------------------------------------------------
// Selection types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthSelection {
    #[default]
    All,
    /// Index into [`CursorPlot::unique_lengths`].
    Single(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlAxis {
    #[default]
    X,
    Y,
    Z,
}

impl ControlAxis {
    pub const ALL: [ControlAxis; 3] = [ControlAxis::X, ControlAxis::Y, ControlAxis::Z];

    fn slot(self) -> usize {
        match self {
            ControlAxis::X => 0,
            ControlAxis::Y => 1,
            ControlAxis::Z => 2,
        }
    }
}

impl fmt::Display for ControlAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlAxis::X => write!(f, "X"),
            ControlAxis::Y => write!(f, "Y"),
            ControlAxis::Z => write!(f, "Z"),
        }
    }
}

/// One polyline of the plot.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub length: f64,
    pub points: Vec<[f64; 2]>,
}

/// The point picked by the control axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    /// Index into the flat series.
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

// ---------------------------------------------------------------------------
// CursorPlot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CursorPlot {
    x: Vec<f64>,
    /// Already scaled by the y multiplier.
    y: Vec<f64>,
    z: Vec<f64>,
    length: Vec<f64>,
    unique_lengths: Vec<f64>,
    pub x_name: String,
    pub y_name: String,
    pub log_y: bool,
    pub length_selection: LengthSelection,
    pub control: ControlAxis,
    /// Target values for x, y and z.
    pub targets: [f64; 3],
}

impl CursorPlot {
    pub fn new(request: PlotRequest) -> Result<Self, CursorError> {
        let PlotRequest {
            x,
            y,
            z,
            length,
            x_name,
            y_name,
            y_multiplier,
            log_y,
        } = request;

        if x.len() != y.len() || x.len() != z.len() || x.len() != length.len() {
            return Err(CursorError::LengthMismatch {
                x: x.len(),
                y: y.len(),
                z: z.len(),
                length: length.len(),
            });
        }
        if x.is_empty() {
            return Err(CursorError::Empty);
        }

        let y: Vec<f64> = y.iter().map(|v| v * y_multiplier).collect();

        let mut unique_lengths: Vec<f64> = length.iter().copied().filter(|l| !l.is_nan()).collect();
        unique_lengths.sort_by(f64::total_cmp);
        unique_lengths.dedup();

        let targets = [
            format_for_box(mean(&x), BOX_DIGITS),
            format_for_box(mean(&y), BOX_DIGITS),
            format_for_box(mean(&z), BOX_DIGITS),
        ];

        Ok(CursorPlot {
            x,
            y,
            z,
            length,
            unique_lengths,
            x_name,
            y_name,
            log_y,
            length_selection: LengthSelection::All,
            control: ControlAxis::X,
            targets,
        })
    }

    /// Sorted distinct lengths.
    pub fn unique_lengths(&self) -> &[f64] {
        &self.unique_lengths
    }

    /// Dropdown labels: `"Show All"` then one `"x.xx μm"` per length.
    pub fn length_options(&self) -> Vec<String> {
        std::iter::once("Show All".to_string())
            .chain(self.unique_lengths.iter().map(|&l| micro_label(l)))
            .collect()
    }

    pub fn selected_length_label(&self) -> String {
        match self.selected_length() {
            Some(l) => micro_label(l),
            None => "Show All".to_string(),
        }
    }

    fn selected_length(&self) -> Option<f64> {
        match self.length_selection {
            LengthSelection::All => None,
            LengthSelection::Single(i) => self.unique_lengths.get(i).copied(),
        }
    }

    fn visible(&self, i: usize) -> bool {
        match self.selected_length() {
            None => true,
            Some(l) => same_length(self.length[i], l),
        }
    }

    /// One curve per visible length, points in series order.
    pub fn curves(&self) -> Vec<Curve> {
        let lengths: Vec<f64> = match self.selected_length() {
            Some(l) => vec![l],
            None => self.unique_lengths.clone(),
        };
        lengths
            .into_iter()
            .map(|l| Curve {
                length: l,
                points: (0..self.x.len())
                    .filter(|&i| same_length(self.length[i], l))
                    .map(|i| [self.x[i], self.y[i]])
                    .collect(),
            })
            .collect()
    }

    pub fn title(&self) -> String {
        match self.selected_length() {
            Some(l) => format!("{} vs {} for {}", self.y_name, self.x_name, micro_label(l)),
            None => {
                let lo = self.unique_lengths.first().copied().unwrap_or(f64::NAN) * 1e6;
                let hi = self.unique_lengths.last().copied().unwrap_or(f64::NAN) * 1e6;
                format!(
                    "{} vs {} (Lengths {lo:.2}-{hi:.2} μm)",
                    self.y_name, self.x_name
                )
            }
        }
    }

    /// Non-finite values leave the target unchanged.
    pub fn set_target(&mut self, axis: ControlAxis, value: f64) {
        if value.is_finite() {
            self.targets[axis.slot()] = value;
        }
    }

    pub fn target(&self, axis: ControlAxis) -> f64 {
        self.targets[axis.slot()]
    }

    /// Nearest visible point to the control axis target, without moving
    /// the targets. Points with a NaN on any axis are never picked.
    pub fn nearest(&self) -> Option<Selection> {
        let series = match self.control {
            ControlAxis::X => &self.x,
            ControlAxis::Y => &self.y,
            ControlAxis::Z => &self.z,
        };
        let target = self.target(self.control);
        let index = nearest_index(series, target, |i| {
            self.visible(i)
                && self.x[i].is_finite()
                && self.y[i].is_finite()
                && self.z[i].is_finite()
        })?;
        Some(Selection {
            index,
            x: self.x[index],
            y: self.y[index],
            z: self.z[index],
        })
    }

    /// Pick the nearest point and snap all three targets to it.
    pub fn select(&mut self) -> Option<Selection> {
        let selection = self.nearest()?;
        self.targets = [
            format_for_box(selection.x, BOX_DIGITS),
            format_for_box(selection.y, BOX_DIGITS),
            format_for_box(selection.z, BOX_DIGITS),
        ];
        Some(selection)
    }

    /// Legend lines for a selected point.
    pub fn readout(&self, selection: &Selection) -> [String; 3] {
        [
            format!("{}: {}", self.x_name, format_with_si(selection.x)),
            format!("{}: {}", self.y_name, format_with_si(selection.y)),
            format!("Vgs: {}", format_with_si(selection.z)),
        ]
    }
}

/// Index of the value closest to `target` among indices accepted by
/// `keep`. NaN values never win; ties go to the lowest index.
pub fn nearest_index(series: &[f64], target: f64, keep: impl Fn(usize) -> bool) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in series.iter().enumerate() {
        if !keep(i) {
            continue;
        }
        let dist = (v - target).abs();
        if dist.is_nan() {
            continue;
        }
        match best {
            Some((_, d)) if d <= dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}

fn same_length(a: f64, b: f64) -> bool {
    (a * 1e6 - b * 1e6).abs() < LENGTH_MATCH_UM
}

fn micro_label(length: f64) -> String {
    format!("{:.2} μm", length * 1e6)
}

/// Mean of the finite values; NaN when there are none.
fn mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return f64::NAN;
    }
    sum / count as f64
}

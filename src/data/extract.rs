use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, Array2};
use thiserror::Error;

use super::grid::{broadcast_rows, tile_length_to_match_data};
use super::model::{AxisRole, SweepColumn, SweepTable};
use crate::units::format_exp;

/// Default absolute tolerance when matching the `vds=` value of a column.
pub const DEFAULT_VDS_TOLERANCE: f64 = 1e-3;

/// Reserved series names for the helper arrays.
pub const LENGTHS_KEY: &str = "lengths";
pub const VGS_KEY: &str = "vgs";

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("No matching columns found for VDS ≈ {vds} (tolerance {tolerance})")]
    NoMatchingColumns { vds: f64, tolerance: f64 },

    #[error("No output variable could be assembled for VDS ≈ {vds}")]
    NoVariables { vds: f64 },

    #[error("Variable '{variable}' has shape {found:?}, expected {expected:?} (incomplete length sweep)")]
    ShapeMismatch {
        variable: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid VGS interval [{low}, {high}]")]
    InvalidInterval { low: f64, high: f64 },

    #[error("Invalid VDS tolerance {0}")]
    InvalidTolerance(f64),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    /// Inclusive `(low, high)` bound on the sweep axis.
    pub vgs_interval: Option<(f64, f64)>,
    pub vds_tolerance: f64,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            vgs_interval: None,
            vds_tolerance: DEFAULT_VDS_TOLERANCE,
        }
    }
}

impl ExtractOptions {
    fn validate(&self) -> Result<(), ExtractError> {
        if self.vds_tolerance.is_nan() || self.vds_tolerance < 0.0 {
            return Err(ExtractError::InvalidTolerance(self.vds_tolerance));
        }
        if let Some((low, high)) = self.vgs_interval {
            if low.is_nan() || high.is_nan() || low > high {
                return Err(ExtractError::InvalidInterval { low, high });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extraction – the reshaped result
// ---------------------------------------------------------------------------

/// Per-length arrays for one drain-source bias.
///
/// Every variable array is shaped `(lengths, sweep points)`; row `i`
/// belongs to `length_values[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub vds: f64,
    pub variables: BTreeMap<String, Array2<f64>>,
    /// Row `i` filled with `length_values[i]`.
    pub lengths: Array2<f64>,
    /// Every row equal to `vgs_values`.
    pub vgs: Array2<f64>,
    /// Sorted, distinct channel lengths.
    pub length_values: Array1<f64>,
    /// Sweep axis after the interval mask.
    pub vgs_values: Array1<f64>,
    /// Name of the column used as the sweep axis.
    pub sweep_column: String,
    /// `(variable, length)` pairs with no matching column.
    pub missing: Vec<(String, f64)>,
}

impl Extraction {
    /// `(lengths, sweep points)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.length_values.len(), self.vgs_values.len())
    }

    /// Look up a series by name; `"lengths"` and `"vgs"` resolve to the
    /// helper arrays.
    pub fn get(&self, name: &str) -> Option<&Array2<f64>> {
        match name {
            LENGTHS_KEY => Some(&self.lengths),
            VGS_KEY => Some(&self.vgs),
            _ => self.variables.get(name),
        }
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(|k| k.as_str())
    }

    /// Variables followed by the helper series, for axis selectors.
    pub fn series_names(&self) -> Vec<String> {
        self.variables
            .keys()
            .cloned()
            .chain([VGS_KEY.to_string(), LENGTHS_KEY.to_string()])
            .collect()
    }

    /// Whether every (variable, length) pair had a column.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Per-length presence of every variable seen in the output columns,
    /// including variables dropped for having no row at all.
    pub fn coverage(&self) -> Coverage {
        let names: BTreeSet<&str> = self
            .variables
            .keys()
            .map(|k| k.as_str())
            .chain(self.missing.iter().map(|(v, _)| v.as_str()))
            .collect();
        let variables = names
            .into_iter()
            .map(|name| {
                let present = self
                    .length_values
                    .iter()
                    .map(|&l| !self.missing.iter().any(|(v, m)| v == name && *m == l))
                    .collect();
                (name.to_string(), present)
            })
            .collect();
        Coverage {
            vds: self.vds,
            length_values: self.length_values.to_vec(),
            variables,
        }
    }
}

// ---------------------------------------------------------------------------
// Coverage – which (variable, length) pairs exist
// ---------------------------------------------------------------------------

/// Column availability for one drain-source bias, before any reshaping.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub vds: f64,
    /// Sorted, distinct channel lengths.
    pub length_values: Vec<f64>,
    /// `variables[name][i]` is true when `name` has a column at
    /// `length_values[i]`.
    pub variables: BTreeMap<String, Vec<bool>>,
}

impl Coverage {
    /// `(variable, length)` pairs without a column, variables in name order.
    pub fn gaps(&self) -> Vec<(String, f64)> {
        self.variables
            .iter()
            .flat_map(|(name, present)| {
                self.length_values
                    .iter()
                    .zip(present)
                    .filter(|(_, has)| !**has)
                    .map(move |(&l, _)| (name.clone(), l))
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.variables.values().all(|p| p.iter().all(|&has| has))
    }
}

/// Report which (variable, length) pairs have an output column at
/// `target_vds`, without reshaping. Works on ragged sweeps that
/// [`extract`] rejects with [`ExtractError::ShapeMismatch`].
pub fn coverage(
    table: &SweepTable,
    target_vds: f64,
    options: &ExtractOptions,
) -> Result<Coverage, ExtractError> {
    options.validate()?;
    let selected = select_columns(table, target_vds, options)?;
    let variables = selected
        .variables
        .iter()
        .map(|var| {
            let present = selected
                .length_labels
                .iter()
                .map(|label| selected.output_column(var, label).is_some())
                .collect();
            (var.to_string(), present)
        })
        .collect();
    Ok(Coverage {
        vds: target_vds,
        length_values: selected.length_values,
        variables,
    })
}

// ---------------------------------------------------------------------------
// Column selection shared by `extract` and `coverage`
// ---------------------------------------------------------------------------

struct SelectedColumns<'a> {
    reference: &'a SweepColumn,
    outputs: Vec<&'a SweepColumn>,
    length_values: Vec<f64>,
    /// `1.00e-06` spelling of each length.
    length_labels: Vec<String>,
    variables: BTreeSet<&'a str>,
}

impl<'a> SelectedColumns<'a> {
    fn output_column(&self, variable: &str, label: &str) -> Option<&'a SweepColumn> {
        self.outputs.iter().copied().find(|c| {
            c.key.as_ref().is_some_and(|k| {
                k.variable == variable && k.length.is_some_and(|l| format_exp(l, 2) == label)
            })
        })
    }
}

fn select_columns<'a>(
    table: &'a SweepTable,
    target_vds: f64,
    options: &ExtractOptions,
) -> Result<SelectedColumns<'a>, ExtractError> {
    let mut sweep_cols: Vec<&SweepColumn> = Vec::new();
    let mut outputs: Vec<&SweepColumn> = Vec::new();
    for (col, key) in table.keyed_columns() {
        if (key.vds - target_vds).abs() >= options.vds_tolerance {
            continue;
        }
        match key.role {
            AxisRole::Sweep => sweep_cols.push(col),
            AxisRole::Output => outputs.push(col),
        }
    }

    let Some(&reference) = sweep_cols.first() else {
        return Err(no_match(target_vds, options));
    };
    if outputs.is_empty() {
        return Err(no_match(target_vds, options));
    }

    let mut length_values: Vec<f64> = outputs
        .iter()
        .filter_map(|c| c.key.as_ref()?.length)
        .collect();
    length_values.sort_by(f64::total_cmp);
    length_values.dedup();
    let length_labels = length_values.iter().map(|&l| format_exp(l, 2)).collect();

    let variables = outputs
        .iter()
        .filter_map(|c| c.key.as_ref())
        .map(|k| k.variable.as_str())
        .filter(|v| !v.is_empty())
        .collect();

    Ok(SelectedColumns {
        reference,
        outputs,
        length_values,
        length_labels,
        variables,
    })
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Extract every output variable recorded at `target_vds` and reshape it
/// into `(length, sweep point)` arrays.
///
/// Column selection, in order:
/// 1. keep axis columns whose `vds` lies within `vds_tolerance`
/// 2. lengths and variable names come from the output (`Y`) columns
/// 3. the first sweep (`X`) column in table order is the reference axis
/// 4. one output column per (variable, length), matched on the length's
///    `1.00e-06` spelling
///
/// A (variable, length) pair without a column is skipped and recorded in
/// [`Extraction::missing`]; the resulting short array is then rejected
/// with [`ExtractError::ShapeMismatch`]. Use [`coverage`] to list the gaps
/// of such a sweep.
pub fn extract(
    table: &SweepTable,
    target_vds: f64,
    options: &ExtractOptions,
) -> Result<Extraction, ExtractError> {
    options.validate()?;

    let selected = select_columns(table, target_vds, options)?;
    let reference = selected.reference;

    // Row mask computed once from the reference axis.
    let mask: Vec<bool> = match options.vgs_interval {
        Some((low, high)) => reference
            .values
            .iter()
            .map(|&v| v >= low && v <= high)
            .collect(),
        None => vec![true; reference.values.len()],
    };
    let apply_mask = |values: &[f64]| -> Vec<f64> {
        values
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(&v, _)| v)
            .collect()
    };

    let vgs_values = Array1::from(apply_mask(&reference.values));
    let n_points = vgs_values.len();
    let expected = (selected.length_values.len(), n_points);

    let mut arrays = BTreeMap::new();
    let mut missing = Vec::new();
    for &var in &selected.variables {
        let mut rows: Vec<f64> = Vec::with_capacity(expected.0 * expected.1);
        let mut n_rows = 0;
        for (length, label) in selected.length_values.iter().zip(&selected.length_labels) {
            match selected.output_column(var, label) {
                Some(col) => {
                    rows.extend(apply_mask(&col.values));
                    n_rows += 1;
                }
                None => missing.push((var.to_string(), *length)),
            }
        }
        if n_rows == 0 {
            continue;
        }
        let found = (n_rows, rows.len() / n_rows);
        let array = Array2::from_shape_vec((n_rows, n_points), rows).map_err(|_| {
            ExtractError::ShapeMismatch {
                variable: var.to_string(),
                expected,
                found,
            }
        })?;
        arrays.insert(var.to_string(), array);
    }

    if !missing.is_empty() {
        log::warn!(
            "vds={target_vds}: {} (variable, length) pairs have no column: {:?}",
            missing.len(),
            missing
        );
    }

    if arrays.is_empty() {
        return Err(ExtractError::NoVariables { vds: target_vds });
    }
    for (name, array) in &arrays {
        if array.dim() != expected {
            return Err(ExtractError::ShapeMismatch {
                variable: name.clone(),
                expected,
                found: array.dim(),
            });
        }
    }

    let length_values = Array1::from(selected.length_values);
    let lengths = tile_length_to_match_data(length_values.view(), expected).map_err(|_| {
        ExtractError::ShapeMismatch {
            variable: LENGTHS_KEY.to_string(),
            expected,
            found: (length_values.len(), n_points),
        }
    })?;
    let vgs = broadcast_rows(vgs_values.view(), expected.0);

    log::debug!(
        "vds={target_vds}: {} variables x {} lengths x {} points (sweep axis '{}')",
        arrays.len(),
        expected.0,
        expected.1,
        reference.name
    );

    Ok(Extraction {
        vds: target_vds,
        variables: arrays,
        lengths,
        vgs,
        length_values,
        vgs_values,
        sweep_column: reference.name.clone(),
        missing,
    })
}

fn no_match(vds: f64, options: &ExtractOptions) -> ExtractError {
    ExtractError::NoMatchingColumns {
        vds,
        tolerance: options.vds_tolerance,
    }
}

/// Distinct `vds` values present in the table, ascending.
pub fn available_vds(table: &SweepTable) -> Vec<f64> {
    let mut values: Vec<f64> = table.keyed_columns().map(|(_, k)| k.vds).collect();
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() <= 1e-9 * b.abs().max(1.0));
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn col(name: &str, values: &[f64]) -> (String, Vec<f64>) {
        (name.to_string(), values.to_vec())
    }

    fn two_length_table() -> SweepTable {
        SweepTable::from_columns(vec![
            col("Id (length=2.00e-06,vds=5.00e-01) X", &[0.0, 0.5, 1.0]),
            col("Id (length=2.00e-06,vds=5.00e-01) Y", &[4.0, 5.0, 6.0]),
            col("Id (length=1.00e-06,vds=5.00e-01) X", &[0.0, 0.5, 1.0]),
            col("Id (length=1.00e-06,vds=5.00e-01) Y", &[1.0, 2.0, 3.0]),
            col("Id (length=1.00e-06,vds=1.00e+00) Y", &[9.0, 9.0, 9.0]),
        ])
    }

    #[test]
    fn rows_follow_sorted_lengths() {
        let ex = extract(&two_length_table(), 0.5, &ExtractOptions::default()).unwrap();
        assert_eq!(ex.length_values, array![1e-6, 2e-6]);
        assert_eq!(ex.variables["Id"], array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(ex.sweep_column, "Id (length=2.00e-06,vds=5.00e-01) X");
        assert!(ex.is_complete());
    }

    #[test]
    fn other_vds_is_ignored() {
        let ex = extract(&two_length_table(), 1.0, &ExtractOptions::default());
        // the vds=1.0 block has no sweep column
        assert!(matches!(ex, Err(ExtractError::NoMatchingColumns { .. })));
    }

    #[test]
    fn interval_masks_every_series() {
        let options = ExtractOptions {
            vgs_interval: Some((0.4, 1.0)),
            ..Default::default()
        };
        let ex = extract(&two_length_table(), 0.5, &options).unwrap();
        assert_eq!(ex.vgs_values, array![0.5, 1.0]);
        assert_eq!(ex.variables["Id"], array![[2.0, 3.0], [5.0, 6.0]]);
        assert_eq!(ex.vgs, array![[0.5, 1.0], [0.5, 1.0]]);
        assert_eq!(ex.lengths, array![[1e-6, 1e-6], [2e-6, 2e-6]]);
    }

    #[test]
    fn reserved_keys_resolve_to_helpers() {
        let ex = extract(&two_length_table(), 0.5, &ExtractOptions::default()).unwrap();
        assert_eq!(ex.get("vgs"), Some(&ex.vgs));
        assert_eq!(ex.get("lengths"), Some(&ex.lengths));
        assert!(ex.get("gm").is_none());
        assert_eq!(ex.series_names(), vec!["Id", "vgs", "lengths"]);
    }

    #[test]
    fn bad_options_are_rejected() {
        let table = two_length_table();
        let inverted = ExtractOptions {
            vgs_interval: Some((1.0, 0.0)),
            ..Default::default()
        };
        assert_eq!(
            extract(&table, 0.5, &inverted),
            Err(ExtractError::InvalidInterval {
                low: 1.0,
                high: 0.0
            })
        );
        let negative = ExtractOptions {
            vds_tolerance: -1.0,
            ..Default::default()
        };
        assert_eq!(
            extract(&table, 0.5, &negative),
            Err(ExtractError::InvalidTolerance(-1.0))
        );
    }

    #[test]
    fn outputs_without_length_assemble_nothing() {
        let table = SweepTable::from_columns(vec![
            col("vgs (vds=5.00e-01) X", &[0.0, 1.0]),
            col("Id (vds=5.00e-01) Y", &[1.0, 2.0]),
        ]);
        assert_eq!(
            extract(&table, 0.5, &ExtractOptions::default()),
            Err(ExtractError::NoVariables { vds: 0.5 })
        );
    }

    #[test]
    fn variable_without_lengths_is_reported_missing() {
        let table = SweepTable::from_columns(vec![
            col("Id (length=1.00e-06,vds=5.00e-01) X", &[0.0, 1.0]),
            col("Id (length=1.00e-06,vds=5.00e-01) Y", &[1.0, 2.0]),
            col("Id (length=2.00e-06,vds=5.00e-01) Y", &[3.0, 4.0]),
            col("gm (vds=5.00e-01) Y", &[5.0, 6.0]),
        ]);
        let ex = extract(&table, 0.5, &ExtractOptions::default()).unwrap();
        assert!(!ex.is_complete());
        assert_eq!(ex.variable_names().collect::<Vec<_>>(), vec!["Id"]);
        assert_eq!(
            ex.missing,
            vec![("gm".to_string(), 1e-6), ("gm".to_string(), 2e-6)]
        );

        let cov = ex.coverage();
        assert_eq!(cov.variables["Id"], vec![true, true]);
        assert_eq!(cov.variables["gm"], vec![false, false]);
        assert_eq!(cov.gaps(), ex.missing);
    }

    #[test]
    fn coverage_matches_extract_on_complete_sweeps() {
        let table = two_length_table();
        let options = ExtractOptions::default();
        let cov = coverage(&table, 0.5, &options).unwrap();
        assert!(cov.is_complete());
        assert_eq!(cov, extract(&table, 0.5, &options).unwrap().coverage());
        assert!(matches!(
            coverage(&table, 2.0, &options),
            Err(ExtractError::NoMatchingColumns { .. })
        ));
    }

    #[test]
    fn lists_available_vds() {
        assert_eq!(available_vds(&two_length_table()), vec![0.5, 1.0]);
    }
}

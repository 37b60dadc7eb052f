//! End-to-end tests for sweep extraction and the helpers built on it.

use std::cell::RefCell;

use approx::assert_relative_eq;
use gmid_viewer::cursor::{ControlAxis, CursorPlot, LengthSelection, PlotRequest};
use gmid_viewer::data::grid::tile_length_to_match_data;
use gmid_viewer::data::{coverage, extract, ExtractError, ExtractOptions, SweepTable};
use gmid_viewer::units::format_exp;

const VGS: [f64; 5] = [0.0, 0.3, 0.6, 0.9, 1.2];

fn name(variable: &str, length: f64, vds: f64, marker: char) -> String {
    format!(
        "{variable} (length={},vds={}) {marker}",
        format_exp(length, 2),
        format_exp(vds, 2)
    )
}

/// Build a table holding `variables` at every length for every vds.
/// Values encode (variable index, length index, point) so rows can be
/// traced back to their source column.
fn sweep_table(variables: &[&str], lengths: &[f64], vds: &[f64]) -> SweepTable {
    let mut columns = Vec::new();
    for &v in vds {
        for (vi, var) in variables.iter().enumerate() {
            for (li, &l) in lengths.iter().enumerate() {
                columns.push((name(var, l, v, 'X'), VGS.to_vec()));
                let values = (0..VGS.len())
                    .map(|p| (vi * 100 + li * 10 + p) as f64 + v)
                    .collect();
                columns.push((name(var, l, v, 'Y'), values));
            }
        }
    }
    SweepTable::from_columns(columns)
}

// ── Log capture ───────────────────────────────────────────────────

thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

struct Capture;

impl log::Log for Capture {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        RECORDS.with(|r| {
            r.borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;

/// Run `f` and return the warnings it logged on this thread.
fn warnings_from(f: impl FnOnce()) -> Vec<String> {
    let _ = log::set_logger(&CAPTURE);
    log::set_max_level(log::LevelFilter::Warn);
    RECORDS.with(|r| r.borrow_mut().clear());
    f();
    RECORDS.with(|r| {
        r.borrow()
            .iter()
            .filter(|(level, _)| *level == log::Level::Warn)
            .map(|(_, msg)| msg.clone())
            .collect()
    })
}

// ── Core scenario ─────────────────────────────────────────────────

#[test]
fn test_two_lengths_single_variable() {
    let columns = vec![
        (name("Id", 1e-6, 0.5, 'X'), VGS.to_vec()),
        (name("Id", 1e-6, 0.5, 'Y'), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
        (name("Id", 2e-6, 0.5, 'Y'), vec![6.0, 7.0, 8.0, 9.0, 10.0]),
    ];
    let table = SweepTable::from_columns(columns);
    let ex = extract(&table, 0.5, &ExtractOptions::default()).unwrap();

    assert_eq!(ex.length_values.to_vec(), vec![1e-6, 2e-6]);
    assert_eq!(ex.variables["Id"].dim(), (2, VGS.len()));
    assert_eq!(ex.variables["Id"].row(1).to_vec(), vec![6.0, 7.0, 8.0, 9.0, 10.0]);
    assert_eq!(ex.vds, 0.5);
}

#[test]
fn test_no_matching_vds_is_an_error() {
    let table = sweep_table(&["Id"], &[1e-6], &[0.5]);
    assert_eq!(
        extract(&table, 1.5, &ExtractOptions::default()),
        Err(ExtractError::NoMatchingColumns {
            vds: 1.5,
            tolerance: 1e-3
        })
    );
}

#[test]
fn test_vds_tolerance_is_absolute() {
    let table = sweep_table(&["Id"], &[1e-6], &[0.5]);
    assert!(extract(&table, 0.5009, &ExtractOptions::default()).is_ok());
    assert!(extract(&table, 0.502, &ExtractOptions::default()).is_err());

    let wide = ExtractOptions {
        vds_tolerance: 0.01,
        ..Default::default()
    };
    assert!(extract(&table, 0.502, &wide).is_ok());
}

// ── Invariants ────────────────────────────────────────────────────

#[test]
fn test_lengths_sorted_and_deduplicated() {
    // same length listed twice, out of order
    let table = sweep_table(&["gm", "Id"], &[2e-6, 5e-7, 1e-6], &[0.5]);
    let mut columns: Vec<(String, Vec<f64>)> = table
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.values.clone()))
        .collect();
    columns.push((name("Id", 5e-7, 0.5, 'Y'), vec![0.0; VGS.len()]));
    let table = SweepTable::from_columns(columns);

    let ex = extract(&table, 0.5, &ExtractOptions::default()).unwrap();
    assert_eq!(ex.length_values.to_vec(), vec![5e-7, 1e-6, 2e-6]);
    // first matching column wins for the duplicate
    assert_eq!(ex.variables["Id"][[0, 0]], 110.5);
}

#[test]
fn test_every_variable_shares_shape_and_row_order() {
    let lengths = [3e-6, 1e-6, 2e-6];
    let table = sweep_table(&["Id", "gm", "gds"], &lengths, &[0.5, 1.0]);
    let ex = extract(&table, 1.0, &ExtractOptions::default()).unwrap();

    assert_eq!(ex.variable_names().collect::<Vec<_>>(), vec!["Id", "gds", "gm"]);
    for (vi, var) in ["Id", "gm", "gds"].iter().enumerate() {
        let array = &ex.variables[*var];
        assert_eq!(array.dim(), (3, VGS.len()));
        // sorted row i corresponds to input index of that length
        for (row, input_index) in [1usize, 2, 0].iter().enumerate() {
            assert_eq!(array[[row, 0]], (vi * 100 + input_index * 10) as f64 + 1.0);
        }
    }
}

#[test]
fn test_helpers_match_lengths_and_vgs() {
    let table = sweep_table(&["Id"], &[1e-6, 2e-6, 4e-6], &[0.5]);
    let options = ExtractOptions {
        vgs_interval: Some((0.3, 0.9)),
        ..Default::default()
    };
    let ex = extract(&table, 0.5, &options).unwrap();

    assert_eq!(ex.vgs_values.to_vec(), vec![0.3, 0.6, 0.9]);
    for (i, row) in ex.lengths.rows().into_iter().enumerate() {
        assert!(row.iter().all(|&l| l == ex.length_values[i]));
    }
    for row in ex.vgs.rows() {
        assert_eq!(row, ex.vgs_values.view());
    }
    assert_eq!(ex.variables["Id"].dim(), (3, 3));
    assert_eq!(ex.variables["Id"][[0, 0]], 1.5);
}

#[test]
fn test_extract_is_deterministic() {
    let table = sweep_table(&["Id", "gm"], &[1e-6, 2e-6], &[0.5]);
    let options = ExtractOptions {
        vgs_interval: Some((0.0, 0.6)),
        ..Default::default()
    };
    let a = extract(&table, 0.5, &options).unwrap();
    let b = extract(&table, 0.5, &options).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_tiling_reproduces_lengths_helper() {
    let table = sweep_table(&["Id"], &[1e-6, 2e-6], &[0.5]);
    let ex = extract(&table, 0.5, &ExtractOptions::default()).unwrap();
    let tiled = tile_length_to_match_data(ex.length_values.view(), ex.variables["Id"].dim()).unwrap();
    assert_eq!(tiled, ex.lengths);
}

// ── Partial coverage ──────────────────────────────────────────────

#[test]
fn test_missing_length_is_a_shape_mismatch() {
    let columns = vec![
        (name("Id", 1e-6, 0.5, 'X'), VGS.to_vec()),
        (name("Id", 1e-6, 0.5, 'Y'), vec![1.0; 5]),
        (name("Id", 2e-6, 0.5, 'Y'), vec![2.0; 5]),
        (name("gm", 1e-6, 0.5, 'Y'), vec![3.0; 5]),
    ];
    let table = SweepTable::from_columns(columns);
    assert_eq!(
        extract(&table, 0.5, &ExtractOptions::default()),
        Err(ExtractError::ShapeMismatch {
            variable: "gm".to_string(),
            expected: (2, 5),
            found: (1, 5),
        })
    );
}

#[test]
fn test_coverage_lists_gaps_of_ragged_sweep() {
    let columns = vec![
        (name("Id", 1e-6, 0.5, 'X'), VGS.to_vec()),
        (name("Id", 1e-6, 0.5, 'Y'), vec![1.0; 5]),
        (name("Id", 2e-6, 0.5, 'Y'), vec![2.0; 5]),
        (name("gm", 1e-6, 0.5, 'Y'), vec![3.0; 5]),
        (name("ro", 2e-6, 0.5, 'Y'), vec![4.0; 5]),
    ];
    let table = SweepTable::from_columns(columns);
    assert!(extract(&table, 0.5, &ExtractOptions::default()).is_err());

    let cov = coverage(&table, 0.5, &ExtractOptions::default()).unwrap();
    assert!(!cov.is_complete());
    assert_eq!(cov.length_values, vec![1e-6, 2e-6]);
    assert_eq!(cov.variables["Id"], vec![true, true]);
    assert_eq!(
        cov.gaps(),
        vec![("gm".to_string(), 2e-6), ("ro".to_string(), 1e-6)]
    );
}

#[test]
fn test_dropped_variable_is_logged_and_reported() {
    let columns = vec![
        (name("Id", 1e-6, 0.5, 'X'), VGS.to_vec()),
        (name("Id", 1e-6, 0.5, 'Y'), vec![1.0; 5]),
        (name("Id", 2e-6, 0.5, 'Y'), vec![2.0; 5]),
        ("gm (vds=5.00e-01) Y".to_string(), vec![3.0; 5]),
    ];
    let table = SweepTable::from_columns(columns);

    let mut result = None;
    let warnings = warnings_from(|| result = Some(extract(&table, 0.5, &ExtractOptions::default())));
    let ex = result.unwrap().unwrap();

    assert!(!ex.is_complete());
    assert_eq!(ex.variables["Id"].dim(), (2, VGS.len()));
    assert!(!ex.variables.contains_key("gm"));
    assert_eq!(ex.missing, vec![("gm".to_string(), 1e-6), ("gm".to_string(), 2e-6)]);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("2 (variable, length) pairs"), "{}", warnings[0]);
}

#[test]
fn test_complete_sweep_logs_no_warning() {
    let table = sweep_table(&["Id", "gm"], &[1e-6, 2e-6], &[0.5]);
    let mut result = None;
    let warnings = warnings_from(|| result = Some(extract(&table, 0.5, &ExtractOptions::default())));
    assert!(result.unwrap().unwrap().is_complete());
    assert!(warnings.is_empty());
}

#[test]
fn test_node_style_variables_and_foreign_columns() {
    let columns = vec![
        ("time".to_string(), vec![0.0, 1.0, 2.0, 3.0, 4.0]),
        (name("N0:1", 1e-6, 0.5, 'X'), VGS.to_vec()),
        (name("N0:1", 1e-6, 0.5, 'Y'), vec![5.0; 5]),
        ("(length=1.00e-06,vds=5.00e-01) Y".to_string(), vec![9.0; 5]),
    ];
    let table = SweepTable::from_columns(columns);
    let ex = extract(&table, 0.5, &ExtractOptions::default()).unwrap();
    assert_eq!(ex.variable_names().collect::<Vec<_>>(), vec!["N0:1"]);
}

#[test]
fn test_interval_excluding_everything_gives_empty_rows() {
    let table = sweep_table(&["Id"], &[1e-6], &[0.5]);
    let options = ExtractOptions {
        vgs_interval: Some((5.0, 6.0)),
        ..Default::default()
    };
    let ex = extract(&table, 0.5, &options).unwrap();
    assert_eq!(ex.shape(), (1, 0));
    assert_eq!(ex.variables["Id"].dim(), (1, 0));
}

// ── Plot entry point ──────────────────────────────────────────────

#[test]
fn test_cursor_plot_from_extraction() {
    let table = sweep_table(&["Id", "gm"], &[1e-6, 2e-6], &[0.5]);
    let ex = extract(&table, 0.5, &ExtractOptions::default()).unwrap();
    let request = PlotRequest::from_extraction(&ex, "vgs", "gm")
        .unwrap()
        .with_y_multiplier(2.0);
    let mut plot = CursorPlot::new(request).unwrap();

    assert_eq!(plot.unique_lengths(), &[1e-6, 2e-6]);
    plot.length_selection = LengthSelection::Single(1);
    plot.control = ControlAxis::Z;
    plot.set_target(ControlAxis::Z, 0.62);
    let sel = plot.select().unwrap();

    // second length row, third sweep point
    assert_eq!(sel.index, VGS.len() + 2);
    assert_relative_eq!(sel.x, 0.6);
    assert_relative_eq!(sel.y, 2.0 * (100.0 + 10.0 + 2.0 + 0.5));
    assert_relative_eq!(plot.target(ControlAxis::Y), 225.0);
}

#[test]
fn test_unknown_series_is_rejected() {
    let table = sweep_table(&["Id"], &[1e-6], &[0.5]);
    let ex = extract(&table, 0.5, &ExtractOptions::default()).unwrap();
    assert!(PlotRequest::from_extraction(&ex, "vgs", "ft").is_err());
}

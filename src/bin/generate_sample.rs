use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use gmid_viewer::data::{AxisRole, ColumnKey};
use parquet::arrow::ArrowWriter;

/// Write a synthetic gm/Id sweep export (.csv and .parquet).
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Cli {
    /// Output path without extension
    #[arg(long, default_value = "sample_sweep")]
    out: PathBuf,

    /// VGS step in volts
    #[arg(long, default_value_t = 0.01)]
    step: f64,
}

const THERMAL_VOLTAGE: f64 = 0.0258;
const SLOPE_FACTOR: f64 = 1.3;
const MU_COX: f64 = 300e-6;
const WIDTH: f64 = 1e-6;

const LENGTHS: [f64; 4] = [1.5e-7, 5e-7, 1e-6, 2e-6];
const VDS: [f64; 3] = [0.3, 0.6, 0.9];
const VGS_MAX: f64 = 1.2;

/// Small-signal quantities of one bias point from a charge-based
/// (EKV-style) interpolation between weak and strong inversion.
struct OperatingPoint {
    id: f64,
    gm: f64,
    gds: f64,
}

fn operating_point(vgs: f64, vds: f64, length: f64) -> OperatingPoint {
    let vth = 0.4 + 2e-9 / length;
    let lambda = 0.05e-6 / length;
    let spec_current = 2.0 * SLOPE_FACTOR * MU_COX * (WIDTH / length) * THERMAL_VOLTAGE.powi(2);

    let u = (vgs - vth) / (2.0 * SLOPE_FACTOR * THERMAL_VOLTAGE);
    let softplus = u.exp().ln_1p();
    let sigmoid = 1.0 / (1.0 + (-u).exp());
    let clm = 1.0 + lambda * vds;

    let ic = softplus.powi(2);
    OperatingPoint {
        id: spec_current * ic * clm,
        gm: spec_current * clm * 2.0 * softplus * sigmoid / (2.0 * SLOPE_FACTOR * THERMAL_VOLTAGE),
        gds: spec_current * ic * lambda,
    }
}

fn column_name(variable: &str, length: f64, vds: f64, role: AxisRole) -> String {
    ColumnKey {
        variable: variable.to_string(),
        length: Some(length),
        vds,
        role,
    }
    .to_string()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let n_points = (VGS_MAX / cli.step).round() as usize + 1;
    let vgs: Vec<f64> = (0..n_points).map(|i| i as f64 * cli.step).collect();

    let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
    for &vds in &VDS {
        for variable in ["Id", "gm", "gds", "gm/Id"] {
            for &length in &LENGTHS {
                let values: Vec<f64> = vgs
                    .iter()
                    .map(|&v| {
                        let op = operating_point(v, vds, length);
                        match variable {
                            "Id" => op.id,
                            "gm" => op.gm,
                            "gds" => op.gds,
                            _ => op.gm / op.id,
                        }
                    })
                    .collect();
                columns.push((column_name(variable, length, vds, AxisRole::Sweep), vgs.clone()));
                columns.push((column_name(variable, length, vds, AxisRole::Output), values));
            }
        }
    }

    log::info!("{} series x {n_points} points", columns.len());

    // CSV
    let csv_path = cli.out.with_extension("csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    writer.write_record(columns.iter().map(|(name, _)| name.as_str()))?;
    for row in 0..n_points {
        writer.write_record(columns.iter().map(|(_, values)| values[row].to_string()))?;
    }
    writer.flush()?;

    // Parquet
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, _)| Field::new(name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .map(|(_, values)| Arc::new(Float64Array::from(values.clone())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let parquet_path = cli.out.with_extension("parquet");
    let file = std::fs::File::create(&parquet_path)
        .with_context(|| format!("creating {}", parquet_path.display()))?;
    let mut parquet_writer = ArrowWriter::try_new(file, schema, None)?;
    parquet_writer.write(&batch)?;
    parquet_writer.close()?;

    let preview = batch.project(&[0, 1, 3])?.slice(0, n_points.min(5));
    println!("{}", pretty_format_batches(&[preview])?);
    println!(
        "Wrote {} series x {n_points} points to {} and {}",
        columns.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::SweepTable;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sweep export from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row of series names, one row per sweep point
/// * `.parquet` – one numeric column per series
/// * `.json`    – `{ "<series>": [...], ... }` or pandas `orient="columns"`
pub fn load_file(path: &Path) -> Result<SweepTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} columns x {} rows ({} sweep series) from {}",
        table.num_columns(),
        table.len(),
        table.keyed_columns().count(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with series names such as
/// `Id (length=1.00e-06,vds=5.00e-01) Y`; each following row holds one
/// sweep point. Names contain commas, so header fields are quoted.
/// Empty fields become `NaN`.
pub fn load_csv(path: &Path) -> Result<SweepTable> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;
    read_csv(reader)
}

/// Parse CSV text already in memory.
pub fn parse_csv(text: &str) -> Result<SweepTable> {
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<SweepTable> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        bail!("CSV has no header row");
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > headers.len() {
            bail!(
                "CSV row {row_no}: {} fields but only {} columns",
                record.len(),
                headers.len()
            );
        }
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let value = parse_cell(record.get(col_idx).unwrap_or(""))
                .with_context(|| format!("CSV row {row_no}, column '{}'", headers[col_idx]))?;
            column.push(value);
        }
    }

    Ok(SweepTable::from_columns(headers.into_iter().zip(columns)))
}

fn parse_cell(s: &str) -> Result<f64> {
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .with_context(|| format!("'{s}' is not a number"))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema, either plain arrays
///
/// ```json
/// { "Id (length=1.00e-06,vds=5.00e-01) Y": [1e-9, 2e-9, ...], ... }
/// ```
///
/// or the pandas default `df.to_json()` (`orient="columns"`), where every
/// series is an object keyed by row index. `null` becomes `NaN`.
pub fn load_json(path: &Path) -> Result<SweepTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub fn parse_json(text: &str) -> Result<SweepTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let object = root
        .as_object()
        .context("Expected top-level JSON object of series")?;

    let mut columns = Vec::with_capacity(object.len());
    for (name, series) in object {
        let values = match series {
            JsonValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| json_number(v).with_context(|| format!("'{name}'[{i}]")))
                .collect::<Result<Vec<f64>>>()?,
            JsonValue::Object(cells) => {
                let mut indexed = cells
                    .iter()
                    .map(|(idx, v)| {
                        let idx: usize = idx
                            .parse()
                            .with_context(|| format!("'{name}': row index '{idx}' is not an integer"))?;
                        let value = json_number(v).with_context(|| format!("'{name}'[{idx}]"))?;
                        Ok((idx, value))
                    })
                    .collect::<Result<Vec<(usize, f64)>>>()?;
                indexed.sort_by_key(|(idx, _)| *idx);
                indexed.into_iter().map(|(_, v)| v).collect()
            }
            _ => bail!("Series '{name}' is neither an array nor an object"),
        };
        columns.push((name.clone(), values));
    }

    Ok(SweepTable::from_columns(columns))
}

fn json_number(v: &JsonValue) -> Result<f64> {
    match v {
        JsonValue::Null => Ok(f64::NAN),
        other => other.as_f64().context("not a number"),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one numeric column per series
/// (Float64, Float32, Int64 or Int32; nulls become `NaN`).
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
pub fn load_parquet(path: &Path) -> Result<SweepTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (idx, column) in columns.iter_mut().enumerate() {
            let values = numeric_values(batch.column(idx))
                .with_context(|| format!("column '{}'", names[idx]))?;
            column.extend(values);
        }
    }

    Ok(SweepTable::from_columns(names.into_iter().zip(columns)))
}

// -- Parquet / Arrow helpers --

fn numeric_values(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    let values = match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect(),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .context("expected Float32Array")?
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect(),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .iter()
            .map(|v| v.map(|i| i as f64).unwrap_or(f64::NAN))
            .collect(),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .iter()
            .map(|v| v.map(f64::from).unwrap_or(f64::NAN))
            .collect(),
        other => bail!("expected a numeric column, got {other:?}"),
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_become_columns() {
        let text = r#""Id (length=1.00e-06,vds=5.00e-01) X","Id (length=1.00e-06,vds=5.00e-01) Y"
0.0,1e-9
0.5,
1.0,3e-6
"#;
        let table = parse_csv(text).unwrap();
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.len(), 3);
        let y = &table.columns()[1].values;
        assert_eq!(y[0], 1e-9);
        assert!(y[1].is_nan());
        assert_eq!(table.keyed_columns().count(), 2);
    }

    #[test]
    fn csv_rejects_text_cells() {
        let err = parse_csv("a,b\n1.0,oops\n").unwrap_err();
        assert!(format!("{err:#}").contains("oops"));
    }

    #[test]
    fn json_arrays_and_pandas_columns() {
        let table = parse_json(r#"{"a": [1.0, null, 3], "b": {"1": 20.0, "0": 10.0}}"#).unwrap();
        assert_eq!(table.len(), 3);
        let a = &table.column("a").unwrap().values;
        assert_eq!(a[0], 1.0);
        assert!(a[1].is_nan());
        let b = &table.column("b").unwrap().values;
        assert_eq!(&b[..2], &[10.0, 20.0]);
        assert!(b[2].is_nan());
    }

    #[test]
    fn json_rejects_scalars() {
        assert!(parse_json(r#"{"a": 1.0}"#).is_err());
        assert!(parse_json("[1, 2]").is_err());
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let err = load_file(Path::new("sweep.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }
}

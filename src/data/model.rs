use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static VDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"vds=([0-9.eE+-]+)").expect("valid vds pattern"));
static LENGTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"length=([0-9.eE+-]+)").expect("valid length pattern"));
static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^()]+").expect("valid variable pattern"));

// ---------------------------------------------------------------------------
// AxisRole – trailing marker of a column name
// ---------------------------------------------------------------------------

/// Whether a column holds the swept independent axis or a dependent output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    /// Trailing ` X`: the gate-voltage sweep axis.
    Sweep,
    /// Trailing ` Y`: a dependent output series.
    Output,
}

impl AxisRole {
    fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(" X") {
            Some(AxisRole::Sweep)
        } else if name.ends_with(" Y") {
            Some(AxisRole::Output)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnKey – sweep metadata embedded in a column name
// ---------------------------------------------------------------------------

/// Parsed form of a name like `"Id (length=1.00e-06,vds=5.00e-01) Y"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnKey {
    /// Text before the parameter block, trimmed. May be empty.
    pub variable: String,
    /// Channel length, if the name carries `length=`.
    pub length: Option<f64>,
    pub vds: f64,
    pub role: AxisRole,
}

impl ColumnKey {
    /// Parse a column name. Returns `None` for columns that carry no axis
    /// marker or no readable `vds=` value; extraction ignores those.
    pub fn parse(name: &str) -> Option<Self> {
        let role = AxisRole::from_name(name)?;
        let vds = capture_f64(&VDS_RE, name)?;
        let length = capture_f64(&LENGTH_RE, name);
        let variable = VARIABLE_RE
            .find(name)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Some(ColumnKey {
            variable,
            length,
            vds,
            role,
        })
    }
}

fn capture_f64(re: &Regex, name: &str) -> Option<f64> {
    re.captures(name)?.get(1)?.as_str().parse::<f64>().ok()
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.role {
            AxisRole::Sweep => "X",
            AxisRole::Output => "Y",
        };
        match self.length {
            Some(l) => write!(
                f,
                "{} (length={},vds={}) {marker}",
                self.variable,
                crate::units::format_exp(l, 2),
                crate::units::format_exp(self.vds, 2)
            ),
            None => write!(
                f,
                "{} (vds={}) {marker}",
                self.variable,
                crate::units::format_exp(self.vds, 2)
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// SweepColumn – one named series
// ---------------------------------------------------------------------------

/// A single named column of the source table.
#[derive(Debug, Clone)]
pub struct SweepColumn {
    pub name: String,
    pub values: Vec<f64>,
    /// Parsed metadata, built once at load time.
    pub key: Option<ColumnKey>,
}

// ---------------------------------------------------------------------------
// SweepTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Ordered table of named columns with rows aligned by position.
#[derive(Debug, Clone, Default)]
pub struct SweepTable {
    columns: Vec<SweepColumn>,
    rows: usize,
}

impl SweepTable {
    /// Build a table from `(name, values)` pairs, keeping their order.
    /// Short columns are padded with `NaN` so every column has the same
    /// number of rows.
    pub fn from_columns<I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let mut columns: Vec<SweepColumn> = columns
            .into_iter()
            .map(|(name, values)| {
                let key = ColumnKey::parse(&name);
                SweepColumn { name, values, key }
            })
            .collect();

        let rows = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for col in &mut columns {
            col.values.resize(rows, f64::NAN);
        }

        SweepTable { columns, rows }
    }

    /// Number of rows (sweep points).
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[SweepColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// First column with the given name.
    pub fn column(&self, name: &str) -> Option<&SweepColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns whose name parsed into a [`ColumnKey`].
    pub fn keyed_columns(&self) -> impl Iterator<Item = (&SweepColumn, &ColumnKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.key.as_ref().map(|k| (c, k)))
    }
}

//! Data layer: sweep tables, loading, and extraction.
//!
//! Architecture:
//! ```text
//!  .csv / .parquet / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → SweepTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌────────────┐
//!   │ SweepTable │  named columns + parsed ColumnKey per column
//!   └────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ extract   │  vds filter, vgs mask → Extraction (length × vgs arrays)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  grid     │  tiling / flattening for the plot series
//!   └──────────┘
//! ```

pub mod extract;
pub mod grid;
pub mod loader;
pub mod model;

pub use extract::{
    available_vds, coverage, extract, Coverage, ExtractError, ExtractOptions, Extraction,
};
pub use model::{AxisRole, ColumnKey, SweepColumn, SweepTable};

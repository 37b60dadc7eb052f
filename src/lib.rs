//! Extraction and cross-hair plotting of gm/Id sweep exports.
//!
//! A sweep export is a table whose column names carry the series
//! metadata, e.g. `Id (length=1.00e-06,vds=5.00e-01) Y`. [`data::extract`]
//! selects one drain-source bias and reshapes every output variable into a
//! `(length, vgs)` array; [`cursor`] drives the interactive readout on top
//! of the flattened arrays.

pub mod config;
pub mod cursor;
pub mod data;
pub mod units;

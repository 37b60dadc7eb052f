//! Number formatting and small gm/Id helpers used by the readouts.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UnitsError {
    #[error("Invalid device type '{0}'. Use 'nmos' or 'pmos'.")]
    InvalidDeviceType(String),
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Exponential notation with `precision` decimals and a signed, two-digit
/// exponent, e.g. `format_exp(1e-6, 2) == "1.00e-06"`. This is the form the
/// simulator writes into column names.
pub fn format_exp(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    let raw = format!("{value:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

/// General format with `sig` significant digits, trailing zeros removed:
/// fixed notation for exponents in `-4..sig`, exponential otherwise.
pub fn format_general(value: f64, sig: usize) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{value}");
    }
    let sig = sig.max(1);
    // The exponent after rounding decides the notation.
    let exp = decimal_exponent(value, sig);
    if exp < -4 || exp >= sig as i32 {
        let s = format_exp(value, sig - 1);
        match s.split_once('e') {
            Some((mantissa, e)) => format!("{}e{e}", trim_fraction(mantissa)),
            None => s,
        }
    } else {
        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn decimal_exponent(value: f64, sig: usize) -> i32 {
    let raw = format!("{:.*e}", sig - 1, value);
    raw.split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0)
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

const SI_PREFIXES: [(i32, &str); 11] = [
    (-15, "f"),
    (-12, "p"),
    (-9, "n"),
    (-6, "µ"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
    (15, "P"),
];

/// Format with an engineering SI prefix and 3 significant digits,
/// e.g. `2.5e-6 -> "2.5µ"`. Exponents outside femto..peta are clamped.
pub fn format_with_si(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return format!("{value}");
    }
    let exp = ((value.abs().log10() / 3.0).floor() as i32 * 3).clamp(-15, 15);
    let prefix = SI_PREFIXES
        .iter()
        .find(|(e, _)| *e == exp)
        .map(|(_, p)| *p)
        .unwrap_or("");
    let scaled = value / 10f64.powi(exp);
    format!("{}{prefix}", format_general(scaled, 3))
}

/// Round a value for the numeric target fields.
///
/// Between `1e-3` and `1e5` this keeps `sig` significant digits. Outside
/// that range it keeps `sig` digits after the mantissa point, so
/// `sig + 1` significant digits.
pub fn format_for_box(value: f64, sig: usize) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return if value.is_finite() { 0.0 } else { value };
    }
    let exp = value.abs().log10().floor() as i32;
    let decimals = if !(-3..=4).contains(&exp) {
        sig
    } else {
        sig.max(1) - 1
    };
    format!("{value:.decimals$e}").parse().unwrap_or(value)
}

// ---------------------------------------------------------------------------
// Unit scaling
// ---------------------------------------------------------------------------

/// Scale a resistance into Ω / kΩ / MΩ / GΩ.
pub fn display_resistance(ro: f64) -> (f64, &'static str) {
    if ro < 1e3 {
        (ro, "Ω")
    } else if ro < 1e6 {
        (ro / 1e3, "kΩ")
    } else if ro < 1e9 {
        (ro / 1e6, "MΩ")
    } else {
        (ro / 1e9, "GΩ")
    }
}

/// Scale a drain current into nA / μA / mA.
pub fn display_current(id: f64) -> (f64, &'static str) {
    if id < 1e-6 {
        (id * 1e9, "nA")
    } else if id < 1e-3 {
        (id * 1e6, "μA")
    } else {
        (id * 1e3, "mA")
    }
}

pub fn db_to_linear(av_db: f64) -> f64 {
    10f64.powf(av_db / 20.0)
}

// ---------------------------------------------------------------------------
// Inversion region
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceType {
    #[default]
    Nmos,
    Pmos,
}

impl DeviceType {
    pub const ALL: [DeviceType; 2] = [DeviceType::Nmos, DeviceType::Pmos];
}

impl FromStr for DeviceType {
    type Err = UnitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nmos" => Ok(DeviceType::Nmos),
            "pmos" => Ok(DeviceType::Pmos),
            other => Err(UnitsError::InvalidDeviceType(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Nmos => write!(f, "nmos"),
            DeviceType::Pmos => write!(f, "pmos"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InversionRegion {
    Weak,
    Moderate,
    Strong,
}

impl fmt::Display for InversionRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InversionRegion::Weak => write!(f, "Weak Inversion"),
            InversionRegion::Moderate => write!(f, "Moderate Inversion"),
            InversionRegion::Strong => write!(f, "Strong Inversion"),
        }
    }
}

/// Classify an operating point by its gm/Id value (1/V). The thresholds
/// are the same for both device types; the type is still validated.
pub fn determine_inversion_region(
    gm_id: f64,
    device_type: &str,
) -> Result<InversionRegion, UnitsError> {
    let _device: DeviceType = device_type.parse()?;
    Ok(inversion_region(gm_id))
}

pub fn inversion_region(gm_id: f64) -> InversionRegion {
    if gm_id > 20.0 {
        InversionRegion::Weak
    } else if gm_id > 10.0 {
        InversionRegion::Moderate
    } else {
        InversionRegion::Strong
    }
}

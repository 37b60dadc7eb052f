use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 300.0;
            let hsl = Hsl::new(hue, 0.75, 0.5);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: channel length → Color32
// ---------------------------------------------------------------------------

/// One colour per channel length, stable while the extraction is unchanged.
#[derive(Debug, Clone)]
pub struct LengthColors {
    lengths: Vec<f64>,
    colors: Vec<Color32>,
    default_color: Color32,
}

impl LengthColors {
    /// `lengths` are the sorted lengths of the current extraction.
    pub fn new(lengths: &[f64]) -> Self {
        LengthColors {
            lengths: lengths.to_vec(),
            colors: generate_palette(lengths.len()),
            default_color: Color32::LIGHT_BLUE,
        }
    }

    pub fn color_for(&self, length: f64) -> Color32 {
        self.lengths
            .iter()
            .position(|&l| l == length)
            .and_then(|i| self.colors.get(i).copied())
            .unwrap_or(self.default_color)
    }
}

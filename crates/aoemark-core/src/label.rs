//! Measurement label text.

/// What a label reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelContent {
    /// Raw pixel length while calibrating the map scale.
    Calibration { pixels: f64 },
    /// A single quantity with an optional area.
    Distance { value: f64, area: Option<f64> },
    /// Cone length and far-edge width with the covered area.
    Cone { length: f64, width: f64, area: f64 },
}

/// Format a label. Lines are separated by `\n`.
pub fn format_label(content: &LabelContent, unit_name: &str) -> String {
    match *content {
        LabelContent::Calibration { pixels } => {
            format!("{} px (Calibration)", decimals(pixels, 0))
        }
        LabelContent::Distance { value, area } => {
            let first = format!("{} {unit_name}", decimals(value, 1));
            match area {
                Some(area) => format!("{first}\n{}", area_line(area, unit_name)),
                None => first,
            }
        }
        LabelContent::Cone {
            length,
            width,
            area,
        } => format!(
            "L: {} W: {} {unit_name}\n{}",
            decimals(length, 1),
            decimals(width, 1),
            area_line(area, unit_name)
        ),
    }
}

fn area_line(area: f64, unit_name: &str) -> String {
    format!("Aire: {} {unit_name}²", decimals(area, 1))
}

fn decimals(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        "--".to_string()
    }
}

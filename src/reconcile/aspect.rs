//! Display helpers for aspect ratio values

use serde::Serialize;

/// Rough shape of an aspect ratio, used for labels and previews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Square,
    Landscape,
    Portrait,
    Auto,
}

/// Human-readable label for a native or canonical value
pub fn display_name(value: &str) -> String {
    let label = match value {
        "square_hd" => "Square HD",
        "square" => "Square",
        "landscape_16_9" => "Landscape 16:9",
        "portrait_16_9" => "Portrait 16:9",
        "landscape_4_3" => "Landscape 4:3",
        "portrait_4_3" => "Portrait 4:3",
        "auto_2K" => "Auto 2K",
        "auto_4K" => "Auto 4K",
        other => other,
    };
    label.to_string()
}

pub fn orientation(value: &str) -> Orientation {
    if value.contains("square") {
        return Orientation::Square;
    }
    if value.contains("landscape") {
        return Orientation::Landscape;
    }
    if value.contains("portrait") {
        return Orientation::Portrait;
    }
    if value.contains("auto") {
        return Orientation::Auto;
    }

    let mut parts = value.split(':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(w), Some(h), None) => match (w.parse::<u32>(), h.parse::<u32>()) {
            (Ok(w), Ok(h)) if w == h => Orientation::Square,
            (Ok(w), Ok(h)) if w > h => Orientation::Landscape,
            (Ok(_), Ok(_)) => Orientation::Portrait,
            _ => Orientation::Square,
        },
        _ => Orientation::Square,
    }
}

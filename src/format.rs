//! Guidance card text formatting.
//!
//! The primary distance (to the next instruction) and the running total
//! (to the end of the instruction) follow different rules above 1 km: the
//! primary readout always shows one decimal, the total drops to whole
//! kilometers from 10 km on and renders nothing instead of a placeholder.

/// Shown when a distance is unknown.
pub const DISTANCE_PLACEHOLDER: &str = "-";

/// Distance to the next instruction.
///
/// Below 1 km the value is floored to 10 m steps and never shown as
/// "0 m"; from 1 km on it is shown in kilometers with one decimal.
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters <= 0.0 {
        return DISTANCE_PLACEHOLDER.to_string();
    }
    if meters >= 1000.0 {
        return format!("{:.1} km", meters / 1000.0);
    }
    let rounded = floor_to_ten(meters).max(10);
    format!("{rounded} m")
}

/// Remaining distance summary. Empty when there is nothing to show.
pub fn format_total_distance(meters: f64) -> String {
    if !meters.is_finite() || meters <= 0.0 {
        return String::new();
    }
    if meters < 1000.0 {
        let rounded = floor_to_ten(meters);
        if rounded == 0 {
            return String::new();
        }
        return format!("{rounded} m");
    }
    if meters < 10_000.0 {
        let km = format!("{:.1}", meters / 1000.0);
        let km = km.strip_suffix(".0").unwrap_or(&km);
        return format!("{km} km");
    }
    format!("{} km", (meters / 1000.0) as i64)
}

/// Remaining time summary, rounded up to whole minutes.
pub fn format_total_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0 min".to_string();
    }
    let total_minutes = (seconds / 60.0).ceil() as i64;
    if seconds < 3600.0 {
        return format!("{total_minutes} min");
    }
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    format!("{hours} h {minutes} min")
}

fn floor_to_ten(meters: f64) -> i64 {
    (meters / 10.0) as i64 * 10
}

//! Presentation strings for distances and durations.
//!
//! These are pure and deterministic so the UI can be checked against fixed
//! expectations.

const METERS_PER_KM: f64 = 1000.0;
const MS_PER_MINUTE: i64 = 60_000;
const IMMINENT_DISTANCE_M: f64 = 50.0;

/// `"850m"` below one kilometer, `"1.2km"` from there on.
pub fn format_distance(meters: f64) -> String {
    let meters = meters.max(0.0);
    if meters < METERS_PER_KM {
        format!("{}m", meters as i64)
    } else {
        format!("{:.1}km", meters / METERS_PER_KM)
    }
}

/// Whole minutes below an hour, then hours plus leftover minutes.
/// Leftover minutes are omitted when zero (`"2 h"`).
pub fn format_duration(millis: i64) -> String {
    let total_minutes = millis.max(0) / MS_PER_MINUTE;
    if total_minutes < 60 {
        return format!("{total_minutes} min");
    }
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if minutes > 0 {
        format!("{hours} h {minutes} min")
    } else {
        format!("{hours} h")
    }
}

/// Distance to the upcoming maneuver as shown on the guidance card.
pub fn format_distance_ahead(meters: f64) -> String {
    if meters < IMMINENT_DISTANCE_M {
        "Now".to_string()
    } else {
        format!("in {}", format_distance(meters))
    }
}

/// Remaining trip time; under a minute the trip is reported as arriving.
pub fn format_remaining_time(millis: i64) -> String {
    if millis < MS_PER_MINUTE {
        "Arriving".to_string()
    } else {
        format_duration(millis)
    }
}

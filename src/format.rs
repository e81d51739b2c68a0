// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Display formatting for dashboard labels.

/// `3725` → `"1h 2m 5s"`; hours and minutes are omitted when zero.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;

    let mut parts = Vec::with_capacity(3);
    if h > 0 {
        parts.push(format!("{}h", h));
    }
    if m > 0 {
        parts.push(format!("{}m", m));
    }
    parts.push(format!("{}s", s));
    parts.join(" ")
}

/// Meters as kilometers with two decimals (`12346.0` → `"12.35"`).
pub fn format_km(meters: f64) -> String {
    format!("{:.2}", meters / 1000.0)
}

/// Decimal minutes per km as `m:ss min/km` (`5.5` → `"5:30 min/km"`).
pub fn format_pace_min_km(pace: f64) -> String {
    let mut min = pace.floor() as i64;
    let mut sec = ((pace - pace.floor()) * 60.0).round() as i64;
    if sec == 60 {
        min += 1;
        sec = 0;
    }
    format!("{}:{:02} min/km", min, sec)
}

/// Human label for a Strava sport type (`"EBikeRide"` → `"E-Bike Ride"`).
pub fn pretty_type_label(sport_type: &str) -> String {
    let special = match sport_type {
        "EBikeRide" => Some("E-Bike Ride"),
        "VirtualRide" => Some("Virtual Ride"),
        "StandUpPaddling" => Some("Stand Up Paddling"),
        "InlineSkate" => Some("Inline Skate"),
        "BackcountrySki" => Some("Backcountry Ski"),
        "NordicSki" => Some("Nordic Ski"),
        "AlpineSki" => Some("Alpine Ski"),
        _ => None,
    };
    if let Some(label) = special {
        return label.to_string();
    }

    // Split lower→upper camel-case boundaries.
    let mut out = String::with_capacity(sport_type.len() + 4);
    let mut prev_lower = false;
    for c in sport_type.chars() {
        if prev_lower && c.is_ascii_uppercase() {
            out.push(' ');
        }
        prev_lower = c.is_ascii_lowercase();
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3600), "1h 0s");
        assert_eq!(format_duration(3725), "1h 2m 5s");
    }

    #[test]
    fn test_format_km() {
        assert_eq!(format_km(12346.0), "12.35");
        assert_eq!(format_km(0.0), "0.00");
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace_min_km(5.0), "5:00 min/km");
        assert_eq!(format_pace_min_km(5.5), "5:30 min/km");
        assert_eq!(format_pace_min_km(4.999), "5:00 min/km");
    }

    #[test]
    fn test_pretty_type_label() {
        assert_eq!(pretty_type_label("EBikeRide"), "E-Bike Ride");
        assert_eq!(pretty_type_label("TrailRun"), "Trail Run");
        assert_eq!(pretty_type_label("WeightTraining"), "Weight Training");
        assert_eq!(pretty_type_label("Run"), "Run");
    }
}

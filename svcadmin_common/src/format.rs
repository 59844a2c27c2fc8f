//! Display helpers for values found in status snapshots

use std::time::Duration;

const UNITS: [&str; 6] = ["ns", "µs", "ms", "s", "m", "h"];
const BASES: [u64; 5] = [1000, 1000, 1000, 60, 60];

/// Format a nanosecond count using its two most significant units,
/// e.g. `1m 30s`, `250ms`, `2h`.
pub fn format_duration(nanos: u64) -> String {
    let mut parts = [0u64; 6];
    let mut rest = nanos;
    for (i, base) in BASES.iter().enumerate() {
        parts[i] = rest % base;
        rest /= base;
    }
    parts[UNITS.len() - 1] = rest;

    for i in (1..UNITS.len()).rev() {
        if parts[i] > 0 {
            let mut out = format!("{}{}", parts[i], UNITS[i]);
            if parts[i - 1] > 0 {
                out.push_str(&format!(" {}{}", parts[i - 1], UNITS[i - 1]));
            }
            return out;
        }
    }

    format!("{}{}", parts[0], UNITS[0])
}

/// [`format_duration`] for a `std::time::Duration`
pub fn format_std_duration(duration: Duration) -> String {
    format_duration(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

/// Format a ratio as a percentage, `0.125` with 2 decimals is `12.50%`
pub fn format_percentage(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_zero() {
        assert_eq!(format_duration(0), "0ns");
    }

    #[test]
    fn test_format_duration_minutes_and_seconds() {
        assert_eq!(format_std_duration(Duration::from_millis(90_000)), "1m 30s");
    }

    #[test]
    fn test_format_duration_two_units_max() {
        assert_eq!(format_duration(1_500), "1µs 500ns");
        assert_eq!(format_duration(250_000_000), "250ms");
        assert_eq!(format_duration(1_000_000_001), "1s");
        assert_eq!(format_std_duration(Duration::from_secs(2 * 3600)), "2h");
        assert_eq!(format_std_duration(Duration::from_secs(3600 + 5 * 60 + 7)), "1h 5m");
        assert_eq!(format_duration(999), "999ns");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.125, 2), "12.50%");
        assert_eq!(format_percentage(1.0, 0), "100%");
    }
}

/// Guards a raw relative position for display: NaN becomes 0.0 and the
/// result is limited to [0, 1].
pub fn display_position(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 1.0)
}

/// Renders a duration as `MM:SS`. Minutes are not wrapped at an hour.
/// Negative or non-finite input renders as `00:00`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_position_guards_nan_and_range() {
        assert_eq!(display_position(f64::NAN), 0.0);
        assert_eq!(display_position(-0.2), 0.0);
        assert_eq!(display_position(1.7), 1.0);
        assert_eq!(display_position(0.42), 0.42);
    }

    #[test]
    fn format_time_pads_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(61.0), "01:01");
        assert_eq!(format_time(3_725.0), "62:05");
        assert_eq!(format_time(f64::NAN), "00:00");
        assert_eq!(format_time(-4.0), "00:00");
    }
}

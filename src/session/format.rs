/// Format whole seconds as `m:ss`. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Format fractional seconds, flooring to whole seconds first
pub fn format_clock_f64(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format_clock(whole)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(5), "0:05");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(3600), "60:00");
    }

    #[test]
    fn test_format_clock_floors_fractions() {
        assert_eq!(format_clock_f64(44.99), "0:44");
        assert_eq!(format_clock_f64(-1.0), "0:00");
        assert_eq!(format_clock_f64(f64::NAN), "0:00");
    }
}

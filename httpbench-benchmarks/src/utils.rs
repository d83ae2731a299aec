//! Utility functions for httpbench reports

const BYTE_UNITS: &[&str] = &["B", "KB", "MB", "GB"];

/// Format bytes for human-readable output.
///
/// Uses base 1024 and stops at GB: anything larger stays in GB, so
/// `format_bytes(1024^4)` renders as `"1024.00 GB"`.
pub fn format_bytes(bytes: f64) -> String {
    let mut size = bytes;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < BYTE_UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, BYTE_UNITS[unit_index])
}

/// Format a plain number in its shortest exact form
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // Avoid "-0"
        return "0".to_string();
    }
    value.to_string()
}

/// Format the absolute difference of two numbers.
///
/// The result is rounded to the most decimal places either input carries,
/// which drops floating point noise (`33.3 - 30.0` is `3.3`) without hiding
/// a change in the last digit.
pub fn format_delta(old: f64, new: f64) -> String {
    let precision = decimal_places(old).max(decimal_places(new));
    let rounded = format!("{:.*}", precision, (new - old).abs());
    if rounded.contains('.') {
        rounded.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        rounded
    }
}

fn decimal_places(value: f64) -> usize {
    let text = value.to_string();
    text.split_once('.').map_or(0, |(_, fraction)| fraction.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0.0), "0.00 B");
        assert_eq!(format_bytes(512.0), "512.00 B");
        assert_eq!(format_bytes(1024.0), "1.00 KB");
        assert_eq!(format_bytes(1536.0), "1.50 KB");
        assert_eq!(format_bytes(2097152.0), "2.00 MB");
        assert_eq!(format_bytes(1073741824.0), "1.00 GB");
    }

    #[test]
    fn test_format_bytes_saturates_at_gb() {
        assert_eq!(format_bytes(1024f64.powi(4)), "1024.00 GB");
        assert_eq!(format_bytes(1024f64.powi(5)), "1048576.00 GB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000.0), "1000");
        assert_eq!(format_number(33.3), "33.3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-4.75), "-4.75");
    }

    #[test]
    fn test_format_number_keeps_small_digits() {
        assert_eq!(format_number(10.004), "10.004");
        assert_eq!(format_number(0.0012), "0.0012");
        assert_ne!(format_number(10.001), format_number(10.004));
    }

    #[test]
    fn test_format_delta() {
        assert_eq!(format_delta(30.0, 33.3), "3.3");
        assert_eq!(format_delta(33.3, 30.0), "3.3");
        assert_eq!(format_delta(1.5, 2.5), "1");
        assert_eq!(format_delta(10.0, 12.0), "2");
    }

    #[test]
    fn test_format_delta_third_decimal() {
        assert_eq!(format_delta(10.001, 10.004), "0.003");
        assert_eq!(format_delta(0.0012, 0.0048), "0.0036");
    }
}

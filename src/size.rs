//! Human-readable sizes and reduction figures.

const UNITS: [&str; 3] = ["Bytes", "KB", "MB"];

/// Formats a byte count as `Bytes`, `KB` or `MB`, rounded to at most two
/// decimals with trailing zeros dropped (`1.5 KB`, `2 MB`).
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;

    format!("{} {}", rounded, UNITS[exponent])
}

/// `(original - new) / original * 100`; zero when the original is empty.
pub fn reduction_percent(original: u64, new: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (original as f64 - new as f64) / original as f64 * 100.0
}

/// Reduction rendered to one decimal place, e.g. `"42.3"`.
pub fn format_reduction(original: u64, new: u64) -> String {
    format!("{:.1}", reduction_percent(original, new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1234), "1.21 KB");
        assert_eq!(format_file_size(500 * 1024), "500 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
    }

    #[test]
    fn test_large_sizes_stay_in_megabytes() {
        assert_eq!(format_file_size(2 * 1024 * 1024 * 1024), "2048 MB");
    }

    #[test]
    fn test_reduction() {
        assert_eq!(reduction_percent(1000, 250), 75.0);
        assert_eq!(reduction_percent(0, 10), 0.0);
        assert_eq!(format_reduction(3, 2), "33.3");
        assert_eq!(format_reduction(100, 120), "-20.0");
    }
}

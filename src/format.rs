//! Display formatting helpers for the dashboard columns.

/// Seconds as zero-padded `HH:MM:SS`. Hours do not wrap, so multi-day
/// uptimes read as e.g. `73:02:15`.
pub fn elapsed_time(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Byte count as megabytes with one decimal, for the RAM column.
pub fn megabytes(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / (1024.0 * 1024.0))
}

/// A [0, 1] ratio as a percentage with one decimal, clamped so malformed
/// inputs never render as `-3.0` or `250.0`.
pub fn percentage(ratio: f64) -> String {
    format!("{:.1}", ratio.clamp(0.0, 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_pads_and_carries() {
        assert_eq!(elapsed_time(0), "00:00:00");
        assert_eq!(elapsed_time(59), "00:00:59");
        assert_eq!(elapsed_time(60), "00:01:00");
        assert_eq!(elapsed_time(3599), "00:59:59");
        assert_eq!(elapsed_time(3661), "01:01:01");
        assert_eq!(elapsed_time(90 * 3600 + 125), "90:02:05");
    }

    #[test]
    fn megabytes_one_decimal() {
        assert_eq!(megabytes(0), "0.0");
        assert_eq!(megabytes(1024 * 1024), "1.0");
        assert_eq!(megabytes(1536 * 1024), "1.5");
    }

    #[test]
    fn percentage_clamps() {
        assert_eq!(percentage(0.5), "50.0");
        assert_eq!(percentage(-0.1), "0.0");
        assert_eq!(percentage(1.7), "100.0");
    }
}

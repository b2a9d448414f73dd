//! Shared formatting helpers for report output.

use std::fmt::Write;
use std::time::Duration;

/// Formats a duration the way Go's `time.Duration` prints it.
///
/// `"850ms"`, `"1.5ms"`, `"3.001s"`, `"1m2.5s"`, `"1h0m0s"`, `"0s"`.
pub fn format_elapsed(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", with_fraction(nanos / 1_000, nanos % 1_000, 3));
    }
    if nanos < 1_000_000_000 {
        return format!(
            "{}ms",
            with_fraction(nanos / 1_000_000, nanos % 1_000_000, 6)
        );
    }

    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        let _ = write!(out, "{}h", h);
    }
    if h > 0 || m > 0 {
        let _ = write!(out, "{}m", m);
    }
    let _ = write!(
        out,
        "{}s",
        with_fraction(s as u128, d.subsec_nanos() as u128, 9)
    );
    out
}

fn with_fraction(whole: u128, frac: u128, digits: usize) -> String {
    if frac == 0 {
        return whole.to_string();
    }
    let text = format!("{}.{:0width$}", whole, frac, width = digits);
    text.trim_end_matches('0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "0s");
        assert_eq!(format_elapsed(Duration::from_nanos(42)), "42ns");
        assert_eq!(format_elapsed(Duration::from_nanos(1_500)), "1.5µs");
        assert_eq!(format_elapsed(Duration::from_millis(850)), "850ms");
        assert_eq!(format_elapsed(Duration::from_micros(1_500)), "1.5ms");
        assert_eq!(format_elapsed(Duration::from_millis(3_001)), "3.001s");
        assert_eq!(format_elapsed(Duration::from_millis(62_500)), "1m2.5s");
        assert_eq!(format_elapsed(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_elapsed(Duration::from_secs(3)), "3s");
    }
}

//! Duration parser for CLI arguments.
//!
//! Accepts a sequence of `<number><unit>` groups, e.g. `500ms`, `3s`, `1m30s`,
//! `1.5h`. Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.

use std::time::Duration;

use crate::error::ParseError;

/// Parses a duration such as `3s` or `1m30s`.
pub fn parse_duration(input: &str) -> Result<Duration, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseError::new("empty duration"));
    }

    let mut total_nanos: f64 = 0.0;
    let mut rest = input;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(num_len);
        if number.is_empty() {
            return Err(invalid(input, "expected a number"));
        }
        let value: f64 = number
            .parse()
            .map_err(|_| invalid(input, "invalid number"))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(invalid(input, "missing unit")),
            _ => return Err(invalid(input, "unknown unit")),
        };

        total_nanos += value * scale;
        rest = tail;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid(input, "out of range"));
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

fn invalid(input: &str, message: &str) -> ParseError {
    ParseError::new(format!("invalid duration {:?}: {}", input, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_units() {
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("10ns").unwrap(), Duration::from_nanos(10));
    }

    #[test]
    fn test_compound_and_fractional() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(" 1h1m1s ").unwrap(), Duration::from_secs(3661));
    }

    #[test]
    fn test_invalid() {
        for input in ["", "3", "s", "3x", "-1s", "1..5s", "1s2"] {
            assert!(parse_duration(input).is_err(), "{:?}", input);
        }
    }
}

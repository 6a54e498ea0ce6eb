//! Parsing of human-readable duration strings such as `"20s"` or `"1m30s"`.
//!
//! The grammar is a sequence of decimal numbers, each with an optional
//! fraction and a mandatory unit suffix, optionally preceded by a sign:
//! `"300ms"`, `"-1.5h"`, `"2h45m"`. Valid units are `ns`, `us` (or `µs`),
//! `ms`, `s`, `m` and `h`. The bare string `"0"` needs no unit.

use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Longest fraction we keep; finer digits can't change a nanosecond count.
const MAX_FRACTION_DIGITS: usize = 18;

/// Why a duration string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("empty duration")]
    Empty,

    #[error("expected a number at {0:?}")]
    ExpectedNumber(String),

    #[error("missing unit after {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {0:?}")]
    UnknownUnit(String),

    #[error("duration out of range")]
    Overflow,
}

/// Parses a duration string.
///
/// Negative durations saturate to [`Duration::ZERO`]: every caller treats
/// "zero or less" the same way, and `Duration` can't go below zero.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(DurationError::Empty);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let (int_part, after_int) = split_digits(rest);
        let (frac_part, after_num) = match after_int.strip_prefix('.') {
            Some(after_dot) => split_digits(after_dot),
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DurationError::ExpectedNumber(rest.to_owned()));
        }

        let unit_len = after_num
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_num.len());
        let (unit, tail) = after_num.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(input.to_owned()));
        }
        let scale = unit_nanos(unit)?;

        total = total
            .checked_add(component_nanos(int_part, frac_part, scale)?)
            .ok_or(DurationError::Overflow)?;
        rest = tail;
    }

    if total > u64::MAX as u128 {
        return Err(DurationError::Overflow);
    }
    if negative {
        return Ok(Duration::ZERO);
    }
    Ok(Duration::from_nanos(total as u64))
}

fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

fn unit_nanos(unit: &str) -> Result<u128, DurationError> {
    Ok(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => NANOS_PER_MICRO,
        "ms" => NANOS_PER_MILLI,
        "s" => NANOS_PER_SEC,
        "m" => 60 * NANOS_PER_SEC,
        "h" => 3_600 * NANOS_PER_SEC,
        other => return Err(DurationError::UnknownUnit(other.to_owned())),
    })
}

/// `int.frac` units, in nanoseconds. The fraction is truncated, not rounded.
fn component_nanos(int_part: &str, frac_part: &str, scale: u128) -> Result<u128, DurationError> {
    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| DurationError::Overflow)?
    };
    let mut nanos = whole.checked_mul(scale).ok_or(DurationError::Overflow)?;

    let frac_part = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
    if !frac_part.is_empty() {
        let frac: u128 = frac_part.parse().map_err(|_| DurationError::Overflow)?;
        let denom = 10u128.pow(frac_part.len() as u32);
        nanos = nanos
            .checked_add(frac * scale / denom)
            .ok_or(DurationError::Overflow)?;
    }
    Ok(nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(s: &str) -> Duration {
        parse_duration(s).unwrap_or_else(|e| panic!("{s:?}: {e}"))
    }

    #[test]
    fn test_single_units() {
        assert_eq!(ok("20s"), Duration::from_secs(20));
        assert_eq!(ok("500ms"), Duration::from_millis(500));
        assert_eq!(ok("3m"), Duration::from_secs(180));
        assert_eq!(ok("2h"), Duration::from_secs(7_200));
        assert_eq!(ok("10us"), Duration::from_micros(10));
        assert_eq!(ok("10µs"), Duration::from_micros(10));
        assert_eq!(ok("7ns"), Duration::from_nanos(7));
    }

    #[test]
    fn test_compound_values_add_up() {
        assert_eq!(ok("1m30s"), Duration::from_secs(90));
        assert_eq!(ok("1h1m1s"), Duration::from_secs(3_661));
        assert_eq!(ok("1s500ms"), Duration::from_millis(1_500));
    }

    #[test]
    fn test_fractions() {
        assert_eq!(ok("1.5s"), Duration::from_millis(1_500));
        assert_eq!(ok(".5m"), Duration::from_secs(30));
        assert_eq!(ok("2.s"), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_and_signs() {
        assert_eq!(ok("0"), Duration::ZERO);
        assert_eq!(ok("+0"), Duration::ZERO);
        assert_eq!(ok("+5s"), Duration::from_secs(5));
        assert_eq!(ok("-5s"), Duration::ZERO);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(parse_duration(""), Err(DurationError::Empty));
        assert_eq!(parse_duration("-"), Err(DurationError::Empty));
        assert!(matches!(parse_duration("20"), Err(DurationError::MissingUnit(_))));
        assert!(matches!(parse_duration("5d"), Err(DurationError::UnknownUnit(_))));
        assert!(matches!(parse_duration("s"), Err(DurationError::ExpectedNumber(_))));
        assert!(matches!(parse_duration("."), Err(DurationError::ExpectedNumber(_))));
        assert!(matches!(parse_duration("1s "), Err(DurationError::UnknownUnit(_))));
    }

    #[test]
    fn test_rejects_overflow() {
        assert_eq!(
            parse_duration("99999999999999999999h"),
            Err(DurationError::Overflow)
        );
    }
}

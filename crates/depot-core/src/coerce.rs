//! # Lenient Numeric Input
//!
//! Store rows and operator input may carry missing, malformed or negative
//! numbers. None of them are errors: each is read as zero so the fee
//! calculation always produces a result.
//!
//! ```text
//!   None        ──► 0
//!   "abc"       ──► 0
//!   "-12"       ──► 0
//!   " 1,200 "   ──► 1200
//!   "800.6"     ──► 801   (weights, amounts and rates are whole numbers)
//! ```

use crate::money::Money;

/// An optional stored number, absent or negative → 0.
#[inline]
pub fn non_negative(value: Option<i64>) -> i64 {
    value.unwrap_or(0).max(0)
}

/// An optional stored amount, absent or negative → zero money.
#[inline]
pub fn money(value: Option<i64>) -> Money {
    Money::from_units(non_negative(value))
}

/// Parses operator text into a whole non-negative number.
///
/// Thousands separators and surrounding whitespace are ignored. Fractions are
/// rounded half-up. Anything unparseable is 0.
pub fn parse_lenient(input: &str) -> i64 {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    if cleaned.is_empty() {
        return 0;
    }

    if let Ok(v) = cleaned.parse::<i64>() {
        return v.max(0);
    }

    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => {
            let rounded = v.round();
            if rounded >= i64::MAX as f64 {
                i64::MAX
            } else {
                rounded as i64
            }
        }
        _ => 0,
    }
}

/// An optional text field, trimmed; blank → `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_negative_become_zero() {
        assert_eq!(non_negative(None), 0);
        assert_eq!(non_negative(Some(-4)), 0);
        assert_eq!(non_negative(Some(750)), 750);
        assert_eq!(money(Some(-1)), Money::zero());
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("1000"), 1000);
        assert_eq!(parse_lenient(" 1,200 "), 1200);
        assert_eq!(parse_lenient("800.6"), 801);
        assert_eq!(parse_lenient(""), 0);
        assert_eq!(parse_lenient("abc"), 0);
        assert_eq!(parse_lenient("-12"), 0);
        assert_eq!(parse_lenient("NaN"), 0);
    }

    #[test]
    fn test_fractional_rate_rounds_to_whole_unit() {
        assert_eq!(parse_lenient("0.5"), 1);
        assert_eq!(parse_lenient("0.4"), 0);
        assert_eq!(parse_lenient("2.5"), 3);
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  ")), None);
        assert_eq!(optional_text(Some(" crane ")), Some("crane".to_string()));
        assert_eq!(optional_text(None), None);
    }
}

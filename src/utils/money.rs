//! Money helpers. Amounts are carried as integer minor units (cents) and
//! exposed as decimals with two places.
//!
//! Rounding is half away from zero everywhere (`f64::round`).

use serde_json::Value;

/// Converts a major-unit amount to cents, rounding half away from zero.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Reads a JSON number or numeric string; anything else is `None`.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Lenient amount parsing for bills: missing, negative or non-numeric becomes 0.
pub fn coerce_non_negative(value: Option<&Value>) -> f64 {
    value
        .and_then(parse_amount)
        .filter(|n| *n > 0.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_cents_rounds_half_away_from_zero() {
        assert_eq!(to_cents(10.0), 1000);
        assert_eq!(to_cents(5.8), 580);
        assert_eq!(to_cents(0.125), 13);
        assert_eq!(to_cents(-0.125), -13);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&json!(12.5)), Some(12.5));
        assert_eq!(parse_amount(&json!("7.25")), Some(7.25));
        assert_eq!(parse_amount(&json!("abc")), None);
        assert_eq!(parse_amount(&json!(null)), None);
        assert_eq!(parse_amount(&json!(true)), None);
    }

    #[test]
    fn test_coerce_non_negative() {
        assert_eq!(coerce_non_negative(None), 0.0);
        assert_eq!(coerce_non_negative(Some(&json!(-3))), 0.0);
        assert_eq!(coerce_non_negative(Some(&json!("nope"))), 0.0);
        assert_eq!(coerce_non_negative(Some(&json!("4.10"))), 4.1);
    }
}

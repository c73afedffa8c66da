//! Arbitrary-precision amounts
//!
//! Balances and transfer amounts are unbounded non-negative integers. They are
//! parsed from user input as plain decimal digits and travel over the wire as
//! decimal strings so no JSON number precision is lost.

use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value as JsonValue;

use super::result::{Error, Result};

/// Parse a non-negative decimal integer
///
/// Accepts surrounding whitespace only. Signs, separators, fractions and
/// exponents are rejected.
pub fn parse_amount(input: &str) -> Result<BigUint> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input("amount cannot be empty"));
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_input(format!(
            "amount must be a non-negative whole number, got '{}'",
            trimmed
        )));
    }
    BigUint::from_str(trimmed)
        .map_err(|e| Error::invalid_input(format!("invalid amount '{}': {}", trimmed, e)))
}

/// Serialize a `BigUint` as a decimal string
pub fn serialize<S>(value: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// Deserialize a `BigUint` that can be a decimal string or a JSON integer
///
/// JSON integers of any size are read from their literal text, so values
/// beyond `u64` arrive exact rather than as floats.
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s,
        _ => return Err(D::Error::custom("expected number or string for amount")),
    };
    parse_amount(&text).map_err(|e| D::Error::custom(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        amount: BigUint,
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("40").unwrap(), BigUint::from(40u32));
        assert_eq!(parse_amount("  0 ").unwrap(), BigUint::from(0u32));
    }

    #[test]
    fn test_parse_amount_rejects_malformed() {
        for bad in ["", "   ", "-5", "+5", "1.5", "1e3", "1_000", "abc", "12 34"] {
            let err = parse_amount(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted '{}'", bad);
        }
    }

    #[test]
    fn test_large_values_keep_precision() {
        let digits = "123456789012345678901234567890123456789012345678901234567890";
        let amount = parse_amount(digits).unwrap();
        assert_eq!(amount.to_string(), digits);

        let json = serde_json::to_string(&Wrapper { amount }).unwrap();
        assert_eq!(json, format!("{{\"amount\":\"{}\"}}", digits));
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let w: Wrapper = serde_json::from_str(r#"{"amount": 42}"#).unwrap();
        assert_eq!(w.amount, BigUint::from(42u32));

        let w: Wrapper = serde_json::from_str(r#"{"amount": "42"}"#).unwrap();
        assert_eq!(w.amount, BigUint::from(42u32));

        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": -1}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": 1.5}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"amount": true}"#).is_err());
    }

    #[test]
    fn test_deserialize_number_beyond_u64() {
        let digits = "340282366920938463463374607431768211456";
        let w: Wrapper = serde_json::from_str(&format!(r#"{{"amount": {}}}"#, digits)).unwrap();
        assert_eq!(w.amount.to_string(), digits);
    }
}

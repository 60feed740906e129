//! Money types for the API boundary
//!
//! Amounts cross the wire as JSON strings so no precision is lost to
//! floating point. Outgoing amounts serialize `Decimal` directly, which
//! `rust_decimal` already writes as a string.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Format-validated decimal read from a JSON string
///
/// Rejects at the serde layer:
/// - JSON numbers
/// - empty strings
/// - `.5` and `5.` (write `0.5` and `5`)
/// - scientific notation
/// - a `+` prefix
///
/// A leading `-` is accepted so that sign errors surface as the ledger's
/// own `INVALID_AMOUNT` instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictDecimal(Decimal);

impl StrictDecimal {
    pub fn inner(self) -> Decimal {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        if s.is_empty() {
            return Err("Amount cannot be empty".to_string());
        }

        if s.starts_with('+') {
            return Err("Invalid format: + prefix not allowed".to_string());
        }

        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.starts_with('.') {
            return Err("Invalid format: use 0.5 not .5".to_string());
        }
        if digits.ends_with('.') {
            return Err("Invalid format: use 5.0 not 5.".to_string());
        }
        if digits.contains(['e', 'E']) {
            return Err("Invalid format: scientific notation not allowed".to_string());
        }

        Decimal::from_str_exact(s)
            .map(StrictDecimal)
            .map_err(|e| format!("Invalid decimal: {}", e))
    }
}

impl std::ops::Deref for StrictDecimal {
    type Target = Decimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StrictDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // JSON numbers would bypass the format checks
        let s = String::deserialize(deserializer)?;
        StrictDecimal::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for StrictDecimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse_json(json: &str) -> Result<StrictDecimal, String> {
        serde_json::from_str::<StrictDecimal>(json).map_err(|e| e.to_string())
    }

    #[test]
    fn test_valid_strings() {
        assert_eq!(parse_json(r#""100.00""#).unwrap().inner(), dec!(100.00));
        assert_eq!(parse_json(r#""0.01""#).unwrap().inner(), dec!(0.01));
        assert_eq!(parse_json(r#""7""#).unwrap().inner(), dec!(7));
    }

    #[test]
    fn test_scale_is_preserved() {
        let d = parse_json(r#""100.00""#).unwrap();
        assert_eq!(d.to_string(), "100.00");
    }

    #[test]
    fn test_negative_passes_through() {
        let d = parse_json(r#""-10.00""#).unwrap();
        assert!(d.is_sign_negative());
    }

    #[test]
    fn test_rejects_json_number() {
        let err = parse_json("1.5").unwrap_err();
        assert!(err.contains("expected a string"));
    }

    #[test]
    fn test_rejects_bad_formats() {
        assert!(parse_json(r#""""#).unwrap_err().contains("cannot be empty"));
        assert!(parse_json(r#"".5""#).unwrap_err().contains("use 0.5 not .5"));
        assert!(parse_json(r#""-.5""#).unwrap_err().contains("use 0.5 not .5"));
        assert!(parse_json(r#""5.""#).unwrap_err().contains("use 5.0 not 5."));
        assert!(parse_json(r#""1.5e8""#).unwrap_err().contains("scientific notation"));
        assert!(parse_json(r#""+1""#).unwrap_err().contains("+ prefix"));
        assert!(parse_json(r#""abc""#).unwrap_err().contains("Invalid decimal"));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&StrictDecimal(dec!(123.45))).unwrap();
        assert_eq!(json, r#""123.45""#);
    }
}

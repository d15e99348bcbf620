//! Monetary amounts.
//!
//! Upstream data has carried amounts both as numbers and as text. `Amount`
//! is the canonical form: a finite, non-negative number. Parsing happens at
//! the boundary and never later.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// A non-negative, finite contribution amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Amount(f64);

impl Amount {
    pub const ZERO: Amount = Amount(0.0);

    /// Largest accepted amount, one lakh crore rupees. Keeps rendering exact.
    pub const MAX: f64 = 1_000_000_000_000.0;

    /// Build an amount from a number.
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::invalid("amount", "must be a finite number"));
        }
        if value < 0.0 {
            return Err(ValidationError::invalid("amount", "must not be negative"));
        }
        if value > Self::MAX {
            return Err(ValidationError::invalid("amount", "exceeds 10,00,00,00,00,000"));
        }
        Ok(Self(value))
    }

    /// Parse an amount typed into a form.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::missing("amount"));
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| ValidationError::invalid("amount", format!("'{}' is not a number", trimmed)))?;
        Self::new(value)
    }

    /// Interpret whatever the store sent as an amount.
    ///
    /// Numbers and numeric strings are accepted. Anything else, including
    /// negative values, reads as zero. The returned flag is set when the raw
    /// value had to be replaced so the caller can log it.
    pub fn normalize(raw: &serde_json::Value) -> (Self, bool) {
        let parsed = match raw {
            serde_json::Value::Number(n) => n.as_f64().and_then(|v| Self::new(v).ok()),
            serde_json::Value::String(s) => Self::parse(s).ok(),
            _ => None,
        };
        match parsed {
            Some(amount) => (amount, false),
            None => (Self::ZERO, true),
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Render with Indian digit grouping (`1,00,000`), at most two decimals.
    pub fn to_indian_grouping(&self) -> String {
        let paise = (self.0 * 100.0).round() as u64;
        let whole = paise / 100;
        let frac = paise % 100;

        let digits = whole.to_string();
        let mut grouped = if digits.len() <= 3 {
            digits
        } else {
            let (head, tail) = digits.split_at(digits.len() - 3);
            let mut parts: Vec<&str> = Vec::new();
            let mut end = head.len();
            while end > 0 {
                let start = end.saturating_sub(2);
                parts.push(&head[start..end]);
                end = start;
            }
            parts.reverse();
            format!("{},{}", parts.join(","), tail)
        };

        if frac != 0 {
            if frac % 10 == 0 {
                grouped.push_str(&format!(".{}", frac / 10));
            } else {
                grouped.push_str(&format!(".{:02}", frac));
            }
        }
        grouped
    }
}

impl TryFrom<f64> for Amount {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for f64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as u64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0 + rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_accepts_trimmed_numbers() {
        assert_eq!(Amount::parse(" 501 ").unwrap().value(), 501.0);
        assert_eq!(Amount::parse("250.5").unwrap().value(), 250.5);
        assert_eq!(Amount::parse("0").unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Amount::parse("   "), Err(ValidationError::missing("amount")));
        assert!(matches!(
            Amount::parse("five hundred"),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(Amount::parse("-10").is_err());
        assert!(Amount::parse("NaN").is_err());
        assert!(Amount::parse("inf").is_err());
    }

    #[test]
    fn test_huge_amounts_rejected() {
        assert!(matches!(
            Amount::parse("1e20"),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert_eq!(Amount::normalize(&json!(1e20)), (Amount::ZERO, true));

        let max = Amount::new(Amount::MAX).unwrap();
        assert_eq!(max.to_string(), "1000000000000");
        assert_eq!(max.to_indian_grouping(), "10,00,00,00,00,000");
    }

    #[test]
    fn test_normalize_number_and_text() {
        assert_eq!(Amount::normalize(&json!(501)), (Amount(501.0), false));
        assert_eq!(Amount::normalize(&json!("1100")), (Amount(1100.0), false));
    }

    #[test]
    fn test_normalize_falls_back_to_zero() {
        assert_eq!(Amount::normalize(&json!(null)), (Amount::ZERO, true));
        assert_eq!(Amount::normalize(&json!("abc")), (Amount::ZERO, true));
        assert_eq!(Amount::normalize(&json!(-5)), (Amount::ZERO, true));
        assert_eq!(Amount::normalize(&json!({"v": 1})), (Amount::ZERO, true));
    }

    #[test]
    fn test_indian_grouping() {
        assert_eq!(Amount(0.0).to_indian_grouping(), "0");
        assert_eq!(Amount(501.0).to_indian_grouping(), "501");
        assert_eq!(Amount(1234.0).to_indian_grouping(), "1,234");
        assert_eq!(Amount(100000.0).to_indian_grouping(), "1,00,000");
        assert_eq!(Amount(12345678.0).to_indian_grouping(), "1,23,45,678");
        assert_eq!(Amount(1234.5).to_indian_grouping(), "1,234.5");
        assert_eq!(Amount(99.05).to_indian_grouping(), "99.05");
    }

    #[test]
    fn test_display_drops_trailing_zero_fraction() {
        assert_eq!(Amount(501.0).to_string(), "501");
        assert_eq!(Amount(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_serde_rejects_negative() {
        assert!(serde_json::from_str::<Amount>("-1").is_err());
        assert_eq!(serde_json::from_str::<Amount>("12").unwrap(), Amount(12.0));
        assert_eq!(serde_json::to_string(&Amount(12.0)).unwrap(), "12.0");
    }

    #[test]
    fn test_sum() {
        let total: Amount = [Amount(1.0), Amount(2.5), Amount(3.0)].into_iter().sum();
        assert_eq!(total, Amount(6.5));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any value that normalizes is non-negative and finite.
        #[test]
        fn prop_normalize_never_negative(v in any::<f64>()) {
            let raw = serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null);
            let (amount, _) = Amount::normalize(&raw);
            prop_assert!(amount.value() >= 0.0);
            prop_assert!(amount.value().is_finite());
        }

        /// Whole rupee amounts survive a parse of their own rendering.
        #[test]
        fn prop_whole_amount_text_parses_back(v in 0u32..10_000_000) {
            let amount = Amount::parse(&v.to_string()).unwrap();
            prop_assert_eq!(amount.to_string(), v.to_string());
        }
    }
}

//! Money conversion
//!
//! Conversion between client-facing decimal strings and the internal integer
//! minor-unit representation. All conversions go through this module; the
//! core transfer path only ever sees `i64` minor units and never touches
//! floating point.

use rust_decimal::prelude::*;
use std::str::FromStr;
use thiserror::Error;

/// Money conversion errors
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Converts a client-provided decimal string to minor units.
///
/// # Example
/// parse_units("30.00", 2) -> 3000
pub fn parse_units(amount_str: &str, decimals: u32) -> Result<i64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    let amount = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;

    parse_decimal(amount, decimals)
}

/// Converts a Decimal to minor units. Rejects residual fractions rather than
/// silently truncating.
pub fn parse_decimal(amount: Decimal, decimals: u32) -> Result<i64, MoneyError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    // Strict precision check: "10.005" with decimals=2 is a client error
    if amount.normalize().scale() > decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: amount.normalize().scale(),
            max: decimals,
        });
    }

    let multiplier = Decimal::from(10u64.pow(decimals));
    let scaled = (amount * multiplier).to_i64().ok_or(MoneyError::Overflow)?;

    if scaled <= 0 {
        return Err(MoneyError::InvalidAmount);
    }

    Ok(scaled)
}

/// Formats minor units back to a fixed-precision decimal string.
///
/// # Example
/// format_units(3000, 2) -> "30.00"
pub fn format_units(amount: i64, decimals: u32) -> String {
    let scale_factor = Decimal::from(10u64.pow(decimals));
    let value = Decimal::from(amount) / scale_factor;
    format!("{:.prec$}", value, prec = decimals as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units_whole_and_fraction() {
        assert_eq!(parse_units("30.00", 2).unwrap(), 3000);
        assert_eq!(parse_units("30", 2).unwrap(), 3000);
        assert_eq!(parse_units("0.01", 2).unwrap(), 1);
    }

    #[test]
    fn test_parse_units_rejects_excess_precision() {
        assert!(matches!(
            parse_units("10.005", 2),
            Err(MoneyError::PrecisionOverflow { .. })
        ));
    }

    #[test]
    fn test_parse_units_rejects_zero_and_negative() {
        assert!(matches!(parse_units("0", 2), Err(MoneyError::InvalidAmount)));
        assert!(matches!(
            parse_units("-5.00", 2),
            Err(MoneyError::InvalidAmount)
        ));
    }

    #[test]
    fn test_parse_units_rejects_garbage() {
        assert!(matches!(
            parse_units("abc", 2),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_units("", 2),
            Err(MoneyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_format_units_roundtrip() {
        assert_eq!(format_units(3000, 2), "30.00");
        assert_eq!(format_units(1, 2), "0.01");
        assert_eq!(parse_units(&format_units(123456, 2), 2).unwrap(), 123456);
    }
}

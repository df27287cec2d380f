//! Exact conversion between decimal prices and integer base units.
//!
//! Prices travel as human-readable decimal strings (`"0.05"`), while chains move
//! integer base units (`50000` for a 6-decimal token). Conversion here never
//! rounds: a price that cannot be expressed in the asset's precision is an error.

use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("valid decimal pattern"));

static INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("valid integer pattern"));

/// Errors produced while parsing or converting an amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// Input is not a plain non-negative decimal.
    #[error("Invalid amount format: {0:?}")]
    InvalidFormat(String),
    /// The amount has more fractional digits than the asset supports.
    #[error("Amount needs {scale} decimal places but the asset only has {decimals}")]
    Precision {
        /// Fractional digits in the amount.
        scale: u32,
        /// Fractional digits the asset supports.
        decimals: u8,
    },
    /// The result does not fit into 128 bits.
    #[error("Amount overflows base-unit range")]
    Overflow,
}

/// A non-negative decimal amount, exactly as the server advertised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecimalAmount(Decimal);

impl DecimalAmount {
    /// Parses a plain decimal string such as `"0.05"` or `"12"`.
    ///
    /// Signs, exponents, thousands separators and currency symbols are all
    /// rejected; amounts on the wire are machine-generated.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::InvalidFormat`] if the input is not a plain decimal.
    pub fn parse(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if !DECIMAL_PATTERN.is_match(trimmed) {
            return Err(AmountError::InvalidFormat(input.to_owned()));
        }
        Decimal::from_str_exact(trimmed)
            .map(Self)
            .map_err(|_| AmountError::InvalidFormat(input.to_owned()))
    }

    /// Builds the decimal form of an integer base-unit amount.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the value cannot be represented.
    pub fn from_base_units(units: u128, decimals: u8) -> Result<Self, AmountError> {
        let mantissa = i128::try_from(units).map_err(|_| AmountError::Overflow)?;
        Decimal::try_from_i128_with_scale(mantissa, u32::from(decimals))
            .map(|d| Self(d.normalize()))
            .map_err(|_| AmountError::Overflow)
    }

    /// Converts to integer base units for an asset with `decimals` precision.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Precision`] if the conversion would have to round,
    /// or [`AmountError::Overflow`] if the result does not fit in a `u128`.
    pub fn to_base_units(&self, decimals: u8) -> Result<u128, AmountError> {
        let normalized = self.0.normalize();
        let scale = normalized.scale();
        let target = u32::from(decimals);
        if scale > target {
            return Err(AmountError::Precision { scale, decimals });
        }
        let mantissa = normalized.mantissa().unsigned_abs();
        10u128
            .checked_pow(target - scale)
            .and_then(|factor| mantissa.checked_mul(factor))
            .ok_or(AmountError::Overflow)
    }

    /// The underlying decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for DecimalAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Parses an integer base-unit string such as `"50000"`.
///
/// # Errors
///
/// Returns [`AmountError::InvalidFormat`] for anything but plain digits, or
/// [`AmountError::Overflow`] if the value exceeds `u128`.
pub fn parse_base_units(input: &str) -> Result<u128, AmountError> {
    let trimmed = input.trim();
    if !INTEGER_PATTERN.is_match(trimmed) {
        return Err(AmountError::InvalidFormat(input.to_owned()));
    }
    trimmed.parse::<u128>().map_err(|_| AmountError::Overflow)
}

/// Renders base units as a decimal string at `decimals` precision.
///
/// Exact for every `u128`, with trailing fractional zeros dropped.
#[must_use]
pub fn format_base_units(units: u128, decimals: u8) -> String {
    let digits = units.to_string();
    let scale = usize::from(decimals);
    if scale == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_owned()
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_cents_usdc() {
        let amount = DecimalAmount::parse("0.05").unwrap();
        assert_eq!(amount.to_base_units(6).unwrap(), 50_000);
    }

    #[test]
    fn test_whole_number() {
        let amount = DecimalAmount::parse("12").unwrap();
        assert_eq!(amount.to_base_units(6).unwrap(), 12_000_000);
        assert_eq!(amount.to_base_units(0).unwrap(), 12);
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        let amount = DecimalAmount::parse("0.0500000000").unwrap();
        assert_eq!(amount.to_base_units(6).unwrap(), 50_000);
    }

    #[test]
    fn test_rounding_is_rejected() {
        let amount = DecimalAmount::parse("0.0000001").unwrap();
        assert_eq!(
            amount.to_base_units(6),
            Err(AmountError::Precision {
                scale: 7,
                decimals: 6
            })
        );
    }

    #[test]
    fn test_round_trip_canonical_strings() {
        let cases = [
            ("0.05", 6),
            ("1", 6),
            ("0.000001", 6),
            ("123456.789", 9),
            ("0.000000000000000001", 18),
            ("42", 0),
        ];
        for (input, decimals) in cases {
            let units = DecimalAmount::parse(input)
                .unwrap()
                .to_base_units(decimals)
                .unwrap();
            let back = DecimalAmount::from_base_units(units, decimals).unwrap();
            assert_eq!(back.to_string(), input, "round trip of {input} at {decimals}");
        }
    }

    #[test]
    fn test_invalid_formats() {
        for input in ["", "-1", "1e6", "$0.05", "1,000", ".5", "5.", "abc", "0x10"] {
            assert!(
                matches!(DecimalAmount::parse(input), Err(AmountError::InvalidFormat(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_overflow_is_reported() {
        let amount = DecimalAmount::parse("79228162514264337593543950335").unwrap();
        assert_eq!(amount.to_base_units(18), Err(AmountError::Overflow));
    }

    #[test]
    fn test_parse_base_units() {
        assert_eq!(parse_base_units("50000").unwrap(), 50_000);
        assert!(parse_base_units("0.5").is_err());
        assert!(parse_base_units("-5").is_err());
    }

    #[test]
    fn test_format_base_units() {
        assert_eq!(format_base_units(50_000, 6), "0.05");
        assert_eq!(format_base_units(1_250_000, 6), "1.25");
        assert_eq!(format_base_units(7, 0), "7");
        assert_eq!(format_base_units(0, 6), "0");
        assert_eq!(format_base_units(3_000_000, 6), "3");
        assert_eq!(
            format_base_units(u128::MAX, 18),
            "340282366920938463463.374607431768211455"
        );
    }

    #[test]
    fn test_non_ascii_digits_are_not_digits() {
        for input in ["\u{0661}\u{0662}", "\u{FF15}0000", "\u{0967}.\u{0968}"] {
            assert_eq!(
                parse_base_units(input),
                Err(AmountError::InvalidFormat(input.to_owned()))
            );
            assert!(matches!(
                DecimalAmount::parse(input),
                Err(AmountError::InvalidFormat(_))
            ));
        }
    }
}

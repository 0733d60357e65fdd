//! Monetary values
//!
//! `Amount` is a reference-currency value with six fractional digits. `Wei`
//! is an on-chain native value with eighteen. Both parse from and print as
//! plain decimal strings; neither goes through floating point.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Micro-units per whole unit of [`Amount`]
pub const MICROS_PER_UNIT: u64 = 1_000_000;

const AMOUNT_DECIMALS: usize = 6;
const ETHER_DECIMALS: usize = 18;
const WEI_PER_MICRO: u128 = 1_000_000_000_000;

/// Error parsing a decimal value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountParseError {
    /// Input was empty
    #[error("amount is empty")]
    Empty,
    /// Input was negative
    #[error("amount must not be negative")]
    Negative,
    /// Input was not a plain decimal number
    #[error("malformed amount: {0}")]
    Malformed(String),
    /// More fractional digits than the type can hold
    #[error("amount has more than {0} fractional digits")]
    TooPrecise(usize),
    /// Value does not fit
    #[error("amount overflows")]
    Overflow,
}

fn parse_decimal(input: &str, decimals: usize) -> Result<u128, AmountParseError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(AmountParseError::Empty);
    }
    if s.starts_with('-') {
        return Err(AmountParseError::Negative);
    }

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
        return Err(AmountParseError::Malformed(s.to_string()));
    }
    if frac.len() > decimals {
        return Err(AmountParseError::TooPrecise(decimals));
    }

    let scale = 10u128.pow(decimals as u32);
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountParseError::Overflow)?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<decimals$}");
        padded.parse().map_err(|_| AmountParseError::Overflow)?
    };

    whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac))
        .ok_or(AmountParseError::Overflow)
}

fn format_decimal(value: u128, decimals: usize, min_frac: usize) -> String {
    let scale = 10u128.pow(decimals as u32);
    let whole = value / scale;
    let mut frac = format!("{:0width$}", value % scale, width = decimals);
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{frac}")
    }
}

/// Reference-currency amount in micro-units
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u64);

impl Amount {
    /// Zero
    pub const ZERO: Amount = Amount(0);

    /// Build from micro-units
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Build from cents
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents * 10_000)
    }

    /// Raw micro-units
    pub const fn micros(&self) -> u64 {
        self.0
    }

    /// Parse a decimal string such as `"1.20"`
    pub fn parse(input: &str) -> Result<Self, AmountParseError> {
        let micros = parse_decimal(input, AMOUNT_DECIMALS)?;
        u64::try_from(micros)
            .map(Self)
            .map_err(|_| AmountParseError::Overflow)
    }

    /// True when the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Lossy conversion for display math and JSON bodies that carry floats
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    /// The same decimal value expressed as native on-chain units
    pub fn to_wei(&self) -> Wei {
        Wei(u128::from(self.0) * WEI_PER_MICRO)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_decimal(u128::from(self.0), AMOUNT_DECIMALS, 2))
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Amount> for String {
    fn from(value: Amount) -> Self {
        value.to_string()
    }
}

/// Native on-chain value in wei (18 decimals)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Wei(pub u128);

impl Wei {
    /// Parse an ether-denominated decimal string (`"0.01"`)
    pub fn parse_ether(input: &str) -> Result<Self, AmountParseError> {
        parse_decimal(input, ETHER_DECIMALS).map(Self)
    }

    /// Ether-denominated decimal string
    pub fn format_ether(&self) -> String {
        format_decimal(self.0, ETHER_DECIMALS, 1)
    }

    /// `0x`-prefixed hex quantity as used by JSON-RPC
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// Parse a JSON-RPC hex quantity
    pub fn from_hex(input: &str) -> Result<Self, AmountParseError> {
        let digits = input
            .trim()
            .strip_prefix("0x")
            .ok_or_else(|| AmountParseError::Malformed(input.to_string()))?;
        if digits.is_empty() {
            return Ok(Self(0));
        }
        u128::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| AmountParseError::Malformed(input.to_string()))
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Wei {
    type Error = AmountParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|_| AmountParseError::Malformed(value))
    }
}

impl From<Wei> for String {
    fn from(value: Wei) -> Self {
        value.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_prices() {
        assert_eq!(Amount::parse("1.20").unwrap().micros(), 1_200_000);
        assert_eq!(Amount::parse("0.5").unwrap().micros(), 500_000);
        assert_eq!(Amount::parse("12").unwrap().micros(), 12_000_000);
        assert_eq!(Amount::parse(".25").unwrap().micros(), 250_000);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(Amount::parse(""), Err(AmountParseError::Empty));
        assert_eq!(Amount::parse("-1"), Err(AmountParseError::Negative));
        assert_eq!(Amount::parse("1.0000001"), Err(AmountParseError::TooPrecise(6)));
        assert!(matches!(Amount::parse("1e3"), Err(AmountParseError::Malformed(_))));
        assert!(matches!(Amount::parse("."), Err(AmountParseError::Malformed(_))));
    }

    #[test]
    fn displays_with_two_decimals_minimum() {
        assert_eq!(Amount::from_cents(120).to_string(), "1.20");
        assert_eq!(Amount::from_micros(100).to_string(), "0.0001");
        assert_eq!(Amount::from_micros(5_000_000).to_string(), "5.00");
    }

    #[test]
    fn wei_conversions() {
        let wei = Wei::parse_ether("0.01").unwrap();
        assert_eq!(wei.0, 10_000_000_000_000_000);
        assert_eq!(wei.format_ether(), "0.01");
        assert_eq!(Wei(0).format_ether(), "0.0");
        assert_eq!(Amount::parse("0.0001").unwrap().to_wei().0, 100_000_000_000_000);
        assert_eq!(Wei::from_hex("0x10").unwrap(), Wei(16));
        assert_eq!(Wei(255).to_hex(), "0xff");
        assert!(Wei::from_hex("10").is_err());
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&Amount::from_cents(75)).unwrap();
        assert_eq!(json, "\"0.75\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Amount::from_cents(75));
    }
}

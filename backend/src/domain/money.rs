//! Amounts, currencies, and conversion into gateway minor units.
//!
//! The gateway settles in a single currency; caller-facing amounts arrive as
//! exact decimals in any allow-listed currency and are converted through a
//! versioned rate quote before an order is registered. All arithmetic is
//! `rust_decimal`; no floats touch money.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Currencies accepted on the order-creation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// United States dollar.
    Usd,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
    /// Indian rupee.
    Inr,
}

/// The currency the gateway registers every order in.
pub const SETTLEMENT_CURRENCY: Currency = Currency::Inr;

impl Currency {
    /// ISO 4217 code for this currency.
    pub fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors converting a caller amount into settlement minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The amount was zero or negative.
    NonPositiveAmount,
    /// The converted amount does not fit the gateway's integer range.
    NotRepresentable,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount => write!(f, "amount must be strictly positive"),
            Self::NotRepresentable => {
                write!(f, "converted amount is not representable in minor units")
            }
        }
    }
}

impl std::error::Error for ConversionError {}

/// Strictly positive amount in the settlement currency's minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "i64", into = "i64")]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// Validate and construct a [`MinorUnits`] value.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::MinorUnits;
    ///
    /// let amount = MinorUnits::new(996).expect("positive amount");
    /// assert_eq!(amount.get(), 996);
    /// assert!(MinorUnits::new(0).is_err());
    /// ```
    pub fn new(value: i64) -> Result<Self, ConversionError> {
        if value <= 0 {
            return Err(ConversionError::NonPositiveAmount);
        }
        Ok(Self(value))
    }

    /// The raw minor-unit count.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MinorUnits> for i64 {
    fn from(value: MinorUnits) -> Self {
        value.0
    }
}

impl TryFrom<i64> for MinorUnits {
    type Error = ConversionError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// One versioned conversion rate from a source currency into settlement
/// minor units.
///
/// The version names the policy revision a quote came from so a drifting
/// table is visible in logs and order metadata rather than silently baked
/// into arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuote {
    /// Policy revision the rate was taken from.
    pub version: String,
    /// Settlement minor units per one unit of the source currency.
    pub rate: Decimal,
}

/// Convert a caller-supplied amount into settlement minor units using `quote`.
///
/// Rounds the converted value to the nearest whole minor unit, away from zero
/// on midpoints.
///
/// # Examples
/// ```
/// use backend::domain::{RateQuote, to_minor_units};
/// use rust_decimal::Decimal;
///
/// let quote = RateQuote {
///     version: "2024-01".into(),
///     rate: Decimal::from(83),
/// };
/// let amount = to_minor_units(Decimal::from(12), &quote).expect("convertible");
/// assert_eq!(amount.get(), 996);
/// ```
pub fn to_minor_units(amount: Decimal, quote: &RateQuote) -> Result<MinorUnits, ConversionError> {
    if amount <= Decimal::ZERO {
        return Err(ConversionError::NonPositiveAmount);
    }
    let converted = (amount * quote.rate)
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
    let minor = converted
        .to_i64()
        .ok_or(ConversionError::NotRepresentable)?;
    MinorUnits::new(minor)
}

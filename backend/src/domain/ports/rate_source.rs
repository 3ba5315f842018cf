//! Port abstraction for the currency conversion policy.
//!
//! Conversion is a versioned policy, not an ambient constant: the order
//! service asks this port for a quote and records nothing if the currency is
//! off the table. Today's single implementation is a static table; a live
//! source slots in behind the same trait.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::{Currency, RateQuote};

/// Port supplying conversion quotes into the settlement currency.
pub trait RateSource: Send + Sync {
    /// Quote for converting one unit of `currency` into settlement minor
    /// units, or `None` when the policy does not cover the currency.
    fn quote(&self, currency: Currency) -> Option<RateQuote>;
}

/// Static, versioned conversion table.
#[derive(Debug, Clone)]
pub struct StaticRateSource {
    version: String,
    table: HashMap<Currency, Decimal>,
}

impl StaticRateSource {
    /// Build a table from explicit rates.
    pub fn new(
        version: impl Into<String>,
        rates: impl IntoIterator<Item = (Currency, Decimal)>,
    ) -> Self {
        Self {
            version: version.into(),
            table: rates.into_iter().collect(),
        }
    }

    /// The conversion policy shipped with this revision.
    ///
    /// Rates are settlement minor units per whole source unit.
    pub fn policy_2024_01() -> Self {
        Self::new(
            "2024-01",
            [
                (Currency::Usd, Decimal::from(83)),
                (Currency::Eur, Decimal::from(90)),
                (Currency::Gbp, Decimal::from(105)),
                (Currency::Inr, Decimal::ONE),
            ],
        )
    }
}

impl RateSource for StaticRateSource {
    fn quote(&self, currency: Currency) -> Option<RateQuote> {
        self.table.get(&currency).map(|rate| RateQuote {
            version: self.version.clone(),
            rate: *rate,
        })
    }
}

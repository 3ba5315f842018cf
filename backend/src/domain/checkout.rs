//! Checkout descriptor mapping for the client payment surface.
//!
//! A pure projection of an order plus an instrument selection into the
//! descriptor the client hands to the provider's payment UI. No state, no
//! network; the only failure mode is an unrecognised method name, rejected
//! at parse time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::money::{Currency, MinorUnits};
use super::order::{Order, OrderId};

/// Payment instruments the provider can present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Debit or credit card.
    Card,
    /// Unified Payments Interface.
    Upi,
    /// Provider-hosted wallets.
    Wallet,
    /// Net-banking redirects.
    NetBanking,
}

/// Every instrument, in the order the provider lists them.
pub const ALL_METHODS: [PaymentMethod; 4] = [
    PaymentMethod::Card,
    PaymentMethod::Upi,
    PaymentMethod::Wallet,
    PaymentMethod::NetBanking,
];

/// Error returned for an unrecognised payment method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePaymentMethodError {
    supplied: String,
}

impl fmt::Display for ParsePaymentMethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognised payment method: {} (expected card, upi, wallet, or netbanking)",
            self.supplied
        )
    }
}

impl std::error::Error for ParsePaymentMethodError {}

impl FromStr for PaymentMethod {
    type Err = ParsePaymentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            "wallet" => Ok(Self::Wallet),
            "netbanking" => Ok(Self::NetBanking),
            other => Err(ParsePaymentMethodError {
                supplied: other.to_owned(),
            }),
        }
    }
}

/// Which instruments to present on the checkout surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodSelection {
    /// Present every instrument.
    All,
    /// Restrict the surface to a single instrument.
    Only(PaymentMethod),
}

impl MethodSelection {
    /// Parse an optional query parameter; absence means all instruments.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::{MethodSelection, PaymentMethod};
    ///
    /// assert_eq!(
    ///     MethodSelection::from_param(None).expect("absent is all"),
    ///     MethodSelection::All
    /// );
    /// assert_eq!(
    ///     MethodSelection::from_param(Some("upi")).expect("known method"),
    ///     MethodSelection::Only(PaymentMethod::Upi)
    /// );
    /// assert!(MethodSelection::from_param(Some("cheque")).is_err());
    /// ```
    pub fn from_param(param: Option<&str>) -> Result<Self, ParsePaymentMethodError> {
        match param {
            None | Some("all") => Ok(Self::All),
            Some(raw) => raw.parse().map(Self::Only),
        }
    }
}

/// Everything the client checkout surface needs to open the provider UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDescriptor {
    /// Gateway public key identifier.
    pub key_id: String,
    /// Provider order the payment will settle against.
    pub order_id: OrderId,
    /// Amount in settlement minor units.
    pub amount: MinorUnits,
    /// Settlement currency.
    pub currency: Currency,
    /// Instruments to present.
    pub methods: Vec<PaymentMethod>,
}

/// Project an order and an instrument selection into a checkout descriptor.
pub fn build_checkout_descriptor(order: &Order, selection: MethodSelection) -> CheckoutDescriptor {
    let methods = match selection {
        MethodSelection::All => ALL_METHODS.to_vec(),
        MethodSelection::Only(method) => vec![method],
    };
    CheckoutDescriptor {
        key_id: order.key_id.clone(),
        order_id: order.id.clone(),
        amount: order.amount,
        currency: order.currency,
        methods,
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::{MinorUnits, OrderId, PackageId};
    use rstest::rstest;

    fn order() -> Order {
        Order::created(
            OrderId::new("order_1").expect("valid id"),
            MinorUnits::new(996).expect("positive"),
            Currency::Inr,
            PackageId::new("starter-pack").expect("valid package"),
            "rzp_test_key",
            None,
        )
    }

    #[rstest]
    #[case("card", PaymentMethod::Card)]
    #[case("upi", PaymentMethod::Upi)]
    #[case("wallet", PaymentMethod::Wallet)]
    #[case("netbanking", PaymentMethod::NetBanking)]
    fn parses_known_methods(#[case] raw: &str, #[case] expected: PaymentMethod) {
        assert_eq!(raw.parse::<PaymentMethod>().expect("known method"), expected);
    }

    #[rstest]
    #[case("cheque")]
    #[case("CARD")]
    #[case("")]
    fn rejects_unknown_methods(#[case] raw: &str) {
        assert!(raw.parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn unrestricted_selection_lists_every_instrument() {
        let descriptor = build_checkout_descriptor(&order(), MethodSelection::All);
        assert_eq!(descriptor.methods, ALL_METHODS.to_vec());
        assert_eq!(descriptor.key_id, "rzp_test_key");
        assert_eq!(descriptor.amount.get(), 996);
    }

    #[test]
    fn single_selection_restricts_the_surface() {
        let descriptor =
            build_checkout_descriptor(&order(), MethodSelection::Only(PaymentMethod::Upi));
        assert_eq!(descriptor.methods, vec![PaymentMethod::Upi]);
    }
}

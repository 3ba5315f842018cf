//! Port abstraction for registering orders with the payment provider.
//!
//! Order registration is the only network call the provider requires before
//! a payment can be collected. The adapter owns transport, authentication,
//! and timeout; the domain sees a registered order or a classified failure.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::domain::{Currency, MinorUnits, OrderId, PackageId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment gateway adapters.
    pub enum PaymentGatewayError {
        /// The provider did not answer within the configured deadline.
        Timeout { message: String } => "gateway timed out: {message}",
        /// The provider could not be reached or dropped the connection.
        Transport { message: String } => "gateway transport failure: {message}",
        /// The provider answered with a rejection.
        Rejected { message: String } => "gateway rejected the order: {message}",
        /// The provider's response could not be decoded.
        Decode { message: String } => "gateway response could not be decoded: {message}",
    }
}

/// What the domain asks the provider to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    /// Amount in settlement minor units.
    pub amount: MinorUnits,
    /// Settlement currency.
    pub currency: Currency,
    /// Package recorded on the provider side for reconciliation.
    pub package_id: PackageId,
    /// Merchant-side receipt string attached to the provider order.
    pub receipt: String,
}

/// What the provider hands back for a registered order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    /// Provider-issued order identifier.
    pub provider_order_id: OrderId,
    /// Public key identifier the client needs to open the payment UI.
    pub key_id: String,
}

/// Port for the external payment provider's order registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register `draft` with the provider and return its order descriptor.
    async fn register_order(&self, draft: &OrderDraft) -> Result<GatewayOrder, PaymentGatewayError>;
}

/// Fixture gateway minting sequential order identifiers without I/O.
#[derive(Debug, Default)]
pub struct FixtureGateway {
    sequence: AtomicU64,
}

/// Key identifier the fixture gateway reports.
pub const FIXTURE_KEY_ID: &str = "rzp_test_fixture";

#[async_trait]
impl PaymentGateway for FixtureGateway {
    async fn register_order(
        &self,
        _draft: &OrderDraft,
    ) -> Result<GatewayOrder, PaymentGatewayError> {
        let serial = self.sequence.fetch_add(1, Ordering::Relaxed);
        let provider_order_id = OrderId::new(format!("order_fixture_{serial}"))
            .map_err(|err| PaymentGatewayError::decode(err.to_string()))?;
        Ok(GatewayOrder {
            provider_order_id,
            key_id: FIXTURE_KEY_ID.to_owned(),
        })
    }
}

//! Driving port for order creation and checkout projection.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{
    CheckoutDescriptor, ClientKey, Currency, MethodSelection, Order, OrderId, PackageId,
    build_checkout_descriptor,
};

/// Failures surfaced by the order service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The requested amount was zero, negative, or rounds to nothing.
    #[error("amount must be strictly positive")]
    InvalidAmount,
    /// The requested package is not in the catalogue.
    #[error("unknown package: {package_id}")]
    UnknownPackage {
        /// Package the caller asked for.
        package_id: String,
    },
    /// The requested currency is not on the conversion policy.
    #[error("unsupported currency: {currency}")]
    UnsupportedCurrency {
        /// Currency the caller asked for.
        currency: String,
    },
    /// The caller reused an idempotency key with a different payload.
    #[error("idempotency key reused with a different payload")]
    IdempotencyConflict,
    /// No order exists with the supplied identifier.
    #[error("unknown order: {order_id}")]
    UnknownOrder {
        /// Order the caller asked for.
        order_id: String,
    },
    /// The gateway rejected the registration or timed out.
    #[error("payment gateway unavailable: {message}")]
    GatewayUnavailable {
        /// Adapter-reported failure detail.
        message: String,
        /// Whether the failure was a timeout rather than a rejection.
        timed_out: bool,
    },
    /// The order store failed.
    #[error("order store failure: {message}")]
    Repository {
        /// Adapter-reported failure detail.
        message: String,
    },
}

/// What a caller asks the order service to mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    /// Amount in the caller's currency, major units.
    pub amount: Decimal,
    /// Caller's currency.
    pub currency: Currency,
    /// Package being purchased.
    pub package_id: PackageId,
    /// Optional idempotency key making retries safe.
    pub client_key: Option<ClientKey>,
}

/// Driving port: create orders and project checkout descriptors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Mint a fresh order (or replay the one minted for the same client
    /// key and payload).
    async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OrderError>;

    /// Project an existing order into a checkout descriptor.
    async fn checkout_descriptor(
        &self,
        order_id: &OrderId,
        selection: MethodSelection,
    ) -> Result<CheckoutDescriptor, OrderError>;
}

/// Fixture service replaying one canned order; for handler tests.
#[derive(Debug, Clone)]
pub struct FixtureOrderService {
    order: Order,
}

impl FixtureOrderService {
    /// Serve `order` for every request.
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[async_trait]
impl OrderService for FixtureOrderService {
    async fn create_order(&self, _request: CreateOrderRequest) -> Result<Order, OrderError> {
        Ok(self.order.clone())
    }

    async fn checkout_descriptor(
        &self,
        order_id: &OrderId,
        selection: MethodSelection,
    ) -> Result<CheckoutDescriptor, OrderError> {
        if *order_id != self.order.id {
            return Err(OrderError::UnknownOrder {
                order_id: order_id.to_string(),
            });
        }
        Ok(build_checkout_descriptor(&self.order, selection))
    }
}

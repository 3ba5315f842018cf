//! Order creation service implementing the driving port.
//!
//! Validates caller input, converts the amount through the injected rate
//! policy, registers the order with the gateway, and persists it. Every call
//! mints a fresh order unless the caller supplied an idempotency key; the
//! service never retries the gateway on the caller's behalf.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::money::{SETTLEMENT_CURRENCY, to_minor_units};
use crate::domain::order::{Order, PackageCatalog};
use crate::domain::ports::{
    CreateOrderRequest, OrderDraft, OrderError, OrderRepository, OrderRepositoryError,
    OrderService, PaymentGateway, PaymentGatewayError, RateSource,
};
use crate::domain::{CheckoutDescriptor, MethodSelection, OrderId, build_checkout_descriptor};

/// Order service wiring the gateway, repository, and rate policy together.
#[derive(Clone)]
pub struct OrderServiceImpl<G, R, S> {
    gateway: Arc<G>,
    repository: Arc<R>,
    rates: Arc<S>,
    catalogue: PackageCatalog,
}

impl<G, R, S> OrderServiceImpl<G, R, S> {
    /// Create a new service over the given adapters and catalogue.
    pub fn new(
        gateway: Arc<G>,
        repository: Arc<R>,
        rates: Arc<S>,
        catalogue: PackageCatalog,
    ) -> Self {
        Self {
            gateway,
            repository,
            rates,
            catalogue,
        }
    }
}

fn map_repository_error(error: OrderRepositoryError) -> OrderError {
    OrderError::Repository {
        message: error.to_string(),
    }
}

fn map_gateway_error(error: PaymentGatewayError) -> OrderError {
    let timed_out = matches!(error, PaymentGatewayError::Timeout { .. });
    OrderError::GatewayUnavailable {
        message: error.to_string(),
        timed_out,
    }
}

impl<G, R, S> OrderServiceImpl<G, R, S>
where
    G: PaymentGateway,
    R: OrderRepository,
    S: RateSource,
{
    /// Replay the order previously minted for this client key, or reject the
    /// key if the payload changed.
    async fn replay_for_client_key(
        &self,
        request: &CreateOrderRequest,
        converted_amount: crate::domain::MinorUnits,
    ) -> Result<Option<Order>, OrderError> {
        let Some(key) = &request.client_key else {
            return Ok(None);
        };
        let Some(existing) = self
            .repository
            .find_by_client_key(key)
            .await
            .map_err(map_repository_error)?
        else {
            return Ok(None);
        };
        if existing.amount == converted_amount && existing.package_id == request.package_id {
            info!(order_id = %existing.id, client_key = %key, "replaying order for client key");
            return Ok(Some(existing));
        }
        warn!(client_key = %key, "client key reused with a different payload");
        Err(OrderError::IdempotencyConflict)
    }
}

#[async_trait]
impl<G, R, S> OrderService for OrderServiceImpl<G, R, S>
where
    G: PaymentGateway,
    R: OrderRepository,
    S: RateSource,
{
    async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, OrderError> {
        if request.amount <= Decimal::ZERO {
            return Err(OrderError::InvalidAmount);
        }
        if !self.catalogue.contains(&request.package_id) {
            return Err(OrderError::UnknownPackage {
                package_id: request.package_id.to_string(),
            });
        }
        let quote =
            self.rates
                .quote(request.currency)
                .ok_or_else(|| OrderError::UnsupportedCurrency {
                    currency: request.currency.to_string(),
                })?;
        let amount =
            to_minor_units(request.amount, &quote).map_err(|_| OrderError::InvalidAmount)?;

        if let Some(existing) = self.replay_for_client_key(&request, amount).await? {
            return Ok(existing);
        }

        let draft = OrderDraft {
            amount,
            currency: SETTLEMENT_CURRENCY,
            package_id: request.package_id.clone(),
            receipt: request
                .client_key
                .as_ref()
                .map_or_else(|| format!("rcpt_{}", Uuid::new_v4().simple()), |key| {
                    format!("rcpt_{key}")
                }),
        };
        let registered = self
            .gateway
            .register_order(&draft)
            .await
            .map_err(map_gateway_error)?;

        let order = Order::created(
            registered.provider_order_id,
            amount,
            SETTLEMENT_CURRENCY,
            request.package_id,
            registered.key_id,
            request.client_key,
        );
        self.repository
            .insert(order.clone())
            .await
            .map_err(map_repository_error)?;
        info!(
            order_id = %order.id,
            package_id = %order.package_id,
            amount = %order.amount,
            rate_version = %quote.version,
            "order created"
        );
        Ok(order)
    }

    async fn checkout_descriptor(
        &self,
        order_id: &OrderId,
        selection: MethodSelection,
    ) -> Result<CheckoutDescriptor, OrderError> {
        let order = self
            .repository
            .find(order_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| OrderError::UnknownOrder {
                order_id: order_id.to_string(),
            })?;
        Ok(build_checkout_descriptor(&order, selection))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for order creation semantics.
    use super::*;
    use crate::domain::ports::{
        FixtureGateway, MockOrderRepository, MockPaymentGateway, StaticRateSource,
    };
    use crate::domain::{ClientKey, Currency, PackageId};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn catalogue() -> PackageCatalog {
        PackageCatalog::new([
            PackageId::new("starter-pack").expect("valid package"),
            PackageId::new("scholar-pack").expect("valid package"),
        ])
    }

    fn request(amount: Decimal, currency: Currency, package: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            amount,
            currency,
            package_id: PackageId::new(package).expect("valid package"),
            client_key: None,
        }
    }

    fn passthrough_repository() -> MockOrderRepository {
        let mut repository = MockOrderRepository::new();
        repository.expect_insert().returning(|_| Ok(()));
        repository
    }

    fn service_with(
        repository: MockOrderRepository,
    ) -> OrderServiceImpl<FixtureGateway, MockOrderRepository, StaticRateSource> {
        OrderServiceImpl::new(
            Arc::new(FixtureGateway::default()),
            Arc::new(repository),
            Arc::new(StaticRateSource::policy_2024_01()),
            catalogue(),
        )
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(-12.00))]
    #[tokio::test]
    async fn non_positive_amounts_fail_for_every_currency(#[case] amount: Decimal) {
        for currency in [Currency::Usd, Currency::Eur, Currency::Gbp, Currency::Inr] {
            let service = service_with(MockOrderRepository::new());
            let err = service
                .create_order(request(amount, currency, "starter-pack"))
                .await
                .expect_err("non-positive amount must fail");
            assert_eq!(err, OrderError::InvalidAmount);
        }
    }

    #[tokio::test]
    async fn unknown_packages_are_rejected_before_the_gateway_is_called() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_register_order().never();
        let service = OrderServiceImpl::new(
            Arc::new(gateway),
            Arc::new(MockOrderRepository::new()),
            Arc::new(StaticRateSource::policy_2024_01()),
            catalogue(),
        );
        let err = service
            .create_order(request(dec!(12.00), Currency::Usd, "mystery-pack"))
            .await
            .expect_err("unknown package must fail");
        assert!(matches!(err, OrderError::UnknownPackage { .. }));
    }

    #[tokio::test]
    async fn uncovered_currencies_are_rejected() {
        let service = OrderServiceImpl::new(
            Arc::new(FixtureGateway::default()),
            Arc::new(MockOrderRepository::new()),
            Arc::new(StaticRateSource::new("empty", [])),
            catalogue(),
        );
        let err = service
            .create_order(request(dec!(12.00), Currency::Usd, "starter-pack"))
            .await
            .expect_err("uncovered currency must fail");
        assert!(matches!(err, OrderError::UnsupportedCurrency { .. }));
    }

    #[tokio::test]
    async fn converts_and_persists_a_fresh_order() {
        let service = service_with(passthrough_repository());
        let order = service
            .create_order(request(dec!(12.00), Currency::Usd, "starter-pack"))
            .await
            .expect("order should be created");
        assert_eq!(order.amount.get(), 996);
        assert_eq!(order.currency, SETTLEMENT_CURRENCY);
        assert_eq!(order.status, crate::domain::OrderStatus::Created);
        assert!(order.id.as_ref().starts_with("order_fixture_"));
    }

    #[tokio::test]
    async fn gateway_timeouts_surface_as_gateway_unavailable() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_register_order()
            .returning(|_| Err(PaymentGatewayError::timeout("deadline exceeded")));
        let service = OrderServiceImpl::new(
            Arc::new(gateway),
            Arc::new(MockOrderRepository::new()),
            Arc::new(StaticRateSource::policy_2024_01()),
            catalogue(),
        );
        let err = service
            .create_order(request(dec!(12.00), Currency::Usd, "starter-pack"))
            .await
            .expect_err("timeout must fail");
        assert!(matches!(
            err,
            OrderError::GatewayUnavailable { timed_out: true, .. }
        ));
    }

    #[tokio::test]
    async fn replays_the_order_minted_for_a_repeated_client_key() {
        let key = ClientKey::random();
        let stored = Order::created(
            OrderId::new("order_prior").expect("valid id"),
            crate::domain::MinorUnits::new(996).expect("positive"),
            SETTLEMENT_CURRENCY,
            PackageId::new("starter-pack").expect("valid package"),
            "rzp_test_key",
            Some(key.clone()),
        );
        let mut repository = MockOrderRepository::new();
        let replayed = stored.clone();
        repository
            .expect_find_by_client_key()
            .returning(move |_| Ok(Some(replayed.clone())));
        repository.expect_insert().never();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_register_order().never();

        let service = OrderServiceImpl::new(
            Arc::new(gateway),
            Arc::new(repository),
            Arc::new(StaticRateSource::policy_2024_01()),
            catalogue(),
        );
        let mut req = request(dec!(12.00), Currency::Usd, "starter-pack");
        req.client_key = Some(key);
        let order = service.create_order(req).await.expect("replay succeeds");
        assert_eq!(order, stored);
    }

    #[tokio::test]
    async fn rejects_a_client_key_reused_with_a_different_payload() {
        let key = ClientKey::random();
        let stored = Order::created(
            OrderId::new("order_prior").expect("valid id"),
            crate::domain::MinorUnits::new(996).expect("positive"),
            SETTLEMENT_CURRENCY,
            PackageId::new("starter-pack").expect("valid package"),
            "rzp_test_key",
            Some(key.clone()),
        );
        let mut repository = MockOrderRepository::new();
        repository
            .expect_find_by_client_key()
            .returning(move |_| Ok(Some(stored.clone())));

        let service = OrderServiceImpl::new(
            Arc::new(MockPaymentGateway::new()),
            Arc::new(repository),
            Arc::new(StaticRateSource::policy_2024_01()),
            catalogue(),
        );
        let mut req = request(dec!(12.00), Currency::Usd, "scholar-pack");
        req.client_key = Some(key);
        let err = service
            .create_order(req)
            .await
            .expect_err("conflicting payload must fail");
        assert_eq!(err, OrderError::IdempotencyConflict);
    }

    #[tokio::test]
    async fn checkout_descriptor_requires_a_known_order() {
        let mut repository = MockOrderRepository::new();
        repository.expect_find().returning(|_| Ok(None));
        let service = OrderServiceImpl::new(
            Arc::new(FixtureGateway::default()),
            Arc::new(repository),
            Arc::new(StaticRateSource::policy_2024_01()),
            catalogue(),
        );
        let err = service
            .checkout_descriptor(
                &OrderId::new("order_missing").expect("valid id"),
                MethodSelection::All,
            )
            .await
            .expect_err("missing order must fail");
        assert!(matches!(err, OrderError::UnknownOrder { .. }));
    }
}

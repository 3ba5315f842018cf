//! Shared harness wiring real services over in-memory adapters.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use backend::domain::ports::{
    FixtureGateway, FixtureIdentityVerifier, IdentityVerifier, PaymentGateway, StaticRateSource,
};
use backend::domain::{
    GatewaySecret, OrderServiceImpl, PackageCatalog, PackageId, VerificationServiceImpl,
};
use backend::inbound::http::account::current_account;
use backend::inbound::http::payments::{checkout_descriptor, create_order, verify_payment};
use backend::inbound::http::state::HttpState;
use backend::outbound::persistence::{InMemoryCreditLedger, InMemoryOrderStore};

/// Gateway shared secret every harness signs with.
pub const TEST_SECRET: &str = "integration-secret";

/// Provider slug the harness routes accept.
pub const PROVIDER: &str = "razorpay";

/// Handler state plus direct handles on the adapters behind it.
pub struct TestHarness {
    pub state: HttpState,
    pub store: Arc<InMemoryOrderStore>,
    pub ledger: Arc<InMemoryCreditLedger>,
}

/// Harness over the fixture gateway and a custom identity verifier.
pub fn harness_with_identity(identity: Arc<dyn IdentityVerifier>) -> TestHarness {
    harness_with(FixtureGateway::default(), identity)
}

/// Harness over the fixture gateway, rejecting every presented credential.
pub fn harness() -> TestHarness {
    harness_with_identity(Arc::new(FixtureIdentityVerifier::default()))
}

/// Harness over an arbitrary gateway adapter.
pub fn harness_with<G>(gateway: G, identity: Arc<dyn IdentityVerifier>) -> TestHarness
where
    G: PaymentGateway + 'static,
{
    let store = Arc::new(InMemoryOrderStore::new());
    let ledger = Arc::new(InMemoryCreditLedger::new());
    let catalogue = PackageCatalog::new([
        PackageId::new("starter-pack").expect("valid package"),
        PackageId::new("scholar-pack").expect("valid package"),
    ]);
    let orders = Arc::new(OrderServiceImpl::new(
        Arc::new(gateway),
        store.clone(),
        Arc::new(StaticRateSource::policy_2024_01()),
        catalogue,
    ));
    let verification = Arc::new(VerificationServiceImpl::new(
        store.clone(),
        ledger.clone(),
        GatewaySecret::new(TEST_SECRET),
    ));
    let state = HttpState::new(PROVIDER, orders, verification, identity);
    TestHarness {
        state,
        store,
        ledger,
    }
}

/// Actix application exposing the payment and account routes under `/api`.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().app_data(web::Data::new(state)).service(
        web::scope("/api")
            .service(create_order)
            .service(verify_payment)
            .service(checkout_descriptor)
            .service(current_account),
    )
}

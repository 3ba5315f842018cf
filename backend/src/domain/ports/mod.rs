//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod credit_ledger;
mod identity_verifier;
mod order_repository;
mod order_service;
mod payment_gateway;
mod rate_source;
mod verification_service;

#[cfg(test)]
pub use credit_ledger::MockCreditLedger;
pub use credit_ledger::{CreditGrant, CreditLedger, CreditLedgerError, FixtureCreditLedger};
#[cfg(test)]
pub use identity_verifier::MockIdentityVerifier;
pub use identity_verifier::{
    FixtureIdentityVerifier, IdentityVerifier, IdentityVerifierError, TokenAssessment,
};
#[cfg(test)]
pub use order_repository::MockOrderRepository;
pub use order_repository::{FinalizeOutcome, OrderRepository, OrderRepositoryError};
#[cfg(test)]
pub use order_service::MockOrderService;
pub use order_service::{CreateOrderRequest, FixtureOrderService, OrderError, OrderService};
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{
    FIXTURE_KEY_ID, FixtureGateway, GatewayOrder, OrderDraft, PaymentGateway, PaymentGatewayError,
};
pub use rate_source::{RateSource, StaticRateSource};
#[cfg(test)]
pub use verification_service::MockVerificationService;
pub use verification_service::{
    FixtureVerificationService, VerificationService, VerificationServiceError,
    VerifyPaymentRequest,
};

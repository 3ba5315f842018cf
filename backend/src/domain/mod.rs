//! Domain types, ports, and services for the payment-order lifecycle.
//!
//! Types here are transport-agnostic and document their invariants in each
//! type's Rustdoc. Inbound adapters map them onto HTTP; outbound adapters
//! implement the ports.

pub mod checkout;
pub mod identity;
pub mod money;
pub mod order;
pub mod order_service;
pub mod ports;
pub mod verification;
pub mod verification_service;

pub use self::checkout::{
    ALL_METHODS, CheckoutDescriptor, MethodSelection, ParsePaymentMethodError, PaymentMethod,
    build_checkout_descriptor,
};
pub use self::identity::{
    AuthRejection, IdentityValidationError, RequestIdentity, SubjectId, VerifiedIdentity,
};
pub use self::money::{
    ConversionError, Currency, MinorUnits, RateQuote, SETTLEMENT_CURRENCY, to_minor_units,
};
pub use self::order::{
    ClientKey, Order, OrderId, OrderStatus, OrderValidationError, PackageCatalog, PackageId,
};
pub use self::order_service::OrderServiceImpl;
pub use self::verification::{
    GatewaySecret, PaymentReference, RecordedOutcome, Signature, VerificationFailure,
    VerificationOutcome, VerificationRecord, VerificationValidationError, expected_signature,
    signature_matches,
};
pub use self::verification_service::VerificationServiceImpl;

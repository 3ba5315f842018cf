//! Backend core of the knowledge-assessment product's payment-order
//! lifecycle: bearer-credential identity verification, gateway order
//! creation, checkout descriptor projection, and HMAC-verified payment
//! verification with at-most-once credit issuance.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod models;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
/// Request-scoped trace middleware applied to every route.
pub use middleware::RequestTrace;

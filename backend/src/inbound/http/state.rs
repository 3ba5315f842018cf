//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they depend only
//! on domain ports and remain testable without I/O. Everything here is
//! constructed explicitly at startup and injected; no port is reached through
//! process-global initialisation.

use std::sync::Arc;

use crate::domain::ports::{IdentityVerifier, OrderService, VerificationService};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Slug the `{provider}` path segment must match.
    pub provider: String,
    /// Order creation and checkout projection.
    pub orders: Arc<dyn OrderService>,
    /// Payment verification.
    pub verification: Arc<dyn VerificationService>,
    /// Bearer credential verification.
    pub identity: Arc<dyn IdentityVerifier>,
}

impl HttpState {
    /// Bundle the ports behind one state value.
    pub fn new(
        provider: impl Into<String>,
        orders: Arc<dyn OrderService>,
        verification: Arc<dyn VerificationService>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            provider: provider.into(),
            orders,
            verification,
            identity,
        }
    }
}

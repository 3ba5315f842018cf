//! Driving port for payment verification.

use async_trait::async_trait;

use crate::domain::{
    OrderId, PackageId, PaymentReference, Signature, SubjectId, VerificationOutcome,
};

/// Infrastructure failures surfaced by the verification service.
///
/// Verification *failures* (unknown order, signature mismatch, ...) are not
/// errors; they are [`VerificationOutcome::Failed`] values. These variants
/// cover the dependencies breaking underneath a structurally valid attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationServiceError {
    /// The order store failed.
    #[error("order store failure: {message}")]
    Repository {
        /// Adapter-reported failure detail.
        message: String,
    },
    /// The credit ledger refused or could not accept the grant.
    #[error("credit ledger failure: {message}")]
    Ledger {
        /// Adapter-reported failure detail.
        message: String,
    },
}

/// A claimed completed payment, as forwarded by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyPaymentRequest {
    /// Order the payment claims to settle.
    pub order_id: OrderId,
    /// Provider-issued payment reference.
    pub payment_reference: PaymentReference,
    /// Signature the provider is claimed to have produced.
    pub signature: Signature,
    /// Package the client believes it purchased; must match the order.
    pub package_id: PackageId,
    /// Verified subject of the request, when one was presented.
    pub subject_id: Option<SubjectId>,
}

/// Driving port: verify claimed payments with at-most-once crediting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Verify `request` against the stored order and the gateway secret.
    async fn verify(
        &self,
        request: VerifyPaymentRequest,
    ) -> Result<VerificationOutcome, VerificationServiceError>;
}

/// Fixture service reporting every attempt as freshly verified.
#[derive(Debug, Default)]
pub struct FixtureVerificationService;

#[async_trait]
impl VerificationService for FixtureVerificationService {
    async fn verify(
        &self,
        _request: VerifyPaymentRequest,
    ) -> Result<VerificationOutcome, VerificationServiceError> {
        Ok(VerificationOutcome::Verified { replayed: false })
    }
}

//! Payment verification service implementing the driving port.
//!
//! Enforces the server-authoritative state machine: an order is finalised at
//! most once, the finalising transition and the record write are one atomic
//! repository step, and only the transition winner with a verified signature
//! touches the credit ledger.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::ports::{
    CreditGrant, CreditLedger, CreditLedgerError, FinalizeOutcome, OrderRepository,
    OrderRepositoryError, VerificationService, VerificationServiceError, VerifyPaymentRequest,
};
use crate::domain::verification::{
    GatewaySecret, RecordedOutcome, VerificationFailure, VerificationOutcome, VerificationRecord,
    expected_signature, signature_matches,
};
use crate::domain::OrderStatus;

/// Verification service over an order repository and a credit ledger.
#[derive(Clone)]
pub struct VerificationServiceImpl<R, L> {
    repository: Arc<R>,
    ledger: Arc<L>,
    secret: GatewaySecret,
}

impl<R, L> VerificationServiceImpl<R, L> {
    /// Create a new service keyed with the gateway shared secret.
    pub fn new(repository: Arc<R>, ledger: Arc<L>, secret: GatewaySecret) -> Self {
        Self {
            repository,
            ledger,
            secret,
        }
    }
}

fn map_repository_error(error: OrderRepositoryError) -> VerificationServiceError {
    VerificationServiceError::Repository {
        message: error.to_string(),
    }
}

fn map_ledger_error(error: CreditLedgerError) -> VerificationServiceError {
    VerificationServiceError::Ledger {
        message: error.to_string(),
    }
}

fn failed(reason: VerificationFailure) -> VerificationOutcome {
    VerificationOutcome::Failed {
        reason,
        replayed: false,
    }
}

#[async_trait]
impl<R, L> VerificationService for VerificationServiceImpl<R, L>
where
    R: OrderRepository,
    L: CreditLedger,
{
    async fn verify(
        &self,
        request: VerifyPaymentRequest,
    ) -> Result<VerificationOutcome, VerificationServiceError> {
        let Some(order) = self
            .repository
            .find(&request.order_id)
            .await
            .map_err(map_repository_error)?
        else {
            warn!(order_id = %request.order_id, "verification attempt against unknown order");
            return Ok(failed(VerificationFailure::OrderNotFound));
        };

        // Terminal orders replay their recorded outcome: no recomputation,
        // no new record, no credit.
        if let Some(record) = self
            .repository
            .verification(&order.id)
            .await
            .map_err(map_repository_error)?
        {
            info!(order_id = %order.id, "replaying terminal verification outcome");
            return Ok(VerificationOutcome::from_record(&record, true));
        }
        if order.status == OrderStatus::Expired {
            return Ok(failed(VerificationFailure::OrderExpired));
        }
        if order.package_id != request.package_id {
            warn!(
                order_id = %order.id,
                supplied = %request.package_id,
                expected = %order.package_id,
                "verification attempt with mismatched package"
            );
            return Ok(failed(VerificationFailure::PackageMismatch));
        }

        let expected = expected_signature(&self.secret, &order.id, &request.payment_reference);
        let outcome = if signature_matches(&expected, &request.signature) {
            RecordedOutcome::Verified
        } else {
            RecordedOutcome::Failed
        };
        let record = VerificationRecord {
            order_id: order.id.clone(),
            payment_reference: request.payment_reference.clone(),
            signature: request.signature.clone(),
            verified_at: Utc::now(),
            outcome,
        };

        match self
            .repository
            .finalize(record)
            .await
            .map_err(map_repository_error)?
        {
            FinalizeOutcome::Applied(applied) => {
                if applied.outcome == RecordedOutcome::Verified {
                    self.ledger
                        .issue(CreditGrant {
                            order_id: order.id.clone(),
                            package_id: order.package_id.clone(),
                            subject_id: request.subject_id,
                        })
                        .await
                        .map_err(map_ledger_error)?;
                    info!(order_id = %order.id, "payment verified; credits issued");
                } else {
                    warn!(order_id = %order.id, "signature mismatch; order failed");
                }
                Ok(VerificationOutcome::from_record(&applied, false))
            }
            FinalizeOutcome::AlreadyFinal(prior) => {
                info!(order_id = %order.id, "lost the finalising race; replaying prior outcome");
                Ok(VerificationOutcome::from_record(&prior, true))
            }
            FinalizeOutcome::Expired => Ok(failed(VerificationFailure::OrderExpired)),
        }
    }
}

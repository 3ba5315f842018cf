//! Port abstraction for the external credit ledger.
//!
//! Credit issuance is the externally visible effect gated behind successful,
//! first-time verification. The verification service calls this port at most
//! once per order; the ledger itself lives outside this core.

use async_trait::async_trait;

use crate::domain::{OrderId, PackageId, SubjectId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by credit ledger adapters.
    pub enum CreditLedgerError {
        /// The ledger could not be reached or refused the write.
        Unavailable { message: String } => "credit ledger unavailable: {message}",
    }
}

/// One credit issuance, tied to the order that paid for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditGrant {
    /// Order whose verification earned the credits.
    pub order_id: OrderId,
    /// Package purchased.
    pub package_id: PackageId,
    /// Verified subject the caller presented, when the request carried one.
    pub subject_id: Option<SubjectId>,
}

/// Port for issuing purchased credits to the external ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Issue the credits described by `grant`.
    async fn issue(&self, grant: CreditGrant) -> Result<(), CreditLedgerError>;
}

/// Fixture ledger that accepts every grant and remembers nothing.
#[derive(Debug, Default)]
pub struct FixtureCreditLedger;

#[async_trait]
impl CreditLedger for FixtureCreditLedger {
    async fn issue(&self, _grant: CreditGrant) -> Result<(), CreditLedgerError> {
        Ok(())
    }
}

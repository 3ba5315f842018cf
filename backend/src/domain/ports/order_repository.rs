//! Port abstraction for order and verification-record persistence.
//!
//! The repository owns the one piece of concurrency-sensitive state in the
//! system: the `Created → {Verified | Failed}` transition. [`OrderRepository::finalize`]
//! performs that transition and the record write as a single atomic step, so
//! two racing verification attempts resolve to one winner and one replay.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ClientKey, Order, OrderId, VerificationRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by order repository adapters.
    pub enum OrderRepositoryError {
        /// Store connection could not be established.
        Connection { message: String } => "order store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "order store query failed: {message}",
        /// An order with this identifier already exists.
        DuplicateOrder { order_id: String } => "order already exists: {order_id}",
    }
}

/// Result of the atomic terminal transition on an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The caller won the transition; its record is now the order's record.
    ///
    /// Only the winner performs credit issuance, and only for a `Verified`
    /// record.
    Applied(VerificationRecord),
    /// Another attempt already finalised the order; here is its record.
    AlreadyFinal(VerificationRecord),
    /// The order was swept to `Expired` before any attempt finalised it.
    Expired,
}

/// Port for order and verification-record storage.
///
/// Durable storage is the surrounding system's concern; this core only
/// requires the shape and the atomicity of `finalize`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a freshly created order.
    async fn insert(&self, order: Order) -> Result<(), OrderRepositoryError>;

    /// Fetch an order by its provider-issued identifier.
    async fn find(&self, order_id: &OrderId) -> Result<Option<Order>, OrderRepositoryError>;

    /// Fetch the order minted for a caller idempotency key, if any.
    async fn find_by_client_key(
        &self,
        key: &ClientKey,
    ) -> Result<Option<Order>, OrderRepositoryError>;

    /// Atomically apply the terminal transition described by `record` and
    /// store the record, or report the transition that beat it.
    async fn finalize(
        &self,
        record: VerificationRecord,
    ) -> Result<FinalizeOutcome, OrderRepositoryError>;

    /// Fetch the verification record finalising `order_id`, if any.
    async fn verification(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<VerificationRecord>, OrderRepositoryError>;

    /// Mark `Created` orders older than `ttl` as `Expired`.
    ///
    /// Returns the number of orders swept. An operational sweep, not a
    /// background task.
    async fn expire_stale(&self, ttl: Duration) -> Result<u64, OrderRepositoryError>;
}

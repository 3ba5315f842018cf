//! In-process persistence adapters.
//!
//! Thread-safe in-memory implementations of the order repository and credit
//! ledger ports. Durable storage is the surrounding system's concern; these
//! adapters carry the full transition semantics, including the atomic
//! finalise, so the service behaves identically when a durable adapter is
//! swapped in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::ports::{
    CreditGrant, CreditLedger, CreditLedgerError, FinalizeOutcome, OrderRepository,
    OrderRepositoryError,
};
use crate::domain::{ClientKey, Order, OrderId, OrderStatus, RecordedOutcome, VerificationRecord};

#[derive(Debug, Clone)]
struct StoredOrder {
    order: Order,
    record: Option<VerificationRecord>,
}

/// Thread-safe in-memory order store.
///
/// The write lock taken in [`OrderRepository::finalize`] makes the terminal
/// status transition and the record write one atomic step, which is the
/// entire concurrency contract of this core.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, StoredOrder>>>,
}

impl InMemoryOrderStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), OrderRepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(OrderRepositoryError::duplicate_order(order.id.to_string()));
        }
        orders.insert(order.id.clone(), StoredOrder {
            order,
            record: None,
        });
        Ok(())
    }

    async fn find(&self, order_id: &OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_id).map(|stored| stored.order.clone()))
    }

    async fn find_by_client_key(
        &self,
        key: &ClientKey,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|stored| stored.order.client_key.as_ref() == Some(key))
            .map(|stored| stored.order.clone()))
    }

    async fn finalize(
        &self,
        record: VerificationRecord,
    ) -> Result<FinalizeOutcome, OrderRepositoryError> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&record.order_id).ok_or_else(|| {
            OrderRepositoryError::query(format!("unknown order: {}", record.order_id))
        })?;
        if let Some(existing) = &stored.record {
            return Ok(FinalizeOutcome::AlreadyFinal(existing.clone()));
        }
        match stored.order.status {
            OrderStatus::Expired => Ok(FinalizeOutcome::Expired),
            OrderStatus::Created => {
                stored.order.status = match record.outcome {
                    RecordedOutcome::Verified => OrderStatus::Verified,
                    RecordedOutcome::Failed => OrderStatus::Failed,
                };
                stored.record = Some(record.clone());
                Ok(FinalizeOutcome::Applied(record))
            }
            OrderStatus::Verified | OrderStatus::Failed => {
                // Terminal without a record only happens if a durable store
                // was seeded inconsistently; refuse rather than guess.
                Err(OrderRepositoryError::query(format!(
                    "order {} is terminal but has no verification record",
                    record.order_id
                )))
            }
        }
    }

    async fn verification(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<VerificationRecord>, OrderRepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_id).and_then(|stored| stored.record.clone()))
    }

    async fn expire_stale(&self, ttl: Duration) -> Result<u64, OrderRepositoryError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|err| OrderRepositoryError::query(format!("ttl out of range: {err}")))?;
        let cutoff = Utc::now() - ttl;
        let mut orders = self.orders.write().await;
        let mut swept = 0;
        for stored in orders.values_mut() {
            if stored.order.status == OrderStatus::Created && stored.order.created_at < cutoff {
                stored.order.status = OrderStatus::Expired;
                swept += 1;
            }
        }
        Ok(swept)
    }
}

/// Thread-safe in-memory credit ledger that records every grant.
///
/// The recorded grants make at-most-once crediting observable in tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCreditLedger {
    grants: Arc<RwLock<Vec<CreditGrant>>>,
}

impl InMemoryCreditLedger {
    /// Create a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every grant issued so far.
    pub async fn grants(&self) -> Vec<CreditGrant> {
        self.grants.read().await.clone()
    }
}

#[async_trait]
impl CreditLedger for InMemoryCreditLedger {
    async fn issue(&self, grant: CreditGrant) -> Result<(), CreditLedgerError> {
        self.grants.write().await.push(grant);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the atomic finalise semantics.
    use super::*;
    use crate::domain::{
        Currency, GatewaySecret, MinorUnits, PackageId, PaymentReference, expected_signature,
    };

    fn order(id: &str) -> Order {
        Order::created(
            OrderId::new(id).expect("valid id"),
            MinorUnits::new(996).expect("positive"),
            Currency::Inr,
            PackageId::new("starter-pack").expect("valid package"),
            "rzp_test_key",
            None,
        )
    }

    fn record(order_id: &str, outcome: RecordedOutcome) -> VerificationRecord {
        let order_id = OrderId::new(order_id).expect("valid id");
        let reference = PaymentReference::new("pay_123").expect("valid reference");
        let signature = expected_signature(&GatewaySecret::new("s"), &order_id, &reference);
        VerificationRecord {
            order_id,
            payment_reference: reference,
            signature,
            verified_at: Utc::now(),
            outcome,
        }
    }

    #[tokio::test]
    async fn stores_and_finds_orders() {
        let store = InMemoryOrderStore::new();
        store.insert(order("order_1")).await.expect("insert");
        let found = store
            .find(&OrderId::new("order_1").expect("valid id"))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.status, OrderStatus::Created);
        assert!(
            store
                .find(&OrderId::new("order_2").expect("valid id"))
                .await
                .expect("find")
                .is_none()
        );
    }

    #[tokio::test]
    async fn rejects_duplicate_order_ids() {
        let store = InMemoryOrderStore::new();
        store.insert(order("order_1")).await.expect("insert");
        let err = store.insert(order("order_1")).await.expect_err("duplicate");
        assert!(matches!(err, OrderRepositoryError::DuplicateOrder { .. }));
    }

    #[tokio::test]
    async fn finds_orders_by_client_key() {
        let store = InMemoryOrderStore::new();
        let key = ClientKey::random();
        let mut keyed = order("order_1");
        keyed.client_key = Some(key.clone());
        store.insert(keyed).await.expect("insert");
        store.insert(order("order_2")).await.expect("insert");

        let found = store
            .find_by_client_key(&key)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(found.id.as_ref(), "order_1");
        assert!(
            store
                .find_by_client_key(&ClientKey::random())
                .await
                .expect("lookup")
                .is_none()
        );
    }

    #[tokio::test]
    async fn finalize_applies_once_and_replays_after() {
        let store = InMemoryOrderStore::new();
        store.insert(order("order_1")).await.expect("insert");

        let first = store
            .finalize(record("order_1", RecordedOutcome::Verified))
            .await
            .expect("finalize");
        assert!(matches!(first, FinalizeOutcome::Applied(_)));

        let second = store
            .finalize(record("order_1", RecordedOutcome::Failed))
            .await
            .expect("finalize");
        let FinalizeOutcome::AlreadyFinal(prior) = second else {
            panic!("second finalise must replay the first record");
        };
        assert_eq!(prior.outcome, RecordedOutcome::Verified);

        let found = store
            .find(&OrderId::new("order_1").expect("valid id"))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.status, OrderStatus::Verified);
    }

    #[tokio::test]
    async fn racing_finalises_produce_exactly_one_winner() {
        let store = InMemoryOrderStore::new();
        store.insert(order("order_1")).await.expect("insert");

        let (left, right) = tokio::join!(
            store.finalize(record("order_1", RecordedOutcome::Verified)),
            store.finalize(record("order_1", RecordedOutcome::Verified)),
        );
        let outcomes = [left.expect("finalize"), right.expect("finalize")];
        let winners = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, FinalizeOutcome::Applied(_)))
            .count();
        let replays = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, FinalizeOutcome::AlreadyFinal(_)))
            .count();
        assert_eq!((winners, replays), (1, 1));
    }

    #[tokio::test]
    async fn expired_orders_refuse_finalisation() {
        let store = InMemoryOrderStore::new();
        let mut stale = order("order_1");
        stale.created_at = Utc::now() - chrono::Duration::hours(2);
        store.insert(stale).await.expect("insert");

        let swept = store
            .expire_stale(Duration::from_secs(3600))
            .await
            .expect("sweep");
        assert_eq!(swept, 1);

        let outcome = store
            .finalize(record("order_1", RecordedOutcome::Verified))
            .await
            .expect("finalize");
        assert_eq!(outcome, FinalizeOutcome::Expired);
    }

    #[tokio::test]
    async fn sweep_ignores_fresh_and_terminal_orders() {
        let store = InMemoryOrderStore::new();
        store.insert(order("order_fresh")).await.expect("insert");
        let mut finalised = order("order_done");
        finalised.created_at = Utc::now() - chrono::Duration::hours(2);
        store.insert(finalised).await.expect("insert");
        store
            .finalize(record("order_done", RecordedOutcome::Verified))
            .await
            .expect("finalize");

        let swept = store
            .expire_stale(Duration::from_secs(3600))
            .await
            .expect("sweep");
        assert_eq!(swept, 0);
    }

    #[tokio::test]
    async fn ledger_records_grants_in_order() {
        let ledger = InMemoryCreditLedger::new();
        ledger
            .issue(CreditGrant {
                order_id: OrderId::new("order_1").expect("valid id"),
                package_id: PackageId::new("starter-pack").expect("valid package"),
                subject_id: None,
            })
            .await
            .expect("issue");
        let grants = ledger.grants().await;
        assert_eq!(grants.len(), 1);
        assert_eq!(grants.first().map(|g| g.order_id.as_ref()), Some("order_1"));
    }
}

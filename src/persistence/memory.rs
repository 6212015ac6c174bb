//! In-process document store.
//!
//! Each collection is a `HashMap` behind a [`tokio::sync::RwLock`], with a
//! secondary session-id index for transactions. Used when persistence is
//! disabled and by the test suites.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{RegistrationStore, StatusChange, TransactionStore};
use crate::domain::{
    PaymentStatus, PaymentTransaction, Registration, RegistrationId, RegistrationStatus,
    TransactionId,
};
use crate::error::ApiError;

#[derive(Debug, Default)]
struct Transactions {
    by_id: HashMap<TransactionId, PaymentTransaction>,
    by_session: HashMap<String, TransactionId>,
}

/// Volatile store holding both collections.
///
/// # Concurrency
///
/// Reads run concurrently; writes to one collection are serialized. The two
/// collections are locked independently, like two separate document
/// collections.
#[derive(Debug, Default)]
pub struct MemoryStore {
    registrations: RwLock<HashMap<RegistrationId, Registration>>,
    transactions: RwLock<Transactions>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored registrations.
    pub async fn registration_count(&self) -> usize {
        self.registrations.read().await.len()
    }

    /// Number of stored transactions.
    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.by_id.len()
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn insert_registration(&self, registration: &Registration) -> Result<(), ApiError> {
        let mut map = self.registrations.write().await;
        if map.contains_key(&registration.id) {
            return Err(ApiError::PersistenceError(format!(
                "registration {} already exists",
                registration.id
            )));
        }
        map.insert(registration.id, registration.clone());
        Ok(())
    }

    async fn find_registration(
        &self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, ApiError> {
        Ok(self.registrations.read().await.get(&id).cloned())
    }

    async fn advance_registration_status(
        &self,
        id: RegistrationId,
        status: RegistrationStatus,
        at: DateTime<Utc>,
    ) -> Result<StatusChange, ApiError> {
        let mut map = self.registrations.write().await;
        let Some(registration) = map.get_mut(&id) else {
            return Ok(StatusChange::NotFound);
        };
        if !registration.status.can_advance_to(status) {
            return Ok(StatusChange::Unchanged(registration.status));
        }
        registration.status = status;
        registration.updated_at = Some(at);
        Ok(StatusChange::Advanced)
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(&self, transaction: &PaymentTransaction) -> Result<(), ApiError> {
        let mut txs = self.transactions.write().await;
        if txs.by_session.contains_key(&transaction.provider_session_id) {
            return Err(ApiError::PersistenceError(format!(
                "session {} already has a transaction",
                transaction.provider_session_id
            )));
        }
        txs.by_session
            .insert(transaction.provider_session_id.clone(), transaction.id);
        txs.by_id.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn find_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentTransaction>, ApiError> {
        let txs = self.transactions.read().await;
        Ok(txs
            .by_session
            .get(session_id)
            .and_then(|id| txs.by_id.get(id))
            .cloned())
    }

    async fn update_polled_status(
        &self,
        session_id: &str,
        payment_status: &PaymentStatus,
        status: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        let mut txs = self.transactions.write().await;
        let Some(id) = txs.by_session.get(session_id).copied() else {
            return Ok(false);
        };
        let Some(tx) = txs.by_id.get_mut(&id) else {
            return Ok(false);
        };
        tx.payment_status = payment_status.clone();
        tx.status = status.to_string();
        tx.updated_at = Some(at);
        Ok(true)
    }

    async fn record_webhook(
        &self,
        session_id: &str,
        payment_status: &PaymentStatus,
        event_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<PaymentTransaction>, ApiError> {
        let mut txs = self.transactions.write().await;
        let Some(id) = txs.by_session.get(session_id).copied() else {
            return Ok(None);
        };
        let Some(tx) = txs.by_id.get_mut(&id) else {
            return Ok(None);
        };
        tx.payment_status = payment_status.clone();
        tx.event_id = Some(event_id.to_string());
        tx.webhook_processed_at = Some(at);
        Ok(Some(tx.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{INITIATED_STATUS, NewRegistration, PackageCatalog};

    fn make_registration() -> Registration {
        let catalog = PackageCatalog::builtin();
        let Some(pkg) = catalog.get("baby_splash") else {
            panic!("baby_splash missing");
        };
        Registration::new(
            NewRegistration {
                parent_name: "Parent".to_string(),
                phone: "+7 700 000 0000".to_string(),
                child_name: "Kid".to_string(),
                child_age: 1,
                email: None,
                notes: None,
            },
            pkg,
        )
    }

    fn make_transaction(session_id: &str, registration_id: RegistrationId) -> PaymentTransaction {
        PaymentTransaction {
            id: TransactionId::new(),
            provider_session_id: session_id.to_string(),
            registration_id,
            package_id: "baby_splash".to_string(),
            amount: dec!(15000),
            currency: "kzt".to_string(),
            payment_status: PaymentStatus::Pending,
            status: INITIATED_STATUS.to_string(),
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: None,
            event_id: None,
            webhook_processed_at: None,
        }
    }

    #[tokio::test]
    async fn insert_and_find_registration() {
        let store = MemoryStore::new();
        let reg = make_registration();
        assert!(store.insert_registration(&reg).await.is_ok());
        assert_eq!(store.registration_count().await, 1);

        let found = store.find_registration(reg.id).await.ok().flatten();
        assert_eq!(found, Some(reg));
        let missing = store.find_registration(RegistrationId::new()).await.ok().flatten();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_rejected() {
        let store = MemoryStore::new();
        let reg = make_registration();
        let _ = store.insert_registration(&reg).await;
        assert!(store.insert_registration(&reg).await.is_err());
    }

    #[tokio::test]
    async fn status_advances_but_never_regresses() {
        let store = MemoryStore::new();
        let reg = make_registration();
        let _ = store.insert_registration(&reg).await;
        let now = Utc::now();

        let change = store
            .advance_registration_status(reg.id, RegistrationStatus::Confirmed, now)
            .await;
        assert_eq!(change.ok(), Some(StatusChange::Advanced));

        let change = store
            .advance_registration_status(reg.id, RegistrationStatus::Paid, now)
            .await;
        assert_eq!(
            change.ok(),
            Some(StatusChange::Unchanged(RegistrationStatus::Confirmed))
        );

        let Ok(Some(stored)) = store.find_registration(reg.id).await else {
            panic!("registration missing");
        };
        assert_eq!(stored.status, RegistrationStatus::Confirmed);
        assert_eq!(stored.updated_at, Some(now));
    }

    #[tokio::test]
    async fn advancing_unknown_registration_reports_not_found() {
        let store = MemoryStore::new();
        let change = store
            .advance_registration_status(RegistrationId::new(), RegistrationStatus::Paid, Utc::now())
            .await;
        assert_eq!(change.ok(), Some(StatusChange::NotFound));
    }

    #[tokio::test]
    async fn transaction_lookup_by_session() {
        let store = MemoryStore::new();
        let tx = make_transaction("cs_1", RegistrationId::new());
        assert!(store.insert_transaction(&tx).await.is_ok());
        assert!(store.insert_transaction(&tx).await.is_err());

        let found = store.find_by_session("cs_1").await.ok().flatten();
        assert_eq!(found, Some(tx));
        assert!(store.find_by_session("cs_2").await.ok().flatten().is_none());
    }

    #[tokio::test]
    async fn polled_update_overwrites_fields() {
        let store = MemoryStore::new();
        let _ = store
            .insert_transaction(&make_transaction("cs_1", RegistrationId::new()))
            .await;
        let at = Utc::now();

        let updated = store
            .update_polled_status("cs_1", &PaymentStatus::Paid, "complete", at)
            .await;
        assert_eq!(updated.ok(), Some(true));
        let missing = store
            .update_polled_status("cs_x", &PaymentStatus::Paid, "complete", at)
            .await;
        assert_eq!(missing.ok(), Some(false));

        let Ok(Some(tx)) = store.find_by_session("cs_1").await else {
            panic!("transaction missing");
        };
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.status, "complete");
        assert_eq!(tx.updated_at, Some(at));
    }

    #[tokio::test]
    async fn webhook_record_returns_updated_transaction() {
        let store = MemoryStore::new();
        let _ = store
            .insert_transaction(&make_transaction("cs_1", RegistrationId::new()))
            .await;

        let Ok(Some(tx)) = store
            .record_webhook("cs_1", &PaymentStatus::Paid, "evt_1", Utc::now())
            .await
        else {
            panic!("transaction should match");
        };
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.event_id.as_deref(), Some("evt_1"));
        assert!(tx.webhook_processed_at.is_some());
        assert!(tx.updated_at.is_none());

        let none = store
            .record_webhook("cs_x", &PaymentStatus::Paid, "evt_2", Utc::now())
            .await;
        assert_eq!(none.ok(), Some(None));
    }
}

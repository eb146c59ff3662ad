use std::sync::Arc;

use api_types::transaction::{Transaction, TransactionNew};
use engine::ValidTransaction;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{ApiClient, ClientError, QueryCache, QueryKey, QueryState};

/// Cache key of a user's transaction list.
pub fn transactions_key(user_id: &str) -> QueryKey {
    QueryKey::new(["transactions", user_id])
}

/// List, create and delete the transactions of one user.
///
/// Reads go through the shared [`QueryCache`]; successful writes invalidate
/// the list so the next read goes back to the server.
#[derive(Debug, Clone)]
pub struct Transactions {
    api: ApiClient,
    cache: Arc<QueryCache>,
    user_id: String,
}

impl Transactions {
    pub fn new(api: ApiClient, cache: Arc<QueryCache>, user_id: impl Into<String>) -> Self {
        Self {
            api,
            cache,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> QueryKey {
        transactions_key(&self.user_id)
    }

    /// Transaction list, served from cache while fresh.
    pub async fn list(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QueryState<Vec<Transaction>>, ClientError> {
        self.cache
            .query(&self.key(), cancel, || self.api.list_transactions(&self.user_id))
            .await
    }

    /// Pull-to-refresh: always revalidates against the server.
    pub async fn refresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QueryState<Vec<Transaction>>, ClientError> {
        self.cache
            .refresh(&self.key(), cancel, || self.api.list_transactions(&self.user_id))
            .await
    }

    /// Runs [`Transactions::refresh`] on a background task.
    pub fn spawn_refresh(
        &self,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<QueryState<Vec<Transaction>>, ClientError>> {
        let this = self.clone();
        tokio::spawn(async move { this.refresh(&cancel).await })
    }

    /// Cached list without touching the network.
    #[must_use]
    pub fn cached(&self) -> QueryState<Vec<Transaction>> {
        self.cache.peek(&self.key())
    }

    /// Submits a validated form.
    ///
    /// Cancelling drops the in-flight request; the server may still have
    /// stored the record, so the list is not invalidated either way.
    pub async fn create(
        &self,
        transaction: ValidTransaction,
        cancel: &CancellationToken,
    ) -> Result<(), ClientError> {
        let payload = TransactionNew::from_valid(&self.user_id, transaction);
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.api.create_transaction(&payload) => result,
        };

        match result {
            Ok(()) => {
                tracing::info!(title = %payload.title, amount = %payload.amount, "transaction created");
                self.cache.invalidate(&self.key()).await;
                Ok(())
            }
            Err(err) => {
                tracing::error!("failed to create transaction: {err}");
                Err(err)
            }
        }
    }

    /// Deletes a transaction by id. No optimistic removal: the list changes
    /// only after the server confirms and the cache is revalidated.
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<(), ClientError> {
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = self.api.delete_transaction(id) => result,
        };

        match result {
            Ok(()) => {
                tracing::info!(id, "transaction deleted");
                self.cache.invalidate(&self.key()).await;
                Ok(())
            }
            Err(err) => {
                tracing::error!(id, "failed to delete transaction: {err}");
                Err(err)
            }
        }
    }
}

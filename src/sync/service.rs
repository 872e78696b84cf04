//! Authoritative replica and the sync pipeline

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::db::ItemTable;
use crate::document::{DocumentError, ItemRecord, Replica};
use crate::error::{AppError, Result};

use super::types::SyncStage;

/// Owner of the server's authoritative replica
///
/// Writers go through `handle_sync`, which holds an async mutex across merge
/// and persist so table writes land in merge order. Readers never take that
/// lock: they read the encoding published after each merge.
pub struct SyncService {
    authoritative: Mutex<Replica>,
    snapshot: RwLock<Arc<[u8]>>,
    table: Arc<dyn ItemTable>,
    storage_timeout: Duration,
}

impl SyncService {
    /// Wrap an existing replica
    pub fn new(mut replica: Replica, table: Arc<dyn ItemTable>, storage_timeout: Duration) -> Self {
        let snapshot: Arc<[u8]> = replica.encode().into();
        Self {
            authoritative: Mutex::new(replica),
            snapshot: RwLock::new(snapshot),
            table,
            storage_timeout,
        }
    }

    /// Build the authoritative replica from the items table
    ///
    /// Storage failures are not fatal: the service starts from an empty
    /// document instead. A rebuilt document has a fresh history, since the
    /// table never stored any.
    pub async fn bootstrap(table: Arc<dyn ItemTable>, storage_timeout: Duration) -> Self {
        let replica = match with_timeout(storage_timeout, table.read_all()).await {
            Ok(records) => match rehydrate(&records) {
                Ok(replica) => {
                    tracing::info!("Loaded {} items from storage", records.len());
                    replica
                }
                Err(e) => {
                    tracing::error!("Could not rebuild document from storage: {}", e);
                    Replica::init_empty()
                }
            },
            Err(e) => {
                tracing::warn!("Starting with an empty document, storage unavailable: {}", e);
                Replica::init_empty()
            }
        };

        Self::new(replica, table, storage_timeout)
    }

    /// Encoded authoritative replica
    pub fn handle_get_doc(&self) -> Vec<u8> {
        self.snapshot.read().to_vec()
    }

    /// Merge a client's replica, persist the result and return it encoded
    ///
    /// A decode or merge failure leaves the authoritative replica untouched.
    /// Once the merge has happened it stays, even if persisting fails
    /// afterwards.
    pub async fn handle_sync(&self, client_bytes: &[u8]) -> Result<Vec<u8>> {
        tracing::debug!(stage = %SyncStage::Received, bytes = client_bytes.len());

        match self.sync(client_bytes).await {
            Ok(merged) => {
                tracing::debug!(stage = %SyncStage::Responded, bytes = merged.len());
                Ok(merged)
            }
            Err(e) => {
                tracing::debug!(stage = %SyncStage::Failed, error = %e);
                Err(e)
            }
        }
    }

    /// Items of the authoritative replica
    #[cfg(test)]
    pub async fn items(&self) -> Result<Vec<ItemRecord>> {
        self.authoritative.lock().await.items().map_err(AppError::Merge)
    }

    async fn sync(&self, client_bytes: &[u8]) -> Result<Vec<u8>> {
        let mut client = Replica::decode(client_bytes).map_err(AppError::Decode)?;
        tracing::debug!(stage = %SyncStage::Decoded);

        let mut authoritative = self.authoritative.lock().await;

        // No await between merge and publish
        authoritative.merge(&mut client).map_err(AppError::Merge)?;
        let merged = authoritative.encode();
        *self.snapshot.write() = Arc::from(merged.as_slice());
        tracing::debug!(stage = %SyncStage::Merged);

        let items = authoritative.items().map_err(AppError::Merge)?;
        with_timeout(self.storage_timeout, self.table.rewrite_all(&items)).await?;
        tracing::debug!(stage = %SyncStage::Persisted);

        tracing::info!("Merged client changes and persisted {} items", items.len());
        Ok(merged)
    }
}

fn rehydrate(records: &[ItemRecord]) -> std::result::Result<Replica, DocumentError> {
    let mut replica = Replica::init_empty();
    replica.set_items(records)?;
    Ok(replica)
}

async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AppError::StorageTimeout(limit))?
}

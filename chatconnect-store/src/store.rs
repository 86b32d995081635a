use async_trait::async_trait;
use thiserror::Error;

use crate::{Document, DocumentPath, Fields, Query, Subscription, Timestamp, Transaction};

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store is unreachable and refuses writes.
    #[error("Store is offline")]
    Offline,
    /// A transaction kept conflicting with concurrent writes and gave up.
    #[error("Transaction aborted after {attempts} attempts")]
    Conflict { attempts: usize },
    /// A document's fields could not be decoded into the expected record.
    #[error("Malformed document at {path}: {reason}")]
    Malformed { path: String, reason: String },
    /// An unknown or internal error happened with the store.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Represents a durable document store offering atomic multi-document
/// transactions and realtime change subscriptions.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Reads a single document, if it exists.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>>;

    /// Creates or overwrites the document at the path.
    async fn set(&self, path: &DocumentPath, fields: Fields) -> Result<()>;

    /// Deletes the document at the path. Deleting an absent document is not
    /// an error.
    async fn delete(&self, path: &DocumentPath) -> Result<()>;

    /// Returns the documents matching a query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Runs a closure atomically against the store.
    ///
    /// The closure may run more than once when its reads conflict with
    /// concurrent writes, so it must be free of side effects outside the
    /// handle. Staged writes apply only when the closure returns Ok.
    async fn run_transaction<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: FnMut(&mut Transaction) -> Result<T> + Send;

    /// Opens a standing subscription over a query.
    ///
    /// The current result set is delivered immediately, then again every time
    /// it changes. Dropping the subscription tears the listener down.
    fn subscribe(&self, query: &Query) -> Subscription;

    /// Returns the store's monotonically increasing timestamp.
    async fn server_timestamp(&self) -> Result<Timestamp>;

    /// Returns false while the store cannot accept writes.
    fn is_online(&self) -> bool;
}

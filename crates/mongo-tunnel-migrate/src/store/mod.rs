//! Data-access abstraction over a connected document database.
//!
//! [`DocumentStore`] is the capability contract the migrator consumes: it
//! can enumerate databases and collections, count and stream documents,
//! and accept bulk inserts. Connection management (tunnels, credentials,
//! TLS) happens entirely outside this trait — implementations are handed
//! to the migrator already connected and are closed by the caller.

mod mongo;

pub use mongo::MongoStore;

use crate::error::Result;
use async_trait::async_trait;
use mongodb::bson::Document;
use tokio::sync::mpsc;

/// Capability contract over a connected document database.
///
/// # Streaming
///
/// [`stream_documents`](DocumentStore::stream_documents) returns a bounded
/// channel receiver populated by a background task, so at most a small
/// window of documents is in flight regardless of collection size. The
/// stream is finite and not restartable: once drained (or failed), a new
/// call is required to read the collection again.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List all database names visible on this store.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// List all collection names in a database.
    async fn list_collections(&self, database: &str) -> Result<Vec<String>>;

    /// Count the documents in a collection.
    ///
    /// Used only as a progress denominator; the value may be stale by the
    /// time the copy finishes if the collection has concurrent writers.
    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64>;

    /// Stream every document in a collection, in cursor order.
    ///
    /// The receiver yields `Err` at most once, as its final item.
    fn stream_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> mpsc::Receiver<Result<Document>>;

    /// Insert a batch of documents into a collection.
    async fn bulk_insert(
        &self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Result<()>;
}

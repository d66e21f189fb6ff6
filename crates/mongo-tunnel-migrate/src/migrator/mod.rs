//! Batched migration driver.
//!
//! [`BatchMigrator`] walks every non-reserved database on the source,
//! copies each collection document-for-document in cursor order, and
//! reports progress at batch granularity. Databases, collections and
//! batches are processed strictly sequentially; the first error at any
//! stage aborts the whole run and propagates with its database/collection
//! context. Memory stays bounded: at most one batch of documents is
//! resident at a time, plus the stream's in-flight window.

use crate::error::Result;
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Documents per bulk insert when no override is supplied.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Reserved databases that are never migrated.
pub const EXCLUDED_DATABASES: [&str; 3] = ["admin", "local", "config"];

/// Drives the full source-to-destination copy.
pub struct BatchMigrator<'a> {
    source: &'a dyn DocumentStore,
    destination: &'a dyn DocumentStore,
    batch_size: usize,
}

/// Per-collection accounting, reported in the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Database name.
    pub database: String,

    /// Collection name.
    pub collection: String,

    /// Document count taken before the copy started (best-effort).
    pub total_docs: u64,

    /// Documents actually migrated.
    pub migrated: u64,
}

/// Result of a completed migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Databases migrated (exclusions not counted).
    pub databases: usize,

    /// Collections migrated.
    pub collections: usize,

    /// Total documents migrated.
    pub documents_migrated: u64,

    /// Average throughput (documents/second).
    pub docs_per_second: u64,

    /// Per-collection breakdown.
    pub collection_stats: Vec<CollectionStats>,
}

impl MigrationSummary {
    /// Serialize the summary as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> BatchMigrator<'a> {
    /// Create a migrator over two connected stores.
    pub fn new(source: &'a dyn DocumentStore, destination: &'a dyn DocumentStore) -> Self {
        Self {
            source,
            destination,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the batch size (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Copy every non-reserved database from source to destination.
    pub async fn run(&self) -> Result<MigrationSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        let mut databases = 0;
        let mut collection_stats = Vec::new();

        for database in self.source.list_databases().await? {
            if EXCLUDED_DATABASES.contains(&database.as_str()) {
                debug!("Skipping reserved database: {}", database);
                continue;
            }

            databases += 1;
            info!("Migrating database: {}", database);

            for collection in self.source.list_collections(&database).await? {
                info!("Migrating collection: {}.{}", database, collection);
                collection_stats.push(self.migrate_collection(&database, &collection).await?);
            }
        }

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;
        let documents_migrated: u64 = collection_stats.iter().map(|s| s.migrated).sum();
        let docs_per_second = if duration_seconds > 0.0 {
            (documents_migrated as f64 / duration_seconds) as u64
        } else {
            0
        };

        info!(
            "Migration completed: {} documents across {} collections in {:.2}s",
            documents_migrated,
            collection_stats.len(),
            duration_seconds
        );

        Ok(MigrationSummary {
            run_id,
            started_at,
            completed_at,
            duration_seconds,
            databases,
            collections: collection_stats.len(),
            documents_migrated,
            docs_per_second,
            collection_stats,
        })
    }

    /// Copy a single collection: count, stream, accumulate, flush.
    async fn migrate_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<CollectionStats> {
        // Best-effort denominator; a concurrent writer can make it stale.
        let total_docs = self.source.count_documents(database, collection).await?;

        let mut migrated = 0u64;
        let mut batch: Vec<Document> = Vec::with_capacity(self.batch_size);
        let mut stream = self.source.stream_documents(database, collection);

        while let Some(item) = stream.recv().await {
            batch.push(item?);

            if batch.len() >= self.batch_size {
                migrated = self
                    .flush(database, collection, &mut batch, migrated, total_docs)
                    .await?;
            }
        }

        // Trailing partial batch
        if !batch.is_empty() {
            migrated = self
                .flush(database, collection, &mut batch, migrated, total_docs)
                .await?;
        }

        info!(
            "{}.{}: completed migrating {} documents",
            database, collection, migrated
        );

        Ok(CollectionStats {
            database: database.to_string(),
            collection: collection.to_string(),
            total_docs,
            migrated,
        })
    }

    /// Insert the accumulated batch and emit a progress line.
    async fn flush(
        &self,
        database: &str,
        collection: &str,
        batch: &mut Vec<Document>,
        migrated: u64,
        total_docs: u64,
    ) -> Result<u64> {
        let count = batch.len() as u64;
        let documents = std::mem::replace(batch, Vec::with_capacity(self.batch_size));

        self.destination
            .bulk_insert(database, collection, documents)
            .await?;

        let migrated = migrated + count;
        info!(
            "{}.{}: Progress: {}/{} documents",
            database, collection, migrated, total_docs
        );
        Ok(migrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrateError;
    use crate::store::DocumentStore;
    use async_trait::async_trait;
    use mongodb::bson::{doc, Bson};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// In-memory store used as both source (seeded) and destination
    /// (records every bulk insert). Supports injecting failures at a
    /// given insert call or after a given number of streamed documents.
    #[derive(Default)]
    struct FakeStore {
        /// (database, collection, documents), in enumeration order.
        collections: Vec<(String, String, Vec<Document>)>,
        /// Every bulk_insert received: (database, collection, documents).
        inserts: Mutex<Vec<(String, String, Vec<Document>)>>,
        /// Fail the Nth bulk_insert call (1-based), counted across the run.
        fail_insert_at_call: Option<usize>,
        /// Emit a stream error after yielding N documents of every collection.
        fail_stream_after: Option<usize>,
    }

    impl FakeStore {
        fn with_collection(mut self, database: &str, collection: &str, docs: Vec<Document>) -> Self {
            self.collections
                .push((database.to_string(), collection.to_string(), docs));
            self
        }

        fn insert_sizes(&self) -> Vec<usize> {
            self.inserts
                .lock()
                .unwrap()
                .iter()
                .map(|(_, _, docs)| docs.len())
                .collect()
        }

        fn inserted_ids(&self, database: &str, collection: &str) -> HashSet<i64> {
            self.inserts
                .lock()
                .unwrap()
                .iter()
                .filter(|(db, coll, _)| db == database && coll == collection)
                .flat_map(|(_, _, docs)| docs.iter())
                .filter_map(|d| match d.get("_id") {
                    Some(Bson::Int64(id)) => Some(*id),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn list_databases(&self) -> Result<Vec<String>> {
            let mut seen = Vec::new();
            for (db, _, _) in &self.collections {
                if !seen.contains(db) {
                    seen.push(db.clone());
                }
            }
            Ok(seen)
        }

        async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
            Ok(self
                .collections
                .iter()
                .filter(|(db, _, _)| db == database)
                .map(|(_, coll, _)| coll.clone())
                .collect())
        }

        async fn count_documents(&self, database: &str, collection: &str) -> Result<u64> {
            Ok(self
                .collections
                .iter()
                .find(|(db, coll, _)| db == database && coll == collection)
                .map(|(_, _, docs)| docs.len() as u64)
                .unwrap_or(0))
        }

        fn stream_documents(
            &self,
            database: &str,
            collection: &str,
        ) -> mpsc::Receiver<Result<Document>> {
            let docs = self
                .collections
                .iter()
                .find(|(db, coll, _)| db == database && coll == collection)
                .map(|(_, _, docs)| docs.clone())
                .unwrap_or_default();
            let fail_after = self.fail_stream_after;
            let database = database.to_string();
            let collection = collection.to_string();

            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                for (i, doc) in docs.into_iter().enumerate() {
                    if fail_after == Some(i) {
                        let _ = tx
                            .send(Err(MigrateError::stream(
                                database.as_str(),
                                collection.as_str(),
                                "cursor timeout",
                            )))
                            .await;
                        return;
                    }
                    if tx.send(Ok(doc)).await.is_err() {
                        return;
                    }
                }
            });
            rx
        }

        async fn bulk_insert(
            &self,
            database: &str,
            collection: &str,
            documents: Vec<Document>,
        ) -> Result<()> {
            let mut inserts = self.inserts.lock().unwrap();
            let call_number = inserts.len() + 1;
            inserts.push((database.to_string(), collection.to_string(), documents));

            if self.fail_insert_at_call == Some(call_number) {
                return Err(MigrateError::write(database, collection, "duplicate key"));
            }
            Ok(())
        }
    }

    fn docs(count: usize) -> Vec<Document> {
        (0..count).map(|i| doc! { "_id": i as i64 }).collect()
    }

    #[tokio::test]
    async fn test_empty_collection_no_insert() {
        let source = FakeStore::default().with_collection("appdb", "empty", vec![]);
        let destination = FakeStore::default();

        let summary = BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap();

        assert!(destination.insert_sizes().is_empty());
        assert_eq!(summary.documents_migrated, 0);
        assert_eq!(summary.collection_stats[0].total_docs, 0);
        assert_eq!(summary.collection_stats[0].migrated, 0);
    }

    #[tokio::test]
    async fn test_exact_multiple_no_trailing_flush() {
        let source = FakeStore::default().with_collection("appdb", "users", docs(6));
        let destination = FakeStore::default();

        BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap();

        assert_eq!(destination.insert_sizes(), vec![3, 3]);
    }

    #[tokio::test]
    async fn test_remainder_gets_partial_flush() {
        let source = FakeStore::default().with_collection("appdb", "users", docs(7));
        let destination = FakeStore::default();

        let summary = BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap();

        assert_eq!(destination.insert_sizes(), vec![3, 3, 1]);
        assert_eq!(summary.documents_migrated, 7);
    }

    #[tokio::test]
    async fn test_batch_size_never_exceeded() {
        let source = FakeStore::default().with_collection("appdb", "users", docs(25));
        let destination = FakeStore::default();

        BatchMigrator::new(&source, &destination)
            .with_batch_size(4)
            .run()
            .await
            .unwrap();

        assert!(destination.insert_sizes().iter().all(|&n| n <= 4 && n > 0));
    }

    #[tokio::test]
    async fn test_reserved_databases_never_migrated() {
        let source = FakeStore::default()
            .with_collection("admin", "system.users", docs(5))
            .with_collection("local", "oplog", docs(5))
            .with_collection("config", "settings", docs(5))
            .with_collection("appdb", "users", docs(2));
        let destination = FakeStore::default();

        let summary = BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap();

        let inserts = destination.inserts.lock().unwrap();
        assert!(inserts.iter().all(|(db, _, _)| db == "appdb"));
        drop(inserts);
        assert_eq!(summary.databases, 1);
        assert_eq!(summary.collections, 1);
        assert_eq!(summary.documents_migrated, 2);
    }

    #[tokio::test]
    async fn test_completeness_ids_match() {
        let source = FakeStore::default()
            .with_collection("appdb", "users", docs(11))
            .with_collection("appdb", "orders", docs(4));
        let destination = FakeStore::default();

        BatchMigrator::new(&source, &destination)
            .with_batch_size(5)
            .run()
            .await
            .unwrap();

        let expected: HashSet<i64> = (0..11).collect();
        assert_eq!(destination.inserted_ids("appdb", "users"), expected);
        let expected: HashSet<i64> = (0..4).collect();
        assert_eq!(destination.inserted_ids("appdb", "orders"), expected);
    }

    #[tokio::test]
    async fn test_progress_monotonic_within_total() {
        let source = FakeStore::default().with_collection("appdb", "users", docs(10));
        let destination = FakeStore::default();

        BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap();

        let mut migrated = 0u64;
        for size in destination.insert_sizes() {
            let next = migrated + size as u64;
            assert!(next > migrated);
            assert!(next <= 10);
            migrated = next;
        }
        assert_eq!(migrated, 10);
    }

    #[tokio::test]
    async fn test_write_failure_aborts_run() {
        let source = FakeStore::default()
            .with_collection("appdb", "users", docs(9))
            .with_collection("appdb", "orders", docs(9));
        let destination = FakeStore {
            fail_insert_at_call: Some(2),
            ..FakeStore::default()
        };

        let err = BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "write");
        assert!(err.to_string().contains("appdb.users"));
        // Batch 1 succeeded, batch 2 was the failing attempt; nothing after.
        assert_eq!(destination.insert_sizes().len(), 2);
        let inserts = destination.inserts.lock().unwrap();
        assert!(inserts.iter().all(|(_, coll, _)| coll == "users"));
    }

    #[tokio::test]
    async fn test_stream_failure_keeps_prior_batches() {
        // Cursor dies after 6 documents: two full batches land, then abort.
        let source = FakeStore {
            fail_stream_after: Some(6),
            ..FakeStore::default()
        }
        .with_collection("appdb", "users", docs(15));
        let destination = FakeStore::default();

        let err = BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "stream");
        assert!(err.to_string().contains("appdb.users"));
        assert_eq!(destination.insert_sizes(), vec![3, 3]);
    }

    #[tokio::test]
    async fn test_summary_accounting() {
        let source = FakeStore::default()
            .with_collection("appdb", "users", docs(7))
            .with_collection("analytics", "events", docs(3));
        let destination = FakeStore::default();

        let summary = BatchMigrator::new(&source, &destination)
            .with_batch_size(3)
            .run()
            .await
            .unwrap();

        assert_eq!(summary.databases, 2);
        assert_eq!(summary.collections, 2);
        assert_eq!(summary.documents_migrated, 10);
        assert_eq!(summary.collection_stats.len(), 2);
        assert!(summary.to_json().unwrap().contains("documents_migrated"));
    }
}

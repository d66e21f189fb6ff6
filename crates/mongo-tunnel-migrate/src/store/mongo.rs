//! MongoDB-backed [`DocumentStore`] implementation.

use crate::config::{DestinationConfig, SourceConfig};
use crate::error::{MigrateError, Result};
use crate::migrator::DEFAULT_BATCH_SIZE;
use crate::store::DocumentStore;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, Credential, ServerAddress, Tls, TlsOptions};
use mongodb::Client;
use tokio::sync::mpsc;
use tracing::debug;

/// A connected MongoDB (or DocumentDB) client with a role label for
/// error context.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    label: &'static str,
    /// Server-side cursor page size hint.
    page_hint: usize,
}

impl MongoStore {
    /// Connect to the legacy source instance by connection string.
    pub async fn connect_source(config: &SourceConfig) -> Result<Self> {
        let options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| MigrateError::connect("source", e.to_string()))?;
        let client = Client::with_options(options)
            .map_err(|e| MigrateError::connect("source", e.to_string()))?;

        let store = Self {
            client,
            label: "source",
            page_hint: DEFAULT_BATCH_SIZE,
        };
        store.ping().await?;
        Ok(store)
    }

    /// Connect to the destination instance through the tunnel's local port.
    ///
    /// Mirrors the connection shape the managed cluster requires: TLS with
    /// its CA bundle (hostname check relaxed because we dial localhost),
    /// direct connection to the forwarded node, and retryable writes off.
    pub async fn connect_destination(config: &DestinationConfig, local_port: u16) -> Result<Self> {
        let mut credential = Credential::default();
        credential.username = Some(config.user.clone());
        credential.password = Some(config.password.clone());

        let mut tls_options = TlsOptions::default();
        tls_options.ca_file_path = Some(config.ca_file.clone());
        tls_options.allow_invalid_hostnames = Some(true);

        let mut options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: "127.0.0.1".to_string(),
                port: Some(local_port),
            }])
            .build();
        options.credential = Some(credential);
        options.tls = Some(Tls::Enabled(tls_options));
        options.direct_connection = Some(true);
        options.retry_writes = Some(false);

        let client = Client::with_options(options)
            .map_err(|e| MigrateError::connect("destination", e.to_string()))?;

        let store = Self {
            client,
            label: "destination",
            page_hint: DEFAULT_BATCH_SIZE,
        };
        store.ping().await?;
        Ok(store)
    }

    /// Set the server-side cursor page size hint.
    pub fn with_page_hint(mut self, page_hint: usize) -> Self {
        self.page_hint = page_hint.max(1);
        self
    }

    /// Verify the connection is actually usable before handing the store
    /// to the migrator.
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| MigrateError::connect(self.label, e.to_string()))?;
        debug!("Connected to {}", self.label);
        Ok(())
    }

    /// Shut the driver down, draining its connection pool.
    pub async fn close(&self) {
        self.client.clone().shutdown().await;
        debug!("Closed {} client", self.label);
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_databases(&self) -> Result<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .map_err(|e| MigrateError::enumeration("databases", e.to_string()))
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(|e| {
                MigrateError::enumeration(format!("collections in {database}"), e.to_string())
            })
    }

    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64> {
        self.client
            .database(database)
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await
            .map_err(|e| MigrateError::stream(database, collection, e.to_string()))
    }

    fn stream_documents(
        &self,
        database: &str,
        collection: &str,
    ) -> mpsc::Receiver<Result<Document>> {
        let (tx, rx) = mpsc::channel(self.page_hint);
        let handle = self
            .client
            .database(database)
            .collection::<Document>(collection);
        let database = database.to_string();
        let collection = collection.to_string();
        let page_hint = self.page_hint as u32;

        tokio::spawn(async move {
            let mut cursor = match handle.find(doc! {}).batch_size(page_hint).await {
                Ok(cursor) => cursor,
                Err(e) => {
                    let _ = tx
                        .send(Err(MigrateError::stream(
                            database.as_str(),
                            collection.as_str(),
                            e.to_string(),
                        )))
                        .await;
                    return;
                }
            };

            loop {
                match cursor.try_next().await {
                    Ok(Some(document)) => {
                        // Receiver dropped: the migration aborted, stop reading.
                        if tx.send(Ok(document)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => return,
                    Err(e) => {
                        let _ = tx
                            .send(Err(MigrateError::stream(
                                database.as_str(),
                                collection.as_str(),
                                e.to_string(),
                            )))
                            .await;
                        return;
                    }
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
        self.client
            .database(database)
            .collection::<Document>(collection)
            .insert_many(documents)
            .await
            .map_err(|e| MigrateError::write(database, collection, e.to_string()))?;
        Ok(())
    }
}

//! MongoDB client and collection wrapper
//!
//! Typed collections apply their schema-declared indexes on creation and
//! stamp common metadata on writes. Engine operations are single-document
//! upserts/updates; the wrapper exposes an atomic add-to-set primitive so
//! relationship-edge appends never lose updates under concurrent writers.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, ReplaceOptions, UpdateModifications, UpdateOptions},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::CohortError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, CohortError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| CohortError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CohortError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, CohortError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, CohortError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), CohortError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| CohortError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, CohortError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = self.inner.insert_one(item).await.map_err(|e| {
            if duplicate_key(&e) {
                CohortError::Conflict("Unique index violated".into())
            } else {
                CohortError::Database(format!("Insert failed: {}", e))
            }
        })?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| CohortError::Database("Failed to get inserted ID".into()))
    }

    /// Find one document by filter (soft-deleted documents excluded)
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, CohortError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| CohortError::Database(format!("Find failed: {}", e)))
    }

    /// Find many documents by filter (soft-deleted documents excluded)
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, CohortError> {
        use futures_util::StreamExt;

        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .await
            .map_err(|e| CohortError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, CohortError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| CohortError::Database(format!("Update failed: {}", e)))
    }

    /// Update one document, inserting it when the filter matches nothing
    pub async fn upsert_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, CohortError> {
        self.inner
            .update_one(filter, update.into())
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await
            .map_err(|e| CohortError::Database(format!("Upsert failed: {}", e)))
    }

    /// Replace a document wholesale, inserting it when absent. The engine's
    /// document writes are atomic at this granularity; last writer wins.
    pub async fn replace_upsert(&self, filter: Document, mut item: T) -> Result<UpdateResult, CohortError> {
        let metadata = item.mut_metadata();
        metadata.updated_at = Some(DateTime::now());
        if metadata.created_at.is_none() {
            metadata.created_at = Some(DateTime::now());
        }

        self.inner
            .replace_one(filter, item)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await
            .map_err(|e| CohortError::Database(format!("Replace failed: {}", e)))
    }

    /// Atomically append a value to an array field if not already present.
    ///
    /// Single `$addToSet` round trip, so concurrent appends to the same
    /// document cannot lose each other the way load-then-save would.
    pub async fn add_to_set(
        &self,
        filter: Document,
        field: &str,
        value: bson::Bson,
    ) -> Result<UpdateResult, CohortError> {
        self.update_one(
            filter,
            doc! {
                "$addToSet": { field: value },
                "$set": { "metadata.updated_at": DateTime::now() },
            },
        )
        .await
    }

    /// Soft delete a document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, CohortError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Hard delete a document. Missing documents are not an error.
    pub async fn delete_one(&self, filter: Document) -> Result<bool, CohortError> {
        let result = self
            .inner
            .delete_one(filter)
            .await
            .map_err(|e| CohortError::Database(format!("Delete failed: {}", e)))?;

        Ok(result.deleted_count > 0)
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

/// Whether a MongoDB error is a duplicate-key (E11000) violation
fn duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

#[cfg(test)]
mod tests {
    // Collection operations require a running MongoDB instance and are
    // exercised by integration environments; document-level invariants are
    // unit tested on the schema types in db::schemas.
}

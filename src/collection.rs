//! Collection capability trait and the driver-backed adapter.

use async_trait::async_trait;
use log::debug;
use mongodb::bson::{Bson, Document};
use mongodb::options::UpdateOptions as DriverUpdateOptions;
use mongodb::Collection as DriverCollection;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::results::{SingleResult, UpdateSummary};

/// Options for update operations.
///
/// Facade-owned so fakes never depend on driver types. The one recognized
/// option is `upsert`: insert a new document when no match exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    /// Whether to insert if no documents match.
    pub upsert: Option<bool>,
}

impl UpdateOptions {
    /// Create a builder.
    pub fn builder() -> UpdateOptionsBuilder {
        UpdateOptionsBuilder::default()
    }
}

/// Builder for UpdateOptions.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptionsBuilder {
    options: UpdateOptions,
}

impl UpdateOptionsBuilder {
    /// Set upsert option.
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.options.upsert = Some(upsert);
        self
    }

    /// Build the options.
    pub fn build(self) -> UpdateOptions {
        self.options
    }
}

/// Capability trait for single-document operations on a named collection.
///
/// All four operations exchange BSON documents and thread a [`Context`];
/// a cancelled or expired context aborts the call promptly with a
/// cancellation-classified error. Typed application structs convert at the
/// boundary via [`to_document`](crate::results::to_document) and
/// [`from_document`](crate::results::from_document).
///
/// # Example
///
/// ```ignore
/// use mongo_veneer::prelude::*;
///
/// let result = users.find_one(&ctx, doc! { "email": "john@example.com" }).await;
/// let user: User = result.decode()?;
/// ```
#[async_trait]
pub trait Collection: Send + Sync {
    /// Issue a single-document lookup.
    ///
    /// The call itself never fails: transport errors, cancellation, and
    /// "no document matched" are all carried inside the returned
    /// [`SingleResult`] and surface when the caller decodes it.
    async fn find_one(&self, ctx: &Context, filter: Document) -> SingleResult;

    /// Insert a single document, returning its identifier.
    ///
    /// Fails with a write-classified error on constraint violation,
    /// connectivity loss, or serialization failure of the document.
    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<Bson>;

    /// Update a single document matching the filter.
    ///
    /// Fails with a write-classified error under the same conditions as
    /// [`insert_one`](Collection::insert_one).
    async fn update_one(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateSummary>;

    /// Delete a single document matching the filter.
    ///
    /// Returns the deleted count; a filter matching nothing is a normal
    /// zero-count result, not an error.
    async fn delete_one(&self, ctx: &Context, filter: Document) -> Result<u64>;

    /// Get the collection name.
    fn name(&self) -> &str;
}

/// Driver-backed collection adapter.
pub struct MongoCollection {
    /// Wrapped driver collection.
    inner: DriverCollection<Document>,
}

impl MongoCollection {
    /// Create a new collection handle.
    pub(crate) fn new(inner: DriverCollection<Document>) -> Self {
        Self { inner }
    }

    /// Get the full namespace (db.collection).
    pub fn namespace(&self) -> String {
        self.inner.namespace().to_string()
    }
}

impl Clone for MongoCollection {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl Collection for MongoCollection {
    async fn find_one(&self, ctx: &Context, filter: Document) -> SingleResult {
        debug!("find_one on {}", self.namespace());
        match ctx.run(self.inner.find_one(filter, None)).await {
            Ok(Ok(Some(document))) => SingleResult::from_document(document),
            Ok(Ok(None)) => SingleResult::none(),
            Ok(Err(err)) => SingleResult::from_error(Error::from_read(err)),
            Err(cancelled) => SingleResult::from_error(cancelled),
        }
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<Bson> {
        debug!("insert_one on {}", self.namespace());
        let result = ctx
            .run(self.inner.insert_one(document, None))
            .await?
            .map_err(Error::from_write)?;
        Ok(result.inserted_id)
    }

    async fn update_one(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateSummary> {
        debug!("update_one on {}", self.namespace());
        let driver_options = options.map(|options| {
            let mut driver_options = DriverUpdateOptions::default();
            driver_options.upsert = options.upsert;
            driver_options
        });
        let result = ctx
            .run(self.inner.update_one(filter, update, driver_options))
            .await?
            .map_err(Error::from_write)?;
        Ok(UpdateSummary {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(&self, ctx: &Context, filter: Document) -> Result<u64> {
        debug!("delete_one on {}", self.namespace());
        let result = ctx
            .run(self.inner.delete_one(filter, None))
            .await?
            .map_err(Error::from_write)?;
        Ok(result.deleted_count)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

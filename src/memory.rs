//! In-process backend implementing the capability traits.
//!
//! This is the test fake the facade exists to enable: the same traits as
//! the driver adapters over a `HashMap` store, with mongo-shaped semantics
//! for equality filters, `$set`/`$unset` updates, upsert, and duplicate
//! `_id` detection. Data is lost when the last clone is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use crate::client::{Client, Session};
use crate::collection::{Collection, UpdateOptions};
use crate::context::Context;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::results::{SingleResult, UpdateSummary};

/// Server error code for a duplicate-key violation.
const DUPLICATE_KEY: i32 = 11000;

/// Documents keyed by `(database, collection)` namespace.
type Store = HashMap<(String, String), Vec<Document>>;

/// In-memory client adapter.
///
/// Clones share the same store, so repeated name resolution yields
/// equivalent handles over the same data.
///
/// # Example
///
/// ```ignore
/// use mongo_veneer::prelude::*;
///
/// let client = MemoryClient::new();
/// let users = client.database("mydb").collection("users");
/// users.insert_one(&Context::background(), doc! { "name": "John" }).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryClient {
    store: Arc<RwLock<Store>>,
}

impl MemoryClient {
    /// Create a new empty in-memory client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all data (for debugging/testing).
    pub async fn snapshot(&self) -> Store {
        self.store.read().await.clone()
    }

    /// Clear all data.
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Get the document count for one namespace.
    pub async fn collection_count(&self, database: &str, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(&(database.to_string(), collection.to_string()))
            .map(|documents| documents.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Client for MemoryClient {
    type Db = MemoryDatabase;
    type Session = MemorySession;

    fn database(&self, name: &str) -> MemoryDatabase {
        MemoryDatabase {
            name: name.to_string(),
            owner: self.clone(),
        }
    }

    async fn connect(&self, ctx: &Context) -> Result<()> {
        // Nothing to establish; still honors an already-fired context.
        ctx.run(async {}).await
    }

    async fn start_session(&self, ctx: &Context) -> Result<MemorySession> {
        ctx.run(async {}).await?;
        Ok(MemorySession {
            in_transaction: false,
        })
    }
}

/// In-memory database adapter.
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    name: String,
    owner: MemoryClient,
}

impl Database for MemoryDatabase {
    type Coll = MemoryCollection;
    type Owner = MemoryClient;

    fn collection(&self, name: &str) -> MemoryCollection {
        MemoryCollection {
            db_name: self.name.clone(),
            name: name.to_string(),
            store: self.owner.store.clone(),
        }
    }

    fn client(&self) -> MemoryClient {
        self.owner.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory collection adapter.
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    db_name: String,
    name: String,
    store: Arc<RwLock<Store>>,
}

impl MemoryCollection {
    fn key(&self) -> (String, String) {
        (self.db_name.clone(), self.name.clone())
    }
}

/// Check a document against an equality filter: every filter field must
/// exist in the document with an equal value. An empty filter matches all.
fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, value)| document.get(field) == Some(value))
}

/// Apply an operator update to a document, returning whether it changed.
///
/// Recognizes `$set` and `$unset`. A non-operator top-level key is
/// rejected the way the server rejects it; an unrecognized operator is
/// rejected rather than silently ignored.
fn apply_update(document: &mut Document, update: &Document) -> Result<bool> {
    for field in update.keys() {
        if !field.starts_with('$') {
            return Err(Error::write(
                None,
                "update document requires atomic operators",
            ));
        }
    }

    let before = document.clone();
    for (operator, argument) in update {
        let argument = argument.as_document().ok_or_else(|| {
            Error::write(None, format!("{} requires a document argument", operator))
        })?;
        match operator.as_str() {
            "$set" => {
                for (field, value) in argument {
                    document.insert(field.clone(), value.clone());
                }
            }
            "$unset" => {
                for field in argument.keys() {
                    document.remove(field);
                }
            }
            other => {
                return Err(Error::write(
                    None,
                    format!("unsupported update operator {}", other),
                ));
            }
        }
    }
    Ok(*document != before)
}

/// Build the document an upsert inserts: the filter's equality fields,
/// with the update applied on top. Operator expressions in the filter
/// pin no value and are skipped, as the server does.
fn seed_upsert(filter: &Document, update: &Document) -> Result<Document> {
    let mut document = Document::new();
    for (field, value) in filter {
        let is_operator = value
            .as_document()
            .map(|argument| argument.keys().any(|key| key.starts_with('$')))
            .unwrap_or(false);
        if !is_operator {
            document.insert(field.clone(), value.clone());
        }
    }
    apply_update(&mut document, update)?;
    Ok(document)
}

/// Add a document to a namespace, generating an `_id` when the caller
/// supplied none and rejecting a duplicate `_id` with the server's code.
fn push_document(documents: &mut Vec<Document>, mut document: Document) -> Result<Bson> {
    let id = match document.get("_id") {
        Some(id) => id.clone(),
        None => {
            let id = Bson::ObjectId(ObjectId::new());
            document.insert("_id", id.clone());
            id
        }
    };
    if documents
        .iter()
        .any(|existing| existing.get("_id") == Some(&id))
    {
        return Err(Error::write(
            Some(DUPLICATE_KEY),
            format!("duplicate key error: _id {}", id),
        ));
    }
    documents.push(document);
    Ok(id)
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn find_one(&self, ctx: &Context, filter: Document) -> SingleResult {
        let lookup = async {
            let store = self.store.read().await;
            store.get(&self.key()).and_then(|documents| {
                documents
                    .iter()
                    .find(|document| matches_filter(document, &filter))
                    .cloned()
            })
        };
        match ctx.run(lookup).await {
            Ok(Some(document)) => SingleResult::from_document(document),
            Ok(None) => SingleResult::none(),
            Err(cancelled) => SingleResult::from_error(cancelled),
        }
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<Bson> {
        ctx.run(async {
            let mut store = self.store.write().await;
            let documents = store.entry(self.key()).or_default();
            push_document(documents, document)
        })
        .await?
    }

    async fn update_one(
        &self,
        ctx: &Context,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> Result<UpdateSummary> {
        ctx.run(async {
            let upsert = options.and_then(|options| options.upsert).unwrap_or(false);

            let mut store = self.store.write().await;
            let documents = store.entry(self.key()).or_default();

            if let Some(document) = documents
                .iter_mut()
                .find(|document| matches_filter(document, &filter))
            {
                let modified = apply_update(document, &update)?;
                return Ok(UpdateSummary {
                    matched_count: 1,
                    modified_count: modified as u64,
                    upserted_id: None,
                });
            }

            if !upsert {
                return Ok(UpdateSummary {
                    matched_count: 0,
                    modified_count: 0,
                    upserted_id: None,
                });
            }

            let document = seed_upsert(&filter, &update)?;
            let id = push_document(documents, document)?;
            Ok(UpdateSummary {
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(id),
            })
        })
        .await?
    }

    async fn delete_one(&self, ctx: &Context, filter: Document) -> Result<u64> {
        ctx.run(async {
            let mut store = self.store.write().await;
            let Some(documents) = store.get_mut(&self.key()) else {
                return 0;
            };
            match documents
                .iter()
                .position(|document| matches_filter(document, &filter))
            {
                Some(position) => {
                    documents.remove(position);
                    1
                }
                None => 0,
            }
        })
        .await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// In-memory session adapter.
///
/// Models just enough transaction state for unit tests to assert ordering
/// errors; it provides no isolation over the shared store.
#[derive(Debug)]
pub struct MemorySession {
    in_transaction: bool,
}

#[async_trait]
impl Session for MemorySession {
    async fn start_transaction(&mut self) -> Result<()> {
        if self.in_transaction {
            return Err(Error::session("transaction already in progress"));
        }
        self.in_transaction = true;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::session("no transaction started"));
        }
        self.in_transaction = false;
        Ok(())
    }

    async fn abort_transaction(&mut self) -> Result<()> {
        if !self.in_transaction {
            return Err(Error::session("no transaction started"));
        }
        self.in_transaction = false;
        Ok(())
    }
}

//! Database capability trait and the driver-backed adapter.

use mongodb::bson::Document;
use mongodb::Database as DriverDatabase;

use crate::client::{Client, MongoClient};
use crate::collection::{Collection, MongoCollection};

/// Capability trait for a named database view.
///
/// A database handle holds no state beyond its name and a reference back
/// to the owning client; both accessors are pure.
pub trait Database: Send + Sync {
    /// Collection handle type produced by this database.
    type Coll: Collection;
    /// Client type that owns this view.
    type Owner: Client;

    /// Resolve a collection handle by name. Pure name binding; never fails.
    fn collection(&self, name: &str) -> Self::Coll;

    /// Get the client that owns this database view.
    fn client(&self) -> Self::Owner;

    /// Get the database name.
    fn name(&self) -> &str;
}

/// Driver-backed database adapter.
///
/// # Example
///
/// ```ignore
/// let db = client.database("mydb");
/// let users = db.collection("users");
/// ```
pub struct MongoDatabase {
    /// Wrapped driver database.
    inner: DriverDatabase,
    /// Owning client, kept for walking back up the handle chain.
    owner: MongoClient,
}

impl MongoDatabase {
    /// Create a new database handle.
    pub(crate) fn new(inner: DriverDatabase, owner: MongoClient) -> Self {
        Self { inner, owner }
    }
}

impl Database for MongoDatabase {
    type Coll = MongoCollection;
    type Owner = MongoClient;

    fn collection(&self, name: &str) -> MongoCollection {
        MongoCollection::new(self.inner.collection::<Document>(name))
    }

    fn client(&self) -> MongoClient {
        self.owner.clone()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl Clone for MongoDatabase {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            owner: self.owner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::database_from;
    use crate::client::Credentials;

    async fn client() -> MongoClient {
        MongoClient::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_database_name() {
        let db = client().await.database("mydb");
        assert_eq!(db.name(), "mydb");
    }

    #[tokio::test]
    async fn test_collection_name() {
        let users = client().await.database("mydb").collection("users");
        assert_eq!(users.name(), "users");
    }

    #[tokio::test]
    async fn test_client_backlink_resolves_same_names() {
        let client = client().await;
        let db = client.database("mydb");
        // Walking up and back down lands on an equivalent handle.
        assert_eq!(db.client().database("mydb").name(), db.name());
    }

    #[tokio::test]
    async fn test_database_from_uses_auth_source() {
        let credentials =
            Credentials::new("app", "s3cret", "appdata", "mongodb://localhost:27017");
        let db = database_from(&credentials, &client().await);
        assert_eq!(db.name(), "appdata");
    }
}

//! # mongo-veneer
//!
//! Thin capability-trait facade over the MongoDB driver.
//!
//! Every operation is a direct pass-through to the driver's equivalent
//! call; the value of the crate is that application code written against
//! the narrow capability traits ([`Client`], [`Database`], [`Collection`])
//! can swap a real deployment for the in-memory backend in tests without
//! a live connection.
//!
//! ## Features
//!
//! - Capability traits for client, database, collection, and session handles
//! - Driver-backed adapters for real deployments
//! - In-memory backend with mongo-shaped semantics for tests
//! - Cancellation and deadlines threaded through every blocking call
//! - Deferred decode errors: "no match" surfaces at decode, not at find
//!
//! ## Quick Start
//!
//! ```ignore
//! use mongo_veneer::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> mongo_veneer::Result<()> {
//!     let credentials = Credentials::new(
//!         "app", "s3cret", "admin", "mongodb://localhost:27017",
//!     );
//!     let client = MongoClient::with_credentials(&credentials).await?;
//!
//!     let ctx = Context::background();
//!     client.connect(&ctx).await?;
//!
//!     let users = client.database("mydb").collection("users");
//!
//!     // Insert a document
//!     let user = User { name: "John".into(), email: "john@example.com".into() };
//!     let id = users.insert_one(&ctx, to_document(&user)?).await?;
//!
//!     // Find it again
//!     let found: User = users.find_one(&ctx, doc! { "_id": id }).await.decode()?;
//!
//!     // Update it
//!     users.update_one(
//!         &ctx,
//!         doc! { "email": "john@example.com" },
//!         doc! { "$set": { "name": "Jane" } },
//!         None,
//!     ).await?;
//!
//!     // Delete it
//!     users.delete_one(&ctx, doc! { "email": "john@example.com" }).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod collection;
pub mod context;
pub mod db;
pub mod error;
pub mod memory;
pub mod results;

// Re-export main types
pub use client::{database_from, Client, Credentials, MongoClient, MongoSession, Session};
pub use collection::{Collection, MongoCollection, UpdateOptions, UpdateOptionsBuilder};
pub use context::{Canceller, Context};
pub use db::{Database, MongoDatabase};
pub use error::{Error, ErrorKind, Result};
pub use memory::{MemoryClient, MemoryCollection, MemoryDatabase, MemorySession};
pub use results::{from_document, to_document, SingleResult, UpdateSummary};

// Re-export bson for convenience
pub use mongodb::bson;
pub use mongodb::bson::doc;

/// Prelude module for common imports.
pub mod prelude {
    pub use super::client::{database_from, Client, Credentials, MongoClient, Session};
    pub use super::collection::{Collection, UpdateOptions};
    pub use super::context::{Canceller, Context};
    pub use super::db::Database;
    pub use super::error::{Error, ErrorKind, Result};
    pub use super::memory::MemoryClient;
    pub use super::results::{from_document, to_document, SingleResult, UpdateSummary};
    pub use mongodb::bson::{doc, Document};
    pub use serde::{Deserialize, Serialize};
}

/// Get the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }

    #[test]
    fn test_doc_macro() {
        let document = doc! {
            "name": "John",
            "age": 30,
            "active": true,
        };
        assert_eq!(document.get_str("name").unwrap(), "John");
        assert_eq!(document.get_i32("age").unwrap(), 30);
        assert_eq!(document.get_bool("active").unwrap(), true);
    }

    #[test]
    fn test_prelude_imports() {
        // This test verifies that the prelude exports are correct
        use crate::prelude::*;

        let _: Result<()> = Ok(());
        let _doc = doc! { "test": 1 };
        let _client = MemoryClient::new();
    }

    #[test]
    fn test_error_kind_variants() {
        // Test that all error kinds are accessible
        let _ = ErrorKind::Connection;
        let _ = ErrorKind::Session;
        let _ = ErrorKind::Write;
        let _ = ErrorKind::Decode;
        let _ = ErrorKind::Cancelled;
    }
}

//! Client capability trait and the driver-backed adapter.

use async_trait::async_trait;
use log::info;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions as DriverClientOptions, Credential};
use mongodb::{Client as DriverClient, ClientSession as DriverSession};
use serde::Deserialize;

use crate::context::Context;
use crate::db::{Database, MongoDatabase};
use crate::error::{Error, Result};

/// Connection credentials, supplied once at client construction.
///
/// The fields are forwarded unmodified into the driver's own
/// connection-establishment call: the URI picks the deployment, the
/// username/password/auth-source triple fills the driver's credential.
///
/// Derives `Deserialize` so applications can load it straight from their
/// configuration files.
///
/// # Example
///
/// ```ignore
/// use mongo_veneer::Credentials;
///
/// let credentials = Credentials::new(
///     "app",
///     "s3cret",
///     "admin",
///     "mongodb://localhost:27017",
/// );
/// ```
#[derive(Clone, Deserialize, PartialEq)]
pub struct Credentials {
    /// Username presented during the authentication handshake.
    pub username: String,
    /// Password presented during the authentication handshake.
    pub password: String,
    /// Database the credentials are defined against.
    pub auth_source: String,
    /// Connection string for the deployment.
    pub uri: String,
}

impl Credentials {
    /// Create credentials from their four parts.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        auth_source: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            auth_source: auth_source.into(),
            uri: uri.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_source", &self.auth_source)
            .field("uri", &self.uri)
            .finish()
    }
}

/// Capability trait for the top of the handle chain.
///
/// A client resolves named databases, establishes the connection, and
/// starts sessions. Application code written against this trait runs
/// unchanged over [`MongoClient`] or the in-memory
/// [`MemoryClient`](crate::memory::MemoryClient).
#[async_trait]
pub trait Client: Send + Sync {
    /// Database handle type produced by this client.
    type Db: Database;
    /// Session handle type produced by this client.
    type Session: Session;

    /// Resolve a database handle by name. Pure name binding; never fails.
    fn database(&self, name: &str) -> Self::Db;

    /// Establish the connection, verifying the deployment is reachable.
    ///
    /// Fails with a connection-classified error when the transport cannot
    /// be established. Cancelled or expired contexts abort the attempt.
    async fn connect(&self, ctx: &Context) -> Result<()>;

    /// Start a session for causal consistency and transactions.
    ///
    /// Fails with a session-classified error when the underlying client
    /// cannot allocate one.
    async fn start_session(&self, ctx: &Context) -> Result<Self::Session>;
}

/// Capability trait for a transactional session.
#[async_trait]
pub trait Session: Send {
    /// Start a transaction on this session.
    async fn start_transaction(&mut self) -> Result<()>;

    /// Commit the transaction in progress.
    async fn commit_transaction(&mut self) -> Result<()>;

    /// Abort the transaction in progress.
    async fn abort_transaction(&mut self) -> Result<()>;
}

/// Resolve the database named by the credentials' auth source.
///
/// Shortcut for applications whose data lives in the same database their
/// credentials are defined against.
pub fn database_from<C: Client>(credentials: &Credentials, client: &C) -> C::Db {
    client.database(&credentials.auth_source)
}

/// Driver-backed client adapter.
///
/// Construction only builds the handle; the driver connects lazily, so an
/// unreachable deployment is observed on [`connect`](Client::connect), not
/// here.
///
/// # Example
///
/// ```ignore
/// use mongo_veneer::prelude::*;
///
/// let client = MongoClient::with_credentials(&credentials).await?;
/// client.connect(&Context::background()).await?;
/// let db = client.database("mydb");
/// ```
#[derive(Debug, Clone)]
pub struct MongoClient {
    /// Wrapped driver client, shared by clones of this handle.
    inner: DriverClient,
    /// Connection URI the client was built from.
    uri: String,
}

impl MongoClient {
    /// Create a client from credentials.
    ///
    /// The URI, username, password, and auth-source database are forwarded
    /// unmodified into the driver's options. Fails only on a malformed
    /// connection string; network reachability is not checked.
    pub async fn with_credentials(credentials: &Credentials) -> Result<Self> {
        let mut options = DriverClientOptions::parse(&credentials.uri)
            .await
            .map_err(Error::from_connect)?;

        let mut credential = Credential::default();
        credential.username = Some(credentials.username.clone());
        credential.password = Some(credentials.password.clone());
        credential.source = Some(credentials.auth_source.clone());
        options.credential = Some(credential);

        let inner = DriverClient::with_options(options).map_err(Error::from_connect)?;
        Ok(Self {
            inner,
            uri: credentials.uri.clone(),
        })
    }

    /// Create a client from a bare connection string, without credentials.
    pub async fn with_uri_str(uri: &str) -> Result<Self> {
        let inner = DriverClient::with_uri_str(uri)
            .await
            .map_err(Error::from_connect)?;
        Ok(Self {
            inner,
            uri: uri.to_string(),
        })
    }

    /// Get the connection URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[async_trait]
impl Client for MongoClient {
    type Db = MongoDatabase;
    type Session = MongoSession;

    fn database(&self, name: &str) -> MongoDatabase {
        MongoDatabase::new(self.inner.database(name), self.clone())
    }

    async fn connect(&self, ctx: &Context) -> Result<()> {
        // The driver connects lazily; a ping forces the handshake so a
        // dead transport surfaces here instead of on the first operation.
        let admin = self.inner.database("admin");
        ctx.run(admin.run_command(doc! { "ping": 1 }, None))
            .await?
            .map_err(Error::from_connect)?;
        info!("connected to {}", self.uri);
        Ok(())
    }

    async fn start_session(&self, ctx: &Context) -> Result<MongoSession> {
        let session = ctx
            .run(self.inner.start_session(None))
            .await?
            .map_err(Error::from_session)?;
        Ok(MongoSession { inner: session })
    }
}

/// Driver-backed session adapter.
pub struct MongoSession {
    /// Wrapped driver session.
    inner: DriverSession,
}

#[async_trait]
impl Session for MongoSession {
    async fn start_transaction(&mut self) -> Result<()> {
        self.inner
            .start_transaction(None)
            .await
            .map_err(Error::from_session)
    }

    async fn commit_transaction(&mut self) -> Result<()> {
        self.inner
            .commit_transaction()
            .await
            .map_err(Error::from_session)
    }

    async fn abort_transaction(&mut self) -> Result<()> {
        self.inner
            .abort_transaction()
            .await
            .map_err(Error::from_session)
    }
}

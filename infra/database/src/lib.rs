//! # Database Infrastructure
//!
//! A small row store abstraction with two interchangeable backends:
//!
//! - **SurrealDB** through the `any` engine (`mem://`, `rocksdb://`, `ws://`, `http://`),
//!   with health-check retries on start-up and versioned, checksummed table migrations.
//! - **In-process memory** (`memory://`), used by tests and quick local runs.
//!
//! Tables are declared once as static [`TableSchema`]s. Both backends enforce the same
//! rules: case-insensitive unique columns, references that must point at existing rows,
//! and deletes that cascade to referencing rows.
//!
//! ## Example
//!
//! ```rust
//! use nexo_database::{Column, Database, DatabaseError, Fields, Query, Store, TableSchema, Value};
//!
//! static LOCALITY: TableSchema =
//!     TableSchema { name: "locality", version: 1, columns: &[Column::text("name").unique()] };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DatabaseError> {
//!     let db = Database::builder().url("memory://").table(&LOCALITY).init().await?;
//!
//!     db.insert("locality", Fields::from([("name", Value::from("Resistencia"))])).await?;
//!     let rows = db.select("locality", Query::all()).await?;
//!     assert_eq!(rows.len(), 1);
//!
//!     Ok(())
//! }
//! ```

mod error;
mod memory;
mod query;
mod record;
mod schema;
mod store;
mod surreal;

pub use crate::error::{DatabaseError, DatabaseErrorExt};
pub use crate::memory::MemoryStore;
pub use crate::query::{Direction, Filter, Order, Query, sort_records};
pub use crate::record::{Fields, Record, Value};
pub use crate::schema::{CREATED_AT, Column, ColumnKind, ID, TableSchema};
pub use crate::store::Store;
pub use crate::surreal::SurrealStore;

use crate::schema::validate_tables;
use crate::surreal::ConnectOptions;
use std::sync::Arc;
use tracing::{info, instrument};

/// URL selecting the in-process [`MemoryStore`].
pub const MEMORY_URL: &str = "memory://";

#[derive(Debug)]
enum Backend {
    Memory(MemoryStore),
    Surreal(SurrealStore),
}

/// Inner state of the [`Database`] wrapper.
#[derive(Debug)]
pub struct DatabaseInner {
    backend: Backend,
    url: String,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        info!(url = %self.url, "Database handle dropped");
    }
}

/// Cheaply cloneable handle to an opened store.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a new [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// The in-process backend, when the handle was opened with [`MEMORY_URL`].
    #[must_use]
    pub fn as_memory(&self) -> Option<&MemoryStore> {
        match &self.inner.backend {
            Backend::Memory(store) => Some(store),
            Backend::Surreal(_) => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }
}

impl Store for Database {
    #[instrument(level = "debug", skip(self, query))]
    async fn select(&self, table: &'static str, query: Query) -> Result<Vec<Record>, DatabaseError> {
        match &self.inner.backend {
            Backend::Memory(store) => store.select(table, query).await,
            Backend::Surreal(store) => store.select(table, query).await,
        }
    }

    #[instrument(level = "debug", skip(self, fields))]
    async fn insert(&self, table: &'static str, fields: Fields) -> Result<Record, DatabaseError> {
        match &self.inner.backend {
            Backend::Memory(store) => store.insert(table, fields).await,
            Backend::Surreal(store) => store.insert(table, fields).await,
        }
    }

    #[instrument(level = "debug", skip(self, filter, changes))]
    async fn update(
        &self,
        table: &'static str,
        filter: Filter,
        changes: Fields,
    ) -> Result<Vec<Record>, DatabaseError> {
        match &self.inner.backend {
            Backend::Memory(store) => store.update(table, filter, changes).await,
            Backend::Surreal(store) => store.update(table, filter, changes).await,
        }
    }

    #[instrument(level = "debug", skip(self, filter))]
    async fn delete(&self, table: &'static str, filter: Filter) -> Result<usize, DatabaseError> {
        match &self.inner.backend {
            Backend::Memory(store) => store.delete(table, filter).await,
            Backend::Surreal(store) => store.delete(table, filter).await,
        }
    }
}

/// A fluent builder for opening a [`Database`].
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    url: Option<String>,
    ns: Option<String>,
    db: Option<String>,
    auth: Option<(String, String)>,
    tables: Vec<&'static TableSchema>,
}

impl DatabaseBuilder {
    /// Creates a new [`DatabaseBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the namespace and database name (SurrealDB only).
    pub fn session(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.ns = Some(namespace.into());
        self.db = Some(database.into());
        self
    }

    /// Add root credentials to the connection (SurrealDB only).
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Registers a table. References may only target tables registered before it.
    pub fn table(mut self, schema: &'static TableSchema) -> Self {
        self.tables.push(schema);
        self
    }

    pub fn tables(mut self, schemas: impl IntoIterator<Item = &'static TableSchema>) -> Self {
        self.tables.extend(schemas);
        self
    }

    /// Consumes the builder and opens the store selected by the URL.
    ///
    /// # Process
    /// 1. **Validation**: Ensures a URL is present and the table schemas are consistent.
    /// 2. **Backend**: [`MEMORY_URL`] opens an empty in-process store; any other URL is
    ///    handed to the `SurrealDB` engine, which is health-checked up to 3 times with
    ///    exponential backoff (starting at 500ms), signed in and switched to the session.
    /// 3. **Migrations**: `SurrealDB` tables whose version is not yet recorded are defined.
    ///
    /// # Errors
    /// * [`DatabaseError::Validation`] if the URL, namespace or database is missing, or a
    ///   schema is inconsistent.
    /// * [`DatabaseError::Connection`] if the engine fails to start or remains unhealthy.
    /// * [`DatabaseError::Auth`] if the provided credentials are rejected.
    /// * [`DatabaseError::Migration`] if an applied table definition changed without a
    ///   version bump.
    /// * [`DatabaseError::Surreal`] for other engine failures.
    #[instrument(skip(self), fields(url = self.url, ns = self.ns, db = self.db))]
    pub async fn init(self) -> Result<Database, DatabaseError> {
        let url = self
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(DatabaseError::Validation { message: "URL is required".into(), context: None })?;
        validate_tables(&self.tables)?;

        let backend = if url == MEMORY_URL {
            info!(tables = self.tables.len(), "Opening in-process memory store");
            Backend::Memory(MemoryStore::new(self.tables))
        } else {
            let namespace = self.ns.ok_or(DatabaseError::Validation {
                message: "Namespace is required".into(),
                context: None,
            })?;
            let database = self.db.ok_or(DatabaseError::Validation {
                message: "Database is required".into(),
                context: None,
            })?;
            let options = ConnectOptions { url: url.clone(), namespace, database, auth: self.auth };
            Backend::Surreal(SurrealStore::connect(options, self.tables).await?)
        };

        Ok(Database { inner: Arc::new(DatabaseInner { backend, url }) })
    }
}

use std::fmt;
use std::sync::Weak;

use crate::connection::{Connection, ConnectionInner};
use crate::error::{Error, Result};

/// A named collection on the remote service.
///
/// Handles are obtained from [`Connection::collection`] and are shared: the
/// same name always yields the same `Arc<Collection>` for a connection. A
/// collection does not keep its connection alive; once every `Connection`
/// clone is dropped, operations fail with [`Error::ConnectionClosed`].
pub struct Collection {
    name: String,
    connection: Weak<ConnectionInner>,
}

impl Collection {
    pub(crate) fn new(name: &str, connection: Weak<ConnectionInner>) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidCollectionName);
        }
        Ok(Self {
            name: name.to_string(),
            connection,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The connection this collection belongs to.
    pub fn connection(&self) -> Result<Connection> {
        self.connection
            .upgrade()
            .map(Connection::from_inner)
            .ok_or(Error::ConnectionClosed)
    }

    /// Name of the search index generated for this collection.
    pub fn index_name(&self) -> String {
        Connection::collection_index_name(&self.name)
    }

    /// Fetch the document stored under `key` as raw JSON.
    pub fn get_raw_json(&self, key: &str) -> Result<String> {
        Ok(self.connection()?.get_document(&self.name, key)?.body)
    }

    /// Store a document. Without a key the server generates one.
    ///
    /// Returns the document's key.
    pub fn insert_raw_json(&self, key: Option<&str>, json: &str) -> Result<String> {
        self.connection()?.insert_document(&self.name, key, json)
    }

    pub fn update_raw_json(&self, key: &str, json: &str) -> Result<()> {
        self.connection()?.update_document(&self.name, Some(key), json)?;
        Ok(())
    }

    pub fn delete_raw_json(&self, key: &str) -> Result<()> {
        self.connection()?.delete_document(&self.name, key)?;
        Ok(())
    }

    pub fn get_schema(&self) -> Result<String> {
        Ok(self.connection()?.get_schema(&self.name)?.body)
    }

    pub fn set_schema(&self, json: &str) -> Result<()> {
        self.connection()?.set_schema(&self.name, json)?;
        Ok(())
    }

    pub fn delete_schema(&self) -> Result<()> {
        self.connection()?.delete_schema(&self.name)?;
        Ok(())
    }

    /// Run a query and return every matching document as raw JSON.
    pub fn query_all(&self, query: &str) -> Result<String> {
        Ok(self.connection()?.query_all(&self.name, query)?.body)
    }

    /// Run a query and return at most one matching document.
    pub fn query_one(&self, query: &str) -> Result<String> {
        Ok(self.connection()?.query_one(&self.name, query)?.body)
    }

    /// Query this collection's search index directly.
    pub fn raw_search(&self, query_params: &str) -> Result<String> {
        Ok(self.connection()?.raw_search(&self.name, query_params)?.body)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("connected", &(self.connection.strong_count() > 0))
            .finish()
    }
}

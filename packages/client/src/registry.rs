//! Per-connection cache of collection handles.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::collection::Collection;
use crate::connection::ConnectionInner;
use crate::error::Result;

/// Maps collection names to their handles.
///
/// Handles are created on first reference and live as long as the
/// connection. Lookups for the same name always return the same `Arc`.
pub struct CollectionRegistry {
    owner: Weak<ConnectionInner>,
    collections: Mutex<HashMap<String, Arc<Collection>>>,
}

impl CollectionRegistry {
    pub(crate) fn new(owner: Weak<ConnectionInner>) -> Self {
        Self {
            owner,
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Return the handle for `name`, creating and caching it if needed.
    ///
    /// Fails with [`Error::InvalidCollectionName`](crate::Error::InvalidCollectionName)
    /// for an empty name.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<Collection>> {
        let mut collections = self.collections.lock();
        if let Some(collection) = collections.get(name) {
            return Ok(Arc::clone(collection));
        }

        let collection = Arc::new(Collection::new(name, self.owner.clone())?);
        tracing::debug!(collection = name, "registered collection handle");
        collections.insert(name.to_string(), Arc::clone(&collection));
        Ok(collection)
    }

    /// The cached handle for `name`, without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.collections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.lock().is_empty()
    }

    /// Names of all cached collections, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for CollectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionRegistry")
            .field("collections", &self.names())
            .finish()
    }
}

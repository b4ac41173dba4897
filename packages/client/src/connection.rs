//! Connection to a RiakJson node.
//!
//! A [`Connection`] knows the node's host and port, derives every resource
//! URL from them, and sends each operation as a single request through its
//! [`Transport`].
//!
//! ## Resources
//!
//! - `GET /ping`
//! - `GET /document/collection`
//! - `GET|PUT|DELETE /document/collection/{name}/{key}`
//! - `POST /document/collection/{name}` (server-generated key)
//! - `GET|PUT|DELETE /document/collection/{name}/schema`
//! - `PUT /document/collection/{name}/query/{all,one}`
//! - `GET /search/query/{name}RJIndex?...`

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use riakjson_transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

use crate::collection::Collection;
use crate::config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{Error, Result};
use crate::registry::CollectionRegistry;

/// Suffix RiakJson appends to a collection name to name its search index.
const INDEX_SUFFIX: &str = "RJIndex";

pub(crate) struct ConnectionInner {
    host: String,
    port: u16,
    transport: Arc<dyn Transport>,
    registry: CollectionRegistry,
}

/// Handle to a RiakJson node.
///
/// Cloning is cheap; clones share the transport and the collection cache.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

#[derive(Deserialize)]
struct CollectionList {
    collections: Vec<CollectionEntry>,
}

#[derive(Deserialize)]
struct CollectionEntry {
    name: String,
}

impl Connection {
    /// Connect to `host:port` over HTTP with the default timeout.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let transport = ReqwestTransport::with_default_timeout()?;
        Ok(Self::with_transport(host, port, transport))
    }

    /// Connect to the default local node, `127.0.0.1:8098`.
    pub fn local() -> Result<Self> {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }

    /// Connect using a loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))?;
        if let Some(credentials) = &config.credentials {
            transport = transport
                .with_basic_auth(credentials.username.clone(), credentials.password.clone());
        }
        Ok(Self::with_transport(config.host.clone(), config.port, transport))
    }

    /// Connect through a caller-supplied transport.
    pub fn with_transport<T: Transport + 'static>(
        host: impl Into<String>,
        port: u16,
        transport: T,
    ) -> Self {
        Self::with_shared_transport(host, port, Arc::new(transport))
    }

    pub fn with_shared_transport(
        host: impl Into<String>,
        port: u16,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let host = host.into();
        let inner = Arc::new_cyclic(|weak| ConnectionInner {
            host,
            port,
            transport,
            registry: CollectionRegistry::new(weak.clone()),
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ConnectionInner>) -> Self {
        Self { inner }
    }

    pub fn host(&self) -> &str {
        &self.inner.host
    }

    pub fn port(&self) -> u16 {
        self.inner.port
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.inner.registry
    }

    /// `http://{host}:{port}`
    pub fn base_service_url(&self) -> String {
        format!("http://{}:{}", self.inner.host, self.inner.port)
    }

    /// `{base_service_url}/document`
    pub fn base_document_api_url(&self) -> String {
        format!("{}/document", self.base_service_url())
    }

    /// `{base_document_api_url}/collection`
    pub fn base_collection_api_url(&self) -> String {
        format!("{}/collection", self.base_document_api_url())
    }

    /// Name of the search index RiakJson generates for a collection.
    pub fn collection_index_name(collection: &str) -> String {
        format!("{collection}{INDEX_SUFFIX}")
    }

    /// The shared handle for `name`, created on first use.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>> {
        self.inner.registry.get_or_create(name)
    }

    /// Liveness check against `/ping`.
    ///
    /// The response is returned whatever its status; only transport failures
    /// are errors.
    pub fn ping(&self) -> Result<HttpResponse> {
        self.execute(HttpRequest::get(format!("{}/ping", self.base_service_url())))
    }

    /// List the collections that exist on the server, in server order.
    ///
    /// Each entry is resolved through the registry, so already cached handles
    /// are reused.
    pub fn list_collections(&self) -> Result<Vec<Arc<Collection>>> {
        let response = self.dispatch(HttpRequest::get(self.base_collection_api_url()))?;
        let list: CollectionList = response.json()?;
        list.collections
            .iter()
            .map(|entry| self.collection(&entry.name))
            .collect()
    }

    pub fn get_document(&self, collection: &str, key: &str) -> Result<HttpResponse> {
        let url = self.document_url(collection, key)?;
        self.dispatch(HttpRequest::get(url))
    }

    pub fn delete_document(&self, collection: &str, key: &str) -> Result<HttpResponse> {
        let url = self.document_url(collection, key)?;
        self.dispatch(HttpRequest::delete(url))
    }

    /// Store a document and return its key.
    ///
    /// With a key, the document is PUT to that key and the key is returned
    /// unchanged. Without one, it is POSTed to the collection and the key is
    /// taken from the `Location` of the 201 response.
    pub fn insert_document(
        &self,
        collection: &str,
        key: Option<&str>,
        json: &str,
    ) -> Result<String> {
        match key {
            Some(key) => {
                let url = self.document_url(collection, key)?;
                self.dispatch(HttpRequest::put(url).with_body(json))?;
                Ok(key.to_string())
            }
            None => self.post_to_collection(collection, json),
        }
    }

    /// Replace the document stored under `key`.
    pub fn update_document(
        &self,
        collection: &str,
        key: Option<&str>,
        json: &str,
    ) -> Result<HttpResponse> {
        let key = key.filter(|k| !k.is_empty()).ok_or(Error::MissingKey)?;
        let url = self.document_url(collection, key)?;
        self.dispatch(HttpRequest::put(url).with_body(json))
    }

    pub fn get_schema(&self, collection: &str) -> Result<HttpResponse> {
        let url = self.schema_url(collection)?;
        self.dispatch(HttpRequest::get(url))
    }

    pub fn set_schema(&self, collection: &str, json: &str) -> Result<HttpResponse> {
        let url = self.schema_url(collection)?;
        self.dispatch(HttpRequest::put(url).with_body(json))
    }

    pub fn delete_schema(&self, collection: &str) -> Result<HttpResponse> {
        let url = self.schema_url(collection)?;
        self.dispatch(HttpRequest::delete(url))
    }

    /// All documents matching `query`.
    pub fn query_all(&self, collection: &str, query: &str) -> Result<HttpResponse> {
        let url = self.resource_url(collection, &["query", "all"])?;
        self.dispatch(HttpRequest::put(url).with_body(query))
    }

    /// At most one document matching `query`.
    pub fn query_one(&self, collection: &str, query: &str) -> Result<HttpResponse> {
        let url = self.resource_url(collection, &["query", "one"])?;
        self.dispatch(HttpRequest::put(url).with_body(query))
    }

    /// Query the collection's search index directly.
    ///
    /// `query_params` is appended to the URL verbatim.
    pub fn raw_search(&self, collection: &str, query_params: &str) -> Result<HttpResponse> {
        validate_name(collection)?;
        let index = Self::collection_index_name(collection);
        let mut url = append_segments(
            &format!("{}/search/query", self.base_service_url()),
            &[index.as_str()],
        )?;
        let query_params = query_params.strip_prefix('?').unwrap_or(query_params);
        if !query_params.is_empty() {
            url.push('?');
            url.push_str(query_params);
        }
        self.dispatch(HttpRequest::get(url))
    }

    fn post_to_collection(&self, collection: &str, json: &str) -> Result<String> {
        let url = self.collection_url(collection)?;
        let response = self.execute(HttpRequest::post(url).with_body(json))?;

        let key = (response.status == 201)
            .then(|| response.header("location"))
            .flatten()
            .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        match key {
            Some(key) => Ok(key),
            None => {
                tracing::warn!(collection, status = response.status, "insert returned no key");
                Err(Error::WriteFailure {
                    status: response.status,
                    message: response.body,
                })
            }
        }
    }

    /// `{base_collection_api_url}/{collection}/{segments..}`
    fn resource_url(&self, collection: &str, segments: &[&str]) -> Result<String> {
        validate_name(collection)?;
        let mut path = Vec::with_capacity(segments.len() + 1);
        path.push(collection);
        path.extend_from_slice(segments);
        append_segments(&self.base_collection_api_url(), &path)
    }

    fn collection_url(&self, collection: &str) -> Result<String> {
        self.resource_url(collection, &[])
    }

    fn document_url(&self, collection: &str, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::MissingKey);
        }
        self.resource_url(collection, &[key])
    }

    fn schema_url(&self, collection: &str) -> Result<String> {
        self.resource_url(collection, &["schema"])
    }

    /// Send a request and map 404 and other non-2xx statuses to errors.
    fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = self.execute(request)?;

        if response.status == 404 {
            return Err(Error::NotFound { url });
        }
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status,
                url,
                body: response.body,
            });
        }
        Ok(response)
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "request");
        let response = self.inner.transport.send(&request)?;
        tracing::debug!(status = response.status, url = %request.url, "response");
        Ok(response)
    }
}

/// Append path segments to `base`, percent-encoding each one so names and
/// keys containing `/`, `?` or `#` stay a single segment.
fn append_segments(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|()| Error::InvalidUrl {
            message: format!("{base} cannot be a base URL"),
        })?
        .extend(segments);
    Ok(url.into())
}

fn validate_name(collection: &str) -> Result<()> {
    if collection.is_empty() {
        return Err(Error::InvalidCollectionName);
    }
    Ok(())
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.inner.host)
            .field("port", &self.inner.port)
            .field("registry", &self.inner.registry)
            .finish()
    }
}

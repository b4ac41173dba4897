//! HTTP transport abstraction.
//!
//! The client never talks to the network directly; every request goes
//! through a [`Transport`], so tests can substitute a recording fake.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::error::Error;
use crate::types::{HttpRequest, HttpResponse};

/// Default request timeout for [`ReqwestTransport`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for sending HTTP requests.
///
/// Implementations return every HTTP status as a response. Only network or
/// protocol failures are reported as `Err`; status policy belongs to the
/// caller.
pub trait Transport: Send + Sync {
    /// Send a request and wait for the response.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

/// Basic-auth credentials attached to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

/// Production transport using the blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    auth: Option<BasicAuth>,
}

impl ReqwestTransport {
    /// Create a new transport with the given timeout.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, auth: None })
    }

    /// Create with default timeout of 30 seconds.
    pub fn with_default_timeout() -> Result<Self, Error> {
        Self::new(DEFAULT_TIMEOUT)
    }

    /// Create a transport around an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client, auth: None }
    }

    /// Send HTTP basic-auth credentials with every request.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let method: http::Method = request.method.into();

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name = HeaderName::try_from(name.as_str())?;
            let header_value = HeaderValue::try_from(value.as_str())?;
            headers.insert(header_name, header_value);
        }

        let mut req_builder = self.client.request(method, &request.url);

        if let Some(auth) = &self.auth {
            req_builder = req_builder.basic_auth(&auth.username, auth.password.as_ref());
        }

        if let Some(body) = &request.body {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            req_builder = req_builder.body(body.clone());
        }
        req_builder = req_builder.headers(headers);

        tracing::trace!(method = %request.method, url = %request.url, "sending request");
        let response = req_builder.send()?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut resp_headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body = response.text()?;

        Ok(HttpResponse {
            status,
            status_text,
            headers: resp_headers,
            body,
        })
    }
}

/// Recording transport for tests.
///
/// Returns predefined responses based on request matching.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    use crate::types::Method;

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A mock transport that returns predefined responses.
    ///
    /// Clones share state, so a test can keep one clone for inspection while
    /// the connection owns another.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        /// Responses keyed by method and URL.
        routes: Arc<Mutex<HashMap<(Method, String), HttpResponse>>>,
        /// Responses keyed by URL only.
        responses: Arc<Mutex<HashMap<String, HttpResponse>>>,
        /// Default response when no match found.
        default_response: Arc<Mutex<Option<HttpResponse>>>,
        /// Recorded requests for verification.
        recorded_requests: Arc<Mutex<Vec<HttpRequest>>>,
        /// Error message returned for every request, if set.
        failure: Arc<Mutex<Option<String>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a response for a specific method and URL.
        pub fn with_route(
            self,
            method: Method,
            url: impl Into<String>,
            response: HttpResponse,
        ) -> Self {
            lock(&self.routes).insert((method, url.into()), response);
            self
        }

        /// Add a response for a URL regardless of method.
        pub fn with_response(self, url: impl Into<String>, response: HttpResponse) -> Self {
            lock(&self.responses).insert(url.into(), response);
            self
        }

        /// Set a default response when no URL matches.
        pub fn with_default_response(self, response: HttpResponse) -> Self {
            *lock(&self.default_response) = Some(response);
            self
        }

        /// Configure to fail all requests with an error.
        pub fn fail_with(self, message: impl Into<String>) -> Self {
            *lock(&self.failure) = Some(message.into());
            self
        }

        /// Get all recorded requests.
        pub fn recorded_requests(&self) -> Vec<HttpRequest> {
            lock(&self.recorded_requests).clone()
        }

        /// Number of requests received so far.
        pub fn request_count(&self) -> usize {
            lock(&self.recorded_requests).len()
        }

        /// The most recent request, if any.
        pub fn last_request(&self) -> Option<HttpRequest> {
            lock(&self.recorded_requests).last().cloned()
        }

        /// Clear recorded requests.
        pub fn clear_recorded(&self) {
            lock(&self.recorded_requests).clear();
        }

        /// A 200 response with a JSON body.
        pub fn ok(body: impl Into<String>) -> HttpResponse {
            HttpResponse::new(200).with_body(body)
        }

        /// A 204 response with no body.
        pub fn no_content() -> HttpResponse {
            HttpResponse::new(204)
        }

        /// A 201 response pointing at the created document.
        pub fn created(location: impl Into<String>) -> HttpResponse {
            HttpResponse::new(201).with_header("Location", location)
        }

        /// A 404 Not Found response.
        pub fn not_found() -> HttpResponse {
            HttpResponse::new(404).with_body("not found")
        }
    }

    impl Transport for MockTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
            lock(&self.recorded_requests).push(request.clone());

            if let Some(message) = lock(&self.failure).clone() {
                return Err(Error::other(message));
            }

            if let Some(response) = lock(&self.routes).get(&(request.method, request.url.clone())) {
                return Ok(response.clone());
            }

            if let Some(response) = lock(&self.responses).get(&request.url) {
                return Ok(response.clone());
            }

            if let Some(response) = lock(&self.default_response).clone() {
                return Ok(response);
            }

            Ok(Self::not_found())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use crate::types::Method;

    #[test]
    fn mock_prefers_method_specific_route() {
        let transport = MockTransport::new()
            .with_response("http://h/x", MockTransport::ok("any"))
            .with_route(Method::PUT, "http://h/x", MockTransport::no_content());

        let put = transport.send(&HttpRequest::put("http://h/x")).unwrap();
        let get = transport.send(&HttpRequest::get("http://h/x")).unwrap();

        assert_eq!(put.status, 204);
        assert_eq!(get.status, 200);
        assert_eq!(get.body, "any");
    }

    #[test]
    fn mock_returns_default_response() {
        let transport = MockTransport::new().with_default_response(MockTransport::ok("{}"));
        let response = transport.send(&HttpRequest::get("http://h/anything")).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn mock_returns_404_when_no_match() {
        let transport = MockTransport::new();
        let response = transport.send(&HttpRequest::get("http://h/unknown")).unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn mock_fails_when_configured() {
        let transport = MockTransport::new().fail_with("connection refused");
        let result = transport.send(&HttpRequest::get("http://h/ping"));

        assert_eq!(result.unwrap_err().to_string(), "connection refused");
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn mock_records_requests_across_clones() {
        let transport = MockTransport::new().with_default_response(MockTransport::no_content());
        let shared = transport.clone();

        shared.send(&HttpRequest::get("http://h/first")).unwrap();
        shared
            .send(&HttpRequest::post("http://h/second").with_body("{}"))
            .unwrap();
        shared.send(&HttpRequest::delete("http://h/third")).unwrap();

        let recorded = transport.recorded_requests();
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].method, Method::GET);
        assert_eq!(recorded[1].method, Method::POST);
        assert_eq!(recorded[1].body.as_deref(), Some("{}"));
        assert_eq!(recorded[2].url, "http://h/third");

        transport.clear_recorded();
        assert!(transport.last_request().is_none());
    }

    #[test]
    fn created_helper_sets_location() {
        let response = MockTransport::created("/document/collection/c/abc");
        assert_eq!(response.status, 201);
        assert_eq!(response.header("Location"), Some("/document/collection/c/abc"));
    }

    #[test]
    fn reqwest_transport_creation() {
        assert!(ReqwestTransport::with_default_timeout().is_ok());
        assert!(ReqwestTransport::new(Duration::from_secs(5)).is_ok());
    }
}

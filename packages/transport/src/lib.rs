//! # riakjson-transport
//!
//! HTTP plumbing for the RiakJson client.
//!
//! The client builds [`HttpRequest`] values and hands them to a
//! [`Transport`]. [`ReqwestTransport`] sends them over the network with the
//! blocking reqwest client; with the `test-utils` feature,
//! [`mock::MockTransport`] records requests and replays canned responses.
//!
//! ```ignore
//! use riakjson_transport::{HttpRequest, ReqwestTransport, Transport};
//!
//! let transport = ReqwestTransport::with_default_timeout()?;
//! let response = transport.send(&HttpRequest::get("http://127.0.0.1:8098/ping"))?;
//! assert!(response.is_success());
//! ```

pub mod error;
pub mod transport;
pub mod types;

pub use error::Error;
#[cfg(any(test, feature = "test-utils"))]
pub use transport::mock;
pub use transport::{BasicAuth, ReqwestTransport, Transport, DEFAULT_TIMEOUT};
pub use types::{HttpRequest, HttpResponse, Method};

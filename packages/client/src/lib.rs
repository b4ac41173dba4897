//! # riakjson-client
//!
//! Client for the RiakJson document API.
//!
//! A [`Connection`] maps collection, document, schema and query operations
//! onto the service's fixed HTTP resources and keeps one shared
//! [`Collection`] handle per collection name.
//!
//! ```ignore
//! use riakjson_client::Connection;
//!
//! let connection = Connection::new("127.0.0.1", 8098)?;
//! let cities = connection.collection("cities")?;
//!
//! let key = cities.insert_raw_json(None, r#"{"name":"Springfield","state":"IL"}"#)?;
//! let doc = cities.get_raw_json(&key)?;
//!
//! cities.set_schema(r#"[{"name":"state","type":"string","require":true}]"#)?;
//! let matches = cities.query_all(r#"{"state":"IL"}"#)?;
//! ```
//!
//! Every operation issues exactly one blocking request through the
//! connection's [`Transport`]; nothing is retried.

pub mod collection;
pub mod config;
pub mod connection;
pub mod error;
pub mod registry;

pub use collection::Collection;
pub use config::{ClientConfig, ConfigError, Credentials};
pub use connection::Connection;
pub use error::{Error, Result};
pub use registry::CollectionRegistry;

pub use riakjson_transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};

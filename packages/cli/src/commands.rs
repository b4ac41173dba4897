//! Subcommands and their execution.
//!
//! JSON arguments accept a literal document, `-` to read stdin, or `@path`
//! to read a file.

use std::io::Read;
use std::path::PathBuf;

use clap::Subcommand;

use riakjson_client::{ConfigError, Connection, HttpResponse};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Client(#[from] riakjson_client::Error),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("argument is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("ping failed with HTTP {status}: {body}")]
    Unhealthy { status: u16, body: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check that the node is reachable
    Ping,

    /// List the collections that exist on the node
    Collections,

    /// Print a document
    Get { collection: String, key: String },

    /// Insert a document, printing its key
    Insert {
        collection: String,
        /// Document JSON, `-` for stdin or `@file`
        json: String,
        /// Store under this key instead of letting the server pick one
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Replace an existing document
    Update {
        collection: String,
        key: String,
        json: String,
    },

    /// Delete a document
    Delete { collection: String, key: String },

    /// Manage a collection's schema
    #[command(subcommand)]
    Schema(SchemaCommand),

    /// Run a document query
    #[command(subcommand)]
    Query(QueryCommand),

    /// Send a raw query to a collection's search index
    Search {
        collection: String,
        /// Query string, e.g. `q=name:Springfield&wt=json`
        params: String,
    },

    /// Print the search index name for a collection
    IndexName { collection: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SchemaCommand {
    Get { collection: String },
    Set { collection: String, json: String },
    Delete { collection: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum QueryCommand {
    /// Every matching document
    All { collection: String, query: String },
    /// At most one matching document
    One { collection: String, query: String },
}

/// Execute `command` and return the text to print.
pub fn run(
    connection: &Connection,
    command: &Command,
    stdin: &mut dyn Read,
) -> Result<String, CliError> {
    match command {
        Command::Ping => {
            let response = connection.ping()?;
            if !response.is_success() {
                return Err(CliError::Unhealthy {
                    status: response.status,
                    body: response.body,
                });
            }
            Ok(response.body)
        }
        Command::Collections => {
            let names: Vec<String> = connection
                .list_collections()?
                .iter()
                .map(|c| c.name().to_string())
                .collect();
            Ok(names.join("\n"))
        }
        Command::Get { collection, key } => Ok(pretty(connection.get_document(collection, key)?)),
        Command::Insert {
            collection,
            json,
            key,
        } => {
            let json = read_json(json, stdin)?;
            Ok(connection.insert_document(collection, key.as_deref(), &json)?)
        }
        Command::Update {
            collection,
            key,
            json,
        } => {
            let json = read_json(json, stdin)?;
            connection.update_document(collection, Some(key.as_str()), &json)?;
            Ok(String::new())
        }
        Command::Delete { collection, key } => {
            connection.delete_document(collection, key)?;
            Ok(String::new())
        }
        Command::Schema(SchemaCommand::Get { collection }) => {
            Ok(pretty(connection.get_schema(collection)?))
        }
        Command::Schema(SchemaCommand::Set { collection, json }) => {
            let json = read_json(json, stdin)?;
            connection.set_schema(collection, &json)?;
            Ok(String::new())
        }
        Command::Schema(SchemaCommand::Delete { collection }) => {
            connection.delete_schema(collection)?;
            Ok(String::new())
        }
        Command::Query(QueryCommand::All { collection, query }) => {
            let query = read_json(query, stdin)?;
            Ok(pretty(connection.query_all(collection, &query)?))
        }
        Command::Query(QueryCommand::One { collection, query }) => {
            let query = read_json(query, stdin)?;
            Ok(pretty(connection.query_one(collection, &query)?))
        }
        Command::Search { collection, params } => {
            Ok(pretty(connection.raw_search(collection, params)?))
        }
        Command::IndexName { collection } => Ok(Connection::collection_index_name(collection)),
    }
}

/// Resolve a JSON argument and check that it parses.
fn read_json(arg: &str, stdin: &mut dyn Read) -> Result<String, CliError> {
    let text = if arg == "-" {
        let mut buf = String::new();
        stdin.read_to_string(&mut buf).map_err(|source| CliError::Io {
            path: PathBuf::from("<stdin>"),
            source,
        })?;
        buf
    } else if let Some(path) = arg.strip_prefix('@') {
        std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: PathBuf::from(path),
            source,
        })?
    } else {
        arg.to_string()
    };

    serde_json::from_str::<serde_json::Value>(&text)?;
    Ok(text.trim().to_string())
}

/// Pretty-print a JSON body, falling back to the raw text.
fn pretty(response: HttpResponse) -> String {
    serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riakjson_client::Method;
    use riakjson_transport::mock::MockTransport;
    use std::io::Write;

    const COLLECTIONS: &str = "http://127.0.0.1:8098/document/collection";

    fn connection_with(transport: &MockTransport) -> Connection {
        Connection::with_transport("127.0.0.1", 8098, transport.clone())
    }

    fn run_with(transport: &MockTransport, command: Command) -> Result<String, CliError> {
        run(&connection_with(transport), &command, &mut std::io::empty())
    }

    #[test]
    fn ping_prints_body() {
        let transport = MockTransport::new()
            .with_response("http://127.0.0.1:8098/ping", MockTransport::ok("OK"));
        assert_eq!(run_with(&transport, Command::Ping).unwrap(), "OK");
    }

    #[test]
    fn ping_fails_on_unhealthy_node() {
        let transport = MockTransport::new().with_response(
            "http://127.0.0.1:8098/ping",
            HttpResponse::new(503).with_body("unavailable"),
        );

        let err = run_with(&transport, Command::Ping).unwrap_err();

        assert!(matches!(err, CliError::Unhealthy { status: 503, .. }));
    }

    #[test]
    fn collections_prints_one_name_per_line() {
        let transport = MockTransport::new().with_response(
            COLLECTIONS,
            MockTransport::ok(r#"{"collections":[{"name":"a"},{"name":"b"}]}"#),
        );
        assert_eq!(run_with(&transport, Command::Collections).unwrap(), "a\nb");
    }

    #[test]
    fn insert_prints_generated_key() {
        let transport = MockTransport::new()
            .with_default_response(MockTransport::created("/document/collection/c/k42"));

        let output = run_with(
            &transport,
            Command::Insert {
                collection: "c".to_string(),
                json: r#"{"a":1}"#.to_string(),
                key: None,
            },
        )
        .unwrap();

        assert_eq!(output, "k42");
        assert_eq!(transport.last_request().unwrap().method, Method::POST);
    }

    #[test]
    fn insert_reads_stdin() {
        let transport = MockTransport::new().with_default_response(MockTransport::no_content());
        let connection = connection_with(&transport);
        let command = Command::Insert {
            collection: "c".to_string(),
            json: "-".to_string(),
            key: Some("k1".to_string()),
        };

        let output = run(&connection, &command, &mut r#"{"from":"stdin"}"#.as_bytes()).unwrap();

        assert_eq!(output, "k1");
        let request = transport.last_request().unwrap();
        assert_eq!(request.body.as_deref(), Some(r#"{"from":"stdin"}"#));
    }

    #[test]
    fn schema_set_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"[{{"name":"field_one","type":"string"}}]"#).unwrap();
        let transport = MockTransport::new().with_default_response(MockTransport::no_content());

        run_with(
            &transport,
            Command::Schema(SchemaCommand::Set {
                collection: "c".to_string(),
                json: format!("@{}", file.path().display()),
            }),
        )
        .unwrap();

        let request = transport.last_request().unwrap();
        assert_eq!(request.url, format!("{COLLECTIONS}/c/schema"));
        assert_eq!(
            request.body.as_deref(),
            Some(r#"[{"name":"field_one","type":"string"}]"#)
        );
    }

    #[test]
    fn invalid_json_is_rejected_before_sending() {
        let transport = MockTransport::new();

        let err = run_with(
            &transport,
            Command::Query(QueryCommand::All {
                collection: "c".to_string(),
                query: "{not json".to_string(),
            }),
        )
        .unwrap_err();

        assert!(matches!(err, CliError::InvalidJson(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn get_pretty_prints_json() {
        let transport = MockTransport::new().with_default_response(MockTransport::ok(r#"{"a":1}"#));

        let output = run_with(
            &transport,
            Command::Get {
                collection: "c".to_string(),
                key: "k".to_string(),
            },
        )
        .unwrap();

        assert_eq!(output, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn index_name_needs_no_request() {
        let transport = MockTransport::new();
        let output = run_with(
            &transport,
            Command::IndexName {
                collection: "foo".to_string(),
            },
        )
        .unwrap();

        assert_eq!(output, "fooRJIndex");
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn missing_document_reports_not_found() {
        let transport = MockTransport::new();

        let err = run_with(
            &transport,
            Command::Get {
                collection: "c".to_string(),
                key: "missing".to_string(),
            },
        )
        .unwrap_err();

        assert!(matches!(err, CliError::Client(ref e) if e.is_not_found()));
    }
}

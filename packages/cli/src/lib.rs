//! # riakjson-cli
//!
//! Command-line access to a RiakJson node.
//!
//! ```bash
//! riakjson ping
//! riakjson collections
//! riakjson insert cities '{"name":"Springfield"}'
//! riakjson get cities abc123
//! riakjson schema set cities @schema.json
//! riakjson query all cities '{"state":"IL"}'
//! riakjson search cities 'q=state:IL&wt=json'
//! ```

pub mod commands;

pub use commands::{run, CliError, Command};

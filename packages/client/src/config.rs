//! Client configuration loaded from YAML.
//!
//! Config files are templated: `${VAR}` and `${VAR:-default}` are replaced
//! from the environment before the YAML is parsed.
//!
//! ```yaml
//! host: ${RIAKJSON_HOST:-127.0.0.1}
//! port: 8098
//! timeout_secs: 10
//! credentials:
//!   username: admin
//!   password: ${RIAKJSON_PASSWORD}
//! ```

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default host of a local RiakJson node.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default HTTP port of a local RiakJson node.
pub const DEFAULT_PORT: u16 = 8098;
/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable {name} is not set and has no default")]
    MissingVariable { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Connection parameters for a RiakJson node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            credentials: None,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Load a templated YAML config file.
    ///
    /// A leading `~/` is expanded to the user's home directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = expand_home(path.as_ref());
        tracing::debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse templated YAML text, resolving variables from the environment.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_str_with(text, |name| std::env::var(name).ok())
    }

    /// Parse templated YAML text with a custom variable lookup.
    pub fn from_yaml_str_with<F>(text: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_template(text, lookup)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }
}

/// Replace `${VAR}` and `${VAR:-default}` references in `text`.
pub fn expand_template<F>(text: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lazy_static! {
        static ref VARIABLE: Regex =
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").unwrap();
    }

    let mut missing = None;
    let expanded = VARIABLE.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (lookup(name), caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::MissingVariable { name }),
        None => Ok(expanded.into_owned()),
    }
}

/// Default config location: `~/.config/riakjson/config.yml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("riakjson").join("config.yml"))
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = ClientConfig::from_yaml_str_with("{}", vars(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8098);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn variables_are_expanded() {
        let yaml = "host: ${RJ_HOST}\nport: ${RJ_PORT:-8098}\n";
        let config =
            ClientConfig::from_yaml_str_with(yaml, vars(&[("RJ_HOST", "riak.local")])).unwrap();
        assert_eq!(config.host, "riak.local");
        assert_eq!(config.port, 8098);
    }

    #[test]
    fn set_variable_wins_over_default() {
        let expanded =
            expand_template("${RJ_PORT:-8098}", vars(&[("RJ_PORT", "10018")])).unwrap();
        assert_eq!(expanded, "10018");
    }

    #[test]
    fn missing_variable_without_default_fails() {
        let err = expand_template("password: ${RJ_SECRET}", vars(&[])).unwrap_err();
        match err {
            ConfigError::MissingVariable { name } => assert_eq!(name, "RJ_SECRET"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn text_without_variables_is_unchanged() {
        let text = "host: example.com\nport: 1\n";
        assert_eq!(expand_template(text, vars(&[])).unwrap(), text);
    }

    #[test]
    fn credentials_are_parsed() {
        let yaml = "credentials:\n  username: admin\n  password: ${PW}\n";
        let config = ClientConfig::from_yaml_str_with(yaml, vars(&[("PW", "s3cret")])).unwrap();
        assert_eq!(
            config.credentials,
            Some(Credentials {
                username: "admin".to_string(),
                password: Some("s3cret".to_string()),
            })
        );
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let err = ClientConfig::from_yaml_str_with("port: [not a port", vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: 10.0.0.5\nport: 18098\ntimeout_secs: 5").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 18098);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

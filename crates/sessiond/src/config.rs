//! Service configuration, read from a JSON file at startup.
//!
//! ```json
//! {
//!     "host": "0.0.0.0",
//!     "port": 8080,
//!     "rpc_path": "/user",
//!     "session_expiration": "30s",
//!     "keepalive_duration": "15s",
//!     "verifier": {
//!         "mode": "digest",
//!         "credentials": { "alice": "207cf410...d018fb" }
//!     }
//! }
//! ```
//!
//! [`Config::load`] only parses. [`Config::validate`] checks the listener
//! address and turns the duration strings into a [`SessionPolicy`], which
//! is where the expiration floor and the keep-alive fallback are applied.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use sessiond_protocol::LoginParams;
use sessiond_session::{Credential, DIGEST_HEX_LEN, DigestVerifier, SessionPolicy, StaticVerifier};
use sessiond_store::{CredentialStore, KeyValue, MemoryStore, PASSWORD_KEY_PREFIX, password_key};

use crate::duration::{DurationError, parse_duration};
use crate::verifier::ConfiguredVerifier;
use crate::SessiondError;

pub const DEFAULT_RPC_PATH: &str = "/user";

/// Errors raised while loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field} {value:?}: {source}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: DurationError,
    },

    #[error("invalid host {0:?}: expected an IP address")]
    InvalidHost(String),

    #[error("invalid port {0}: expected 1-65535")]
    InvalidPort(i64),

    #[error("invalid rpc_path {0:?}: must start with '/'")]
    InvalidRpcPath(String),

    #[error("invalid digest for user {0:?}: expected 64 hex characters")]
    InvalidDigest(String),
}

/// The configuration file as written.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IP address to listen on.
    pub host: String,
    /// Kept wide so an out-of-range value is reported, not a parse error.
    pub port: i64,
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,
    pub session_expiration: String,
    pub keepalive_duration: String,
    #[serde(default)]
    pub verifier: VerifierConfig,
}

fn default_rpc_path() -> String {
    DEFAULT_RPC_PATH.to_owned()
}

/// Where login credentials come from.
#[derive(Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VerifierConfig {
    /// Per-user password digests (64 hex characters), loaded into an
    /// in-memory credential store.
    Digest {
        #[serde(default)]
        credentials: BTreeMap<String, String>,
    },
    /// A fixed list of accepted `login` parameter sets.
    Static { entries: Vec<LoginParams> },
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self::Digest {
            credentials: BTreeMap::new(),
        }
    }
}

// Proofs stay out of logs.
impl std::fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digest { credentials } => f
                .debug_struct("Digest")
                .field("users", &credentials.keys().collect::<Vec<_>>())
                .finish(),
            Self::Static { entries } => f
                .debug_struct("Static")
                .field(
                    "users",
                    &entries.iter().map(|e| &e.username).collect::<Vec<_>>(),
                )
                .finish(),
        }
    }
}

/// A checked configuration, ready to start a server with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub addr: SocketAddr,
    pub rpc_path: String,
    pub policy: SessionPolicy,
}

impl Config {
    /// Reads and parses the file at `path`. Does not validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Checks the listener address and builds the session policy.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidHost`] unless `host` is an IP literal
    /// - [`ConfigError::InvalidPort`] outside 1-65535
    /// - [`ConfigError::InvalidRpcPath`] unless the path is absolute
    /// - [`ConfigError::InvalidDuration`] for an unparsable duration
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        let port = u16::try_from(self.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(ConfigError::InvalidPort(self.port))?;
        if !self.rpc_path.starts_with('/') {
            return Err(ConfigError::InvalidRpcPath(self.rpc_path.clone()));
        }

        let expiration = duration_field("session_expiration", &self.session_expiration)?;
        let keepalive = duration_field("keepalive_duration", &self.keepalive_duration)?;

        Ok(Settings {
            addr: SocketAddr::new(ip, port),
            rpc_path: self.rpc_path.clone(),
            policy: SessionPolicy::new(expiration, keepalive),
        })
    }
}

fn duration_field(
    field: &'static str,
    value: &str,
) -> Result<std::time::Duration, ConfigError> {
    parse_duration(value).map_err(|source| ConfigError::InvalidDuration {
        field,
        value: value.to_owned(),
        source,
    })
}

impl VerifierConfig {
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Digest { .. } => "digest",
            Self::Static { .. } => "static",
        }
    }

    /// Builds the verifier this configuration describes.
    ///
    /// In digest mode this provisions a fresh [`MemoryStore`] with one
    /// `password_sm3:<username>` record per configured user.
    pub async fn build(&self) -> Result<ConfiguredVerifier, SessiondError> {
        match self {
            Self::Digest { credentials } => {
                let pairs = credentials
                    .iter()
                    .map(|(username, digest)| digest_entry(username, digest))
                    .collect::<Result<Vec<KeyValue>, _>>()?;

                let store = Arc::new(MemoryStore::new());
                store.put(pairs).await?;

                let provisioned = store.scan(PASSWORD_KEY_PREFIX.as_bytes(), usize::MAX).await?;
                tracing::info!(users = provisioned.len(), "credential store provisioned");

                Ok(ConfiguredVerifier::Digest(DigestVerifier::new(store)))
            }
            Self::Static { entries } => {
                let verifier = StaticVerifier::new(
                    entries.iter().cloned().map(Credential::from).collect(),
                );
                tracing::info!(entries = verifier.len(), "static verifier loaded");
                Ok(ConfiguredVerifier::Static(verifier))
            }
        }
    }
}

fn digest_entry(username: &str, digest: &str) -> Result<KeyValue, ConfigError> {
    if digest.len() != DIGEST_HEX_LEN {
        return Err(ConfigError::InvalidDigest(username.to_owned()));
    }
    let bytes =
        hex::decode(digest).map_err(|_| ConfigError::InvalidDigest(username.to_owned()))?;
    Ok((password_key(username), bytes))
}

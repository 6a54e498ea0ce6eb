//! Unified error type for the sessiond service.

use sessiond_store::StoreError;

use crate::config::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// Request handling never surfaces this type: per-request failures become
/// wire errors. It is what startup and the server loop return, and what
/// `main` turns into a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum SessiondError {
    /// Bad or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The credential store failed while being provisioned.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Binding or serving the listener failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

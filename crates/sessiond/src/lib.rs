//! # sessiond
//!
//! Session authentication service. Clients prove who they are once with
//! `login`, receive a session id and a keep-alive interval, and keep the
//! session alive with periodic `keepalive` calls until they `logout` or
//! go quiet long enough for the reaper to evict them.
//!
//! All three methods are JSON-RPC 2.0 calls posted to a single HTTP path.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sessiond::prelude::*;
//!
//! # async fn start() -> Result<(), SessiondError> {
//! let config = Config::load("sessiond.json")?;
//! let settings = config.validate()?;
//! let verifier = config.verifier.build().await?;
//!
//! let server = SessiondServer::builder()
//!     .settings(settings)
//!     .build(verifier)
//!     .await?;
//! server.run(CancellationToken::new()).await
//! # }
//! ```

pub mod config;
pub mod duration;
mod error;
pub mod handler;
pub mod server;
pub mod verifier;

pub use error::SessiondError;

pub mod prelude {
    pub use crate::SessiondError;
    pub use crate::config::{Config, ConfigError, Settings, VerifierConfig};
    pub use crate::handler::{Dispatcher, Reply};
    pub use crate::server::{SessiondServer, SessiondServerBuilder};
    pub use crate::verifier::ConfiguredVerifier;
    pub use sessiond_reaper::ReaperConfig;
    pub use sessiond_session::{
        Credential, CredentialVerifier, DigestVerifier, SessionPolicy, SessionStore,
        StaticVerifier,
    };
    pub use tokio_util::sync::CancellationToken;
}

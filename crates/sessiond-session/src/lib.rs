//! Session management and credential verification for sessiond.
//!
//! This crate holds the stateful core of the server:
//!
//! 1. **Verification** — deciding whether a login is genuine
//!    ([`CredentialVerifier`], [`DigestVerifier`], [`StaticVerifier`])
//! 2. **Session tracking** — issuing, refreshing, and deleting sessions
//!    ([`SessionStore`])
//! 3. **Policy** — how long sessions live and how often clients must
//!    check in ([`SessionPolicy`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Dispatcher (above)  ← routes login / keepalive / logout here
//!     ↕
//! Session Layer (this crate)  ← verifies credentials, owns session state
//!     ↕
//! Protocol + Store (below)  ← SessionId, AuthMethod, CredentialStore
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod session;
mod store;
mod verifier;

pub use error::SessionError;
pub use session::{MIN_SESSION_EXPIRATION, Session, SessionPolicy};
pub use store::SessionStore;
pub use verifier::{
    Credential, CredentialVerifier, DIGEST_HEX_LEN, DigestVerifier, StaticVerifier,
};

//! Credential verification: deciding whether a login is genuine.
//!
//! The server defines the [`CredentialVerifier`] trait: a single async
//! method that takes a [`Credential`] and answers yes or no. There is
//! deliberately no third answer. A missing user, a wrong password, and an
//! unreachable credential store all look the same to the caller, so a
//! client can't probe which usernames exist or whether the backend is up.
//!
//! Two implementations ship with the crate:
//! - [`DigestVerifier`] checks a hex digest against a [`CredentialStore`].
//! - [`StaticVerifier`] compares against a fixed list, for small
//!   deployments and tests.

use std::fmt;
use std::sync::Arc;

use sessiond_protocol::{AuthMethod, LoginParams};
use sessiond_store::{CredentialStore, password_key};

/// Length of a digest proof in hex characters (32 bytes).
pub const DIGEST_HEX_LEN: usize = 64;

/// A credential assertion presented at login.
///
/// Lives for one verification call and is never stored. `Debug` redacts
/// the proof so a credential can be logged safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub method: AuthMethod,
    pub subject: String,
    pub proof: String,
}

impl Credential {
    pub fn new(
        method: AuthMethod,
        subject: impl Into<String>,
        proof: impl Into<String>,
    ) -> Self {
        Self {
            method,
            subject: subject.into(),
            proof: proof.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("method", &self.method)
            .field("subject", &self.subject)
            .field("proof", &"<redacted>")
            .finish()
    }
}

impl From<LoginParams> for Credential {
    fn from(params: LoginParams) -> Self {
        Self {
            method: params.method,
            subject: params.username,
            proof: params.data,
        }
    }
}

/// Decides whether a credential is genuine.
///
/// `Send + Sync + 'static` because one verifier is shared by every request
/// task for the lifetime of the server.
///
/// Implementations must not touch session state: the login handler only
/// creates a session after `verify` has returned, so a slow backend never
/// holds up keep-alive or logout traffic.
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Returns `true` to accept the credential.
    fn verify(
        &self,
        credential: &Credential,
    ) -> impl std::future::Future<Output = bool> + Send;
}

// ---------------------------------------------------------------------------
// DigestVerifier
// ---------------------------------------------------------------------------

/// Verifies [`AuthMethod::Digest`] credentials against a credential store.
///
/// A credential is accepted only if:
/// 1. the proof is exactly [`DIGEST_HEX_LEN`] characters,
/// 2. it decodes as hex,
/// 3. the store holds exactly those bytes under
///    [`password_key`]`(subject)`.
///
/// Every other method tag is rejected.
pub struct DigestVerifier<S> {
    store: Arc<S>,
}

// The store holds the digests; keep it out of logs.
impl<S> fmt::Debug for DigestVerifier<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestVerifier").finish_non_exhaustive()
    }
}

impl<S: CredentialStore> DigestVerifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The store this verifier reads from.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn verify_digest(&self, subject: &str, proof: &str) -> bool {
        if proof.len() != DIGEST_HEX_LEN {
            tracing::debug!(subject, len = proof.len(), "digest has wrong length");
            return false;
        }
        let Ok(digest) = hex::decode(proof) else {
            tracing::debug!(subject, "digest is not valid hex");
            return false;
        };

        match self.store.get(&password_key(subject)).await {
            Ok(Some(stored)) => constant_time_eq(&stored, &digest),
            Ok(None) => {
                tracing::debug!(subject, "no stored digest for subject");
                false
            }
            Err(e) => {
                tracing::warn!(subject, error = %e, "credential lookup failed");
                false
            }
        }
    }
}

impl<S: CredentialStore> CredentialVerifier for DigestVerifier<S> {
    async fn verify(&self, credential: &Credential) -> bool {
        match credential.method {
            AuthMethod::Digest => {
                self.verify_digest(&credential.subject, &credential.proof)
                    .await
            }
            // TODO: one-time codes need a code:<username> record with a deadline.
            AuthMethod::Code | AuthMethod::Token | AuthMethod::Unsupported(_) => {
                tracing::debug!(
                    subject = %credential.subject,
                    method = %credential.method,
                    "verification method not supported"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StaticVerifier
// ---------------------------------------------------------------------------

/// Accepts exactly the credentials it was built with.
///
/// Method, subject, and proof must all match one entry. Useful when there
/// are only a handful of fixed clients and no credential store to run.
#[derive(Debug, Clone, Default)]
pub struct StaticVerifier {
    entries: Vec<Credential>,
}

impl StaticVerifier {
    pub fn new(entries: Vec<Credential>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, credential: &Credential) -> bool {
        self.entries.iter().any(|entry| {
            entry.method == credential.method
                && entry.subject == credential.subject
                && constant_time_eq(entry.proof.as_bytes(), credential.proof.as_bytes())
        })
    }
}

/// Compares two byte strings without short-circuiting on the first
/// mismatch. Lengths are not secret: unequal lengths return early.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// =========================================================================
// Tests
// =========================================================================

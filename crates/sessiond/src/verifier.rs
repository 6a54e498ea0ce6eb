//! The verifier chosen by the configuration file.

use sessiond_session::{Credential, CredentialVerifier, DigestVerifier, StaticVerifier};
use sessiond_store::MemoryStore;

/// Either of the built-in verifiers, picked at startup.
///
/// An enum rather than a trait object: `CredentialVerifier::verify` returns
/// `impl Future`, so the trait isn't object safe.
#[derive(Debug)]
pub enum ConfiguredVerifier {
    Digest(DigestVerifier<MemoryStore>),
    Static(StaticVerifier),
}

impl CredentialVerifier for ConfiguredVerifier {
    async fn verify(&self, credential: &Credential) -> bool {
        match self {
            Self::Digest(v) => v.verify(credential).await,
            Self::Static(v) => v.verify(credential).await,
        }
    }
}

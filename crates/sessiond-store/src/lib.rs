//! Credential store abstraction for sessiond.
//!
//! sessiond never owns its credentials. It reads them from a key-value
//! store that something else provisions. This crate defines what the server
//! needs from that store ([`CredentialStore`]) and ships an in-process
//! implementation ([`MemoryStore`]) used by the server binary and by tests.
//!
//! # Key layout
//!
//! Password digests live under `password_sm3:<username>`, one raw 32-byte
//! value per user. Use [`password_key`] rather than formatting keys by hand.

#![allow(async_fn_in_trait)]

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

/// Key prefix for stored password digests.
pub const PASSWORD_KEY_PREFIX: &str = "password_sm3:";

/// The store key holding `username`'s password digest.
pub fn password_key(username: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(PASSWORD_KEY_PREFIX.len() + username.len());
    key.extend_from_slice(PASSWORD_KEY_PREFIX.as_bytes());
    key.extend_from_slice(username.as_bytes());
    key
}

/// A key and its value, as returned by [`CredentialStore::scan`].
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// The key-value capability the server consumes.
///
/// Transactional semantics are the implementation's business. Every method
/// returns a future that is `Send` so handlers holding a store can run on
/// any Tokio worker thread.
pub trait CredentialStore: Send + Sync + 'static {
    /// Reads one key. A missing key is `Ok(None)`, not an error.
    fn get(
        &self,
        key: &[u8],
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;

    /// Writes all pairs as one batch.
    fn put(
        &self,
        pairs: Vec<KeyValue>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Deletes all keys as one batch. Missing keys are ignored.
    fn delete(
        &self,
        keys: Vec<Vec<u8>>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Returns up to `limit` entries whose key starts with `prefix`,
    /// in key order.
    fn scan(
        &self,
        prefix: &[u8],
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<KeyValue>, StoreError>> + Send;

    /// Sets `key` to `value` if it differs from the current value and
    /// returns the previous value (`None` if the key was absent).
    fn update(
        &self,
        key: &[u8],
        value: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;
}

//! The session store: every live session, behind one lock.
//!
//! This is the piece of state every request touches. It is responsible for:
//! - Issuing a session (with a fresh random id) after a successful login
//! - Refreshing a session on keep-alive, or reporting why it can't
//! - Deleting a session on logout
//! - Sweeping out sessions that stopped sending keep-alives
//!
//! # Concurrency note
//!
//! All state sits behind a single `std::sync::Mutex`. Each operation takes
//! the lock once and holds it for its whole read-modify-write sequence, so a
//! keep-alive can never refresh a session that a concurrent logout or sweep
//! has already decided to drop. No method awaits or does I/O while holding
//! the lock, which is why a blocking mutex is the right tool here rather
//! than an async one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rand::Rng;
use sessiond_protocol::SessionId;

use crate::{Session, SessionError, SessionPolicy};

/// Owns all sessions for the lifetime of the server.
///
/// Share it with `Arc<SessionStore>`; there is never more than one.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ [live] ──touch()──→ [live, refreshed]
///                 │                      │
///                 │  (no touch for > expiration)
///                 ▼                      ▼
///             [expired] ──→ touch() → Expired, evicted
///                 │
///                 └──→ sweep_expired() → evicted
///
/// remove() evicts from any state.
/// ```
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    policy: SessionPolicy,
}

impl SessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Issues a new session stamped with the current time.
    pub fn create(&self) -> Session {
        self.create_at(Instant::now())
    }

    /// Issues a new session stamped with `now`.
    ///
    /// The id carries 128 random bits, so a collision with a live session
    /// is not checked for.
    pub fn create_at(&self, now: Instant) -> Session {
        let session = Session::new(generate_session_id(), now);
        self.lock().insert(session.id.clone(), session.clone());
        tracing::debug!(session_id = %session.id, "session created");
        session
    }

    /// Refreshes a session at the current time.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] if the id is unknown
    /// - [`SessionError::Expired`] if the session missed its deadline
    pub fn touch(&self, id: &SessionId) -> Result<Session, SessionError> {
        self.touch_at(id, Instant::now())
    }

    /// Refreshes a session as of `now`.
    ///
    /// An expired session is evicted on the spot, so the next call for the
    /// same id reports `NotFound`.
    pub fn touch_at(
        &self,
        id: &SessionId,
        now: Instant,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.lock();

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        if session.is_expired_at(now, self.policy.expiration()) {
            sessions.remove(id);
            tracing::debug!(session_id = %id, "evicted expired session on touch");
            return Err(SessionError::Expired(id.clone()));
        }

        session.refresh(now);
        Ok(session.clone())
    }

    /// Deletes a session. Returns whether it existed; removing an unknown
    /// id is not an error.
    pub fn remove(&self, id: &SessionId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Deletes every session that is expired as of `now` and returns how
    /// many were removed.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let expiration = self.policy.expiration();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now, expiration));
        before - sessions.len()
    }

    /// A copy of the session, if it is still stored. Does not refresh it.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.lock().get(id).cloned()
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Every critical section leaves the map consistent, so a panic in
    /// another thread while holding the lock doesn't corrupt it. Recover
    /// the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Generates a random 32-character hex session id (128 bits of entropy).
fn generate_session_id() -> SessionId {
    let bytes: [u8; 16] = rand::rng().random();
    SessionId(hex::encode(bytes))
}

// =========================================================================
// Tests
// =========================================================================

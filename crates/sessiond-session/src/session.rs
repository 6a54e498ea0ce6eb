//! Session types: the record the server keeps for each logged-in client,
//! and the policy that decides how long a record stays valid.

use std::time::{Duration, Instant};

use sessiond_protocol::SessionId;

// ---------------------------------------------------------------------------
// SessionPolicy
// ---------------------------------------------------------------------------

/// Sessions may never expire faster than this.
pub const MIN_SESSION_EXPIRATION: Duration = Duration::from_secs(15);

/// How long a session lives without a keep-alive, and how often clients
/// are told to send one.
///
/// The only way to build a policy is [`SessionPolicy::new`], which enforces
/// two rules:
///
/// - `expiration` is at least [`MIN_SESSION_EXPIRATION`].
/// - `keepalive` is strictly shorter than `expiration`. A zero keep-alive,
///   or one that is not shorter than the expiration, is replaced with
///   `expiration / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    expiration: Duration,
    keepalive: Duration,
}

impl SessionPolicy {
    pub fn new(expiration: Duration, keepalive: Duration) -> Self {
        let expiration = expiration.max(MIN_SESSION_EXPIRATION);
        let keepalive = if keepalive.is_zero() || keepalive >= expiration {
            expiration / 2
        } else {
            keepalive
        };
        Self {
            expiration,
            keepalive,
        }
    }

    /// How long after its last refresh a session is considered expired.
    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// How often clients should call `keepalive`.
    pub fn keepalive(&self) -> Duration {
        self.keepalive
    }

    /// The keep-alive interval as sent on the wire: whole seconds,
    /// fractional part dropped.
    pub fn keepalive_secs(&self) -> u64 {
        self.keepalive.as_secs()
    }
}

impl Default for SessionPolicy {
    /// 30 second expiration, 15 second keep-alive.
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(15))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One authenticated client.
///
/// Created on login, refreshed on keep-alive, destroyed on logout or once
/// it expires. Callers only ever see copies; the live record is owned by
/// the [`SessionStore`](crate::SessionStore).
///
/// `Instant` is monotonic, so wall-clock jumps never expire (or revive)
/// a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub created_at: Instant,
    /// Never earlier than `created_at`.
    pub refreshed_at: Instant,
}

impl Session {
    pub(crate) fn new(id: SessionId, now: Instant) -> Self {
        Self {
            id,
            created_at: now,
            refreshed_at: now,
        }
    }

    /// `true` once `now` is strictly past `refreshed_at + expiration`.
    pub fn is_expired_at(&self, now: Instant, expiration: Duration) -> bool {
        now > self.refreshed_at + expiration
    }

    /// Moves the refresh stamp forward to `now`. Never moves it backward.
    pub(crate) fn refresh(&mut self, now: Instant) {
        if now > self.refreshed_at {
            self.refreshed_at = now;
        }
    }
}

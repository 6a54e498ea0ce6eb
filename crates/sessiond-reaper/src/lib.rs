//! Background session reaper for sessiond.
//!
//! Clients that stop sending keep-alives never say goodbye, so something
//! has to delete their sessions. The [`Reaper`] is that something: a single
//! task that wakes on a fixed interval and sweeps every expired session out
//! of the shared [`SessionStore`].
//!
//! The tick interval is independent of the session policy. A session can
//! outlive its expiration by up to one interval before it is swept, but a
//! keep-alive never succeeds on it in the meantime: the store reports it as
//! expired and evicts it on the spot.
//!
//! # Lifecycle
//!
//! ```ignore
//! let cancel = CancellationToken::new();
//! let handle = Reaper::spawn(store, ReaperConfig::default(), cancel.clone());
//! // ... serve requests ...
//! cancel.cancel();
//! let stats = handle.await?;
//! ```
//!
//! The reaper runs until the token is cancelled. A sweep already in
//! progress finishes first. Sweeping can't fail, so the loop never exits
//! on its own.

use std::sync::Arc;
use std::time::Duration;

use sessiond_session::SessionStore;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant as TokioInstant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the reaper loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    /// Time between sweeps. The first sweep happens one interval after
    /// the reaper starts.
    pub interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

impl ReaperConfig {
    /// Sweep interval used when none is configured.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }

    /// Replaces a zero interval (which would spin) with the default.
    ///
    /// Called automatically by [`Reaper::new`].
    pub fn validated(mut self) -> Self {
        if self.interval.is_zero() {
            warn!(
                default_secs = Self::DEFAULT_INTERVAL.as_secs(),
                "reaper interval is zero, using default"
            );
            self.interval = Self::DEFAULT_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Running totals, returned when the reaper stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaperStats {
    /// Sweeps performed.
    pub sweeps: u64,
    /// Sessions evicted across all sweeps.
    pub evicted: u64,
}

// ---------------------------------------------------------------------------
// Reaper
// ---------------------------------------------------------------------------

/// Periodically evicts expired sessions from a [`SessionStore`].
///
/// One per server. It shares the store with the request handlers and takes
/// the same lock they do, once per sweep.
pub struct Reaper {
    store: Arc<SessionStore>,
    config: ReaperConfig,
    stats: ReaperStats,
}

impl Reaper {
    pub fn new(store: Arc<SessionStore>, config: ReaperConfig) -> Self {
        Self {
            store,
            config: config.validated(),
            stats: ReaperStats::default(),
        }
    }

    /// Starts the reaper on the current Tokio runtime.
    ///
    /// The returned handle resolves to the final [`ReaperStats`] once
    /// `cancel` fires.
    pub fn spawn(
        store: Arc<SessionStore>,
        config: ReaperConfig,
        cancel: CancellationToken,
    ) -> JoinHandle<ReaperStats> {
        tokio::spawn(Self::new(store, config).run(cancel))
    }

    /// Runs the sweep loop until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> ReaperStats {
        let period = self.config.interval;
        let mut ticker = time::interval_at(TokioInstant::now() + period, period);
        // A stalled runtime shouldn't trigger a burst of back-to-back sweeps;
        // one sweep catches everything that expired in the meantime.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(interval_secs = period.as_secs_f64(), "session reaper started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        debug!(
            sweeps = self.stats.sweeps,
            evicted = self.stats.evicted,
            "session reaper stopped"
        );
        self.stats
    }

    /// Sweeps once, right now. Returns how many sessions were evicted.
    ///
    /// "Now" is read from the Tokio clock so that paused test time and the
    /// tick schedule agree.
    pub fn sweep_once(&mut self) -> usize {
        let now = TokioInstant::now().into_std();
        let evicted = self.store.sweep_expired(now);

        self.stats.sweeps += 1;
        self.stats.evicted += evicted as u64;

        if evicted > 0 {
            info!(
                evicted,
                remaining = self.store.len(),
                "evicted expired sessions"
            );
        } else {
            debug!(active_sessions = self.store.len(), "session sweep: nothing expired");
        }
        evicted
    }

    pub fn stats(&self) -> ReaperStats {
        self.stats
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

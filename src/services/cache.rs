//! Process-wide microcopy snapshot with a fixed time-to-live.
//!
//! The cache holds the last complete copy of the text table. A snapshot is
//! reused while it is non-empty and younger than the TTL; otherwise the next
//! reader fetches the whole table again. Fetch failures never reach callers:
//! the previous snapshot (possibly empty) stays in place and is returned.
//!
//! Remote fetches are single-flight. Readers that find the cache stale while
//! a fetch is running wait for that fetch and share its outcome instead of
//! starting their own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::model::snapshot::Snapshot;
use crate::services::text_store::TextStore;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheState {
    snapshot: Arc<Snapshot>,
    refreshed_at: Option<Instant>,
    // Completed fetch attempts, successful or not.
    attempts: u64,
    // Bumped by every reset; a fetch started in an older epoch is discarded.
    epoch: u64,
    // Epoch the most recently completed fetch was started in.
    completed_epoch: u64,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.snapshot.is_empty()
            && self
                .refreshed_at
                .is_some_and(|at| at.elapsed() < ttl)
    }
}

struct CacheInner {
    store: Arc<dyn TextStore>,
    ttl: Duration,
    state: RwLock<CacheState>,
    fetch_gate: Arc<Mutex<()>>,
    failures: AtomicU64,
}

impl CacheInner {
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch_and_swap(&self, epoch: u64) -> Arc<Snapshot> {
        let started = Instant::now();
        let result = self.store.fetch_all().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(rows) => {
                let snapshot = Arc::new(Snapshot::from_entries(rows, Utc::now()));
                let previous = {
                    let mut state = self.write_state();
                    state.attempts += 1;
                    state.completed_epoch = epoch;
                    if state.epoch != epoch {
                        None
                    } else {
                        state.refreshed_at = Some(Instant::now());
                        Some(std::mem::replace(&mut state.snapshot, Arc::clone(&snapshot)))
                    }
                };
                let Some(previous) = previous else {
                    debug!(
                        entries = snapshot.len(),
                        elapsed_ms, "cache was reset during fetch, discarding result"
                    );
                    return snapshot;
                };

                info!(
                    entries = snapshot.len(),
                    changed = previous.fingerprint() != snapshot.fingerprint(),
                    elapsed_ms,
                    "microcopy snapshot refreshed"
                );
                snapshot
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let stale = {
                    let mut state = self.write_state();
                    state.attempts += 1;
                    state.completed_epoch = epoch;
                    Arc::clone(&state.snapshot)
                };

                warn!(
                    store = %self.store.describe(),
                    error = %err,
                    stale_entries = stale.len(),
                    elapsed_ms,
                    "microcopy fetch failed, serving previous snapshot"
                );
                stale
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub fetched_at: DateTime<Utc>,
    pub fingerprint: String,
    pub fresh: bool,
    pub ttl_secs: u64,
    pub fetch_attempts: u64,
    pub fetch_failures: u64,
}

/// Cheap to clone; all clones share one snapshot.
#[derive(Clone)]
pub struct MicrocopyCache {
    inner: Arc<CacheInner>,
}

impl MicrocopyCache {
    pub fn new(store: Arc<dyn TextStore>) -> Self {
        Self::with_ttl(store, DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn TextStore>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                ttl,
                state: RwLock::new(CacheState {
                    snapshot: Arc::new(Snapshot::empty()),
                    refreshed_at: None,
                    attempts: 0,
                    epoch: 0,
                    completed_epoch: 0,
                }),
                fetch_gate: Arc::new(Mutex::new(())),
                failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn store(&self) -> &Arc<dyn TextStore> {
        &self.inner.store
    }

    /// The snapshot as it is now, without fetching.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.read_state().snapshot)
    }

    pub fn is_fresh(&self) -> bool {
        self.inner.read_state().is_fresh(self.inner.ttl)
    }

    /// Returns a fresh snapshot, fetching the full table when the current
    /// one is empty or older than the TTL.
    ///
    /// The fetch itself runs on its own task: if the caller is dropped
    /// mid-fetch, the fetch still completes and replaces the snapshot,
    /// unless [`reset`](Self::reset) was called while it ran.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        let observed_attempts = {
            let state = self.inner.read_state();
            if state.is_fresh(self.inner.ttl) {
                return Arc::clone(&state.snapshot);
            }
            state.attempts
        };

        let gate = Arc::clone(&self.inner.fetch_gate).lock_owned().await;

        let epoch = {
            let state = self.inner.read_state();
            let joined = state.attempts != observed_attempts
                && state.completed_epoch == state.epoch;
            if joined || state.is_fresh(self.inner.ttl) {
                debug!("joined in-flight microcopy fetch");
                return Arc::clone(&state.snapshot);
            }
            state.epoch
        };

        let inner = Arc::clone(&self.inner);
        let fetch = tokio::spawn(async move {
            let _gate = gate;
            inner.fetch_and_swap(epoch).await
        });

        match fetch.await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(error = %err, "microcopy fetch task failed");
                self.current()
            }
        }
    }

    /// Drops the snapshot; the next [`snapshot`](Self::snapshot) call fetches,
    /// even if a fetch was already running when the reset happened.
    pub fn reset(&self) {
        let mut state = self.inner.write_state();
        state.snapshot = Arc::new(Snapshot::empty());
        state.refreshed_at = None;
        state.epoch += 1;
        debug!(epoch = state.epoch, "microcopy cache reset");
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.read_state();
        CacheStats {
            entries: state.snapshot.len(),
            fetched_at: state.snapshot.fetched_at(),
            fingerprint: state.snapshot.fingerprint().to_string(),
            fresh: state.is_fresh(self.inner.ttl),
            ttl_secs: self.inner.ttl.as_secs(),
            fetch_attempts: state.attempts,
            fetch_failures: self.inner.failures.load(Ordering::Relaxed),
        }
    }
}

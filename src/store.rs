//! In-memory report store with time-based eviction.
//!
//! Reports are insert-once, delete-once, never mutated, so the backing
//! `DashMap` gives safe concurrent put/get/remove across in-flight requests
//! without coarse locking. Expiry is lazy on read plus a periodic background
//! sweep — no per-entry timers, no ambient global state; the store instance
//! is owned by the composition root and shared by `Arc`.

use crate::report::Report;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{debug, info};

/// Default retention window for stored reports (one hour).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

struct StoredEntry {
    report: Report,
    stored_at: Instant,
}

impl StoredEntry {
    fn is_expired(&self, retention: Duration) -> bool {
        self.stored_at.elapsed() >= retention
    }
}

/// Process-wide store mapping opaque report ids to immutable reports.
pub struct ReportStore {
    entries: DashMap<String, StoredEntry>,
    retention: Duration,
}

impl ReportStore {
    /// Create a store evicting entries after the given retention window.
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
        }
    }

    /// Insert a report under a fresh id and return the id.
    ///
    /// Ids are 128-bit random UUIDs rendered as hyphenated text; collision
    /// probability within a retention window is negligible, so an id is
    /// never overwritten.
    pub fn put(&self, report: Report) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.entries.insert(
            id.clone(),
            StoredEntry {
                report,
                stored_at: Instant::now(),
            },
        );
        debug!(id = %id, "report stored");
        id
    }

    /// Fetch a report if present and not yet evicted.
    ///
    /// Expired entries are removed on read. Absence does not distinguish
    /// never-existed from expired.
    pub fn get(&self, id: &str) -> Option<Report> {
        let expired = match self.entries.get(id) {
            Some(entry) => entry.is_expired(self.retention),
            None => return None,
        };
        if expired {
            self.entries.remove(id);
            return None;
        }
        self.entries.get(id).map(|entry| entry.report.clone())
    }

    /// Remove all expired entries, returning how many were evicted.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(self.retention));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored reports, expired entries included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no reports.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured retention window.
    pub fn retention(&self) -> Duration {
        self.retention
    }
}

/// Spawn the background eviction sweep, ticking at a quarter of the retention
/// window (at least every second), until shutdown is signaled.
///
/// Signal shutdown with [`Notify::notify_one`]: it stores a permit, so a
/// notification fired while the sweeper is mid-sweep (between `select!`
/// polls) is picked up on the next iteration instead of being lost. The
/// `Notify` must be dedicated to this task — a stored permit is consumed by
/// whichever waiter polls first.
pub fn spawn_sweeper(
    store: Arc<ReportStore>,
    shutdown: Arc<Notify>,
) -> tokio::task::JoinHandle<()> {
    let tick = (store.retention() / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("report store sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = store.sweep();
                    if evicted > 0 {
                        info!("evicted {evicted} expired report(s)");
                    }
                }
            }
        }
    })
}

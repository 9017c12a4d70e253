//! Active Relay Registry
//!
//! Tracks every relay stream the daemon is currently serving. Each entry
//! owns the stream's cancellation token, so shutdown can stop all of them
//! and the health endpoint can report how many are live.
//!
//! Entries are removed by [`RelayGuard`] when the response body is dropped,
//! whether the stream finished or the caller disconnected.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier for one relay stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RelayId(Uuid);

impl RelayId {
    /// Generate a new random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RelayId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RelayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short prefix is enough to correlate log lines
        write!(f, "relay-{}", &self.0.to_string()[..8])
    }
}

/// Registry entry for a live relay
struct RelayEntry {
    model: String,
    started_at: Instant,
    cancel: CancellationToken,
}

/// Statistics for a single relay
#[derive(Clone, Debug)]
pub struct RelayStats {
    /// Model the relay is streaming from
    pub model: String,
    /// How long the relay has been running, in seconds
    pub uptime_secs: u64,
}

/// Concurrent map of live relays
#[derive(Clone, Default)]
pub struct ActiveRelays {
    entries: Arc<DashMap<RelayId, RelayEntry>>,
}

impl ActiveRelays {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relay; the entry lives as long as the returned guard
    pub fn register(&self, model: impl Into<String>, cancel: CancellationToken) -> RelayGuard {
        let id = RelayId::new();
        let model = model.into();
        self.entries.insert(
            id,
            RelayEntry {
                model: model.clone(),
                started_at: Instant::now(),
                cancel: cancel.clone(),
            },
        );
        info!(relay = %id, model = %model, active = self.len(), "Relay started");

        RelayGuard {
            id,
            cancel,
            entries: Arc::clone(&self.entries),
        }
    }

    /// Number of live relays
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no relay is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cancel every live relay
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        for entry in self.entries.iter() {
            info!(relay = %entry.key(), model = %entry.value().model, "Cancelling relay");
            entry.value().cancel.cancel();
            cancelled += 1;
        }
        cancelled
    }

    /// Per-relay statistics, oldest first
    #[must_use]
    pub fn stats(&self) -> Vec<(RelayId, RelayStats)> {
        let mut stats: Vec<(RelayId, RelayStats, Instant)> = self
            .entries
            .iter()
            .map(|r| {
                (
                    *r.key(),
                    RelayStats {
                        model: r.value().model.clone(),
                        uptime_secs: r.value().started_at.elapsed().as_secs(),
                    },
                    r.value().started_at,
                )
            })
            .collect();
        stats.sort_by_key(|(_, _, started_at)| *started_at);
        stats.into_iter().map(|(id, s, _)| (id, s)).collect()
    }
}

impl std::fmt::Debug for ActiveRelays {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRelays")
            .field("len", &self.len())
            .finish()
    }
}

/// Removes its registry entry and cancels the relay when dropped
pub struct RelayGuard {
    id: RelayId,
    cancel: CancellationToken,
    entries: Arc<DashMap<RelayId, RelayEntry>>,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some((_, entry)) = self.entries.remove(&self.id) {
            debug!(
                relay = %self.id,
                model = %entry.model,
                elapsed_ms = entry.started_at.elapsed().as_millis(),
                active = self.entries.len(),
                "Relay finished"
            );
        }
    }
}

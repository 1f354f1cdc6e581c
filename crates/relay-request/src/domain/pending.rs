//! Pending Request Registry - join point of the send and receive paths.
//!
//! Maps correlation IDs to requests waiting for a response.
//!
//! Flow:
//! 1. Client generates a `CorrelationId` and calls `insert()` to get a
//!    oneshot receiver, before sending anything
//! 2. Client sends the request carrying the id and its reply address
//! 3. Reply listener calls `complete()` when a response arrives
//! 4. Client's deadline timer calls `expire()`, its cancellation watcher
//!    calls `cancel()`
//!
//! Every terminating operation is a remove on the map; only the caller that
//! removed the entry signals it, so the first event wins and later events for
//! the same id are no-ops.

use crate::domain::error::RegistryError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::{CorrelationId, Envelope};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How a pending request terminated.
#[derive(Debug)]
pub enum Completion {
    /// A response with the matching correlation id arrived.
    Response(Envelope),
    /// The deadline elapsed first.
    Expired,
    /// The caller cancelled first.
    Cancelled,
}

/// A pending request waiting for its response
struct PendingRequest {
    /// Single-fire completion handle
    completion: oneshot::Sender<Completion>,
    /// Absolute deadline
    deadline: Instant,
    /// When the request was registered
    registered_at: Instant,
}

/// Statistics for the pending request registry
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total requests registered
    pub registered: AtomicU64,
    /// Total requests completed with a response
    pub completed: AtomicU64,
    /// Total requests that hit their deadline
    pub expired: AtomicU64,
    /// Total requests cancelled by their caller
    pub cancelled: AtomicU64,
    /// Total responses that matched no pending request
    pub stale: AtomicU64,
}

impl PendingStats {
    /// Plain-value copy of the counters.
    pub fn snapshot(&self) -> PendingStatsSnapshot {
        PendingStatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingStatsSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub expired: u64,
    pub cancelled: u64,
    pub stale: u64,
}

/// Concurrency-safe map from correlation id to a waiting request.
///
/// Different entries are mutated in parallel (the map is sharded); operations
/// on the same entry are serialized by the remove.
#[derive(Default)]
pub struct PendingRequestRegistry {
    /// Map of correlation ID to pending request
    pending: DashMap<CorrelationId, PendingRequest>,
    /// Statistics
    stats: Arc<PendingStats>,
}

impl PendingRequestRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request and get a receiver for its completion.
    ///
    /// Fails if an entry for `correlation_id` is still live.
    pub fn insert(
        &self,
        correlation_id: CorrelationId,
        deadline: Instant,
    ) -> Result<oneshot::Receiver<Completion>, RegistryError> {
        match self.pending.entry(correlation_id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateCorrelationId(correlation_id)),
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                slot.insert(PendingRequest {
                    completion: tx,
                    deadline,
                    registered_at: Instant::now(),
                });
                self.stats.registered.fetch_add(1, Ordering::Relaxed);

                debug!(
                    correlation_id = %correlation_id,
                    timeout_ms = deadline.saturating_duration_since(Instant::now()).as_millis(),
                    "Registered pending request"
                );
                Ok(rx)
            }
        }
    }

    /// Complete a pending request with a response.
    ///
    /// Returns false and discards `response` when the id is unknown, already
    /// completed, or retired by expiry or cancellation.
    pub fn complete(&self, correlation_id: CorrelationId, response: Envelope) -> bool {
        let Some((_, pending)) = self.pending.remove(&correlation_id) else {
            self.stats.stale.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let response_time = pending.registered_at.elapsed();
        if pending.completion.send(Completion::Response(response)).is_err() {
            // Caller stopped waiting after the entry was looked up
            debug!(correlation_id = %correlation_id, "Pending request receiver dropped");
        }
        self.stats.completed.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            response_time_ms = response_time.as_millis(),
            "Completed pending request"
        );
        true
    }

    /// Retire a pending request whose deadline elapsed.
    ///
    /// No-op returning false if a response or cancellation already won.
    pub fn expire(&self, correlation_id: CorrelationId) -> bool {
        self.terminate(correlation_id, Completion::Expired)
    }

    /// Retire a pending request whose caller cancelled.
    ///
    /// No-op returning false if a response or the deadline already won.
    pub fn cancel(&self, correlation_id: CorrelationId) -> bool {
        self.terminate(correlation_id, Completion::Cancelled)
    }

    /// Drop an entry without signalling it.
    ///
    /// Used when the request never made it onto the bus or its caller went
    /// away; nobody is left to observe a completion.
    pub fn remove(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.remove(correlation_id).is_some()
    }

    fn terminate(&self, correlation_id: CorrelationId, completion: Completion) -> bool {
        let Some((_, pending)) = self.pending.remove(&correlation_id) else {
            return false;
        };

        let elapsed = pending.registered_at.elapsed();
        match completion {
            Completion::Expired => {
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                warn!(
                    correlation_id = %correlation_id,
                    elapsed_ms = elapsed.as_millis(),
                    "Pending request expired"
                );
            }
            Completion::Cancelled => {
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    elapsed_ms = elapsed.as_millis(),
                    "Pending request cancelled"
                );
            }
            Completion::Response(_) => {
                self.stats.completed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let _ = pending.completion.send(completion);
        true
    }

    /// Expire every entry whose deadline has passed.
    ///
    /// Backstop for entries whose own timer never ran. Returns the number of
    /// entries expired.
    pub fn expire_overdue(&self) -> usize {
        let now = Instant::now();
        let overdue: Vec<CorrelationId> = self
            .pending
            .iter()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| *entry.key())
            .collect();

        overdue
            .into_iter()
            .filter(|id| {
                // Re-check under the shard lock; a response may have won since the scan
                self.pending
                    .remove_if(id, |_, pending| pending.deadline <= now)
                    .map(|(_, pending)| {
                        self.stats.expired.fetch_add(1, Ordering::Relaxed);
                        let _ = pending.completion.send(Completion::Expired);
                    })
                    .is_some()
            })
            .count()
    }

    /// Get number of currently pending requests
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Check if a correlation ID is pending
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Get statistics
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

/// Background task to expire overdue requests
pub async fn cleanup_task(registry: Arc<PendingRequestRegistry>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let expired = registry.expire_overdue();
        if expired > 0 {
            debug!(expired = expired, "Expired overdue pending requests");
        }
    }
}

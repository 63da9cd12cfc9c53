//! Audit entry capture.

use bastion_audit_types::AuditEntry;
use bastion_common_core::UserId;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Configuration for audit capture.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum entries buffered before new ones are dropped.
    pub buffer_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self { buffer_size: 10_000 }
    }
}

/// How often `record` sweeps idle actors out of the clock.
const EVICT_EVERY: u64 = 1024;

/// An actor idle this long is forgotten. Entries are stamped at build time,
/// so a later proposal for that actor is already past its last stamp.
const IDLE_AFTER_SECS: i64 = 300;

/// Per-actor clock that keeps each actor's timestamps strictly increasing.
///
/// Holds one slot per recently active actor; idle actors are evicted.
#[derive(Debug, Default)]
pub struct ActorClock {
    last: DashMap<UserId, DateTime<Utc>>,
}

impl ActorClock {
    /// Create an empty clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `proposed`, or one microsecond past the actor's previous stamp
    /// if `proposed` would not move forward.
    pub fn stamp(&self, actor: UserId, proposed: DateTime<Utc>) -> DateTime<Utc> {
        self.stamp_then(actor, proposed, |stamped| stamped)
    }

    /// Forget actors whose last stamp is older than `cutoff`.
    pub fn evict_before(&self, cutoff: DateTime<Utc>) {
        self.last.retain(|_, last| *last >= cutoff);
    }

    /// Number of actors currently tracked.
    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    /// Stamp and run `f` while the actor's slot is still held, so that no
    /// other entry for the same actor can be stamped in between.
    fn stamp_then<R>(
        &self,
        actor: UserId,
        proposed: DateTime<Utc>,
        f: impl FnOnce(DateTime<Utc>) -> R,
    ) -> R {
        let mut last = self
            .last
            .entry(actor)
            .or_insert(proposed - Duration::microseconds(1));
        let stamped = if proposed > *last {
            proposed
        } else {
            *last + Duration::microseconds(1)
        };
        *last = stamped;
        f(stamped)
    }
}

/// Handle for submitting audit entries.
///
/// Submission never blocks and never fails the caller: when the buffer is
/// full or the writer is gone the entry is dropped and the drop is logged.
#[derive(Clone)]
pub struct AuditCapture {
    sender: mpsc::Sender<AuditEntry>,
    clock: Arc<ActorClock>,
    submitted: Arc<AtomicU64>,
}

impl AuditCapture {
    /// Create a new capture handle and the receiver the writer drains.
    pub fn new(config: CaptureConfig) -> (Self, mpsc::Receiver<AuditEntry>) {
        let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
        let capture = Self {
            sender,
            clock: Arc::new(ActorClock::new()),
            submitted: Arc::new(AtomicU64::new(0)),
        };
        (capture, receiver)
    }

    /// Record an audit entry (non-blocking).
    pub fn record(&self, mut entry: AuditEntry) {
        if self.submitted.fetch_add(1, Ordering::Relaxed) % EVICT_EVERY == EVICT_EVERY - 1 {
            self.clock.evict_before(Utc::now() - Duration::seconds(IDLE_AFTER_SECS));
        }
        let sender = &self.sender;
        self.clock.stamp_then(entry.actor_id, entry.timestamp, |stamped| {
            entry.timestamp = stamped;
            let action = entry.action.clone();
            let actor = entry.actor_id;
            match sender.try_send(entry) {
                Ok(()) => debug!(action = %action, actor = %actor, "Audit entry captured"),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(action = %action, actor = %actor, "Audit buffer full, entry dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    error!(action = %action, actor = %actor, "Audit channel closed, entry dropped");
                }
            }
        });
    }

    /// Check if the capture channel is healthy.
    pub fn is_healthy(&self) -> bool {
        !self.sender.is_closed()
    }
}

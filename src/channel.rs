//! Inbound snapshot subscription.
//!
//! The transport side publishes raw record batches; the monitor consumes them
//! through a [`SnapshotSubscription`]. Batches are validated by the monitor,
//! not here.
//!
//! `publish()` must never block the producer: when the buffer is full or the
//! subscription has been closed the batch is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use diagnostic_types::Record;

/// One undecoded delivery from the transport.
pub type RawSnapshot = Vec<Record>;

/// Create a bounded publisher/subscription pair for `topic`.
///
/// `capacity` is clamped to at least one: a zero-capacity channel would make
/// every non-blocking publish a drop.
pub fn snapshot_channel(
    topic: impl Into<String>,
    capacity: usize,
) -> (SnapshotPublisher, SnapshotSubscription) {
    let (sender, receiver) = bounded(capacity.max(1));
    let publisher = SnapshotPublisher {
        sender,
        published: AtomicU64::new(0),
        dropped: AtomicU64::new(0),
    };
    let subscription = SnapshotSubscription {
        topic: topic.into(),
        receiver,
    };
    (publisher, subscription)
}

/// Producer side of a snapshot channel.
#[derive(Debug)]
pub struct SnapshotPublisher {
    sender: Sender<RawSnapshot>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl SnapshotPublisher {
    /// Publish a batch. Never blocks; returns `false` if the batch was dropped.
    pub fn publish(&self, records: RawSnapshot) -> bool {
        match self.sender.try_send(records) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Publisher statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Batches handed to the channel
    pub published: u64,
    /// Batches dropped (buffer full or subscription closed)
    pub dropped: u64,
}

/// Consumer side of a snapshot channel.
#[derive(Debug)]
pub struct SnapshotSubscription {
    topic: String,
    receiver: Receiver<RawSnapshot>,
}

impl SnapshotSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Blocking receive. Returns `None` once every publisher is gone.
    pub fn recv(&self) -> Option<RawSnapshot> {
        self.receiver.recv().ok()
    }

    /// Returns `None` if nothing is pending.
    pub fn try_recv(&self) -> Option<RawSnapshot> {
        self.receiver.try_recv().ok()
    }

    /// Number of batches waiting.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

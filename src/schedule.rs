//! Display scheduling: turning bursty batches into a paced stream.
//!
//! Every batch is replayed one polling interval after it arrived, with the
//! items spread out the way they were spread out at the origin:
//!
//! ```text
//! base       = received_at + polling_interval
//! display_at = base + (published_at - max_published)
//! ```
//!
//! The newest item of a batch lands exactly on `base`; older items land
//! proportionally earlier.  Buffering one full interval means the next batch
//! normally arrives before the current one has finished draining.
//!
//! [`DisplayScheduler::tick`] is driven by the host and releases every item
//! whose time has come.  The scheduler is not synchronized: exactly one tick
//! may run at a time.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use crate::poll::{Batch, BatchQueue};
use crate::source::{FeedItem, ItemKind};

/// What to do with a batch in which no item has a usable timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DegeneratePolicy {
    /// Drop the batch from the replay timeline.
    #[default]
    Drop,
    /// Release its items at `received_at`, in arrival order.
    Immediate,
}

/// A released item, as handed to the [`Sink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    pub id: String,
    /// Author with the handle marker stripped.
    pub author: String,
    /// Text to display; empty for payload-only kinds.
    pub text: String,
    /// Kind tag with its structured payload.
    pub kind: ItemKind,
    /// When the item was due.
    pub display_at: DateTime<Utc>,
}

/// Receiver of released items.
pub trait Sink {
    fn emit(&mut self, emission: Emission);
}

impl<F: FnMut(Emission)> Sink for F {
    fn emit(&mut self, emission: Emission) {
        self(emission)
    }
}

/// A feed item with its computed presentation time.
///
/// Ordered by `display_at`, ties broken by scheduling order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledItem {
    pub item: FeedItem,
    pub display_at: DateTime<Utc>,
    seq: u64,
}

impl Ord for ScheduledItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.display_at
            .cmp(&other.display_at)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ScheduledItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl ScheduledItem {
    fn into_emission(self) -> Emission {
        Emission {
            author: self.item.display_author().to_string(),
            text: self.item.text().to_string(),
            id: self.item.id,
            kind: self.item.kind,
            display_at: self.display_at,
        }
    }
}

/// Presentation time of every item of `batch`, in item order.
///
/// `None` when no item has a parsable timestamp.  Items without one are
/// placed as if they were the newest.
pub fn display_times(batch: &Batch) -> Option<Vec<DateTime<Utc>>> {
    let max_published = batch.items.iter().filter_map(|i| i.published_at).max()?;
    let interval = TimeDelta::from_std(batch.polling_interval).unwrap_or(TimeDelta::MAX);
    let base = batch
        .received_at
        .checked_add_signed(interval)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let times = batch
        .items
        .iter()
        .map(|item| {
            let delta = item.published_at.unwrap_or(max_published) - max_published;
            base.checked_add_signed(delta)
                .unwrap_or(DateTime::<Utc>::MIN_UTC)
        })
        .collect();
    Some(times)
}

/// Min-ordered timeline of items waiting to be released.
#[derive(Debug, Default)]
pub struct DisplayScheduler {
    heap: BinaryHeap<Reverse<ScheduledItem>>,
    next_seq: u64,
    policy: DegeneratePolicy,
}

impl DisplayScheduler {
    pub fn new(policy: DegeneratePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Schedule every item of `batch`; returns how many were scheduled.
    pub fn ingest(&mut self, batch: Batch) -> usize {
        if batch.items.is_empty() {
            return 0;
        }

        let times = match display_times(&batch) {
            Some(times) => times,
            None => match self.policy {
                DegeneratePolicy::Drop => {
                    warn!(count = batch.items.len(), "batch has no usable timestamps; dropping");
                    return 0;
                }
                DegeneratePolicy::Immediate => {
                    warn!(count = batch.items.len(), "batch has no usable timestamps; releasing now");
                    vec![batch.received_at; batch.items.len()]
                }
            },
        };

        let count = batch.items.len();
        for (item, display_at) in batch.items.into_iter().zip(times) {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.heap.push(Reverse(ScheduledItem {
                item,
                display_at,
                seq,
            }));
        }
        debug!(count, pending = self.heap.len(), "scheduled batch");
        count
    }

    /// Drain `queue` and schedule every batch in it, oldest first.
    pub fn ingest_from(&mut self, queue: &BatchQueue) -> usize {
        queue.drain().into_iter().map(|batch| self.ingest(batch)).sum()
    }

    /// Release every item due at or before `now`; returns how many.
    pub fn tick(&mut self, now: DateTime<Utc>, sink: &mut impl Sink) -> usize {
        let mut emitted = 0;
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.display_at > now {
                break;
            }
            let Some(Reverse(due)) = self.heap.pop() else {
                break;
            };
            sink.emit(due.into_emission());
            emitted += 1;
        }
        emitted
    }

    /// Presentation time of the next pending item.
    pub fn next_display_at(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(s)| s.display_at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Forget every pending item.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

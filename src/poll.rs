//! Background chat polling.
//!
//! A [`Poller`] runs on a dedicated thread: it resolves the feed handle once,
//! then fetches pages, pushes non-empty ones onto a shared [`BatchQueue`] and
//! sleeps for the interval the origin advises.  The host drains the queue
//! from its own tick loop.
//!
//! ## For contributors
//!
//! The poller has a single retry policy: any failed fetch is logged and
//! retried after [`PollerSettings::fallback_interval`], forever, until
//! [`Poller::stop`].  A failed *resolution* is terminal for the run; the host
//! has to call [`Poller::start`] again.
//!
//! Every await point (resolve, fetch, sleep) races the run's
//! [`CancellationToken`], so `stop()` returns as soon as the thread has
//! noticed the cancellation.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::PollerError;
use crate::source::{FeedClient, FeedItem, FeedPage};

/// Interval used until the origin advises one.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(5000);

/// Wait after a failed fetch, independent of the advised interval.
pub const FALLBACK_INTERVAL: Duration = Duration::from_millis(5000);

/// Name of the background thread.
const THREAD_NAME: &str = "feed-poller";

// ---------------------------------------------------------------------------
// Batch + queue
// ---------------------------------------------------------------------------

/// The non-empty result of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Items in origin order.
    pub items: Vec<FeedItem>,
    /// Interval in force when the batch was fetched.
    pub polling_interval: Duration,
    /// Local instant at which the page was fully retrieved.
    pub received_at: DateTime<Utc>,
}

/// Unbounded FIFO shared between the poller thread and the host.
#[derive(Debug, Default)]
pub struct BatchQueue {
    inner: Mutex<VecDeque<Batch>>,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a VecDeque half-updated,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Batch>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, batch: Batch) {
        self.lock().push_back(batch);
    }

    /// Remove and return the oldest batch.
    pub fn pop(&self) -> Option<Batch> {
        self.lock().pop_front()
    }

    /// Inspect the oldest batch without removing it.
    pub fn peek_with<R>(&self, f: impl FnOnce(&Batch) -> R) -> Option<R> {
        self.lock().front().map(f)
    }

    /// Take every queued batch, oldest first.
    pub fn drain(&self) -> Vec<Batch> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

// ---------------------------------------------------------------------------
// Settings + lifecycle state
// ---------------------------------------------------------------------------

/// Everything a poller run needs, fixed at construction.
#[derive(Clone)]
pub struct PollerSettings {
    /// Resource whose feed is polled (a video id).
    pub resource_id: String,
    /// Credential passed to every request.
    pub credential: String,
    /// Interval used until the origin advises one.
    pub default_interval: Duration,
    /// Wait after a failed fetch.
    pub fallback_interval: Duration,
}

impl PollerSettings {
    pub fn new(resource_id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            credential: credential.into(),
            default_interval: DEFAULT_POLLING_INTERVAL,
            fallback_interval: FALLBACK_INTERVAL,
        }
    }

    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    pub fn with_fallback_interval(mut self, interval: Duration) -> Self {
        self.fallback_interval = interval;
        self
    }
}

impl fmt::Debug for PollerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollerSettings")
            .field("resource_id", &self.resource_id)
            .field("credential", &"<redacted>")
            .field("default_interval", &self.default_interval)
            .field("fallback_interval", &self.fallback_interval)
            .finish()
    }
}

/// Lifecycle of a poller: `Idle -> Resolving -> Polling -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PollerState {
    Idle = 0,
    Resolving = 1,
    Polling = 2,
    Stopped = 3,
}

impl PollerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PollerState::Resolving,
            2 => PollerState::Polling,
            3 => PollerState::Stopped,
            _ => PollerState::Idle,
        }
    }
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PollerState::Idle => "idle",
            PollerState::Resolving => "resolving",
            PollerState::Polling => "polling",
            PollerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// State shared between the poller handle and its thread.
#[derive(Debug)]
struct Shared {
    running: AtomicBool,
    state: AtomicU8,
}

impl Shared {
    fn state(&self) -> PollerState {
        PollerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PollerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Paging cursor and advised interval of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PollCursor {
    page_token: Option<String>,
    interval: Duration,
}

impl PollCursor {
    fn new(interval: Duration) -> Self {
        Self {
            page_token: None,
            interval,
        }
    }

    /// Take in a successful page; returns the batch to publish, if any.
    fn advance(&mut self, page: FeedPage, received_at: DateTime<Utc>) -> Option<Batch> {
        self.page_token = page.next_page_token;
        if let Some(interval) = page.polling_interval {
            self.interval = interval;
        }

        if page.items.is_empty() {
            return None;
        }
        Some(Batch {
            items: page.items,
            polling_interval: self.interval,
            received_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

struct Worker {
    cancel: CancellationToken,
    thread: JoinHandle<()>,
}

impl Worker {
    /// Cancel the run and wait for the thread, unless we *are* the thread.
    fn shutdown(self) {
        self.cancel.cancel();
        if self.thread.thread().id() == thread::current().id() {
            return;
        }
        if self.thread.join().is_err() {
            error!("poller thread panicked");
        }
    }
}

/// Polls one feed on a background thread.
///
/// ```ignore
/// let poller = Poller::new(YouTubeClient::new(), PollerSettings::new(video_id, api_key));
/// let queue = poller.queue();
/// poller.start()?;
/// // every host tick:
/// scheduler.ingest_from(&queue);
/// ```
pub struct Poller<C: FeedClient> {
    client: Arc<C>,
    settings: PollerSettings,
    queue: Arc<BatchQueue>,
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl<C: FeedClient> Poller<C> {
    pub fn new(client: C, settings: PollerSettings) -> Self {
        Self::with_client(Arc::new(client), settings)
    }

    /// Build a poller around a client that is shared elsewhere.
    pub fn with_client(client: Arc<C>, settings: PollerSettings) -> Self {
        Self {
            client,
            settings,
            queue: Arc::new(BatchQueue::new()),
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                state: AtomicU8::new(PollerState::Idle as u8),
            }),
            worker: Mutex::new(None),
        }
    }

    /// The outbound queue; the host drains it every tick.
    pub fn queue(&self) -> Arc<BatchQueue> {
        Arc::clone(&self.queue)
    }

    pub fn state(&self) -> PollerState {
        self.shared.state()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start polling on a fresh background thread.
    ///
    /// Does nothing if a run is already active.  Each run starts over: the
    /// handle is resolved again and the cursor and interval are reset.
    pub fn start(&self) -> Result<(), PollerError> {
        let mut slot = self.lock_worker();

        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("poller already running");
            return Ok(());
        }

        // A run that ended on its own (failed resolution) is still parked here.
        if let Some(previous) = slot.take() {
            previous.shutdown();
        }

        let cancel = CancellationToken::new();
        let run = PollRun {
            client: Arc::clone(&self.client),
            settings: self.settings.clone(),
            queue: Arc::clone(&self.queue),
            shared: Arc::clone(&self.shared),
            cancel: cancel.clone(),
        };

        self.shared.set_state(PollerState::Resolving);
        let spawned = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || run.run_blocking());

        match spawned {
            Ok(thread) => {
                *slot = Some(Worker { cancel, thread });
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared.set_state(PollerState::Stopped);
                Err(e.into())
            }
        }
    }

    /// Stop polling.
    ///
    /// Idempotent and safe before `start()`.  The queue is left untouched:
    /// draining it is the host's business.
    pub fn stop(&self) {
        let mut slot = self.lock_worker();
        self.shared.running.store(false, Ordering::Release);

        if let Some(worker) = slot.take() {
            worker.shutdown();
            self.shared.set_state(PollerState::Stopped);
            info!(resource_id = %self.settings.resource_id, "stopped poller");
        }
    }
}

impl<C: FeedClient> Drop for Poller<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One run of the poll loop, moved onto the background thread.
struct PollRun<C: FeedClient> {
    client: Arc<C>,
    settings: PollerSettings,
    queue: Arc<BatchQueue>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl<C: FeedClient> PollRun<C> {
    fn run_blocking(self) {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.run()),
            Err(e) => error!(error = %e, "failed to build poller runtime"),
        }

        self.shared.running.store(false, Ordering::Release);
        self.shared.set_state(PollerState::Stopped);
    }

    async fn run(&self) {
        let settings = &self.settings;
        info!(resource_id = %settings.resource_id, "starting poller");

        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return,
            r = self.client.resolve_feed(&settings.resource_id, &settings.credential) => r,
        };

        let handle = match resolved {
            Ok(Some(handle)) => handle,
            Ok(None) => {
                error!(resource_id = %settings.resource_id, "no active live chat; stopping poller");
                return;
            }
            Err(e) => {
                error!(resource_id = %settings.resource_id, error = %e, "could not resolve live chat; stopping poller");
                return;
            }
        };

        info!(live_chat_id = %handle, "found live chat");
        self.shared.set_state(PollerState::Polling);

        let mut cursor = PollCursor::new(settings.default_interval);

        while !self.cancel.is_cancelled() {
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                r = self.client.fetch_page(&handle, &settings.credential, cursor.page_token.as_deref()) => r,
            };

            let wait = match fetched {
                Ok(page) => {
                    if let Some(batch) = cursor.advance(page, Utc::now()) {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        debug!(count = batch.items.len(), "fetched messages");
                        self.queue.push(batch);
                    }
                    cursor.interval
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_ms = settings.fallback_interval.as_millis() as u64,
                        "failed to fetch messages"
                    );
                    settings.fallback_interval
                }
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

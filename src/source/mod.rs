//! Remote feed abstraction layer.
//!
//! This module defines the [`FeedClient`] trait and the common types a client
//! hands to the poller.  Concrete clients live in sub-modules (currently only
//! [`youtube`]).
//!
//! ## For contributors — adding a new origin
//!
//! 1. Create a new file in this directory (e.g. `twitch.rs`).
//! 2. Define a client struct and implement [`FeedClient`] for it.
//! 3. Add `mod twitch;` below and re-export your struct in the `pub use` block.
//! 4. Construct it in `main.rs` and hand it to the [`Poller`](crate::poll::Poller).
//!
//! Clients are plain request/response wrappers: no retries, no sleeping.  The
//! poller owns scheduling and failure handling.

mod feed_item;
pub mod model;
pub mod youtube;

pub use feed_item::{FeedItem, ItemKind};
pub use youtube::YouTubeClient;

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

/// Opaque handle of an active feed, resolved once per poller run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedHandle(pub String);

impl FeedHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of feed items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPage {
    /// Items in origin order.
    pub items: Vec<FeedItem>,
    /// How long the origin asks us to wait before the next fetch.
    pub polling_interval: Option<Duration>,
    /// Cursor for the next fetch.
    pub next_page_token: Option<String>,
}

/// Trait that every feed origin must implement.
///
/// The poller drives both operations from its background thread, so
/// implementations must be [`Send`] + [`Sync`] and return [`Send`] futures.
///
/// ## Implementing a new origin
///
/// ```ignore
/// pub struct MyClient { /* http client, base url */ }
///
/// impl FeedClient for MyClient {
///     async fn resolve_feed(&self, resource_id: &str, credential: &str)
///         -> Result<Option<FeedHandle>, FeedError> { todo!() }
///
///     async fn fetch_page(&self, handle: &FeedHandle, credential: &str, page_token: Option<&str>)
///         -> Result<FeedPage, FeedError> { todo!() }
/// }
/// ```
pub trait FeedClient: Send + Sync + 'static {
    /// Look up the active feed of `resource_id`.
    ///
    /// `Ok(None)` means the resource exists but has no live feed right now.
    fn resolve_feed(
        &self,
        resource_id: &str,
        credential: &str,
    ) -> impl Future<Output = Result<Option<FeedHandle>, FeedError>> + Send;

    /// Fetch the page after `page_token` (or the first page when `None`).
    fn fetch_page(
        &self,
        handle: &FeedHandle,
        credential: &str,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<FeedPage, FeedError>> + Send;
}

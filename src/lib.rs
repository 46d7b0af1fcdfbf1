//! livechat-replay — poll a live chat and replay it on a smoothed timeline.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐  FeedPage  ┌──────────┐   Batch    ┌────────────┐  Emission  ┌──────┐
//! │  source/  │ ─────────► │  poll.rs │ ─────────► │ schedule.rs│ ─────────► │ Sink │
//! │ (client)  │            │ (thread) │  (queue)   │  (tick)    │            │(host)│
//! └───────────┘            └──────────┘            └────────────┘            └──────┘
//! ```
//!
//! * **`source`** — the `FeedClient` trait, the `FeedItem` model and the
//!   YouTube implementation.
//! * **`poll`** — a background thread that resolves the chat once and then
//!   fetches pages into a shared `BatchQueue`.
//! * **`schedule`** — the `DisplayScheduler`: computes a presentation time per
//!   item and releases due items on every host tick.
//! * **`event`** — maps released item kinds to host actions.
//! * **`config`** / **`logging`** — host settings and log file setup.

pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod poll;
pub mod schedule;
pub mod source;

pub use error::{FeedError, PollerError};
pub use poll::{Batch, BatchQueue, Poller, PollerSettings, PollerState};
pub use schedule::{DegeneratePolicy, DisplayScheduler, Emission, ScheduledItem, Sink};
pub use source::{FeedClient, FeedHandle, FeedItem, FeedPage, ItemKind, YouTubeClient};

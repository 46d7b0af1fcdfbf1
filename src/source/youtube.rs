//! YouTube live chat client.
//!
//! Talks to two YouTube Data API v3 endpoints:
//!
//! * `videos?part=liveStreamingDetails` resolves a video id to its active
//!   live chat id.
//! * `liveChat/messages?part=snippet,authorDetails` fetches one page of chat.
//!
//! The API key travels as the `key` query parameter.  Response decoding is
//! split into pure functions ([`YouTubeClient::parse_video_list`],
//! [`YouTubeClient::parse_message_list`]) so tests can exercise it without
//! the network.

use reqwest::Url;
use tracing::{debug, warn};

use super::model::{LiveChatMessageListResponse, VideoListResponse};
use super::{FeedClient, FeedHandle, FeedPage};
use crate::error::FeedError;

/// Public API root.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// A YouTube Data API v3 live chat client.
#[derive(Clone)]
pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
}

impl YouTubeClient {
    /// Client against the public API.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Client against another API root (a proxy or a local test server).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL for the video lookup.
    pub fn video_url(&self, video_id: &str, api_key: &str) -> Result<Url, FeedError> {
        Url::parse_with_params(
            &format!("{}/videos", self.base_url),
            &[("part", "liveStreamingDetails"), ("id", video_id), ("key", api_key)],
        )
        .map_err(|e| FeedError::Url(e.to_string()))
    }

    /// URL for one page of chat messages.
    pub fn messages_url(
        &self,
        live_chat_id: &str,
        api_key: &str,
        page_token: Option<&str>,
    ) -> Result<Url, FeedError> {
        let mut params = vec![
            ("liveChatId", live_chat_id),
            ("part", "snippet,authorDetails"),
            ("key", api_key),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        Url::parse_with_params(&format!("{}/liveChat/messages", self.base_url), &params)
            .map_err(|e| FeedError::Url(e.to_string()))
    }

    /// Decode a `videos` response into the active chat handle, if any.
    pub fn parse_video_list(body: &[u8]) -> Result<Option<FeedHandle>, FeedError> {
        let resp: VideoListResponse = serde_json::from_slice(body)?;
        Ok(resp.active_live_chat_id().map(|id| FeedHandle(id.to_string())))
    }

    /// Decode a `liveChat/messages` response into a [`FeedPage`].
    pub fn parse_message_list(body: &[u8]) -> Result<FeedPage, FeedError> {
        let resp: LiveChatMessageListResponse = serde_json::from_slice(body)?;
        Ok(resp.into())
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::status(status.as_u16(), body));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

impl Default for YouTubeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient for YouTubeClient {
    async fn resolve_feed(
        &self,
        resource_id: &str,
        credential: &str,
    ) -> Result<Option<FeedHandle>, FeedError> {
        let url = self.video_url(resource_id, credential)?;
        let body = self.get(url).await?;
        let handle = Self::parse_video_list(&body)?;

        match &handle {
            Some(h) => debug!(video_id = resource_id, live_chat_id = %h, "resolved live chat"),
            None => warn!(video_id = resource_id, "video has no active live chat"),
        }
        Ok(handle)
    }

    async fn fetch_page(
        &self,
        handle: &FeedHandle,
        credential: &str,
        page_token: Option<&str>,
    ) -> Result<FeedPage, FeedError> {
        let url = self.messages_url(handle.as_str(), credential, page_token)?;
        let body = self.get(url).await?;
        Self::parse_message_list(&body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Wire types for the YouTube Data API v3 responses we consume.
//!
//! Only the fields the pipeline needs are declared; everything else in the
//! JSON is ignored.  The `From` impls at the bottom turn these into the
//! origin-agnostic [`FeedItem`] / [`FeedPage`] types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::{FeedItem, FeedPage, ItemKind};

// ---------------------------------------------------------------------------
// videos?part=liveStreamingDetails
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    #[serde(default)]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    #[serde(default)]
    pub active_live_chat_id: Option<String>,
}

impl VideoListResponse {
    /// Live chat id of the first video, if it is currently streaming.
    pub fn active_live_chat_id(&self) -> Option<&str> {
        self.items
            .first()
            .and_then(|v| v.live_streaming_details.as_ref())
            .and_then(|d| d.active_live_chat_id.as_deref())
    }
}

// ---------------------------------------------------------------------------
// liveChat/messages?part=snippet,authorDetails
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessageListResponse {
    #[serde(default)]
    pub items: Vec<LiveChatMessage>,
    #[serde(default)]
    pub polling_interval_millis: Option<u64>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessage {
    pub id: String,
    pub snippet: Snippet,
    #[serde(default)]
    pub author_details: AuthorDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub display_message: Option<String>,
    #[serde(default)]
    pub text_message_details: Option<TextMessageDetails>,
    #[serde(default)]
    pub super_chat_details: Option<SuperChatDetails>,
    #[serde(default)]
    pub super_sticker_details: Option<SuperStickerDetails>,
    #[serde(default)]
    pub new_sponsor_details: Option<NewSponsorDetails>,
    #[serde(default)]
    pub member_milestone_chat_details: Option<MemberMilestoneChatDetails>,
    #[serde(default)]
    pub membership_gifting_details: Option<MembershipGiftingDetails>,
    #[serde(default)]
    pub gift_membership_received_details: Option<GiftMembershipReceivedDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessageDetails {
    pub message_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperChatDetails {
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub amount_micros: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount_display_string: Option<String>,
    #[serde(default)]
    pub user_comment: Option<String>,
    #[serde(default)]
    pub tier: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperStickerDetails {
    #[serde(default)]
    pub super_sticker_metadata: Option<SuperStickerMetadata>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub amount_micros: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub amount_display_string: Option<String>,
    #[serde(default)]
    pub tier: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuperStickerMetadata {
    #[serde(default)]
    pub sticker_id: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSponsorDetails {
    #[serde(default)]
    pub member_level_name: Option<String>,
    #[serde(default)]
    pub is_upgrade: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMilestoneChatDetails {
    #[serde(default)]
    pub member_level_name: Option<String>,
    #[serde(default)]
    pub member_month: Option<u32>,
    #[serde(default)]
    pub user_comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipGiftingDetails {
    #[serde(default)]
    pub gift_memberships_count: Option<u32>,
    #[serde(default)]
    pub gift_memberships_level_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftMembershipReceivedDetails {
    #[serde(default)]
    pub member_level_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDetails {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub is_chat_owner: bool,
    #[serde(default)]
    pub is_chat_sponsor: bool,
    #[serde(default)]
    pub is_chat_moderator: bool,
}

/// The API encodes `amountMicros` as a decimal string; accept numbers too.
fn de_opt_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u64),
        Str(String),
    }

    match Option::<NumOrStr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrStr::Num(n)) => Ok(Some(n)),
        Some(NumOrStr::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Conversion into origin-agnostic types
// ---------------------------------------------------------------------------

/// Parse an ISO-8601 / RFC 3339 instant; `None` on failure.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<Snippet> for ItemKind {
    fn from(s: Snippet) -> Self {
        match s.kind.as_str() {
            "textMessageEvent" => ItemKind::Text {
                message: s
                    .text_message_details
                    .map(|d| d.message_text)
                    .or(s.display_message)
                    .unwrap_or_default(),
            },
            "superChatEvent" => {
                let d = s.super_chat_details;
                ItemKind::SuperChat {
                    amount_micros: d.as_ref().and_then(|d| d.amount_micros),
                    currency: d.as_ref().and_then(|d| d.currency.clone()),
                    amount_display: d.as_ref().and_then(|d| d.amount_display_string.clone()),
                    comment: d.as_ref().and_then(|d| d.user_comment.clone()),
                    tier: d.as_ref().and_then(|d| d.tier),
                }
            }
            "superStickerEvent" => {
                let d = s.super_sticker_details;
                let meta = d.as_ref().and_then(|d| d.super_sticker_metadata.as_ref());
                ItemKind::SuperSticker {
                    amount_micros: d.as_ref().and_then(|d| d.amount_micros),
                    currency: d.as_ref().and_then(|d| d.currency.clone()),
                    amount_display: d.as_ref().and_then(|d| d.amount_display_string.clone()),
                    tier: d.as_ref().and_then(|d| d.tier),
                    sticker_id: meta.and_then(|m| m.sticker_id.clone()),
                    alt_text: meta.and_then(|m| m.alt_text.clone()),
                }
            }
            "newSponsorEvent" => {
                let d = s.new_sponsor_details;
                ItemKind::NewSponsor {
                    member_level: d.as_ref().and_then(|d| d.member_level_name.clone()),
                    is_upgrade: d.as_ref().and_then(|d| d.is_upgrade),
                }
            }
            "memberMilestoneChatEvent" => {
                let d = s.member_milestone_chat_details;
                ItemKind::MemberMilestone {
                    comment: d.as_ref().and_then(|d| d.user_comment.clone()),
                    member_month: d.as_ref().and_then(|d| d.member_month),
                    member_level: d.as_ref().and_then(|d| d.member_level_name.clone()),
                }
            }
            "membershipGiftingEvent" => {
                let d = s.membership_gifting_details;
                ItemKind::MembershipGifting {
                    gift_count: d.as_ref().and_then(|d| d.gift_memberships_count),
                    member_level: d.as_ref().and_then(|d| d.gift_memberships_level_name.clone()),
                }
            }
            "giftMembershipReceivedEvent" => ItemKind::GiftMembershipReceived {
                member_level: s
                    .gift_membership_received_details
                    .and_then(|d| d.member_level_name),
            },
            other => ItemKind::Other {
                type_name: other.to_string(),
            },
        }
    }
}

impl From<LiveChatMessage> for FeedItem {
    fn from(msg: LiveChatMessage) -> Self {
        let published_at = msg.snippet.published_at.as_deref().and_then(parse_published);
        let display_message = msg.snippet.display_message.clone();

        FeedItem {
            id: msg.id,
            published_at,
            author: msg.author_details.display_name,
            display_message,
            kind: msg.snippet.into(),
        }
    }
}

impl From<LiveChatMessageListResponse> for FeedPage {
    fn from(resp: LiveChatMessageListResponse) -> Self {
        FeedPage {
            items: resp.items.into_iter().map(FeedItem::from).collect(),
            polling_interval: resp.polling_interval_millis.map(Duration::from_millis),
            next_page_token: resp.next_page_token,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(json: &str) -> FeedItem {
        let msg: LiveChatMessage = serde_json::from_str(json).unwrap();
        msg.into()
    }

    #[test]
    fn parse_published_accepts_fractional_offset_form() {
        let ts = parse_published("2024-05-01T12:00:00.250+00:00").unwrap();
        assert_eq!(
            ts,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::TimeDelta::milliseconds(250)
        );
    }

    #[test]
    fn parse_published_rejects_garbage() {
        assert!(parse_published("yesterday").is_none());
    }

    #[test]
    fn text_message_maps_to_text_kind() {
        let item = message(
            r#"{
                "id": "m1",
                "snippet": {
                    "type": "textMessageEvent",
                    "publishedAt": "2024-05-01T12:00:00Z",
                    "displayMessage": "hello",
                    "textMessageDetails": { "messageText": "hello" }
                },
                "authorDetails": { "channelId": "c1", "displayName": "@viewer" }
            }"#,
        );

        assert_eq!(item.id, "m1");
        assert_eq!(item.author, "@viewer");
        assert_eq!(item.display_author(), "viewer");
        assert!(item.published_at.is_some());
        assert_eq!(
            item.kind,
            ItemKind::Text {
                message: "hello".into()
            }
        );
    }

    #[test]
    fn super_chat_accepts_string_encoded_micros() {
        let item = message(
            r#"{
                "id": "m2",
                "snippet": {
                    "type": "superChatEvent",
                    "publishedAt": "2024-05-01T12:00:00Z",
                    "superChatDetails": {
                        "amountMicros": "5000000",
                        "currency": "USD",
                        "amountDisplayString": "$5.00",
                        "userComment": "gg",
                        "tier": 2
                    }
                },
                "authorDetails": { "displayName": "fan" }
            }"#,
        );

        assert_eq!(
            item.kind,
            ItemKind::SuperChat {
                amount_micros: Some(5_000_000),
                currency: Some("USD".into()),
                amount_display: Some("$5.00".into()),
                comment: Some("gg".into()),
                tier: Some(2),
            }
        );
    }

    #[test]
    fn super_sticker_carries_metadata() {
        let item = message(
            r#"{
                "id": "m3",
                "snippet": {
                    "type": "superStickerEvent",
                    "superStickerDetails": {
                        "superStickerMetadata": { "stickerId": "st1", "altText": "wave" },
                        "amountMicros": 2000000,
                        "currency": "JPY",
                        "tier": 1
                    }
                }
            }"#,
        );

        match item.kind {
            ItemKind::SuperSticker {
                amount_micros,
                sticker_id,
                alt_text,
                amount_display,
                ..
            } => {
                assert_eq!(amount_micros, Some(2_000_000));
                assert_eq!(sticker_id.as_deref(), Some("st1"));
                assert_eq!(alt_text.as_deref(), Some("wave"));
                assert!(amount_display.is_none());
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert!(item.published_at.is_none(), "no publishedAt was sent");
    }

    #[test]
    fn milestone_and_sponsor_kinds_map_fields() {
        let milestone = message(
            r#"{
                "id": "m4",
                "snippet": {
                    "type": "memberMilestoneChatEvent",
                    "memberMilestoneChatDetails": {
                        "memberLevelName": "Gold",
                        "memberMonth": 12,
                        "userComment": "one year!"
                    }
                }
            }"#,
        );
        assert_eq!(
            milestone.kind,
            ItemKind::MemberMilestone {
                comment: Some("one year!".into()),
                member_month: Some(12),
                member_level: Some("Gold".into()),
            }
        );

        let sponsor = message(
            r#"{
                "id": "m5",
                "snippet": {
                    "type": "newSponsorEvent",
                    "newSponsorDetails": { "memberLevelName": "Silver", "isUpgrade": true }
                }
            }"#,
        );
        assert_eq!(
            sponsor.kind,
            ItemKind::NewSponsor {
                member_level: Some("Silver".into()),
                is_upgrade: Some(true),
            }
        );
    }

    #[test]
    fn paid_kind_without_details_keeps_kind_with_empty_fields() {
        let item = message(r#"{ "id": "m6", "snippet": { "type": "newSponsorEvent" } }"#);
        assert_eq!(
            item.kind,
            ItemKind::NewSponsor {
                member_level: None,
                is_upgrade: None,
            }
        );
    }

    #[test]
    fn unknown_type_maps_to_other() {
        let item = message(r#"{ "id": "m7", "snippet": { "type": "tombstone" } }"#);
        assert_eq!(
            item.kind,
            ItemKind::Other {
                type_name: "tombstone".into()
            }
        );
    }

    #[test]
    fn list_response_converts_interval_and_cursor() {
        let resp: LiveChatMessageListResponse = serde_json::from_str(
            r#"{ "items": [], "pollingIntervalMillis": 3000, "nextPageToken": "tok", "kind": "x" }"#,
        )
        .unwrap();
        let page: FeedPage = resp.into();

        assert!(page.items.is_empty());
        assert_eq!(page.polling_interval, Some(Duration::from_millis(3000)));
        assert_eq!(page.next_page_token.as_deref(), Some("tok"));
    }

    #[test]
    fn video_list_without_live_details_has_no_chat() {
        let resp: VideoListResponse =
            serde_json::from_str(r#"{ "items": [ { "id": "v" } ] }"#).unwrap();
        assert!(resp.active_live_chat_id().is_none());

        let empty: VideoListResponse = serde_json::from_str(r#"{ "items": [] }"#).unwrap();
        assert!(empty.active_live_chat_id().is_none());
    }
}

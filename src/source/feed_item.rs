//! The core data type produced by every feed client.
//!
//! `FeedItem` represents a single live chat entry.  Clients convert their
//! native wire format into `FeedItem`s so that the poller, the scheduler and
//! the host can stay origin-agnostic.
//!
//! ## For contributors
//!
//! Message types that carry money or membership state are modelled as
//! variants of [`ItemKind`] rather than optional fields on `FeedItem`.  If the
//! origin grows a new event type, add a variant here and map it in
//! `source/model.rs`; unknown types already land in [`ItemKind::Other`].

use chrono::{DateTime, Utc};

/// Marker the origin prepends to handles (`@name`).
const AUTHOR_PREFIX: char = '@';

/// A single, immutable chat entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Unique identifier within one feed's lifetime.
    pub id: String,

    /// Origin-side publish instant.
    ///
    /// `None` when the origin sent no timestamp or one that failed to parse;
    /// the scheduler substitutes the batch maximum for such items.
    pub published_at: Option<DateTime<Utc>>,

    /// Author display name as sent by the origin, prefix included.
    pub author: String,

    /// Pre-rendered message text, when the origin provides one.
    pub display_message: Option<String>,

    /// What kind of entry this is, with its kind-specific payload.
    pub kind: ItemKind,
}

/// The closed set of entry kinds and the fields each one carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Plain chat message.
    Text { message: String },

    /// Paid message.
    SuperChat {
        amount_micros: Option<u64>,
        currency: Option<String>,
        amount_display: Option<String>,
        comment: Option<String>,
        tier: Option<u32>,
    },

    /// Paid sticker.
    SuperSticker {
        amount_micros: Option<u64>,
        currency: Option<String>,
        amount_display: Option<String>,
        tier: Option<u32>,
        sticker_id: Option<String>,
        alt_text: Option<String>,
    },

    /// A viewer became a member (or upgraded).
    NewSponsor {
        member_level: Option<String>,
        is_upgrade: Option<bool>,
    },

    /// A member announced a membership anniversary.
    MemberMilestone {
        comment: Option<String>,
        member_month: Option<u32>,
        member_level: Option<String>,
    },

    /// A viewer gifted memberships to others.
    MembershipGifting {
        gift_count: Option<u32>,
        member_level: Option<String>,
    },

    /// A viewer received a gifted membership.
    GiftMembershipReceived { member_level: Option<String> },

    /// Any origin type we do not model (tombstones, polls, bans, ...).
    Other { type_name: String },
}

impl FeedItem {
    /// Author name with the origin's handle marker removed.
    pub fn display_author(&self) -> &str {
        self.author
            .strip_prefix(AUTHOR_PREFIX)
            .unwrap_or(&self.author)
    }

    /// Best text to show for this item.
    ///
    /// Prefers the origin's pre-rendered message, then the kind's own text,
    /// and falls back to an empty string.
    pub fn text(&self) -> &str {
        if let Some(msg) = self.display_message.as_deref() {
            return msg;
        }
        match &self.kind {
            ItemKind::Text { message } => message,
            ItemKind::SuperChat { comment, .. } | ItemKind::MemberMilestone { comment, .. } => {
                comment.as_deref().unwrap_or("")
            }
            _ => "",
        }
    }
}

impl ItemKind {
    /// Short, stable name of the kind (used in logs and the UI).
    pub fn label(&self) -> &str {
        match self {
            ItemKind::Text { .. } => "chat",
            ItemKind::SuperChat { .. } => "superchat",
            ItemKind::SuperSticker { .. } => "supersticker",
            ItemKind::NewSponsor { .. } => "new-sponsor",
            ItemKind::MemberMilestone { .. } => "milestone",
            ItemKind::MembershipGifting { .. } => "gifting",
            ItemKind::GiftMembershipReceived { .. } => "gift-received",
            ItemKind::Other { type_name } => type_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Shorthand constructor for tests.
    fn make_item(author: &str, display: Option<&str>, kind: ItemKind) -> FeedItem {
        FeedItem {
            id: "id".to_string(),
            published_at: None,
            author: author.to_string(),
            display_message: display.map(String::from),
            kind,
        }
    }

    fn text(message: &str) -> ItemKind {
        ItemKind::Text {
            message: message.to_string(),
        }
    }

    #[test]
    fn display_author_strips_single_marker() {
        let item = make_item("@viewer", None, text("hi"));
        assert_eq!(item.display_author(), "viewer");
    }

    #[test]
    fn display_author_keeps_plain_names() {
        let item = make_item("viewer", None, text("hi"));
        assert_eq!(item.display_author(), "viewer");
    }

    #[test]
    fn display_author_strips_only_one_marker() {
        let item = make_item("@@double", None, text("hi"));
        assert_eq!(item.display_author(), "@double");
    }

    #[test]
    fn text_prefers_display_message() {
        let item = make_item("a", Some("rendered"), text("raw"));
        assert_eq!(item.text(), "rendered");
    }

    #[test]
    fn text_falls_back_to_kind_payload() {
        let item = make_item("a", None, text("raw"));
        assert_eq!(item.text(), "raw");

        let sc = make_item(
            "a",
            None,
            ItemKind::SuperChat {
                amount_micros: Some(1_000_000),
                currency: Some("USD".into()),
                amount_display: Some("$1.00".into()),
                comment: Some("thanks".into()),
                tier: Some(1),
            },
        );
        assert_eq!(sc.text(), "thanks");
    }

    #[test]
    fn text_is_empty_for_payload_only_kinds() {
        let item = make_item(
            "a",
            None,
            ItemKind::NewSponsor {
                member_level: None,
                is_upgrade: None,
            },
        );
        assert_eq!(item.text(), "");
    }

    #[test]
    fn other_kind_label_is_origin_type() {
        let kind = ItemKind::Other {
            type_name: "tombstone".into(),
        };
        assert_eq!(kind.label(), "tombstone");
    }
}

//! Mapping released items to downstream actions.
//!
//! The host keeps an [`EventMap`] from [`EventType`] to an action name.  When
//! the sink receives an [`Emission`] whose kind has a registered action,
//! [`EventMap::command_for`] renders a command line of the form
//!
//! ```text
//! function <action> {author:"name",message:"hi",amount:5000000}
//! ```
//!
//! with string values quoted and escaped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schedule::Emission;
use crate::source::ItemKind;

/// Kinds that can trigger an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Chat,
    Superchat,
    Supersticker,
    NewSponsor,
    MemberMilestone,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::Chat,
        EventType::Superchat,
        EventType::Supersticker,
        EventType::NewSponsor,
        EventType::MemberMilestone,
    ];

    /// The event a feed item kind triggers, if any.
    pub fn for_kind(kind: &ItemKind) -> Option<EventType> {
        match kind {
            ItemKind::Text { .. } => Some(EventType::Chat),
            ItemKind::SuperChat { .. } => Some(EventType::Superchat),
            ItemKind::SuperSticker { .. } => Some(EventType::Supersticker),
            ItemKind::NewSponsor { .. } => Some(EventType::NewSponsor),
            ItemKind::MemberMilestone { .. } => Some(EventType::MemberMilestone),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Chat => "CHAT",
            EventType::Superchat => "SUPERCHAT",
            EventType::Supersticker => "SUPERSTICKER",
            EventType::NewSponsor => "NEW_SPONSOR",
            EventType::MemberMilestone => "MEMBER_MILESTONE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unknown event type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type '{0}'")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// A value in a rendered command's argument list.
#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Str(String),
    Int(u64),
    Bool(bool),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => write!(f, "\"{}\"", escape(s)),
            Arg::Int(n) => write!(f, "{n}"),
            Arg::Bool(b) => write!(f, "{b}"),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn text(value: &Option<String>) -> Arg {
    Arg::Str(value.clone().unwrap_or_default())
}

/// Host-owned registry of kind → action name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMap(BTreeMap<EventType, String>);

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` for `event`, returning the previous action.
    pub fn register(&mut self, event: EventType, action: impl Into<String>) -> Option<String> {
        self.0.insert(event, action.into())
    }

    /// Remove the action for `event`, returning it.
    pub fn clear(&mut self, event: EventType) -> Option<String> {
        self.0.remove(&event)
    }

    pub fn get(&self, event: EventType) -> Option<&str> {
        self.0.get(&event).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventType, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Command to run for `emission`, if its kind has a registered action.
    pub fn command_for(&self, emission: &Emission) -> Option<String> {
        let event = EventType::for_kind(&emission.kind)?;
        let action = self.get(event)?;
        let args = arguments(emission);

        let rendered: Vec<String> = args.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        Some(format!("function {action} {{{}}}", rendered.join(",")))
    }
}

/// Argument list for an emission, keyed the way actions expect them.
fn arguments(emission: &Emission) -> Vec<(&'static str, Arg)> {
    let author = ("author", Arg::Str(emission.author.clone()));

    match &emission.kind {
        ItemKind::Text { .. } => vec![author, ("message", Arg::Str(emission.text.clone()))],
        ItemKind::SuperChat {
            amount_micros,
            currency,
            amount_display,
            comment,
            tier,
        } => vec![
            author,
            ("message", text(comment)),
            ("amount", Arg::Int(amount_micros.unwrap_or(0))),
            ("currency", text(currency)),
            ("displayAmount", text(amount_display)),
            ("tier", Arg::Int(tier.unwrap_or(0).into())),
        ],
        ItemKind::SuperSticker {
            amount_micros,
            currency,
            amount_display,
            tier,
            sticker_id,
            alt_text,
        } => vec![
            author,
            ("amount", Arg::Int(amount_micros.unwrap_or(0))),
            ("currency", text(currency)),
            ("displayAmount", text(amount_display)),
            ("tier", Arg::Int(tier.unwrap_or(0).into())),
            ("stickerId", text(sticker_id)),
            ("altText", text(alt_text)),
        ],
        ItemKind::NewSponsor {
            member_level,
            is_upgrade,
        } => vec![
            author,
            ("isUpgrade", Arg::Bool(is_upgrade.unwrap_or(false))),
            ("memberLevel", text(member_level)),
        ],
        ItemKind::MemberMilestone {
            comment,
            member_month,
            member_level,
        } => vec![
            author,
            ("message", text(comment)),
            ("memberMonth", Arg::Int(member_month.unwrap_or(0).into())),
            ("memberLevel", text(member_level)),
        ],
        _ => vec![author],
    }
}

/// Render a chat line from a `%author%` / `%message%` template.
pub fn format_chat(template: &str, author: &str, message: &str) -> String {
    template
        .replace("%author%", author)
        .replace("%message%", message)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn emission(kind: ItemKind, text: &str) -> Emission {
        Emission {
            id: "id".into(),
            author: "viewer".into(),
            text: text.into(),
            kind,
            display_at: Utc::now(),
        }
    }

    #[test]
    fn parses_event_names_loosely() {
        assert_eq!("chat".parse::<EventType>(), Ok(EventType::Chat));
        assert_eq!("new-sponsor".parse::<EventType>(), Ok(EventType::NewSponsor));
        assert_eq!(" MEMBER_MILESTONE ".parse::<EventType>(), Ok(EventType::MemberMilestone));
        assert!("donation".parse::<EventType>().is_err());
    }

    #[test]
    fn unmapped_kinds_trigger_nothing() {
        let kind = ItemKind::Other {
            type_name: "tombstone".into(),
        };
        assert!(EventType::for_kind(&kind).is_none());

        let mut map = EventMap::new();
        map.register(EventType::Chat, "stream:chat");
        assert!(map.command_for(&emission(kind, "")).is_none());
    }

    #[test]
    fn unregistered_event_renders_no_command() {
        let map = EventMap::new();
        let e = emission(ItemKind::Text { message: "hi".into() }, "hi");
        assert!(map.command_for(&e).is_none());
    }

    #[test]
    fn chat_command_escapes_strings() {
        let mut map = EventMap::new();
        map.register(EventType::Chat, "stream:chat");
        let e = emission(
            ItemKind::Text {
                message: "say \"hi\" \\o/".into(),
            },
            "say \"hi\" \\o/",
        );

        assert_eq!(
            map.command_for(&e).unwrap(),
            r#"function stream:chat {author:"viewer",message:"say \"hi\" \\o/"}"#
        );
    }

    #[test]
    fn superchat_command_carries_amounts() {
        let mut map = EventMap::new();
        map.register(EventType::Superchat, "stream:donation");
        let e = emission(
            ItemKind::SuperChat {
                amount_micros: Some(5_000_000),
                currency: Some("USD".into()),
                amount_display: Some("$5.00".into()),
                comment: None,
                tier: Some(2),
            },
            "",
        );

        assert_eq!(
            map.command_for(&e).unwrap(),
            r#"function stream:donation {author:"viewer",message:"",amount:5000000,currency:"USD",displayAmount:"$5.00",tier:2}"#
        );
    }

    #[test]
    fn sponsor_command_defaults_missing_fields() {
        let mut map = EventMap::new();
        map.register(EventType::NewSponsor, "stream:member");
        let e = emission(
            ItemKind::NewSponsor {
                member_level: None,
                is_upgrade: None,
            },
            "",
        );

        assert_eq!(
            map.command_for(&e).unwrap(),
            r#"function stream:member {author:"viewer",isUpgrade:false,memberLevel:""}"#
        );
    }

    #[test]
    fn register_and_clear_report_previous_action() {
        let mut map = EventMap::new();
        assert_eq!(map.register(EventType::Chat, "a"), None);
        assert_eq!(map.register(EventType::Chat, "b").as_deref(), Some("a"));
        assert_eq!(map.get(EventType::Chat), Some("b"));
        assert_eq!(map.clear(EventType::Chat).as_deref(), Some("b"));
        assert!(map.is_empty());
    }

    #[test]
    fn event_map_serializes_as_named_keys() {
        let mut map = EventMap::new();
        map.register(EventType::MemberMilestone, "stream:milestone");

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"MEMBER_MILESTONE":"stream:milestone"}"#);
        assert_eq!(serde_json::from_str::<EventMap>(&json).unwrap(), map);
    }

    #[test]
    fn format_chat_fills_placeholders() {
        assert_eq!(format_chat("%author%: %message%", "viewer", "hello"), "viewer: hello");
        assert_eq!(format_chat("[chat] %message%", "viewer", "hi"), "[chat] hi");
    }
}

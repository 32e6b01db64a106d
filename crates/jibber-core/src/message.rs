//! Inbound message types.
//!
//! The transport collaborator converts every stanza it receives into a
//! [`Message`] record and hands it to the dispatcher wrapped in an
//! [`InboundEvent`]. Handlers receive the same record, along with the
//! [`Match`] produced by the trigger that selected them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Message Kind
// ============================================================================

/// The XMPP message type attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A message sent to a multi-user chat room.
    Groupchat,
    /// A one-to-one (direct) message.
    Chat,
    /// A message with no particular type; the XMPP default.
    #[default]
    Normal,
    /// A headline (alert) message.
    Headline,
    /// An error bounce.
    Error,
}

impl MessageKind {
    /// Returns the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groupchat => "groupchat",
            Self::Chat => "chat",
            Self::Normal => "normal",
            Self::Headline => "headline",
            Self::Error => "error",
        }
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "groupchat" => Ok(Self::Groupchat),
            "chat" => Ok(Self::Chat),
            "normal" => Ok(Self::Normal),
            "headline" => Ok(Self::Headline),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown message type '{other}'")),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message
// ============================================================================

/// An inbound message as delivered by the transport.
///
/// Field names accept the sleekxmpp-style keys (`mucnick`, `mucroom`,
/// `type`) so that recorded stanzas can be replayed from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the sender inside the room.
    #[serde(default, alias = "mucnick")]
    pub nick: String,

    /// Full address of the sender (`room@service/nick` or `user@host/resource`).
    #[serde(default)]
    pub from: String,

    /// Bare address of the room the message was sent to.
    #[serde(default, alias = "mucroom")]
    pub room: String,

    /// The message text.
    #[serde(default)]
    pub body: String,

    /// The message type.
    #[serde(default, rename = "type")]
    pub kind: MessageKind,

    /// Any other stanza fields the transport chose to expose.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Creates a groupchat message from `nick` in `room`.
    pub fn groupchat(room: impl Into<String>, nick: impl Into<String>, body: impl Into<String>) -> Self {
        let room = room.into();
        let nick = nick.into();
        Self {
            from: format!("{room}/{nick}"),
            nick,
            room,
            body: body.into(),
            kind: MessageKind::Groupchat,
            extra: Map::new(),
        }
    }

    /// Creates a direct message from the full address `from`.
    pub fn chat(from: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            body: body.into(),
            kind: MessageKind::Chat,
            ..Default::default()
        }
    }

    /// Returns true for messages sent to a room.
    pub fn is_groupchat(&self) -> bool {
        self.kind == MessageKind::Groupchat
    }

    /// Returns true for direct messages.
    pub fn is_chat(&self) -> bool {
        self.kind == MessageKind::Chat
    }

    /// Looks up a transport-specific field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

// ============================================================================
// Inbound Event
// ============================================================================

/// An event delivered by the transport to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A chat message of any type.
    Message(Message),
    /// A protocol-level event (presence changes, session start, ...) under
    /// its transport-defined name.
    Raw {
        /// Transport event name, e.g. `presence_unavailable`.
        name: String,
        /// The stanza, flattened into a message record.
        message: Message,
    },
    /// The bot's display name changed.
    NicknameChanged(String),
}

impl InboundEvent {
    /// Returns a short name suitable for logging.
    pub fn event_name(&self) -> &str {
        match self {
            Self::Message(m) if m.is_groupchat() => "groupchat_message",
            Self::Message(_) => "message",
            Self::Raw { name, .. } => name,
            Self::NicknameChanged(_) => "nickname_changed",
        }
    }
}

// ============================================================================
// Match
// ============================================================================

/// The owned result of a successful trigger search.
///
/// Group 0 is the whole match; groups that did not participate are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Match {
    groups: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl Match {
    /// Builds a match from regex captures.
    pub fn from_captures(regex: &Regex, captures: &Captures<'_>) -> Self {
        let groups = captures
            .iter()
            .map(|g| g.map(|m| m.as_str().to_string()))
            .collect();
        let named = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect();
        Self { groups, named }
    }

    /// Searches `haystack` with `regex`, returning the first match.
    pub fn search(regex: &Regex, haystack: &str) -> Option<Self> {
        regex
            .captures(haystack)
            .map(|caps| Self::from_captures(regex, &caps))
    }

    /// The full matched text.
    pub fn as_str(&self) -> &str {
        self.group(0).unwrap_or_default()
    }

    /// Returns capture group `index`, if it participated in the match.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Returns the capture groups after the whole match.
    pub fn groups(&self) -> impl Iterator<Item = Option<&str>> {
        self.groups.iter().skip(1).map(|g| g.as_deref())
    }

    /// Returns a named capture group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_sleekxmpp_keys() {
        let msg: Message = serde_json::from_value(json!({
            "mucnick": "alice",
            "mucroom": "room@chat.example.com",
            "body": "bot: hi",
            "type": "groupchat",
            "lang": "en",
        }))
        .unwrap();

        assert_eq!(msg.nick, "alice");
        assert_eq!(msg.room, "room@chat.example.com");
        assert!(msg.is_groupchat());
        assert_eq!(msg.get("lang"), Some(&json!("en")));
    }

    #[test]
    fn test_groupchat_builder_sets_full_address() {
        let msg = Message::groupchat("room@chat.example.com", "alice", "hello");
        assert_eq!(msg.from, "room@chat.example.com/alice");
        assert_eq!(msg.kind, MessageKind::Groupchat);
    }

    #[test]
    fn test_match_groups() {
        let regex = Regex::new(r"^go (?P<what>\w+)(?: (later))?").unwrap();
        let m = Match::search(&regex, "go home now").unwrap();

        assert_eq!(m.as_str(), "go home");
        assert_eq!(m.group(1), Some("home"));
        assert_eq!(m.name("what"), Some("home"));
        assert_eq!(m.groups().collect::<Vec<_>>(), vec![Some("home"), None]);
        assert!(Match::search(&regex, "stay").is_none());
    }

    #[test]
    fn test_message_kind_parse() {
        assert_eq!("GroupChat".parse::<MessageKind>(), Ok(MessageKind::Groupchat));
        assert!("presence".parse::<MessageKind>().is_err());
    }
}

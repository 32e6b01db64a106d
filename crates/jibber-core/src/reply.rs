//! Handler replies and outbound messages.
//!
//! A handler answers with a [`Reply`]. The dispatcher merges it with the
//! [`SendDefaults`] of the call site (the room a command came from, the
//! sender of a private message, the target configured for a timer) and the
//! normalizer turns the result into zero or more [`OutboundMessage`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::MessageKind;

// ============================================================================
// Reply
// ============================================================================

/// The value returned by a handler method.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Reply {
    /// Nothing to say.
    #[default]
    None,
    /// A body sent to the call site's default target.
    Text(String),
    /// A reply object whose fields override the call site's defaults.
    Targeted(ReplyFields),
    /// Several replies, sent in order. `Reply::None` entries are skipped.
    Batch(Vec<Reply>),
}

impl Reply {
    /// Creates a text reply.
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    /// Creates a reply addressed to `target`.
    pub fn to(target: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Targeted(ReplyFields::new(body).target(target))
    }

    /// Returns true when the reply carries nothing.
    ///
    /// An empty string or an empty batch counts as empty; a batch holding only
    /// `None` entries does not.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Text(body) => body.is_empty(),
            Self::Targeted(_) => false,
            Self::Batch(replies) => replies.is_empty(),
        }
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Self::Text(body)
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Self::Text(body.to_string())
    }
}

impl From<ReplyFields> for Reply {
    fn from(fields: ReplyFields) -> Self {
        Self::Targeted(fields)
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl<T: Into<Reply>> From<Vec<T>> for Reply {
    fn from(replies: Vec<T>) -> Self {
        Self::Batch(replies.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Reply Fields
// ============================================================================

/// An associative reply object.
///
/// Every field is optional; unset fields fall back to the call site's
/// [`SendDefaults`]. The legacy keys `raw`, `mto`, `mhtml` and `mtype` are
/// accepted when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyFields {
    /// The plain-text body, or markup to be detected.
    #[serde(default, alias = "raw", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// The destination address.
    #[serde(default, alias = "mto", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Explicit markup companion; disables markup detection on the body.
    #[serde(default, alias = "mhtml", skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// The message type.
    #[serde(default, alias = "mtype", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,

    /// Additional transport arguments.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl ReplyFields {
    /// Creates a reply object with a body.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }

    /// Sets the destination.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets an explicit markup companion.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Sets the message type.
    pub fn kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Adds a transport argument.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Send Defaults
// ============================================================================

/// Caller-supplied send arguments.
///
/// Timer groups in the configuration carry these as their shared keyword
/// arguments (`mto`, `mtype`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendDefaults {
    /// Default destination.
    #[serde(default, alias = "mto", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Default message type.
    #[serde(default, alias = "mtype", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,

    /// Additional transport arguments.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl SendDefaults {
    /// Defaults for answering into `room`.
    pub fn groupchat(room: impl Into<String>) -> Self {
        Self {
            target: Some(room.into()),
            kind: Some(MessageKind::Groupchat),
            extra: Map::new(),
        }
    }

    /// Defaults for answering a direct message from `from`.
    pub fn chat(from: impl Into<String>) -> Self {
        Self {
            target: Some(from.into()),
            kind: Some(MessageKind::Chat),
            extra: Map::new(),
        }
    }

    /// Overlays a reply object on these defaults.
    pub fn merge(&self, fields: ReplyFields) -> ReplyFields {
        let mut extra = self.extra.clone();
        extra.extend(fields.extra);
        ReplyFields {
            body: fields.body,
            target: fields.target.or_else(|| self.target.clone()),
            html: fields.html,
            kind: fields.kind.or(self.kind),
            extra,
        }
    }
}

// ============================================================================
// Outbound Message
// ============================================================================

/// A fully resolved send instruction handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Destination address.
    pub target: String,

    /// Plain-text body.
    pub body: String,

    /// Well-formed markup companion, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Message type.
    #[serde(default)]
    pub kind: MessageKind,

    /// Additional transport arguments.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl OutboundMessage {
    /// Creates a plain message.
    pub fn new(target: impl Into<String>, body: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            target: target.into(),
            body: body.into(),
            html: None,
            kind,
            extra: Map::new(),
        }
    }
}

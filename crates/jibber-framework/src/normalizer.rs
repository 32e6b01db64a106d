//! Reply Normalizer.
//!
//! Turns a handler's [`Reply`] into the [`OutboundMessage`]s handed to the
//! transport. Nothing here fails: entries that cannot be sent are logged and
//! dropped, and their siblings are still sent.

use jibber_core::markup::{self, looks_like_markup, strip_tags};
use jibber_core::{OutboundMessage, Reply, ReplyFields, SendDefaults};
use tracing::{error, warn};

/// Normalizes `reply` against the call site's `defaults`.
pub fn normalize(reply: Reply, defaults: &SendDefaults) -> Vec<OutboundMessage> {
    match reply {
        Reply::None => Vec::new(),
        Reply::Text(body) => resolve(defaults.merge(ReplyFields::new(body)))
            .into_iter()
            .collect(),
        Reply::Targeted(fields) => resolve(defaults.merge(fields)).into_iter().collect(),
        Reply::Batch(entries) => entries
            .into_iter()
            .filter_map(|entry| match entry {
                Reply::None => None,
                Reply::Targeted(fields) => resolve(defaults.merge(fields)),
                other => {
                    error!(entry = ?other, "Batch entries must be reply objects or None; skipped");
                    None
                }
            })
            .collect(),
    }
}

/// Resolves one merged reply object into a send instruction.
///
/// Returns `None` if no body or no target is known.
pub fn resolve(fields: ReplyFields) -> Option<OutboundMessage> {
    let Some(body) = fields.body else {
        error!(to = ?fields.target, "Reply has no body; not sent");
        return None;
    };
    let Some(target) = fields.target else {
        error!(body = %body, "Reply has no target; not sent");
        return None;
    };

    let (body, html) = match fields.html {
        Some(html) => match markup::validate(&html) {
            Ok(_) => (body, Some(html)),
            Err(e) => {
                warn!(html = %html, error = %e, "Dropping malformed markup");
                (body, None)
            }
        },
        None if looks_like_markup(&body) => match markup::validate(&body) {
            Ok(_) => (strip_tags(&body), Some(body)),
            Err(e) => {
                warn!(body = %body, error = %e, "Body looks like markup but is malformed; sending as text");
                (body, None)
            }
        },
        None => (body, None),
    };

    Some(OutboundMessage {
        target,
        body,
        html,
        kind: fields.kind.unwrap_or_default(),
        extra: fields.extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jibber_core::MessageKind;

    fn room() -> SendDefaults {
        SendDefaults::groupchat("room@chat.example.com")
    }

    #[test]
    fn test_text_uses_defaults() {
        let sent = normalize(Reply::text("hello"), &room());
        assert_eq!(
            sent,
            vec![OutboundMessage::new(
                "room@chat.example.com",
                "hello",
                MessageKind::Groupchat
            )]
        );
        assert!(normalize(Reply::None, &room()).is_empty());
    }

    #[test]
    fn test_markup_body() {
        let sent = normalize(Reply::text("<p>Hello</p>"), &room());
        assert_eq!(sent[0].body, "Hello");
        assert_eq!(sent[0].html.as_deref(), Some("<p>Hello</p>"));

        let sent = normalize(Reply::text("<p>Hello"), &room());
        assert_eq!(sent[0].body, "<p>Hello");
        assert_eq!(sent[0].html, None);
    }

    #[test]
    fn test_explicit_html_is_validated() {
        let fields = ReplyFields::new("Hello").html("<p>Hello</p>");
        let sent = normalize(Reply::Targeted(fields), &room());
        assert_eq!(sent[0].html.as_deref(), Some("<p>Hello</p>"));

        let fields = ReplyFields::new("<p>raw</p>").html("<p>broken");
        let sent = normalize(Reply::Targeted(fields), &room());
        assert_eq!(sent[0].body, "<p>raw</p>");
        assert_eq!(sent[0].html, None);
    }

    #[test]
    fn test_batch_skips_none_and_keeps_order() {
        let reply = Reply::Batch(vec![
            Reply::to("a@example.com", "one"),
            Reply::None,
            Reply::text("not an object"),
            Reply::to("b@example.com", "two"),
        ]);
        let sent = normalize(reply, &room());
        let targets: Vec<_> = sent.iter().map(|m| m.target.as_str()).collect();
        assert_eq!(targets, vec!["a@example.com", "b@example.com"]);
        assert!(sent.iter().all(|m| m.kind == MessageKind::Groupchat));
    }

    #[test]
    fn test_missing_target_is_dropped() {
        let sent = normalize(Reply::text("hello"), &SendDefaults::default());
        assert!(sent.is_empty());
    }
}

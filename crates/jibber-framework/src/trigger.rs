//! Trigger Table.
//!
//! Patterns may contain the `%(nickname)s` placeholder, so they are stored
//! raw and rendered against the nickname current at evaluation time. The
//! compiled regex is cached until the nickname changes.

use std::fmt;

use jibber_core::Match;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::{SetupError, SetupResult};

/// Placeholder replaced by the bot's display name.
pub const NICKNAME_PLACEHOLDER: &str = "%(nickname)s";

/// Substitutes the nickname into a raw pattern.
///
/// `%%` collapses to a literal `%`. The nickname is inserted verbatim, so
/// regex metacharacters in it keep their meaning.
pub fn render(pattern: &str, nickname: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + nickname.len());
    let mut rest = pattern;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(NICKNAME_PLACEHOLDER) {
            out.push_str(nickname);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%%") {
            out.push('%');
            rest = after;
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

// ============================================================================
// Trigger
// ============================================================================

/// A raw trigger pattern with a per-nickname compile cache.
pub struct Trigger {
    pattern: String,
    cache: Mutex<Option<(String, Regex)>>,
}

impl Trigger {
    /// Wraps a raw pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            cache: Mutex::new(None),
        }
    }

    /// The raw pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Renders and compiles the pattern case-insensitively.
    pub fn compile(&self, nickname: &str) -> Result<Regex, regex::Error> {
        let mut cache = self.cache.lock();
        if let Some((cached_nick, regex)) = cache.as_ref()
            && cached_nick == nickname
        {
            return Ok(regex.clone());
        }
        let regex = RegexBuilder::new(&render(&self.pattern, nickname))
            .case_insensitive(true)
            .build()?;
        *cache = Some((nickname.to_string(), regex.clone()));
        Ok(regex)
    }

    /// Searches `body`; a pattern that no longer compiles never matches.
    pub fn search(&self, nickname: &str, body: &str) -> Option<Match> {
        match self.compile(nickname) {
            Ok(regex) => Match::search(&regex, body),
            Err(e) => {
                tracing::warn!(pattern = %self.pattern, nickname, error = %e, "Trigger does not compile");
                None
            }
        }
    }
}

impl Clone for Trigger {
    fn clone(&self) -> Self {
        Self::new(self.pattern.clone())
    }
}

impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Trigger {}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Trigger").field(&self.pattern).finish()
    }
}

// ============================================================================
// Table
// ============================================================================

/// A trigger bound to a handler method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEntry {
    /// The pattern.
    pub trigger: Trigger,
    /// Handler alias.
    pub alias: String,
    /// Method name.
    pub method: String,
}

impl TriggerEntry {
    /// Creates an entry.
    pub fn new(pattern: impl Into<String>, alias: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            trigger: Trigger::new(pattern),
            alias: alias.into(),
            method: method.into(),
        }
    }
}

/// A handler method without a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Handler alias.
    pub alias: String,
    /// Method name.
    pub method: String,
}

impl MethodRef {
    /// Creates a method reference.
    pub fn new(alias: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            method: method.into(),
        }
    }
}

/// The ordered dispatch tables of one configuration generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerTable {
    /// Groupchat commands.
    pub commands: Vec<TriggerEntry>,
    /// Direct-message commands.
    pub private_commands: Vec<TriggerEntry>,
    /// Commentary triggers.
    pub commentators: Vec<TriggerEntry>,
    /// Unconditional groupchat observers.
    pub listeners: Vec<MethodRef>,
    /// Transport event name to subscribed methods.
    pub raw_handlers: Vec<(String, MethodRef)>,
}

impl TriggerTable {
    /// Drops everything wired to `alias`.
    pub fn remove_alias(&mut self, alias: &str) {
        self.commands.retain(|e| e.alias != alias);
        self.private_commands.retain(|e| e.alias != alias);
        self.commentators.retain(|e| e.alias != alias);
        self.listeners.retain(|m| m.alias != alias);
        self.raw_handlers.retain(|(_, m)| m.alias != alias);
    }

    /// Methods subscribed to `event`, in registration order.
    pub fn raw_subscribers<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a MethodRef> + 'a {
        self.raw_handlers
            .iter()
            .filter(move |(name, _)| name == event)
            .map(|(_, m)| m)
    }

    /// Total number of wired entries.
    pub fn len(&self) -> usize {
        self.commands.len()
            + self.private_commands.len()
            + self.commentators.len()
            + self.listeners.len()
            + self.raw_handlers.len()
    }

    /// Returns true if nothing is wired.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validates a raw `[pattern, method]` entry.
///
/// The pattern must compile once rendered against `nickname`.
pub fn parse_trigger(entry: &Value, nickname: &str) -> SetupResult<(String, String)> {
    let malformed = || SetupError::MalformedTrigger {
        entry: entry.to_string(),
    };
    let (pattern, method) = match entry.as_array().map(Vec::as_slice) {
        Some([Value::String(pattern), Value::String(method)]) => (pattern, method),
        _ => return Err(malformed()),
    };
    RegexBuilder::new(&render(pattern, nickname))
        .case_insensitive(true)
        .build()
        .map_err(|e| SetupError::InvalidPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
    Ok((pattern.clone(), method.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        assert_eq!(render("^%(nickname)s: hi", "bot"), "^bot: hi");
        assert_eq!(render("100%% sure", "bot"), "100% sure");
        assert_eq!(render("50% off", "bot"), "50% off");
        assert_eq!(render("%(nickname)s%(nickname)s", "a"), "aa");
    }

    #[test]
    fn test_search_follows_nickname() {
        let trigger = Trigger::new("^%(nickname)s: hi");

        assert!(trigger.search("bot", "BOT: hi there").is_some());
        assert!(trigger.search("bot", "other: hi").is_none());
        assert!(trigger.search("other", "other: hi").is_some());
        assert!(trigger.search("other", "bot: hi").is_none());
    }

    #[test]
    fn test_parse_trigger() {
        assert_eq!(
            parse_trigger(&json!(["^hi", "greet"]), "bot").unwrap(),
            ("^hi".to_string(), "greet".to_string())
        );
        assert!(matches!(
            parse_trigger(&json!("^hi"), "bot"),
            Err(SetupError::MalformedTrigger { .. })
        ));
        assert!(matches!(
            parse_trigger(&json!(["^hi", "greet", "extra"]), "bot"),
            Err(SetupError::MalformedTrigger { .. })
        ));
        assert!(matches!(
            parse_trigger(&json!(["^(unclosed", "greet"]), "bot"),
            Err(SetupError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_remove_alias() {
        let mut table = TriggerTable::default();
        table.commands.push(TriggerEntry::new("^a", "one", "a"));
        table.commands.push(TriggerEntry::new("^b", "two", "b"));
        table.listeners.push(MethodRef::new("one", "log"));
        table
            .raw_handlers
            .push(("presence_unavailable".into(), MethodRef::new("one", "gone")));

        table.remove_alias("one");
        assert_eq!(table.len(), 1);
        assert_eq!(table.commands[0].alias, "two");
        assert_eq!(table.raw_subscribers("presence_unavailable").count(), 0);
    }
}

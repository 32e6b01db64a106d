//! Declarative client configuration.
//!
//! These types mirror the `packages` document the original JSON
//! configuration uses, so existing files deserialize without changes:
//!
//! ```json
//! {
//!     "package": "bot.Fortune",
//!     "alias": "fortune",
//!     "kwargs": {"fortune_file": "/usr/share/games/fortunes"},
//!     "commands": [["^%(nickname)s: fortune", "fortune"]],
//!     "timers": [{
//!         "schedule": [{"seconds": [600, 1200], "method": "fortune"}],
//!         "mto": "room@chat.example.com",
//!         "mtype": "groupchat"
//!     }]
//! }
//! ```
//!
//! Trigger pairs and delay values are kept as raw JSON and validated entry by
//! entry when the dispatcher state is built, so one malformed entry does not
//! reject the whole document.

use std::collections::BTreeMap;

use jibber_core::SendDefaults;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_nickname() -> String {
    "bot".to_string()
}

fn default_commands_max_match() -> usize {
    1
}

fn default_commentary_qsize() -> usize {
    2
}

fn default_kwargs() -> Value {
    Value::Object(Default::default())
}

// ============================================================================
// Client Config
// ============================================================================

/// Settings that drive the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// The bot's display name in rooms.
    #[serde(default = "default_nickname")]
    pub nickname: String,

    /// Rooms to join; consumed by the transport.
    #[serde(default)]
    pub rooms: Vec<String>,

    /// Maximum number of commands that may fire for one message.
    #[serde(default = "default_commands_max_match")]
    pub commands_max_match: usize,

    /// Number of recent commentary bodies remembered by the anti-loop guard.
    #[serde(default = "default_commentary_qsize")]
    pub commentary_qsize: usize,

    /// Handler packages, in registration order.
    #[serde(default)]
    pub packages: Vec<HandlerDescriptor>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            rooms: Vec::new(),
            commands_max_match: default_commands_max_match(),
            commentary_qsize: default_commentary_qsize(),
            packages: Vec::new(),
        }
    }
}

// ============================================================================
// Handler Descriptor
// ============================================================================

/// How to build and wire one handler instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    /// Class reference resolved through the handler catalog.
    #[serde(alias = "class")]
    pub package: String,

    /// Unique name of the instance; defaults to the class reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Constructor arguments.
    #[serde(default = "default_kwargs")]
    pub kwargs: Value,

    /// `[pattern, method]` pairs for groupchat commands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Value>,

    /// `[pattern, method]` pairs for direct messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub private_commands: Vec<Value>,

    /// `[pattern, method]` pairs for commentary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commentators: Vec<Value>,

    /// Methods called for every groupchat message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<String>,

    /// Timer groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timers: Vec<TimerGroup>,

    /// Transport event name to subscribed methods.
    #[serde(
        default,
        alias = "raw_event_subscriptions",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub raw_handlers: BTreeMap<String, Vec<String>>,
}

impl HandlerDescriptor {
    /// Creates a descriptor for `package` with nothing wired.
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            alias: None,
            kwargs: default_kwargs(),
            commands: Vec::new(),
            private_commands: Vec::new(),
            commentators: Vec::new(),
            listeners: Vec::new(),
            timers: Vec::new(),
            raw_handlers: BTreeMap::new(),
        }
    }

    /// The alias the instance is registered under.
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.package)
    }

    /// Sets the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the constructor arguments.
    pub fn with_kwargs(mut self, kwargs: Value) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// Adds a groupchat command.
    pub fn command(mut self, pattern: &str, method: &str) -> Self {
        self.commands.push(pair(pattern, method));
        self
    }

    /// Adds a direct-message command.
    pub fn private_command(mut self, pattern: &str, method: &str) -> Self {
        self.private_commands.push(pair(pattern, method));
        self
    }

    /// Adds a commentator.
    pub fn commentator(mut self, pattern: &str, method: &str) -> Self {
        self.commentators.push(pair(pattern, method));
        self
    }

    /// Adds a listener.
    pub fn listener(mut self, method: impl Into<String>) -> Self {
        self.listeners.push(method.into());
        self
    }

    /// Adds a timer group.
    pub fn timer_group(mut self, group: TimerGroup) -> Self {
        self.timers.push(group);
        self
    }

    /// Subscribes `method` to the transport event `event`.
    pub fn raw_handler(mut self, event: impl Into<String>, method: impl Into<String>) -> Self {
        self.raw_handlers
            .entry(event.into())
            .or_default()
            .push(method.into());
        self
    }
}

fn pair(pattern: &str, method: &str) -> Value {
    Value::Array(vec![Value::from(pattern), Value::from(method)])
}

// ============================================================================
// Timer Groups
// ============================================================================

/// Timers sharing the same send arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerGroup {
    /// The scheduled methods.
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,

    /// Send arguments applied to every invocation from this group.
    #[serde(flatten)]
    pub defaults: SendDefaults,
}

impl TimerGroup {
    /// Creates a group sending with `defaults`.
    pub fn new(defaults: SendDefaults) -> Self {
        Self {
            schedule: Vec::new(),
            defaults,
        }
    }

    /// Adds a method with a raw delay value (`seconds` or `[min, max]`).
    pub fn every(mut self, seconds: impl Into<Value>, method: impl Into<String>) -> Self {
        self.schedule.push(ScheduleEntry {
            seconds: seconds.into(),
            method: method.into(),
        });
        self
    }
}

/// One scheduled method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// A delay in seconds or an inclusive `[min, max]` range.
    pub seconds: Value,
    /// The method to call.
    pub method: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jibber_core::MessageKind;
    use serde_json::json;

    #[test]
    fn test_client_config_defaults() {
        let config: ClientConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.nickname, "bot");
        assert_eq!(config.commands_max_match, 1);
        assert_eq!(config.commentary_qsize, 2);
    }

    #[test]
    fn test_descriptor_from_original_shape() {
        let descriptor: HandlerDescriptor = serde_json::from_value(json!({
            "package": "bot.Fortune",
            "commands": [["^%(nickname)s: fortune", "fortune"], "broken"],
            "listeners": ["log"],
            "timers": [{
                "schedule": [{"seconds": [10, 20], "method": "fortune"}],
                "mto": "room@chat.example.com",
                "mtype": "groupchat"
            }],
            "raw_handlers": {"presence_unavailable": ["gone"]}
        }))
        .unwrap();

        assert_eq!(descriptor.alias(), "bot.Fortune");
        assert_eq!(descriptor.kwargs, json!({}));
        assert_eq!(descriptor.commands.len(), 2);
        assert_eq!(descriptor.timers[0].schedule[0].seconds, json!([10, 20]));
        assert_eq!(
            descriptor.timers[0].defaults.target.as_deref(),
            Some("room@chat.example.com")
        );
        assert_eq!(descriptor.timers[0].defaults.kind, Some(MessageKind::Groupchat));
        assert_eq!(descriptor.raw_handlers["presence_unavailable"], vec!["gone"]);
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = HandlerDescriptor::new("demo.Greeter")
            .with_alias("greeter")
            .command("^%(nickname)s: hi", "say_hi")
            .listener("count");

        assert_eq!(descriptor.alias(), "greeter");
        assert_eq!(descriptor.commands[0], json!(["^%(nickname)s: hi", "say_hi"]));
        assert_eq!(descriptor.listeners, vec!["count"]);
    }
}

//! Timer Table.
//!
//! Timers are one-shot schedules that the dispatcher re-arms after every
//! invocation of the bound method, so a range delay draws fresh jitter on
//! each cycle.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use jibber_core::SendDefaults;
use rand::Rng;
use serde_json::Value;

use crate::error::{SetupError, SetupResult};

// ============================================================================
// Delay
// ============================================================================

/// How long to wait before a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelaySpec {
    /// A fixed number of seconds.
    Fixed(u64),
    /// A uniformly drawn number of seconds in `[min, max]`.
    Range(u64, u64),
}

impl DelaySpec {
    /// Parses a configuration value: an integer or a `[min, max]` pair.
    pub fn from_value(value: &Value) -> SetupResult<Self> {
        let invalid = || SetupError::InvalidDelay {
            value: value.to_string(),
        };
        match value {
            Value::Number(n) => n.as_u64().map(Self::Fixed).ok_or_else(invalid),
            Value::Array(items) => match items.as_slice() {
                [min, max] => {
                    let min = min.as_u64().ok_or_else(invalid)?;
                    let max = max.as_u64().ok_or_else(invalid)?;
                    if min > max {
                        return Err(invalid());
                    }
                    Ok(Self::Range(min, max))
                }
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }

    /// Picks the delay for the next occurrence.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let seconds = match *self {
            Self::Fixed(seconds) => seconds,
            Self::Range(min, max) => rng.gen_range(min..=max),
        };
        Duration::from_secs(seconds)
    }
}

// ============================================================================
// Key
// ============================================================================

/// Identifies a timer by handler alias and method name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    /// Handler alias.
    pub alias: String,
    /// Method name.
    pub method: String,
}

impl TimerKey {
    /// Creates a key.
    pub fn new(alias: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            method: method.into(),
        }
    }

    /// The string the transport scheduler knows this timer by.
    pub fn schedule_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}', '{}')", self.alias, self.method)
    }
}

// ============================================================================
// Table
// ============================================================================

/// A declared timer.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerEntry {
    /// Delay between occurrences.
    pub delay: DelaySpec,
    /// Send arguments for replies produced by the timer.
    pub defaults: SendDefaults,
}

/// Timers of one configuration generation, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerTable {
    order: Vec<TimerKey>,
    entries: HashMap<TimerKey, TimerEntry>,
}

impl TimerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a timer. Redeclaring a key replaces its entry in place.
    pub fn insert(&mut self, key: TimerKey, entry: TimerEntry) {
        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.push(key);
        }
    }

    /// Looks up a timer.
    pub fn get(&self, key: &TimerKey) -> Option<&TimerEntry> {
        self.entries.get(key)
    }

    /// Returns true if `key` is declared.
    pub fn contains(&self, key: &TimerKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &TimerKey> {
        self.order.iter()
    }

    /// Drops every timer of `alias`, returning the removed keys.
    pub fn remove_alias(&mut self, alias: &str) -> Vec<TimerKey> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.order.drain(..).partition(|k| k.alias == alias);
        self.order = kept;
        for key in &removed {
            self.entries.remove(key);
        }
        removed
    }

    /// Number of declared timers.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no timers are declared.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

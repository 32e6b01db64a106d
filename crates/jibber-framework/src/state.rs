//! Dispatcher state.
//!
//! Everything one configuration generation wires up lives in a single
//! [`DispatcherState`]. A reload builds a new value from scratch and swaps it
//! in; nothing is patched in place.

use jibber_core::SendDefaults;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::commentary::CommentaryWindow;
use crate::descriptor::{ClientConfig, HandlerDescriptor};
use crate::error::{SetupError, SetupResult};
use crate::handler::BoxedHandler;
use crate::registry::{HandlerCatalog, HandlerRegistry};
use crate::timer::{DelaySpec, TimerEntry, TimerKey, TimerTable};
use crate::trigger::{MethodRef, TriggerEntry, TriggerTable, parse_trigger};

/// Handlers, triggers, timers and the commentary window of one generation.
#[derive(Debug)]
pub struct DispatcherState {
    handlers: HandlerRegistry,
    triggers: TriggerTable,
    timers: TimerTable,
    commentary: Mutex<CommentaryWindow>,
    commands_max_match: usize,
}

impl DispatcherState {
    /// A state with nothing registered.
    pub fn empty() -> Self {
        Self {
            handlers: HandlerRegistry::new(),
            triggers: TriggerTable::default(),
            timers: TimerTable::new(),
            commentary: Mutex::new(CommentaryWindow::default()),
            commands_max_match: 1,
        }
    }

    /// Builds the state described by `config`.
    ///
    /// Only an invalid commentary queue size fails the build. Every other
    /// problem rejects the single entry it concerns, which is logged.
    pub fn build(config: &ClientConfig, catalog: &HandlerCatalog, nickname: &str) -> SetupResult<Self> {
        let commentary = CommentaryWindow::new(config.commentary_qsize)?;
        let mut state = Self {
            handlers: HandlerRegistry::new(),
            triggers: TriggerTable::default(),
            timers: TimerTable::new(),
            commentary: Mutex::new(commentary),
            commands_max_match: config.commands_max_match,
        };

        for descriptor in &config.packages {
            state.add_package(descriptor, catalog, nickname);
        }

        info!(
            handlers = state.handlers.len(),
            triggers = state.triggers.len(),
            timers = state.timers.len(),
            "Dispatcher state built"
        );
        Ok(state)
    }

    fn add_package(&mut self, descriptor: &HandlerDescriptor, catalog: &HandlerCatalog, nickname: &str) {
        let alias = descriptor.alias();
        let handler = match catalog.instantiate(&descriptor.package, &descriptor.kwargs) {
            Ok(handler) => handler,
            Err(e) => {
                error!(alias, package = %descriptor.package, error = %e, "Skipping package");
                return;
            }
        };

        if self.handlers.insert(alias, handler.clone()).is_some() {
            warn!(alias, "Alias registered twice; replacing the earlier instance");
            self.triggers.remove_alias(alias);
            self.timers.remove_alias(alias);
        }
        debug!(alias, handler = handler.type_name(), "Registered handler");

        let wire = |entries: &[serde_json::Value], kind: &str| -> Vec<TriggerEntry> {
            entries
                .iter()
                .filter_map(|entry| {
                    let result = parse_trigger(entry, nickname).and_then(|(pattern, method)| {
                        check_method(&handler, alias, &method)?;
                        Ok(TriggerEntry::new(pattern, alias, method))
                    });
                    result
                        .inspect_err(|e| error!(alias, kind, error = %e, "Skipping trigger"))
                        .ok()
                })
                .collect()
        };
        let commands = wire(&descriptor.commands[..], "command");
        let private_commands = wire(&descriptor.private_commands[..], "private_command");
        let commentators = wire(&descriptor.commentators[..], "commentator");
        self.triggers.commands.extend(commands);
        self.triggers.private_commands.extend(private_commands);
        self.triggers.commentators.extend(commentators);

        for method in &descriptor.listeners {
            match check_method(&handler, alias, method) {
                Ok(()) => self.triggers.listeners.push(MethodRef::new(alias, method)),
                Err(e) => error!(alias, error = %e, "Skipping listener"),
            }
        }

        for (event, methods) in &descriptor.raw_handlers {
            for method in methods {
                match check_method(&handler, alias, method) {
                    Ok(()) => self
                        .triggers
                        .raw_handlers
                        .push((event.clone(), MethodRef::new(alias, method))),
                    Err(e) => error!(alias, event = %event, error = %e, "Skipping raw handler"),
                }
            }
        }

        for group in &descriptor.timers {
            for entry in &group.schedule {
                let result = DelaySpec::from_value(&entry.seconds)
                    .and_then(|delay| check_method(&handler, alias, &entry.method).map(|()| delay));
                match result {
                    Ok(delay) => self.timers.insert(
                        TimerKey::new(alias, &entry.method),
                        TimerEntry {
                            delay,
                            defaults: group.defaults.clone(),
                        },
                    ),
                    Err(e) => error!(alias, method = %entry.method, error = %e, "Skipping timer"),
                }
            }
        }
    }

    /// The handler instances.
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// The dispatch tables.
    pub fn triggers(&self) -> &TriggerTable {
        &self.triggers
    }

    /// The declared timers.
    pub fn timers(&self) -> &TimerTable {
        &self.timers
    }

    /// The commentary window.
    pub fn commentary(&self) -> &Mutex<CommentaryWindow> {
        &self.commentary
    }

    /// Maximum number of commands per message.
    pub fn commands_max_match(&self) -> usize {
        self.commands_max_match
    }

    /// Send defaults of the timer `key`, if declared.
    pub fn timer_defaults(&self, key: &TimerKey) -> Option<&SendDefaults> {
        self.timers.get(key).map(|entry| &entry.defaults)
    }

    /// A copy of this state with every timer removed.
    pub fn without_timers(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            triggers: self.triggers.clone(),
            timers: TimerTable::new(),
            commentary: Mutex::new(self.commentary.lock().clone()),
            commands_max_match: self.commands_max_match,
        }
    }
}

fn check_method(handler: &BoxedHandler, alias: &str, method: &str) -> SetupResult<()> {
    if handler.has_method(method) {
        Ok(())
    } else {
        Err(SetupError::UnknownMethod {
            alias: alias.to_string(),
            method: method.to_string(),
        })
    }
}

//! Handler catalog and registry.
//!
//! The [`HandlerCatalog`] maps class references, as written in the
//! configuration, to factories. It is filled in by the application before
//! any configuration is loaded. The [`HandlerRegistry`] holds the instances
//! built from one configuration generation, keyed by alias.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{SetupError, SetupResult};
use crate::handler::{BoxedHandler, Handler, into_handler};

/// Builds a handler instance from its constructor arguments.
pub type HandlerFactory = Arc<dyn Fn(&Value) -> anyhow::Result<BoxedHandler> + Send + Sync>;

// ============================================================================
// Catalog
// ============================================================================

/// Class references the configuration may instantiate.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `class`.
    ///
    /// Registering the same class twice replaces the earlier factory.
    pub fn register<H, F>(&mut self, class: impl Into<String>, build: F) -> &mut Self
    where
        H: Handler,
        F: Fn(&Value) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        let class = class.into();
        debug!(class = %class, "Registered handler class");
        self.factories.insert(
            class,
            Arc::new(move |kwargs: &Value| build(kwargs).map(into_handler)),
        );
        self
    }

    /// Registers `H`, deserializing it from its constructor arguments.
    pub fn register_deserialize<H>(&mut self, class: impl Into<String>) -> &mut Self
    where
        H: Handler + DeserializeOwned,
    {
        self.register(class, |kwargs: &Value| {
            Ok(serde_json::from_value::<H>(kwargs.clone())?)
        })
    }

    /// Registers `H`, ignoring constructor arguments.
    pub fn register_default<H>(&mut self, class: impl Into<String>) -> &mut Self
    where
        H: Handler + Default,
    {
        self.register(class, |_: &Value| Ok(H::default()))
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<H, F>(mut self, class: impl Into<String>, build: F) -> Self
    where
        H: Handler,
        F: Fn(&Value) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        self.register(class, build);
        self
    }

    /// Returns true if `class` can be instantiated.
    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Returns the registered class references.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds an instance of `class`.
    pub fn instantiate(&self, class: &str, kwargs: &Value) -> SetupResult<BoxedHandler> {
        let factory = self
            .factories
            .get(class)
            .ok_or_else(|| SetupError::UnknownHandlerClass(class.to_string()))?;
        factory(kwargs).map_err(|e| SetupError::construction(class, e))
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.factories.keys().collect();
        classes.sort_unstable();
        f.debug_struct("HandlerCatalog")
            .field("classes", &classes)
            .finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Handler instances of one configuration generation, keyed by alias.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handler` under `alias`, returning the instance it replaced.
    pub fn insert(&mut self, alias: impl Into<String>, handler: BoxedHandler) -> Option<BoxedHandler> {
        self.handlers.insert(alias.into(), handler)
    }

    /// Looks up a handler by alias.
    pub fn get(&self, alias: &str) -> Option<&BoxedHandler> {
        self.handlers.get(alias)
    }

    /// Returns true if `alias` is registered.
    pub fn contains(&self, alias: &str) -> bool {
        self.handlers.contains_key(alias)
    }

    /// Returns the registered aliases.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliases: Vec<_> = self.handlers.keys().collect();
        aliases.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("aliases", &aliases)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::handler::{HandlerResult, Methods};
    use jibber_core::{Match, Message, Reply};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Fortune {
        fortune_file: String,
    }

    impl Fortune {
        fn fortune(&self, _: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            Ok(Reply::text(self.fortune_file.clone()))
        }
    }

    impl Handler for Fortune {
        fn methods() -> Methods<Self> {
            Methods::new().method("fortune", Self::fortune)
        }
    }

    #[test]
    fn test_instantiate_from_kwargs() {
        let mut catalog = HandlerCatalog::new();
        catalog.register_deserialize::<Fortune>("bot.Fortune");

        let handler = catalog
            .instantiate("bot.Fortune", &json!({"fortune_file": "/tmp/f"}))
            .unwrap();
        assert!(handler.has_method("fortune"));
    }

    #[test]
    fn test_instantiate_errors() {
        let mut catalog = HandlerCatalog::new();
        catalog.register_deserialize::<Fortune>("bot.Fortune");

        assert!(matches!(
            catalog.instantiate("bot.Missing", &json!({})),
            Err(SetupError::UnknownHandlerClass(_))
        ));
        assert!(matches!(
            catalog.instantiate("bot.Fortune", &json!({"wrong": 1})),
            Err(SetupError::HandlerConstruction { .. })
        ));
    }

    #[test]
    fn test_registry_replaces_alias() {
        let catalog = HandlerCatalog::new().with("bot.Fortune", |_: &Value| {
            Ok(Fortune {
                fortune_file: "x".into(),
            })
        });
        let mut registry = HandlerRegistry::new();

        let first = catalog.instantiate("bot.Fortune", &json!({})).unwrap();
        let second = catalog.instantiate("bot.Fortune", &json!({})).unwrap();
        assert!(registry.insert("fortune", first).is_none());
        assert!(registry.insert("fortune", second).is_some());
        assert_eq!(registry.len(), 1);
    }
}

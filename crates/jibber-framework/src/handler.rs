//! Handler system for the jibber framework.
//!
//! A handler is an ordinary struct whose methods the dispatcher calls by
//! name. The struct declares its callable methods once through
//! [`Handler::methods`]; configuration then refers to them by string.
//!
//! # Calling conventions
//!
//! Methods either take the dispatcher as a back-reference or not:
//!
//! ```rust,ignore
//! use jibber_framework::{Dispatcher, Handler, HandlerResult, Methods};
//! use jibber_core::{Match, Message, Reply};
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     fn say_hi(&self, msg: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
//!         Ok(Reply::text(format!("hi {}", msg.nick)))
//!     }
//!
//!     fn wave(&self, _: &Message, _: Option<&Match>) -> HandlerResult {
//!         Ok(Reply::text("*waves*"))
//!     }
//! }
//!
//! impl Handler for Greeter {
//!     fn methods() -> Methods<Self> {
//!         Methods::new()
//!             .method("say_hi", Self::say_hi)
//!             .legacy("wave", Self::wave)
//!     }
//! }
//! ```
//!
//! The convention is recorded when the method is declared, so the dispatcher
//! never has to probe a call to find out which one applies.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use jibber_core::{Match, Message, Reply};

use crate::dispatcher::Dispatcher;

/// What a handler method returns.
pub type HandlerResult = anyhow::Result<Reply>;

/// A method that receives the dispatcher as a back-reference.
pub type MethodFn<H> = fn(&H, &Message, Option<&Match>, &Dispatcher) -> HandlerResult;

/// A method declared without the dispatcher argument.
pub type LegacyMethodFn<H> = fn(&H, &Message, Option<&Match>) -> HandlerResult;

// ============================================================================
// Method Table
// ============================================================================

/// How a method expects to be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallingConvention {
    /// `(message, match, bot)`.
    WithBot,
    /// `(message, match)`.
    Legacy,
}

/// A declared handler method.
pub enum Method<H> {
    /// Takes the dispatcher.
    WithBot(MethodFn<H>),
    /// Does not take the dispatcher.
    Legacy(LegacyMethodFn<H>),
}

impl<H> Clone for Method<H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for Method<H> {}

impl<H> Method<H> {
    /// Returns the calling convention of this method.
    pub fn convention(&self) -> CallingConvention {
        match self {
            Self::WithBot(_) => CallingConvention::WithBot,
            Self::Legacy(_) => CallingConvention::Legacy,
        }
    }

    fn call(
        &self,
        handler: &H,
        message: &Message,
        matched: Option<&Match>,
        bot: &Dispatcher,
    ) -> HandlerResult {
        match self {
            Self::WithBot(f) => f(handler, message, matched, bot),
            Self::Legacy(f) => f(handler, message, matched),
        }
    }
}

/// The named methods a handler exposes.
pub struct Methods<H> {
    table: HashMap<&'static str, Method<H>>,
}

impl<H> Default for Methods<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Methods<H> {
    /// Creates an empty method table.
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Declares a method that takes the dispatcher.
    pub fn method(mut self, name: &'static str, f: MethodFn<H>) -> Self {
        self.table.insert(name, Method::WithBot(f));
        self
    }

    /// Declares a method that does not take the dispatcher.
    pub fn legacy(mut self, name: &'static str, f: LegacyMethodFn<H>) -> Self {
        self.table.insert(name, Method::Legacy(f));
        self
    }

    /// Looks up a method by name.
    pub fn get(&self, name: &str) -> Option<&Method<H>> {
        self.table.get(name)
    }

    /// Returns the declared method names.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.keys().copied()
    }

    /// Returns the number of declared methods.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no methods are declared.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// A type whose methods can be wired to triggers, listeners and timers.
///
/// Handlers are shared between the dispatch path and timer callbacks, so any
/// mutable state needs interior mutability.
pub trait Handler: Send + Sync + 'static {
    /// Declares the methods configuration may refer to.
    fn methods() -> Methods<Self>
    where
        Self: Sized;
}

// ============================================================================
// Type Erasure
// ============================================================================

/// A type-erased handler instance.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

/// Object-safe view of a handler instance.
pub trait ErasedHandler: Send + Sync {
    /// The Rust type name of the handler, for logs.
    fn type_name(&self) -> &'static str;

    /// Returns how `method` is called, or `None` if it is not declared.
    fn convention(&self, method: &str) -> Option<CallingConvention>;

    /// Calls `method`. Returns `None` if the method is not declared.
    fn call(
        &self,
        method: &str,
        message: &Message,
        matched: Option<&Match>,
        bot: &Dispatcher,
    ) -> Option<HandlerResult>;

    /// Returns true if `method` is declared.
    fn has_method(&self, method: &str) -> bool {
        self.convention(method).is_some()
    }
}

struct HandlerInstance<H> {
    handler: H,
    methods: Methods<H>,
}

impl<H: Handler> ErasedHandler for HandlerInstance<H> {
    fn type_name(&self) -> &'static str {
        type_name::<H>()
    }

    fn convention(&self, method: &str) -> Option<CallingConvention> {
        self.methods.get(method).map(Method::convention)
    }

    fn call(
        &self,
        method: &str,
        message: &Message,
        matched: Option<&Match>,
        bot: &Dispatcher,
    ) -> Option<HandlerResult> {
        self.methods
            .get(method)
            .map(|m| m.call(&self.handler, message, matched, bot))
    }
}

/// Erases a handler instance, capturing its method table.
pub fn into_handler<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(HandlerInstance {
        methods: H::methods(),
        handler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo {
        prefix: String,
    }

    impl Echo {
        fn echo(&self, msg: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            Ok(Reply::text(format!("{}{}", self.prefix, msg.body)))
        }

        fn shout(&self, msg: &Message, _: Option<&Match>) -> HandlerResult {
            Ok(Reply::text(msg.body.to_uppercase()))
        }
    }

    impl Handler for Echo {
        fn methods() -> Methods<Self> {
            Methods::new()
                .method("echo", Self::echo)
                .legacy("shout", Self::shout)
        }
    }

    #[test]
    fn test_conventions_are_recorded() {
        let handler = into_handler(Echo {
            prefix: String::new(),
        });

        assert_eq!(handler.convention("echo"), Some(CallingConvention::WithBot));
        assert_eq!(handler.convention("shout"), Some(CallingConvention::Legacy));
        assert!(!handler.has_method("missing"));
        assert!(handler.type_name().ends_with("Echo"));
    }

    #[test]
    fn test_methods_table() {
        let methods = Echo::methods();
        assert_eq!(methods.len(), 2);
        let mut names: Vec<_> = methods.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["echo", "shout"]);
    }
}

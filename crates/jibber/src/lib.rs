//! # Jibber
//!
//! A chat bot for XMPP multi-user chat rooms, assembled from configurable
//! handler packages.
//!
//! ## Overview
//!
//! A bot is a nickname, a list of rooms and a list of packages. Each package
//! names a handler class, the constructor arguments to build it with, and
//! the triggers that route traffic to its methods: regex commands, private
//! commands, commentators, unconditional listeners, raw event subscriptions
//! and repeating timers.
//!
//! ```text
//! ┌───────────┐     ┌────────────┐     ┌────────────────────────────┐
//! │  Runtime  │────▶│ Dispatcher │────▶│ commentators → commands →  │
//! │ (channel) │◀────│            │◀────│ listeners → timers         │
//! └───────────┘     └────────────┘     └────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jibber::prelude::*;
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     fn say_hi(&self, msg: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
//!         Ok(Reply::text(format!("hi {}", msg.nick)))
//!     }
//! }
//!
//! impl Handler for Greeter {
//!     fn methods() -> Methods<Self> {
//!         Methods::new().method("say_hi", Self::say_hi)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = HandlerCatalog::new().with("demo.Greeter", |_: &serde_json::Value| Ok(Greeter));
//!     let runtime = JibberRuntime::builder().catalog(catalog).build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-config`: JSON configuration files
//! - `json-log`: JSON log output

pub use jibber_core as core;
pub use jibber_framework as framework;
pub use jibber_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use jibber::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use jibber_runtime::{JibberConfig, JibberRuntime};

    // Handlers and their registration
    pub use jibber_framework::{
        ClientConfig, Dispatcher, Handler, HandlerCatalog, HandlerDescriptor, HandlerResult,
        Methods, TimerGroup,
    };

    // What handlers receive and return
    pub use jibber_core::{Match, Message, MessageKind, Reply, ReplyFields, SendDefaults};
}

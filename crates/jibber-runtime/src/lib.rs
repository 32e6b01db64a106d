//! Jibber Runtime - configuration, logging and the event loop.
//!
//! This crate provides:
//! - Layered configuration (`JibberConfig`, `ConfigLoader`)
//! - Logging configuration (`LoggingBuilder`)
//! - A tokio-backed transport (`ChannelTransport`)
//! - The event loop (`JibberRuntime`)
//!
//! ```ignore
//! use jibber_runtime::JibberRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = JibberRuntime::builder()
//!         .catalog(catalog)
//!         .build()?;
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod transport;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, JibberConfig, LoggingConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{JibberRuntime, RuntimeBuilder};
pub use transport::ChannelTransport;

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}

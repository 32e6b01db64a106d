//! Configuration module for the jibber runtime.
//!
//! Layered loading (defaults, files, environment) and validation of the
//! logging section and the dispatcher's client section.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{JibberConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};
pub use validation::validate_config;

//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The extension is unknown, or support for it was not compiled in.
    #[error("cannot read .{0} config files (unknown extension or disabled feature)")]
    UnsupportedFormat(String),

    /// A source could not be parsed or did not fit [`JibberConfig`](super::JibberConfig).
    #[error(transparent)]
    Extract(Box<figment::Error>),

    #[error("invalid configuration: {message}")]
    ValidationError { message: String },

    #[error("`{field}` must be set")]
    MissingField { field: String },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Extract(Box::new(e))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

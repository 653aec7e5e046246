//! Error handling for the xc console

use thiserror::Error;

use crate::config::ConfigError;
use xc_core::{StartupError, TransportError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Terminal error: {0}")]
    UI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

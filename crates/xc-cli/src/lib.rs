//! xc console library
//!
//! Terminal side of the xc messaging console: configuration, the raw-mode
//! line editor, command dispatch and the event pump that renders incoming
//! traffic while the user types.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod editor;
pub mod error;
pub mod events;
pub mod screen;
pub mod shutdown;

pub use app::XcApp;
pub use cli::Cli;
pub use config::{ConfigError, XcConfig};
pub use console::SessionEnd;
pub use error::{CliError, Result};

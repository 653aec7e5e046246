//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Interactive console for presence-aware messaging",
    long_about = None
)]
pub struct Cli {
    /// Configuration file path (defaults to ~/.xc.conf)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Local account address, overriding the configuration file
    #[arg(long)]
    pub jid: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

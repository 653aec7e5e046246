//! xc - interactive presence-aware messaging console

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::{error, info};

use xc_cli::{
    cli::Cli,
    config::XcConfig,
    editor::CrosstermKeys,
    screen::Screen,
    XcApp,
};
use xc_core::LoopbackTransport;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Failed to open log file: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match XcConfig::load(cli.config.as_deref(), cli.jid.clone()) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error reading configuration file.");
            eprintln!("{}", e);
            eprintln!("Example configuration: {}", XcConfig::example_config());
            return ExitCode::FAILURE;
        }
    };

    let transport = Arc::new(LoopbackTransport::new(
        config.address(),
        config.seed_contacts(),
    ));
    let app = XcApp::new(config, transport);

    match app.run(Screen::stdout(), Box::new(CrosstermKeys::new())).await {
        Ok(end) => {
            info!("xc exited: {:?}", end);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr, or to `log_file` when given
fn setup_logging(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

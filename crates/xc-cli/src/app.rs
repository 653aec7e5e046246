//! xc application wiring
//!
//! Connects the transport, waits on the startup gate, then runs the console
//! while the event pump renders whatever the server sends.

use std::sync::Arc;

use tracing::{error, info};

use crate::commands::CommandDispatcher;
use crate::config::XcConfig;
use crate::console::{Console, SessionEnd};
use crate::editor::{KeySource, LineEditor, SessionCompleter};
use crate::error::Result;
use crate::events::EventPump;
use crate::screen::Screen;
use crate::shutdown::ShutdownFlag;
use xc_core::{create_event_channel, Session, SharedSession, StartupGate, Transport};

pub struct XcApp {
    config: XcConfig,
    transport: Arc<dyn Transport>,
}

impl XcApp {
    pub fn new(config: XcConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub async fn run(self, screen: Screen, keys: Box<dyn KeySource>) -> Result<SessionEnd> {
        let session = SharedSession::new(Session::new(self.config.address()));
        let (ready, wait) = StartupGate::new();
        let (event_sender, event_receiver) = create_event_channel();
        let shutdown = ShutdownFlag::new();

        let pump = EventPump::new(
            session.clone(),
            screen.notification_sink(),
            ready,
            shutdown.clone(),
            event_receiver,
        );
        let pump_handle = tokio::spawn(pump.run());

        info!("connecting as {}", self.config.address());
        let started: Result<()> = match self.transport.connect(event_sender).await {
            Ok(()) => wait
                .wait(self.config.startup_timeout())
                .await
                .map_err(Into::into),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = started {
            error!("startup failed: {}", e);
            if let Err(e) = self.transport.disconnect().await {
                error!("disconnect after failed startup: {}", e);
            }
            pump_handle.abort();
            return Err(e);
        }
        info!("session ready");

        let editor = LineEditor::new(keys, screen.clone())
            .with_completer(SessionCompleter::new(session.clone()));
        let dispatcher = CommandDispatcher::new(session.clone(), self.transport.clone(), screen);
        let console = Console::new(session, editor, dispatcher, shutdown);
        let end = console.run().await;

        pump_handle.abort();
        end
    }
}

//! Interactive console loop
//!
//! Reads lines on a blocking thread and hands each one to the dispatcher.
//! Only one line is ever in flight, so messages and commands run in the order
//! they were typed.

use tracing::{debug, error, info};

use crate::commands::{CommandDispatcher, Flow};
use crate::editor::{LineEditor, ReadOutcome};
use crate::error::{CliError, Result};
use crate::shutdown::ShutdownFlag;
use xc_core::SharedSession;

/// Why the console stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// `/quit`
    Quit,
    /// Ctrl-D on an empty line, or stdin closed
    EndOfInput,
    /// Ctrl-C
    Interrupted,
    /// The connection was lost
    Disconnected,
}

pub struct Console {
    session: SharedSession,
    editor: LineEditor,
    dispatcher: CommandDispatcher,
    shutdown: ShutdownFlag,
}

impl Console {
    pub fn new(
        session: SharedSession,
        editor: LineEditor,
        dispatcher: CommandDispatcher,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            session,
            editor,
            dispatcher,
            shutdown,
        }
    }

    /// Run until the user leaves or the connection drops, then disconnect.
    ///
    /// The transport is asked to disconnect on every exit, terminal errors included.
    pub async fn run(self) -> Result<SessionEnd> {
        let Console {
            session,
            editor,
            mut dispatcher,
            shutdown,
        } = self;

        let end = read_loop(&session, editor, &mut dispatcher, &shutdown).await;
        match &end {
            Ok(end) => info!("console stopped: {:?}", end),
            Err(e) => error!("console failed: {}", e),
        }
        dispatcher.shutdown().await;
        end
    }
}

async fn read_loop(
    session: &SharedSession,
    mut editor: LineEditor,
    dispatcher: &mut CommandDispatcher,
    shutdown: &ShutdownFlag,
) -> Result<SessionEnd> {
    loop {
        let prompt = session.lock().prompt();
        let flag = shutdown.clone();
        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = editor.read_line(&prompt, &flag);
            (editor, outcome)
        })
        .await
        .map_err(|e| CliError::UI(format!("input thread failed: {}", e)))?;
        editor = returned;

        match outcome? {
            ReadOutcome::Line(line) => {
                debug!("read line ({} chars)", line.chars().count());
                if dispatcher.dispatch(&line).await? == Flow::Quit {
                    return Ok(SessionEnd::Quit);
                }
            }
            ReadOutcome::Eof => return Ok(SessionEnd::EndOfInput),
            ReadOutcome::Interrupted => return Ok(SessionEnd::Interrupted),
            ReadOutcome::Shutdown => return Ok(SessionEnd::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::ScriptedKeys;
    use crate::screen::{CaptureBuffer, Screen};
    use std::io::{self, Write};
    use std::sync::Arc;
    use xc_core::testing::{MockTransport, TransportCall};
    use xc_core::{Address, Contact, Session};

    /// A terminal that has gone away
    struct BrokenTerminal;

    impl Write for BrokenTerminal {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "terminal closed"))
        }
    }

    fn console(screen: Screen, keys: ScriptedKeys) -> (Console, Arc<MockTransport>) {
        let mut session = Session::new(Address::new("me@example.com"));
        session.upsert_contact(Contact::new("bob@example.com", "Bob"));
        let session = SharedSession::new(session);
        let transport = Arc::new(MockTransport::new());
        let editor = LineEditor::new(Box::new(keys), screen.clone());
        let dispatcher = CommandDispatcher::new(session.clone(), transport.clone(), screen);
        let console = Console::new(session, editor, dispatcher, ShutdownFlag::new());
        (console, transport)
    }

    #[tokio::test]
    async fn test_terminal_error_still_disconnects() {
        let (console, transport) = console(Screen::new(BrokenTerminal), ScriptedKeys::default());

        let result = console.run().await;
        assert!(matches!(result, Err(CliError::Io(_))));
        assert_eq!(transport.calls(), vec![TransportCall::Disconnect]);
    }

    #[tokio::test]
    async fn test_quit_disconnects_once() {
        let capture = CaptureBuffer::new();
        let keys = ScriptedKeys::typing("Bob: hi\n/quit\n");
        let (console, transport) = console(Screen::new(capture), keys);

        assert_eq!(console.run().await.unwrap(), SessionEnd::Quit);
        assert_eq!(
            transport.calls(),
            vec![
                TransportCall::Send {
                    to: "bob@example.com".into(),
                    body: "hi".to_string(),
                },
                TransportCall::Disconnect,
            ]
        );
    }
}

//! Command dispatcher for the interactive console
//!
//! Each submitted line is classified as a `/command` or a chat message and
//! executed. Recoverable failures (bad arguments, unknown recipients, rejected
//! sends) are printed as one line and leave the session untouched; only
//! terminal I/O errors escape.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::screen::Screen;
use xc_core::{Address, Contact, SharedSession, Transport};

const HELP: &[&str] = &[
    "To send a message, type a contact's name (tab-completion is available),",
    "followed by a colon and space, followed by your message. After the first",
    "message, xc defaults to sending to the same contact.",
    "",
    "Example:",
    "",
    "   michael: hello",
    "",
    "Commands:",
    "",
    "/roster          print non-offline contacts",
    "/roster all      print all contacts",
    "/roster raw      dump the roster as JSON",
    "/name JID NAME   set the name for a contact",
    "/add JID         add a contact and request their presence",
    "/del JID         remove a contact",
    "/quit            disconnect and then quit (also ctrl-d, ctrl-c)",
    "/help            this help",
];

// ----------------------------------------------------------------------------
// Parsing
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFilter {
    Online,
    All,
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Roster(RosterFilter),
    Name { address: Address, name: String },
    Add { address: Address },
    Del { address: Address },
    Help,
    Quit,
    /// Known command with missing arguments; carries the usage line
    Usage(&'static str),
    Unknown(String),
}

/// A classified input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Command(ConsoleCommand),
    Message(String),
}

impl Input {
    /// Classify a line; message text keeps trailing whitespace so `"Bob: "` still
    /// carries its separator
    pub fn parse(line: &str) -> Self {
        if line.trim().is_empty() {
            return Input::Empty;
        }
        let line = line.trim_start();
        match line.strip_prefix('/') {
            Some(command) => Input::Command(ConsoleCommand::parse(command)),
            None => Input::Message(line.to_string()),
        }
    }
}

impl ConsoleCommand {
    fn parse(text: &str) -> Self {
        let mut words = text.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match command {
            "roster" => {
                let filter = if args.contains(&"raw") {
                    RosterFilter::Raw
                } else if args.contains(&"all") {
                    RosterFilter::All
                } else {
                    RosterFilter::Online
                };
                ConsoleCommand::Roster(filter)
            }
            "name" => match args.as_slice() {
                [address, name @ ..] if !name.is_empty() => ConsoleCommand::Name {
                    address: Address::new(*address),
                    name: name.join(" "),
                },
                _ => ConsoleCommand::Usage("usage: /name JID NAME"),
            },
            "add" => match args.first() {
                Some(address) => ConsoleCommand::Add {
                    address: Address::new(*address),
                },
                None => ConsoleCommand::Usage("usage: /add JID"),
            },
            "del" => match args.first() {
                Some(address) => ConsoleCommand::Del {
                    address: Address::new(*address),
                },
                None => ConsoleCommand::Usage("usage: /del JID"),
            },
            "help" => ConsoleCommand::Help,
            "quit" => ConsoleCommand::Quit,
            other => ConsoleCommand::Unknown(other.to_string()),
        }
    }
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Parsing,
    CommandExec,
    MessageSend,
    /// Terminal; no further lines are processed
    Disconnecting,
}

/// What the console loop should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct CommandDispatcher {
    session: SharedSession,
    transport: Arc<dyn Transport>,
    screen: Screen,
    state: DispatchState,
}

impl CommandDispatcher {
    pub fn new(session: SharedSession, transport: Arc<dyn Transport>, screen: Screen) -> Self {
        Self {
            session,
            transport,
            screen,
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Process one submitted line
    pub async fn dispatch(&mut self, line: &str) -> Result<Flow> {
        if self.state == DispatchState::Disconnecting {
            return Ok(Flow::Quit);
        }
        self.state = DispatchState::Parsing;

        let flow = match Input::parse(line) {
            Input::Empty => Flow::Continue,
            Input::Command(command) => {
                self.state = DispatchState::CommandExec;
                self.execute(command).await?
            }
            Input::Message(text) => {
                self.state = DispatchState::MessageSend;
                self.send(&text).await?;
                Flow::Continue
            }
        };

        self.state = match flow {
            Flow::Continue => DispatchState::Idle,
            Flow::Quit => DispatchState::Disconnecting,
        };
        Ok(flow)
    }

    /// Enter `Disconnecting` and ask the transport to close the session
    pub async fn shutdown(&mut self) {
        self.state = DispatchState::Disconnecting;
        info!("disconnecting");
        if let Err(e) = self.transport.disconnect().await {
            warn!("disconnect failed: {}", e);
        }
    }

    async fn execute(&mut self, command: ConsoleCommand) -> Result<Flow> {
        debug!("executing {:?}", command);
        match command {
            ConsoleCommand::Roster(filter) => self.print_roster(filter)?,
            ConsoleCommand::Name { address, name } => {
                match self.transport.set_name(&address, &name).await {
                    Ok(()) => self.session.lock().rename_contact(&address, &name),
                    Err(e) => self.report(&format!("error: {}", e))?,
                }
            }
            ConsoleCommand::Add { address } => match self.transport.add_contact(&address).await {
                Ok(()) => {
                    {
                        let mut session = self.session.lock();
                        if session.roster().find_by_address(&address).is_none() {
                            session.upsert_contact(Contact::new(address.clone(), ""));
                        }
                    }
                    self.screen.println(&format!("subscription requested: {}", address))?;
                }
                Err(e) => self.report(&format!("error: {}", e))?,
            },
            ConsoleCommand::Del { address } => match self.transport.remove_contact(&address).await {
                Ok(()) => {
                    self.session.lock().remove_contact(&address);
                }
                Err(e) => self.report(&format!("error: {}", e))?,
            },
            ConsoleCommand::Help => {
                let lines: Vec<String> = HELP.iter().map(|line| line.to_string()).collect();
                self.screen.print_block(&lines)?;
            }
            ConsoleCommand::Quit => return Ok(Flow::Quit),
            ConsoleCommand::Usage(usage) => self.screen.println(usage)?,
            ConsoleCommand::Unknown(name) => {
                debug!("unrecognised command: {}", name);
                self.screen.println("unrecognised command")?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        // Resolve under the lock, send without it
        let resolved = self.session.lock().resolve(line);
        let target = match resolved {
            Ok(target) => target,
            Err(e) => return self.report(&e.to_string()),
        };

        match self.transport.send_message(&target.address, &target.body).await {
            Ok(()) => {
                debug!("delivered to {}", target.address);
                self.session.lock().record_delivery(&target);
                Ok(())
            }
            Err(e) => self.report(&format!("send failed: {}", e)),
        }
    }

    fn report(&self, message: &str) -> Result<()> {
        warn!("{}", message);
        self.screen.println(message)?;
        Ok(())
    }

    fn print_roster(&self, filter: RosterFilter) -> Result<()> {
        let session = self.session.lock();
        let roster = session.roster();

        if filter == RosterFilter::Raw {
            let dump = serde_json::to_string_pretty(roster)?;
            let lines: Vec<String> = dump.lines().map(str::to_string).collect();
            drop(session);
            self.screen.print_block(&lines)?;
            return Ok(());
        }

        let rows: Vec<[String; 4]> = roster
            .all()
            .map(|contact| {
                [
                    contact.status_glyphs(),
                    contact.display_name.clone(),
                    contact.address.to_string(),
                    contact.subscription.to_string(),
                ]
            })
            .collect();
        drop(session);

        // Widths span every row so the layout is stable between filters
        let mut widths = [0usize; 4];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let lines: Vec<String> = rows
            .iter()
            .filter(|row| filter == RosterFilter::All || !row[0].is_empty())
            .map(|row| {
                row.iter()
                    .zip(widths)
                    .map(|(cell, width)| format!("{:<width$}", cell, width = width))
                    .collect::<Vec<_>>()
                    .join("   ")
                    .trim_end()
                    .to_string()
            })
            .collect();
        self.screen.print_block(&lines)?;
        Ok(())
    }
}

//! Raw-mode line editor
//!
//! Assembles one line from key presses, rendering every edit through the
//! [`Screen`] so asynchronous notifications can safely redraw around it. Keys
//! come from a [`KeySource`]: crossterm for a real terminal, a script in tests.
//! The editor polls with a short tick and gives up when the shutdown flag is
//! raised, so a dropped connection never leaves the console stuck in a read.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::debug;

use crate::screen::Screen;
use crate::shutdown::ShutdownFlag;
use xc_core::SharedSession;

const TICK_RATE: Duration = Duration::from_millis(50);
const WORD_DELIMITERS: [char; 2] = [' ', ':'];

/// Command names offered by tab completion
pub const COMMANDS: &[&str] = &["/roster", "/name", "/add", "/del", "/help", "/quit"];

// ----------------------------------------------------------------------------
// Keys
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    Tab,
    /// Ctrl-U
    KillLine,
    /// Ctrl-D
    Eof,
    /// Ctrl-C
    Interrupt,
}

pub trait KeySource: Send {
    /// Wait up to `timeout` for the next key; `Ok(None)` when none arrived
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyInput>>;
}

/// Leaves raw mode when dropped
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

/// Keys from the controlling terminal; raw mode starts with the first read
#[derive(Default)]
pub struct CrosstermKeys {
    raw_mode: Option<RawModeGuard>,
}

impl CrosstermKeys {
    pub fn new() -> Self {
        Self::default()
    }

    fn translate(key: KeyEvent) -> Option<KeyInput> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => Some(KeyInput::Interrupt),
            KeyCode::Char('d') if ctrl => Some(KeyInput::Eof),
            KeyCode::Char('u') if ctrl => Some(KeyInput::KillLine),
            KeyCode::Char('a') if ctrl => Some(KeyInput::Home),
            KeyCode::Char('e') if ctrl => Some(KeyInput::End),
            KeyCode::Char(_) if ctrl => None,
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            KeyCode::Tab => Some(KeyInput::Tab),
            _ => None,
        }
    }
}

impl KeySource for CrosstermKeys {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyInput>> {
        if self.raw_mode.is_none() {
            self.raw_mode = Some(RawModeGuard::enable()?);
        }
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Self::translate(key)),
            _ => Ok(None),
        }
    }
}

/// Pre-recorded keys; reports end of input once exhausted unless told to idle
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<KeyInput>,
    idle_when_empty: bool,
}

impl ScriptedKeys {
    /// Type `text`, with `'\n'` as Enter
    pub fn typing(text: &str) -> Self {
        let mut keys = Self::default();
        keys.push_text(text);
        keys
    }

    pub fn push_text(&mut self, text: &str) {
        self.keys.extend(text.chars().map(|c| match c {
            '\n' => KeyInput::Enter,
            '\t' => KeyInput::Tab,
            c => KeyInput::Char(c),
        }));
    }

    pub fn push(&mut self, key: KeyInput) {
        self.keys.push_back(key);
    }

    /// Keep waiting for keys instead of reporting end of input
    pub fn idle_when_empty(mut self) -> Self {
        self.idle_when_empty = true;
        self
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyInput>> {
        match self.keys.pop_front() {
            Some(key) => Ok(Some(key)),
            None if self.idle_when_empty => {
                std::thread::sleep(timeout);
                Ok(None)
            }
            None => Ok(Some(KeyInput::Eof)),
        }
    }
}

// ----------------------------------------------------------------------------
// Completion
// ----------------------------------------------------------------------------

pub trait Completer: Send {
    /// Replacement candidates for the word being typed
    fn complete(&self, word: &str) -> Vec<String>;
}

/// Completes command names and roster display names (as `NAME: `)
pub struct SessionCompleter {
    session: SharedSession,
}

impl SessionCompleter {
    pub fn new(session: SharedSession) -> Self {
        Self { session }
    }
}

impl Completer for SessionCompleter {
    fn complete(&self, word: &str) -> Vec<String> {
        if word.starts_with('/') {
            return COMMANDS
                .iter()
                .filter(|command| command.starts_with(word))
                .map(|command| command.to_string())
                .collect();
        }
        let session = self.session.lock();
        session
            .roster()
            .names_with_prefix(word)
            .map(|name| format!("{}: ", name))
            .collect()
    }
}

fn longest_common_prefix(candidates: &[String]) -> String {
    let mut prefix: Vec<char> = match candidates.first() {
        Some(first) => first.chars().collect(),
        None => return String::new(),
    };
    for candidate in &candidates[1..] {
        let shared = prefix
            .iter()
            .zip(candidate.chars())
            .take_while(|(a, b)| **a == *b)
            .count();
        prefix.truncate(shared);
    }
    prefix.into_iter().collect()
}

// ----------------------------------------------------------------------------
// Line editor
// ----------------------------------------------------------------------------

/// How a read ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-D on an empty line
    Eof,
    /// Ctrl-C
    Interrupted,
    /// The shutdown flag was raised while waiting
    Shutdown,
}

pub struct LineEditor {
    keys: Box<dyn KeySource>,
    screen: Screen,
    completer: Option<Box<dyn Completer>>,
    buffer: Vec<char>,
    cursor: usize,
}

impl LineEditor {
    pub fn new(keys: Box<dyn KeySource>, screen: Screen) -> Self {
        Self {
            keys,
            screen,
            completer: None,
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn with_completer(mut self, completer: impl Completer + 'static) -> Self {
        self.completer = Some(Box::new(completer));
        self
    }

    /// Read one line, blocking the calling thread
    pub fn read_line(&mut self, prompt: &str, shutdown: &ShutdownFlag) -> io::Result<ReadOutcome> {
        self.buffer.clear();
        self.cursor = 0;
        self.screen.begin_input(prompt)?;

        loop {
            if shutdown.is_triggered() {
                self.screen.end_input()?;
                return Ok(ReadOutcome::Shutdown);
            }
            let Some(key) = self.keys.next_key(TICK_RATE)? else {
                continue;
            };
            match key {
                KeyInput::Enter => {
                    self.screen.end_input()?;
                    return Ok(ReadOutcome::Line(self.buffer.iter().collect()));
                }
                KeyInput::Eof if self.buffer.is_empty() => {
                    self.screen.end_input()?;
                    return Ok(ReadOutcome::Eof);
                }
                KeyInput::Eof => {
                    // Delete-forward when there is text, like readline
                    if self.cursor < self.buffer.len() {
                        self.buffer.remove(self.cursor);
                    }
                }
                KeyInput::Interrupt => {
                    self.screen.end_input()?;
                    return Ok(ReadOutcome::Interrupted);
                }
                KeyInput::Char(c) => {
                    self.buffer.insert(self.cursor, c);
                    self.cursor += 1;
                }
                KeyInput::Backspace => {
                    if self.cursor > 0 {
                        self.cursor -= 1;
                        self.buffer.remove(self.cursor);
                    }
                }
                KeyInput::Delete => {
                    if self.cursor < self.buffer.len() {
                        self.buffer.remove(self.cursor);
                    }
                }
                KeyInput::Left => self.cursor = self.cursor.saturating_sub(1),
                KeyInput::Right => self.cursor = (self.cursor + 1).min(self.buffer.len()),
                KeyInput::Home => self.cursor = 0,
                KeyInput::End => self.cursor = self.buffer.len(),
                KeyInput::KillLine => {
                    self.buffer.drain(..self.cursor);
                    self.cursor = 0;
                }
                KeyInput::Tab => self.complete()?,
            }
            let line: String = self.buffer.iter().collect();
            self.screen.update_input(&line, self.cursor)?;
        }
    }

    fn complete(&mut self) -> io::Result<()> {
        let Some(completer) = &self.completer else {
            return Ok(());
        };
        let start = self.buffer[..self.cursor]
            .iter()
            .rposition(|c| WORD_DELIMITERS.contains(c))
            .map_or(0, |i| i + 1);
        let word: String = self.buffer[start..self.cursor].iter().collect();
        let candidates = completer.complete(&word);
        debug!("{} completions for {:?}", candidates.len(), word);

        let replacement = match candidates.len() {
            0 => return Ok(()),
            1 => candidates[0].clone(),
            _ => {
                let prefix = longest_common_prefix(&candidates);
                if prefix.chars().count() > word.chars().count() {
                    prefix
                } else {
                    return self.screen.println(&candidates.join("  "));
                }
            }
        };
        let replacement: Vec<char> = replacement.chars().collect();
        self.cursor = start + replacement.len();
        self.buffer.splice(start..start + word.chars().count(), replacement);
        Ok(())
    }
}

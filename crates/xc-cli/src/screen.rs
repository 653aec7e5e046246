//! Terminal renderer
//!
//! [`Screen`] is the only writer to the terminal. The line editor reports its
//! buffer through it, the dispatcher prints command output through it, and the
//! event side prints notifications through a [`NotificationSink`]. Because
//! every write takes the same lock, a notification can never interleave with a
//! half-drawn input line: it erases the line, prints itself, then redraws the
//! prompt and the unfinished input with the cursor where the user left it.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossterm::{
    cursor::{MoveLeft, MoveToColumn},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};

const NEWLINE: &str = "\r\n";

struct ScreenState {
    out: Box<dyn Write + Send>,
    prompt: String,
    buffer: String,
    /// Cursor position in chars from the start of `buffer`
    cursor: usize,
    /// Whether a prompt is currently drawn on the last line
    input_active: bool,
}

impl ScreenState {
    fn draw_input(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(&self.prompt),
            Print(&self.buffer)
        )?;
        let trailing = self.buffer.chars().count().saturating_sub(self.cursor);
        if trailing > 0 {
            queue!(self.out, MoveLeft(trailing.min(u16::MAX as usize) as u16))?;
        }
        Ok(())
    }

    fn write_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> io::Result<()> {
        if self.input_active {
            queue!(self.out, Clear(ClearType::CurrentLine), MoveToColumn(0))?;
        }
        for line in lines {
            queue!(self.out, Print(line), Print(NEWLINE))?;
        }
        if self.input_active {
            self.draw_input()?;
        }
        self.out.flush()
    }
}

/// Cloneable handle to the single terminal owner
#[derive(Clone)]
pub struct Screen {
    state: Arc<Mutex<ScreenState>>,
}

impl Screen {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScreenState {
                out: Box::new(out),
                prompt: String::new(),
                buffer: String::new(),
                cursor: 0,
                input_active: false,
            })),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    fn state(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show a fresh prompt with an empty input buffer
    pub fn begin_input(&self, prompt: &str) -> io::Result<()> {
        let mut state = self.state();
        state.prompt = prompt.to_string();
        state.buffer.clear();
        state.cursor = 0;
        state.input_active = true;
        state.draw_input()?;
        state.out.flush()
    }

    /// Redraw the input line after an edit
    pub fn update_input(&self, buffer: &str, cursor: usize) -> io::Result<()> {
        let mut state = self.state();
        state.buffer = buffer.to_string();
        state.cursor = cursor;
        state.draw_input()?;
        state.out.flush()
    }

    /// Leave the input line as typed and move below it
    pub fn end_input(&self) -> io::Result<()> {
        let mut state = self.state();
        state.input_active = false;
        queue!(state.out, Print(NEWLINE))?;
        state.out.flush()
    }

    /// Print a line above the prompt, redrawing any in-progress input
    pub fn println(&self, line: &str) -> io::Result<()> {
        self.state().write_lines([line])
    }

    /// Print several lines as one uninterrupted block
    pub fn print_block(&self, lines: &[String]) -> io::Result<()> {
        self.state().write_lines(lines.iter().map(String::as_str))
    }

    pub fn notification_sink(&self) -> NotificationSink {
        NotificationSink {
            screen: self.clone(),
        }
    }
}

/// Event-side handle for asynchronous notifications.
///
/// Notifications are rendered one at a time, in call order.
#[derive(Clone)]
pub struct NotificationSink {
    screen: Screen,
}

impl NotificationSink {
    pub fn notify(&self, text: &str) -> io::Result<()> {
        self.screen.println(text)
    }
}

/// In-memory terminal for tests and transcripts
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear(&self) {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERASE_LINE: &str = "\x1b[2K";

    fn screen() -> (Screen, CaptureBuffer) {
        let capture = CaptureBuffer::new();
        (Screen::new(capture.clone()), capture)
    }

    #[test]
    fn test_notification_over_partial_input() {
        let (screen, capture) = screen();
        screen.begin_input("> ").unwrap();
        screen.update_input("Bo", 2).unwrap();
        capture.clear();

        screen.notification_sink().notify("alice@example.com/pc is now away").unwrap();

        let out = capture.contents();
        let erase = out.find(ERASE_LINE).expect("line erase");
        let text = out.find("alice@example.com/pc is now away\r\n").expect("notification");
        assert_eq!(erase, 0);
        assert!(erase < text);
        assert!(out.ends_with("> Bo"), "unexpected tail: {:?}", out);
    }

    #[test]
    fn test_redraw_restores_cursor_inside_buffer() {
        let (screen, capture) = screen();
        screen.begin_input("Bob> ").unwrap();
        screen.update_input("helo", 2).unwrap();
        capture.clear();

        screen.println("ping").unwrap();
        let out = capture.contents();
        let tail = out.rsplit("Bob> ").next().unwrap();
        assert!(tail.starts_with("helo"));
        // Cursor moved back over the two chars after it
        assert!(tail.ends_with("\x1b[2D"), "unexpected tail: {:?}", tail);
    }

    #[test]
    fn test_output_without_active_prompt_is_plain() {
        let (screen, capture) = screen();
        screen.println("hello").unwrap();
        assert_eq!(capture.contents(), "hello\r\n");

        screen.begin_input("> ").unwrap();
        screen.end_input().unwrap();
        capture.clear();
        screen.print_block(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(capture.contents(), "a\r\nb\r\n");
    }

    #[test]
    fn test_concurrent_notifications_do_not_interleave() {
        let (screen, capture) = screen();
        screen.begin_input("> ").unwrap();
        screen.update_input("draft", 5).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = screen.notification_sink();
                std::thread::spawn(move || {
                    for j in 0..20 {
                        sink.notify(&format!("note-{}-{}", i, j)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let out = capture.contents();
        for i in 0..8 {
            for j in 0..20 {
                let line = format!("{}note-{}-{}\r\n", "\x1b[1G", i, j);
                assert!(out.contains(&line), "missing intact {:?}", line);
            }
        }
        assert!(out.ends_with("> draft"));
    }
}

use std::io::{self, BufReader, Bytes, Read, Stdin, Write};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lineedit::{BACKSPACE, DELETE, ESC};

/// Character stream the menu talks to.
pub trait Terminal {
    /// Block until the next input character arrives.
    fn read_char(&mut self) -> anyhow::Result<char>;
    fn write_str(&mut self, text: &str) -> anyhow::Result<()>;
}

/// Interactive terminal in raw mode. Raw mode is left again on drop.
pub struct RawTerminal {
    out: io::Stdout,
}

impl RawTerminal {
    pub fn new() -> anyhow::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self { out: io::stdout() })
    }

    /// Count down `secs` seconds, printing `\rN...` each second. Returns
    /// whether Enter was pressed before the countdown ran out.
    pub fn wait_for_enter(&mut self, secs: u32) -> anyhow::Result<bool> {
        for remaining in (1..=secs).rev() {
            self.write_str(&format!("\r{remaining}... "))?;
            let deadline = Instant::now() + Duration::from_secs(1);
            loop {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() || !event::poll(left)? {
                    break;
                }
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && key.code == KeyCode::Enter {
                        self.write_str("\n")?;
                        return Ok(true);
                    }
                    if is_interrupt(&key) {
                        anyhow::bail!("interrupted");
                    }
                }
            }
        }
        self.write_str("\n")?;
        Ok(false)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        crossterm::terminal::disable_raw_mode().ok();
    }
}

impl Terminal for RawTerminal {
    fn read_char(&mut self) -> anyhow::Result<char> {
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind == KeyEventKind::Release {
                continue;
            }
            if is_interrupt(&key) {
                anyhow::bail!("interrupted");
            }
            if let Some(ch) = key_to_char(key.code) {
                return Ok(ch);
            }
        }
    }

    fn write_str(&mut self, text: &str) -> anyhow::Result<()> {
        self.out.write_all(crlf(text).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
}

fn key_to_char(code: KeyCode) -> Option<char> {
    match code {
        KeyCode::Char(ch) => Some(ch),
        KeyCode::Enter => Some('\r'),
        KeyCode::Esc => Some(ESC),
        KeyCode::Backspace => Some(BACKSPACE),
        KeyCode::Delete => Some(DELETE),
        _ => None,
    }
}

/// Raw mode does not translate `\n`; turn lone newlines into `\r\n`.
fn crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev = None;
    for ch in text.chars() {
        if ch == '\n' && prev != Some('\r') {
            out.push('\r');
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

/// Piped or redirected stdin, read byte by byte. End of input is an error.
pub struct StdioTerminal {
    input: Bytes<BufReader<Stdin>>,
    out: io::Stdout,
}

impl StdioTerminal {
    pub fn new() -> Self {
        Self {
            input: BufReader::new(io::stdin()).bytes(),
            out: io::stdout(),
        }
    }
}

impl Default for StdioTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for StdioTerminal {
    fn read_char(&mut self) -> anyhow::Result<char> {
        match self.input.next() {
            Some(byte) => Ok(char::from(byte?)),
            None => anyhow::bail!("input closed"),
        }
    }

    fn write_str(&mut self, text: &str) -> anyhow::Result<()> {
        self.out.write_all(text.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Scripted keystrokes and captured output, for driving the menu in tests.
#[cfg(test)]
pub struct Scripted {
    input: std::collections::VecDeque<char>,
    pub output: String,
}

#[cfg(test)]
impl Scripted {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            output: String::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

#[cfg(test)]
impl Terminal for Scripted {
    fn read_char(&mut self) -> anyhow::Result<char> {
        self.input
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }

    fn write_str(&mut self, text: &str) -> anyhow::Result<()> {
        self.output.push_str(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_only_fixes_lone_newlines() {
        assert_eq!(crlf("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(crlf("\n\n"), "\r\n\r\n");
    }

    #[test]
    fn keys_map_to_serial_characters() {
        assert_eq!(key_to_char(KeyCode::Enter), Some('\r'));
        assert_eq!(key_to_char(KeyCode::Esc), Some(ESC));
        assert_eq!(key_to_char(KeyCode::Backspace), Some(BACKSPACE));
        assert_eq!(key_to_char(KeyCode::Char('7')), Some('7'));
        assert_eq!(key_to_char(KeyCode::Up), None);
    }

    #[test]
    fn ctrl_c_interrupts() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(is_interrupt(&key));
        assert!(!is_interrupt(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
    }

    #[test]
    fn scripted_runs_dry() {
        let mut term = Scripted::new("1");
        assert_eq!(term.read_char().unwrap(), '1');
        assert!(term.read_char().is_err());
    }
}

use crate::{BACKSPACE, DELETE, ERASE, ESC, Entry};

/// Longest buffer accepted before the entry is confirmed automatically.
pub const DEFAULT_MAX_LEN: usize = 15;

/// Which characters an editing session accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Digits only.
    Unsigned,
    /// Digits, a leading `-` and a single `.`.
    Decimal,
    /// A single `Y`, `y`, `N` or `n`.
    YesNo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Accumulating,
    Confirmed,
    Cancelled,
}

/// State for a single line of numeric or yes/no entry.
#[derive(Debug, Clone)]
pub struct LineEditor {
    mode: Mode,
    value: String,
    max_len: usize,
    state: State,
}

impl LineEditor {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            value: String::new(),
            max_len: DEFAULT_MAX_LEN,
            state: State::Accumulating,
        }
    }

    pub fn unsigned() -> Self {
        Self::new(Mode::Unsigned)
    }

    pub fn decimal() -> Self {
        Self::new(Mode::Decimal)
    }

    pub fn yes_no() -> Self {
        Self::new(Mode::YesNo)
    }

    /// Limit the buffer length. Numeric sessions confirm as soon as the
    /// limit is reached.
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len.max(1);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_done(&self) -> bool {
        self.state != State::Accumulating
    }

    /// Feed one input character, appending whatever should be echoed to `echo`.
    ///
    /// Characters fed after the session settled are ignored.
    pub fn feed(&mut self, ch: char, echo: &mut String) {
        if self.is_done() {
            return;
        }

        match ch {
            '\r' | '\n' => self.settle(State::Confirmed, echo),
            ESC => self.settle(State::Cancelled, echo),
            BACKSPACE | DELETE => {
                if self.value.pop().is_some() {
                    echo.push_str(ERASE);
                }
            }
            _ if self.accepts(ch) => {
                self.value.push(ch);
                echo.push(ch);
                if self.mode != Mode::YesNo && self.value.len() >= self.max_len {
                    self.settle(State::Confirmed, echo);
                }
            }
            _ => {}
        }
    }

    /// The settled result, or `None` while still accumulating.
    pub fn entry(&self) -> Option<Entry> {
        match self.state {
            State::Accumulating => None,
            State::Cancelled => Some(Entry::Cancelled),
            State::Confirmed if self.value.is_empty() => Some(Entry::Empty),
            State::Confirmed => Some(Entry::Text(self.value.clone())),
        }
    }

    fn accepts(&self, ch: char) -> bool {
        match self.mode {
            Mode::Unsigned => ch.is_ascii_digit(),
            Mode::Decimal => match ch {
                '0'..='9' => true,
                '-' => self.value.is_empty(),
                '.' => !self.value.contains('.'),
                _ => false,
            },
            Mode::YesNo => self.value.is_empty() && matches!(ch, 'Y' | 'y' | 'N' | 'n'),
        }
    }

    fn settle(&mut self, state: State, echo: &mut String) {
        self.state = state;
        echo.push_str("\r\n");
    }
}

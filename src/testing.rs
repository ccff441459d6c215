//! In-memory stand-ins for the terminal and the serial port

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use crate::core::port::{LinkError, Result as LinkResult, SerialLink};
use crate::ui::Screen;

/// Shared record of teardown steps, in the order they happened
pub type Events = Rc<RefCell<Vec<&'static str>>>;

/// Character grid that records every write
pub struct FakeScreen {
    pub cols: u16,
    pub rows: u16,
    pub grid: Vec<Vec<char>>,
    pub cursor: (u16, u16),
    /// Scripted keystrokes; `None` entries stand for an idle poll
    pub keys: VecDeque<Option<u8>>,
    pub refreshes: usize,
    /// Receives `"restore"` when the terminal is handed back
    pub events: Events,
}

impl FakeScreen {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            rows,
            grid: vec![vec![' '; cols as usize]; rows as usize],
            cursor: (0, 0),
            keys: VecDeque::new(),
            refreshes: 0,
            events: Events::default(),
        }
    }

    /// Row contents without trailing blanks
    pub fn row_text(&self, row: u16) -> String {
        let text: String = self.grid[row as usize].iter().collect();
        text.trim_end().to_string()
    }

    pub fn push_keys(&mut self, keys: &[u8]) {
        self.keys.extend(keys.iter().map(|k| Some(*k)));
    }
}

impl Screen for FakeScreen {
    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    fn put_str(&mut self, row: u16, col: u16, text: &str) -> io::Result<()> {
        let line = self
            .grid
            .get_mut(row as usize)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "row out of range"))?;
        for (offset, ch) in text.chars().enumerate() {
            if let Some(cell) = line.get_mut(col as usize + offset) {
                *cell = ch;
            }
        }
        Ok(())
    }

    fn park_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        self.cursor = (row, col);
        Ok(())
    }

    fn refresh(&mut self) -> io::Result<()> {
        self.refreshes += 1;
        Ok(())
    }

    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        Ok(self.keys.pop_front().flatten())
    }

    fn restore(&mut self) -> io::Result<()> {
        self.events.borrow_mut().push("restore");
        Ok(())
    }
}

/// Serial port with scripted input and recorded output
#[derive(Default)]
pub struct FakeLink {
    /// One entry per poll; each is what `read_available` returns
    pub incoming: VecDeque<Vec<u8>>,
    pub sent: Vec<u8>,
    pub rts: bool,
    pub dtr: bool,
    /// Successive CTS samples; the last one repeats
    pub cts: VecDeque<bool>,
    pub dsr: VecDeque<bool>,
    /// Make the next read fail like a disconnected device
    pub fail_read: bool,
    /// Receives `"link"` when the port is closed
    pub events: Events,
}

impl FakeLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn sample(levels: &mut VecDeque<bool>) -> bool {
        if levels.len() > 1 {
            levels.pop_front().unwrap_or(false)
        } else {
            levels.front().copied().unwrap_or(false)
        }
    }
}

impl SerialLink for FakeLink {
    fn read_available(&mut self) -> LinkResult<Vec<u8>> {
        if self.fail_read {
            return Err(LinkError::Read(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        Ok(self.incoming.pop_front().unwrap_or_default())
    }

    fn write_byte(&mut self, byte: u8) -> LinkResult<()> {
        self.sent.push(byte);
        Ok(())
    }

    fn set_rts(&mut self, level: bool) -> LinkResult<()> {
        self.rts = level;
        Ok(())
    }

    fn set_dtr(&mut self, level: bool) -> LinkResult<()> {
        self.dtr = level;
        Ok(())
    }

    fn cts(&mut self) -> LinkResult<bool> {
        Ok(Self::sample(&mut self.cts))
    }

    fn dsr(&mut self) -> LinkResult<bool> {
        Ok(Self::sample(&mut self.dsr))
    }

    fn flush_input(&mut self) -> LinkResult<()> {
        self.incoming.clear();
        Ok(())
    }
}

impl Drop for FakeLink {
    fn drop(&mut self) {
        self.events.borrow_mut().push("link");
    }
}

/// Log sink that discards output and reports when it is closed
pub struct RecordingWriter {
    events: Events,
}

impl RecordingWriter {
    pub fn new(events: Events) -> Self {
        Self { events }
    }
}

impl Write for RecordingWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RecordingWriter {
    fn drop(&mut self) {
        self.events.borrow_mut().push("log");
    }
}

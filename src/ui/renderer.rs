//! Screen backend using crossterm
//!
//! The monitor draws with absolute-position string writes and reads the
//! keyboard one keystroke at a time without blocking, the way a curses
//! program would. [`Screen`] is that contract; [`Renderer`] implements it on
//! a real terminal.

use std::collections::VecDeque;
use std::io::{self, BufWriter, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor::{MoveTo, Show},
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::{Attribute, Print, ResetColor, SetAttribute},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use tracing::{debug, info};

use super::keymapper::KeyMapper;

/// Drawing and keyboard surface used by the monitor
pub trait Screen {
    /// Screen size as `(cols, rows)`
    fn size(&self) -> (u16, u16);

    /// Write `text` starting at `(row, col)`
    fn put_str(&mut self, row: u16, col: u16, text: &str) -> io::Result<()>;

    /// Move the visible cursor
    fn park_cursor(&mut self, row: u16, col: u16) -> io::Result<()>;

    /// Push pending output to the display
    fn refresh(&mut self) -> io::Result<()>;

    /// Next keystroke as a byte value, `None` if nothing is waiting
    fn poll_key(&mut self) -> io::Result<Option<u8>>;

    /// Give the terminal back to the shell
    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Terminal renderer
pub struct Renderer {
    out: BufWriter<Stdout>,
    cols: u16,
    rows: u16,
    /// Bytes of a multi-byte keystroke not yet handed out
    pending_keys: VecDeque<u8>,
    /// Whether the terminal is in raw mode on the alternate screen
    initialized: bool,
}

impl Renderer {
    /// Current terminal size as `(cols, rows)`
    pub fn terminal_size() -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Switch the terminal to raw mode on a cleared alternate screen
    pub fn init() -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        terminal::enable_raw_mode()?;

        let mut renderer = Self {
            out: BufWriter::with_capacity(16384, io::stdout()),
            cols,
            rows,
            pending_keys: VecDeque::new(),
            initialized: true,
        };
        execute!(
            renderer.out,
            EnterAlternateScreen,
            DisableLineWrap,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        info!("Terminal initialized: {}x{}", cols, rows);
        Ok(renderer)
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let _ = execute!(self.out, ResetColor, SetAttribute(Attribute::Reset));
        let _ = execute!(self.out, Show, EnableLineWrap, LeaveAlternateScreen);
        let _ = self.out.flush();

        // Raw mode off is the part that matters for the shell
        terminal::disable_raw_mode()?;
        info!("Terminal restored");
        Ok(())
    }

    /// Pull terminal events until one produces key bytes or none are left
    fn fill_pending(&mut self) -> io::Result<()> {
        while self.pending_keys.is_empty() && event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(bytes) = KeyMapper::map(&key) {
                        self.pending_keys.extend(bytes);
                    }
                }
                Event::Resize(cols, rows) => {
                    // Pane geometry is fixed for the session
                    debug!("Ignoring resize to {}x{}", cols, rows);
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Screen for Renderer {
    fn size(&self) -> (u16, u16) {
        (self.cols, self.rows)
    }

    fn put_str(&mut self, row: u16, col: u16, text: &str) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row), Print(text))
    }

    fn park_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col.min(self.cols.saturating_sub(1)), row))
    }

    fn refresh(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn poll_key(&mut self) -> io::Result<Option<u8>> {
        self.fill_pending()?;
        Ok(self.pending_keys.pop_front())
    }

    fn restore(&mut self) -> io::Result<()> {
        self.cleanup()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

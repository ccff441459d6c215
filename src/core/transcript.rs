//! Session transcript
//!
//! Every byte received, every byte sent and every signal change goes into a
//! plain text file, grouped into runs by origin:
//!
//! ```text
//! [IN ] Hello from the device
//!       second line
//! [OUT] ping
//! [SIGNAL] RTS True
//! [IN ] pong
//! ```
//!
//! The file is flushed after each write so it stays current even if the
//! process dies between polls.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Origin of a logged run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogClass {
    /// Received from the device
    In,
    /// Typed by the operator and transmitted
    Out,
    /// Control line transition
    Signal,
}

impl LogClass {
    /// Tag written at the start of a run
    pub fn tag(self) -> &'static str {
        match self {
            LogClass::In => "[IN ] ",
            LogClass::Out => "[OUT] ",
            LogClass::Signal => "[SIGNAL] ",
        }
    }
}

/// Indentation written after a line break inside an IN or OUT run
const CONTINUATION: &str = "      ";

/// Append-only, class-grouped session log
pub struct SessionLog<W: Write> {
    writer: W,
    /// Class of the last run, `None` until the first write
    last_class: Option<LogClass>,
    path: Option<PathBuf>,
}

impl SessionLog<File> {
    /// Create the log file for a session started at `started`.
    ///
    /// The file is named `YYYY_MM_DD_HHMM.txt`; if that exists a numeric
    /// suffix is added rather than overwriting an earlier session.
    pub fn create(dir: &Path, started: DateTime<Local>) -> io::Result<Self> {
        let stem = started.format("%Y_%m_%d_%H%M").to_string();
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{}.txt", stem)
            } else {
                format!("{}_{}.txt", stem, attempt)
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    tracing::info!("Session log: {}", path.display());
                    let mut log = Self::new(file);
                    log.path = Some(path);
                    return Ok(log);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < 1000 => {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<W: Write> SessionLog<W> {
    /// Wrap an arbitrary writer
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            last_class: None,
            path: None,
        }
    }

    /// Path of the backing file, if file backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Class of the most recent run
    #[cfg(test)]
    pub fn last_class(&self) -> Option<LogClass> {
        self.last_class
    }

    /// Start a new run if `class` differs from the current one
    fn switch_class(&mut self, class: LogClass) -> io::Result<()> {
        if self.last_class == Some(class) {
            return Ok(());
        }
        if self.last_class.is_some() {
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(class.tag().as_bytes())?;
        self.last_class = Some(class);
        Ok(())
    }

    fn put(&mut self, class: LogClass, ch: char) -> io::Result<()> {
        self.switch_class(class)?;
        let mut buf = [0u8; 4];
        self.writer.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
        if ch == '\n' && class != LogClass::Signal {
            self.writer.write_all(CONTINUATION.as_bytes())?;
        }
        Ok(())
    }

    /// Log a single canonical character
    pub fn log(&mut self, class: LogClass, ch: char) -> io::Result<()> {
        self.put(class, ch)?;
        self.writer.flush()
    }

    /// Log a run of canonical characters with a single flush
    pub fn log_str(&mut self, class: LogClass, text: &str) -> io::Result<()> {
        for ch in text.chars() {
            self.put(class, ch)?;
        }
        self.writer.flush()
    }

    /// Log a labelled value (signal transitions).
    ///
    /// Always starts its own `[SIGNAL]` line; booleans are written as
    /// `True`/`False`.
    pub fn log_value(&mut self, label: &str, value: bool) -> io::Result<()> {
        if self.last_class.is_some() {
            self.writer.write_all(b"\n")?;
        }
        let value = if value { "True" } else { "False" };
        write!(self.writer, "{}{} {}", LogClass::Signal.tag(), label, value)?;
        self.last_class = Some(LogClass::Signal);
        self.writer.flush()
    }

    /// Final flush, handing back the writer
    pub fn close(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

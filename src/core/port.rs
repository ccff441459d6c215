//! Serial port wrapper
//!
//! This module hides the `serialport` crate behind the small [`SerialLink`]
//! trait used by the monitor loop, so the loop can be driven by a fake in
//! tests.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to query serial port: {0}")]
    Query(#[source] serialport::Error),

    #[error("Failed to set {signal}: {source}")]
    Control {
        signal: &'static str,
        #[source]
        source: serialport::Error,
    },

    #[error("Failed to read from serial port: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write to serial port: {0}")]
    Write(#[source] io::Error),

    #[error("Invalid baud rate: {0}")]
    InvalidBaud(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Operations the monitor needs from a serial connection.
///
/// All reads are non-blocking: `read_available` returns an empty vector when
/// nothing is buffered.
pub trait SerialLink {
    /// Drain every byte currently buffered by the driver
    fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Transmit one byte
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Drive the RTS line
    fn set_rts(&mut self, level: bool) -> Result<()>;

    /// Drive the DTR line
    fn set_dtr(&mut self, level: bool) -> Result<()>;

    /// Sample the CTS line
    fn cts(&mut self) -> Result<bool>;

    /// Sample the DSR line
    fn dsr(&mut self) -> Result<bool>;

    /// Discard anything received but not yet read
    fn flush_input(&mut self) -> Result<()>;
}

/// Parse a baud rate argument; must be a positive integer
pub fn parse_baud(text: &str) -> Result<u32> {
    match text.trim().parse::<u32>() {
        Ok(baud) if baud > 0 => Ok(baud),
        _ => Err(LinkError::InvalidBaud(text.to_string())),
    }
}

/// List the names of serial ports present on this machine
pub fn available_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(LinkError::Query)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// A real serial connection
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialPortLink {
    /// Open `name` at `baud`, 8 data bits, no parity, two stop bits, no flow control.
    ///
    /// RTS and DTR are forced low and stale input is discarded.
    pub fn open(name: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(name, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|source| LinkError::Open {
                port: name.to_string(),
                source,
            })?;

        let mut link = Self {
            port,
            name: name.to_string(),
        };
        link.set_rts(false)?;
        link.set_dtr(false)?;
        link.flush_input()?;

        info!("Opened {} at {} baud", name, baud);
        Ok(link)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SerialLink for SerialPortLink {
    fn read_available(&mut self) -> Result<Vec<u8>> {
        let pending = self.port.bytes_to_read().map_err(LinkError::Query)? as usize;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; pending];
        let mut filled = 0;
        while filled < pending {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::Read(e)),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.port.write_all(&[byte]).map_err(LinkError::Write)?;
        self.port.flush().map_err(LinkError::Write)
    }

    fn set_rts(&mut self, level: bool) -> Result<()> {
        debug!("RTS -> {}", level);
        self.port
            .write_request_to_send(level)
            .map_err(|source| LinkError::Control { signal: "RTS", source })
    }

    fn set_dtr(&mut self, level: bool) -> Result<()> {
        debug!("DTR -> {}", level);
        self.port
            .write_data_terminal_ready(level)
            .map_err(|source| LinkError::Control { signal: "DTR", source })
    }

    fn cts(&mut self) -> Result<bool> {
        self.port.read_clear_to_send().map_err(LinkError::Query)
    }

    fn dsr(&mut self) -> Result<bool> {
        self.port.read_data_set_ready().map_err(LinkError::Query)
    }

    fn flush_input(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(LinkError::Query)
    }
}

impl Drop for SerialPortLink {
    fn drop(&mut self) {
        info!("Closing {}", self.name);
    }
}

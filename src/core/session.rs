//! Monitor session
//!
//! Drives the poll loop: drain the serial port into the RX pane, handle at
//! most one keystroke, then re-sample the inbound control lines. Every step
//! is also written to the session log in the same order.

use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::canon::{display_char, LineCanonicalizer, LF};
use super::port::SerialLink;
use super::signals::{Signal, SignalTracker};
use super::transcript::{LogClass, SessionLog};
use crate::ui::layout::{self, Layout};
use crate::ui::{Screen, ScrollPane};

/// Ctrl+C; raw mode delivers it as a key instead of a signal
pub const KEY_INTERRUPT: u8 = 0x03;
/// Ctrl+D toggles DTR
pub const KEY_TOGGLE_DTR: u8 = 0x04;
/// Ctrl+R toggles RTS
pub const KEY_TOGGLE_RTS: u8 = 0x12;
/// ESC discards the following keystroke
pub const KEY_ESCAPE: u8 = 0x1B;

/// Outcome of one loop iteration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Nothing arrived from either source
    Idle,
    /// Data or a keystroke was handled
    Busy,
    /// The operator asked to quit
    Interrupted,
}

/// Session settings that do not come from the hardware
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Shown in the divider bars
    pub port_name: String,
    pub rx_marker: String,
    pub tx_marker: String,
    /// Pause after an idle iteration; zero spins
    pub poll_interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            rx_marker: ">>>".to_string(),
            tx_marker: "<<<".to_string(),
            poll_interval: Duration::from_millis(2),
        }
    }
}

/// A running monitor session.
///
/// Fields drop in declaration order, so the terminal is restored before the
/// log is closed, and the log before the port.
pub struct Monitor<L: SerialLink, S: Screen, W: Write> {
    screen: S,
    log: SessionLog<W>,
    link: L,
    layout: Layout,
    rx: ScrollPane,
    tx: ScrollPane,
    canon: LineCanonicalizer,
    signals: SignalTracker,
    /// Set by ESC: the next keystroke is dropped until an idle poll
    escape_pending: bool,
    options: MonitorOptions,
}

impl<L: SerialLink, S: Screen, W: Write> Monitor<L, S, W> {
    pub fn new(link: L, screen: S, log: SessionLog<W>, layout: Layout, options: MonitorOptions) -> Self {
        let rx = ScrollPane::new(
            &options.rx_marker,
            layout.rx.top,
            layout.rx.bottom,
            layout.rx.left,
            layout.rx.right,
        );
        let tx = ScrollPane::new(
            &options.tx_marker,
            layout.tx.top,
            layout.tx.bottom,
            layout.tx.left,
            layout.tx.right,
        );
        Self {
            screen,
            log,
            link,
            layout,
            rx,
            tx,
            canon: LineCanonicalizer::new(),
            signals: SignalTracker::new(),
            escape_pending: false,
            options,
        }
    }

    /// Draw dividers and pane markers
    pub fn draw_frame(&mut self) -> Result<()> {
        let (cols, rows) = self.screen.size();
        if (cols, rows) != (self.layout.cols, self.layout.rows) {
            warn!(
                "Screen is {}x{}, laid out for {}x{}",
                cols, rows, self.layout.cols, self.layout.rows
            );
        }
        let cols = self.layout.cols;
        let port = &self.options.port_name;
        if let Some(line) = layout::divider_line(&layout::rx_label(port), cols) {
            self.screen.put_str(self.layout.rx_divider, 0, &line)?;
        }
        if let Some(line) = layout::divider_line(&layout::tx_label(port), cols) {
            self.screen.put_str(self.layout.tx_divider, 0, &line)?;
        }
        self.rx.draw_marker(&mut self.screen)?;
        self.tx.draw_marker(&mut self.screen)?;
        self.present()
    }

    /// Park the cursor at the transmit position and flush
    fn present(&mut self) -> Result<()> {
        let (row, col) = self.tx.cursor();
        self.screen.park_cursor(row, col)?;
        self.screen.refresh().context("Failed to update screen")
    }

    /// Run until interrupted or the device fails
    pub fn run(&mut self) -> Result<()> {
        info!("Monitoring {}", self.options.port_name);
        loop {
            match self.step()? {
                Step::Interrupted => {
                    info!("Interrupted by operator");
                    return Ok(());
                }
                Step::Idle if !self.options.poll_interval.is_zero() => {
                    thread::sleep(self.options.poll_interval);
                }
                _ => {}
            }
        }
    }

    /// One iteration: receive, one keystroke, control lines
    pub fn step(&mut self) -> Result<Step> {
        let received = self.receive()?;
        let key_step = self.handle_key()?;
        self.sample_signals()?;

        Ok(match key_step {
            Step::Idle if received => Step::Busy,
            other => other,
        })
    }

    /// Drain the port into the RX pane and the log
    fn receive(&mut self) -> Result<bool> {
        let raw = self.link.read_available()?;
        if raw.is_empty() {
            return Ok(false);
        }

        let text = self.canon.feed(&raw);
        debug!("Received {} bytes", raw.len());

        for ch in text.chars() {
            self.rx.write(&mut self.screen, ch)?;
        }
        self.present()?;

        self.log
            .log_str(LogClass::In, &text)
            .context("Failed to write session log")?;
        Ok(true)
    }

    /// Handle at most one keystroke
    fn handle_key(&mut self) -> Result<Step> {
        let Some(key) = self.screen.poll_key().context("Failed to read keyboard")? else {
            self.escape_pending = false;
            return Ok(Step::Idle);
        };

        match key {
            k if k == LF || k >= 0x20 => {
                if !self.escape_pending {
                    self.transmit(k)?;
                }
            }
            KEY_ESCAPE => self.escape_pending = true,
            KEY_TOGGLE_DTR => self.toggle(Signal::Dtr)?,
            KEY_TOGGLE_RTS => self.toggle(Signal::Rts)?,
            KEY_INTERRUPT => return Ok(Step::Interrupted),
            // CR and the remaining control keys are swallowed
            other => debug!("Ignoring key {:#04x}", other),
        }
        Ok(Step::Busy)
    }

    /// Send one typed byte, echo it to the TX pane and log it
    fn transmit(&mut self, byte: u8) -> Result<()> {
        self.link.write_byte(byte)?;

        let ch = if byte == LF { '\n' } else { display_char(byte) };
        self.tx.write(&mut self.screen, ch)?;
        self.present()?;

        self.log
            .log(LogClass::Out, ch)
            .context("Failed to write session log")
    }

    /// Flip an outbound control line
    fn toggle(&mut self, signal: Signal) -> Result<()> {
        let level = self.signals.toggle_outbound(signal);
        match signal {
            Signal::Rts => self.link.set_rts(level)?,
            Signal::Dtr => self.link.set_dtr(level)?,
            Signal::Cts | Signal::Dsr => return Ok(()),
        }
        info!("{} set to {}", signal.label(), level);
        self.show_signal(signal, level)
    }

    /// Report inbound control line edges
    fn sample_signals(&mut self) -> Result<()> {
        let cts = self.link.cts()?;
        if let Some(level) = self.signals.sample_inbound(Signal::Cts, cts) {
            info!("CTS changed to {}", level);
            self.show_signal(Signal::Cts, level)?;
        }

        let dsr = self.link.dsr()?;
        if let Some(level) = self.signals.sample_inbound(Signal::Dsr, dsr) {
            info!("DSR changed to {}", level);
            self.show_signal(Signal::Dsr, level)?;
        }
        Ok(())
    }

    fn show_signal(&mut self, signal: Signal, level: bool) -> Result<()> {
        let (row, col) = self.layout.indicator_position(signal);
        self.screen.put_str(row, col, &signal.indicator(level))?;
        self.present()?;

        self.log
            .log_value(signal.label(), level)
            .context("Failed to write session log")
    }

    /// Restore the terminal, close the log, close the port, in that order.
    ///
    /// Every step runs even if an earlier one fails; the first error is returned.
    pub fn shutdown(self) -> Result<()> {
        let Monitor {
            mut screen,
            log,
            link,
            ..
        } = self;

        let restored = screen.restore().context("Failed to restore terminal");
        drop(screen);

        let closed = log.close().map(|_| ()).context("Failed to close session log");
        drop(link);

        if let Err(ref e) = closed {
            warn!("{:#}", e);
        }
        restored.and(closed)
    }

    #[cfg(test)]
    fn parts(&self) -> (&S, &L, &SignalTracker) {
        (&self.screen, &self.link, &self.signals)
    }

    #[cfg(test)]
    fn rx_cursor(&self) -> (u16, u16) {
        self.rx.cursor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Events, FakeLink, FakeScreen, RecordingWriter};

    type TestMonitor = Monitor<FakeLink, FakeScreen, Vec<u8>>;

    /// 40x20 screen: RX rows 2..=8, TX rows 12..=18, dividers on 0 and 10
    fn monitor(link: FakeLink, screen: FakeScreen) -> TestMonitor {
        let layout = Layout::new(screen.cols, screen.rows).unwrap();
        let options = MonitorOptions {
            port_name: "COM1".to_string(),
            poll_interval: Duration::ZERO,
            ..MonitorOptions::default()
        };
        let mut monitor = Monitor::new(link, screen, SessionLog::new(Vec::new()), layout, options);
        monitor.draw_frame().unwrap();
        monitor
    }

    fn log_text(monitor: TestMonitor) -> String {
        let Monitor { log, .. } = monitor;
        String::from_utf8(log.close().unwrap()).unwrap()
    }

    #[test]
    fn test_frame() {
        let m = monitor(FakeLink::new(), FakeScreen::new(40, 20));
        let (screen, _, _) = m.parts();
        assert!(screen.row_text(0).contains(" Receiving from \"COM1\" "));
        assert!(screen.row_text(10).contains(" Transmitting to \"COM1\" "));
        assert_eq!(screen.row_text(2), ">>>");
        assert_eq!(screen.row_text(12), "<<<");
        assert_eq!(screen.cursor, (12, 4));
        assert_eq!(screen.refreshes, 1);
    }

    #[test]
    fn test_receive_hello() {
        let mut link = FakeLink::new();
        link.incoming.push_back(vec![72, 105, 13, 10, 33]);
        let mut m = monitor(link, FakeScreen::new(40, 20));

        assert_eq!(m.step().unwrap(), Step::Busy);
        let (screen, _, _) = m.parts();
        assert_eq!(screen.row_text(2), "    Hi");
        assert_eq!(screen.row_text(3), ">>> !");
        assert_eq!(m.rx_cursor(), (3, 5));
        assert_eq!(log_text(m), "[IN ] Hi\n      !");
    }

    #[test]
    fn test_receive_split_pair() {
        let mut link = FakeLink::new();
        link.incoming.push_back(b"ab\r".to_vec());
        link.incoming.push_back(b"\ncd".to_vec());
        let mut m = monitor(link, FakeScreen::new(40, 20));

        m.step().unwrap();
        m.step().unwrap();
        let (screen, _, _) = m.parts();
        assert_eq!(screen.row_text(3), ">>> cd");
        assert_eq!(screen.row_text(4), "");
        assert_eq!(log_text(m), "[IN ] ab\n      cd");
    }

    #[test]
    fn test_typed_keys_transmitted() {
        let mut screen = FakeScreen::new(40, 20);
        screen.push_keys(b"ok\n");
        let mut m = monitor(FakeLink::new(), screen);

        for _ in 0..3 {
            assert_eq!(m.step().unwrap(), Step::Busy);
        }
        let (screen, link, _) = m.parts();
        assert_eq!(link.sent, b"ok\n");
        assert_eq!(screen.row_text(12), "    ok");
        assert_eq!(screen.row_text(13), "<<<");
        assert_eq!(screen.cursor, (13, 4));
        assert_eq!(log_text(m), "[OUT] ok\n      ");
    }

    #[test]
    fn test_escape_discards_next_key() {
        let mut screen = FakeScreen::new(40, 20);
        screen.push_keys(&[KEY_ESCAPE, b'[', b'x']);
        screen.keys.push_back(None);
        screen.push_keys(b"y");
        let mut m = monitor(FakeLink::new(), screen);

        for _ in 0..5 {
            m.step().unwrap();
        }
        let (_, link, _) = m.parts();
        // Everything up to the idle poll is dropped
        assert_eq!(link.sent, b"y");
    }

    #[test]
    fn test_carriage_return_swallowed() {
        let mut screen = FakeScreen::new(40, 20);
        screen.push_keys(&[0x0D, 0x01, b'a']);
        let mut m = monitor(FakeLink::new(), screen);

        for _ in 0..3 {
            m.step().unwrap();
        }
        let (_, link, _) = m.parts();
        assert_eq!(link.sent, b"a");
        assert_eq!(log_text(m), "[OUT] a");
    }

    #[test]
    fn test_toggle_outbound_signals() {
        let mut screen = FakeScreen::new(40, 20);
        screen.push_keys(&[KEY_TOGGLE_RTS, KEY_TOGGLE_DTR, KEY_TOGGLE_RTS]);
        let mut m = monitor(FakeLink::new(), screen);

        for _ in 0..3 {
            m.step().unwrap();
        }
        let (screen, link, signals) = m.parts();
        assert!(!link.rts);
        assert!(link.dtr);
        assert!(signals.get(Signal::Dtr));
        assert!(screen.row_text(10).starts_with("rts "));
        assert!(screen.row_text(10).ends_with(" DTR"));
        assert_eq!(
            log_text(m),
            "[SIGNAL] RTS True\n[SIGNAL] DTR True\n[SIGNAL] RTS False"
        );
    }

    #[test]
    fn test_inbound_edges_logged() {
        let mut link = FakeLink::new();
        link.cts.extend([false, false, true, true, false]);
        let mut m = monitor(link, FakeScreen::new(40, 20));

        for _ in 0..5 {
            m.step().unwrap();
        }
        let (screen, _, _) = m.parts();
        assert!(screen.row_text(0).starts_with("cts "));
        assert_eq!(log_text(m), "[SIGNAL] CTS True\n[SIGNAL] CTS False");
    }

    #[test]
    fn test_iteration_order_in_log() {
        let mut link = FakeLink::new();
        link.incoming.push_back(b"rx".to_vec());
        link.dsr.push_back(true);
        let mut screen = FakeScreen::new(40, 20);
        screen.push_keys(b"t");
        let mut m = monitor(link, screen);

        m.step().unwrap();
        assert_eq!(log_text(m), "[IN ] rx\n[OUT] t\n[SIGNAL] DSR True");
    }

    #[test]
    fn test_interrupt_ends_run() {
        let mut link = FakeLink::new();
        link.incoming.push_back(b"x".to_vec());
        let mut screen = FakeScreen::new(40, 20);
        screen.keys.push_back(None);
        screen.push_keys(&[KEY_INTERRUPT]);
        let mut m = monitor(link, screen);

        m.run().unwrap();
        let (_, link, _) = m.parts();
        assert!(link.sent.is_empty());
    }

    #[test]
    fn test_device_error_ends_run() {
        let mut link = FakeLink::new();
        link.fail_read = true;
        let mut m = monitor(link, FakeScreen::new(40, 20));

        let err = m.run().unwrap_err();
        assert!(err.to_string().contains("Failed to read from serial port"));
    }

    /// Monitor whose screen, log and port all report into one event list
    fn recorded_monitor(
        mut link: FakeLink,
        mut screen: FakeScreen,
    ) -> (Monitor<FakeLink, FakeScreen, RecordingWriter>, Events) {
        let events = Events::default();
        link.events = events.clone();
        screen.events = events.clone();
        let layout = Layout::new(screen.cols, screen.rows).unwrap();
        let options = MonitorOptions {
            poll_interval: Duration::ZERO,
            ..MonitorOptions::default()
        };
        let log = SessionLog::new(RecordingWriter::new(events.clone()));
        let mut monitor = Monitor::new(link, screen, log, layout, options);
        monitor.draw_frame().unwrap();
        (monitor, events)
    }

    #[test]
    fn test_shutdown_order_after_interrupt() {
        let mut link = FakeLink::new();
        link.incoming.push_back(b"bye".to_vec());
        let mut screen = FakeScreen::new(40, 20);
        screen.keys.push_back(None);
        screen.push_keys(&[KEY_INTERRUPT]);
        let (mut m, events) = recorded_monitor(link, screen);

        m.run().unwrap();
        assert!(events.borrow().is_empty());
        m.shutdown().unwrap();
        assert_eq!(*events.borrow(), ["restore", "log", "link"]);
    }

    #[test]
    fn test_shutdown_order_after_device_error() {
        let mut link = FakeLink::new();
        link.fail_read = true;
        let (mut m, events) = recorded_monitor(link, FakeScreen::new(40, 20));

        assert!(m.run().is_err());
        m.shutdown().unwrap();
        assert_eq!(*events.borrow(), ["restore", "log", "link"]);
    }

    #[test]
    fn test_drop_order_matches_shutdown() {
        let (m, events) = recorded_monitor(FakeLink::new(), FakeScreen::new(40, 20));
        drop(m);
        // The fake screen records explicit restores only
        assert_eq!(*events.borrow(), ["log", "link"]);
    }

    #[test]
    fn test_control_bytes_not_drawn_raw() {
        let mut link = FakeLink::new();
        link.incoming.push_back(vec![b'A', 0x9B, b'2', b'J', 0x7F, 0x85]);
        let mut m = monitor(link, FakeScreen::new(40, 20));

        m.step().unwrap();
        let (screen, _, _) = m.parts();
        assert!(screen.grid.iter().flatten().all(|ch| !ch.is_control()));
        assert_eq!(screen.row_text(2), ">>> A.2J..");
    }

    #[test]
    fn test_typed_delete_drawn_as_placeholder() {
        let mut screen = FakeScreen::new(40, 20);
        screen.push_keys(&[b'a', 0x7F]);
        let mut m = monitor(FakeLink::new(), screen);

        m.step().unwrap();
        m.step().unwrap();
        let (screen, link, _) = m.parts();
        assert_eq!(link.sent, [b'a', 0x7F]);
        assert_eq!(screen.row_text(12), "<<< a.");
        assert_eq!(screen.cursor, (12, 6));
    }

    #[test]
    fn test_idle_step() {
        let mut m = monitor(FakeLink::new(), FakeScreen::new(40, 20));
        assert_eq!(m.step().unwrap(), Step::Idle);
        assert_eq!(log_text(m), "");
    }
}

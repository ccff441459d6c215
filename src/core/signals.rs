//! Modem control signal tracking
//!
//! RTS and DTR are driven by this process; CTS and DSR belong to the
//! remote device and are only sampled. Changes are reported on edges only.

/// One of the four tracked control lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Request To Send (outbound)
    Rts,
    /// Data Terminal Ready (outbound)
    Dtr,
    /// Clear To Send (inbound)
    Cts,
    /// Data Set Ready (inbound)
    Dsr,
}

impl Signal {
    /// Upper-case name used in the session log
    pub fn label(self) -> &'static str {
        match self {
            Signal::Rts => "RTS",
            Signal::Dtr => "DTR",
            Signal::Cts => "CTS",
            Signal::Dsr => "DSR",
        }
    }

    /// Whether this process drives the line
    pub fn is_outbound(self) -> bool {
        matches!(self, Signal::Rts | Signal::Dtr)
    }

    /// Four-column status indicator: upper case when active, lower case when not.
    ///
    /// Signals shown at the left screen edge pad on the right, those at the
    /// right edge pad on the left.
    pub fn indicator(self, active: bool) -> String {
        let name = if active {
            self.label().to_string()
        } else {
            self.label().to_ascii_lowercase()
        };
        match self {
            Signal::Rts | Signal::Cts => format!("{} ", name),
            Signal::Dtr | Signal::Dsr => format!(" {}", name),
        }
    }
}

/// Last known level of each control line
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SignalTracker {
    rts: bool,
    dtr: bool,
    cts: bool,
    dsr: bool,
}

impl SignalTracker {
    /// All lines start inactive; outbound lines must be forced low on the device
    pub fn new() -> Self {
        Self::default()
    }

    /// Current recorded level
    pub fn get(&self, signal: Signal) -> bool {
        match signal {
            Signal::Rts => self.rts,
            Signal::Dtr => self.dtr,
            Signal::Cts => self.cts,
            Signal::Dsr => self.dsr,
        }
    }

    fn slot(&mut self, signal: Signal) -> &mut bool {
        match signal {
            Signal::Rts => &mut self.rts,
            Signal::Dtr => &mut self.dtr,
            Signal::Cts => &mut self.cts,
            Signal::Dsr => &mut self.dsr,
        }
    }

    /// Flip an outbound line and return its new level.
    ///
    /// Inbound lines are owned by the device and are left untouched.
    pub fn toggle_outbound(&mut self, signal: Signal) -> bool {
        if !signal.is_outbound() {
            return self.get(signal);
        }
        let slot = self.slot(signal);
        *slot = !*slot;
        *slot
    }

    /// Record a fresh sample of an inbound line.
    ///
    /// Returns `Some(level)` only when the level differs from the last one.
    pub fn sample_inbound(&mut self, signal: Signal, level: bool) -> Option<bool> {
        if signal.is_outbound() {
            return None;
        }
        let slot = self.slot(signal);
        if *slot == level {
            return None;
        }
        *slot = level;
        Some(level)
    }
}

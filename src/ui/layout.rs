//! Layout - split-screen geometry
//!
//! ```text
//! row 0          cts =====  Receiving from "/dev/ttyUSB0"  ===== dsr
//! rows 2..=h-2   >>> received text
//! row h          rts ====  Transmitting to "/dev/ttyUSB0"  ==== dtr
//! rows h+2..=R-2 <<< typed text
//! ```
//!
//! `h` is half the screen height. Columns 0..4 are the marker gutter.

use unicode_width::UnicodeWidthStr;

use crate::core::signals::Signal;

/// Width of the marker gutter in front of pane text
pub const GUTTER: u16 = 4;
/// Smallest screen that still gives each pane one text row
pub const MIN_ROWS: u16 = 8;
/// Smallest screen that keeps the signal indicators apart
pub const MIN_COLS: u16 = 2 * GUTTER + 2;

/// Bounds of one pane: rows `top..=bottom`, text columns `left..right`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaneRect {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

/// Placement of every fixed element on the screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cols: u16,
    pub rows: u16,
    /// Row of the receive divider
    pub rx_divider: u16,
    /// Row of the transmit divider
    pub tx_divider: u16,
    pub rx: PaneRect,
    pub tx: PaneRect,
}

impl Layout {
    /// Split a `cols` x `rows` screen into the receive and transmit halves
    pub fn new(cols: u16, rows: u16) -> Result<Self, String> {
        if cols < MIN_COLS || rows < MIN_ROWS {
            return Err(format!(
                "Terminal too small: {}x{} (need at least {}x{})",
                cols, rows, MIN_COLS, MIN_ROWS
            ));
        }

        let half = rows / 2;
        Ok(Self {
            cols,
            rows,
            rx_divider: 0,
            tx_divider: half,
            rx: PaneRect {
                top: 2,
                bottom: half - 2,
                left: GUTTER,
                right: cols,
            },
            tx: PaneRect {
                top: half + 2,
                bottom: rows - 2,
                left: GUTTER,
                right: cols,
            },
        })
    }

    /// Where a signal's four-column indicator goes, as `(row, col)`
    pub fn indicator_position(&self, signal: Signal) -> (u16, u16) {
        let right = self.cols - GUTTER;
        match signal {
            Signal::Cts => (self.rx_divider, 0),
            Signal::Dsr => (self.rx_divider, right),
            Signal::Rts => (self.tx_divider, 0),
            Signal::Dtr => (self.tx_divider, right),
        }
    }
}

/// Title bar text for the receive half
pub fn rx_label(port: &str) -> String {
    format!(" Receiving from \"{}\" ", port)
}

/// Title bar text for the transmit half
pub fn tx_label(port: &str) -> String {
    format!(" Transmitting to \"{}\" ", port)
}

/// A full-width divider with `label` centered in `=`.
///
/// Returns `None` when the label does not fit, in which case nothing is drawn.
pub fn divider_line(label: &str, cols: u16) -> Option<String> {
    let cols = cols as usize;
    let label_width = label.width();
    if label_width >= cols {
        return None;
    }

    let left = (cols - label_width) / 2;
    let right = cols - label_width - left;
    Some(format!("{}{}{}", "=".repeat(left), label, "=".repeat(right)))
}

//! Pane - one scrolling region of the split screen
//!
//! A pane is a fixed block of screen rows used as a ring: text runs left to
//! right, wraps at the right edge, and after the last row starts over at the
//! first. The row after the cursor is always blanked so the operator can
//! see where the newest text is. Nothing that scrolls off is kept.

use std::io;

use super::renderer::Screen;
use crate::core::canon::PLACEHOLDER;

/// A single scrolling pane
#[derive(Debug, Clone)]
pub struct ScrollPane {
    /// Marker drawn in the gutter of the active row, padded to the gutter width
    marker: String,
    /// First and last usable rows (inclusive)
    top_row: u16,
    bottom_row: u16,
    /// First text column; columns before it are the gutter
    left_col: u16,
    /// One past the last text column
    right_col: u16,
    cursor_row: u16,
    cursor_col: u16,
}

impl ScrollPane {
    /// Create a pane covering rows `top_row..=bottom_row` and text columns
    /// `left_col..right_col`, cursor at the top left
    pub fn new(marker: &str, top_row: u16, bottom_row: u16, left_col: u16, right_col: u16) -> Self {
        let gutter = left_col as usize;
        let marker: String = marker.chars().take(gutter).collect();
        Self {
            marker: format!("{:<width$}", marker, width = gutter),
            top_row,
            bottom_row: bottom_row.max(top_row),
            left_col,
            right_col: right_col.max(left_col + 1),
            cursor_row: top_row,
            cursor_col: left_col,
        }
    }

    /// Cursor position as `(row, col)`
    pub fn cursor(&self) -> (u16, u16) {
        (self.cursor_row, self.cursor_col)
    }

    #[cfg(test)]
    pub fn top_row(&self) -> u16 {
        self.top_row
    }

    #[cfg(test)]
    pub fn bottom_row(&self) -> u16 {
        self.bottom_row
    }

    #[cfg(test)]
    pub fn left_col(&self) -> u16 {
        self.left_col
    }

    #[cfg(test)]
    pub fn right_col(&self) -> u16 {
        self.right_col
    }

    /// Draw the marker on the cursor row
    pub fn draw_marker<S: Screen + ?Sized>(&self, screen: &mut S) -> io::Result<()> {
        screen.put_str(self.cursor_row, 0, &self.marker)
    }

    /// Write one canonical character; `'\n'` wraps
    pub fn write<S: Screen + ?Sized>(&mut self, screen: &mut S, ch: char) -> io::Result<()> {
        if ch == '\n' {
            self.write_linebreak(screen)
        } else {
            self.write_char(screen, ch)
        }
    }

    /// Place a character at the cursor and advance.
    ///
    /// Control characters, DEL and C1 included, are drawn as the placeholder.
    pub fn write_char<S: Screen + ?Sized>(&mut self, screen: &mut S, ch: char) -> io::Result<()> {
        let ch = if ch.is_control() { PLACEHOLDER } else { ch };
        let mut buf = [0u8; 4];
        screen.put_str(self.cursor_row, self.cursor_col, ch.encode_utf8(&mut buf))?;
        self.cursor_col += 1;
        if self.cursor_col >= self.right_col {
            self.wrap(screen)?;
        }
        Ok(())
    }

    /// End the current row
    pub fn write_linebreak<S: Screen + ?Sized>(&mut self, screen: &mut S) -> io::Result<()> {
        self.cursor_col = self.right_col;
        self.wrap(screen)
    }

    /// Row following `row` inside the ring
    fn next_row(&self, row: u16) -> u16 {
        if row >= self.bottom_row {
            self.top_row
        } else {
            row + 1
        }
    }

    /// Move to the start of the next row, clearing ahead
    fn wrap<S: Screen + ?Sized>(&mut self, screen: &mut S) -> io::Result<()> {
        let blank_gutter = " ".repeat(self.left_col as usize);
        screen.put_str(self.cursor_row, 0, &blank_gutter)?;

        self.cursor_row = self.next_row(self.cursor_row);
        self.cursor_col = self.left_col;

        let ahead = self.next_row(self.cursor_row);
        screen.put_str(ahead, 0, &" ".repeat(self.right_col as usize))?;

        self.draw_marker(screen)
    }
}

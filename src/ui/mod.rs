//! User interface rendering and input handling.
//!
//! - **renderer**: `Screen` trait and its crossterm implementation
//! - **keymapper**: Keyboard events to keystroke byte values
//! - **pane**: Scrolling RX/TX regions
//! - **layout**: Split-screen geometry and divider bars

pub mod keymapper;
pub mod layout;
pub mod pane;
pub mod renderer;

pub use layout::Layout;
pub use pane::ScrollPane;
pub use renderer::{Renderer, Screen};

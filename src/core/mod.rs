//! Core monitoring components.
//!
//! - **canon**: CR/LF canonicalization of received bytes
//! - **signals**: RTS/DTR/CTS/DSR edge tracking
//! - **transcript**: Class-tagged session log file
//! - **port**: Serial port access behind the `SerialLink` trait
//! - **session**: The poll loop tying them to the screen
//!
//! # Architecture
//!
//! ```text
//! Monitor
//! ├── Screen (RX pane, TX pane, dividers)
//! ├── SessionLog (transcript file)
//! └── SerialLink
//!     ├── LineCanonicalizer (inbound bytes)
//!     └── SignalTracker (control lines)
//! ```

pub mod canon;
pub mod port;
pub mod session;
pub mod signals;
pub mod transcript;

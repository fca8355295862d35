//! Shared interfaces between NEO6 protocol crates and the terminals they drive.

pub mod terminal;

pub use terminal::{Terminal, TerminalError};

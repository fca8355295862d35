use async_trait::async_trait;
use thiserror::Error;

/// Failures raised by a terminal session while driving a 3270 screen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TerminalError {
    /// The wait was interrupted before the keyboard unlocked.
    #[error("terminal wait interrupted")]
    Interrupted,
    /// The host did not unlock the keyboard within the terminal's timeout.
    #[error("timed out waiting for keyboard unlock")]
    TimedOut,
    /// The cursor is not positioned in an input field.
    #[error("no input field at cursor position ({row},{col})")]
    FieldNotFound { row: u16, col: u16 },
}

/// A live 3270 session addressed through a single terminal handle.
///
/// Keystroke methods only mutate the local presentation space; the host sees
/// the changes when an AID key (`enter`, `pf`) is pressed. `wait_for_keyboard`
/// is the only operation that suspends.
#[async_trait]
pub trait Terminal: Send {
    fn type_text(&mut self, text: &str) -> Result<(), TerminalError>;

    fn enter(&mut self) -> Result<(), TerminalError>;

    fn tab(&mut self) -> Result<(), TerminalError>;

    /// Moves the cursor to the first unprotected field.
    fn home(&mut self) -> Result<(), TerminalError>;

    fn new_line(&mut self) -> Result<(), TerminalError>;

    fn cursor_left(&mut self) -> Result<(), TerminalError>;

    /// Clears the current field from the cursor to its end.
    fn erase_eof(&mut self) -> Result<(), TerminalError>;

    /// Presses program function key `PF<number>`.
    fn pf(&mut self, number: u8) -> Result<(), TerminalError>;

    async fn wait_for_keyboard(&mut self) -> Result<(), TerminalError>;

    /// Returns the presentation space, one line per screen row.
    fn retrieve_screen(&mut self) -> Result<String, TerminalError>;

    /// Returns the full contents of the field the cursor is in.
    fn retrieve_field_at_cursor(&mut self) -> Result<String, TerminalError>;
}

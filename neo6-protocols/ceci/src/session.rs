use neo6_protocols_lib::Terminal;
use tracing::{debug, warn};

use crate::ceci_constants::PF_HEX;
use crate::ceci_screens::{classify, detect_mode, is_known_kind, DisplayMode, Screen, ScreenKind};
use crate::config::CeciConfig;
use crate::errors::{CeciError, TerminalResultExt};

/// One CECI conversation over one terminal handle.
///
/// The session owns the terminal and the display mode the interpreter is
/// currently in; every operation takes `&mut self`, so a handle can never be
/// driven by two operations at once. Independent sessions share nothing.
#[derive(Debug)]
pub struct CeciSession<T: Terminal> {
    pub(crate) terminal: T,
    pub(crate) config: CeciConfig,
    mode: DisplayMode,
}

impl<T: Terminal> CeciSession<T> {
    pub fn new(terminal: T) -> Self {
        Self::with_config(terminal, CeciConfig::default())
    }

    pub fn with_config(terminal: T, config: CeciConfig) -> Self {
        CeciSession { terminal, config, mode: DisplayMode::Text }
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn into_inner(self) -> T {
        self.terminal
    }

    pub fn config(&self) -> &CeciConfig {
        &self.config
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// True when the terminal shows any screen the interpreter can produce.
    pub fn is_ceci_screen(&mut self) -> Result<bool, CeciError> {
        let screen = self.current_screen("Unable to identify session")?;
        Ok(is_known_kind(&screen))
    }

    /// Precondition for every public operation.
    pub(crate) fn ensure_ceci_screen(&mut self) -> Result<Screen, CeciError> {
        let screen = self.current_screen("Unable to identify session")?;
        if !is_known_kind(&screen) {
            warn!("terminal is not showing a CECI screen");
            return Err(CeciError::session("Cannot identify session as a CECI session"));
        }
        self.sync_mode(&screen);
        Ok(screen)
    }

    /// Adopts the display mode shown on `screen`, if it shows one.
    pub(crate) fn sync_mode(&mut self, screen: &Screen) {
        if let Some(mode) = detect_mode(screen) {
            self.mode = mode;
        }
    }

    pub(crate) fn current_screen(&mut self, action: &str) -> Result<Screen, CeciError> {
        let text = self.terminal.retrieve_screen().during(action)?;
        Ok(Screen::new(text))
    }

    pub(crate) fn field_at_cursor(&mut self, action: &str) -> Result<String, CeciError> {
        self.terminal.retrieve_field_at_cursor().during(action)
    }

    pub(crate) fn tabs(&mut self, count: usize, action: &str) -> Result<(), CeciError> {
        for _ in 0..count {
            self.terminal.tab().during(action)?;
        }
        Ok(())
    }

    pub(crate) async fn press_enter(&mut self, action: &str) -> Result<Screen, CeciError> {
        self.terminal.enter().during(action)?;
        self.terminal.wait_for_keyboard().await.during(action)?;
        self.current_screen(action)
    }

    pub(crate) async fn press_pf(&mut self, key: u8, action: &str) -> Result<Screen, CeciError> {
        debug!(key, "pressing PF key");
        self.terminal.pf(key).during(action)?;
        self.terminal.wait_for_keyboard().await.during(action)?;
        self.current_screen(action)
    }

    /// Fails with the screen attached unless it is of the expected kind.
    pub(crate) fn expect_kind(screen: &Screen, kind: ScreenKind, action: &str) -> Result<(), CeciError> {
        let found = classify(screen);
        if found == kind {
            Ok(())
        } else {
            Err(CeciError::protocol(
                format!("{}: expected {} screen, found {} screen", action, kind, found),
                screen,
            ))
        }
    }

    /// Switches the display mode; a no-op when already in `mode`.
    pub(crate) async fn set_mode(&mut self, mode: DisplayMode, action: &str) -> Result<Screen, CeciError> {
        if self.mode == mode {
            return self.current_screen(action);
        }
        let screen = self.press_pf(PF_HEX, action).await?;
        self.mode = detect_mode(&screen).unwrap_or(mode);
        if self.mode != mode {
            return Err(CeciError::protocol(
                format!("{}: unable to switch display mode to {:?}", action, mode),
                &screen,
            ));
        }
        debug!(?mode, "display mode switched");
        Ok(screen)
    }
}

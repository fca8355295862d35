use indexmap::IndexMap;
use neo6_protocols_lib::Terminal;
use tracing::{debug, info, warn};

use crate::ceci_constants::*;
use crate::ceci_screens::{classify, Screen, ScreenKind};
use crate::errors::{CeciError, TerminalResultExt};
use crate::response::{parse_response_line, CommandResponse};
use crate::session::CeciSession;
use crate::variables::validate_variable;

/// The single move that brings `kind` one step closer to the initial screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    End,
    ClearCommand,
    Restart,
}

fn move_towards_initial(kind: ScreenKind) -> Option<Move> {
    match kind {
        ScreenKind::Initial => None,
        ScreenKind::Help
        | ScreenKind::Message
        | ScreenKind::Eib
        | ScreenKind::Variables
        | ScreenKind::VariablesExpansion => Some(Move::End),
        ScreenKind::CommandBefore | ScreenKind::CommandAfter => Some(Move::ClearCommand),
        ScreenKind::Other => Some(Move::Restart),
    }
}

impl<T: Terminal> CeciSession<T> {
    /// Drives the terminal to `target` (initial, variables or EIB screen).
    ///
    /// Variables and EIB are always entered from the initial screen so their
    /// listings start on the first page.
    pub async fn navigate(&mut self, target: ScreenKind) -> Result<Screen, CeciError> {
        let key = match target {
            ScreenKind::Initial => None,
            ScreenKind::Variables => Some(PF_VARIABLES),
            ScreenKind::Eib => Some(PF_EIB),
            other => {
                return Err(CeciError::session(format!("Cannot navigate to {} screen", other)));
            }
        };
        let action = format!("Unable to navigate to {} screen", target);
        let screen = self.navigate_to_initial(&action).await?;
        let Some(key) = key else {
            return Ok(screen);
        };
        let screen = self.press_pf(key, &action).await?;
        if classify(&screen) != target {
            return Err(CeciError::protocol(action, &screen));
        }
        Ok(screen)
    }

    /// Steps back to the initial screen within the configured bound.
    async fn navigate_to_initial(&mut self, action: &str) -> Result<Screen, CeciError> {
        let attempts = self.config.navigation_attempts;
        let mut screen = self.current_screen(action)?;
        for attempt in 0..=attempts {
            let kind = classify(&screen);
            let Some(step) = move_towards_initial(kind) else {
                return Ok(screen);
            };
            if attempt == attempts {
                break;
            }
            debug!(attempt, %kind, ?step, "moving towards initial screen");
            screen = match step {
                Move::End => self.press_pf(PF_END, action).await?,
                Move::ClearCommand => {
                    self.terminal.home().during(action)?;
                    self.terminal.erase_eof().during(action)?;
                    self.press_enter(action).await?
                }
                Move::Restart => {
                    self.terminal.home().during(action)?;
                    self.terminal.erase_eof().during(action)?;
                    self.terminal.type_text(CECI_TRANSACTION).during(action)?;
                    self.press_enter(action).await?
                }
            };
        }
        warn!(attempts, action, "navigation retry bound exhausted");
        Err(CeciError::session(action))
    }

    /// Types `command` on the initial screen and runs it to completion.
    ///
    /// A command that is itself a variable name is replaced by the variable's
    /// text first. With `parse_options` the option table is read as well.
    pub async fn issue_command(&mut self, command: &str, parse_options: bool) -> Result<CommandResponse, CeciError> {
        const ACTION: &str = "Unable to issue command";
        self.ensure_ceci_screen()?;
        let command = if validate_variable(command, &[], None).is_ok() {
            self.retrieve_variable_text(command).await?
        } else {
            command.to_string()
        };
        info!(command = %command, "issuing CECI command");

        self.navigate(ScreenKind::Initial).await?;
        self.terminal.home().during(ACTION)?;
        self.terminal.erase_eof().during(ACTION)?;
        self.terminal.type_text(&command).during(ACTION)?;
        let mut screen = self.press_enter(ACTION).await?;

        let mut polls = 0;
        loop {
            match classify(&screen) {
                ScreenKind::CommandAfter => break,
                ScreenKind::CommandBefore if polls < self.config.command_poll_attempts => {
                    polls += 1;
                    debug!(polls, "command not yet executed, pressing enter");
                    let delay = self.config.command_poll_delay();
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    screen = self.press_enter(ACTION).await?;
                }
                ScreenKind::CommandBefore => {
                    return Err(CeciError::protocol(
                        format!("{}: command did not complete after {} attempts", ACTION, polls),
                        &screen,
                    ));
                }
                kind => {
                    return Err(CeciError::protocol(
                        format!("{}: unexpected {} screen after command", ACTION, kind),
                        &screen,
                    ));
                }
            }
        }

        for marker in [ABEND_MARKER, COMMAND_FAILED_MARKER] {
            if screen.contains(marker) {
                return Err(CeciError::protocol(format!("{}: command failed ({})", ACTION, marker), &screen));
            }
        }

        let (response, eib_resp, eib_resp2) = parse_response_line(&screen)?;
        let options = if parse_options {
            self.parse_option_table(ACTION).await?
        } else {
            IndexMap::new()
        };
        debug!(response = %response, eib_resp, eib_resp2, "command complete");
        Ok(CommandResponse::new(response, eib_resp, eib_resp2, options))
    }
}

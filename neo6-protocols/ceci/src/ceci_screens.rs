use crate::ceci_constants::*;
use serde::Serialize;
use std::fmt;
use tracing::trace;

/// One captured CECI presentation space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    rows: Vec<String>,
}

impl Screen {
    /// Accepts either newline separated rows or a flat buffer that is split
    /// every `SCREEN_COLUMNS` characters.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let rows = if text.contains('\n') {
            text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect()
        } else {
            let chars: Vec<char> = text.chars().collect();
            chars
                .chunks(SCREEN_COLUMNS)
                .map(|chunk| chunk.iter().collect())
                .collect()
        };
        Screen { rows }
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &str {
        self.rows.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, marker: &str) -> bool {
        self.rows.iter().any(|row| row.contains(marker))
    }

    /// Column-exact extract of `width` characters, space padded when the row is short.
    pub fn slice(&self, row: usize, col: usize, width: usize) -> String {
        let mut out: String = self.row(row).chars().skip(col).take(width).collect();
        let len = out.chars().count();
        out.extend(std::iter::repeat(' ').take(width - len));
        out
    }

    pub fn text(&self) -> String {
        self.rows.join("\n")
    }

    fn legend(&self) -> &str {
        self.rows.last().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Screens the interpreter can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScreenKind {
    Initial,
    CommandBefore,
    CommandAfter,
    Help,
    Eib,
    Variables,
    VariablesExpansion,
    Message,
    Other,
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ScreenKind::Initial => "initial",
            ScreenKind::CommandBefore => "command before",
            ScreenKind::CommandAfter => "command after",
            ScreenKind::Help => "help",
            ScreenKind::Eib => "EIB",
            ScreenKind::Variables => "variables",
            ScreenKind::VariablesExpansion => "variables expansion",
            ScreenKind::Message => "message",
            ScreenKind::Other => "unknown",
        };
        f.write_str(name)
    }
}

/// How the interpreter currently renders data values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisplayMode {
    Text,
    Hex,
}

pub fn is_initial_screen(screen: &Screen) -> bool {
    screen.contains(INITIAL_SCREEN_ID)
}

pub fn is_command_before_screen(screen: &Screen) -> bool {
    screen.contains(COMMAND_BEFORE_SCREEN_ID) || screen.contains(COMMAND_SYNTAX_SCREEN_ID)
}

pub fn is_command_after_screen(screen: &Screen) -> bool {
    screen.contains(COMMAND_AFTER_SCREEN_ID)
}

pub fn is_help_screen(screen: &Screen) -> bool {
    screen.contains(HELP_SCREEN_ID)
}

pub fn is_eib_screen(screen: &Screen) -> bool {
    screen.contains(EIB_SCREEN_ID)
}

pub fn is_variables_screen(screen: &Screen) -> bool {
    screen.contains(VARIABLES_SCREEN_ID)
}

pub fn is_variables_expansion_screen(screen: &Screen) -> bool {
    screen.contains(VARIABLES_EXPANSION_SCREEN_ID)
}

pub fn is_message_screen(screen: &Screen) -> bool {
    screen.contains(MESSAGE_SCREEN_ID)
}

type Predicate = fn(&Screen) -> bool;

// Evaluated top to bottom. Overlay screens come before the status-line kinds
// because the interpreter keeps the status line on some of them.
const CLASSIFIERS: [(Predicate, ScreenKind); 8] = [
    (is_help_screen, ScreenKind::Help),
    (is_variables_expansion_screen, ScreenKind::VariablesExpansion),
    (is_variables_screen, ScreenKind::Variables),
    (is_eib_screen, ScreenKind::Eib),
    (is_message_screen, ScreenKind::Message),
    (is_command_after_screen, ScreenKind::CommandAfter),
    (is_command_before_screen, ScreenKind::CommandBefore),
    (is_initial_screen, ScreenKind::Initial),
];

/// Maps a screen to exactly one kind; `Other` when nothing matches.
pub fn classify(screen: &Screen) -> ScreenKind {
    let kind = CLASSIFIERS
        .iter()
        .find(|(predicate, _)| predicate(screen))
        .map(|(_, kind)| *kind)
        .unwrap_or(ScreenKind::Other);
    trace!(%kind, "classified screen");
    kind
}

pub fn is_known_kind(screen: &Screen) -> bool {
    CLASSIFIERS.iter().any(|(predicate, _)| predicate(screen))
}

/// Reads the display mode from the PF legend, falling back to the EIBTIME
/// formatting when the screen is the EIB.
pub fn detect_mode(screen: &Screen) -> Option<DisplayMode> {
    let legend = screen.legend();
    if legend.contains(HEX_ON_LEGEND) {
        return Some(DisplayMode::Hex);
    }
    if legend.contains(HEX_OFF_LEGEND) {
        return Some(DisplayMode::Text);
    }
    if is_eib_screen(screen) {
        let time = screen.rows().iter().find(|row| row.trim_start().starts_with("EIBTIME"))?;
        let value = time.split_once('=')?.1.trim_start();
        return Some(if value.starts_with("X'") { DisplayMode::Hex } else { DisplayMode::Text });
    }
    None
}

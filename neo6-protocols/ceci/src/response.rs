// Command response line and option table on the command-complete screen
use indexmap::IndexMap;
use neo6_protocols_lib::Terminal;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::ceci_constants::*;
use crate::ceci_screens::{DisplayMode, Screen, ScreenKind};
use crate::errors::{CeciError, TerminalResultExt};
use crate::session::CeciSession;
use crate::variables::{parse_length_field, LengthField, VariableType};

/// Value of one option row after the command ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    Text(String),
    Hex(Vec<u8>),
    Int(i32),
    Long(i64),
    TextArray(Vec<String>),
}

/// Outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResponse {
    response: String,
    eib_resp: i32,
    eib_resp2: i32,
    options: IndexMap<String, OptionValue>,
}

impl CommandResponse {
    pub(crate) fn new(
        response: String,
        eib_resp: i32,
        eib_resp2: i32,
        options: IndexMap<String, OptionValue>,
    ) -> Self {
        CommandResponse { response, eib_resp, eib_resp2, options }
    }

    /// "NORMAL", a condition name such as "FILENOTFOUND", or "ABEND xxxx".
    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn eib_resp(&self) -> i32 {
        self.eib_resp
    }

    pub fn eib_resp2(&self) -> i32 {
        self.eib_resp2
    }

    pub fn is_normal(&self) -> bool {
        self.response == "NORMAL"
    }

    pub fn abend_code(&self) -> Option<&str> {
        self.response.strip_prefix("ABEND").map(str::trim)
    }

    pub fn options(&self) -> &IndexMap<String, OptionValue> {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn to_json(&self) -> Value {
        json!({
            "response": self.response,
            "eibresp": self.eib_resp,
            "eibresp2": self.eib_resp2,
            "options": self.options,
        })
    }
}

const RESPONSE_LINE_PATTERN: &str = r"RESPONSE:\s*(.*?)\s+EIBRESP=([+-]?\d+)\s+EIBRESP2=([+-]?\d+)";

/// Extracts `(response, EIBRESP, EIBRESP2)` from the command-complete screen.
pub fn parse_response_line(screen: &Screen) -> Result<(String, i32, i32), CeciError> {
    let regex = Regex::new(RESPONSE_LINE_PATTERN)?;
    let captures = screen
        .rows()
        .iter()
        .find_map(|row| regex.captures(row))
        .ok_or_else(|| CeciError::protocol("Unable to find command response line", screen))?;
    let number = |index: usize| -> Result<i32, CeciError> {
        captures[index]
            .parse()
            .map_err(|_| CeciError::protocol(format!("Invalid response code '{}'", &captures[index]), screen))
    };
    Ok((captures[1].trim().to_string(), number(2)?, number(3)?))
}

/// Length/type column of an option row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionMarker {
    Empty,
    Text(usize),
    Hex(usize),
    Int(usize),
    Long(usize),
}

fn parse_option_marker(marker: &str) -> Option<OptionMarker> {
    let marker = marker.trim();
    if marker.is_empty() {
        return Some(OptionMarker::Empty);
    }
    if let Some(length) = marker.strip_prefix('X') {
        return length.parse().ok().map(OptionMarker::Hex);
    }
    Some(match parse_length_field(marker)? {
        LengthField::Bytes(length) => OptionMarker::Text(length),
        LengthField::Typed(t @ (VariableType::HalfWord | VariableType::FullWord)) => {
            OptionMarker::Int(t.max_length())
        }
        LengthField::Typed(t) => OptionMarker::Long(t.max_length()),
    })
}

/// Repeated option names collect their text values into an array.
fn insert_option(options: &mut IndexMap<String, OptionValue>, name: String, value: OptionValue) {
    match (options.get_mut(&name), value) {
        (Some(OptionValue::TextArray(values)), OptionValue::Text(text)) => values.push(text),
        (Some(existing @ OptionValue::Text(_)), OptionValue::Text(text)) => {
            if let OptionValue::Text(first) = existing {
                *existing = OptionValue::TextArray(vec![std::mem::take(first), text]);
            }
        }
        (Some(_), value) => {
            warn!(option = %name, "option repeated with a non-text value, keeping the last");
            options.insert(name, value);
        }
        (None, value) => {
            options.insert(name, value);
        }
    }
}

impl<T: Terminal> CeciSession<T> {
    /// Walks the option rows of the command-complete screen until a blank
    /// option name, expanding each value through the text or hex read path.
    pub(crate) async fn parse_option_table(&mut self, action: &str) -> Result<IndexMap<String, OptionValue>, CeciError> {
        let mut options = IndexMap::new();
        for row in 0..OPTION_ROWS {
            self.terminal.home().during(action)?;
            self.tabs(1 + 2 * row, action)?;
            let name = self.field_at_cursor(action)?.trim().to_string();
            if name.is_empty() {
                break;
            }
            self.terminal.tab().during(action)?;
            let marker_text = self.field_at_cursor(action)?;
            let marker = parse_option_marker(&marker_text).ok_or_else(|| CeciError::Protocol {
                message: format!("{}: unexpected type '{}' for option {}", action, marker_text.trim(), name),
                screen: None,
            })?;
            let value = match marker {
                OptionMarker::Empty => OptionValue::Text(String::new()),
                OptionMarker::Text(length) => OptionValue::Text(self.expand_option(length, DisplayMode::Text, action).await?),
                OptionMarker::Hex(length) => {
                    let digits = self.expand_option(length * 2, DisplayMode::Hex, action).await?;
                    let bytes = hex::decode(&digits).map_err(|e| CeciError::Protocol {
                        message: format!("{}: option {} holds invalid hex data ({})", action, name, e),
                        screen: None,
                    })?;
                    OptionValue::Hex(bytes)
                }
                OptionMarker::Int(width) => {
                    let text = self.expand_option(width, DisplayMode::Text, action).await?;
                    OptionValue::Int(parse_option_number(&name, &text, action)?)
                }
                OptionMarker::Long(width) => {
                    let text = self.expand_option(width, DisplayMode::Text, action).await?;
                    OptionValue::Long(parse_option_number(&name, &text, action)?)
                }
            };
            debug!(option = %name, ?value, "option parsed");
            insert_option(&mut options, name, value);
        }
        Ok(options)
    }

    async fn expand_option(&mut self, units: usize, mode: DisplayMode, action: &str) -> Result<String, CeciError> {
        if units == 0 {
            return Ok(String::new());
        }
        let screen = self.press_enter(action).await?;
        Self::expect_kind(&screen, ScreenKind::VariablesExpansion, action)?;
        let value = self.read_expanded(units, mode, action).await?;
        let screen = self.current_screen(action)?;
        Self::expect_kind(&screen, ScreenKind::CommandAfter, action)?;
        Ok(value)
    }
}

fn parse_option_number<N: std::str::FromStr>(name: &str, text: &str, action: &str) -> Result<N, CeciError> {
    text.trim().parse().map_err(|_| CeciError::Protocol {
        message: format!("{}: option {} value '{}' is not numeric", action, name, text.trim()),
        screen: None,
    })
}

// Variable definitions on the CECI variables listing and expansion screens
use neo6_protocols_lib::Terminal;
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, trace, warn};

use crate::ceci_constants::*;
use crate::ceci_screens::{is_variables_expansion_screen, DisplayMode, Screen, ScreenKind};
use crate::errors::{CeciError, TerminalResultExt, ValidationError};
use crate::session::CeciSession;

const SET_ACTION: &str = "Unable to set variable";
const GET_ACTION: &str = "Unable to get variable";
const DELETE_ACTION: &str = "Unable to delete variable";

/// Numeric variable types and the widest decimal text each can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VariableType {
    HalfWord,
    FullWord,
    DoubleWord,
    PackedWord,
    PackedDoubleWord,
}

impl VariableType {
    pub fn code(&self) -> &'static str {
        match self {
            VariableType::HalfWord => "H",
            VariableType::FullWord => "F",
            VariableType::DoubleWord => "D",
            VariableType::PackedWord => "P",
            VariableType::PackedDoubleWord => "PD",
        }
    }

    /// Characters of the longest value including its sign.
    pub fn max_length(&self) -> usize {
        match self {
            VariableType::HalfWord => 6,
            VariableType::FullWord => 11,
            VariableType::DoubleWord => 20,
            VariableType::PackedWord => 9,
            VariableType::PackedDoubleWord => 18,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "H" => Some(VariableType::HalfWord),
            "F" => Some(VariableType::FullWord),
            "D" => Some(VariableType::DoubleWord),
            "P" => Some(VariableType::PackedWord),
            "PD" => Some(VariableType::PackedDoubleWord),
            _ => None,
        }
    }

    fn packed_for(text: &str) -> Self {
        if text.len() <= VariableType::PackedWord.max_length() {
            VariableType::PackedWord
        } else {
            VariableType::PackedDoubleWord
        }
    }
}

/// Contents of a slot's length column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthField {
    Bytes(usize),
    Typed(VariableType),
}

impl LengthField {
    pub fn length(&self) -> usize {
        match self {
            LengthField::Bytes(length) => *length,
            LengthField::Typed(variable_type) => variable_type.max_length(),
        }
    }

    fn display(&self) -> String {
        match self {
            LengthField::Bytes(length) => format!("+{:05}", length),
            LengthField::Typed(variable_type) => variable_type.code().to_string(),
        }
    }
}

/// Signed decimal → byte length; a type code → that type's length.
pub fn parse_length_field(field: &str) -> Option<LengthField> {
    let field = field.trim();
    if field.starts_with(['+', '-']) || field.starts_with(|c: char| c.is_ascii_digit()) {
        let length: i64 = field.parse().ok()?;
        return usize::try_from(length).ok().map(LengthField::Bytes);
    }
    VariableType::from_code(field).map(LengthField::Typed)
}

/// Checks a name against the interpreter's rules and a value against the
/// declared type; returns the name unchanged when valid.
pub fn validate_variable<'a>(
    name: &'a str,
    value: &[u8],
    declared: Option<VariableType>,
) -> Result<&'a str, ValidationError> {
    let rest = name.strip_prefix(VARIABLE_PREFIX);
    let well_formed = rest.map_or(false, |rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '@' || c == '#')
    });
    if !well_formed {
        return Err(ValidationError::InvalidName { name: name.to_string() });
    }
    let length = name.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong { name: name.to_string(), length, max: MAX_NAME_LENGTH });
    }
    if let Some(variable_type) = declared {
        if value.len() > variable_type.max_length() {
            return Err(ValidationError::ValueTooLongForType {
                length: value.len(),
                max: variable_type.max_length(),
                type_code: variable_type.code().to_string(),
            });
        }
    }
    if value.len() > MAX_VALUE_LENGTH {
        return Err(ValidationError::ValueTooLong { length: value.len(), max: MAX_VALUE_LENGTH });
    }
    Ok(name)
}

fn left_justify(field: &str, width: usize) -> String {
    format!("{:<width$}", field.trim_end(), width = width)
}

/// Characters the current expansion page can take: one line per offset label.
fn expansion_capacity(screen: &Screen) -> usize {
    (EXPANSION_FIRST_ROW..EXPANSION_FIRST_ROW + EXPANSION_ROWS)
        .filter(|row| screen.slice(*row, 1, LENGTH_FIELD_WIDTH).starts_with('+'))
        .count()
        * EXPANSION_LINE_WIDTH
}

fn expansion_offset(screen: &Screen) -> Option<usize> {
    screen.slice(EXPANSION_FIRST_ROW, 1, LENGTH_FIELD_WIDTH).trim().parse().ok()
}

fn read_expansion_page(screen: &Screen, count: usize) -> String {
    (EXPANSION_FIRST_ROW..EXPANSION_FIRST_ROW + EXPANSION_ROWS)
        .map(|row| screen.slice(row, EXPANSION_DATA_COLUMN, EXPANSION_LINE_WIDTH))
        .collect::<String>()
        .chars()
        .take(count)
        .collect()
}

impl<T: Terminal> CeciSession<T> {
    /// Only ASCII text is accepted; host fields are single-byte.
    pub async fn define_variable_text(&mut self, name: &str, value: &str) -> Result<usize, CeciError> {
        validate_variable(name, value.as_bytes(), None)?;
        if let Some(position) = value.find(|c: char| !c.is_ascii()) {
            return Err(ValidationError::NonAsciiValue { name: name.to_string(), position }.into());
        }
        let field = LengthField::Bytes(value.len());
        self.define_variable(name, field, value, DisplayMode::Text).await
    }

    /// Returns the number of bytes written.
    pub async fn define_variable_binary(&mut self, name: &str, value: &[u8]) -> Result<usize, CeciError> {
        validate_variable(name, value, None)?;
        let digits = hex::encode_upper(value);
        let written = self
            .define_variable(name, LengthField::Bytes(value.len()), &digits, DisplayMode::Hex)
            .await?;
        Ok(written / 2)
    }

    pub async fn define_variable_word16(&mut self, name: &str, value: i16) -> Result<usize, CeciError> {
        self.define_numeric(name, VariableType::HalfWord, value.to_string()).await
    }

    pub async fn define_variable_word32(&mut self, name: &str, value: i32) -> Result<usize, CeciError> {
        self.define_numeric(name, VariableType::FullWord, value.to_string()).await
    }

    pub async fn define_variable_word64(&mut self, name: &str, value: i64) -> Result<usize, CeciError> {
        self.define_numeric(name, VariableType::DoubleWord, value.to_string()).await
    }

    /// Packed values use a packed word when the digits fit, else a packed doubleword.
    pub async fn define_variable_packed(&mut self, name: &str, value: i64) -> Result<usize, CeciError> {
        let text = value.to_string();
        self.define_numeric(name, VariableType::packed_for(&text), text).await
    }

    async fn define_numeric(
        &mut self,
        name: &str,
        variable_type: VariableType,
        text: String,
    ) -> Result<usize, CeciError> {
        validate_variable(name, text.as_bytes(), Some(variable_type))?;
        self.define_variable(name, LengthField::Typed(variable_type), &text, DisplayMode::Text)
            .await
    }

    pub async fn retrieve_variable_text(&mut self, name: &str) -> Result<String, CeciError> {
        let (_, value) = self.retrieve_variable(name, DisplayMode::Text).await?;
        Ok(value)
    }

    pub async fn retrieve_variable_binary(&mut self, name: &str) -> Result<Vec<u8>, CeciError> {
        let (field, digits) = self.retrieve_variable(name, DisplayMode::Hex).await?;
        let bytes = hex::decode(&digits).map_err(|e| CeciError::Protocol {
            message: format!("{}: variable {} holds invalid hex data ({})", GET_ACTION, name, e),
            screen: None,
        })?;
        if bytes.len() != field.length() {
            return Err(CeciError::Protocol {
                message: format!(
                    "{}: variable {} decoded to {} bytes, expected {}",
                    GET_ACTION,
                    name,
                    bytes.len(),
                    field.length()
                ),
                screen: None,
            });
        }
        Ok(bytes)
    }

    pub async fn retrieve_variable_word16(&mut self, name: &str) -> Result<i16, CeciError> {
        self.retrieve_number(name).await
    }

    pub async fn retrieve_variable_word32(&mut self, name: &str) -> Result<i32, CeciError> {
        self.retrieve_number(name).await
    }

    pub async fn retrieve_variable_word64(&mut self, name: &str) -> Result<i64, CeciError> {
        self.retrieve_number(name).await
    }

    pub async fn retrieve_variable_packed(&mut self, name: &str) -> Result<i64, CeciError> {
        self.retrieve_number(name).await
    }

    async fn retrieve_number<N: FromStr>(&mut self, name: &str) -> Result<N, CeciError> {
        let (_, text) = self.retrieve_variable(name, DisplayMode::Text).await?;
        text.trim().parse().map_err(|_| CeciError::Protocol {
            message: format!("{}: variable {} value '{}' is not numeric", GET_ACTION, name, text.trim()),
            screen: None,
        })
    }

    /// Returns false when no variable of that name exists.
    pub async fn delete_variable(&mut self, name: &str) -> Result<bool, CeciError> {
        validate_variable(name, &[], None)?;
        self.ensure_ceci_screen()?;
        self.navigate(ScreenKind::Variables).await?;
        if !self.find_variable(name, DELETE_ACTION).await? {
            debug!(name, "variable not defined, nothing to delete");
            return Ok(false);
        }
        self.erase_slot(DELETE_ACTION).await?;
        Ok(true)
    }

    /// Erases every slot page by page; each Enter commits the erasures and
    /// scrolls the following variables into view. Returns the count deleted.
    pub async fn delete_all_variables(&mut self) -> Result<usize, CeciError> {
        const ACTION: &str = "Unable to delete all variables";
        self.ensure_ceci_screen()?;
        self.navigate(ScreenKind::Variables).await?;
        let mut deleted = 0;
        for pass in 0..VARIABLE_PAGES {
            self.terminal.home().during(ACTION)?;
            let mut erased = 0;
            while erased < VARIABLE_SLOTS_PER_PAGE {
                if self.field_at_cursor(ACTION)?.trim().is_empty() {
                    break;
                }
                self.terminal.erase_eof().during(ACTION)?;
                self.tabs(2, ACTION)?;
                erased += 1;
            }
            let screen = self.press_enter(ACTION).await?;
            Self::expect_kind(&screen, ScreenKind::Variables, ACTION)?;
            trace!(pass, erased, "variables page cleared");
            deleted += erased;
            if erased < VARIABLE_SLOTS_PER_PAGE {
                break;
            }
        }
        debug!(deleted, "all variables deleted");
        Ok(deleted)
    }

    async fn define_variable(
        &mut self,
        name: &str,
        field: LengthField,
        data: &str,
        mode: DisplayMode,
    ) -> Result<usize, CeciError> {
        self.ensure_ceci_screen()?;
        self.navigate(ScreenKind::Variables).await?;
        if self.find_variable(name, SET_ACTION).await? {
            debug!(name, "replacing existing variable");
            self.erase_slot(SET_ACTION).await?;
        }

        self.navigate(ScreenKind::Variables).await?;
        self.locate_empty_slot().await?;
        self.terminal.type_text(name).during(SET_ACTION)?;
        self.terminal.tab().during(SET_ACTION)?;
        self.terminal.erase_eof().during(SET_ACTION)?;
        self.terminal.type_text(&field.display()).during(SET_ACTION)?;
        let screen = self.press_enter(SET_ACTION).await?;
        Self::expect_kind(&screen, ScreenKind::Variables, SET_ACTION)?;

        if data.is_empty() {
            return Ok(0);
        }
        self.open_expansion(name, SET_ACTION).await?;
        let written = self.write_expanded(data, mode).await;
        let restored = self.leave_expansion(SET_ACTION).await;
        let written = written?;
        restored?;
        debug!(name, written, "variable defined");
        Ok(written)
    }

    async fn retrieve_variable(
        &mut self,
        name: &str,
        mode: DisplayMode,
    ) -> Result<(LengthField, String), CeciError> {
        validate_variable(name, &[], None)?;
        self.ensure_ceci_screen()?;
        let screen = self.navigate(ScreenKind::Variables).await?;
        if !self.find_variable(name, GET_ACTION).await? {
            return Err(CeciError::protocol(format!("{}: variable {} not found", GET_ACTION, name), &screen));
        }
        self.terminal.tab().during(GET_ACTION)?;
        let text = self.field_at_cursor(GET_ACTION)?;
        let field = parse_length_field(&text).ok_or_else(|| CeciError::Protocol {
            message: format!(
                "{}: cannot determine field length of {}, unexpected variable type '{}'",
                GET_ACTION,
                name,
                text.trim()
            ),
            screen: None,
        })?;
        let units = match mode {
            DisplayMode::Text => field.length(),
            DisplayMode::Hex => field.length() * 2,
        };
        if units == 0 {
            return Ok((field, String::new()));
        }
        let screen = self.press_enter(GET_ACTION).await?;
        Self::expect_kind(&screen, ScreenKind::VariablesExpansion, GET_ACTION)?;
        let value = self.read_expanded(units, mode, GET_ACTION).await?;
        Ok((field, value))
    }

    /// Leaves the cursor on the matching name field when found.
    async fn find_variable(&mut self, name: &str, action: &str) -> Result<bool, CeciError> {
        let wanted = left_justify(name, MAX_NAME_LENGTH);
        for page in 0..VARIABLE_PAGES {
            if page > 0 {
                self.press_pf(PF_FORWARD, action).await?;
            }
            self.terminal.home().during(action)?;
            for slot in 0..VARIABLE_SLOTS_PER_PAGE {
                let field = self.field_at_cursor(action)?;
                if field.trim().is_empty() {
                    return Ok(false);
                }
                if left_justify(&field, MAX_NAME_LENGTH) == wanted {
                    trace!(name, page, slot, "variable located");
                    return Ok(true);
                }
                self.tabs(2, action)?;
            }
        }
        Ok(false)
    }

    async fn locate_empty_slot(&mut self) -> Result<(), CeciError> {
        for page in 0..VARIABLE_PAGES {
            if page > 0 {
                self.press_pf(PF_FORWARD, SET_ACTION).await?;
            }
            self.terminal.home().during(SET_ACTION)?;
            for _ in 0..VARIABLE_SLOTS_PER_PAGE {
                if self.field_at_cursor(SET_ACTION)?.trim().is_empty() {
                    return Ok(());
                }
                self.tabs(2, SET_ACTION)?;
            }
        }
        let screen = self.current_screen(SET_ACTION)?;
        Err(CeciError::protocol("No space for new variables", &screen))
    }

    async fn erase_slot(&mut self, action: &str) -> Result<(), CeciError> {
        self.terminal.erase_eof().during(action)?;
        let screen = self.press_enter(action).await?;
        Self::expect_kind(&screen, ScreenKind::Variables, action)
    }

    async fn open_expansion(&mut self, name: &str, action: &str) -> Result<Screen, CeciError> {
        let screen = self.navigate(ScreenKind::Variables).await?;
        if !self.find_variable(name, action).await? {
            return Err(CeciError::protocol(format!("{}: variable {} was not created", action, name), &screen));
        }
        let screen = self.press_enter(action).await?;
        Self::expect_kind(&screen, ScreenKind::VariablesExpansion, action)?;
        Ok(screen)
    }

    async fn leave_expansion(&mut self, action: &str) -> Result<Screen, CeciError> {
        self.set_mode(DisplayMode::Text, action).await?;
        self.press_pf(PF_END, action).await
    }

    async fn write_expanded(&mut self, data: &str, mode: DisplayMode) -> Result<usize, CeciError> {
        let mut screen = self.set_mode(mode, SET_ACTION).await?;
        let chars: Vec<char> = data.chars().collect();
        let mut written = 0;
        for (page, chunk) in chars.chunks(EXPANSION_PAGE_CAPACITY).enumerate() {
            if page > 0 {
                screen = self.press_pf(PF_FORWARD, SET_ACTION).await?;
            }
            let placed = self.write_expansion_page(&screen, chunk).await?;
            written += placed;
            if placed < chunk.len() {
                warn!(page, placed, wanted = chunk.len(), "expansion page full, stopping early");
                break;
            }
        }
        Ok(written)
    }

    /// Types as much of `chunk` as the page has lines for; returns characters placed.
    async fn write_expansion_page(&mut self, screen: &Screen, chunk: &[char]) -> Result<usize, CeciError> {
        let placed = chunk.len().min(expansion_capacity(screen));
        if placed == 0 {
            return Ok(0);
        }
        let text: String = chunk[..placed].iter().collect();
        self.terminal.home().during(SET_ACTION)?;
        self.terminal.type_text(&text).during(SET_ACTION)?;
        let screen = self.press_enter(SET_ACTION).await?;
        if !is_variables_expansion_screen(&screen) {
            return Err(CeciError::protocol(
                format!("{}: data was not accepted", SET_ACTION),
                &screen,
            ));
        }
        Ok(placed)
    }

    /// Reads `units` characters (hex digits in hex mode) starting from the
    /// expansion page on screen, then returns to the parent screen in text mode.
    pub(crate) async fn read_expanded(
        &mut self,
        units: usize,
        mode: DisplayMode,
        action: &str,
    ) -> Result<String, CeciError> {
        let value = self.read_expansion_pages(units, mode, action).await;
        let restored = self.leave_expansion(action).await;
        let value = value?;
        restored?;
        Ok(value)
    }

    async fn read_expansion_pages(
        &mut self,
        units: usize,
        mode: DisplayMode,
        action: &str,
    ) -> Result<String, CeciError> {
        let mut screen = self.set_mode(mode, action).await?;
        // offsets are shown in bytes; a hex page holds half as many
        let page_offset = match mode {
            DisplayMode::Text => EXPANSION_PAGE_CAPACITY,
            DisplayMode::Hex => EXPANSION_PAGE_CAPACITY / 2,
        };
        let mut value = String::with_capacity(units);
        let mut remaining = units;
        let mut page = 0;
        loop {
            let expected = page * page_offset;
            if expansion_offset(&screen) != Some(expected) {
                return Err(CeciError::protocol(
                    format!("{}: expected expansion page at offset {}", action, expected),
                    &screen,
                ));
            }
            let count = remaining.min(EXPANSION_PAGE_CAPACITY);
            value.push_str(&read_expansion_page(&screen, count));
            remaining -= count;
            if remaining == 0 {
                return Ok(value);
            }
            page += 1;
            screen = self.press_pf(PF_FORWARD, action).await?;
        }
    }
}

// In-memory CECI interpreter used by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use ceci::ceci_constants::*;
use ceci::{Terminal, TerminalError};
use std::collections::HashMap;

const LINE: usize = EXPANSION_LINE_WIDTH;

/// Key presses that reach the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Pf(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Variable(String),
    Option(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Initial,
    CommandBefore,
    CommandAfter,
    Help,
    Message,
    Other,
    Variables { page: usize },
    Expansion { target: Target, page: usize },
    Eib { page: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeVariable {
    pub name: String,
    pub length: String,
    pub data: Vec<u8>,
}

impl FakeVariable {
    pub fn text(&self) -> String {
        self.data.iter().map(|b| *b as char).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeOption {
    pub name: String,
    pub marker: String,
    pub data: Vec<u8>,
}

impl FakeOption {
    pub fn text(name: &str, value: &str) -> Self {
        FakeOption { name: name.to_string(), marker: format!("+{:05}", value.len()), data: value.as_bytes().to_vec() }
    }

    pub fn hex(name: &str, value: &[u8]) -> Self {
        FakeOption { name: name.to_string(), marker: format!("X{:05}", value.len()), data: value.to_vec() }
    }

    pub fn typed(name: &str, code: &str, value: &str) -> Self {
        FakeOption { name: name.to_string(), marker: code.to_string(), data: value.as_bytes().to_vec() }
    }

    pub fn empty(name: &str) -> Self {
        FakeOption { name: name.to_string(), marker: String::new(), data: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub response: String,
    pub resp: i32,
    pub resp2: i32,
    pub banner: Option<String>,
    pub options: Vec<FakeOption>,
}

impl Outcome {
    pub fn normal() -> Self {
        Outcome { response: "NORMAL".to_string(), resp: 0, resp2: 0, banner: None, options: Vec::new() }
    }

    pub fn condition(response: &str, resp: i32, resp2: i32) -> Self {
        Outcome { response: response.to_string(), resp, resp2, ..Outcome::normal() }
    }

    pub fn with_options(mut self, options: Vec<FakeOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_banner(mut self, banner: &str) -> Self {
        self.banner = Some(banner.to_string());
        self
    }
}

/// (label, decimal rendering, hex rendering) of a completed NORMAL command.
pub const EIB_FIELDS: [(&str, &str, &str); 29] = [
    ("EIBTIME", "+0103855", "X'0103855F'"),
    ("EIBDATE", "+0124290", "X'0124290F'"),
    ("EIBTRNID", "'CECI'", "X'C3C5C3C9'"),
    ("EIBTASKN", "+0000412", "X'0000412F'"),
    ("EIBTRMID", "'T001'", "X'E3F0F0F1'"),
    ("EIBCPOSN", "+00004", "X'0004'"),
    ("EIBCALEN", "+00000", "X'0000'"),
    ("EIBAID", "X'7D'", "X'7D'"),
    ("EIBFN", "X'0E02' (LINK)", "X'0E02'"),
    ("EIBRCODE", "X'000000000000'", "X'000000000000'"),
    ("EIBDS", "'        '", "X'4040404040404040'"),
    ("EIBREQID", "'        '", "X'4040404040404040'"),
    ("EIBRSRCE", "'PROG1   '", "X'D7D9D6C7F1404040'"),
    ("EIBSYNC", "X'00'", "X'00'"),
    ("EIBFREE", "X'00'", "X'00'"),
    ("EIBRECV", "X'00'", "X'00'"),
    ("EIBATT", "X'00'", "X'00'"),
    ("EIBEOC", "X'00'", "X'00'"),
    ("EIBFMH", "X'00'", "X'00'"),
    ("EIBCOMPL", "X'00'", "X'00'"),
    ("EIBSIG", "X'00'", "X'00'"),
    ("EIBCONF", "X'00'", "X'00'"),
    ("EIBERR", "X'00'", "X'00'"),
    ("EIBERRCD", "X'00000000'", "X'00000000'"),
    ("EIBSYNRB", "X'00'", "X'00'"),
    ("EIBNODAT", "X'00'", "X'00'"),
    ("EIBRESP", "+0000000000", "X'00000000'"),
    ("EIBRESP2", "+0000000000", "X'00000000'"),
    ("EIBRLDBK", "X'00'", "X'00'"),
];

const EIB_FIELDS_PER_PAGE: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Command,
    Reset,
    SlotName(usize),
    SlotLength(usize),
    OptionName(usize),
    OptionMarker(usize),
    Data(usize),
}

#[derive(Debug, Clone)]
struct Field {
    row: usize,
    col: usize,
    text: Vec<char>,
    modified: bool,
    role: Role,
}

impl Field {
    fn new(row: usize, col: usize, width: usize, content: &str, role: Role) -> Self {
        let mut text: Vec<char> = content.chars().take(width).collect();
        text.resize(width, ' ');
        Field { row, col, text, modified: false, role }
    }

    fn value(&self) -> String {
        self.text.iter().collect()
    }
}

/// Screen-level model of the interpreter: just enough of the real screens
/// for the engine's navigation, variable and command paths.
#[derive(Debug)]
pub struct FakeCeci {
    view: View,
    parents: Vec<View>,
    hex: bool,
    lines: Vec<String>,
    fields: Vec<Field>,
    cursor: usize,
    offset: usize,
    pub variables: Vec<FakeVariable>,
    pub actions: Vec<Key>,
    pub commands: Vec<String>,
    outcomes: HashMap<String, Outcome>,
    current: Option<(String, Outcome)>,
    polls: usize,
    remaining_polls: usize,
    stuck: bool,
    fail_next_wait: Option<TerminalError>,
    fail_next_enter: Option<TerminalError>,
    armed: Option<TerminalError>,
    pub eib: Vec<(String, String, String)>,
}

impl FakeCeci {
    pub fn new() -> Self {
        let mut fake = FakeCeci {
            view: View::Initial,
            parents: Vec::new(),
            hex: false,
            lines: Vec::new(),
            fields: Vec::new(),
            cursor: 0,
            offset: 0,
            variables: Vec::new(),
            actions: Vec::new(),
            commands: Vec::new(),
            outcomes: HashMap::new(),
            current: None,
            polls: 0,
            remaining_polls: 0,
            stuck: false,
            fail_next_wait: None,
            fail_next_enter: None,
            armed: None,
            eib: EIB_FIELDS
                .iter()
                .map(|(l, d, h)| (l.to_string(), d.to_string(), h.to_string()))
                .collect(),
        };
        fake.render();
        fake
    }

    /// Starts on `view` with `parents` as the PF3 chain.
    pub fn showing(mut self, view: View, parents: Vec<View>) -> Self {
        if matches!(view, View::CommandBefore | View::CommandAfter) && self.current.is_none() {
            self.current = Some(("ASSIGN".to_string(), Outcome::normal()));
        }
        self.parents = parents;
        self.view = view;
        self.render();
        self
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.variables.push(FakeVariable {
            name: name.to_string(),
            length: format!("+{:05}", value.len()),
            data: value.as_bytes().to_vec(),
        });
        self.render();
        self
    }

    pub fn with_variables(mut self, count: usize) -> Self {
        for i in 0..count {
            self.variables.push(FakeVariable {
                name: format!("&V{}", i),
                length: "+00001".to_string(),
                data: b"X".to_vec(),
            });
        }
        self.render();
        self
    }

    pub fn on_command(mut self, command: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(command.to_string(), outcome);
        self
    }

    /// Enter presses the command screen needs before it completes.
    pub fn with_polls(mut self, polls: usize) -> Self {
        self.polls = polls;
        self
    }

    /// Typing CECI on an unknown screen no longer restarts the interpreter.
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    pub fn fail_next_wait(&mut self, err: TerminalError) {
        self.fail_next_wait = Some(err);
    }

    pub fn fail_next_enter(&mut self, err: TerminalError) {
        self.fail_next_enter = Some(err);
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn is_hex(&self) -> bool {
        self.hex
    }

    pub fn variable(&self, name: &str) -> Option<&FakeVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn enters(&self) -> usize {
        self.actions.iter().filter(|k| **k == Key::Enter).count()
    }

    pub fn clear_actions(&mut self) {
        self.actions.clear();
    }

    fn goto(&mut self, view: View) {
        self.view = view;
        self.render();
    }

    fn push(&mut self, view: View) {
        let parent = std::mem::replace(&mut self.view, view);
        self.parents.push(parent);
        self.render();
    }

    fn pop(&mut self) {
        let parent = self.parents.pop().unwrap_or(View::Other);
        self.goto(parent);
    }

    fn legend(&self) -> String {
        format!(
            " PF 1 HELP 2 {} 3 END 4 EIB 5 VAR 7 BACK 8 FWD 9 MSG",
            if self.hex { "CHAR" } else { "HEX" }
        )
    }

    fn target_data(&self, target: &Target) -> Vec<u8> {
        match target {
            Target::Variable(name) => self.variable(name).map(|v| v.data.clone()).unwrap_or_default(),
            Target::Option(index) => self
                .current
                .as_ref()
                .and_then(|(_, o)| o.options.get(*index))
                .map(|o| o.data.clone())
                .unwrap_or_default(),
        }
    }

    fn set_target_data(&mut self, target: &Target, data: Vec<u8>) {
        if let Target::Variable(name) = target {
            if let Some(variable) = self.variables.iter_mut().find(|v| &v.name == name) {
                variable.data = data;
            }
        }
    }

    /// The value as the expansion screen shows it in the current mode.
    fn units(&self, data: &[u8]) -> Vec<char> {
        if self.hex {
            hex::encode_upper(data).chars().collect()
        } else {
            data.iter().map(|b| *b as char).collect()
        }
    }

    fn render(&mut self) {
        let mut lines = vec![String::new(); SCREEN_ROWS];
        let mut fields = Vec::new();
        let legend = self.legend();
        match self.view.clone() {
            View::Initial => {
                fields.push(Field::new(0, 1, 79, "", Role::Command));
                lines[1] = format!(" {}", INITIAL_SCREEN_ID);
                lines[3] = " ABend ADDress ASKtime ASSign BIF CANcel CHange CONNect CONVerse".to_string();
                lines[23] = legend;
            }
            View::CommandBefore | View::CommandAfter => {
                let command = self.current.as_ref().map(|(c, _)| c.clone()).unwrap_or_default();
                fields.push(Field::new(0, 1, 79, &command, Role::Command));
                if self.view == View::CommandBefore {
                    lines[1] = format!(" {}", COMMAND_BEFORE_SCREEN_ID);
                } else {
                    let outcome = self.current.as_ref().map(|(_, o)| o.clone()).unwrap_or_else(Outcome::normal);
                    lines[1] = format!(" {}", COMMAND_AFTER_SCREEN_ID);
                    lines[2] = format!(
                        "   RESPONSE: {:<20} EIBRESP={:+011} EIBRESP2={:+011}",
                        outcome.response, outcome.resp, outcome.resp2
                    );
                    lines[3] = outcome.banner.clone().unwrap_or_default();
                    for row in 0..OPTION_ROWS {
                        let option = outcome.options.get(row);
                        let name = option.map(|o| o.name.as_str()).unwrap_or("");
                        let marker = option.map(|o| o.marker.as_str()).unwrap_or("");
                        fields.push(Field::new(4 + row, 1, OPTION_NAME_WIDTH, name, Role::OptionName(row)));
                        fields.push(Field::new(4 + row, 18, LENGTH_FIELD_WIDTH, marker, Role::OptionMarker(row)));
                    }
                }
                lines[23] = legend;
            }
            View::Help => {
                lines[0] = format!(" {}", HELP_SCREEN_ID);
                lines[23] = legend;
            }
            View::Message => {
                lines[0] = format!(" {}", MESSAGE_SCREEN_ID);
                lines[23] = legend;
            }
            View::Other => {
                fields.push(Field::new(0, 1, 79, "", Role::Reset));
                lines[2] = " DFHAC2001 Transaction '' is not recognized.".to_string();
            }
            View::Variables { page } => {
                lines[0] = format!(" {}", VARIABLES_SCREEN_ID);
                for slot in 0..VARIABLE_SLOTS_PER_PAGE {
                    let variable = self.variables.get(page * VARIABLE_SLOTS_PER_PAGE + slot);
                    let name = variable.map(|v| v.name.as_str()).unwrap_or("");
                    let length = variable.map(|v| v.length.as_str()).unwrap_or("");
                    fields.push(Field::new(1 + slot, 1, MAX_NAME_LENGTH, name, Role::SlotName(slot)));
                    fields.push(Field::new(1 + slot, 12, LENGTH_FIELD_WIDTH, length, Role::SlotLength(slot)));
                    if let Some(variable) = variable {
                        let preview: String = variable
                            .data
                            .iter()
                            .take(40)
                            .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
                            .collect();
                        lines[1 + slot] = format!("{:<19}{}", "", preview);
                    }
                }
                lines[23] = legend;
            }
            View::Expansion { target, page } => {
                let title = match &target {
                    Target::Variable(name) => name.clone(),
                    Target::Option(index) => format!("OPTION {}", index + 1),
                };
                lines[0] = format!(" {}  {}", VARIABLES_EXPANSION_SCREEN_ID, title);
                let units = self.units(&self.target_data(&target));
                for line in 0..EXPANSION_ROWS {
                    let start = page * EXPANSION_PAGE_CAPACITY + line * LINE;
                    if start >= units.len() {
                        break;
                    }
                    let offset = if self.hex { start / 2 } else { start };
                    let row = EXPANSION_FIRST_ROW + line;
                    lines[row] = format!(" +{:05}", offset);
                    let content: String = units[start..units.len().min(start + LINE)].iter().collect();
                    fields.push(Field::new(row, EXPANSION_DATA_COLUMN, LINE, &content, Role::Data(line)));
                }
                lines[23] = legend;
            }
            View::Eib { page } => {
                lines[0] = format!(" {}", EIB_SCREEN_ID);
                let start = page * EIB_FIELDS_PER_PAGE;
                for (i, (label, decimal, hex)) in self.eib.iter().skip(start).take(EIB_FIELDS_PER_PAGE).enumerate() {
                    let value = if self.hex { hex } else { decimal };
                    lines[2 + i] = format!("  {:<12} = {}", label, value);
                }
                lines[23] = legend;
            }
        }
        self.lines = lines;
        self.fields = fields;
        self.cursor = 0;
        self.offset = 0;
    }

    fn execute(&mut self, command: String) {
        let outcome = self.outcomes.get(&command).cloned().unwrap_or_else(Outcome::normal);
        self.commands.push(command.clone());
        self.current = Some((command, outcome));
        self.parents.clear();
        self.remaining_polls = self.polls;
        if self.remaining_polls > 0 {
            self.goto(View::CommandBefore);
        } else {
            self.goto(View::CommandAfter);
        }
    }

    fn command_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.role == Role::Command)
    }

    fn press_enter(&mut self) {
        let any_modified = self.fields.iter().any(|f| f.modified);
        match self.view.clone() {
            View::Initial => {
                let command = self.command_field().map(|f| f.value().trim().to_string()).unwrap_or_default();
                if command.is_empty() {
                    self.render();
                } else {
                    self.execute(command);
                }
            }
            View::CommandBefore => {
                let command = self.command_field().map(|f| f.value().trim().to_string()).unwrap_or_default();
                if command.is_empty() {
                    self.current = None;
                    self.goto(View::Initial);
                } else {
                    self.remaining_polls = self.remaining_polls.saturating_sub(1);
                    if self.remaining_polls == 0 {
                        self.goto(View::CommandAfter);
                    } else {
                        self.render();
                    }
                }
            }
            View::CommandAfter => {
                let field = self.command_field().cloned();
                let command = field.as_ref().map(|f| f.value().trim().to_string()).unwrap_or_default();
                if command.is_empty() {
                    self.current = None;
                    self.goto(View::Initial);
                } else if field.map_or(false, |f| f.modified) {
                    self.execute(command);
                } else if !any_modified {
                    let row = match self.fields.get(self.cursor).map(|f| f.role) {
                        Some(Role::OptionName(row)) | Some(Role::OptionMarker(row)) => Some(row),
                        _ => None,
                    };
                    let expandable = row.filter(|r| !self.target_data(&Target::Option(*r)).is_empty());
                    match expandable {
                        Some(row) => self.push(View::Expansion { target: Target::Option(row), page: 0 }),
                        None => self.render(),
                    }
                } else {
                    self.render();
                }
            }
            View::Help | View::Message => self.pop(),
            View::Other => {
                let typed = self.fields.first().map(|f| f.value().trim().to_string()).unwrap_or_default();
                if typed == CECI_TRANSACTION && !self.stuck {
                    self.parents.clear();
                    self.goto(View::Initial);
                } else {
                    self.render();
                }
            }
            View::Variables { page } => {
                if any_modified {
                    self.commit_variables(page);
                    self.render();
                } else {
                    let slot = match self.fields.get(self.cursor).map(|f| f.role) {
                        Some(Role::SlotName(slot)) | Some(Role::SlotLength(slot)) => Some(slot),
                        _ => None,
                    };
                    let name = slot
                        .and_then(|s| self.variables.get(page * VARIABLE_SLOTS_PER_PAGE + s))
                        .map(|v| v.name.clone());
                    match name {
                        Some(name) => self.push(View::Expansion { target: Target::Variable(name), page: 0 }),
                        None => self.render(),
                    }
                }
            }
            View::Expansion { target, page } => {
                self.commit_expansion(&target, page);
                self.render();
            }
            View::Eib { .. } => self.render(),
        }
    }

    fn commit_variables(&mut self, page: usize) {
        let mut deleted = Vec::new();
        let mut created = Vec::new();
        for slot in 0..VARIABLE_SLOTS_PER_PAGE {
            let name = self.slot_field(Role::SlotName(slot)).trim().to_string();
            let length = self.slot_field(Role::SlotLength(slot)).trim().to_string();
            let index = page * VARIABLE_SLOTS_PER_PAGE + slot;
            match (self.variables.get(index), name.is_empty()) {
                (Some(_), true) => deleted.push(index),
                (None, false) => {
                    if let Some(size) = fake_length(&length) {
                        let length = if length.starts_with(['+', '-']) || length.starts_with(|c: char| c.is_ascii_digit()) {
                            format!("+{:05}", size)
                        } else {
                            length.clone()
                        };
                        created.push(FakeVariable { name, length, data: vec![b' '; size] });
                    }
                }
                _ => {}
            }
        }
        let mut index = 0;
        self.variables.retain(|_| {
            let keep = !deleted.contains(&index);
            index += 1;
            keep
        });
        for variable in created {
            if self.variables.len() < VARIABLE_SLOTS_PER_PAGE * VARIABLE_PAGES {
                self.variables.push(variable);
            }
        }
    }

    fn slot_field(&self, role: Role) -> String {
        self.fields.iter().find(|f| f.role == role).map(Field::value).unwrap_or_default()
    }

    fn commit_expansion(&mut self, target: &Target, page: usize) {
        let data = self.target_data(target);
        let mut units = self.units(&data);
        for field in &self.fields {
            if let Role::Data(line) = field.role {
                let start = page * EXPANSION_PAGE_CAPACITY + line * LINE;
                let end = units.len().min(start + LINE);
                for (i, unit) in (start..end).enumerate() {
                    units[unit] = field.text[i];
                }
            }
        }
        let data = if self.hex {
            let digits: String = units.iter().collect();
            match hex::decode(&digits) {
                Ok(bytes) => bytes,
                Err(_) => data,
            }
        } else {
            units.iter().map(|c| *c as u8).collect()
        };
        self.set_target_data(target, data);
    }

    fn press_pf(&mut self, key: u8) {
        match (key, self.view.clone()) {
            (_, View::Other) => self.render(),
            (PF_HEX, View::Expansion { target, .. }) => {
                self.hex = !self.hex;
                self.goto(View::Expansion { target, page: 0 });
            }
            (PF_HEX, _) => {
                self.hex = !self.hex;
                self.render();
            }
            (PF_END, View::Initial) => {
                self.parents.clear();
                self.goto(View::Other);
            }
            (PF_END, View::CommandBefore) | (PF_END, View::CommandAfter) => {
                self.current = None;
                self.goto(View::Initial);
            }
            (PF_END, _) => self.pop(),
            (PF_HELP, View::Help) => self.render(),
            (PF_HELP, _) => self.push(View::Help),
            (PF_MESSAGES, View::Message) => self.render(),
            (PF_MESSAGES, _) => self.push(View::Message),
            (PF_EIB, View::Initial) | (PF_EIB, View::CommandBefore) | (PF_EIB, View::CommandAfter) => {
                self.push(View::Eib { page: 0 })
            }
            (PF_VARIABLES, View::Initial) | (PF_VARIABLES, View::CommandBefore) | (PF_VARIABLES, View::CommandAfter) => {
                self.push(View::Variables { page: 0 })
            }
            (PF_FORWARD, View::Variables { page }) => {
                self.goto(View::Variables { page: (page + 1).min(VARIABLE_PAGES - 1) })
            }
            (PF_BACKWARD, View::Variables { page }) => self.goto(View::Variables { page: page.saturating_sub(1) }),
            (PF_FORWARD, View::Expansion { target, page }) => {
                let total = self.units(&self.target_data(&target)).len();
                let next = if (page + 1) * EXPANSION_PAGE_CAPACITY < total { page + 1 } else { page };
                self.goto(View::Expansion { target, page: next });
            }
            (PF_BACKWARD, View::Expansion { target, page }) => {
                self.goto(View::Expansion { target, page: page.saturating_sub(1) })
            }
            (PF_FORWARD, View::Eib { .. }) => self.goto(View::Eib { page: 1 }),
            (PF_BACKWARD, View::Eib { .. }) => self.goto(View::Eib { page: 0 }),
            _ => self.render(),
        }
    }
}

/// Data size of a new variable from its length column.
fn fake_length(length: &str) -> Option<usize> {
    match length {
        "H" => Some(6),
        "F" => Some(11),
        "D" => Some(20),
        "P" => Some(9),
        "PD" => Some(18),
        other => other.parse::<i64>().ok().and_then(|n| usize::try_from(n).ok()),
    }
}

#[async_trait]
impl Terminal for FakeCeci {
    fn type_text(&mut self, text: &str) -> Result<(), TerminalError> {
        if self.fields.is_empty() {
            return Err(TerminalError::FieldNotFound { row: 0, col: 0 });
        }
        for ch in text.chars() {
            if self.offset >= self.fields[self.cursor].text.len() {
                if self.cursor + 1 >= self.fields.len() {
                    break;
                }
                self.cursor += 1;
                self.offset = 0;
            }
            let field = &mut self.fields[self.cursor];
            field.text[self.offset] = ch;
            field.modified = true;
            self.offset += 1;
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<(), TerminalError> {
        self.actions.push(Key::Enter);
        if let Some(err) = self.fail_next_enter.take() {
            self.armed = Some(err);
        }
        self.press_enter();
        Ok(())
    }

    fn tab(&mut self) -> Result<(), TerminalError> {
        if !self.fields.is_empty() {
            self.cursor = (self.cursor + 1) % self.fields.len();
            self.offset = 0;
        }
        Ok(())
    }

    fn home(&mut self) -> Result<(), TerminalError> {
        self.cursor = 0;
        self.offset = 0;
        Ok(())
    }

    fn new_line(&mut self) -> Result<(), TerminalError> {
        let row = self.fields.get(self.cursor).map(|f| f.row).unwrap_or(0);
        if let Some(next) = self.fields.iter().position(|f| f.row > row) {
            self.cursor = next;
        }
        self.offset = 0;
        Ok(())
    }

    fn cursor_left(&mut self) -> Result<(), TerminalError> {
        self.offset = self.offset.saturating_sub(1);
        Ok(())
    }

    fn erase_eof(&mut self) -> Result<(), TerminalError> {
        let offset = self.offset;
        let field = self
            .fields
            .get_mut(self.cursor)
            .ok_or(TerminalError::FieldNotFound { row: 0, col: 0 })?;
        for ch in field.text.iter_mut().skip(offset) {
            *ch = ' ';
        }
        field.modified = true;
        Ok(())
    }

    fn pf(&mut self, number: u8) -> Result<(), TerminalError> {
        self.actions.push(Key::Pf(number));
        self.press_pf(number);
        Ok(())
    }

    async fn wait_for_keyboard(&mut self) -> Result<(), TerminalError> {
        if let Some(err) = self.armed.take().or_else(|| self.fail_next_wait.take()) {
            return Err(err);
        }
        Ok(())
    }

    fn retrieve_screen(&mut self) -> Result<String, TerminalError> {
        let mut grid: Vec<Vec<char>> = self
            .lines
            .iter()
            .map(|line| {
                let mut row: Vec<char> = line.chars().take(SCREEN_COLUMNS).collect();
                row.resize(SCREEN_COLUMNS, ' ');
                row
            })
            .collect();
        for field in &self.fields {
            for (i, ch) in field.text.iter().enumerate() {
                if let Some(cell) = grid[field.row].get_mut(field.col + i) {
                    *cell = *ch;
                }
            }
        }
        Ok(grid.into_iter().map(|row| row.into_iter().collect::<String>()).collect::<Vec<_>>().join("\n"))
    }

    fn retrieve_field_at_cursor(&mut self) -> Result<String, TerminalError> {
        self.fields
            .get(self.cursor)
            .map(Field::value)
            .ok_or(TerminalError::FieldNotFound { row: 0, col: 0 })
    }
}

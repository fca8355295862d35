// Exec interface block capture and parsing
use chrono::{NaiveDate, NaiveTime};
use neo6_protocols_lib::Terminal;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::ceci_constants::*;
use crate::ceci_screens::{DisplayMode, Screen, ScreenKind};
use crate::errors::CeciError;
use crate::session::CeciSession;
use crate::Codec;

// label = value [(mnemonic)], value is signed decimal, 'quoted' or X'hex'
const FIELD_LINE_PATTERN: &str = r"^\s*(EIB[A-Z0-9]+)\s*=\s*(X'[0-9A-Fa-f]*'|'[^']*'|[+-]?\d+)\s*(?:\(([^)]*)\))?";

/// How a field is rendered on the decimal capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Decimal,
    Character,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EibField {
    Time,
    Date,
    TransactionId,
    TaskNumber,
    TerminalId,
    CursorPosition,
    CommareaLength,
    Aid,
    FunctionCode,
    ResponseCode,
    Dataset,
    RequestId,
    Resource,
    Sync,
    Free,
    Receive,
    Attach,
    EndOfChain,
    FunctionManagementHeader,
    Complete,
    Signal,
    Confirm,
    Error,
    ErrorCode,
    SyncRollback,
    NoData,
    Resp,
    Resp2,
    Rollback,
}

impl EibField {
    /// Every field in the order the interpreter lists them.
    pub const ALL: [EibField; 29] = [
        EibField::Time,
        EibField::Date,
        EibField::TransactionId,
        EibField::TaskNumber,
        EibField::TerminalId,
        EibField::CursorPosition,
        EibField::CommareaLength,
        EibField::Aid,
        EibField::FunctionCode,
        EibField::ResponseCode,
        EibField::Dataset,
        EibField::RequestId,
        EibField::Resource,
        EibField::Sync,
        EibField::Free,
        EibField::Receive,
        EibField::Attach,
        EibField::EndOfChain,
        EibField::FunctionManagementHeader,
        EibField::Complete,
        EibField::Signal,
        EibField::Confirm,
        EibField::Error,
        EibField::ErrorCode,
        EibField::SyncRollback,
        EibField::NoData,
        EibField::Resp,
        EibField::Resp2,
        EibField::Rollback,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EibField::Time => "EIBTIME",
            EibField::Date => "EIBDATE",
            EibField::TransactionId => "EIBTRNID",
            EibField::TaskNumber => "EIBTASKN",
            EibField::TerminalId => "EIBTRMID",
            EibField::CursorPosition => "EIBCPOSN",
            EibField::CommareaLength => "EIBCALEN",
            EibField::Aid => "EIBAID",
            EibField::FunctionCode => "EIBFN",
            EibField::ResponseCode => "EIBRCODE",
            EibField::Dataset => "EIBDS",
            EibField::RequestId => "EIBREQID",
            EibField::Resource => "EIBRSRCE",
            EibField::Sync => "EIBSYNC",
            EibField::Free => "EIBFREE",
            EibField::Receive => "EIBRECV",
            EibField::Attach => "EIBATT",
            EibField::EndOfChain => "EIBEOC",
            EibField::FunctionManagementHeader => "EIBFMH",
            EibField::Complete => "EIBCOMPL",
            EibField::Signal => "EIBSIG",
            EibField::Confirm => "EIBCONF",
            EibField::Error => "EIBERR",
            EibField::ErrorCode => "EIBERRCD",
            EibField::SyncRollback => "EIBSYNRB",
            EibField::NoData => "EIBNODAT",
            EibField::Resp => "EIBRESP",
            EibField::Resp2 => "EIBRESP2",
            EibField::Rollback => "EIBRLDBK",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            EibField::Time
            | EibField::Date
            | EibField::TaskNumber
            | EibField::CursorPosition
            | EibField::CommareaLength
            | EibField::Resp
            | EibField::Resp2 => FieldKind::Decimal,
            EibField::TransactionId
            | EibField::TerminalId
            | EibField::Dataset
            | EibField::RequestId
            | EibField::Resource => FieldKind::Character,
            _ => FieldKind::Hex,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    Decimal(String),
    Quoted(String),
    Hex(String),
}

impl Literal {
    fn parse(raw: &str) -> Self {
        if let Some(digits) = raw.strip_prefix("X'").and_then(|r| r.strip_suffix('\'')) {
            Literal::Hex(digits.to_string())
        } else if let Some(text) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            Literal::Quoted(text.to_string())
        } else {
            Literal::Decimal(raw.to_string())
        }
    }

    fn display(self) -> String {
        match self {
            Literal::Decimal(text) | Literal::Quoted(text) | Literal::Hex(text) => text,
        }
    }
}

/// Every labelled line of a capture, keyed by label.
fn scan_capture(capture: &str, regex: &Regex) -> HashMap<String, (Literal, Option<String>)> {
    capture
        .lines()
        .filter_map(|line| regex.captures(line))
        .map(|caps| {
            let mnemonic = caps.get(3).map(|m| m.as_str().trim().to_string()).filter(|m| !m.is_empty());
            (caps[1].to_string(), (Literal::parse(&caps[2]), mnemonic))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct EibEntry {
    display: String,
    mnemonic: Option<String>,
    bytes: Vec<u8>,
}

/// Diagnostic block describing the last executed command.
///
/// Built from the decimal and hex renderings of the same block. A label that
/// is missing or malformed in either rendering yields defaults (0, empty text,
/// empty bytes) and is listed by [`ExecInterfaceBlock::missing_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecInterfaceBlock {
    entries: HashMap<EibField, EibEntry>,
    missing: Vec<EibField>,
}

impl ExecInterfaceBlock {
    /// `decimal` and `hex` are each the concatenation of both EIB pages.
    pub fn parse(decimal: &str, hex: &str) -> Result<Self, CeciError> {
        let regex = Regex::new(FIELD_LINE_PATTERN)?;
        let mut decimal_fields = scan_capture(decimal, &regex);
        let mut hex_fields = scan_capture(hex, &regex);

        let mut entries = HashMap::new();
        let mut missing = Vec::new();
        for field in EibField::ALL {
            let label = field.label();
            let mut entry = EibEntry::default();
            let mut complete = true;
            match decimal_fields.remove(label) {
                Some((literal, mnemonic)) => {
                    entry.display = literal.display();
                    entry.mnemonic = mnemonic;
                }
                None => complete = false,
            }
            match hex_fields.remove(label).map(|(literal, _)| literal) {
                Some(Literal::Hex(digits)) => match hex::decode(&digits) {
                    Ok(bytes) => entry.bytes = bytes,
                    Err(_) => complete = false,
                },
                _ => complete = false,
            }
            if !complete {
                warn!(label, "EIB field missing or malformed, using defaults");
                missing.push(field);
            }
            entries.insert(field, entry);
        }
        debug!(missing = missing.len(), "EIB parsed");
        Ok(ExecInterfaceBlock { entries, missing })
    }

    fn entry(&self, field: EibField) -> Option<&EibEntry> {
        self.entries.get(&field)
    }

    /// Trimmed display form from the decimal capture.
    pub fn text(&self, field: EibField) -> &str {
        self.entry(field).map(|e| e.display.trim()).unwrap_or("")
    }

    /// Exact bytes from the hex capture.
    pub fn bytes(&self, field: EibField) -> &[u8] {
        self.entry(field).map(|e| e.bytes.as_slice()).unwrap_or(&[])
    }

    /// Parenthesized annotation following the value, if any.
    pub fn mnemonic(&self, field: EibField) -> Option<&str> {
        self.entry(field).and_then(|e| e.mnemonic.as_deref())
    }

    /// Signed decimal value; 0 when the field does not render as a number.
    pub fn decimal(&self, field: EibField) -> i32 {
        self.text(field).parse().unwrap_or(0)
    }

    /// The hex bytes translated from EBCDIC.
    pub fn decoded(&self, field: EibField) -> String {
        let ascii = Codec::new().to_ascii(self.bytes(field));
        String::from_utf8_lossy(&ascii).into_owned()
    }

    /// First byte of a one-byte indicator, 0 when absent.
    pub fn flag(&self, field: EibField) -> u8 {
        self.bytes(field).first().copied().unwrap_or(0)
    }

    pub fn time(&self) -> i32 {
        self.decimal(EibField::Time)
    }

    pub fn date(&self) -> i32 {
        self.decimal(EibField::Date)
    }

    pub fn transaction_id(&self) -> &str {
        self.text(EibField::TransactionId)
    }

    pub fn task_number(&self) -> i32 {
        self.decimal(EibField::TaskNumber)
    }

    pub fn terminal_id(&self) -> &str {
        self.text(EibField::TerminalId)
    }

    pub fn cursor_position(&self) -> i32 {
        self.decimal(EibField::CursorPosition)
    }

    pub fn commarea_length(&self) -> i32 {
        self.decimal(EibField::CommareaLength)
    }

    pub fn aid(&self) -> u8 {
        self.flag(EibField::Aid)
    }

    pub fn function_code(&self) -> &[u8] {
        self.bytes(EibField::FunctionCode)
    }

    /// Command name shown next to EIBFN, e.g. "READ".
    pub fn function_name(&self) -> Option<&str> {
        self.mnemonic(EibField::FunctionCode)
    }

    pub fn response_code(&self) -> &[u8] {
        self.bytes(EibField::ResponseCode)
    }

    pub fn dataset(&self) -> &str {
        self.text(EibField::Dataset)
    }

    pub fn request_id(&self) -> &str {
        self.text(EibField::RequestId)
    }

    pub fn resource(&self) -> &str {
        self.text(EibField::Resource)
    }

    pub fn resp(&self) -> i32 {
        self.decimal(EibField::Resp)
    }

    pub fn resp2(&self) -> i32 {
        self.decimal(EibField::Resp2)
    }

    /// "NORMAL" when both response codes are zero, else the EIBRESP mnemonic.
    pub fn response(&self) -> String {
        if self.resp() == 0 && self.resp2() == 0 {
            return "NORMAL".to_string();
        }
        self.mnemonic(EibField::Resp).unwrap_or("").to_string()
    }

    /// EIBTIME as 0HHMMSS.
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        let time = u32::try_from(self.time()).ok()?;
        NaiveTime::from_hms_opt(time / 10000, time / 100 % 100, time % 100)
    }

    /// EIBDATE as 0CYYDDD, century 0 meaning 19xx.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        let date = u32::try_from(self.date()).ok()?;
        let year = 1900 + (date / 100_000) * 100 + date / 1000 % 100;
        NaiveDate::from_yo_opt(i32::try_from(year).ok()?, date % 1000)
    }

    pub fn missing_fields(&self) -> &[EibField] {
        &self.missing
    }
}

impl<T: Terminal> CeciSession<T> {
    /// Captures both EIB pages in text and hex mode and parses them.
    pub async fn get_exec_interface_block(&mut self) -> Result<ExecInterfaceBlock, CeciError> {
        const ACTION: &str = "Unable to get exec interface block";
        self.ensure_ceci_screen()?;
        let screen = self.navigate(ScreenKind::Eib).await?;
        self.sync_mode(&screen);
        let decimal_first = self.set_mode(DisplayMode::Text, ACTION).await?;
        let decimal_second = self.press_pf(PF_FORWARD, ACTION).await?;
        Self::expect_kind(&decimal_second, ScreenKind::Eib, ACTION)?;

        let hex_second = self.set_mode(DisplayMode::Hex, ACTION).await?;
        let hex_first = self.press_pf(PF_BACKWARD, ACTION).await?;
        Self::expect_kind(&hex_first, ScreenKind::Eib, ACTION)?;

        self.set_mode(DisplayMode::Text, ACTION).await?;
        self.press_pf(PF_END, ACTION).await?;

        let decimal = join_pages(&decimal_first, &decimal_second);
        let hex = join_pages(&hex_first, &hex_second);
        ExecInterfaceBlock::parse(&decimal, &hex)
    }
}

fn join_pages(first: &Screen, second: &Screen) -> String {
    format!("{}\n{}", first.text(), second.text())
}

use ebcdic::ebcdic::Ebcdic;

// Módulos del intérprete CECI
pub mod ceci_constants;
pub mod ceci_screens;
pub mod config;
pub mod eib;
pub mod errors;
pub mod logging;
pub mod navigation;
pub mod response;
pub mod session;
pub mod variables;

pub use ceci_screens::{classify, detect_mode, is_known_kind, DisplayMode, Screen, ScreenKind};
pub use config::CeciConfig;
pub use eib::{EibField, ExecInterfaceBlock, FieldKind};
pub use errors::{CeciError, ValidationError};
pub use neo6_protocols_lib::{Terminal, TerminalError};
pub use response::{parse_response_line, CommandResponse, OptionValue};
pub use session::CeciSession;
pub use variables::{validate_variable, LengthField, VariableType};

/// Character translation for data the host keeps in EBCDIC.
#[derive(Debug)]
pub struct Codec {
    use_ebcdic: bool,
}

impl Codec {
    pub fn new() -> Self {
        Codec { use_ebcdic: true }
    }

    /// A codec that passes bytes through unchanged.
    pub fn passthrough() -> Self {
        Codec { use_ebcdic: false }
    }

    pub fn to_ascii(&self, data: &[u8]) -> Vec<u8> {
        if self.use_ebcdic {
            let mut output = vec![0u8; data.len()];
            Ebcdic::ebcdic_to_ascii(data, &mut output, data.len(), false, true);
            output
        } else {
            data.to_vec()
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

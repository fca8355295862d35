// CECI screen constants: markers, geometry and key assignments.
// Use these named constants instead of literal strings and offsets throughout the engine.

// 3270 model 2 presentation space
pub const SCREEN_COLUMNS: usize = 80;
pub const SCREEN_ROWS: usize = 24;

// Screen identification markers
pub const INITIAL_SCREEN_ID: &str = "STATUS:  ENTER ONE OF THE FOLLOWING";
pub const COMMAND_BEFORE_SCREEN_ID: &str = "STATUS:  ABOUT TO EXECUTE COMMAND";
pub const COMMAND_SYNTAX_SCREEN_ID: &str = "STATUS:  COMMAND SYNTAX CHECK";
pub const COMMAND_AFTER_SCREEN_ID: &str = "STATUS:  COMMAND EXECUTION COMPLETE";
pub const HELP_SCREEN_ID: &str = "GENERAL HELP INFORMATION";
pub const EIB_SCREEN_ID: &str = "EXEC INTERFACE BLOCK";
pub const VARIABLES_SCREEN_ID: &str = "VARIABLES   LENGTH   DATA";
pub const VARIABLES_EXPANSION_SCREEN_ID: &str = "EXPANDED AREA";
pub const MESSAGE_SCREEN_ID: &str = "MESSAGE DISPLAY";

// PF key legend entries that reveal the current display mode
pub const HEX_OFF_LEGEND: &str = "2 HEX";
pub const HEX_ON_LEGEND: &str = "2 CHAR";

// Failure markers on the command-complete screen
pub const ABEND_MARKER: &str = "DFHAC2206";
pub const COMMAND_FAILED_MARKER: &str = "COMMAND NOT EXECUTED";

// Transaction typed to restart the interpreter from an unknown screen
pub const CECI_TRANSACTION: &str = "CECI";

// Key assignments
pub const PF_HELP: u8 = 1;
pub const PF_HEX: u8 = 2;
pub const PF_END: u8 = 3;
pub const PF_EIB: u8 = 4;
pub const PF_VARIABLES: u8 = 5;
pub const PF_BACKWARD: u8 = 7;
pub const PF_FORWARD: u8 = 8;
pub const PF_MESSAGES: u8 = 9;

// Variables
pub const VARIABLE_PREFIX: char = '&';
pub const MAX_NAME_LENGTH: usize = 10;
pub const MAX_VALUE_LENGTH: usize = 32767;

// Variables listing: slots per page and the number of pages the listing holds
pub const VARIABLE_SLOTS_PER_PAGE: usize = 18;
pub const VARIABLE_PAGES: usize = 4;
pub const LENGTH_FIELD_WIDTH: usize = 6;

// Expansion screen: rows 2..=21, data field at column 9
pub const EXPANSION_FIRST_ROW: usize = 2;
pub const EXPANSION_ROWS: usize = 20;
pub const EXPANSION_DATA_COLUMN: usize = 9;
pub const EXPANSION_LINE_WIDTH: usize = 64;
pub const EXPANSION_PAGE_CAPACITY: usize = EXPANSION_ROWS * EXPANSION_LINE_WIDTH;

// Command-complete screen option table
pub const OPTION_ROWS: usize = 15;
pub const OPTION_NAME_WIDTH: usize = 16;

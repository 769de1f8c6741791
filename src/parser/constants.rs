// Fixed markers and offsets of the VB6 source format

/// First line of every class module
pub const CLASS_MARKER: &str = "VERSION 1.0 CLASS";

/// Trailing marker joining a physical line with the next one
pub const LINE_CONTINUATION: char = '_';

/// Separates multiple instructions on one logical line
pub const INSTRUCTION_SEPARATOR: char = ':';

/// Trailing marker of a label
pub const LABEL_MARKER: char = ':';

pub const COMMENT_MARKER: char = '\'';

/// Legacy comment keyword
pub const REM_KEYWORD: &str = "Rem";

pub const STRING_DELIMITER: char = '"';

/// Physical line indexes (0-based) of the five `Key = <int>` class flags
pub const CLASS_FLAG_LINES: [usize; 5] = [2, 3, 4, 5, 6];

/// Physical line indexes (0-based) of the five class header attributes
pub const CLASS_ATTRIBUTE_LINES: [usize; 5] = [8, 9, 10, 11, 12];

/// First line after the class header
pub const CLASS_BODY_START: usize = 13;

/// First line after the single attribute of a plain module
pub const MODULE_BODY_START: usize = 1;

/// Attribute holding the canonical module name
pub const NAME_ATTRIBUTE: &str = "VB_Name";

/// File part of an error when no file name was given
pub const UNNAMED_INPUT: &str = "<input>";

/// Delimits date and time literals such as `#12:30:00 PM#`
pub const DATE_DELIMITER: char = '#';

//! Diagnostic codes emitted by the lexer and parser.

pub const UNRECOGNIZED_CHARACTER: u32 = 1001;
pub const UNTERMINATED_STRING: u32 = 1002;
pub const MALFORMED_NUMBER: u32 = 1003;
pub const EXPECTED_TOKEN: u32 = 1004;
pub const EXPECTED_STATEMENT: u32 = 1005;
pub const EXPECTED_EXPRESSION: u32 = 1006;
pub const EXPECTED_TYPE: u32 = 1007;

//! Diagnostic codes emitted by the checker.

pub const UNKNOWN_NAME: u32 = 2001;
pub const TYPE_MISMATCH: u32 = 2002;
pub const DUPLICATE_DECLARATION: u32 = 2003;
pub const UNKNOWN_TYPE: u32 = 2004;
pub const NOT_CALLABLE: u32 = 2005;
pub const ASSIGNMENT_TO_CONST: u32 = 2006;
/// The diagnostic the top-level-suspend filter intercepts.
pub const AWAIT_OUTSIDE_ASYNC: u32 = 2007;
pub const WRONG_ARGUMENT_COUNT: u32 = 2008;
pub const MODULE_NOT_FOUND: u32 = 2009;
pub const UNKNOWN_EXPORT: u32 = 2010;
pub const UNKNOWN_PROPERTY: u32 = 2011;
pub const NOT_CONSTRUCTIBLE: u32 = 2012;
pub const CIRCULAR_IMPORT: u32 = 2013;

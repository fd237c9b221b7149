//! Stable exit codes for `ringenv`.

/// Environment printed.
pub const OK: i32 = 0;
/// Bad command line or malformed `NAME=VALUE` assignment.
pub const INVALID: i32 = 1;
/// `--get` named a variable that is not set.
pub const NOT_FOUND: i32 = 2;

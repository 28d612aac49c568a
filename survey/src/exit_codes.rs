//! Stable exit codes for survey CLI commands.

/// Command succeeded; for `survey run`, the answers were delivered.
pub const OK: i32 = 0;
/// Invalid config, question sets or arguments, or another error.
pub const INVALID: i32 = 1;
/// `survey run` ended before a delivery succeeded.
pub const NOT_SUBMITTED: i32 = 2;

//! Stable exit codes for appmanager CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, descriptor or arguments, or another error.
pub const INVALID: i32 = 1;
/// `check-deps` found at least one unreachable dependency.
pub const UNSATISFIED: i32 = 2;
/// A module is not running or a connection is not connected afterwards.
pub const DEGRADED: i32 = 3;

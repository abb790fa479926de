//! Stable exit codes for the CLI.

/// The run reached terminal. Cancelled and reported failures count.
pub const OK: i32 = 0;
/// Missing request, invalid config or any fatal run error.
pub const INVALID: i32 = 1;

//! Stable exit codes for scaffolder CLI commands.

/// Pipeline ran to completion (warned-and-continued failures included).
pub const OK: i32 = 0;
/// Invalid configuration, a mutation error, or an abort-on-failure command failed.
pub const FAILED: i32 = 1;

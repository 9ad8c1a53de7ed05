//! Shared filesystem helpers, the project debug log, and the recycle-bin
//! wrapper used across all skillink crates.

pub mod debug;
pub mod fs;
pub mod recycle;

//! I/O helpers: processes, logs, configuration and descriptor files.

pub mod command_log;
pub mod config;
pub mod descriptor;
pub mod process;
pub mod summary;

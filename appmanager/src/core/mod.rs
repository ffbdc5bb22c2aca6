//! Deterministic, pure logic for the application manager.
//!
//! Core modules must be free of I/O side effects: they describe the model,
//! build argument vectors and define status events. Nothing here spawns a
//! process or touches the filesystem.

pub mod argv;
pub mod model;
pub mod params;
pub mod status;

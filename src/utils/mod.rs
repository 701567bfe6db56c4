//! Small helpers shared across the engine.

pub mod json_path;

pub use json_path::lookup_path;

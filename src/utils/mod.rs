//! Utility modules: developer benchmark logging and JSON conversion.
pub mod devlog;
pub mod json;

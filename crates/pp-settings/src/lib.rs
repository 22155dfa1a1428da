//! Privacy Please Settings
//!
//! This crate reads stored settings documents (current and legacy layouts),
//! upgrades them against the built-in site set and persists them as JSON.

pub mod file;
pub mod normalize;
pub mod parser;

pub use file::{to_json, JsonFileBackend};
pub use normalize::{normalize_settings, NormalizeStats};
pub use parser::{parse_settings, DocumentFormat, ParseError, ParsedSettings};

/// Parse and normalize in one step.
pub fn load_settings(text: &str) -> Result<(pp_core::Settings, NormalizeStats), ParseError> {
    let mut settings = parse_settings(text)?.settings;
    let stats = normalize_settings(&mut settings);
    Ok((settings, stats))
}

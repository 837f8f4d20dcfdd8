//! Rule engine error types

use thiserror::Error;

/// Result type for rule operations
pub type RuleResult<T> = std::result::Result<T, RuleError>;

/// Rule engine errors
#[derive(Debug, Error)]
pub enum RuleError {
    /// One rule failed to evaluate; the cycle continues with the others
    #[error("Rule evaluation error in '{rule}': {message}")]
    Evaluation { rule: &'static str, message: String },

    /// Rule settings file could not be read
    #[error("Failed to read rule settings: {0}")]
    SettingsIo(#[from] std::io::Error),

    /// Rule settings file could not be parsed
    #[error("Failed to parse rule settings: {0}")]
    SettingsParse(#[from] serde_yaml::Error),
}

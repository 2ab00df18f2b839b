use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid property name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("cannot convert '{value}' to {target} for property '{name}'")]
    Conversion {
        name: String,
        value: String,
        target: &'static str,
    },

    #[error("property '{name}' has no element at index {missing}")]
    IndexGap { name: String, missing: usize },

    #[error("circular placeholder reference: {0}")]
    CircularReference(String),

    #[error("unclosed placeholder (missing '}}')")]
    UnclosedReference,
}

pub mod config;
pub mod security;

pub use config::{Binder, ConfigError};
pub use security::SecurityProperties;

//! Configuration loaded from `~/.config/kashflow/config.toml`.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{Config, FetchConfig, LoggingConfig};

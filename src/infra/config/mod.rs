pub mod config_file;
pub mod loader;

use std::path::PathBuf;

use thiserror::Error;

pub use config_file::{CURRENT_VERSION, ConfigFile};
pub use loader::{load_config, resolve_config_path};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("No config file found (looked for {})", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    Read(String),
    #[error("Invalid config format: {0}")]
    InvalidFormat(String),
    #[error("Config version mismatch: found v{found}, expected v{expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("Missing config field: {0}")]
    MissingField(&'static str),
}

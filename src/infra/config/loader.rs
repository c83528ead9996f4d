use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use obreplay_domain::ToolConfig;

use super::ConfigError;
use super::config_file::{CURRENT_VERSION, ConfigFile};

pub const CONFIG_ENV_VAR: &str = "OBREPLAY_CONFIG";
const LOCAL_FILE_NAME: &str = "obreplay.toml";

/// First match of: explicit flag, `OBREPLAY_CONFIG`, `./obreplay.toml`,
/// `<config_dir>/obreplay/config.toml`.
///
/// Explicit paths are returned even when missing so the load reports them.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
    cwd: &Path,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = lookup(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let local = cwd.join(LOCAL_FILE_NAME);
    if local.is_file() {
        return Ok(local);
    }
    if let Some(user) = config_dir.map(|dir| dir.join("obreplay").join("config.toml")) {
        if user.is_file() {
            return Ok(user);
        }
    }
    Err(ConfigError::NotFound(local))
}

/// Reads, version-checks, applies environment overrides and resolves.
pub fn load_config(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ToolConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    debug!(path = %path.display(), "loading config");

    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    let mut file: ConfigFile =
        toml::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

    if file.version != CURRENT_VERSION {
        return Err(ConfigError::VersionMismatch {
            found: file.version,
            expected: CURRENT_VERSION,
        });
    }

    file.apply_env(lookup);
    file.into_tool_config()
}

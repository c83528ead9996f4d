use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use obreplay_domain::connection::{SourceProfile, TargetMode, TargetProfile};
use obreplay_domain::{OmaSettings, ToolConfig};

use super::ConfigError;

pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub target: TargetSection,
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub oma: OmaSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    pub dsn: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub schema: Option<String>,
    pub sqlplus_path: Option<String>,
    pub source_host: Option<String>,
    pub source_port: Option<u16>,
    pub source_service: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tenant: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    #[serde(default)]
    pub mode: TargetMode,
    pub obclient_path: Option<String>,
    pub connect_timeout: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureSection {
    #[serde(default)]
    pub schemas: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OmaSection {
    pub start_script: Option<PathBuf>,
    pub report_root: Option<PathBuf>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingField(field))
}

impl ConfigFile {
    /// Environment values replace whatever the file says.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(password) = lookup("ORACLE_PASSWORD") {
            self.source.password = Some(password);
        }
        if let Some(password) = lookup("OB_PASSWORD") {
            self.target.password = Some(password);
        }
        if let Some(script) = lookup("OMA_START_SCRIPT") {
            self.oma.start_script = Some(PathBuf::from(script));
        }
        if let Some(root) = lookup("OMA_REPORT_ROOT") {
            self.oma.report_root = Some(PathBuf::from(root));
        }
    }

    pub fn into_tool_config(self) -> Result<ToolConfig, ConfigError> {
        let s = self.source;
        let mut source = SourceProfile::new(
            required(s.dsn, "source.dsn")?,
            required(s.user, "source.user")?,
            s.password.unwrap_or_default(),
        );
        source.schema = s.schema;
        if let Some(path) = s.sqlplus_path {
            source.sqlplus_path = path;
        }
        source.source_host = s.source_host;
        source.source_port = s.source_port;
        source.source_service = s.source_service;
        if let Some(secs) = s.timeout_secs {
            source.timeout_secs = secs;
        }

        let t = self.target;
        let mut target = TargetProfile::new(
            required(t.host, "target.host")?,
            t.port.ok_or(ConfigError::MissingField("target.port"))?,
            required(t.tenant, "target.tenant")?,
            required(t.user, "target.user")?,
            t.password.unwrap_or_default(),
        );
        target.database = t.database;
        target.mode = t.mode;
        if let Some(path) = t.obclient_path {
            target.obclient_path = path;
        }
        if let Some(secs) = t.connect_timeout {
            target.connect_timeout = secs;
        }
        if let Some(secs) = t.timeout_secs {
            target.timeout_secs = secs;
        }

        Ok(ToolConfig {
            source,
            target,
            capture_schemas: self.capture.schemas,
            oma: OmaSettings {
                start_script: self.oma.start_script,
                report_root: self.oma.report_root,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
version = 1

[source]
dsn = "db-host:1521/ORCL"
user = "scott"
password = "tiger"
schema = "APP"
timeout_secs = 30

[target]
host = "ob-host"
port = 2881
tenant = "ora_t1"
user = "app"
password = "s3cret"
mode = "mysql"
obclient_path = "/opt/ob/bin/obclient"

[capture]
schemas = ["APP", "HR"]

[oma]
start_script = "/opt/oma/bin/start.sh"
"#;

    fn parse(content: &str) -> ConfigFile {
        toml::from_str(content).unwrap()
    }

    mod into_tool_config {
        use super::*;

        #[test]
        fn maps_every_section() {
            let config = parse(FULL).into_tool_config().unwrap();

            assert_eq!(config.source.connect_string(), "scott/tiger@db-host:1521/ORCL");
            assert_eq!(config.source.schema.as_deref(), Some("APP"));
            assert_eq!(config.source.sqlplus_path, "sqlplus");
            assert_eq!(config.source.timeout_secs, 30);
            assert_eq!(config.target.login(), "app@ora_t1");
            assert_eq!(config.target.mode, TargetMode::MySql);
            assert_eq!(config.target.obclient_path, "/opt/ob/bin/obclient");
            assert_eq!(config.target.connect_timeout, 15);
            assert_eq!(config.capture_schemas, vec!["APP", "HR"]);
            assert_eq!(
                config.oma.start_script,
                Some(PathBuf::from("/opt/oma/bin/start.sh"))
            );
            assert_eq!(config.oma.report_root, None);
        }

        #[test]
        fn missing_required_field_is_named() {
            let content = FULL.replace("tenant = \"ora_t1\"\n", "");

            let result = parse(&content).into_tool_config();

            assert_eq!(result, Err(ConfigError::MissingField("target.tenant")));
        }

        #[test]
        fn blank_required_field_counts_as_missing() {
            let content = FULL.replace("dsn = \"db-host:1521/ORCL\"", "dsn = \"  \"");

            let result = parse(&content).into_tool_config();

            assert_eq!(result, Err(ConfigError::MissingField("source.dsn")));
        }
    }

    mod apply_env {
        use super::*;

        #[test]
        fn overrides_secrets_and_tool_paths() {
            let mut file = parse(FULL);

            file.apply_env(|key| match key {
                "ORACLE_PASSWORD" => Some("from-env".to_string()),
                "OMA_REPORT_ROOT" => Some("/reports".to_string()),
                _ => None,
            });
            let config = file.into_tool_config().unwrap();

            assert_eq!(config.source.password, "from-env");
            assert_eq!(config.target.password, "s3cret");
            assert_eq!(config.oma.report_root, Some(PathBuf::from("/reports")));
            assert_eq!(
                config.oma.start_script,
                Some(PathBuf::from("/opt/oma/bin/start.sh"))
            );
        }
    }
}

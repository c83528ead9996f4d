const DEFAULT_LISTENER_PORT: u16 = 1521;

/// Connection settings for the source (Oracle) engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProfile {
    pub dsn: String,
    pub user: String,
    pub password: String,
    /// Applied with `ALTER SESSION SET CURRENT_SCHEMA` before each statement
    pub schema: Option<String>,
    pub sqlplus_path: String,
    pub source_host: Option<String>,
    pub source_port: Option<u16>,
    pub source_service: Option<String>,
    pub timeout_secs: u64,
}

impl SourceProfile {
    pub fn new(
        dsn: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            dsn: dsn.into(),
            user: user.into(),
            password: password.into(),
            schema: None,
            sqlplus_path: "sqlplus".to_string(),
            source_host: None,
            source_port: None,
            source_service: None,
            timeout_secs: 60,
        }
    }

    /// Format: user/password@dsn
    pub fn connect_string(&self) -> String {
        format!("{}/{}@{}", self.user, self.password, self.dsn)
    }

    /// For logging - password replaced with ****
    pub fn masked_connect_string(&self) -> String {
        format!("{}/****@{}", self.user, self.dsn)
    }

    /// Explicit host/port/service win over whatever the DSN says.
    pub fn endpoint(&self) -> SourceEndpoint {
        match &self.source_host {
            Some(host) => SourceEndpoint {
                host: host.clone(),
                port: self.source_port.unwrap_or(DEFAULT_LISTENER_PORT),
                service: self.source_service.clone().unwrap_or_default(),
            },
            None => SourceEndpoint::parse_dsn(&self.dsn),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEndpoint {
    pub host: String,
    pub port: u16,
    pub service: String,
}

impl SourceEndpoint {
    /// Parses `host:port/service` (EZConnect). Missing or unparsable ports fall
    /// back to the default listener port.
    pub fn parse_dsn(dsn: &str) -> Self {
        let dsn = dsn.trim().trim_start_matches("//");
        let Some((host, rest)) = dsn.split_once(':') else {
            return Self {
                host: dsn.to_string(),
                port: DEFAULT_LISTENER_PORT,
                service: String::new(),
            };
        };

        let (port_part, service) = rest.split_once('/').unwrap_or((rest, ""));
        Self {
            host: host.to_string(),
            port: port_part.parse().unwrap_or(DEFAULT_LISTENER_PORT),
            service: service.to_string(),
        }
    }
}

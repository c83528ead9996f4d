use super::target_mode::TargetMode;

/// Connection settings for the target (OceanBase) engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    pub host: String,
    pub port: u16,
    pub tenant: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub mode: TargetMode,
    pub obclient_path: String,
    pub connect_timeout: u64,
    pub timeout_secs: u64,
}

impl TargetProfile {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tenant: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            tenant: tenant.into(),
            user: user.into(),
            password: password.into(),
            database: None,
            mode: TargetMode::default(),
            obclient_path: "obclient".to_string(),
            connect_timeout: 15,
            timeout_secs: 60,
        }
    }

    /// Format: user@tenant
    pub fn login(&self) -> String {
        format!("{}@{}", self.user, self.tenant)
    }

    /// Format: user@tenant@host:port
    pub fn display_name(&self) -> String {
        format!("{}@{}:{}", self.login(), self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_joins_user_and_tenant() {
        let profile = TargetProfile::new("ob-host", 2881, "ora_t1", "app", "secret");

        assert_eq!(profile.login(), "app@ora_t1");
        assert_eq!(profile.display_name(), "app@ora_t1@ob-host:2881");
    }
}

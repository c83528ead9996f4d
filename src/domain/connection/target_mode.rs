use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compatibility mode of the OceanBase tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    #[default]
    Oracle,
    #[serde(rename = "mysql")]
    MySql,
}

impl TargetMode {
    /// Spelling expected by the assessment tool's `--ob-mode`
    pub fn as_tool_flag(&self) -> &'static str {
        match self {
            TargetMode::Oracle => "ORACLE",
            TargetMode::MySql => "MYSQL",
        }
    }
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetMode::Oracle => write!(f, "oracle"),
            TargetMode::MySql => write!(f, "mysql"),
        }
    }
}

impl FromStr for TargetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oracle" => Ok(TargetMode::Oracle),
            "mysql" => Ok(TargetMode::MySql),
            _ => Err(format!("Unknown target mode: {}", s)),
        }
    }
}
